//! # oxide-web
//!
//! A small synchronous web application engine.
//!
//! This crate provides:
//! - Path templates with `<name>` placeholders
//! - Per-method route tables with first-match-wins lookup
//! - Lazy request parsing (headers, cookies, query and form input, uploads)
//! - Responses with canonical headers and queued cookies
//! - In-memory sessions keyed by a `sessionid` cookie
//! - Static file serving from a document root
//! - A dispatcher turning handler results, signals and panics into responses
//!
//! ## Quick Start
//!
//! ```
//! use oxide_web::{App, AppConfig, Context, Environ, HandlerResult, Params, Reply, RouteDef};
//!
//! fn index(_ctx: &mut Context<'_>, _params: &Params) -> HandlerResult<Reply> {
//!     Ok("Hello, World!".into())
//! }
//!
//! fn user(_ctx: &mut Context<'_>, params: &Params) -> HandlerResult<Reply> {
//!     Ok(format!("user {}", &params[0]).into())
//! }
//!
//! let mut app = App::new(AppConfig::default());
//! app.register_module(vec![
//!     RouteDef::get("/", index),
//!     RouteDef::get("/user/<name>", user),
//! ])
//! .unwrap();
//!
//! let res = app.call(Environ::get("/user/alice"));
//! assert_eq!(res.status_code(), 200);
//! assert_eq!(res.body.into_bytes().unwrap(), b"user alice");
//! ```
//!
//! ## Signalling Errors and Redirects
//!
//! Handlers return `Err` to leave the success path:
//!
//! ```
//! use oxide_web::{found, not_found, App, Environ, Method};
//!
//! let mut app = App::default();
//! app.register("/old", &[Method::Get], |_ctx, _params| Err(found("/new")))
//!     .unwrap();
//! app.register("/gone", &[Method::Get], |_ctx, _params| Err(not_found()))
//!     .unwrap();
//!
//! let res = app.call(Environ::get("/old"));
//! assert_eq!(res.status, "302 Found");
//! assert_eq!(res.header("Location"), Some("/new"));
//! assert_eq!(app.call(Environ::get("/gone")).status_code(), 404);
//! ```
//!
//! ## Views
//!
//! A route with a view returns [`Reply::Data`] and the application's
//! [`Render`] implementation turns it into bytes:
//!
//! ```
//! use oxide_web::{model, App, Environ, Model, Reply, RouteDef};
//!
//! let mut app = App::default().with_renderer(|view: &str, m: &Model| -> anyhow::Result<Vec<u8>> {
//!     Ok(format!("{view}: {}", m["name"]).into_bytes())
//! });
//! app.add_route(
//!     RouteDef::get("/", |_ctx, _params| Ok(Reply::Data(model! { "name" => "alice" })))
//!         .view("index.html"),
//! )
//! .unwrap();
//!
//! let res = app.call(Environ::get("/"));
//! assert_eq!(res.body.into_bytes().unwrap(), b"index.html: \"alice\"");
//! ```
//!
//! ## Sessions
//!
//! ```
//! use oxide_web::{App, Environ, Method, Reply};
//!
//! let mut app = App::default();
//! app.register("/visit", &[Method::Get], |ctx, _params| {
//!     let session = ctx.session();
//!     let times = session.get::<u64>("times").unwrap_or(0) + 1;
//!     session.set("times", times);
//!     Ok(Reply::Text(times.to_string()))
//! })
//! .unwrap();
//!
//! let first = app.call(Environ::get("/visit"));
//! let cookie = first.header("Set-Cookie").unwrap().split(';').next().unwrap().to_string();
//!
//! let second = app.call(Environ::get("/visit").header("Cookie", cookie));
//! assert_eq!(second.body.into_bytes().unwrap(), b"2");
//! ```

mod app;
mod context;
mod cookie;
mod error;
mod path;
mod render;
mod request;
mod response;
mod route;
mod session;
mod static_files;
pub mod status;

pub use app::{App, AppConfig, GatewayResponse, DEFAULT_STATIC_PREFIX, INTERNAL_ERROR_BODY};
pub use context::{AppInfo, Context};
pub use cookie::Cookie;
pub use error::{
    bad_request, conflict, forbidden, found, internal_error, not_found, redirect, see_other,
    unauthorized, HandlerError, HandlerResult, HttpError, Redirect, RequestError, Result,
    WebError,
};
pub use path::{PathPattern, PathSegment};
pub use render::{html_escape, Model, Render};
pub use request::{Environ, FormData, Input, InputValue, Method, MultipartFile, Request};
pub use response::{Body, Response, DEFAULT_CONTENT_TYPE};
pub use route::{Handler, Params, Reply, Route, RouteDef};
pub use session::{Session, SessionStore, DEFAULT_MAX_IDLE, SESSION_COOKIE};
pub use static_files::{FileChunks, StaticFile, StaticFiles, BLOCK_SIZE};

#[doc(hidden)]
pub use serde_json;
