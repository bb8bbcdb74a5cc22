//! The application: route tables, configuration and the dispatch state
//! machine.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context as _};
use tracing::{debug, error, info, warn};

use crate::context::{AppInfo, Context};
use crate::error::{bad_request, not_found, HandlerError, HandlerResult, Result, WebError};
use crate::render::{html_escape, Render};
use crate::request::{Environ, Method, Request};
use crate::response::{Body, Response};
use crate::route::{Params, Reply, Route, RouteDef};
use crate::session::{SessionStore, DEFAULT_MAX_IDLE};
use crate::static_files::StaticFiles;
use crate::status::POWERED_BY;

/// Body sent for unhandled faults outside debug mode.
pub const INTERNAL_ERROR_BODY: &str =
    "<html><body><h1>500 Internal Server Error</h1></body></html>";

/// Default URL prefix of the static file route.
pub const DEFAULT_STATIC_PREFIX: &str = "/static/";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory static files are served from.
    pub document_root: PathBuf,
    /// Show fault traces in 500 responses.
    pub debug: bool,
    /// Prefix of the static file route; `None` disables it.
    pub static_prefix: Option<String>,
    /// Idle lifetime of sessions.
    pub session_max_idle: Duration,
    /// Value of the `X-Powered-By` header.
    pub powered_by: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            document_root: PathBuf::from("."),
            debug: false,
            static_prefix: Some(DEFAULT_STATIC_PREFIX.to_string()),
            session_max_idle: DEFAULT_MAX_IDLE,
            powered_by: POWERED_BY.1.to_string(),
        }
    }
}

impl AppConfig {
    /// Creates a configuration rooted at `document_root`.
    pub fn new(document_root: impl Into<PathBuf>) -> Self {
        Self {
            document_root: document_root.into(),
            ..Self::default()
        }
    }

    /// Enables or disables debug mode.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Serves static files under `prefix`.
    #[must_use]
    pub fn static_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.static_prefix = Some(prefix.into());
        self
    }

    /// Disables the static file route.
    #[must_use]
    pub fn without_static_files(mut self) -> Self {
        self.static_prefix = None;
        self
    }

    /// Sets the session idle lifetime.
    #[must_use]
    pub fn session_max_idle(mut self, max_idle: Duration) -> Self {
        self.session_max_idle = max_idle;
        self
    }

    /// Sets the `X-Powered-By` value.
    #[must_use]
    pub fn powered_by(mut self, value: impl Into<String>) -> Self {
        self.powered_by = value.into();
        self
    }
}

/// What the gateway receives for each call.
#[derive(Debug)]
pub struct GatewayResponse {
    /// Status line, e.g. `200 OK`.
    pub status: String,
    /// Final header list.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Body,
}

impl GatewayResponse {
    /// Returns the numeric status code.
    pub fn status_code(&self) -> u16 {
        self.status
            .get(..3)
            .and_then(|code| code.parse().ok())
            .unwrap_or(500)
    }

    /// Gets the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Gets every header named `name` (case-insensitive).
    pub fn headers_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A web application.
///
/// Routes are registered up front; the first call to [`App::call`] freezes
/// the tables. Lookups walk the GET or POST list in registration order and
/// the first matching route wins, so literal routes must be registered
/// before overlapping placeholder routes.
///
/// ```
/// use oxide_web::{App, AppConfig, Environ, Method, Reply};
///
/// let mut app = App::new(AppConfig::default());
/// app.register("/hello/<name>", &[Method::Get], |_ctx, params| {
///     Ok(Reply::Text(format!("hello {}", &params[0])))
/// })
/// .unwrap();
///
/// let res = app.call(Environ::get("/hello/world"));
/// assert_eq!(res.status, "200 OK");
/// assert_eq!(res.body.into_bytes().unwrap(), b"hello world");
/// ```
pub struct App {
    config: AppConfig,
    info: AppInfo,
    get_routes: Vec<Arc<Route>>,
    post_routes: Vec<Arc<Route>>,
    renderer: Option<Box<dyn Render>>,
    sessions: SessionStore,
    serving: AtomicBool,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("get_routes", &self.get_routes)
            .field("post_routes", &self.post_routes)
            .field("has_renderer", &self.renderer.is_some())
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl App {
    /// Creates an application. When static serving is enabled its route is
    /// the first GET route.
    pub fn new(config: AppConfig) -> Self {
        let info = AppInfo {
            document_root: config.document_root.clone(),
            debug: config.debug,
        };
        let mut app = Self {
            info,
            get_routes: Vec::new(),
            post_routes: Vec::new(),
            renderer: None,
            sessions: SessionStore::with_max_idle(config.session_max_idle),
            serving: AtomicBool::new(false),
            config,
        };

        if let Some(prefix) = app.config.static_prefix.clone() {
            let files = StaticFiles::new(prefix);
            let serving = files.clone();
            let route = Route::static_files(files, move |ctx, params| {
                serve_static(&serving, ctx, params)
            });
            debug!(prefix = %route.template(), "Static files enabled");
            app.push(Arc::new(route));
        }
        app
    }

    /// Sets the renderer used for routes with a view.
    #[must_use]
    pub fn with_renderer(mut self, renderer: impl Render + 'static) -> Self {
        self.set_renderer(renderer);
        self
    }

    /// Sets the renderer used for routes with a view.
    pub fn set_renderer(&mut self, renderer: impl Render + 'static) {
        self.renderer = Some(Box::new(renderer));
    }

    /// Registers a handler for `template`. An empty method list means GET.
    pub fn register<F>(&mut self, template: &str, methods: &[Method], handler: F) -> Result<()>
    where
        F: Fn(&mut Context<'_>, &Params) -> HandlerResult<Reply> + Send + Sync + 'static,
    {
        self.add_route(RouteDef::new(template).methods(methods).handler(handler))
    }

    /// Registers one route definition.
    pub fn add_route(&mut self, def: RouteDef) -> Result<()> {
        if self.is_serving() {
            return Err(WebError::AlreadyServing);
        }
        let route = Arc::new(def.build()?);
        info!(route = %route, view = route.view().unwrap_or("-"), "Route registered");
        self.push(route);
        Ok(())
    }

    /// Registers every definition of a module, in order.
    ///
    /// Stops at the first invalid definition; routes before it stay
    /// registered.
    pub fn register_module<I>(&mut self, defs: I) -> Result<()>
    where
        I: IntoIterator<Item = RouteDef>,
    {
        for def in defs {
            self.add_route(def)?;
        }
        Ok(())
    }

    fn push(&mut self, route: Arc<Route>) {
        if route.accepts(Method::Get) {
            self.get_routes.push(Arc::clone(&route));
        }
        if route.accepts(Method::Post) {
            self.post_routes.push(route);
        }
    }

    /// Returns the routes consulted for `method`, in lookup order.
    pub fn routes(&self, method: Method) -> &[Arc<Route>] {
        match method {
            Method::Get => &self.get_routes,
            Method::Post => &self.post_routes,
            _ => &[],
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Returns the application info handed to handlers.
    pub fn info(&self) -> &AppInfo {
        &self.info
    }

    /// Returns the session store.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Returns whether a request has been dispatched.
    pub fn is_serving(&self) -> bool {
        self.serving.load(Ordering::Acquire)
    }

    /// Dispatches one request.
    ///
    /// This never fails: routing failures, handler signals, faults and
    /// panics all end up as a well-formed response.
    pub fn call(&self, environ: Environ) -> GatewayResponse {
        if !self.serving.swap(true, Ordering::AcqRel) {
            info!(
                get_routes = self.get_routes.len(),
                post_routes = self.post_routes.len(),
                "Serving started"
            );
        }

        let request = Request::new(environ);
        let method = request.method_str().to_string();
        let path = request.path();
        debug!(%method, %path, remote_addr = %request.remote_addr(), "Dispatching request");

        let response = Response::new().with_powered_by(self.config.powered_by.as_str());
        let mut ctx = Context::new(request, response, &self.info, &self.sessions);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(&mut ctx, &path)))
            .unwrap_or_else(|payload| {
                Err(HandlerError::Fault(anyhow!(
                    "handler panicked: {}",
                    panic_message(&*payload)
                )))
            });

        self.finish(ctx.into_response(), outcome, &method, &path)
    }

    fn dispatch(&self, ctx: &mut Context<'_>, path: &str) -> HandlerResult<Body> {
        let routes = match ctx.request.method() {
            Some(Method::Get) => &self.get_routes,
            Some(Method::Post) => &self.post_routes,
            _ => return Err(bad_request()),
        };

        let Some((route, params)) = routes
            .iter()
            .find_map(|route| route.match_path(path).map(|params| (route, params)))
        else {
            return Err(not_found());
        };

        debug!(route = %route, params = params.len(), "Route matched");
        let reply = route.call(ctx, &params)?;
        self.render(route, reply)
    }

    fn render(&self, route: &Route, reply: Reply) -> HandlerResult<Body> {
        match (route.view(), reply) {
            (Some(view), Reply::Data(model)) => {
                let renderer = self
                    .renderer
                    .as_deref()
                    .ok_or_else(|| anyhow!("no renderer configured for view {view}"))?;
                let bytes = renderer
                    .render(view, &model)
                    .with_context(|| format!("failed to render view {view}"))?;
                Ok(Body::Bytes(bytes))
            }
            (None, Reply::Data(_)) => {
                Err(anyhow!("route {route} returned data but declares no view").into())
            }
            (Some(view), _) => {
                Err(anyhow!("route {route} declares view {view} but returned no data").into())
            }
            (None, Reply::Text(text)) => Ok(text.into()),
            (None, Reply::Bytes(bytes)) => Ok(bytes.into()),
            (None, Reply::Stream(body)) => Ok(body),
            (None, Reply::Empty) => Ok(Body::empty()),
        }
    }

    fn finish(
        &self,
        mut response: Response,
        outcome: HandlerResult<Body>,
        method: &str,
        path: &str,
    ) -> GatewayResponse {
        if outcome.is_err() {
            response.unset_header("Content-Length");
        }
        let body = match outcome {
            Ok(body) => body,
            Err(HandlerError::Redirect(redirect)) => {
                debug!(status = %redirect.status(), location = %redirect.location(), "Redirecting");
                response.force_status(redirect.code());
                response.set_header("Location", redirect.location());
                Body::empty()
            }
            Err(HandlerError::Http(err)) => {
                warn!(%method, %path, status = %err.status(), "Request failed");
                response.force_status(err.code());
                response.extend_headers(err.headers());
                Body::from(error_page(response.status()))
            }
            Err(HandlerError::Fault(err)) => {
                let chain = format!("{err:#}");
                error!(%method, %path, error = %chain, "Unhandled fault");
                response.force_status(500);
                if self.info.debug {
                    Body::from(fault_page(&format!("{err:?}")))
                } else {
                    Body::from(INTERNAL_ERROR_BODY)
                }
            }
        };

        GatewayResponse {
            status: response.status().to_string(),
            headers: response.finalize(),
            body,
        }
    }
}

fn serve_static(
    files: &StaticFiles,
    ctx: &mut Context<'_>,
    params: &Params,
) -> HandlerResult<Reply> {
    let relative = params.get(0).ok_or_else(not_found)?;
    let file = files.open(ctx.app().document_root(), relative)?;
    ctx.response.set_content_type(&file.content_type);
    Ok(Reply::Stream(file.body))
}

fn error_page(status: &str) -> String {
    format!("<html><body><h1>{}</h1></body></html>", html_escape(status))
}

fn fault_page(trace: &str) -> String {
    format!(
        "<html><body><h1>500 Internal Server Error</h1><pre>{}</pre></body></html>",
        html_escape(trace)
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{found, HttpError};

    fn text(body: &'static str) -> impl Fn(&mut Context<'_>, &Params) -> HandlerResult<Reply> {
        move |_ctx, _params| Ok(Reply::Text(body.to_string()))
    }

    fn body(res: GatewayResponse) -> String {
        String::from_utf8(res.body.into_bytes().unwrap()).unwrap()
    }

    fn app() -> App {
        App::new(AppConfig::default().without_static_files())
    }

    #[test]
    fn test_register_populates_method_lists() {
        let mut app = app();
        app.register("/a", &[], text("a")).unwrap();
        app.register("/b", &[Method::Post], text("b")).unwrap();
        app.register("/c", &[Method::Get, Method::Post], text("c"))
            .unwrap();

        let get: Vec<&str> = app.routes(Method::Get).iter().map(|r| r.template()).collect();
        let post: Vec<&str> = app.routes(Method::Post).iter().map(|r| r.template()).collect();
        assert_eq!(get, vec!["/a", "/c"]);
        assert_eq!(post, vec!["/b", "/c"]);
        assert!(app.routes(Method::Put).is_empty());
    }

    #[test]
    fn test_static_route_comes_first() {
        let mut app = App::new(AppConfig::default());
        app.register("/<anything>", &[], text("x")).unwrap();
        let get: Vec<&str> = app.routes(Method::Get).iter().map(|r| r.template()).collect();
        assert_eq!(get, vec![DEFAULT_STATIC_PREFIX, "/<anything>"]);
        assert!(app.routes(Method::Post).is_empty());
    }

    #[test]
    fn test_register_after_serving() {
        let mut app = app();
        app.register("/", &[], text("home")).unwrap();
        assert!(!app.is_serving());
        app.call(Environ::get("/"));
        assert!(app.is_serving());
        assert!(matches!(
            app.register("/late", &[], text("late")),
            Err(WebError::AlreadyServing)
        ));
    }

    #[test]
    fn test_register_module_stops_at_bad_route() {
        let mut app = app();
        let err = app
            .register_module(vec![
                RouteDef::get("/ok", text("ok")),
                RouteDef::new("/no-handler"),
                RouteDef::get("/never", text("never")),
            ])
            .unwrap_err();
        assert!(matches!(err, WebError::MissingHandler(_)));
        assert_eq!(app.routes(Method::Get).len(), 1);
    }

    #[test]
    fn test_http_error_headers_are_merged() {
        let mut app = app();
        app.register("/auth", &[], |_ctx, _params| {
            Err(HttpError::new(401)
                .header("WWW-Authenticate", "Basic realm=\"x\"")
                .into())
        })
        .unwrap();

        let res = app.call(Environ::get("/auth"));
        assert_eq!(res.status, "401 Unauthorized");
        assert_eq!(res.header("www-authenticate"), Some("Basic realm=\"x\""));
        assert_eq!(
            body(res),
            "<html><body><h1>401 Unauthorized</h1></body></html>"
        );
    }

    #[test]
    fn test_out_of_range_error_code_becomes_500() {
        let mut app = app();
        app.register("/odd", &[], |_ctx, _params| Err(HttpError::new(42).into()))
            .unwrap();
        assert_eq!(app.call(Environ::get("/odd")).status_code(), 500);
    }

    #[test]
    fn test_redirect_keeps_cookies() {
        let mut app = app();
        app.register("/login", &[Method::Post], |ctx, _params| {
            ctx.session().set("user", "alice");
            Err(found("/home"))
        })
        .unwrap();

        let res = app.call(Environ::post("/login"));
        assert_eq!(res.status, "302 Found");
        assert_eq!(res.header("Location"), Some("/home"));
        assert!(res.header("Set-Cookie").unwrap().starts_with("sessionid="));
        assert!(body(res).is_empty());
        assert_eq!(app.sessions().len(), 1);
    }

    #[test]
    fn test_view_without_renderer_is_a_fault() {
        let mut app = app();
        app.add_route(
            RouteDef::get("/", |_ctx, _params| Ok(Reply::Data(Default::default())))
                .view("index.html"),
        )
        .unwrap();
        let res = app.call(Environ::get("/"));
        assert_eq!(res.status_code(), 500);
        assert_eq!(body(res), INTERNAL_ERROR_BODY);
    }

    #[test]
    fn test_view_with_non_data_reply_is_a_fault() {
        let mut app = app().with_renderer(|_: &str, _: &crate::Model| -> anyhow::Result<Vec<u8>> {
            Ok(Vec::new())
        });
        app.add_route(RouteDef::get("/", text("oops")).view("index.html"))
            .unwrap();
        assert_eq!(app.call(Environ::get("/")).status_code(), 500);
    }

    #[test]
    fn test_powered_by_comes_last() {
        let mut app = App::new(
            AppConfig::default()
                .without_static_files()
                .powered_by("test/1.0"),
        );
        app.register("/", &[], text("x")).unwrap();
        let res = app.call(Environ::get("/"));
        assert_eq!(
            res.headers.last(),
            Some(&("X-Powered-By".to_string(), "test/1.0".to_string()))
        );
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*payload), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*payload), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7);
        assert_eq!(panic_message(&*payload), "unknown panic payload");
    }
}
