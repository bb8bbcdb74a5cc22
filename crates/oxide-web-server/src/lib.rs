//! Development gateway for oxide-web applications.
//!
//! `oxide-web-server` runs a synchronous [`oxide_web::App`] behind a hyper
//! HTTP/1 listener:
//! - **gateway** - translation between hyper requests and the engine's
//!   `Environ` / `GatewayResponse`, plus periodic session sweeping
//! - **demo** - a small number-guessing application used by the binary

pub mod demo;
pub mod gateway;
