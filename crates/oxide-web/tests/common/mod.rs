#![allow(dead_code)]

use oxide_web::{App, AppConfig, Environ, GatewayResponse};

/// An application without static files.
pub fn app() -> App {
    App::new(AppConfig::default().without_static_files())
}

/// An application in debug mode without static files.
pub fn debug_app() -> App {
    App::new(AppConfig::default().without_static_files().debug(true))
}

/// Dispatches `environ` and returns the response with its body read.
pub fn call(app: &App, environ: Environ) -> (GatewayResponse, String) {
    let mut res = app.call(environ);
    let body = std::mem::take(&mut res.body)
        .into_bytes()
        .unwrap_or_else(|e| panic!("Failed to read body: {e}"));
    let body = String::from_utf8(body).unwrap_or_else(|e| panic!("Body is not UTF-8: {e}"));
    (res, body)
}

/// Dispatches a GET and returns status code and body.
pub fn get(app: &App, path: &str) -> (u16, String) {
    let (res, body) = call(app, Environ::get(path));
    (res.status_code(), body)
}

/// Extracts `name=value` from the first `Set-Cookie` header for `name`.
pub fn cookie_pair(res: &GatewayResponse, name: &str) -> String {
    let prefix = format!("{name}=");
    res.headers_named("Set-Cookie")
        .find(|v| v.starts_with(&prefix))
        .and_then(|v| v.split(';').next())
        .unwrap_or_else(|| panic!("No Set-Cookie for {name} in {:?}", res.headers))
        .to_string()
}
