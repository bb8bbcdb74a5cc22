//! Error types for registration, request parsing and handler signalling.

use std::fmt;

use thiserror::Error;

use crate::status::status_line;

/// Configuration and registration errors.
#[derive(Debug, Error)]
pub enum WebError {
    /// A path template could not be compiled.
    #[error("invalid path template {template:?}: {reason}")]
    InvalidTemplate { template: String, reason: String },

    /// A route asked for a method the dispatcher does not serve.
    #[error("unsupported method {method} for route {template}")]
    UnsupportedMethod { method: String, template: String },

    /// A route definition was registered without a handler.
    #[error("route {0} has no handler")]
    MissingHandler(String),

    /// Routes cannot change once requests are being dispatched.
    #[error("cannot register routes after serving has started")]
    AlreadyServing,

    /// A status code or status line was rejected.
    #[error("bad response status: {0}")]
    InvalidStatus(String),
}

/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, WebError>;

/// Errors raised while reading the request body or parsing its input.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The body could not be read from the gateway.
    #[error("failed to read request body: {0}")]
    Io(#[from] std::io::Error),

    /// The body did not match its declared content type.
    #[error("malformed request body: {0}")]
    Malformed(String),
}

/// A non-2xx outcome signalled by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    code: u16,
    headers: Vec<(String, String)>,
}

impl HttpError {
    /// Creates an error for the given status code.
    pub fn new(code: u16) -> Self {
        Self {
            code,
            headers: Vec::new(),
        }
    }

    /// Adds a header to be sent along with the error response.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns the numeric status code.
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Returns the status line, e.g. `404 Not Found`.
    pub fn status(&self) -> String {
        status_line(self.code)
    }

    /// Returns the extra headers attached to this error.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

/// A redirect signalled by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    code: u16,
    location: String,
}

impl Redirect {
    /// Creates a redirect with an explicit 3xx code.
    pub fn new(code: u16, location: impl Into<String>) -> Self {
        Self {
            code,
            location: location.into(),
        }
    }

    /// Returns the numeric status code.
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Returns the status line, e.g. `302 Found`.
    pub fn status(&self) -> String {
        status_line(self.code)
    }

    /// Returns the redirect target.
    pub fn location(&self) -> &str {
        &self.location
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.status())
    }
}

impl std::error::Error for HttpError {}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.status(), self.location)
    }
}

impl std::error::Error for Redirect {}

/// The error channel of a handler.
///
/// `Http` and `Redirect` are ordinary outcomes resolved by the dispatcher;
/// `Fault` is an unexpected failure reported as a 500.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Respond with an error status.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Respond with a redirect.
    #[error(transparent)]
    Redirect(#[from] Redirect),

    /// Any other failure.
    #[error(transparent)]
    Fault(#[from] anyhow::Error),
}

impl From<RequestError> for HandlerError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Malformed(_) => Self::Http(HttpError::new(400)),
            RequestError::Io(e) => Self::Fault(e.into()),
        }
    }
}

impl From<WebError> for HandlerError {
    fn from(err: WebError) -> Self {
        Self::Fault(err.into())
    }
}

/// Result type returned by handlers.
pub type HandlerResult<T> = std::result::Result<T, HandlerError>;

/// 400 Bad Request.
pub fn bad_request() -> HandlerError {
    HttpError::new(400).into()
}

/// 401 Unauthorized.
pub fn unauthorized() -> HandlerError {
    HttpError::new(401).into()
}

/// 403 Forbidden.
pub fn forbidden() -> HandlerError {
    HttpError::new(403).into()
}

/// 404 Not Found.
pub fn not_found() -> HandlerError {
    HttpError::new(404).into()
}

/// 409 Conflict.
pub fn conflict() -> HandlerError {
    HttpError::new(409).into()
}

/// 500 Internal Server Error.
pub fn internal_error() -> HandlerError {
    HttpError::new(500).into()
}

/// 301 Moved Permanently.
pub fn redirect(location: impl Into<String>) -> HandlerError {
    Redirect::new(301, location).into()
}

/// 302 Found.
pub fn found(location: impl Into<String>) -> HandlerError {
    Redirect::new(302, location).into()
}

/// 303 See Other.
pub fn see_other(location: impl Into<String>) -> HandlerError {
    Redirect::new(303, location).into()
}
