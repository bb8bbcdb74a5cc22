//! Response state accumulated during dispatch.

use std::io;

use tracing::debug;

use crate::cookie::Cookie;
use crate::error::{Result, WebError};
use crate::request::Request;
use crate::session::{new_session_id, Session, SessionStore, SESSION_COOKIE};
use crate::static_files::FileChunks;
use crate::status::{self, canonical_header, POWERED_BY};

/// Default content type of a response.
pub const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// The body handed back to the gateway.
#[derive(Debug)]
pub enum Body {
    /// A fully buffered body.
    Bytes(Vec<u8>),
    /// A file streamed in fixed-size chunks.
    File(FileChunks),
}

impl Body {
    /// An empty body.
    pub fn empty() -> Self {
        Self::Bytes(Vec::new())
    }

    /// Returns the body as a sequence of chunks.
    pub fn chunks(self) -> Box<dyn Iterator<Item = io::Result<Vec<u8>>> + Send> {
        match self {
            Self::Bytes(bytes) if bytes.is_empty() => Box::new(std::iter::empty()),
            Self::Bytes(bytes) => Box::new(std::iter::once(Ok(bytes))),
            Self::File(chunks) => Box::new(chunks),
        }
    }

    /// Reads the whole body into memory.
    pub fn into_bytes(self) -> io::Result<Vec<u8>> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            Self::File(chunks) => {
                let mut out = Vec::new();
                for chunk in chunks {
                    out.extend_from_slice(&chunk?);
                }
                Ok(out)
            }
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Self::Bytes(s.into_bytes())
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Self::Bytes(s.as_bytes().to_vec())
    }
}

/// An HTTP response under construction.
///
/// Header names are stored in canonical form when they are known response
/// headers. Cookies are kept apart and only flattened into `Set-Cookie`
/// headers by [`Response::finalize`].
#[derive(Debug, Clone)]
pub struct Response {
    status: String,
    headers: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
    session_id: Option<String>,
    powered_by: String,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// Creates a `200 OK` HTML response.
    pub fn new() -> Self {
        Self {
            status: status::status_line(200),
            headers: vec![("Content-Type".to_string(), DEFAULT_CONTENT_TYPE.to_string())],
            cookies: Vec::new(),
            session_id: None,
            powered_by: POWERED_BY.1.to_string(),
        }
    }

    /// Overrides the value of the trailing `X-Powered-By` header.
    #[must_use]
    pub fn with_powered_by(mut self, value: impl Into<String>) -> Self {
        self.powered_by = value.into();
        self
    }

    /// Returns the status line.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Returns the numeric status code.
    pub fn status_code(&self) -> u16 {
        self.status
            .get(..3)
            .and_then(|code| code.parse().ok())
            .unwrap_or(200)
    }

    /// Sets the status from a numeric code.
    pub fn set_status(&mut self, code: u16) -> Result<()> {
        if !(100..=999).contains(&code) {
            return Err(WebError::InvalidStatus(code.to_string()));
        }
        self.status = status::status_line(code);
        Ok(())
    }

    /// Sets the status from an error signal; out-of-range codes become 500.
    pub(crate) fn force_status(&mut self, code: u16) {
        if self.set_status(code).is_err() {
            self.status = status::status_line(500);
        }
    }

    /// Sets a full status line such as `299 Custom`.
    pub fn set_status_line(&mut self, line: &str) -> Result<()> {
        if !status::is_valid_status_line(line) {
            return Err(WebError::InvalidStatus(line.to_string()));
        }
        self.status = line.to_string();
        Ok(())
    }

    /// Gets a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        let key = canonical_header(name);
        self.headers
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Sets a header, replacing any previous value.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let key = canonical_header(name);
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((key, value)),
        }
    }

    /// Removes a header.
    pub fn unset_header(&mut self, name: &str) {
        let key = canonical_header(name);
        self.headers.retain(|(k, _)| *k != key);
    }

    /// Returns the `Content-Type` header.
    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// Sets the `Content-Type` header; an empty value removes it.
    pub fn set_content_type(&mut self, value: &str) {
        if value.is_empty() {
            self.unset_header("Content-Type");
        } else {
            self.set_header("Content-Type", value);
        }
    }

    /// Returns the `Content-Length` header.
    pub fn content_length(&self) -> Option<u64> {
        self.header("Content-Length").and_then(|v| v.parse().ok())
    }

    /// Sets the `Content-Length` header.
    pub fn set_content_length(&mut self, len: u64) {
        self.set_header("Content-Length", len.to_string());
    }

    /// Queues a cookie. A later cookie with the same name replaces it.
    pub fn set_cookie(&mut self, cookie: Cookie) {
        let directive = cookie.to_header_value();
        match self.cookies.iter_mut().find(|(name, _)| name == cookie.name()) {
            Some(entry) => entry.1 = directive,
            None => self.cookies.push((cookie.name().to_string(), directive)),
        }
    }

    /// Returns the queued `Set-Cookie` value for `name`.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Tells the client to drop a cookie.
    pub fn delete_cookie(&mut self, name: &str) {
        self.set_cookie(Cookie::new(name, "__deleted__").expires_at_timestamp(0));
    }

    /// Forgets a queued cookie.
    pub fn unset_cookie(&mut self, name: &str) {
        self.cookies.retain(|(n, _)| n != name);
    }

    /// Returns the session for this request, creating one if needed.
    ///
    /// The identifier already issued on this response wins, then the
    /// request's `sessionid` cookie. Without either a fresh identifier and
    /// an empty session are created. The cookie is set again on this
    /// response every time.
    pub fn session(&mut self, request: &Request, store: &SessionStore) -> Session {
        let id = match (&self.session_id, request.cookie(SESSION_COOKIE)) {
            (Some(id), _) => id.clone(),
            (None, Some(id)) if !id.is_empty() => id.to_string(),
            _ => {
                let id = new_session_id();
                debug!(session_id = %id, "Issuing new session cookie");
                id
            }
        };
        self.set_cookie(Cookie::new(SESSION_COOKIE, id.as_str()));
        self.session_id = Some(id.clone());
        store.get_or_create(&id)
    }

    /// Merges headers carried by an error signal.
    pub(crate) fn extend_headers(&mut self, headers: &[(String, String)]) {
        for (name, value) in headers {
            self.set_header(name, value.as_str());
        }
    }

    /// Produces the final header list: stored headers, one `Set-Cookie`
    /// per cookie, then `X-Powered-By`.
    ///
    /// This does not modify the response; repeated calls give the same
    /// list.
    pub fn finalize(&self) -> Vec<(String, String)> {
        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .filter(|(k, _)| k != POWERED_BY.0)
            .cloned()
            .collect();
        headers.extend(
            self.cookies
                .iter()
                .map(|(_, directive)| ("Set-Cookie".to_string(), directive.clone())),
        );
        headers.push((POWERED_BY.0.to_string(), self.powered_by.clone()));
        headers
    }
}
