//! The per-dispatch context handed to handlers.

use std::path::{Path, PathBuf};

use crate::request::Request;
use crate::response::Response;
use crate::session::{Session, SessionStore};

/// Application-level facts visible to every handler.
#[derive(Debug, Clone)]
pub struct AppInfo {
    /// Directory static files are served from.
    pub document_root: PathBuf,
    /// Whether fault traces are shown to clients.
    pub debug: bool,
}

impl AppInfo {
    /// Returns the document root.
    pub fn document_root(&self) -> &Path {
        &self.document_root
    }
}

/// Everything belonging to one request: the request itself, the response
/// being built, and handles to application state.
///
/// A context is created by [`App::call`](crate::App::call) and dropped when
/// the call returns.
#[derive(Debug)]
pub struct Context<'a> {
    /// The incoming request.
    pub request: Request,
    /// The response under construction.
    pub response: Response,
    app: &'a AppInfo,
    sessions: &'a SessionStore,
}

impl<'a> Context<'a> {
    /// Creates a context.
    pub fn new(
        request: Request,
        response: Response,
        app: &'a AppInfo,
        sessions: &'a SessionStore,
    ) -> Self {
        Self {
            request,
            response,
            app,
            sessions,
        }
    }

    /// Returns application info.
    pub fn app(&self) -> &'a AppInfo {
        self.app
    }

    /// Returns the session store.
    pub fn sessions(&self) -> &'a SessionStore {
        self.sessions
    }

    /// Returns the caller's session, creating one and setting the
    /// `sessionid` cookie if needed.
    pub fn session(&mut self) -> Session {
        self.response.session(&self.request, self.sessions)
    }

    /// Returns the caller's session if the request carries a live one.
    pub fn existing_session(&self) -> Option<Session> {
        self.request.session(self.sessions)
    }

    pub(crate) fn into_response(self) -> Response {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Environ;
    use crate::session::SESSION_COOKIE;

    fn info() -> AppInfo {
        AppInfo {
            document_root: PathBuf::from("."),
            debug: false,
        }
    }

    #[test]
    fn test_session_created_once_per_cookie() {
        let app = info();
        let store = SessionStore::new();

        let mut ctx = Context::new(
            Request::new(Environ::get("/")),
            Response::new(),
            &app,
            &store,
        );
        assert!(ctx.existing_session().is_none());
        let session = ctx.session();
        session.set("name", "alice");
        let directive = ctx.response.cookie(SESSION_COOKIE).unwrap();
        assert!(directive.starts_with(&format!("{SESSION_COOKIE}={};", session.id())));

        let id = session.id().to_string();
        let ctx = Context::new(
            Request::new(Environ::get("/").header("Cookie", format!("{SESSION_COOKIE}={id}"))),
            Response::new(),
            &app,
            &store,
        );
        let again = ctx.existing_session().unwrap();
        assert!(Session::ptr_eq(&session, &again));
        assert_eq!(again.get::<String>("name"), Some("alice".to_string()));
    }

    #[test]
    fn test_unknown_cookie_is_not_a_session() {
        let app = info();
        let store = SessionStore::new();
        let ctx = Context::new(
            Request::new(Environ::get("/").header("Cookie", "sessionid=nope")),
            Response::new(),
            &app,
            &store,
        );
        assert!(ctx.existing_session().is_none());
        assert!(store.is_empty());
    }
}
