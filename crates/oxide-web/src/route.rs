//! Route definitions and the values handlers exchange with the dispatcher.

use std::fmt;
use std::ops::Index;
use std::str::FromStr;
use std::sync::Arc;

use crate::context::Context;
use crate::error::{HandlerResult, Result, WebError};
use crate::path::PathPattern;
use crate::render::Model;
use crate::request::Method;
use crate::response::Body;
use crate::static_files::StaticFiles;

/// A synchronous request handler.
pub type Handler = Arc<dyn Fn(&mut Context<'_>, &Params) -> HandlerResult<Reply> + Send + Sync>;

/// What a handler produces on success.
#[derive(Debug)]
pub enum Reply {
    /// A model for the route's view.
    Data(Model),
    /// A text body.
    Text(String),
    /// A raw byte body.
    Bytes(Vec<u8>),
    /// A prepared body, e.g. file chunks.
    Stream(Body),
    /// No body.
    Empty,
}

impl From<Model> for Reply {
    fn from(model: Model) -> Self {
        Self::Data(model)
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Reply {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Body> for Reply {
    fn from(body: Body) -> Self {
        Self::Stream(body)
    }
}

/// Path parameters captured by a route, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    names: Vec<String>,
    values: Vec<String>,
}

impl Params {
    /// Creates parameters from names and captured values.
    pub fn new(names: Vec<String>, values: Vec<String>) -> Self {
        Self { names, values }
    }

    /// Gets the parameter at `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    /// Gets a parameter by its placeholder name.
    pub fn named(&self, name: &str) -> Option<&str> {
        let index = self.names.iter().position(|n| n == name)?;
        self.get(index)
    }

    /// Parses the parameter at `index`.
    pub fn parse<T: FromStr>(&self, index: usize) -> Option<T> {
        self.get(index).and_then(|v| v.parse().ok())
    }

    /// Returns the number of parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over the values in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(String::as_str)
    }
}

impl Index<usize> for Params {
    type Output = str;

    fn index(&self, index: usize) -> &str {
        &self.values[index]
    }
}

#[derive(Debug)]
enum Matcher {
    Pattern(PathPattern),
    Static(StaticFiles),
}

/// A registered route: a matcher, the methods it serves, its handler and
/// an optional view.
pub struct Route {
    matcher: Matcher,
    methods: Vec<Method>,
    handler: Handler,
    view: Option<String>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("matcher", &self.matcher)
            .field("methods", &self.methods)
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let methods: Vec<&str> = self.methods.iter().map(Method::as_str).collect();
        write!(f, "{} {}", methods.join(","), self.template())
    }
}

impl Route {
    pub(crate) fn static_files<F>(files: StaticFiles, handler: F) -> Self
    where
        F: Fn(&mut Context<'_>, &Params) -> HandlerResult<Reply> + Send + Sync + 'static,
    {
        Self {
            matcher: Matcher::Static(files),
            methods: vec![Method::Get],
            handler: Arc::new(handler),
            view: None,
        }
    }

    /// Returns the template (or static prefix) this route matches.
    pub fn template(&self) -> &str {
        match &self.matcher {
            Matcher::Pattern(pattern) => pattern.template(),
            Matcher::Static(files) => files.prefix(),
        }
    }

    /// Returns the compiled pattern, if this is a placeholder route.
    pub fn pattern(&self) -> Option<&PathPattern> {
        match &self.matcher {
            Matcher::Pattern(pattern) => Some(pattern),
            Matcher::Static(_) => None,
        }
    }

    /// Returns the methods this route serves.
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Returns whether this route serves `method`.
    pub fn accepts(&self, method: Method) -> bool {
        self.methods.contains(&method)
    }

    /// Returns the declared view name.
    pub fn view(&self) -> Option<&str> {
        self.view.as_deref()
    }

    /// Matches a request path, returning its parameters.
    pub fn match_path(&self, path: &str) -> Option<Params> {
        match &self.matcher {
            Matcher::Pattern(pattern) => pattern
                .match_path(path)
                .map(|values| Params::new(pattern.param_names().to_vec(), values)),
            Matcher::Static(files) => files
                .match_path(path)
                .map(|values| Params::new(vec!["path".to_string()], values)),
        }
    }

    /// Invokes the handler.
    pub fn call(&self, ctx: &mut Context<'_>, params: &Params) -> HandlerResult<Reply> {
        (self.handler)(ctx, params)
    }
}

/// A declarative route record, turned into a [`Route`] at registration.
///
/// ```
/// use oxide_web::{Context, Params, HandlerResult, Method, Reply, RouteDef};
///
/// fn hello(_ctx: &mut Context<'_>, params: &Params) -> HandlerResult<Reply> {
///     Ok(format!("hello {}", &params[0]).into())
/// }
///
/// let routes = vec![
///     RouteDef::get("/hello/<name>", hello),
///     RouteDef::new("/form")
///         .methods(&[Method::Get, Method::Post])
///         .view("form.html")
///         .handler(|_ctx, _params| Ok(Reply::Data(Default::default()))),
/// ];
/// assert_eq!(routes.len(), 2);
/// ```
pub struct RouteDef {
    template: String,
    methods: Vec<Method>,
    view: Option<String>,
    handler: Option<Handler>,
}

impl fmt::Debug for RouteDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDef")
            .field("template", &self.template)
            .field("methods", &self.methods)
            .field("view", &self.view)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

impl RouteDef {
    /// Starts a definition for `template`, serving GET by default.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            methods: vec![Method::Get],
            view: None,
            handler: None,
        }
    }

    /// A GET route.
    pub fn get<F>(template: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Context<'_>, &Params) -> HandlerResult<Reply> + Send + Sync + 'static,
    {
        Self::new(template).handler(handler)
    }

    /// A POST route.
    pub fn post<F>(template: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Context<'_>, &Params) -> HandlerResult<Reply> + Send + Sync + 'static,
    {
        Self::new(template).methods(&[Method::Post]).handler(handler)
    }

    /// Sets the served methods. An empty list means GET.
    #[must_use]
    pub fn methods(mut self, methods: &[Method]) -> Self {
        self.methods = if methods.is_empty() {
            vec![Method::Get]
        } else {
            methods.to_vec()
        };
        self
    }

    /// Declares the view rendering this route's data.
    #[must_use]
    pub fn view(mut self, name: impl Into<String>) -> Self {
        self.view = Some(name.into());
        self
    }

    /// Sets the handler.
    #[must_use]
    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut Context<'_>, &Params) -> HandlerResult<Reply> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Returns the template.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Validates the definition and compiles its pattern.
    pub fn build(self) -> Result<Route> {
        if let Some(method) = self
            .methods
            .iter()
            .find(|m| !matches!(m, Method::Get | Method::Post))
        {
            return Err(WebError::UnsupportedMethod {
                method: method.to_string(),
                template: self.template,
            });
        }
        let Some(handler) = self.handler else {
            return Err(WebError::MissingHandler(self.template));
        };
        let pattern = PathPattern::compile(&self.template)?;

        let mut methods = self.methods;
        methods.dedup();

        Ok(Route {
            matcher: Matcher::Pattern(pattern),
            methods,
            handler,
            view: self.view,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_ctx: &mut Context<'_>, _params: &Params) -> HandlerResult<Reply> {
        Ok(Reply::Empty)
    }

    #[test]
    fn test_build_defaults_to_get() {
        let route = RouteDef::new("/").handler(noop).build().unwrap();
        assert_eq!(route.methods(), &[Method::Get]);
        assert!(route.accepts(Method::Get));
        assert!(!route.accepts(Method::Post));
        assert_eq!(route.view(), None);
        assert_eq!(route.to_string(), "GET /");
    }

    #[test]
    fn test_build_rejects_other_methods() {
        let err = RouteDef::new("/x")
            .methods(&[Method::Get, Method::Put])
            .handler(noop)
            .build()
            .unwrap_err();
        assert!(matches!(err, WebError::UnsupportedMethod { ref method, .. } if method == "PUT"));
    }

    #[test]
    fn test_build_requires_handler() {
        let err = RouteDef::new("/x").build().unwrap_err();
        assert!(matches!(err, WebError::MissingHandler(ref t) if t == "/x"));
    }

    #[test]
    fn test_build_rejects_bad_template() {
        assert!(RouteDef::get("/<a>/<a>", noop).build().is_err());
    }

    #[test]
    fn test_match_params() {
        let route = RouteDef::post("/user/<name>/<group>", noop)
            .view("user.html")
            .build()
            .unwrap();
        assert_eq!(route.methods(), &[Method::Post]);
        assert_eq!(route.view(), Some("user.html"));

        let params = route.match_path("/user/alice/admins").unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(&params[0], "alice");
        assert_eq!(params.get(1), Some("admins"));
        assert_eq!(params.named("group"), Some("admins"));
        assert_eq!(params.get(2), None);
        assert!(route.match_path("/user/alice").is_none());
    }

    #[test]
    fn test_params_parse() {
        let params = Params::new(vec!["id".into()], vec!["42".into()]);
        assert_eq!(params.parse::<u32>(0), Some(42));
        assert_eq!(params.parse::<u32>(1), None);
        assert_eq!(params.iter().collect::<Vec<_>>(), vec!["42"]);
    }

    #[test]
    fn test_static_route() {
        let route = Route::static_files(StaticFiles::new("/static/"), noop);
        assert_eq!(route.template(), "/static/");
        assert!(route.pattern().is_none());
        let params = route.match_path("/static/a/b.css").unwrap();
        assert_eq!(params.named("path"), Some("static/a/b.css"));
    }
}
