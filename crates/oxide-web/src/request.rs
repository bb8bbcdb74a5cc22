//! Gateway environment and the request view handed to handlers.

use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::io::{Cursor, Read};

use multipart::server::Multipart;
use percent_encoding::percent_decode_str;
use url::form_urlencoded;

use crate::error::RequestError;
use crate::session::{Session, SessionStore, SESSION_COOKIE};

/// HTTP request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET method
    Get,
    /// POST method
    Post,
    /// PUT method
    Put,
    /// PATCH method
    Patch,
    /// DELETE method
    Delete,
    /// HEAD method
    Head,
    /// OPTIONS method
    Options,
}

impl Method {
    /// Parses an upper-case method name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }

    /// Returns the method as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The request descriptor a gateway hands to the dispatcher.
///
/// Variables follow the CGI naming scheme: `REQUEST_METHOD`, `PATH_INFO`,
/// `QUERY_STRING`, `CONTENT_TYPE`, `CONTENT_LENGTH`, `REMOTE_ADDR` and one
/// `HTTP_*` entry per request header.
pub struct Environ {
    vars: HashMap<String, String>,
    input: Box<dyn Read + Send>,
}

impl std::fmt::Debug for Environ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environ")
            .field("vars", &self.vars)
            .finish_non_exhaustive()
    }
}

impl Environ {
    /// Creates an environment for `method` and a raw (still encoded) target.
    ///
    /// Anything after a `?` in `target` becomes the query string.
    pub fn new(method: &str, target: &str) -> Self {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        let vars = [
            ("REQUEST_METHOD".to_string(), method.to_string()),
            ("PATH_INFO".to_string(), path.to_string()),
            ("QUERY_STRING".to_string(), query.to_string()),
        ]
        .into_iter()
        .collect();
        Self {
            vars,
            input: Box::new(std::io::empty()),
        }
    }

    /// Creates a GET environment.
    pub fn get(path: &str) -> Self {
        Self::new("GET", path)
    }

    /// Creates a POST environment.
    pub fn post(path: &str) -> Self {
        Self::new("POST", path)
    }

    /// Sets the raw query string.
    #[must_use]
    pub fn query(self, query: impl Into<String>) -> Self {
        self.var("QUERY_STRING", query)
    }

    /// Adds a request header, translating its name to the gateway form.
    ///
    /// Repeated headers are joined, cookies with `; ` and everything else
    /// with `, `.
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        let key = match name.to_ascii_uppercase().replace('-', "_") {
            k if k == "CONTENT_TYPE" || k == "CONTENT_LENGTH" => k,
            k => format!("HTTP_{k}"),
        };
        let value = value.into();
        let separator = if key == "HTTP_COOKIE" { "; " } else { ", " };
        self.vars
            .entry(key)
            .and_modify(|existing| {
                existing.push_str(separator);
                existing.push_str(&value);
            })
            .or_insert(value);
        self
    }

    /// Sets the client address.
    #[must_use]
    pub fn remote_addr(self, addr: impl Into<String>) -> Self {
        self.var("REMOTE_ADDR", addr)
    }

    /// Sets an arbitrary environment variable.
    #[must_use]
    pub fn var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Sets an in-memory body and its `CONTENT_LENGTH`.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        self.vars
            .insert("CONTENT_LENGTH".to_string(), body.len().to_string());
        self.input = Box::new(Cursor::new(body));
        self
    }

    /// Sets a streaming body.
    #[must_use]
    pub fn input(mut self, reader: impl Read + Send + 'static) -> Self {
        self.input = Box::new(reader);
        self
    }

    /// Gets an environment variable.
    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

/// An uploaded file from a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartFile {
    filename: String,
    content_type: Option<String>,
    data: Vec<u8>,
}

impl MultipartFile {
    /// Creates a file value.
    pub fn new(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            data: data.into(),
        }
    }

    /// Returns the client-supplied filename.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Returns the declared content type of the part, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns the file contents.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns a reader over the file contents.
    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(&self.data)
    }
}

/// A single input value: plain text or an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputValue {
    /// A text field or query parameter.
    Text(String),
    /// A multipart part that carried a filename.
    File(MultipartFile),
}

impl InputValue {
    /// Returns the text value, if this is not a file.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::File(_) => None,
        }
    }

    /// Returns the file, if this is one.
    pub fn as_file(&self) -> Option<&MultipartFile> {
        match self {
            Self::File(f) => Some(f),
            Self::Text(_) => None,
        }
    }
}

impl From<&str> for InputValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for InputValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// All values parsed from the query string and body, keyed by field name.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    fields: HashMap<String, Vec<InputValue>>,
}

impl FormData {
    fn push(&mut self, key: String, value: InputValue) {
        self.fields.entry(key).or_default().push(value);
    }

    /// Returns the first value for `key`.
    pub fn get(&self, key: &str) -> Option<&InputValue> {
        self.fields.get(key).and_then(|values| values.first())
    }

    /// Returns every value for `key`, in arrival order.
    pub fn get_all(&self, key: &str) -> &[InputValue] {
        self.fields.get(key).map_or(&[], Vec::as_slice)
    }

    /// Returns whether `key` was submitted.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Returns the submitted field names.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Single-valued input merged onto caller defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Input {
    values: HashMap<String, InputValue>,
}

impl Input {
    /// Returns the value for `key`.
    pub fn get(&self, key: &str) -> Option<&InputValue> {
        self.values.get(key)
    }

    /// Returns the text value for `key`.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(InputValue::as_text)
    }

    /// Returns the file for `key`.
    pub fn file(&self, key: &str) -> Option<&MultipartFile> {
        self.get(key).and_then(InputValue::as_file)
    }

    /// Returns whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over the entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &InputValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// An HTTP request.
///
/// Headers, cookies, the body and parsed input are computed on first use
/// and cached for the rest of the request.
pub struct Request {
    vars: HashMap<String, String>,
    input: RefCell<Option<Box<dyn Read + Send>>>,
    body: OnceCell<Vec<u8>>,
    form: OnceCell<FormData>,
    headers: OnceCell<HashMap<String, String>>,
    cookies: OnceCell<HashMap<String, String>>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method_str())
            .field("path", &self.path())
            .finish_non_exhaustive()
    }
}

impl From<Environ> for Request {
    fn from(environ: Environ) -> Self {
        Self::new(environ)
    }
}

impl Request {
    /// Wraps a gateway environment.
    pub fn new(environ: Environ) -> Self {
        Self {
            vars: environ.vars,
            input: RefCell::new(Some(environ.input)),
            body: OnceCell::new(),
            form: OnceCell::new(),
            headers: OnceCell::new(),
            cookies: OnceCell::new(),
        }
    }

    /// Gets a raw environment variable.
    pub fn environ(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Returns the request method as sent.
    pub fn method_str(&self) -> &str {
        self.environ("REQUEST_METHOD").unwrap_or("")
    }

    /// Returns the parsed request method.
    pub fn method(&self) -> Option<Method> {
        Method::parse(self.method_str())
    }

    /// Returns the percent-decoded request path.
    pub fn path(&self) -> String {
        let raw = self.environ("PATH_INFO").unwrap_or("");
        percent_decode_str(raw).decode_utf8_lossy().into_owned()
    }

    /// Returns the raw query string, or `""`.
    pub fn query_string(&self) -> &str {
        self.environ("QUERY_STRING").unwrap_or("")
    }

    /// Returns the client address, or `0.0.0.0` when unknown.
    pub fn remote_addr(&self) -> &str {
        self.environ("REMOTE_ADDR").unwrap_or("0.0.0.0")
    }

    /// Returns the `Host` header, or `""`.
    pub fn host(&self) -> &str {
        self.environ("HTTP_HOST").unwrap_or("")
    }

    /// Returns the `DOCUMENT_ROOT` variable, or `""`.
    pub fn document_root(&self) -> &str {
        self.environ("DOCUMENT_ROOT").unwrap_or("")
    }

    /// Returns the request content type.
    pub fn content_type(&self) -> Option<&str> {
        self.environ("CONTENT_TYPE")
    }

    /// Returns the declared body length.
    pub fn content_length(&self) -> Option<u64> {
        self.environ("CONTENT_LENGTH")
            .and_then(|v| v.trim().parse().ok())
    }

    /// Returns all headers, keyed by upper-case hyphenated name
    /// (`ACCEPT-ENCODING`).
    pub fn headers(&self) -> &HashMap<String, String> {
        self.headers.get_or_init(|| {
            self.vars
                .iter()
                .filter_map(|(k, v)| {
                    let name = match k.strip_prefix("HTTP_") {
                        Some(name) => name,
                        None if k == "CONTENT_TYPE" || k == "CONTENT_LENGTH" => k.as_str(),
                        None => return None,
                    };
                    Some((name.replace('_', "-").to_ascii_uppercase(), v.clone()))
                })
                .collect()
        })
    }

    /// Gets a header value; the name is case-insensitive and may use `-`
    /// or `_`.
    pub fn header(&self, name: &str) -> Option<&str> {
        let key = name.replace('_', "-").to_ascii_uppercase();
        self.headers().get(&key).map(String::as_str)
    }

    /// Returns all cookies sent with the request.
    pub fn cookies(&self) -> &HashMap<String, String> {
        self.cookies.get_or_init(|| {
            let mut cookies = HashMap::new();
            if let Some(raw) = self.environ("HTTP_COOKIE") {
                for pair in raw.split(';') {
                    let Some(pos) = pair.find('=') else { continue };
                    let name = pair[..pos].trim();
                    if name.is_empty() {
                        continue;
                    }
                    let value = percent_decode_str(pair[pos + 1..].trim())
                        .decode_utf8_lossy()
                        .into_owned();
                    cookies.insert(name.to_string(), value);
                }
            }
            cookies
        })
    }

    /// Gets a cookie value.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies().get(name).map(String::as_str)
    }

    /// Returns the session named by the request's `sessionid` cookie.
    ///
    /// This never creates a session; see
    /// [`Response::session`](crate::Response::session) for that.
    pub fn session(&self, store: &SessionStore) -> Option<Session> {
        self.cookie(SESSION_COOKIE).and_then(|id| store.get(id))
    }

    /// Returns the raw body.
    ///
    /// The gateway input is consumed on first call, bounded by
    /// `CONTENT_LENGTH` when present.
    pub fn body(&self) -> Result<&[u8], RequestError> {
        if let Some(body) = self.body.get() {
            return Ok(body);
        }

        let mut buf = Vec::new();
        let reader = self.input.borrow_mut().take();
        if let Some(reader) = reader {
            let limit = self.content_length().unwrap_or(u64::MAX);
            reader.take(limit).read_to_end(&mut buf)?;
        }
        Ok(self.body.get_or_init(|| buf))
    }

    /// Returns every input value from the query string and, for POST
    /// requests, a form-encoded or multipart body.
    ///
    /// Parsing happens once per request.
    pub fn form(&self) -> Result<&FormData, RequestError> {
        if let Some(form) = self.form.get() {
            return Ok(form);
        }
        let form = self.parse_form()?;
        Ok(self.form.get_or_init(|| form))
    }

    /// Returns the first value for `key`.
    pub fn get(&self, key: &str) -> Result<Option<&InputValue>, RequestError> {
        Ok(self.form()?.get(key))
    }

    /// Returns the first text value for `key`, or `default`.
    pub fn get_or(&self, key: &str, default: &str) -> Result<String, RequestError> {
        Ok(self
            .form()?
            .get(key)
            .and_then(InputValue::as_text)
            .unwrap_or(default)
            .to_string())
    }

    /// Returns every value for `key`.
    pub fn get_all(&self, key: &str) -> Result<&[InputValue], RequestError> {
        Ok(self.form()?.get_all(key))
    }

    /// Returns the input as single values merged onto `defaults`.
    ///
    /// Submitted keys override defaults; keys submitted more than once
    /// keep their first value.
    ///
    /// ```
    /// use oxide_web::{Environ, Request};
    ///
    /// let req = Request::new(Environ::get("/").query("name=bob&name=eve"));
    /// let input = req.input(&[("role", "guest")]).unwrap();
    /// assert_eq!(input.text("role"), Some("guest"));
    /// assert_eq!(input.text("name"), Some("bob"));
    /// ```
    pub fn input(&self, defaults: &[(&str, &str)]) -> Result<Input, RequestError> {
        let mut values: HashMap<String, InputValue> = defaults
            .iter()
            .map(|(k, v)| ((*k).to_string(), InputValue::from(*v)))
            .collect();

        let form = self.form()?;
        for (key, list) in &form.fields {
            if let Some(first) = list.first() {
                values.insert(key.clone(), first.clone());
            }
        }

        Ok(Input { values })
    }

    fn parse_form(&self) -> Result<FormData, RequestError> {
        let mut form = FormData::default();

        for (key, value) in form_urlencoded::parse(self.query_string().as_bytes()) {
            form.push(key.into_owned(), InputValue::Text(value.into_owned()));
        }

        if self.method() != Some(Method::Post) {
            return Ok(form);
        }

        let content_type = self.content_type().unwrap_or("");
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        match mime.as_str() {
            "application/x-www-form-urlencoded" => {
                for (key, value) in form_urlencoded::parse(self.body()?) {
                    form.push(key.into_owned(), InputValue::Text(value.into_owned()));
                }
            }
            "multipart/form-data" => {
                let boundary = multipart_boundary(content_type).ok_or_else(|| {
                    RequestError::Malformed("missing multipart boundary".to_string())
                })?;
                parse_multipart(self.body()?, &boundary, &mut form)?;
            }
            _ => {}
        }

        Ok(form)
    }
}

fn multipart_boundary(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("boundary")
            .then(|| value.trim().trim_matches('"').to_string())
            .filter(|b| !b.is_empty())
    })
}

fn parse_multipart(body: &[u8], boundary: &str, form: &mut FormData) -> Result<(), RequestError> {
    let mut multipart = Multipart::with_body(body, boundary);

    while let Some(mut field) = multipart
        .read_entry()
        .map_err(|e| RequestError::Malformed(e.to_string()))?
    {
        let mut data = Vec::new();
        field.data.read_to_end(&mut data)?;

        let name = field.headers.name.to_string();
        let value = match field.headers.filename.take() {
            Some(filename) => InputValue::File(MultipartFile {
                filename,
                content_type: field.headers.content_type.as_ref().map(ToString::to_string),
                data,
            }),
            None => InputValue::Text(String::from_utf8_lossy(&data).into_owned()),
        };
        form.push(name, value);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing() {
        assert_eq!(Method::parse("GET"), Some(Method::Get));
        assert_eq!(Method::parse("POST"), Some(Method::Post));
        assert_eq!(Method::parse("post"), None);
        assert_eq!(Method::parse("INVALID"), None);
    }

    #[test]
    fn test_basic_accessors() {
        let req = Request::new(
            Environ::get("/hello%20world")
                .query("a=1")
                .remote_addr("10.0.0.1")
                .header("Host", "example.com"),
        );
        assert_eq!(req.method(), Some(Method::Get));
        assert_eq!(req.path(), "/hello world");
        assert_eq!(req.query_string(), "a=1");
        assert_eq!(req.remote_addr(), "10.0.0.1");
        assert_eq!(req.host(), "example.com");
        assert_eq!(req.document_root(), "");
    }

    #[test]
    fn test_defaults_when_missing() {
        let req = Request::new(Environ::get("/"));
        assert_eq!(req.remote_addr(), "0.0.0.0");
        assert_eq!(req.query_string(), "");
        assert!(req.cookies().is_empty());
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let req = Request::new(
            Environ::get("/")
                .header("Accept-Encoding", "gzip")
                .header("User-Agent", "test")
                .header("Content-Type", "text/plain"),
        );
        assert_eq!(req.header("accept-encoding"), Some("gzip"));
        assert_eq!(req.header("USER_AGENT"), Some("test"));
        assert_eq!(req.header("content-type"), Some("text/plain"));
        assert_eq!(req.headers().get("ACCEPT-ENCODING"), Some(&"gzip".to_string()));
        assert_eq!(req.header("x-missing"), None);
    }

    #[test]
    fn test_cookie_parsing() {
        let req = Request::new(
            Environ::get("/")
                .header("Cookie", "theme=light; sessionToken=abc123")
                .header("Cookie", "name=J%C3%BCrgen; broken; =nameless"),
        );
        assert_eq!(req.cookie("theme"), Some("light"));
        assert_eq!(req.cookie("sessionToken"), Some("abc123"));
        assert_eq!(req.cookie("name"), Some("Jürgen"));
        assert_eq!(req.cookies().len(), 3);
    }

    #[test]
    fn test_query_input() {
        let req = Request::new(Environ::get("/").query("name=John+Doe&tag=a&tag=b&empty="));
        assert_eq!(req.get_or("name", "").unwrap(), "John Doe");
        assert_eq!(req.get_or("missing", "fallback").unwrap(), "fallback");
        assert_eq!(
            req.get_all("tag").unwrap(),
            &[InputValue::from("a"), InputValue::from("b")]
        );
        assert_eq!(req.get("empty").unwrap(), Some(&InputValue::from("")));
    }

    #[test]
    fn test_input_defaults() {
        let req = Request::new(Environ::get("/").query("firstname=Ada&tag=x&tag=y"));
        let input = req.input(&[("firstname", "none"), ("lastname", "none")]).unwrap();
        assert_eq!(input.text("firstname"), Some("Ada"));
        assert_eq!(input.text("lastname"), Some("none"));
        assert_eq!(input.text("tag"), Some("x"));
        assert_eq!(input.len(), 3);
    }

    #[test]
    fn test_urlencoded_body() {
        let req = Request::new(
            Environ::post("/register")
                .query("source=web")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body("firstname=Grace&lastname=Hopper%21"),
        );
        let input = req.input(&[]).unwrap();
        assert_eq!(input.text("firstname"), Some("Grace"));
        assert_eq!(input.text("lastname"), Some("Hopper!"));
        assert_eq!(input.text("source"), Some("web"));
    }

    #[test]
    fn test_get_ignores_body() {
        let req = Request::new(
            Environ::get("/")
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body("a=1"),
        );
        assert!(!req.form().unwrap().contains("a"));
        assert_eq!(req.body().unwrap(), b"a=1");
    }

    #[test]
    fn test_body_is_read_once() {
        let req = Request::new(Environ::post("/").body("payload"));
        assert_eq!(req.body().unwrap(), b"payload");
        assert_eq!(req.body().unwrap(), b"payload");
    }

    #[test]
    fn test_body_bounded_by_content_length() {
        let req = Request::new(
            Environ::post("/")
                .input(Cursor::new(b"abcdef".to_vec()))
                .var("CONTENT_LENGTH", "3"),
        );
        assert_eq!(req.body().unwrap(), b"abc");
    }

    #[test]
    fn test_multipart_body() {
        let body = "--XyZ\r\n\
            Content-Disposition: form-data; name=\"title\"\r\n\
            \r\n\
            Report\r\n\
            --XyZ\r\n\
            Content-Disposition: form-data; name=\"upload\"; filename=\"report.txt\"\r\n\
            Content-Type: text/plain\r\n\
            \r\n\
            hello file\r\n\
            --XyZ--\r\n";
        let req = Request::new(
            Environ::post("/upload")
                .header("Content-Type", "multipart/form-data; boundary=XyZ")
                .body(body),
        );

        let input = req.input(&[]).unwrap();
        assert_eq!(input.text("title"), Some("Report"));
        let file = input.file("upload").unwrap();
        assert_eq!(file.filename(), "report.txt");
        assert_eq!(file.bytes(), b"hello file");
        assert_eq!(file.content_type(), Some("text/plain"));
    }

    #[test]
    fn test_multipart_without_boundary_is_malformed() {
        let req = Request::new(
            Environ::post("/upload")
                .header("Content-Type", "multipart/form-data")
                .body("irrelevant"),
        );
        assert!(matches!(req.form(), Err(RequestError::Malformed(_))));
    }

    #[test]
    fn test_boundary_parsing() {
        assert_eq!(
            multipart_boundary("multipart/form-data; boundary=\"abc\""),
            Some("abc".to_string())
        );
        assert_eq!(
            multipart_boundary("multipart/form-data; charset=utf-8; BOUNDARY=x1"),
            Some("x1".to_string())
        );
        assert_eq!(multipart_boundary("multipart/form-data"), None);
    }

    #[test]
    fn test_session_lookup_never_creates() {
        let store = SessionStore::new();
        let req = Request::new(Environ::get("/").header("Cookie", "sessionid=unknown"));
        assert!(req.session(&store).is_none());
        assert!(store.is_empty());

        let existing = store.get_or_create("known");
        existing.set("k", 1);
        let req = Request::new(Environ::get("/").header("Cookie", "sessionid=known"));
        let session = req.session(&store).unwrap();
        assert!(Session::ptr_eq(&existing, &session));
    }
}
