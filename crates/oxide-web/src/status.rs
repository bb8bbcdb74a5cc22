//! Status codes, reason phrases and canonical response header names.

use std::sync::LazyLock;

use regex::Regex;

/// Header appended last to every finalized response.
pub const POWERED_BY: (&str, &str) = ("X-Powered-By", "oxide-web/0.1");

static STATUS_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3}\s.*$").expect("Invalid status line regex"));

/// Returns the reason phrase for a known status code.
pub fn reason_phrase(code: u16) -> Option<&'static str> {
    let phrase = match code {
        // Informational
        100 => "Continue",
        101 => "Switching Protocols",
        102 => "Processing",

        // Successful
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        207 => "Multi-Status",
        226 => "IM Used",

        // Redirection
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",

        // Client error
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Request Entity Too Large",
        414 => "Request URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Requested Range Not Satisfiable",
        417 => "Expectation Failed",
        418 => "I'm a teapot",
        422 => "Unprocessable Entity",
        423 => "Locked",
        424 => "Failed Dependency",
        426 => "Upgrade Required",

        // Server error
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        507 => "Insufficient Storage",
        510 => "Not Extended",
        _ => return None,
    };
    Some(phrase)
}

/// Formats a status line such as `404 Not Found`.
///
/// Codes missing from the table render as the bare number.
pub fn status_line(code: u16) -> String {
    match reason_phrase(code) {
        Some(phrase) => format!("{code} {phrase}"),
        None => code.to_string(),
    }
}

/// Returns whether `line` looks like `NNN reason`.
pub fn is_valid_status_line(line: &str) -> bool {
    STATUS_LINE.is_match(line)
}

const RESPONSE_HEADERS: &[&str] = &[
    "Accept-Ranges",
    "Age",
    "Allow",
    "Cache-Control",
    "Connection",
    "Content-Encoding",
    "Content-Language",
    "Content-Length",
    "Content-Location",
    "Content-MD5",
    "Content-Disposition",
    "Content-Range",
    "Content-Type",
    "Date",
    "ETag",
    "Expires",
    "Last-Modified",
    "Link",
    "Location",
    "P3P",
    "Pragma",
    "Proxy-Authenticate",
    "Refresh",
    "Retry-After",
    "Server",
    "Set-Cookie",
    "Strict-Transport-Security",
    "Trailer",
    "Transfer-Encoding",
    "Vary",
    "Via",
    "Warning",
    "WWW-Authenticate",
    "X-Frame-Options",
    "X-XSS-Protection",
    "X-Content-Type-Options",
    "X-Forwarded-Proto",
    "X-Powered-By",
    "X-UA-Compatible",
];

/// Maps a header name to its canonical spelling when it is a known
/// response header; unknown names are returned verbatim.
pub fn canonical_header(name: &str) -> String {
    RESPONSE_HEADERS
        .iter()
        .find(|known| known.eq_ignore_ascii_case(name))
        .map_or_else(|| name.to_string(), |known| (*known).to_string())
}
