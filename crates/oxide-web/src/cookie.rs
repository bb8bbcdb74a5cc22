//! `Set-Cookie` directive construction.

use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left unescaped in cookie names and values.
const COOKIE_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Percent-encodes a cookie name or value.
pub fn encode(value: &str) -> String {
    utf8_percent_encode(value, COOKIE_ENCODE).to_string()
}

/// A cookie to be sent with a response.
///
/// # Example
///
/// ```
/// use oxide_web::Cookie;
///
/// let cookie = Cookie::new("theme", "dark mode").max_age(3600);
/// assert_eq!(
///     cookie.to_header_value(),
///     "theme=dark%20mode; Max-Age=3600; Path=/; HttpOnly"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    max_age: Option<i64>,
    expires: Option<DateTime<Utc>>,
    path: String,
    domain: Option<String>,
    secure: bool,
    http_only: bool,
}

impl Cookie {
    /// Creates a cookie with path `/` and `HttpOnly` set.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age: None,
            expires: None,
            path: "/".to_string(),
            domain: None,
            secure: false,
            http_only: true,
        }
    }

    /// Sets `Max-Age` in seconds. Ignored when `expires` is also set.
    #[must_use]
    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Sets an absolute expiry.
    #[must_use]
    pub fn expires(mut self, at: DateTime<Utc>) -> Self {
        self.expires = Some(at);
        self
    }

    /// Sets an absolute expiry from a unix timestamp in seconds.
    ///
    /// Out-of-range timestamps leave the expiry unset.
    #[must_use]
    pub fn expires_at_timestamp(mut self, secs: i64) -> Self {
        self.expires = DateTime::from_timestamp(secs, 0);
        self
    }

    /// Sets the cookie path.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the cookie domain.
    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the `Secure` flag.
    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Sets the `HttpOnly` flag.
    #[must_use]
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Returns the (unencoded) cookie name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the (unencoded) cookie value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Renders the `Set-Cookie` header value.
    pub fn to_header_value(&self) -> String {
        let mut parts = vec![format!("{}={}", encode(&self.name), encode(&self.value))];

        if let Some(expires) = self.expires {
            parts.push(format!(
                "Expires={}",
                expires.format("%a, %d-%b-%Y %H:%M:%S GMT")
            ));
        } else if let Some(max_age) = self.max_age {
            parts.push(format!("Max-Age={max_age}"));
        }

        parts.push(format!("Path={}", self.path));
        if let Some(domain) = &self.domain {
            parts.push(format!("Domain={domain}"));
        }
        if self.secure {
            parts.push("Secure".to_string());
        }
        if self.http_only {
            parts.push("HttpOnly".to_string());
        }

        parts.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_defaults() {
        let cookie = Cookie::new("a", "b");
        assert_eq!(cookie.to_header_value(), "a=b; Path=/; HttpOnly");
    }

    #[test]
    fn test_max_age() {
        let cookie = Cookie::new("sessionid", "abc").max_age(3600);
        assert_eq!(
            cookie.to_header_value(),
            "sessionid=abc; Max-Age=3600; Path=/; HttpOnly"
        );
    }

    #[test]
    fn test_expires_wins_over_max_age() {
        let at = Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap();
        let cookie = Cookie::new("a", "b").max_age(10).expires(at);
        assert_eq!(
            cookie.to_header_value(),
            "a=b; Expires=Wed, 21-Oct-2015 07:28:00 GMT; Path=/; HttpOnly"
        );
    }

    #[test]
    fn test_expires_from_timestamp() {
        let cookie = Cookie::new("a", "b").expires_at_timestamp(0);
        assert!(cookie
            .to_header_value()
            .contains("Expires=Thu, 01-Jan-1970 00:00:00 GMT"));
    }

    #[test]
    fn test_all_flags() {
        let cookie = Cookie::new("a", "b")
            .path("/app")
            .domain("example.com")
            .secure(true)
            .http_only(false);
        assert_eq!(
            cookie.to_header_value(),
            "a=b; Path=/app; Domain=example.com; Secure"
        );
    }

    #[test]
    fn test_value_is_percent_encoded() {
        let cookie = Cookie::new("user name", "a;b=c ü");
        assert_eq!(
            cookie.to_header_value(),
            "user%20name=a%3Bb%3Dc%20%C3%BC; Path=/; HttpOnly"
        );
    }
}
