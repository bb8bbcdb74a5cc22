//! Path template compilation and matching.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, WebError};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<([a-zA-Z_]\w*)>").expect("Invalid placeholder regex"));

/// A segment in a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Literal text, matched exactly.
    Literal(String),
    /// A named placeholder (e.g. `<id>`) matching one or more non-`/` characters.
    Param(String),
}

/// A compiled path template.
#[derive(Debug, Clone)]
pub struct PathPattern {
    /// The original template string.
    template: String,
    /// Parsed segments, in template order.
    segments: Vec<PathSegment>,
    /// Anchored regex used for matching.
    regex: Regex,
    /// Placeholder names in declaration order.
    param_names: Vec<String>,
}

impl PathPattern {
    /// Compiles a path template.
    ///
    /// Template syntax:
    /// - `/users` - literal path
    /// - `/users/<name>` - placeholder capturing one path segment
    /// - `/<user>/<comment>/list` - several placeholders, captured in order
    ///
    /// Every character outside a placeholder is escaped, so `.` or `+` in a
    /// literal only ever match themselves.
    ///
    /// # Example
    ///
    /// ```
    /// use oxide_web::PathPattern;
    ///
    /// let pattern = PathPattern::compile("/<user>/<comment>/list").unwrap();
    /// let params = pattern.match_path("/alice/42/list").unwrap();
    /// assert_eq!(params, vec!["alice", "42"]);
    /// ```
    pub fn compile(template: &str) -> Result<Self> {
        let mut segments: Vec<PathSegment> = Vec::new();
        let mut param_names: Vec<String> = Vec::new();
        let mut regex_str = String::from("^");

        let mut rest = template;
        while !rest.is_empty() {
            if let Some(caps) = PLACEHOLDER.captures(rest) {
                let name = caps[1].to_string();
                if param_names.contains(&name) {
                    return Err(WebError::InvalidTemplate {
                        template: template.to_string(),
                        reason: format!("duplicate placeholder <{name}>"),
                    });
                }
                regex_str.push_str("([^/]+)");
                segments.push(PathSegment::Param(name.clone()));
                param_names.push(name);
                rest = &rest[caps[0].len()..];
                continue;
            }

            let mut chars = rest.chars();
            let Some(ch) = chars.next() else { break };
            if ch.is_ascii_alphanumeric() {
                regex_str.push(ch);
            } else {
                regex_str.push_str(&regex::escape(ch.encode_utf8(&mut [0; 4])));
            }
            match segments.last_mut() {
                Some(PathSegment::Literal(lit)) => lit.push(ch),
                _ => segments.push(PathSegment::Literal(ch.to_string())),
            }
            rest = chars.as_str();
        }

        regex_str.push('$');

        let regex = Regex::new(&regex_str).map_err(|e| WebError::InvalidTemplate {
            template: template.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            template: template.to_string(),
            segments,
            regex,
            param_names,
        })
    }

    /// Matches a concrete path against this pattern.
    ///
    /// Returns the captured values in declaration order, or `None` if the
    /// whole path does not match.
    pub fn match_path(&self, path: &str) -> Option<Vec<String>> {
        let caps = self.regex.captures(path)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|m| m.map_or_else(String::new, |m| m.as_str().to_string()))
                .collect(),
        )
    }

    /// Returns the original template string.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Returns the parsed segments.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns the placeholder names in declaration order.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Returns whether the template has no placeholders.
    pub fn is_static(&self) -> bool {
        self.param_names.is_empty()
    }

    /// Builds a concrete path from positional parameter values.
    ///
    /// Returns `None` when the number of values does not match the number
    /// of placeholders.
    ///
    /// ```
    /// use oxide_web::PathPattern;
    ///
    /// let pattern = PathPattern::compile("/user/<name>").unwrap();
    /// assert_eq!(pattern.reverse(&["bob"]), Some("/user/bob".to_string()));
    /// ```
    pub fn reverse<S: AsRef<str>>(&self, params: &[S]) -> Option<String> {
        if params.len() != self.param_names.len() {
            return None;
        }

        let mut values = params.iter();
        let mut path = String::new();
        for segment in &self.segments {
            match segment {
                PathSegment::Literal(s) => path.push_str(s),
                PathSegment::Param(_) => path.push_str(values.next()?.as_ref()),
            }
        }
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(template: &str) -> PathPattern {
        PathPattern::compile(template).unwrap()
    }

    #[test]
    fn test_literal_path() {
        let pattern = compile("/register");
        assert!(pattern.is_static());
        assert_eq!(pattern.match_path("/register"), Some(vec![]));
        assert!(pattern.match_path("/register/").is_none());
        assert!(pattern.match_path("/registers").is_none());
    }

    #[test]
    fn test_single_param() {
        let pattern = compile("/path/to/<file>");
        assert_eq!(
            pattern.match_path("/path/to/report.pdf"),
            Some(vec!["report.pdf".to_string()])
        );
        assert!(pattern.match_path("/path/to/a/b").is_none());
        assert!(pattern.match_path("/path/to/").is_none());
    }

    #[test]
    fn test_multiple_params_in_order() {
        let pattern = compile("/<user>/<comment>/list");
        assert_eq!(pattern.param_names(), ["user", "comment"]);
        assert_eq!(
            pattern.match_path("/alice/42/list"),
            Some(vec!["alice".to_string(), "42".to_string()])
        );
        assert!(pattern.match_path("/alice/42/list/more").is_none());
        assert!(pattern.match_path("/alice/list").is_none());
    }

    #[test]
    fn test_metacharacters_are_literal() {
        let pattern = compile("/file.txt");
        assert!(pattern.match_path("/file.txt").is_some());
        assert!(pattern.match_path("/fileXtxt").is_none());

        let pattern = compile("/a+b/(c)/<x>");
        assert_eq!(
            pattern.match_path("/a+b/(c)/y"),
            Some(vec!["y".to_string()])
        );
        assert!(pattern.match_path("/aab/c/y").is_none());
    }

    #[test]
    fn test_adjacent_placeholders() {
        let pattern = compile("/<a><b>");
        assert_eq!(
            pattern.match_path("/xyz"),
            Some(vec!["xy".to_string(), "z".to_string()])
        );
        assert!(pattern.match_path("/x").is_none());
    }

    #[test]
    fn test_placeholder_only() {
        let pattern = compile("<all>");
        assert_eq!(pattern.match_path("anything"), Some(vec!["anything".to_string()]));
        assert!(pattern.match_path("/anything").is_none());
    }

    #[test]
    fn test_invalid_placeholder_is_literal() {
        let pattern = compile("/<1abc>");
        assert!(pattern.is_static());
        assert!(pattern.match_path("/<1abc>").is_some());
    }

    #[test]
    fn test_duplicate_placeholder_rejected() {
        let err = PathPattern::compile("/<id>/<id>").unwrap_err();
        assert!(matches!(err, WebError::InvalidTemplate { .. }));
    }

    #[test]
    fn test_reverse() {
        let pattern = compile("/user/<name>/<group>");
        assert_eq!(
            pattern.reverse(&["ann", "admins"]),
            Some("/user/ann/admins".to_string())
        );
        assert!(pattern.reverse(&["ann"]).is_none());
    }
}
