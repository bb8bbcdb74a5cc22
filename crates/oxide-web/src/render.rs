//! The template rendering seam.

/// The data mapping a handler hands to its view.
pub type Model = serde_json::Map<String, serde_json::Value>;

/// Turns a template name and a model into response bytes.
///
/// Any closure with the right signature is a renderer:
///
/// ```
/// use oxide_web::{Model, Render};
///
/// let render = |template: &str, model: &Model| -> anyhow::Result<Vec<u8>> {
///     Ok(format!("{template}: {} keys", model.len()).into_bytes())
/// };
/// assert_eq!(render.render("index.html", &Model::new()).unwrap(), b"index.html: 0 keys");
/// ```
pub trait Render: Send + Sync {
    /// Renders `template` with `model`.
    fn render(&self, template: &str, model: &Model) -> anyhow::Result<Vec<u8>>;
}

impl<F> Render for F
where
    F: Fn(&str, &Model) -> anyhow::Result<Vec<u8>> + Send + Sync,
{
    fn render(&self, template: &str, model: &Model) -> anyhow::Result<Vec<u8>> {
        self(template, model)
    }
}

/// Escapes text for inclusion in HTML.
///
/// ```
/// assert_eq!(oxide_web::html_escape("<a href=\"x\">"), "&lt;a href=&quot;x&quot;&gt;");
/// ```
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Builds a [`Model`] from `key => value` pairs.
///
/// ```
/// use oxide_web::model;
///
/// let m = model! { "name" => "alice", "times" => 2 };
/// assert_eq!(m["times"], 2);
/// ```
#[macro_export]
macro_rules! model {
    () => { $crate::Model::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut m = $crate::Model::new();
        $( m.insert(::std::string::String::from($key), $crate::serde_json::json!($value)); )+
        m
    }};
}
