//! Merging a render result into the HTML template.
//!
//! The template marks where rendered output goes:
//!
//! ```html
//! <!doctype html>
//! <html>
//!   <head><!--app-head--></head>
//!   <body><div id="root"><!--app-html--></div></body>
//! </html>
//! ```
//!
//! Missing placeholders fall back to the end of `<head>` / `<body>`.
//! [`assemble`] is pure: the same inputs always give the same document.

use std::collections::BTreeMap;

use crate::assets::AssetResolver;
use crate::render::RenderResult;

/// Placeholder replaced by the rendered markup.
pub const APP_HTML_PLACEHOLDER: &str = "<!--app-html-->";

/// Placeholder replaced by head tags and entry stylesheets.
pub const APP_HEAD_PLACEHOLDER: &str = "<!--app-head-->";

/// Global the bootstrap script assigns the initial state to.
pub const INITIAL_STATE_GLOBAL: &str = "window.__INITIAL_STATE__";

/// Final response for one request, before it is written to the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Complete HTML document.
    pub html: String,
    /// Response status.
    pub status: u16,
    /// Response headers from the render result.
    pub headers: BTreeMap<String, String>,
}

impl Document {
    /// The template served as-is.
    #[must_use]
    pub fn from_template(template: &str) -> Self {
        Self {
            html: template.to_string(),
            status: 200,
            headers: BTreeMap::new(),
        }
    }
}

/// Merge `result` into `template`.
///
/// `None` yields the template unmodified with status 200. An entry client the
/// resolver does not know is skipped.
#[must_use]
pub fn assemble(
    template: &str,
    result: Option<&RenderResult>,
    assets: &dyn AssetResolver,
) -> Document {
    let Some(result) = result else {
        return Document::from_template(template);
    };

    let mut html = template.to_string();
    let mut head_markup = String::new();
    let mut body_markup = String::new();

    if let Some(head) = &result.head {
        if let Some(attributes) = non_blank(head.html_attributes.as_deref()) {
            html = add_tag_attributes(&html, "html", attributes);
        }
        if let Some(attributes) = non_blank(head.body_attributes.as_deref()) {
            html = add_tag_attributes(&html, "body", attributes);
        }
        if let Some(tags) = &head.head_tags {
            head_markup.push_str(tags);
        }
    }

    if let Some(entry_name) = &result.entry_client {
        match assets.resolve_client_entry(entry_name) {
            Some(entry) => {
                for css in &entry.css {
                    head_markup.push_str(&format!(
                        r#"<link rel="stylesheet" href="{}">"#,
                        escape_attribute(css)
                    ));
                }
                body_markup.push_str(&format!(
                    r#"<script type="module" src="{}"></script>"#,
                    escape_attribute(&entry.src)
                ));
            }
            None => {
                tracing::debug!(entry = %entry_name, "Client entry not resolvable, skipping tags");
            }
        }
    }

    if let Some(data) = &result.initial_data {
        body_markup.push_str(&format!(
            "<script>{INITIAL_STATE_GLOBAL} = {};</script>",
            serialize_initial_state(data)
        ));
    }

    html = replace_or_insert(&html, APP_HEAD_PLACEHOLDER, &head_markup, "</head>");
    if !body_markup.is_empty() {
        html = insert_before_last(&html, "</body>", &body_markup);
    }
    html = replace_or_insert(&html, APP_HTML_PLACEHOLDER, &result.html, "</body>");

    Document {
        html,
        status: result.status_or_default(),
        headers: result.headers.clone(),
    }
}

/// Serialize `value` as JSON that is safe to embed inside a `<script>` element.
///
/// `<`, `>` and `&` are emitted as unicode escapes, so the payload can never
/// contain `</script>` or `<!--`; U+2028/U+2029 are escaped for older parsers.
/// The output still parses to exactly `value`.
#[must_use]
pub fn serialize_initial_state(value: &serde_json::Value) -> String {
    let json = serde_json::to_string(value).unwrap_or_else(|_| "null".to_string());
    let mut escaped = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => escaped.push_str("\\u003c"),
            '>' => escaped.push_str("\\u003e"),
            '&' => escaped.push_str("\\u0026"),
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

/// Byte offset of the first ASCII case-insensitive match of `needle`.
fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}

fn rfind_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .rfind(&needle.to_ascii_lowercase())
}

fn replace_or_insert(html: &str, placeholder: &str, content: &str, anchor: &str) -> String {
    if html.contains(placeholder) {
        return html.replacen(placeholder, content, 1);
    }
    if content.is_empty() {
        return html.to_string();
    }
    match find_ignore_case(html, anchor) {
        Some(at) => splice_at(html, at, content),
        None => format!("{html}{content}"),
    }
}

fn insert_before_last(html: &str, anchor: &str, content: &str) -> String {
    match rfind_ignore_case(html, anchor) {
        Some(at) => splice_at(html, at, content),
        None => format!("{html}{content}"),
    }
}

fn splice_at(html: &str, at: usize, content: &str) -> String {
    let mut out = String::with_capacity(html.len() + content.len());
    out.push_str(&html[..at]);
    out.push_str(content);
    out.push_str(&html[at..]);
    out
}

/// Append `attributes` to the first opening `<tag ...>` element.
fn add_tag_attributes(html: &str, tag: &str, attributes: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let open = format!("<{tag}");
    let mut from = 0;
    while let Some(offset) = lower[from..].find(&open) {
        let name_end = from + offset + open.len();
        match lower.as_bytes().get(name_end) {
            Some(b'>' | b'/' | b' ' | b'\t' | b'\n' | b'\r') => {
                return splice_at(html, name_end, &format!(" {attributes}"));
            }
            Some(_) => from = name_end,
            None => break,
        }
    }
    html.to_string()
}
