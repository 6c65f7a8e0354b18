//! Output of a page renderer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Extra markup for the document head and the root elements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadTags {
    /// Markup spliced into the head placeholder (`<title>`, `<meta>`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_tags: Option<String>,
    /// Attribute string applied to the opening `<html>` tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_attributes: Option<String>,
    /// Attribute string applied to the opening `<body>` tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_attributes: Option<String>,
}

/// What a renderer produced for one request.
///
/// A renderer returning `None` instead of a `RenderResult` asks for the
/// template to be served unmodified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResult {
    /// Rendered application markup.
    pub html: String,
    /// Response status; 200 when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Additional response headers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// State handed to the client for hydration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_data: Option<serde_json::Value>,
    /// Head markup and root element attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<HeadTags>,
    /// Logical name of the client entry to load on the page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_client: Option<String>,
}

impl RenderResult {
    /// Result carrying only markup.
    #[must_use]
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            ..Self::default()
        }
    }

    /// Set the response status.
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Add a response header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attach hydration state.
    #[must_use]
    pub fn with_initial_data(mut self, data: serde_json::Value) -> Self {
        self.initial_data = Some(data);
        self
    }

    /// Attach head markup and root attributes.
    #[must_use]
    pub fn with_head(mut self, head: HeadTags) -> Self {
        self.head = Some(head);
        self
    }

    /// Name the client entry to load.
    #[must_use]
    pub fn with_entry_client(mut self, entry: impl Into<String>) -> Self {
        self.entry_client = Some(entry.into());
        self
    }

    /// Status to respond with.
    #[must_use]
    pub fn status_or_default(&self) -> u16 {
        self.status.unwrap_or(200)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserializes_renderer_json() {
        let result: RenderResult = serde_json::from_value(json!({
            "html": "<main>ok</main>",
            "status": 404,
            "headers": {"Cache-Control": "no-store"},
            "initialData": {"page": 2},
            "head": {"headTags": "<title>Blog</title>", "htmlAttributes": "lang=\"en\""},
            "entryClient": "entry-client.tsx"
        }))
        .unwrap();

        assert_eq!(result.status_or_default(), 404);
        assert_eq!(result.headers["Cache-Control"], "no-store");
        assert_eq!(result.initial_data, Some(json!({"page": 2})));
        let head = result.head.unwrap();
        assert_eq!(head.head_tags.as_deref(), Some("<title>Blog</title>"));
        assert!(head.body_attributes.is_none());
        assert_eq!(result.entry_client.as_deref(), Some("entry-client.tsx"));
    }

    #[test]
    fn test_status_defaults_to_ok() {
        let result: RenderResult = serde_json::from_value(json!({"html": ""})).unwrap();
        assert_eq!(result.status_or_default(), 200);
        assert!(result.headers.is_empty());
    }
}
