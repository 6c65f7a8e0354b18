//! Page renderer for the blog.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use ssr_pipeline_core::{HeadTags, RenderResult};
use ssr_pipeline_runtime::{RenderRequest, Renderer, renderer_fn};
use std::sync::Arc;

/// A post as listed by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// URL slug
    pub slug: String,
    /// Title
    pub title: String,
}

/// The blog's page renderer.
pub fn renderer() -> Arc<dyn Renderer> {
    renderer_fn(render)
}

async fn render(request: RenderRequest) -> anyhow::Result<Option<RenderResult>> {
    let url = Url::parse(&request.url)?;
    match url.path() {
        "/" | "/blog" | "/dev-blog" => blog_index(&request, &url).await.map(Some),
        // Anything else gets the bare shell; the client router takes over.
        _ => Ok(None),
    }
}

async fn blog_index(request: &RenderRequest, url: &Url) -> anyhow::Result<RenderResult> {
    let page: u32 = url
        .query_pairs()
        .find(|(key, _)| key.eq_ignore_ascii_case("page"))
        .and_then(|(_, value)| value.parse().ok())
        .unwrap_or(1);

    let posts: Vec<Post> = if request.api.base_url().is_some() {
        request
            .api
            .get("/api/posts")
            .query(&[("page", page)])
            .send_json()
            .await?
    } else {
        Vec::new()
    };

    let mut html = format!("<main data-page=\"{page}\"><h1>Blog</h1><ul>");
    for post in &posts {
        html.push_str(&format!(
            "<li><a href=\"/blog/{}\">{}</a></li>",
            escape(&post.slug),
            escape(&post.title)
        ));
    }
    html.push_str("</ul></main>");

    Ok(RenderResult::new(html)
        .with_head(HeadTags {
            head_tags: Some(format!("<title>Blog, page {page}</title>")),
            html_attributes: Some("data-theme=\"light\"".to_string()),
            body_attributes: None,
        })
        .with_initial_data(serde_json::json!({ "page": page, "posts": posts }))
        .with_entry_client("client/entry-client.js"))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
