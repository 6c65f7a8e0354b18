//! Integration tests for the render pipeline against a live stub backend.
//!
//! Renderers here make real HTTP calls through the request's `ApiClient`, so
//! the interceptor, cookie forwarding and context isolation are exercised the
//! way a page would exercise them.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use reqwest::Url;
use serde_json::json;
use ssr_pipeline_core::propagate_context;
use ssr_pipeline_core::RenderResult;
use ssr_pipeline_runtime::strategy::{FixedStrategy, TemplateSource};
use ssr_pipeline_runtime::{
    ApiClient, ApiClientConfig, ApiError, Pipeline, RenderRequest, Renderer, Strategy, renderer_fn,
};
use ssr_pipeline_testing::fixtures::TEMPLATE;
use ssr_pipeline_testing::logs::init_test_tracing;
use ssr_pipeline_testing::mocks::{StubBackend, StubResponse};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

fn pipeline(backend: &StubBackend, renderer: Arc<dyn Renderer>) -> Pipeline {
    init_test_tracing();
    let api = ApiClient::new(ApiClientConfig {
        base_url: Some(Url::parse(&backend.base_url()).unwrap()),
        ..ApiClientConfig::default()
    })
    .unwrap();
    Pipeline::new(
        Strategy::Test(FixedStrategy::new(
            TemplateSource::Inline(TEMPLATE.to_string()),
            renderer,
        )),
        api,
    )
}

/// Renders the greeting returned by `/api/session`.
fn session_renderer() -> Arc<dyn Renderer> {
    renderer_fn(|request: RenderRequest| async move {
        let session: serde_json::Value = request.api.get("/api/session").send_json().await?;
        Ok(Some(
            RenderResult::new(format!("<p>hello {}</p>", session["user"].as_str().unwrap_or("?")))
                .with_initial_data(session),
        ))
    })
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_nested_call_cookies_and_csrf_captured() {
    let backend = StubBackend::start([(
        "/api/session",
        StubResponse::json(json!({"user": "ada"}))
            .with_cookie("session=abc; Path=/; HttpOnly")
            .with_cookie("theme=dark")
            .with_header("X-CSRF-Token", "t1"),
    )])
    .await
    .unwrap();

    let outcome = pipeline(&backend, session_renderer())
        .render("http://localhost:3000/", None)
        .await;

    let document = outcome.result.unwrap();
    assert!(document.html.contains("<p>hello ada</p>"));
    assert_eq!(
        outcome.effects.cookies,
        vec!["session=abc; Path=/; HttpOnly".to_string(), "theme=dark".to_string()]
    );
    assert_eq!(outcome.effects.headers.get("x-csrf-token").unwrap(), "t1");
}

#[tokio::test]
async fn test_repeated_cookie_captured_once() {
    let backend = StubBackend::start([(
        "/api/session",
        StubResponse::json(json!({"user": "ada"})).with_cookie("session=abc"),
    )])
    .await
    .unwrap();
    let renderer = renderer_fn(|request: RenderRequest| async move {
        for _ in 0..3 {
            request.api.get("/api/session").send().await?;
        }
        Ok(None)
    });

    let outcome = pipeline(&backend, renderer).render("http://localhost/", None).await;
    assert_eq!(outcome.effects.cookies, vec!["session=abc".to_string()]);
    assert_eq!(backend.hits().len(), 3);
}

#[tokio::test]
async fn test_csrf_fallback_header_name() {
    let backend = StubBackend::start([(
        "/api/form",
        StubResponse::json(json!({}))
            .with_header("X-XSRF-Guard", "ignored")
            .with_header("X-Anti-CSRF", "g1"),
    )])
    .await
    .unwrap();
    let renderer = renderer_fn(|request: RenderRequest| async move {
        request.api.post("/api/form").json(&json!({"a": 1})).send().await?;
        Ok(None)
    });

    let outcome = pipeline(&backend, renderer).render("http://localhost/", None).await;
    assert_eq!(outcome.effects.headers.get("x-anti-csrf").unwrap(), "g1");
    assert!(!outcome.effects.headers.contains_key("x-xsrf-guard"));
    assert_eq!(outcome.effects.headers.len(), 1);
}

#[tokio::test]
async fn test_error_response_still_captures_cookies() {
    let backend = StubBackend::start([(
        "/api/session",
        StubResponse::json(json!({"error": "expired"}))
            .with_status(401)
            .with_cookie("session=; Max-Age=0"),
    )])
    .await
    .unwrap();
    let renderer = renderer_fn(|request: RenderRequest| async move {
        let err = request
            .api
            .get("/api/session")
            .send_json::<serde_json::Value>()
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 401, .. }));
        Ok(Some(RenderResult::new("<p>signed out</p>")))
    });

    let outcome = pipeline(&backend, renderer).render("http://localhost/", None).await;
    assert!(outcome.result.is_ok());
    assert_eq!(outcome.effects.cookies, vec!["session=; Max-Age=0".to_string()]);
}

#[tokio::test]
async fn test_inbound_cookie_forwarded_to_api_only() {
    let backend = StubBackend::start([("/api/me", StubResponse::json(json!({})))])
        .await
        .unwrap();
    let other = StubBackend::start([("/pixel", StubResponse::json(json!({})))])
        .await
        .unwrap();
    let pixel = other.url("/pixel");

    let renderer = renderer_fn(move |request: RenderRequest| {
        let pixel = pixel.clone();
        async move {
            request.api.get("/api/me").send().await?;
            request.api.get(&pixel).send().await?;
            Ok(None)
        }
    });

    let outcome = pipeline(&backend, renderer)
        .render(
            "http://localhost/",
            Some(http::HeaderValue::from_static("sid=42")),
        )
        .await;
    assert!(outcome.result.is_ok());
    assert_eq!(backend.hits()[0].cookie.as_deref(), Some("sid=42"));
    assert_eq!(other.hits()[0].cookie, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_never_share_cookies() {
    let routes: Vec<(String, StubResponse)> = (0u32..16)
        .map(|i| {
            (
                format!("/api/user/{i}"),
                StubResponse::json(json!({"id": i}))
                    .with_cookie(format!("session=user{i}"))
                    .with_delay(Duration::from_millis(u64::from(16 - i) * 3)),
            )
        })
        .collect();
    let backend = StubBackend::start(routes.iter().map(|(path, r)| (path.as_str(), r.clone())))
        .await
        .unwrap();

    let renderer = renderer_fn(|request: RenderRequest| async move {
        let id = request.url.rsplit('/').next().unwrap_or_default().to_string();
        request.api.get(&format!("/api/user/{id}")).send().await?;
        tokio::task::yield_now().await;
        request.api.get(&format!("/api/user/{id}")).send().await?;
        Ok(Some(RenderResult::new(format!("<p>{id}</p>"))))
    });
    let pipeline = Arc::new(pipeline(&backend, renderer));

    let handles = (0..16).map(|i| {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move {
            (i, pipeline.render(&format!("http://localhost/u/{i}"), None).await)
        })
    });
    for joined in futures::future::join_all(handles).await {
        let (i, outcome) = joined.unwrap();
        assert!(outcome.result.unwrap().html.contains(&format!("<p>{i}</p>")));
        assert_eq!(outcome.effects.cookies, vec![format!("session=user{i}")]);
    }
}

#[tokio::test]
async fn test_spawned_work_keeps_request_context() {
    let backend = StubBackend::start([(
        "/api/refresh",
        StubResponse::json(json!({})).with_cookie("refreshed=1"),
    )])
    .await
    .unwrap();
    let renderer = renderer_fn(|request: RenderRequest| async move {
        // An unbound client falls back to the current context, which must be
        // carried into the spawned task explicitly.
        let unbound = ApiClient::new(ApiClientConfig {
            base_url: request.api.base_url().cloned(),
            ..ApiClientConfig::default()
        })?;
        tokio::spawn(propagate_context(async move {
            unbound.get("/api/refresh").send().await
        }))
        .await??;
        Ok(None)
    });

    let outcome = pipeline(&backend, renderer).render("http://localhost/", None).await;
    assert_eq!(outcome.effects.cookies, vec!["refreshed=1".to_string()]);
}

#[tokio::test]
async fn test_slow_backend_hits_render_deadline() {
    let backend = StubBackend::start([(
        "/api/session",
        StubResponse::json(json!({"user": "ada"})).with_delay(Duration::from_secs(5)),
    )])
    .await
    .unwrap();

    let outcome = pipeline(&backend, session_renderer())
        .with_deadline(Some(Duration::from_millis(50)))
        .render("http://localhost/", None)
        .await;
    assert_eq!(outcome.result.unwrap_err().stage(), "timeout");
}
