//! # SSR Pipeline Testing
//!
//! Helpers for exercising the pipeline end to end.
//!
//! - [`mocks::StubBackend`]: a real HTTP backend on an ephemeral port whose
//!   responses carry configurable `Set-Cookie` and anti-forgery headers
//! - [`fixtures`]: templates and on-disk build output
//! - [`logs`]: tracing capture for asserting on logged errors
//!
//! ## Example
//!
//! ```ignore
//! use ssr_pipeline_testing::mocks::{StubBackend, StubResponse};
//!
//! #[tokio::test]
//! async fn test_session_cookie_propagates() {
//!     let backend = StubBackend::start([(
//!         "/api/session",
//!         StubResponse::json(serde_json::json!({"user": "ada"})).with_cookie("session=abc"),
//!     )])
//!     .await
//!     .unwrap();
//!
//!     // point the ApiClient at backend.base_url() and render ...
//!     assert_eq!(backend.hits().len(), 1);
//! }
//! ```

pub mod fixtures;
pub mod logs;
pub mod mocks;
