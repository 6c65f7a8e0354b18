//! # SSR Pipeline Runtime
//!
//! Turns an inbound URL into an HTML document.
//!
//! ## Core Components
//!
//! - **Pipeline**: opens a request context, resolves template and renderer,
//!   renders and assembles ([`pipeline`])
//! - **Strategies**: where template and renderer come from in each mode ([`strategy`])
//! - **API client**: intercepting HTTP client handed to renderers ([`client`])
//! - **Interceptor**: copies session cookies and anti-forgery headers from
//!   backend responses into the request context ([`interceptor`])
//!
//! ## Example
//!
//! ```ignore
//! use ssr_pipeline_runtime::{ApiClient, ApiClientConfig, Pipeline, Strategy};
//! use ssr_pipeline_runtime::strategy::{FixedStrategy, TemplateSource};
//!
//! let strategy = Strategy::Test(FixedStrategy::new(
//!     TemplateSource::Inline(template),
//!     renderer,
//! ));
//! let pipeline = Pipeline::new(strategy, ApiClient::new(ApiClientConfig::default())?);
//!
//! let outcome = pipeline.render("http://localhost:3000/blog?page=2", None).await;
//! ```

pub mod client;
pub mod error;
pub mod interceptor;
pub mod metrics;
pub mod pipeline;
pub mod renderer;
pub mod strategy;

pub use client::{ApiClient, ApiClientConfig, ApiRequest, REQUEST_ID_HEADER};
pub use error::{ApiError, PipelineError};
pub use interceptor::Interceptor;
pub use pipeline::{Pipeline, PipelineOutcome};
pub use renderer::{FnRenderer, RenderRequest, Renderer, renderer_fn};
pub use strategy::Strategy;
