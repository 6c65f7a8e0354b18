//! # SSR Pipeline Core
//!
//! Types shared by every part of the server-side rendering pipeline.
//!
//! - **Request context**: per-request buffer for cookies and anti-forgery
//!   headers captured from nested outbound calls ([`context`])
//! - **Render results**: what a page renderer hands back ([`render`])
//! - **Assets**: client entry resolution for dev and built output ([`assets`])
//! - **Documents**: merging a render result into the HTML template ([`document`])
//! - **Mode**: the startup-fixed run mode ([`mode`])
//!
//! Nothing in this crate performs network I/O. The runtime crate wires these
//! pieces to an HTTP client and to the render strategies.

pub mod assets;
pub mod context;
pub mod document;
pub mod error;
pub mod mode;
pub mod render;

// Re-export commonly used types
pub use assets::{AssetResolver, ClientEntry, DevAssets, Manifest, ManifestAssets, ManifestRecord};
pub use context::{
    CapturedEffects, RequestContext, current_context, propagate_context, with_context,
};
pub use document::{Document, assemble, serialize_initial_state};
pub use error::{ManifestError, ParseModeError};
pub use mode::Mode;
pub use render::{HeadTags, RenderResult};
