//! HTTP handlers.

pub mod render;

pub use render::render_page;
