//! Article rendering.
//!
//! The pipeline is pure: it accepts markdown, produces deterministic sanitised
//! HTML plus content metrics, and surfaces structured errors. Mounting the
//! HTML and scanning it for headings happen in the caller.

mod service;
mod types;

pub use service::{ComrakRenderService, render_service};
pub use types::{ContentMetrics, RenderError, RenderRequest, RenderService, RenderedArticle};
