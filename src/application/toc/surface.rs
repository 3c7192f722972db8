use thiserror::Error;

use crate::domain::headings::{HeadingLevel, NodeRef};

/// Scroll geometry reported by a surface, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scroll_top: f64,
    pub height: f64,
    pub document_height: f64,
}

impl Viewport {
    pub fn max_scroll_top(&self) -> f64 {
        (self.document_height - self.height).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Smooth,
    Instant,
}

/// A heading element as found by [`DocumentSurface::query_headings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingNode {
    pub node: NodeRef,
    pub level: HeadingLevel,
    pub text: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("node {index} from generation {generation} is no longer attached")]
    Detached { generation: u64, index: usize },
    #[error("surface query failed: {message}")]
    Query { message: String },
}

impl SurfaceError {
    pub fn detached(node: NodeRef) -> Self {
        Self::Detached {
            generation: node.generation(),
            index: node.index(),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Runtime capabilities the synchronizer relies on.
///
/// Implementations wrap whatever actually renders the article: a browser DOM,
/// a webview bridge, or the headless [`HtmlDocument`](crate::infra::document::HtmlDocument).
/// Every call may fail softly; the synchronizer never propagates these errors.
pub trait DocumentSurface {
    /// Root node containing the rendered article, if it is mounted.
    fn content_root(&self) -> Result<Option<NodeRef>, SurfaceError>;

    /// Heading elements below `root` in document order, up to `max_level`.
    fn query_headings(
        &self,
        root: NodeRef,
        max_level: HeadingLevel,
    ) -> Result<Vec<HeadingNode>, SurfaceError>;

    /// Write the `id` attribute of `node`.
    fn set_element_id(&mut self, node: NodeRef, id: &str) -> Result<(), SurfaceError>;

    /// Resolve a live node by its `id` attribute.
    fn find_by_id(&self, id: &str) -> Option<NodeRef>;

    /// Distance from the top of the viewport to the top edge of `node`.
    fn rect_top(&self, node: NodeRef) -> Result<f64, SurfaceError>;

    fn viewport(&self) -> Viewport;

    fn scroll_to(&mut self, top: f64, behavior: ScrollBehavior);
}
