//! Headless document surface backed by rendered HTML.
//!
//! [`HtmlDocument`] stands in for a browser: it mounts sanitised article
//! markup, exposes its headings through [`DocumentSurface`], and keeps a
//! scroll position that simulations and tests can move. Clones share the same
//! underlying document, so one clone can live inside a synchronizer driver
//! while another plays the user scrolling the page.

mod layout;

use std::{
    cell::RefCell,
    rc::Rc,
    sync::{
        Arc, RwLock, RwLockReadGuard, RwLockWriteGuard,
        atomic::{AtomicU64, Ordering},
    },
};

use lol_html::{RewriteStrSettings, element, rewrite_str};
use thiserror::Error;
use tracing::trace;

use crate::application::toc::{DocumentSurface, HeadingNode, ScrollBehavior, SurfaceError, Viewport};
use crate::domain::headings::{HeadingLevel, NodeRef};

pub use layout::LayoutSettings;
use layout::{PlacedHeading, collect_blocks, lay_out};

/// Index reserved for the content root node.
const ROOT_INDEX: usize = usize::MAX;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("failed to parse document: {message}")]
    Parse { message: String },
    #[error("failed to serialise document: {message}")]
    Serialise { message: String },
}

#[derive(Debug)]
struct DocumentInner {
    generation: u64,
    source_html: String,
    headings: Vec<PlacedHeading>,
    /// Ids written through the surface, by heading index.
    assigned_ids: Vec<Option<String>>,
    settings: LayoutSettings,
    document_height: f64,
    scroll_top: f64,
    mounted: bool,
    rendered: bool,
}

impl DocumentInner {
    fn build(html: &str, settings: LayoutSettings) -> Result<Self, DocumentError> {
        let blocks = collect_blocks(html)?;
        let layout = lay_out(&blocks, &settings);
        let document_height = layout.content_height.max(settings.viewport_height);
        let assigned_ids = vec![None; layout.headings.len()];

        Ok(Self {
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            source_html: html.to_string(),
            headings: layout.headings,
            assigned_ids,
            settings,
            document_height,
            scroll_top: 0.0,
            mounted: true,
            rendered: true,
        })
    }

    fn heading(&self, node: NodeRef) -> Result<&PlacedHeading, SurfaceError> {
        if node.generation() != self.generation || !self.mounted {
            return Err(SurfaceError::detached(node));
        }
        self.headings
            .get(node.index())
            .ok_or_else(|| SurfaceError::detached(node))
    }

    fn max_scroll_top(&self) -> f64 {
        (self.document_height - self.settings.viewport_height).max(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct HtmlDocument {
    inner: Arc<RwLock<DocumentInner>>,
}

impl HtmlDocument {
    pub fn parse(html: &str, settings: LayoutSettings) -> Result<Self, DocumentError> {
        let inner = DocumentInner::build(html, settings)?;
        Ok(Self {
            inner: Arc::new(RwLock::new(inner)),
        })
    }

    /// Swap in new markup. Node handles from the previous markup stop
    /// resolving and the scroll position returns to the top.
    pub fn replace_content(&self, html: &str) -> Result<(), DocumentError> {
        let mut inner = self.write();
        let settings = inner.settings.clone();
        let rendered = inner.rendered;
        *inner = DocumentInner::build(html, settings)?;
        inner.rendered = rendered;
        Ok(())
    }

    /// Model deferred rendering: while unrendered, the root is mounted but
    /// holds no headings yet.
    pub fn set_rendered(&self, rendered: bool) {
        self.write().rendered = rendered;
    }

    /// Detach the content root, as when the page navigates away.
    pub fn unmount(&self) {
        self.write().mounted = false;
    }

    pub fn set_scroll_top(&self, top: f64) {
        let mut inner = self.write();
        inner.scroll_top = top.clamp(0.0, inner.max_scroll_top());
    }

    pub fn scroll_top(&self) -> f64 {
        self.read().scroll_top
    }

    pub fn scroll_to_bottom(&self) {
        let mut inner = self.write();
        inner.scroll_top = inner.max_scroll_top();
    }

    /// Document-space offset of the heading carrying `id`.
    pub fn offset_of(&self, id: &str) -> Option<f64> {
        let inner = self.read();
        find_index(&inner, id).map(|index| inner.headings[index].offset_top)
    }

    pub fn viewport_height(&self) -> f64 {
        self.read().settings.viewport_height
    }

    /// Current markup, including every id written through the surface.
    pub fn html(&self) -> Result<String, DocumentError> {
        let inner = self.read();
        apply_assigned_ids(&inner.source_html, &inner.assigned_ids)
    }

    fn read(&self) -> RwLockReadGuard<'_, DocumentInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, DocumentInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DocumentSurface for HtmlDocument {
    fn content_root(&self) -> Result<Option<NodeRef>, SurfaceError> {
        let inner = self.read();
        Ok(inner
            .mounted
            .then(|| NodeRef::new(inner.generation, ROOT_INDEX)))
    }

    fn query_headings(
        &self,
        root: NodeRef,
        max_level: HeadingLevel,
    ) -> Result<Vec<HeadingNode>, SurfaceError> {
        let inner = self.read();
        if root.generation() != inner.generation || root.index() != ROOT_INDEX || !inner.mounted {
            return Err(SurfaceError::detached(root));
        }
        if !inner.rendered {
            return Ok(Vec::new());
        }

        Ok(inner
            .headings
            .iter()
            .enumerate()
            .filter(|(_, heading)| heading.level <= max_level)
            .map(|(index, heading)| HeadingNode {
                node: NodeRef::new(inner.generation, index),
                level: heading.level,
                text: heading.text.clone(),
            })
            .collect())
    }

    fn set_element_id(&mut self, node: NodeRef, id: &str) -> Result<(), SurfaceError> {
        let mut inner = self.write();
        inner.heading(node)?;
        inner.assigned_ids[node.index()] = Some(id.to_string());
        Ok(())
    }

    fn find_by_id(&self, id: &str) -> Option<NodeRef> {
        let inner = self.read();
        if !inner.mounted || !inner.rendered {
            return None;
        }
        find_index(&inner, id).map(|index| NodeRef::new(inner.generation, index))
    }

    fn rect_top(&self, node: NodeRef) -> Result<f64, SurfaceError> {
        let inner = self.read();
        let heading = inner.heading(node)?;
        Ok(heading.offset_top - inner.scroll_top)
    }

    fn viewport(&self) -> Viewport {
        let inner = self.read();
        Viewport {
            scroll_top: inner.scroll_top,
            height: inner.settings.viewport_height,
            document_height: inner.document_height,
        }
    }

    fn scroll_to(&mut self, top: f64, behavior: ScrollBehavior) {
        trace!(target = "infra::document", top, ?behavior, "scroll");
        self.set_scroll_top(top);
    }
}

/// Assigned ids shadow the ids present in the source markup.
fn find_index(inner: &DocumentInner, id: &str) -> Option<usize> {
    let assigned = inner
        .assigned_ids
        .iter()
        .position(|assigned| assigned.as_deref() == Some(id));
    assigned.or_else(|| {
        inner.headings.iter().enumerate().position(|(index, heading)| {
            inner.assigned_ids[index].is_none() && heading.source_id.as_deref() == Some(id)
        })
    })
}

fn apply_assigned_ids(html: &str, assigned: &[Option<String>]) -> Result<String, DocumentError> {
    if assigned.iter().all(Option::is_none) {
        return Ok(html.to_string());
    }

    let assigned = Rc::new(assigned.to_vec());
    let index = Rc::new(RefCell::new(0usize));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("h1, h2, h3, h4, h5, h6", {
                let assigned = Rc::clone(&assigned);
                let index = Rc::clone(&index);
                move |el| {
                    let mut idx = index.borrow_mut();
                    if let Some(Some(id)) = assigned.get(*idx) {
                        el.set_attribute("id", id)?;
                    }
                    *idx += 1;
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| DocumentError::Serialise {
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = "<h1>Intro</h1><p>alpha</p><h2>Setup</h2><p>beta</p><h1>Conclusion</h1>";

    fn document() -> HtmlDocument {
        HtmlDocument::parse(ARTICLE, LayoutSettings::default()).expect("parse")
    }

    #[test]
    fn headings_are_exposed_in_order() {
        let doc = document();
        let root = doc.content_root().expect("root").expect("mounted");
        let headings = doc
            .query_headings(root, HeadingLevel::DEEPEST)
            .expect("query");

        let texts: Vec<_> = headings.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, ["Intro", "Setup", "Conclusion"]);
        assert_eq!(headings[1].level.get(), 2);
    }

    #[test]
    fn max_level_filters_deeper_headings() {
        let doc = document();
        let root = doc.content_root().expect("root").expect("mounted");
        let headings = doc
            .query_headings(root, HeadingLevel::new(1).expect("level"))
            .expect("query");
        assert_eq!(headings.len(), 2);
    }

    #[test]
    fn assigned_ids_are_written_into_markup() {
        let mut doc = document();
        let root = doc.content_root().expect("root").expect("mounted");
        let headings = doc
            .query_headings(root, HeadingLevel::DEEPEST)
            .expect("query");
        doc.set_element_id(headings[1].node, "heading-1")
            .expect("tag");

        let html = doc.html().expect("html");
        assert!(html.contains("<h2 id=\"heading-1\">Setup</h2>"));
        assert!(html.contains("<h1>Intro</h1>"));
        assert_eq!(doc.find_by_id("heading-1"), Some(headings[1].node));
    }

    #[test]
    fn replaced_content_detaches_old_nodes() {
        let doc = document();
        let root = doc.content_root().expect("root").expect("mounted");
        let old = doc
            .query_headings(root, HeadingLevel::DEEPEST)
            .expect("query");

        doc.replace_content("<h1>Other</h1>").expect("replace");

        assert!(matches!(
            doc.rect_top(old[0].node),
            Err(SurfaceError::Detached { .. })
        ));
        assert!(doc.query_headings(root, HeadingLevel::DEEPEST).is_err());
    }

    #[test]
    fn scrolling_is_clamped() {
        let doc = document();
        doc.set_scroll_top(-50.0);
        assert_eq!(doc.scroll_top(), 0.0);

        // Short article: the document is padded to the viewport height.
        doc.set_scroll_top(10_000.0);
        assert_eq!(doc.scroll_top(), 0.0);
    }

    #[test]
    fn unrendered_document_has_no_headings() {
        let doc = document();
        doc.set_rendered(false);
        let root = doc.content_root().expect("root").expect("mounted");
        assert!(
            doc.query_headings(root, HeadingLevel::DEEPEST)
                .expect("query")
                .is_empty()
        );

        doc.unmount();
        assert_eq!(doc.content_root().expect("root"), None);
    }
}
