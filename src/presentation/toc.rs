//! Table-of-contents markup for display collaborators.

use askama::Template;
use thiserror::Error;

use crate::domain::headings::NavigationSnapshot;

const DEFAULT_TITLE: &str = "Contents";

#[derive(Debug, Error)]
#[error("{source_name}: template rendering failed")]
pub struct ViewError {
    source_name: &'static str,
    #[source]
    error: askama::Error,
}

impl ViewError {
    fn new(source_name: &'static str, error: askama::Error) -> Self {
        Self { source_name, error }
    }
}

struct TocItem<'a> {
    id: &'a str,
    text: &'a str,
    level: u8,
    active: bool,
}

#[derive(Template)]
#[template(path = "toc.html")]
struct TocTemplate<'a> {
    title: &'a str,
    items: Vec<TocItem<'a>>,
}

/// Render the snapshot as a `<nav>` list. An empty snapshot renders to an
/// empty string so the caller can hide the widget entirely.
pub fn render_toc(snapshot: &NavigationSnapshot) -> Result<String, ViewError> {
    render_toc_titled(snapshot, DEFAULT_TITLE)
}

pub fn render_toc_titled(snapshot: &NavigationSnapshot, title: &str) -> Result<String, ViewError> {
    if snapshot.is_empty() {
        return Ok(String::new());
    }

    let current = snapshot.current_id.as_deref();
    let items = snapshot
        .entries
        .iter()
        .map(|entry| TocItem {
            id: entry.id.as_str(),
            text: entry.text.as_str(),
            level: entry.level.get(),
            active: current == Some(entry.id.as_str()),
        })
        .collect();

    TocTemplate { title, items }
        .render()
        .map_err(|err| ViewError::new("presentation::toc::render_toc", err))
}
