use tracing::{debug, warn};

use crate::domain::headings::{HeadingEntry, HeadingLevel, heading_id};

use super::surface::{DocumentSurface, SurfaceError};

/// Tag every heading under the content root with its positional id and build
/// the entry list in document order.
///
/// Tagging happens first and covers every heading found, so a later
/// `find_by_id("heading-<n>")` resolves even if building the list is cut
/// short. A missing root is not an error: nothing has been mounted yet.
pub fn scan_headings<S>(surface: &mut S, max_level: HeadingLevel) -> Result<Vec<HeadingEntry>, SurfaceError>
where
    S: DocumentSurface + ?Sized,
{
    let Some(root) = surface.content_root()? else {
        debug!(target = "application::toc::scan", "content root not mounted");
        return Ok(Vec::new());
    };

    let nodes = surface.query_headings(root, max_level)?;

    let mut tagged = Vec::with_capacity(nodes.len());
    for (index, node) in nodes.into_iter().enumerate() {
        let id = heading_id(index);
        if let Err(err) = surface.set_element_id(node.node, &id) {
            warn!(
                target = "application::toc::scan",
                id = %id,
                error = %err,
                "failed to tag heading"
            );
        }
        tagged.push((id, node));
    }

    let entries = tagged
        .into_iter()
        .map(|(id, node)| HeadingEntry {
            id,
            text: node.text.trim().to_string(),
            level: node.level,
            node: node.node,
        })
        .collect::<Vec<_>>();

    debug!(
        target = "application::toc::scan",
        headings = entries.len(),
        "scanned content"
    );

    Ok(entries)
}
