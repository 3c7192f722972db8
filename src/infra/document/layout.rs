//! Block layout estimation for headless documents.
//!
//! There is no real rendering engine behind [`HtmlDocument`](super::HtmlDocument),
//! so geometry is approximated: every block-level element becomes a box
//! whose height follows from its kind and the amount of text it holds.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use lol_html::html_content::EndTag;
use lol_html::{RewriteStrSettings, doc_text, element, rewrite_str};

use crate::domain::headings::HeadingLevel;

use super::DocumentError;

/// Relative heading heights, indexed by level - 1.
const HEADING_SCALE: [f64; 6] = [2.0, 1.75, 1.5, 1.3, 1.15, 1.0];

const BLOCK_SELECTOR: &str = "p, li, pre, blockquote, tr, figure, img, hr, dt, dd";

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutSettings {
    pub viewport_height: f64,
    pub line_height: f64,
    pub chars_per_line: usize,
    pub block_margin: f64,
    pub image_height: f64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            viewport_height: 800.0,
            line_height: 24.0,
            chars_per_line: 80,
            block_margin: 16.0,
            image_height: 240.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockKind {
    Heading(HeadingLevel),
    Text,
    Preformatted,
    Image,
    Rule,
}

#[derive(Debug, Clone)]
pub(crate) struct Block {
    pub(crate) kind: BlockKind,
    pub(crate) text: String,
    /// `id` attribute present in the source markup.
    pub(crate) source_id: Option<String>,
}

/// A heading positioned in document coordinates.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlacedHeading {
    pub(crate) level: HeadingLevel,
    pub(crate) text: String,
    pub(crate) source_id: Option<String>,
    pub(crate) offset_top: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Layout {
    pub(crate) headings: Vec<PlacedHeading>,
    pub(crate) content_height: f64,
}

/// Split markup into blocks in document order. Text is attributed to the
/// most recently opened block, except that a heading only collects text
/// until its end tag. Loose text after a heading becomes a text block.
pub(crate) fn collect_blocks(html: &str) -> Result<Vec<Block>, DocumentError> {
    let blocks = Rc::new(RefCell::new(Vec::<Block>::new()));
    let heading_open = Rc::new(Cell::new(false));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("h1, h2, h3, h4, h5, h6", {
                    let blocks = Rc::clone(&blocks);
                    let heading_open = Rc::clone(&heading_open);
                    move |el| {
                        if let Some(level) = HeadingLevel::from_tag(&el.tag_name()) {
                            blocks.borrow_mut().push(Block {
                                kind: BlockKind::Heading(level),
                                text: String::new(),
                                source_id: el.get_attribute("id"),
                            });
                            heading_open.set(true);
                            let heading_open = Rc::clone(&heading_open);
                            el.on_end_tag(Box::new(move |_end: &mut EndTag<'_>| {
                                heading_open.set(false);
                                Ok(())
                            }) as lol_html::EndTagHandler<'static>)?;
                        }
                        Ok(())
                    }
                }),
                element!(BLOCK_SELECTOR, {
                    let blocks = Rc::clone(&blocks);
                    move |el| {
                        let kind = match el.tag_name().as_str() {
                            "pre" => BlockKind::Preformatted,
                            "img" => BlockKind::Image,
                            "hr" => BlockKind::Rule,
                            _ => BlockKind::Text,
                        };
                        blocks.borrow_mut().push(Block {
                            kind,
                            text: String::new(),
                            source_id: el.get_attribute("id"),
                        });
                        Ok(())
                    }
                }),
            ],
            document_content_handlers: vec![doc_text!({
                let blocks = Rc::clone(&blocks);
                let heading_open = Rc::clone(&heading_open);
                move |t| {
                    let mut blocks = blocks.borrow_mut();
                    let after_heading = matches!(
                        blocks.last(),
                        Some(Block {
                            kind: BlockKind::Heading(_),
                            ..
                        })
                    ) && !heading_open.get();

                    if after_heading {
                        if !t.as_str().trim().is_empty() {
                            blocks.push(Block {
                                kind: BlockKind::Text,
                                text: t.as_str().to_string(),
                                source_id: None,
                            });
                        }
                    } else if let Some(block) = blocks.last_mut() {
                        block.text.push_str(t.as_str());
                    }
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| DocumentError::Parse {
        message: err.to_string(),
    })?;

    let collected = blocks.borrow().clone();
    Ok(collected)
}

pub(crate) fn lay_out(blocks: &[Block], settings: &LayoutSettings) -> Layout {
    let mut cursor = 0.0;
    let mut headings = Vec::new();

    for block in blocks {
        let height = block_height(block, settings);
        if let BlockKind::Heading(level) = block.kind {
            headings.push(PlacedHeading {
                level,
                text: decode_entities(block.text.trim()),
                source_id: block.source_id.clone(),
                offset_top: cursor,
            });
        }
        cursor += height + settings.block_margin;
    }

    Layout {
        headings,
        content_height: cursor,
    }
}

fn block_height(block: &Block, settings: &LayoutSettings) -> f64 {
    match block.kind {
        BlockKind::Heading(level) => {
            settings.line_height * HEADING_SCALE[usize::from(level.get() - 1)]
        }
        BlockKind::Text => {
            let chars = block.text.trim().chars().count();
            let per_line = settings.chars_per_line.max(1);
            let lines = chars.div_ceil(per_line).max(1);
            settings.line_height * lines as f64
        }
        BlockKind::Preformatted => {
            let lines = block.text.trim_end().lines().count().max(1);
            settings.line_height * lines as f64
        }
        BlockKind::Image => settings.image_height,
        BlockKind::Rule => 0.0,
    }
}

/// Decode the handful of entities a sanitiser emits in text content.
pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_keep_document_order_and_text() {
        let blocks = collect_blocks("<h1 id=\"top\">Intro</h1><p>hello</p><h2>Setup</h2>")
            .expect("parse");

        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].text, "Intro");
        assert_eq!(blocks[0].source_id.as_deref(), Some("top"));
        assert_eq!(blocks[1].kind, BlockKind::Text);
        assert_eq!(blocks[1].text, "hello");
        assert!(matches!(blocks[2].kind, BlockKind::Heading(level) if level.get() == 2));
    }

    #[test]
    fn headings_are_offset_by_preceding_blocks() {
        let settings = LayoutSettings {
            line_height: 20.0,
            chars_per_line: 10,
            block_margin: 10.0,
            ..LayoutSettings::default()
        };
        let blocks = collect_blocks("<h1>A</h1><p>0123456789012</p><h3>B</h3>").expect("parse");
        let layout = lay_out(&blocks, &settings);

        // h1: 40 + 10, p: two lines 40 + 10
        assert_eq!(layout.headings[0].offset_top, 0.0);
        assert_eq!(layout.headings[1].offset_top, 100.0);
        assert_eq!(layout.content_height, 100.0 + 30.0 + 10.0);
    }

    #[test]
    fn loose_text_after_a_heading_stays_out_of_its_title() {
        let blocks = collect_blocks("<h2>Setup</h2>\ntrailing <b>words</b><p>body</p><h3>Next</h3>")
            .expect("parse");

        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0].text, "Setup");
        assert_eq!(blocks[1].kind, BlockKind::Text);
        assert_eq!(blocks[1].text.trim(), "trailing words");
        assert_eq!(blocks[2].text, "body");

        let layout = lay_out(&blocks, &LayoutSettings::default());
        let titles: Vec<_> = layout.headings.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(titles, ["Setup", "Next"]);
    }

    #[test]
    fn entities_are_decoded() {
        assert_eq!(decode_entities("Setup &amp; Run"), "Setup & Run");
        assert_eq!(decode_entities("&lt;T&gt;"), "<T>");
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }
}
