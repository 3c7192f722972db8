use std::{cell::RefCell, rc::Rc};

use lol_html::{RewriteStrSettings, doc_text, element, rewrite_str};

use crate::application::render::types::{ContentMetrics, RenderError};

/// Words per minute used for reading-time estimates.
const WORDS_PER_MINUTE: f32 = 225.0;

#[derive(Default, Clone)]
struct MetricsState {
    words: u32,
    headings: u32,
    code_blocks: u32,
    math_blocks: u32,
}

pub(crate) fn collect_metrics(html: &str) -> Result<ContentMetrics, RenderError> {
    let state = Rc::new(RefCell::new(MetricsState::default()));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("h1, h2, h3, h4, h5, h6", {
                    let state = Rc::clone(&state);
                    move |_el| {
                        let mut state = state.borrow_mut();
                        state.headings = state.headings.saturating_add(1);
                        Ok(())
                    }
                }),
                element!("pre", {
                    let state = Rc::clone(&state);
                    move |_el| {
                        let mut state = state.borrow_mut();
                        state.code_blocks = state.code_blocks.saturating_add(1);
                        Ok(())
                    }
                }),
                element!("[data-math-style]", {
                    let state = Rc::clone(&state);
                    move |_el| {
                        let mut state = state.borrow_mut();
                        state.math_blocks = state.math_blocks.saturating_add(1);
                        Ok(())
                    }
                }),
            ],
            document_content_handlers: vec![doc_text!({
                let state = Rc::clone(&state);
                move |t| {
                    let words = count_words(t.as_str());
                    if words > 0 {
                        let mut state = state.borrow_mut();
                        state.words = state.words.saturating_add(words);
                    }
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::Document {
        message: err.to_string(),
    })?;

    let state = state.borrow().clone();
    Ok(ContentMetrics {
        word_count: state.words,
        reading_time_minutes: reading_time_minutes(state.words),
        heading_count: state.headings,
        code_blocks_count: state.code_blocks,
        math_blocks_count: state.math_blocks,
    })
}

fn reading_time_minutes(words: u32) -> u32 {
    if words == 0 {
        return 0;
    }
    let minutes = (words as f32 / WORDS_PER_MINUTE).ceil() as u32;
    minutes.max(1)
}

/// Whitespace-separated tokens, except that every CJK ideograph counts as a
/// word of its own.
fn count_words(text: &str) -> u32 {
    let mut count: u32 = 0;
    for token in text.split_whitespace() {
        let mut in_word = false;
        for ch in token.chars() {
            if is_cjk(ch) {
                count = count.saturating_add(1);
                in_word = false;
            } else if !in_word {
                count = count.saturating_add(1);
                in_word = true;
            }
        }
    }
    count
}

fn is_cjk(ch: char) -> bool {
    matches!(
        ch as u32,
        0x3040..=0x30FF | 0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xAC00..=0xD7AF | 0xF900..=0xFAFF
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_time_rounds_up() {
        assert_eq!(reading_time_minutes(0), 0);
        assert_eq!(reading_time_minutes(1), 1);
        assert_eq!(reading_time_minutes(225), 1);
        assert_eq!(reading_time_minutes(226), 2);
    }

    #[test]
    fn ideographs_count_individually() {
        assert_eq!(count_words("hello world"), 2);
        assert_eq!(count_words("数值计算"), 4);
        assert_eq!(count_words("Rust 与 数值"), 4);
        assert_eq!(count_words("x86与arm"), 3);
    }

    #[test]
    fn metrics_count_structure() {
        let html = "<h1>Intro</h1><p>one two three</p><pre><code>let x = 1;</code></pre>\
                    <h2>Math</h2><p><span data-math-style=\"inline\">x</span></p>";
        let metrics = collect_metrics(html).expect("metrics");

        assert_eq!(metrics.heading_count, 2);
        assert_eq!(metrics.code_blocks_count, 1);
        assert_eq!(metrics.math_blocks_count, 1);
        assert_eq!(metrics.word_count, 10);
        assert_eq!(metrics.reading_time_minutes, 1);
    }
}
