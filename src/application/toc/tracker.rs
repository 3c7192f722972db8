//! Selection of the "current" heading from scroll geometry.

use super::surface::Viewport;

/// Tuning knobs for current-heading selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPolicy {
    /// Fraction of the viewport height, measured from the top, where the
    /// activation line sits.
    pub threshold_ratio: f64,
    /// Distance from the document bottom within which the last entry wins.
    pub bottom_tolerance_px: f64,
}

impl Default for TrackPolicy {
    fn default() -> Self {
        Self {
            threshold_ratio: 0.3,
            bottom_tolerance_px: 100.0,
        }
    }
}

impl TrackPolicy {
    pub fn threshold_line(&self, viewport: &Viewport) -> f64 {
        viewport.height * self.threshold_ratio
    }

    /// Whether the viewport rests near the bottom of a scrolled document.
    ///
    /// A document that was never scrolled is treated as being at the top even
    /// when it fits inside the viewport.
    pub fn at_bottom(&self, viewport: &Viewport) -> bool {
        viewport.scroll_top > 0.0
            && viewport.scroll_top + viewport.height
                >= viewport.document_height - self.bottom_tolerance_px
    }
}

/// Pick the index of the current heading.
///
/// `tops` holds each entry's top edge relative to the viewport in document
/// order; `None` marks entries whose node could not be measured. The winner
/// is the heading at or above the threshold line that sits closest to it,
/// with ties going to the earlier entry. Near the bottom of the document the
/// last entry wins regardless of geometry.
///
/// An unscrolled document only ever selects its first measured heading, and
/// only once that heading sits at or above the line.
pub fn select_current(tops: &[Option<f64>], viewport: &Viewport, policy: &TrackPolicy) -> Option<usize> {
    if tops.is_empty() {
        return None;
    }

    if policy.at_bottom(viewport) {
        return Some(tops.len() - 1);
    }

    let line = policy.threshold_line(viewport);
    if viewport.scroll_top <= 0.0 {
        return tops
            .iter()
            .enumerate()
            .find_map(|(index, top)| top.map(|top| (index, top)))
            .filter(|(_, top)| *top <= line)
            .map(|(index, _)| index);
    }

    let mut best: Option<(usize, f64)> = None;
    for (index, top) in tops.iter().enumerate() {
        let Some(top) = *top else {
            continue;
        };
        if top > line {
            continue;
        }
        match best {
            Some((_, best_top)) if top <= best_top => {}
            _ => best = Some((index, top)),
        }
    }

    best.map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(scroll_top: f64) -> Viewport {
        Viewport {
            scroll_top,
            height: 1_000.0,
            document_height: 5_000.0,
        }
    }

    #[test]
    fn nothing_selected_before_first_heading_reaches_line() {
        let tops = [Some(450.0), Some(1_200.0)];
        assert_eq!(select_current(&tops, &viewport(0.0), &TrackPolicy::default()), None);
    }

    #[test]
    fn closest_heading_above_line_wins() {
        let tops = [Some(-900.0), Some(-40.0), Some(120.0), Some(700.0)];
        assert_eq!(
            select_current(&tops, &viewport(1_500.0), &TrackPolicy::default()),
            Some(2)
        );
    }

    #[test]
    fn ties_prefer_document_order() {
        let tops = [Some(10.0), Some(10.0), Some(900.0)];
        assert_eq!(
            select_current(&tops, &viewport(400.0), &TrackPolicy::default()),
            Some(0)
        );
    }

    #[test]
    fn unmeasured_entries_are_skipped() {
        let tops = [Some(-300.0), None, Some(2_000.0)];
        assert_eq!(
            select_current(&tops, &viewport(800.0), &TrackPolicy::default()),
            Some(0)
        );
    }

    #[test]
    fn bottom_of_document_forces_last_entry() {
        let tops = [Some(-2_000.0), Some(-500.0), Some(650.0)];
        assert_eq!(
            select_current(&tops, &viewport(3_950.0), &TrackPolicy::default()),
            Some(2)
        );
    }

    #[test]
    fn short_unscrolled_document_is_not_at_bottom() {
        let short = Viewport {
            scroll_top: 0.0,
            height: 1_000.0,
            document_height: 600.0,
        };
        let tops = [Some(100.0), Some(500.0)];
        assert_eq!(select_current(&tops, &short, &TrackPolicy::default()), Some(0));
    }

    #[test]
    fn unscrolled_page_never_selects_a_later_heading() {
        let tops = [Some(0.0), Some(104.0), Some(962.0)];
        assert_eq!(select_current(&tops, &viewport(0.0), &TrackPolicy::default()), Some(0));

        let unmeasured_first = [None, Some(50.0), Some(200.0)];
        assert_eq!(
            select_current(&unmeasured_first, &viewport(0.0), &TrackPolicy::default()),
            Some(1)
        );
    }
}
