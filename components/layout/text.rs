/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The text measuring service used by inline layout. Shaping lives outside this crate;
//! layout only asks for advances and break opportunities.

use app_units::Au;
use xi_unicode::LineBreakIterator;

use crate::style::BoxStyle;

pub trait TextMeasurer {
    /// Advance width of `text` set in `style`.
    fn advance(&self, text: &str, style: &BoxStyle) -> Au;

    /// Byte offsets after which a line may break, with `true` for mandatory breaks. The
    /// end of the text is always reported, as a mandatory break.
    fn break_opportunities(&self, text: &str) -> Vec<(usize, bool)> {
        LineBreakIterator::new(text).collect()
    }
}

/// Gives every character the same advance. Useful for tests and for callers that only
/// care about block geometry.
#[derive(Clone, Copy, Debug)]
pub struct FixedAdvanceMeasurer {
    pub advance: Au,
}

impl FixedAdvanceMeasurer {
    pub fn new(advance: Au) -> Self {
        FixedAdvanceMeasurer { advance }
    }
}

impl Default for FixedAdvanceMeasurer {
    fn default() -> Self {
        FixedAdvanceMeasurer::new(Au::from_px(8))
    }
}

impl TextMeasurer for FixedAdvanceMeasurer {
    fn advance(&self, text: &str, _style: &BoxStyle) -> Au {
        self.advance * text.chars().count() as i32
    }
}

pub(crate) fn is_collapsible_space(character: char) -> bool {
    matches!(character, ' ' | '\t' | '\n' | '\r')
}

/// Whether the piece of text ending at a break opportunity forces a new line.
pub(crate) fn ends_with_forced_break(piece: &str, style: &BoxStyle) -> bool {
    style.white_space.preserves_newlines() && piece.ends_with('\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_advance_counts_characters() {
        let measurer = FixedAdvanceMeasurer::new(Au::from_px(10));
        assert_eq!(measurer.advance("héllo", &BoxStyle::inline()), Au::from_px(50));
    }

    #[test]
    fn test_breaks_after_spaces() {
        let measurer = FixedAdvanceMeasurer::default();
        let breaks = measurer.break_opportunities("ab cd");
        assert_eq!(breaks, vec![(3, false), (5, true)]);
    }
}
