/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Intrinsic (preferred) inline sizes, for shrink-to-fit boxes: floats, inline blocks and
//! absolutely positioned boxes with an auto inline size.

use app_units::Au;
use euclid::num::Zero;

use crate::box_tree::{BoxId, BoxKind, BoxTree, LayoutFlags};
use crate::style::{BoxStyle, Clear, Float, Length};
use crate::text::{TextMeasurer, ends_with_forced_break, is_collapsible_space};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct IntrinsicSizes {
    pub min_content: Au,
    pub max_content: Au,
}

impl IntrinsicSizes {
    pub fn zero() -> Self {
        IntrinsicSizes {
            min_content: Au::zero(),
            max_content: Au::zero(),
        }
    }

    pub fn fixed(size: Au) -> Self {
        IntrinsicSizes {
            min_content: size,
            max_content: size,
        }
    }

    /// Shrink-to-fit: `min(max(min-content, available), max-content)`.
    pub fn shrink_to_fit(&self, available: Au) -> Au {
        self.max_content.min(self.min_content.max(available))
    }

    fn max_assign(&mut self, other: &IntrinsicSizes) {
        self.min_content = self.min_content.max(other.min_content);
        self.max_content = self.max_content.max(other.max_content);
    }
}

/// Fixed parts of the inline margins, borders and padding of a box. Percentages and
/// auto count as zero: there is no containing block yet.
fn inline_pbm(style: &BoxStyle) -> Au {
    let fixed = |length: &Length| match *length {
        Length::Fixed(length) => length,
        _ => Au::zero(),
    };
    style.border.inline_sum() +
        fixed(&style.padding.inline_start) +
        fixed(&style.padding.inline_end) +
        fixed(&style.margin.inline_start) +
        fixed(&style.margin.inline_end)
}

/// <https://dbaron.org/css/intrinsic/#outer-intrinsic>
pub(crate) fn outer_intrinsic_inline_sizes(
    tree: &mut BoxTree,
    measurer: &dyn TextMeasurer,
    id: BoxId,
) -> IntrinsicSizes {
    let style = tree[id].style.clone();
    let mut outer = match style.inline_size {
        Length::Fixed(size) => IntrinsicSizes::fixed(size),
        // Percentages of an unknown containing block behave as auto.
        _ => inner_intrinsic_inline_sizes(tree, measurer, id),
    };
    if let Length::Fixed(max) = style.max_inline_size {
        outer.min_content = outer.min_content.min(max);
        outer.max_content = outer.max_content.min(max);
    }
    if let Length::Fixed(min) = style.min_inline_size {
        outer.min_content = outer.min_content.max(min);
        outer.max_content = outer.max_content.max(min);
    }
    let pbm = inline_pbm(&style);
    outer.min_content += pbm;
    outer.max_content += pbm;
    outer
}

/// Content-box intrinsic sizes, cached until the preferred widths are dirtied.
pub(crate) fn inner_intrinsic_inline_sizes(
    tree: &mut BoxTree,
    measurer: &dyn TextMeasurer,
    id: BoxId,
) -> IntrinsicSizes {
    let node = &tree[id];
    if !node.flags.contains(LayoutFlags::PREFERRED_WIDTHS_DIRTY) {
        if let Some(cached) = node.intrinsic {
            return cached;
        }
    }

    let sizes = match node.kind {
        BoxKind::Replaced { intrinsic_size } => IntrinsicSizes::fixed(intrinsic_size.inline),
        BoxKind::Block(ref block) => {
            if block.children_inline {
                inline_content_sizes(tree, measurer, id)
            } else {
                block_content_sizes(tree, measurer, id)
            }
        },
        _ => IntrinsicSizes::zero(),
    };

    let node = &mut tree[id];
    node.intrinsic = Some(sizes);
    node.flags.remove(LayoutFlags::PREFERRED_WIDTHS_DIRTY);
    sizes
}

fn block_content_sizes(tree: &mut BoxTree, measurer: &dyn TextMeasurer, id: BoxId) -> IntrinsicSizes {
    let mut sizes = IntrinsicSizes::zero();
    // Adjacent floats sit side by side; the running sum of their max-content sizes.
    let mut float_left = Au::zero();
    let mut float_right = Au::zero();
    for child in tree.children(id).to_vec() {
        if tree[child].is_out_of_flow_positioned() {
            continue;
        }
        let child_sizes = outer_intrinsic_inline_sizes(tree, measurer, child);
        let style = &tree[child].style;
        if tree[child].is_floating() {
            match style.clear {
                Clear::Left => float_left = Au::zero(),
                Clear::Right => float_right = Au::zero(),
                Clear::Both => {
                    float_left = Au::zero();
                    float_right = Au::zero();
                },
                Clear::None => {},
            }
            if style.float == Float::Left {
                float_left += child_sizes.max_content;
            } else {
                float_right += child_sizes.max_content;
            }
            sizes.min_content = sizes.min_content.max(child_sizes.min_content);
            sizes.max_content = sizes.max_content.max(float_left + float_right);
            continue;
        }

        // In-flow content goes below the floats unless it can sit next to them.
        let beside_floats = if tree.avoids_floats(child) {
            float_left + float_right
        } else {
            Au::zero()
        };
        sizes.max_assign(&IntrinsicSizes {
            min_content: child_sizes.min_content,
            max_content: child_sizes.max_content + beside_floats,
        });
        float_left = Au::zero();
        float_right = Au::zero();
    }
    sizes
}

/// Line-based sizes: max-content is the longest line with no soft wraps, min-content the
/// widest unbreakable piece.
fn inline_content_sizes(tree: &mut BoxTree, measurer: &dyn TextMeasurer, id: BoxId) -> IntrinsicSizes {
    let mut sizes = IntrinsicSizes::zero();
    let mut line = Au::zero();
    let mut stack: Vec<BoxId> = tree.children(id).iter().rev().copied().collect();
    let style = tree[id].style.clone();
    if let Length::Fixed(indent) = style.text_indent {
        line += indent;
    }

    while let Some(item) = stack.pop() {
        match tree[item].kind {
            BoxKind::Inline => {
                stack.extend(tree.children(item).iter().rev().copied());
            },
            BoxKind::Text(ref text) => {
                let item_style = tree[item].style.clone();
                let mut start = 0;
                for (end, _) in measurer.break_opportunities(text) {
                    let piece = &text[start..end];
                    let trimmed = piece.trim_end_matches(is_collapsible_space);
                    let unbreakable = measurer.advance(trimmed, &item_style);
                    sizes.min_content = sizes.min_content.max(unbreakable);
                    if ends_with_forced_break(piece, &item_style) {
                        line += unbreakable;
                        sizes.max_content = sizes.max_content.max(line);
                        line = Au::zero();
                    } else {
                        line += measurer.advance(piece, &item_style);
                    }
                    start = end;
                }
            },
            BoxKind::LineBreak => {
                sizes.max_content = sizes.max_content.max(line);
                line = Au::zero();
            },
            BoxKind::Replaced { .. } | BoxKind::Block(_) => {
                if tree[item].is_out_of_flow_positioned() {
                    continue;
                }
                let child_sizes = outer_intrinsic_inline_sizes(tree, measurer, item);
                sizes.min_content = sizes.min_content.max(child_sizes.min_content);
                line += child_sizes.max_content;
            },
        }
    }
    sizes.max_content = sizes.max_content.max(line).max(sizes.min_content);
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::FixedAdvanceMeasurer;

    #[test]
    fn test_text_sizes_use_words_and_lines() {
        let measurer = FixedAdvanceMeasurer::new(Au::from_px(10));
        let mut tree = BoxTree::new();
        let block = tree.new_block(BoxStyle::block());
        let text = tree.new_text("aaa bb", BoxStyle::inline());
        tree.append_child(block, text);

        let sizes = inner_intrinsic_inline_sizes(&mut tree, &measurer, block);
        assert_eq!(sizes.min_content, Au::from_px(30));
        assert_eq!(sizes.max_content, Au::from_px(60));
    }

    #[test]
    fn test_fixed_width_wins_and_adds_pbm() {
        let measurer = FixedAdvanceMeasurer::default();
        let mut tree = BoxTree::new();
        let style = BoxStyle {
            inline_size: Length::px(50.),
            padding: crate::geom::LogicalSides::all(Length::px(5.)),
            ..BoxStyle::block()
        };
        let block = tree.new_block(style);
        let sizes = outer_intrinsic_inline_sizes(&mut tree, &measurer, block);
        assert_eq!(sizes, IntrinsicSizes::fixed(Au::from_px(60)));
    }

    #[test]
    fn test_shrink_to_fit_clamps() {
        let sizes = IntrinsicSizes {
            min_content: Au::from_px(30),
            max_content: Au::from_px(60),
        };
        assert_eq!(sizes.shrink_to_fit(Au::from_px(10)), Au::from_px(30));
        assert_eq!(sizes.shrink_to_fit(Au::from_px(45)), Au::from_px(45));
        assert_eq!(sizes.shrink_to_fit(Au::from_px(100)), Au::from_px(60));
    }
}
