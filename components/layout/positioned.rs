/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Sizing and placement of absolutely and fixed positioned boxes.
//!
//! A positioned box is laid out by its containing block, once that block knows its own
//! size. Offsets resolve against the padding box of the containing block, or against the
//! viewport for fixed boxes. Boxes whose offsets are `auto` sit at their static position,
//! recorded where they would have been in normal flow.

use app_units::Au;
use euclid::num::Zero;

use crate::block::{
    self, ISizeAndMarginsComputer, ISizeConstraintInput, ISizeConstraintSolution,
};
use crate::box_tree::{BoxId, BoxTree};
use crate::context::LayoutContext;
use crate::geom::{LogicalSides, LogicalVec2};
use crate::model::{MaybeAuto, specified, specified_or_none};
use crate::style::Position;

/// The rectangle offsets of a positioned box resolve against.
#[derive(Clone, Copy, Debug)]
pub(crate) struct AbsoluteContainingBlock {
    /// Start corner relative to the border box of the containing block, in the axes of the
    /// containing block.
    pub origin: LogicalVec2<Au>,
    /// Size in the axes of the positioned box.
    pub size: LogicalVec2<Au>,
    /// Whether the inline axis of the positioned box is the block axis of the containing
    /// block.
    pub perpendicular: bool,
}

impl AbsoluteContainingBlock {
    fn to_own_axes(&self, vector: LogicalVec2<Au>) -> LogicalVec2<Au> {
        if self.perpendicular {
            LogicalVec2::new(vector.block, vector.inline)
        } else {
            vector
        }
    }
}

/// The padding box of the containing block of `id`, or the viewport for fixed boxes and
/// boxes without a containing block.
pub(crate) fn absolute_containing_block(
    tree: &BoxTree,
    context: &LayoutContext,
    id: BoxId,
) -> AbsoluteContainingBlock {
    let writing_mode = tree[id].style.writing_mode;
    let container = tree.containing_block(id).filter(|_| tree[id].style.position != Position::Fixed);
    match container {
        Some(container) => {
            let node = &tree[container];
            let perpendicular = node.style.writing_mode.is_horizontal() != writing_mode.is_horizontal();
            let size = LogicalVec2::new(
                node.frame.size.inline - node.border.inline_sum(),
                node.frame.size.block - node.border.block_sum(),
            );
            let block = AbsoluteContainingBlock {
                origin: LogicalVec2::new(node.border.inline_start, node.border.block_start),
                size,
                perpendicular,
            };
            AbsoluteContainingBlock {
                size: block.to_own_axes(size),
                ..block
            }
        },
        None => {
            let root = tree.root().filter(|root| *root != id);
            let root_writing_mode = root.map_or(writing_mode, |root| tree[root].style.writing_mode);
            let perpendicular = root_writing_mode.is_horizontal() != writing_mode.is_horizontal();
            let origin = root.map_or_else(LogicalVec2::zero, |root| -tree[root].frame.start_corner);
            AbsoluteContainingBlock {
                origin,
                size: block::viewport_size(context, writing_mode),
                perpendicular,
            }
        },
    }
}

pub(crate) fn containing_block_size(tree: &BoxTree, context: &LayoutContext, id: BoxId) -> LogicalVec2<Au> {
    absolute_containing_block(tree, context, id).size
}

/// The static position of `id` relative to the start corner of its containing block, in
/// the axes of `id`.
pub(crate) fn static_offset(tree: &BoxTree, context: &LayoutContext, id: BoxId) -> LogicalVec2<Au> {
    let containing_block = absolute_containing_block(tree, context, id);
    let target = tree.containing_block(id);

    // Static positions are recorded relative to the nearest block container that laid the
    // box out.
    let mut offset = tree[id].static_position;
    let mut current = tree.ancestors(id).find(|ancestor| tree[*ancestor].is_block_container());
    while let Some(block) = current {
        if Some(block) == target {
            break;
        }
        offset = offset + tree[block].frame.start_corner;
        current = tree.containing_block(block);
    }
    containing_block.to_own_axes(offset - containing_block.origin)
}

/// The solutions for the block-size-and-margins constraint equation.
#[derive(Clone, Copy, Debug)]
struct BSizeConstraintSolution {
    block_start: Au,
    block_size: Au,
    margin_block_start: Au,
    margin_block_end: Au,
}

impl BSizeConstraintSolution {
    fn new(block_start: Au, block_size: Au, margin_block_start: Au, margin_block_end: Au) -> BSizeConstraintSolution {
        BSizeConstraintSolution {
            block_start,
            block_size,
            margin_block_start,
            margin_block_end,
        }
    }

    /// Solve the vertical constraint equation for absolute non-replaced elements.
    ///
    /// CSS Section 10.6.4
    /// Constraint equation:
    /// block-start + block-end + block-size + margin-block-start + margin-block-end
    /// = absolute containing block block-size - (vertical padding and border)
    /// [aka available_block-size]
    ///
    /// Return the solution for the equation.
    #[allow(clippy::too_many_arguments)]
    fn solve_vertical_constraints_abs_nonreplaced(
        block_size: MaybeAuto,
        block_start_margin: MaybeAuto,
        block_end_margin: MaybeAuto,
        block_start: MaybeAuto,
        block_end: MaybeAuto,
        content_block_size: Au,
        available_block_size: Au,
        static_b_offset: Au,
    ) -> BSizeConstraintSolution {
        // Distance from the block-start edge of the Absolute Containing Block to the
        // block-start margin edge of a hypothetical box that would have been the
        // first box of the element.
        let static_position_block_start = static_b_offset;
        let margin_block_start = block_start_margin.specified_or_zero();
        let margin_block_end = block_end_margin.specified_or_zero();

        let (block_start, block_size, margin_block_start, margin_block_end) =
            match (block_start, block_end, block_size) {
                (MaybeAuto::Auto, MaybeAuto::Auto, MaybeAuto::Auto) => (
                    static_position_block_start,
                    content_block_size,
                    margin_block_start,
                    margin_block_end,
                ),
                (
                    MaybeAuto::Specified(block_start),
                    MaybeAuto::Specified(block_end),
                    MaybeAuto::Specified(block_size),
                ) => {
                    let (start, end) = solve_margins(
                        block_start_margin,
                        block_end_margin,
                        available_block_size - block_start - block_end - block_size,
                        false,
                    );
                    (block_start, block_size, start, end)
                },

                // For the rest of the cases, auto values for margin are set to 0

                // If only one is Auto, solve for it
                (MaybeAuto::Auto, MaybeAuto::Specified(block_end), MaybeAuto::Specified(block_size)) => {
                    let sum = block_end + block_size + margin_block_start + margin_block_end;
                    (available_block_size - sum, block_size, margin_block_start, margin_block_end)
                },
                (MaybeAuto::Specified(block_start), MaybeAuto::Auto, MaybeAuto::Specified(block_size)) => {
                    (block_start, block_size, margin_block_start, margin_block_end)
                },
                (MaybeAuto::Specified(block_start), MaybeAuto::Specified(block_end), MaybeAuto::Auto) => {
                    let sum = block_start + block_end + margin_block_start + margin_block_end;
                    (block_start, available_block_size - sum, margin_block_start, margin_block_end)
                },

                // If block-size is auto, then block-size is content block-size. Solve for the
                // non-auto value.
                (MaybeAuto::Specified(block_start), MaybeAuto::Auto, MaybeAuto::Auto) => {
                    (block_start, content_block_size, margin_block_start, margin_block_end)
                },
                (MaybeAuto::Auto, MaybeAuto::Specified(block_end), MaybeAuto::Auto) => {
                    let sum = block_end + content_block_size + margin_block_start + margin_block_end;
                    (
                        available_block_size - sum,
                        content_block_size,
                        margin_block_start,
                        margin_block_end,
                    )
                },

                (MaybeAuto::Auto, MaybeAuto::Auto, MaybeAuto::Specified(block_size)) => (
                    static_position_block_start,
                    block_size,
                    margin_block_start,
                    margin_block_end,
                ),
            };
        BSizeConstraintSolution::new(block_start, block_size, margin_block_start, margin_block_end)
    }

    /// Solve the vertical constraint equation for absolute replaced elements.
    ///
    /// Assumption: The used value for block-size has already been calculated.
    ///
    /// CSS Section 10.6.5
    fn solve_vertical_constraints_abs_replaced(
        block_size: Au,
        block_start_margin: MaybeAuto,
        block_end_margin: MaybeAuto,
        block_start: MaybeAuto,
        block_end: MaybeAuto,
        available_block_size: Au,
        static_b_offset: Au,
    ) -> BSizeConstraintSolution {
        let margin_block_start = block_start_margin.specified_or_zero();
        let margin_block_end = block_end_margin.specified_or_zero();

        let (block_start, margin_block_start, margin_block_end) = match (block_start, block_end) {
            (MaybeAuto::Auto, MaybeAuto::Auto) => (static_b_offset, margin_block_start, margin_block_end),
            (MaybeAuto::Specified(block_start), MaybeAuto::Specified(block_end)) => {
                let (start, end) = solve_margins(
                    block_start_margin,
                    block_end_margin,
                    available_block_size - block_start - block_end - block_size,
                    false,
                );
                (block_start, start, end)
            },
            // If only one is Auto, solve for it
            (MaybeAuto::Auto, MaybeAuto::Specified(block_end)) => {
                let sum = block_end + block_size + margin_block_start + margin_block_end;
                (available_block_size - sum, margin_block_start, margin_block_end)
            },
            (MaybeAuto::Specified(block_start), MaybeAuto::Auto) => {
                (block_start, margin_block_start, margin_block_end)
            },
        };
        BSizeConstraintSolution::new(block_start, block_size, margin_block_start, margin_block_end)
    }
}

/// Solves the margins of a box whose offsets and size are all specified. `space` is what
/// remains for the margins. Auto margins share it, except that a negative share goes to
/// the end margin in the inline direction. Over-constrained equations give the rest to
/// the end margin.
fn solve_margins(start: MaybeAuto, end: MaybeAuto, space: Au, inline: bool) -> (Au, Au) {
    match (start, end) {
        (MaybeAuto::Auto, MaybeAuto::Auto) => {
            if inline && space < Au::zero() {
                (Au::zero(), space)
            } else {
                (space.scale_by(0.5), space - space.scale_by(0.5))
            }
        },
        (MaybeAuto::Specified(start), MaybeAuto::Auto) => (start, space - start),
        (MaybeAuto::Auto, MaybeAuto::Specified(end)) => (space - end, end),
        (MaybeAuto::Specified(start), MaybeAuto::Specified(end)) => (start, end),
    }
}

pub(crate) struct AbsoluteNonReplaced;
pub(crate) struct AbsoluteReplaced;

/// Places the solved box in the inline direction of its own writing mode.
fn set_inline_position(
    tree: &mut BoxTree,
    context: &LayoutContext,
    id: BoxId,
    solution: &ISizeConstraintSolution,
) {
    let containing_block = absolute_containing_block(tree, context, id);
    let position = solution.inline_start + solution.margin_inline_start;
    let frame = &mut tree[id].frame;
    if containing_block.perpendicular {
        frame.start_corner.block = containing_block.origin.block + position;
    } else {
        frame.start_corner.inline = containing_block.origin.inline + position;
    }
}

/// Offsets on both sides and the size are all known: in right-to-left containing blocks
/// the start offset gives way instead of the end one.
fn solve_over_constrained_inline(
    input: &ISizeConstraintInput,
    inline_start: Au,
    inline_end: Au,
    inline_size: Au,
) -> ISizeConstraintSolution {
    let available = input.available_inline_size;
    let ltr = input.containing_block_is_ltr;
    match (input.inline_start_margin, input.inline_end_margin) {
        (MaybeAuto::Specified(margin_start), MaybeAuto::Specified(margin_end)) => {
            let inline_start = if ltr {
                inline_start
            } else {
                available - (inline_end + inline_size + margin_start + margin_end)
            };
            ISizeConstraintSolution::for_absolute_flow(inline_start, inline_size, margin_start, margin_end)
        },
        (start, end) => {
            let space = available - inline_start - inline_end - inline_size;
            let (mut margin_start, mut margin_end) = solve_margins(start, end, space, true);
            if !ltr && start.is_auto() && end.is_auto() && space < Au::zero() {
                std::mem::swap(&mut margin_start, &mut margin_end);
            }
            ISizeConstraintSolution::for_absolute_flow(inline_start, inline_size, margin_start, margin_end)
        },
    }
}

impl ISizeAndMarginsComputer for AbsoluteNonReplaced {
    /// Solve the horizontal constraint equation for absolute non-replaced elements.
    ///
    /// CSS Section 10.3.7
    /// Constraint equation:
    /// inline-start + inline-end + inline-size + margin-inline-start + margin-inline-end
    /// = absolute containing block inline-size - (horizontal padding and border)
    /// [aka available_inline-size]
    fn solve_inline_size_constraints(
        &self,
        tree: &mut BoxTree,
        context: &LayoutContext,
        id: BoxId,
        input: &ISizeConstraintInput,
    ) -> ISizeConstraintSolution {
        let &ISizeConstraintInput {
            computed_inline_size,
            inline_start_margin,
            inline_end_margin,
            inline_start,
            inline_end,
            available_inline_size,
            static_i_offset,
            ..
        } = input;
        let margin_start = inline_start_margin.specified_or_zero();
        let margin_end = inline_end_margin.specified_or_zero();
        let mut shrink_to_fit =
            |available: Au| block::shrink_to_fit_inline_size(tree, context, id, available.max(Au::zero()));

        let (inline_start, inline_size) = match (inline_start, inline_end, computed_inline_size) {
            (MaybeAuto::Auto, MaybeAuto::Auto, MaybeAuto::Auto) => {
                let inline_size =
                    shrink_to_fit(available_inline_size - (static_i_offset + margin_start + margin_end));
                (static_i_offset, inline_size)
            },
            (
                MaybeAuto::Specified(inline_start),
                MaybeAuto::Specified(inline_end),
                MaybeAuto::Specified(inline_size),
            ) => return solve_over_constrained_inline(input, inline_start, inline_end, inline_size),

            // For the rest of the cases, auto values for margin are set to 0

            // If only one is Auto, solve for it
            (MaybeAuto::Auto, MaybeAuto::Specified(inline_end), MaybeAuto::Specified(inline_size)) => {
                let sum = inline_end + inline_size + margin_start + margin_end;
                (available_inline_size - sum, inline_size)
            },
            (MaybeAuto::Specified(inline_start), MaybeAuto::Auto, MaybeAuto::Specified(inline_size)) => {
                (inline_start, inline_size)
            },
            (MaybeAuto::Specified(inline_start), MaybeAuto::Specified(inline_end), MaybeAuto::Auto) => {
                let sum = inline_start + inline_end + margin_start + margin_end;
                (inline_start, available_inline_size - sum)
            },

            // If inline-size is auto, then inline-size is shrink-to-fit. Solve for the
            // non-auto value.
            (MaybeAuto::Specified(inline_start), MaybeAuto::Auto, MaybeAuto::Auto) => {
                let inline_size =
                    shrink_to_fit(available_inline_size - (inline_start + margin_start + margin_end));
                (inline_start, inline_size)
            },
            (MaybeAuto::Auto, MaybeAuto::Specified(inline_end), MaybeAuto::Auto) => {
                let inline_size =
                    shrink_to_fit(available_inline_size - (inline_end + margin_start + margin_end));
                let sum = inline_end + inline_size + margin_start + margin_end;
                (available_inline_size - sum, inline_size)
            },

            (MaybeAuto::Auto, MaybeAuto::Auto, MaybeAuto::Specified(inline_size)) => {
                (static_i_offset, inline_size)
            },
        };
        ISizeConstraintSolution::for_absolute_flow(
            inline_start,
            inline_size.max(Au::zero()),
            margin_start,
            margin_end,
        )
    }

    fn containing_block_inline_size(&self, tree: &BoxTree, context: &LayoutContext, id: BoxId) -> Au {
        containing_block_size(tree, context, id).inline
    }

    fn set_inline_position_if_necessary(
        &self,
        tree: &mut BoxTree,
        context: &LayoutContext,
        id: BoxId,
        solution: &ISizeConstraintSolution,
    ) {
        set_inline_position(tree, context, id, solution);
    }
}

impl ISizeAndMarginsComputer for AbsoluteReplaced {
    /// Solve the horizontal constraint equation for absolute replaced elements.
    ///
    /// CSS Section 10.3.8
    fn solve_inline_size_constraints(
        &self,
        _: &mut BoxTree,
        _: &LayoutContext,
        _: BoxId,
        input: &ISizeConstraintInput,
    ) -> ISizeConstraintSolution {
        let &ISizeConstraintInput {
            computed_inline_size,
            inline_start_margin,
            inline_end_margin,
            inline_start,
            inline_end,
            available_inline_size,
            static_i_offset,
            ..
        } = input;
        let inline_size = computed_inline_size.specified_or_zero();
        let margin_start = inline_start_margin.specified_or_zero();
        let margin_end = inline_end_margin.specified_or_zero();

        let inline_start = match (inline_start, inline_end) {
            (MaybeAuto::Auto, MaybeAuto::Auto) => static_i_offset,
            // If only one is Auto, solve for it
            (MaybeAuto::Auto, MaybeAuto::Specified(inline_end)) => {
                available_inline_size - (inline_end + inline_size + margin_start + margin_end)
            },
            (MaybeAuto::Specified(inline_start), MaybeAuto::Auto) => inline_start,
            (MaybeAuto::Specified(inline_start), MaybeAuto::Specified(inline_end)) => {
                return solve_over_constrained_inline(input, inline_start, inline_end, inline_size);
            },
        };
        ISizeConstraintSolution::for_absolute_flow(inline_start, inline_size, margin_start, margin_end)
    }

    fn initial_computed_inline_size(
        &self,
        tree: &mut BoxTree,
        context: &LayoutContext,
        id: BoxId,
        containing_block_inline_size: Au,
    ) -> MaybeAuto {
        MaybeAuto::Specified(block::replaced_inline_size(
            tree,
            context,
            id,
            containing_block_inline_size,
        ))
    }

    fn containing_block_inline_size(&self, tree: &BoxTree, context: &LayoutContext, id: BoxId) -> Au {
        containing_block_size(tree, context, id).inline
    }

    fn set_inline_position_if_necessary(
        &self,
        tree: &mut BoxTree,
        context: &LayoutContext,
        id: BoxId,
        solution: &ISizeConstraintSolution,
    ) {
        set_inline_position(tree, context, id, solution);
    }
}

/// Solves the block size, block margins and block position of a positioned box whose
/// content, border and padding end at `logical_height`.
///
/// Non-replaced boxes are solved with their block size, then again with the max and the
/// min block sizes when those are violated (CSS 2.1 § 10.7).
pub(crate) fn compute_block_size_and_position(
    tree: &mut BoxTree,
    context: &LayoutContext,
    id: BoxId,
    logical_height: Au,
) {
    let containing_block = absolute_containing_block(tree, context, id);
    let static_b_offset = static_offset(tree, context, id).block;
    let margin_basis = containing_block.size.inline;
    let containing_block_block_size = containing_block.size.block;

    let node = &tree[id];
    let style = &node.style;
    let border_padding = node.border_padding().block_sum();
    let content_block_size = (logical_height - border_padding).max(Au::zero());
    let available_block_size = containing_block_block_size - border_padding;
    let margin_block_start = MaybeAuto::from_style(style.margin.block_start, margin_basis);
    let margin_block_end = MaybeAuto::from_style(style.margin.block_end, margin_basis);
    let block_start = MaybeAuto::from_style(style.inset.block_start, containing_block_block_size);
    let block_end = MaybeAuto::from_style(style.inset.block_end, containing_block_block_size);

    let solution = if node.is_replaced() {
        BSizeConstraintSolution::solve_vertical_constraints_abs_replaced(
            content_block_size,
            margin_block_start,
            margin_block_end,
            block_start,
            block_end,
            available_block_size,
            static_b_offset,
        )
    } else {
        let solve = |block_size: MaybeAuto| {
            BSizeConstraintSolution::solve_vertical_constraints_abs_nonreplaced(
                block_size,
                margin_block_start,
                margin_block_end,
                block_start,
                block_end,
                content_block_size,
                available_block_size,
                static_b_offset,
            )
        };
        let basis = Some(containing_block_block_size);
        let mut solution = solve(MaybeAuto::from_style(style.block_size, containing_block_block_size));
        if let Some(max) = specified_or_none(style.max_block_size, basis) {
            if solution.block_size > max {
                solution = solve(MaybeAuto::Specified(max));
            }
        }
        let min = specified(style.min_block_size, basis);
        if solution.block_size < min {
            solution = solve(MaybeAuto::Specified(min));
        }
        solution
    };

    let own_margins = block::own_margins(tree, id);
    block::set_used_margins(
        tree,
        id,
        LogicalSides::new(
            solution.margin_block_start,
            own_margins.inline_end,
            solution.margin_block_end,
            own_margins.inline_start,
        ),
    );

    let position = solution.block_start + solution.margin_block_start;
    let frame = &mut tree[id].frame;
    frame.size.block = solution.block_size.max(Au::zero()) + border_padding;
    if containing_block.perpendicular {
        frame.start_corner.inline = containing_block.origin.inline + position;
    } else {
        frame.start_corner.block = containing_block.origin.block + position;
    }
}

/// Whether the block position of `id` follows its static position.
pub(crate) fn has_static_block_position(tree: &BoxTree, id: BoxId) -> bool {
    let inset = &tree[id].style.inset;
    inset.block_start.is_auto() && inset.block_end.is_auto()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(px: i32) -> Au {
        Au::from_px(px)
    }

    #[test]
    fn test_auto_offsets_use_the_static_position() {
        let solution = BSizeConstraintSolution::solve_vertical_constraints_abs_nonreplaced(
            MaybeAuto::Auto,
            MaybeAuto::Auto,
            MaybeAuto::Auto,
            MaybeAuto::Auto,
            MaybeAuto::Auto,
            px(40),
            px(500),
            px(30),
        );
        assert_eq!(solution.block_start, px(30));
        assert_eq!(solution.block_size, px(40));
    }

    #[test]
    fn test_block_end_offset_places_the_box() {
        let solution = BSizeConstraintSolution::solve_vertical_constraints_abs_nonreplaced(
            MaybeAuto::Specified(px(100)),
            MaybeAuto::Specified(px(10)),
            MaybeAuto::Auto,
            MaybeAuto::Auto,
            MaybeAuto::Specified(px(20)),
            px(0),
            px(500),
            px(0),
        );
        assert_eq!(solution.block_start, px(370));
    }

    #[test]
    fn test_both_offsets_stretch_an_auto_size() {
        let solution = BSizeConstraintSolution::solve_vertical_constraints_abs_nonreplaced(
            MaybeAuto::Auto,
            MaybeAuto::Auto,
            MaybeAuto::Auto,
            MaybeAuto::Specified(px(10)),
            MaybeAuto::Specified(px(20)),
            px(0),
            px(500),
            px(0),
        );
        assert_eq!(solution.block_size, px(470));
        assert_eq!(solution.margin_block_start, Au::zero());
    }

    #[test]
    fn test_auto_margins_center_over_constrained_replaced_box() {
        let solution = BSizeConstraintSolution::solve_vertical_constraints_abs_replaced(
            px(100),
            MaybeAuto::Auto,
            MaybeAuto::Auto,
            MaybeAuto::Specified(px(0)),
            MaybeAuto::Specified(px(0)),
            px(300),
            px(0),
        );
        assert_eq!(solution.margin_block_start, px(100));
        assert_eq!(solution.margin_block_end, px(100));
    }

    #[test]
    fn test_negative_inline_space_goes_to_the_end_margin() {
        assert_eq!(
            solve_margins(MaybeAuto::Auto, MaybeAuto::Auto, px(-40), true),
            (Au::zero(), px(-40))
        );
        assert_eq!(
            solve_margins(MaybeAuto::Auto, MaybeAuto::Auto, px(-40), false),
            (px(-20), px(-20))
        );
    }

    #[test]
    fn test_over_constrained_rtl_ignores_the_start_offset() {
        let input = ISizeConstraintInput {
            computed_inline_size: MaybeAuto::Specified(px(100)),
            inline_start_margin: MaybeAuto::Specified(Au::zero()),
            inline_end_margin: MaybeAuto::Specified(Au::zero()),
            inline_start: MaybeAuto::Specified(px(10)),
            inline_end: MaybeAuto::Specified(px(20)),
            available_inline_size: px(400),
            static_i_offset: Au::zero(),
            containing_block_is_ltr: false,
        };
        let solution = solve_over_constrained_inline(&input, px(10), px(20), px(100));
        assert_eq!(solution.inline_start, px(280));
        assert_eq!(solution.inline_size, px(100));
    }
}
