/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Layout of block containers.
//!
//! Inline sizes flow down the tree and block sizes flow back up. A block first solves its
//! own inline size and margins against its containing block, then lays out its children:
//! inline children are broken into lines by [`crate::inline`], block children are stacked
//! in the block direction. Each block child is laid out at an estimated position, its
//! before margin is then collapsed with whatever precedes it, floats are cleared, and the
//! child is laid out again if the estimate turned out wrong and anything inside it depends
//! on its position.
//!
//! Once the children are done, the block's own block size is computed, positioned
//! descendants are laid out, and overflow is gathered.

use app_units::Au;
use euclid::num::Zero;
use log::{debug, trace, warn};

use crate::box_tree::{BoxId, BoxKind, BoxTree, LayoutFlags};
use crate::columns::{self, ColumnLayout, ColumnPass};
use crate::context::LayoutContext;
use crate::float;
use crate::geom::{LogicalRect, LogicalSides, LogicalVec2};
use crate::inline;
use crate::intrinsic::inner_intrinsic_inline_sizes;
use crate::margins::{ChildMargins, CollapsedMargin, MarginContainer, MarginInfo, MarginValues, OwnMargins};
use crate::model::{MaybeAuto, specified, specified_or_none};
use crate::pagination;
use crate::positioned::{self, AbsoluteNonReplaced, AbsoluteReplaced};
use crate::style::{Display, Length, MarginCollapse, Position, TextAlign, WritingMode};

/// The inputs for the inline-sizes-and-margins constraint equation.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ISizeConstraintInput {
    pub computed_inline_size: MaybeAuto,
    pub inline_start_margin: MaybeAuto,
    pub inline_end_margin: MaybeAuto,
    pub inline_start: MaybeAuto,
    pub inline_end: MaybeAuto,
    pub available_inline_size: Au,
    pub static_i_offset: Au,
    /// Over-constrained equations drop the margin on the end side of this direction.
    pub containing_block_is_ltr: bool,
}

/// The solutions for the inline-size-and-margins constraint equation.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ISizeConstraintSolution {
    pub inline_start: Au,
    pub inline_size: Au,
    pub margin_inline_start: Au,
    pub margin_inline_end: Au,
}

impl ISizeConstraintSolution {
    pub(crate) fn new(
        inline_size: Au,
        margin_inline_start: Au,
        margin_inline_end: Au,
    ) -> ISizeConstraintSolution {
        ISizeConstraintSolution {
            inline_start: Au::zero(),
            inline_size,
            margin_inline_start,
            margin_inline_end,
        }
    }

    pub(crate) fn for_absolute_flow(
        inline_start: Au,
        inline_size: Au,
        margin_inline_start: Au,
        margin_inline_end: Au,
    ) -> ISizeConstraintSolution {
        ISizeConstraintSolution {
            inline_start,
            inline_size,
            margin_inline_start,
            margin_inline_end,
        }
    }
}

// Trait to encapsulate the ISize and Margin calculation.
//
// CSS Section 10.3
pub(crate) trait ISizeAndMarginsComputer {
    /// Compute the inputs for the ISize constraint equation.
    ///
    /// This is called only once to compute the initial inputs. For calculations involving
    /// minimum and maximum inline-size, we don't need to recompute these.
    fn compute_inline_size_constraint_inputs(
        &self,
        tree: &mut BoxTree,
        context: &LayoutContext,
        id: BoxId,
    ) -> ISizeConstraintInput {
        let containing_block_inline_size = self.containing_block_inline_size(tree, context, id);
        let margin_basis = margin_basis(tree, context, id);
        compute_border_and_padding(tree, id, margin_basis);
        let computed_inline_size =
            self.initial_computed_inline_size(tree, context, id, containing_block_inline_size);

        let node = &tree[id];
        let style = &node.style;
        let static_i_offset = if node.is_out_of_flow_positioned() {
            positioned::static_offset(tree, context, id).inline
        } else {
            Au::zero()
        };
        ISizeConstraintInput {
            computed_inline_size,
            inline_start_margin: MaybeAuto::from_style(style.margin.inline_start, margin_basis),
            inline_end_margin: MaybeAuto::from_style(style.margin.inline_end, margin_basis),
            inline_start: MaybeAuto::from_style(style.inset.inline_start, containing_block_inline_size),
            inline_end: MaybeAuto::from_style(style.inset.inline_end, containing_block_inline_size),
            available_inline_size: containing_block_inline_size - node.border_padding().inline_sum(),
            static_i_offset,
            containing_block_is_ltr: containing_block_is_ltr(tree, id),
        }
    }

    /// Set the used inline size of the border box. Margins are stored by the caller,
    /// together with the block-direction ones.
    fn set_inline_size_constraint_solutions(
        &self,
        tree: &mut BoxTree,
        id: BoxId,
        solution: &ISizeConstraintSolution,
    ) {
        let node = &mut tree[id];
        node.frame.size.inline = solution.inline_size + node.border_padding().inline_sum();
    }

    /// Set the inline position of the box if it is absolutely positioned.
    fn set_inline_position_if_necessary(
        &self,
        _: &mut BoxTree,
        _: &LayoutContext,
        _: BoxId,
        _: &ISizeConstraintSolution,
    ) {
    }

    /// Solve the inline-size and margins constraints for this box.
    fn solve_inline_size_constraints(
        &self,
        tree: &mut BoxTree,
        context: &LayoutContext,
        id: BoxId,
        input: &ISizeConstraintInput,
    ) -> ISizeConstraintSolution;

    fn initial_computed_inline_size(
        &self,
        tree: &mut BoxTree,
        _: &LayoutContext,
        id: BoxId,
        containing_block_inline_size: Au,
    ) -> MaybeAuto {
        MaybeAuto::from_style(tree[id].style.inline_size, containing_block_inline_size)
    }

    fn containing_block_inline_size(&self, tree: &BoxTree, context: &LayoutContext, id: BoxId) -> Au {
        in_flow_containing_block_inline_size(tree, context, id)
    }

    /// Compute the used value of inline-size, taking care of min-inline-size and
    /// max-inline-size.
    ///
    /// CSS Section 10.4: Minimum and Maximum inline-sizes
    fn compute_used_inline_size(
        &self,
        tree: &mut BoxTree,
        context: &LayoutContext,
        id: BoxId,
    ) -> ISizeConstraintSolution {
        let mut input = self.compute_inline_size_constraint_inputs(tree, context, id);
        let containing_block_inline_size = self.containing_block_inline_size(tree, context, id);
        let mut solution = self.solve_inline_size_constraints(tree, context, id, &input);

        // If the tentative used inline-size is greater than 'max-inline-size', inline-size
        // should be recalculated, but this time using the computed value of
        // 'max-inline-size' as the computed value for 'inline-size'.
        let style = tree[id].style.clone();
        match specified_or_none(style.max_inline_size, Some(containing_block_inline_size)) {
            Some(max_inline_size) if max_inline_size < solution.inline_size => {
                input.computed_inline_size = MaybeAuto::Specified(max_inline_size);
                solution = self.solve_inline_size_constraints(tree, context, id, &input);
            },
            _ => {},
        }

        // If the resulting inline-size is smaller than 'min-inline-size', inline-size should
        // be recalculated, but this time using the value of 'min-inline-size' as the
        // computed value for 'inline-size'.
        let computed_min_inline_size =
            specified(style.min_inline_size, Some(containing_block_inline_size));
        if computed_min_inline_size > solution.inline_size {
            input.computed_inline_size = MaybeAuto::Specified(computed_min_inline_size);
            solution = self.solve_inline_size_constraints(tree, context, id, &input);
        }

        self.set_inline_size_constraint_solutions(tree, id, &solution);
        self.set_inline_position_if_necessary(tree, context, id, &solution);
        solution
    }

    /// Computes inline-start and inline-end margins and inline-size.
    ///
    /// This is used by both replaced and non-replaced Blocks.
    ///
    /// CSS 2.1 Section 10.3.3.
    /// Constraint Equation: margin-inline-start + margin-inline-end + inline-size =
    /// available_inline-size
    /// where available_inline-size = CB inline-size - (horizontal border + padding)
    fn solve_block_inline_size_constraints(&self, input: &ISizeConstraintInput) -> ISizeConstraintSolution {
        let (computed_inline_size, inline_start_margin, inline_end_margin, available_inline_size) = (
            input.computed_inline_size,
            input.inline_start_margin,
            input.inline_end_margin,
            input.available_inline_size,
        );

        // If inline-size is not 'auto', and inline-size + margins > available_inline-size,
        // all 'auto' margins are treated as 0.
        let (inline_start_margin, inline_end_margin) = match computed_inline_size {
            MaybeAuto::Auto => (inline_start_margin, inline_end_margin),
            MaybeAuto::Specified(inline_size) => {
                let inline_start = inline_start_margin.specified_or_zero();
                let inline_end = inline_end_margin.specified_or_zero();

                if (inline_start + inline_end + inline_size) > available_inline_size {
                    (MaybeAuto::Specified(inline_start), MaybeAuto::Specified(inline_end))
                } else {
                    (inline_start_margin, inline_end_margin)
                }
            },
        };

        // Invariant: inline-start_margin + inline-size + inline-end_margin ==
        // available_inline-size
        let (inline_start_margin, inline_size, inline_end_margin) =
            match (inline_start_margin, computed_inline_size, inline_end_margin) {
                // If all have a computed value other than 'auto', the system is
                // over-constrained so we discard the margin on the end side.
                (
                    MaybeAuto::Specified(margin_start),
                    MaybeAuto::Specified(inline_size),
                    MaybeAuto::Specified(margin_end),
                ) => {
                    if input.containing_block_is_ltr {
                        (margin_start, inline_size, available_inline_size - (margin_start + inline_size))
                    } else {
                        (available_inline_size - (inline_size + margin_end), inline_size, margin_end)
                    }
                },

                // If exactly one value is 'auto', solve for it
                (MaybeAuto::Auto, MaybeAuto::Specified(inline_size), MaybeAuto::Specified(margin_end)) => {
                    (available_inline_size - (inline_size + margin_end), inline_size, margin_end)
                },
                (MaybeAuto::Specified(margin_start), MaybeAuto::Auto, MaybeAuto::Specified(margin_end)) => (
                    margin_start,
                    available_inline_size - (margin_start + margin_end),
                    margin_end,
                ),
                (MaybeAuto::Specified(margin_start), MaybeAuto::Specified(inline_size), MaybeAuto::Auto) => (
                    margin_start,
                    inline_size,
                    available_inline_size - (margin_start + inline_size),
                ),

                // If inline-size is set to 'auto', any other 'auto' value becomes '0',
                // and inline-size is solved for
                (MaybeAuto::Auto, MaybeAuto::Auto, MaybeAuto::Specified(margin_end)) => {
                    (Au::zero(), available_inline_size - margin_end, margin_end)
                },
                (MaybeAuto::Specified(margin_start), MaybeAuto::Auto, MaybeAuto::Auto) => {
                    (margin_start, available_inline_size - margin_start, Au::zero())
                },
                (MaybeAuto::Auto, MaybeAuto::Auto, MaybeAuto::Auto) => {
                    (Au::zero(), available_inline_size, Au::zero())
                },

                // If inline-start and inline-end margins are auto, they become equal
                (MaybeAuto::Auto, MaybeAuto::Specified(inline_size), MaybeAuto::Auto) => {
                    let margin = (available_inline_size - inline_size).scale_by(0.5);
                    (margin, inline_size, margin)
                },
            };

        ISizeConstraintSolution::new(inline_size.max(Au::zero()), inline_start_margin, inline_end_margin)
    }
}

/// The different types of boxes.
///
/// They mainly differ in the way inline-size and block-sizes and margins are calculated
/// for them.
pub(crate) struct BlockNonReplaced;
pub(crate) struct BlockReplaced;
pub(crate) struct FloatNonReplaced;
pub(crate) struct FloatReplaced;

impl ISizeAndMarginsComputer for BlockNonReplaced {
    fn solve_inline_size_constraints(
        &self,
        _: &mut BoxTree,
        _: &LayoutContext,
        _: BoxId,
        input: &ISizeConstraintInput,
    ) -> ISizeConstraintSolution {
        self.solve_block_inline_size_constraints(input)
    }

    /// Blocks that avoid floats and have an auto inline size fit in the line beside the
    /// floats at their position.
    fn containing_block_inline_size(&self, tree: &BoxTree, context: &LayoutContext, id: BoxId) -> Au {
        let inline_size = in_flow_containing_block_inline_size(tree, context, id);
        if !tree.shrinks_to_avoid_floats(id) {
            return inline_size;
        }
        match tree.containing_block(id) {
            Some(parent) if tree.block(parent).contains_floats() => {
                let logical_top = tree[id].frame.start_corner.block;
                float::available_width_for_line(tree, parent, logical_top).min(inline_size)
            },
            _ => inline_size,
        }
    }
}

impl ISizeAndMarginsComputer for BlockReplaced {
    /// ISize has already been calculated. We now calculate the margins just like for
    /// non-replaced blocks.
    fn solve_inline_size_constraints(
        &self,
        _: &mut BoxTree,
        _: &LayoutContext,
        _: BoxId,
        input: &ISizeConstraintInput,
    ) -> ISizeConstraintSolution {
        debug_assert!(!input.computed_inline_size.is_auto());
        self.solve_block_inline_size_constraints(input)
    }

    fn initial_computed_inline_size(
        &self,
        tree: &mut BoxTree,
        context: &LayoutContext,
        id: BoxId,
        containing_block_inline_size: Au,
    ) -> MaybeAuto {
        MaybeAuto::Specified(replaced_inline_size(tree, context, id, containing_block_inline_size))
    }
}

impl ISizeAndMarginsComputer for FloatNonReplaced {
    /// CSS Section 10.3.5
    ///
    /// If inline-size is computed as 'auto', the used value is the 'shrink-to-fit'
    /// inline-size. Inline blocks (10.3.9) use the same rule.
    fn solve_inline_size_constraints(
        &self,
        tree: &mut BoxTree,
        context: &LayoutContext,
        id: BoxId,
        input: &ISizeConstraintInput,
    ) -> ISizeConstraintSolution {
        let margin_inline_start = input.inline_start_margin.specified_or_zero();
        let margin_inline_end = input.inline_end_margin.specified_or_zero();
        let inline_size = match input.computed_inline_size {
            MaybeAuto::Specified(inline_size) => inline_size,
            MaybeAuto::Auto => {
                let available = input.available_inline_size - margin_inline_start - margin_inline_end;
                shrink_to_fit_inline_size(tree, context, id, available)
            },
        };
        trace!("Shrink-to-fit inline size of {id:?}: {inline_size:?}");
        ISizeConstraintSolution::new(inline_size, margin_inline_start, margin_inline_end)
    }
}

impl ISizeAndMarginsComputer for FloatReplaced {
    fn solve_inline_size_constraints(
        &self,
        _: &mut BoxTree,
        _: &LayoutContext,
        _: BoxId,
        input: &ISizeConstraintInput,
    ) -> ISizeConstraintSolution {
        let margin_inline_start = input.inline_start_margin.specified_or_zero();
        let margin_inline_end = input.inline_end_margin.specified_or_zero();
        let inline_size = input.computed_inline_size.specified_or_zero();
        ISizeConstraintSolution::new(inline_size, margin_inline_start, margin_inline_end)
    }

    fn initial_computed_inline_size(
        &self,
        tree: &mut BoxTree,
        context: &LayoutContext,
        id: BoxId,
        containing_block_inline_size: Au,
    ) -> MaybeAuto {
        MaybeAuto::Specified(replaced_inline_size(tree, context, id, containing_block_inline_size))
    }
}

/// Shrink-to-fit inline size of the content box, for `available` inline space.
pub(crate) fn shrink_to_fit_inline_size(
    tree: &mut BoxTree,
    context: &LayoutContext,
    id: BoxId,
    available: Au,
) -> Au {
    inner_intrinsic_inline_sizes(tree, context.text_measurer(), id).shrink_to_fit(available)
}

/// The viewport in the axes of `writing_mode`.
pub(crate) fn viewport_size(context: &LayoutContext, writing_mode: WritingMode) -> LogicalVec2<Au> {
    let width = context.options.viewport_inline_size();
    let height = context.options.viewport_block_size();
    if writing_mode.is_horizontal() {
        LogicalVec2::new(width, height)
    } else {
        LogicalVec2::new(height, width)
    }
}

/// Whether the inline axis of `id` is the block axis of its containing block.
pub(crate) fn is_perpendicular_to_containing_block(tree: &BoxTree, id: BoxId) -> bool {
    tree.containing_block(id).is_some_and(|container| {
        tree[container].style.writing_mode.is_horizontal() != tree[id].style.writing_mode.is_horizontal()
    })
}

fn containing_block_is_ltr(tree: &BoxTree, id: BoxId) -> bool {
    tree.containing_block(id)
        .map_or(tree[id].style.is_left_to_right_direction(), |container| {
            tree[container].style.is_left_to_right_direction()
        })
}

/// The space an in-flow box fills in its own inline axis.
fn in_flow_containing_block_inline_size(tree: &BoxTree, context: &LayoutContext, id: BoxId) -> Au {
    let writing_mode = tree[id].style.writing_mode;
    let Some(container) = tree.containing_block(id) else {
        return viewport_size(context, writing_mode).inline;
    };
    if !is_perpendicular_to_containing_block(tree, id) {
        return tree[container].content_inline_size();
    }
    definite_content_block_size(tree, context, container)
        .unwrap_or_else(|| viewport_size(context, writing_mode).inline)
}

/// What percentages of margins and padding resolve against: the inline size of the
/// containing block.
pub(crate) fn margin_basis(tree: &BoxTree, context: &LayoutContext, id: BoxId) -> Au {
    if tree[id].is_out_of_flow_positioned() {
        return positioned::containing_block_size(tree, context, id).inline;
    }
    match tree.containing_block(id) {
        Some(container) => tree[container].content_inline_size(),
        None => viewport_size(context, tree[id].style.writing_mode).inline,
    }
}

fn compute_border_and_padding(tree: &mut BoxTree, id: BoxId, basis: Au) {
    let node = &mut tree[id];
    node.border = node.style.border;
    node.padding = node.style.padding.map(|padding| padding.resolve_or_zero(basis));
}

/// Stores margins given in the writing mode of `id` in the writing mode of its containing
/// block.
pub(crate) fn set_used_margins(tree: &mut BoxTree, id: BoxId, own: LogicalSides<Au>) {
    tree[id].margin = if is_perpendicular_to_containing_block(tree, id) {
        LogicalSides::new(own.inline_start, own.block_end, own.inline_end, own.block_start)
    } else {
        own
    };
}

/// The used margins of `id` in its own writing mode.
pub(crate) fn own_margins(tree: &BoxTree, id: BoxId) -> LogicalSides<Au> {
    let margin = tree[id].margin;
    if is_perpendicular_to_containing_block(tree, id) {
        LogicalSides::new(margin.inline_start, margin.block_end, margin.inline_end, margin.block_start)
    } else {
        margin
    }
}

/// Solves the inline size, borders, padding and margins of `id`. For positioned boxes this
/// also places them in the inline direction.
pub(crate) fn compute_inline_size_and_margins(tree: &mut BoxTree, context: &LayoutContext, id: BoxId) {
    let node = &tree[id];
    let replaced = node.is_replaced();
    let solution = if node.is_out_of_flow_positioned() {
        if replaced {
            AbsoluteReplaced.compute_used_inline_size(tree, context, id)
        } else {
            AbsoluteNonReplaced.compute_used_inline_size(tree, context, id)
        }
    } else if node.is_floating() || node.is_atomic_inline() {
        if replaced {
            FloatReplaced.compute_used_inline_size(tree, context, id)
        } else {
            FloatNonReplaced.compute_used_inline_size(tree, context, id)
        }
    } else if replaced {
        BlockReplaced.compute_used_inline_size(tree, context, id)
    } else {
        BlockNonReplaced.compute_used_inline_size(tree, context, id)
    };

    let basis = margin_basis(tree, context, id);
    let margin = tree[id].style.margin;
    let own = LogicalSides::new(
        MaybeAuto::from_style(margin.block_start, basis).specified_or_zero(),
        solution.margin_inline_end,
        MaybeAuto::from_style(margin.block_end, basis).specified_or_zero(),
        solution.margin_inline_start,
    );
    set_used_margins(tree, id, own);

    if tree.is_root(id) {
        let node = &mut tree[id];
        node.frame.start_corner = node.margin.start_offset();
    }
}

/// Refreshes the block-direction margins of an in-flow child before it is positioned.
fn compute_block_direction_margins(tree: &mut BoxTree, context: &LayoutContext, child: BoxId) {
    if is_perpendicular_to_containing_block(tree, child) {
        return;
    }
    let basis = margin_basis(tree, context, child);
    let node = &mut tree[child];
    let margin = node.style.margin;
    node.margin.block_start = MaybeAuto::from_style(margin.block_start, basis).specified_or_zero();
    node.margin.block_end = MaybeAuto::from_style(margin.block_end, basis).specified_or_zero();
}

/// The content block size of `id` when it does not depend on its content.
pub(crate) fn definite_content_block_size(tree: &BoxTree, context: &LayoutContext, id: BoxId) -> Option<Au> {
    let style = &tree[id].style;
    let basis = || percentage_basis(tree, context, id).map(|(size, _)| size);
    let size = match style.block_size {
        Length::Fixed(size) => size,
        Length::Percentage(percentage) => basis()?.scale_by(percentage),
        Length::Auto => return None,
    };
    let needs_basis = style.max_block_size.is_percentage() || style.min_block_size.is_percentage();
    let basis = if needs_basis { basis() } else { None };
    let size = specified_or_none(style.max_block_size, basis).map_or(size, |max| size.min(max));
    Some(size.max(specified(style.min_block_size, basis)).max(Au::zero()))
}

/// The size that percentage block sizes of `id` resolve against, and the block that
/// provides it (`None` for the viewport). Anonymous blocks are transparent; in quirks mode
/// so are blocks with an auto block size.
pub(crate) fn percentage_basis(
    tree: &BoxTree,
    context: &LayoutContext,
    id: BoxId,
) -> Option<(Au, Option<BoxId>)> {
    let quirks = context.options.quirks_mode;
    let mut current = tree.containing_block(id);
    while let Some(container) = current {
        let node = &tree[container];
        let transparent = node.is_anonymous() ||
            (quirks &&
                node.style.block_size.is_auto() &&
                node.style.display != Display::TableCell &&
                !node.is_out_of_flow_positioned());
        if !transparent {
            break;
        }
        current = tree.containing_block(container);
    }

    match current {
        Some(container) => {
            definite_content_block_size(tree, context, container).map(|size| (size, Some(container)))
        },
        None => {
            let writing_mode = tree.root().map_or(WritingMode::empty(), |root| tree[root].style.writing_mode);
            Some((viewport_size(context, writing_mode).block, None))
        },
    }
}

/// Quirks mode makes the root and the body fill the viewport.
fn stretches_to_viewport(tree: &BoxTree, context: &LayoutContext, id: BoxId) -> bool {
    let node = &tree[id];
    context.options.quirks_mode &&
        node.style.block_size.is_auto() &&
        !node.is_floating_or_out_of_flow_positioned() &&
        (tree.is_root(id) || (node.style.is_body && tree.parent(id).is_some_and(|parent| tree.is_root(parent))))
}

/// CSS 2.1 § 10.6.3 and § 10.7: the border-box block size of an in-flow or floating block
/// whose content ended at `logical_height`.
pub(crate) fn compute_block_size(
    tree: &mut BoxTree,
    context: &LayoutContext,
    id: BoxId,
    logical_height: Au,
) -> Au {
    let style = tree[id].style.clone();
    let border_padding = tree[id].border_padding().block_sum();
    let needs_basis = style.block_size.is_percentage() ||
        style.min_block_size.is_percentage() ||
        style.max_block_size.is_percentage();
    let basis = if needs_basis {
        percentage_basis(tree, context, id)
    } else {
        None
    };
    if style.block_size.is_percentage() {
        if let Some((_, Some(container))) = basis {
            tree.add_percent_height_descendant(container, id);
        }
    }
    let basis = basis.map(|(size, _)| size);

    let mut content = MaybeAuto::from_option(style.block_size, basis)
        .specified_or_default(logical_height - border_padding);
    if let Some(max) = specified_or_none(style.max_block_size, basis) {
        content = content.min(max);
    }
    content = content.max(specified(style.min_block_size, basis));

    if stretches_to_viewport(tree, context, id) {
        let node = &tree[id];
        let mut fill = viewport_size(context, node.style.writing_mode).block -
            node.margin.block_sum() -
            border_padding;
        if !tree.is_root(id) {
            if let Some(root) = tree.root() {
                fill -= tree[root].margin.block_sum() + tree[root].border_padding().block_sum();
            }
        }
        content = content.max(fill);
    }
    content.max(Au::zero()) + border_padding
}

fn scale(length: Au, numerator: Au, denominator: Au) -> Au {
    if denominator <= Au::zero() {
        return length;
    }
    Au((length.0 as i64 * numerator.0 as i64 / denominator.0 as i64) as i32)
}

fn intrinsic_size(tree: &BoxTree, id: BoxId) -> LogicalVec2<Au> {
    match tree[id].kind {
        BoxKind::Replaced { intrinsic_size } => intrinsic_size,
        _ => LogicalVec2::zero(),
    }
}

/// CSS 2.1 § 10.3.2: the content inline size of a replaced box, before min and max.
pub(crate) fn replaced_inline_size(
    tree: &BoxTree,
    context: &LayoutContext,
    id: BoxId,
    containing_block_inline_size: Au,
) -> Au {
    let style = &tree[id].style;
    let intrinsic = intrinsic_size(tree, id);
    match MaybeAuto::from_style(style.inline_size, containing_block_inline_size) {
        MaybeAuto::Specified(inline_size) => inline_size,
        MaybeAuto::Auto => {
            let basis = if style.block_size.is_percentage() {
                percentage_basis(tree, context, id).map(|(size, _)| size)
            } else {
                None
            };
            match MaybeAuto::from_option(style.block_size, basis) {
                MaybeAuto::Specified(block_size) => scale(intrinsic.inline, block_size, intrinsic.block),
                MaybeAuto::Auto => intrinsic.inline,
            }
        },
    }
}

/// CSS 2.1 § 10.6.2: the content block size of a replaced box whose inline size is known.
fn replaced_block_size(tree: &BoxTree, context: &LayoutContext, id: BoxId) -> Au {
    let node = &tree[id];
    let style = &node.style;
    let intrinsic = intrinsic_size(tree, id);
    let needs_basis = style.block_size.is_percentage() ||
        style.min_block_size.is_percentage() ||
        style.max_block_size.is_percentage();
    let basis = if needs_basis {
        percentage_basis(tree, context, id).map(|(size, _)| size)
    } else {
        None
    };
    let size = match MaybeAuto::from_option(style.block_size, basis) {
        MaybeAuto::Specified(block_size) => block_size,
        MaybeAuto::Auto => scale(intrinsic.block, node.content_inline_size(), intrinsic.inline),
    };
    let size = specified_or_none(style.max_block_size, basis).map_or(size, |max| size.min(max));
    size.max(specified(style.min_block_size, basis)).max(Au::zero())
}

/// The border-box inline size `child` would have with its top at `logical_top` in
/// `block`. Only blocks that shrink to avoid floats depend on their position.
pub(crate) fn border_box_inline_size_at(
    tree: &mut BoxTree,
    context: &LayoutContext,
    block: BoxId,
    child: BoxId,
    logical_top: Au,
) -> Au {
    let basis = tree[block].content_inline_size();
    if tree[child].is_replaced() {
        let style = &tree[child].style;
        let border_padding = style.border.inline_sum() +
            style.padding.inline_start.resolve_or_zero(basis) +
            style.padding.inline_end.resolve_or_zero(basis);
        let mut content = replaced_inline_size(tree, context, child, basis);
        if let Some(max) = specified_or_none(style.max_inline_size, Some(basis)) {
            content = content.min(max);
        }
        content = content.max(specified(style.min_inline_size, Some(basis)));
        return content.max(Au::zero()) + border_padding;
    }
    if !tree.shrinks_to_avoid_floats(child) {
        return tree.size_in_containing_block(child).inline;
    }
    let available = float::available_width_for_line(tree, block, logical_top).min(basis);
    let style = &tree[child].style;
    let margins = MaybeAuto::from_style(style.margin.inline_start, basis).specified_or_zero() +
        MaybeAuto::from_style(style.margin.inline_end, basis).specified_or_zero();
    let border_padding = style.border.inline_sum() +
        style.padding.inline_start.resolve_or_zero(basis) +
        style.padding.inline_end.resolve_or_zero(basis);
    let mut content = available - margins - border_padding;
    if let Some(max) = specified_or_none(style.max_inline_size, Some(basis)) {
        content = content.min(max);
    }
    content = content.max(specified(style.min_inline_size, Some(basis)));
    content.max(Au::zero()) + border_padding
}

pub(crate) fn logical_height(tree: &BoxTree, block: BoxId) -> Au {
    tree[block].frame.size.block
}

pub(crate) fn set_logical_height(tree: &mut BoxTree, block: BoxId, height: Au) {
    tree[block].frame.size.block = height;
}

/// Grows the overflow of `block` to include `rect`, given in its border-box coordinates.
pub(crate) fn add_overflow_rect(tree: &mut BoxTree, block: BoxId, rect: LogicalRect<Au>) {
    let size = tree[block].frame.size;
    let border_box = LogicalRect::new(Au::zero(), Au::zero(), size.inline, size.block);
    let flow = tree.block_mut(block);
    let union = flow.overflow.unwrap_or(border_box).union(&rect);
    flow.overflow = (union != border_box).then_some(union);
}

/// Reports `rect`, relative to the border box of the block at the top of the layout state
/// stack, for repaint.
fn repaint_rect(tree: &BoxTree, context: &mut LayoutContext, rect: LogicalRect<Au>) {
    let writing_mode = tree
        .root()
        .map_or(WritingMode::empty(), |root| tree[root].style.writing_mode);
    let rect = rect.translate(context.layout_offset());
    context.add_repaint_rect(rect.to_physical(writing_mode));
}

const LAYOUT_FLAGS: LayoutFlags = LayoutFlags::SELF_NEEDS_LAYOUT
    .union(LayoutFlags::NORMAL_CHILD_NEEDS_LAYOUT)
    .union(LayoutFlags::POSITIONED_CHILD_NEEDS_LAYOUT);

/// Lays out `id` if it or anything it contains was marked for layout.
pub(crate) fn layout_if_needed(tree: &mut BoxTree, context: &mut LayoutContext, id: BoxId) {
    if !tree.contains(id) || !tree[id].needs_layout() {
        return;
    }
    match tree[id].kind {
        BoxKind::Block(_) => layout_block(tree, context, id, false, ColumnPass::Initial),
        BoxKind::Replaced { .. } => layout_replaced(tree, context, id),
        _ => tree[id].flags.remove(LAYOUT_FLAGS),
    }
}

fn layout_replaced(tree: &mut BoxTree, context: &mut LayoutContext, id: BoxId) {
    let old_frame = tree[id].frame;
    let had_layout = tree[id].flags.contains(LayoutFlags::EVER_HAD_LAYOUT);

    compute_inline_size_and_margins(tree, context, id);
    let border_padding = tree[id].border_padding().block_sum();
    let block_size = replaced_block_size(tree, context, id) + border_padding;
    if tree[id].is_out_of_flow_positioned() {
        positioned::compute_block_size_and_position(tree, context, id, block_size);
    } else {
        set_logical_height(tree, id, block_size);
    }

    let node = &mut tree[id];
    node.flags.remove(LAYOUT_FLAGS);
    node.flags.insert(LayoutFlags::EVER_HAD_LAYOUT);
    let new_frame = node.frame;
    if had_layout && new_frame.size != old_frame.size {
        repaint_rect(tree, context, old_frame);
        repaint_rect(tree, context, new_frame);
    }
}

/// Lays out a block container and everything inside it that needs layout.
///
/// `pass` is [`ColumnPass::Initial`] except for the one extra pass a multi-column block
/// runs with its balanced column height.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        name = "BlockFlow::layout",
        skip_all,
        fields(servo_profiling = true),
        level = "trace",
    )
)]
pub(crate) fn layout_block(
    tree: &mut BoxTree,
    context: &mut LayoutContext,
    block: BoxId,
    relayout_children: bool,
    pass: ColumnPass,
) {
    let mut relayout_children = relayout_children || context.options.nonincremental_layout;
    if !relayout_children && pass == ColumnPass::Initial && simplified_layout(tree, context, block) {
        return;
    }

    let had_layout = tree[block].flags.contains(LayoutFlags::EVER_HAD_LAYOUT);
    let old_frame = tree[block].frame;
    let old_column_width = column_width(tree, block);

    compute_inline_size_and_margins(tree, context, block);
    columns::calc_column_width(tree, context, block);
    tree.block_mut(block).overflow = None;
    if old_frame.size.inline != tree[block].frame.size.inline || old_column_width != column_width(tree, block) {
        relayout_children = true;
    }

    float::clear_floats(tree, block);

    let previous_height = old_frame.size.block;
    set_logical_height(tree, block, Au::zero());

    let has_columns = tree.block(block).has_columns();
    let mut page_height = pass.column_height();
    let mut has_specified_page_height = false;
    let mut page_height_changed = false;
    if has_columns {
        if page_height == Au::zero() {
            if let Some(height) = definite_content_block_size(tree, context, block) {
                if height > Au::zero() {
                    page_height = height;
                    has_specified_page_height = true;
                }
            }
        }
        if let Some(info) = tree.block_mut(block).column_info.as_deref_mut() {
            if info.column_height() != page_height {
                info.set_column_height(page_height);
                page_height_changed = true;
            }
            if !has_specified_page_height && page_height == Au::zero() {
                info.clear_forced_breaks();
            }
        }
    }

    let position = tree[block].frame.start_corner;
    if has_columns {
        let content_top = tree[block].content_block_start();
        context.push_column_state(block, position, content_top, page_height, page_height_changed);
    } else {
        context.push_layout_state(position, tree.is_writing_mode_root(block));
    }

    let is_table_cell = tree[block].style.display == Display::TableCell;
    let node = &tree[block];
    let mut own = if is_table_cell {
        OwnMargins {
            before: CollapsedMargin::zero(),
            after: CollapsedMargin::zero(),
            margin_before: Au::zero(),
            margin_after: Au::zero(),
            before_quirk: false,
            after_quirk: false,
        }
    } else {
        OwnMargins {
            before: CollapsedMargin::new(node.margin.block_start),
            after: CollapsedMargin::new(node.margin.block_end),
            margin_before: node.margin.block_start,
            margin_after: node.margin.block_end,
            before_quirk: node.style.margin_before_quirk,
            after_quirk: node.style.margin_after_quirk,
        }
    };
    if !is_table_cell {
        tree.block_mut(block).pagination_strut = Au::zero();
    }

    let mut repaint = (Au::zero(), Au::zero());
    let mut max_float_bottom = Au::zero();
    if tree.block(block).children_inline {
        repaint = inline::layout_inline_children(tree, context, block, relayout_children);
    } else {
        max_float_bottom = layout_block_children(tree, context, block, relayout_children, &mut own);
    }

    // Floats inside blocks that establish a formatting context are part of their height.
    let after_edge = tree[block].border_padding().block_end;
    let lowest_float = float::lowest_float_bottom(tree, block, None);
    if lowest_float > logical_height(tree, block) - after_edge && tree.expands_to_enclose_overhanging_floats(block) {
        set_logical_height(tree, block, lowest_float + after_edge);
    }

    if has_columns {
        let height = logical_height(tree, block);
        match columns::layout_columns(
            tree,
            context,
            block,
            has_specified_page_height,
            page_height,
            pass,
            height,
        ) {
            ColumnLayout::Rebalance(column_height) => {
                context.pop_layout_state();
                layout_block(tree, context, block, false, ColumnPass::Corrective(column_height));
                return;
            },
            ColumnLayout::Done(Some(height)) => set_logical_height(tree, block, height),
            ColumnLayout::Done(None) => {},
        }
    }

    let old_height = logical_height(tree, block);
    let old_client_after_edge = old_height - after_edge;
    if tree[block].is_out_of_flow_positioned() {
        positioned::compute_block_size_and_position(tree, context, block, old_height);
    } else {
        let height = compute_block_size(tree, context, block, old_height);
        set_logical_height(tree, block, height);
    }
    let new_height = logical_height(tree, block);

    // Floats that overhung the old bottom may now overhang the new one.
    if old_height > new_height && max_float_bottom > new_height && !tree.block(block).children_inline {
        for child in tree.children(block).to_vec() {
            if !tree.is_block(child) || tree[child].is_floating_or_out_of_flow_positioned() {
                continue;
            }
            let child_top = tree[child].frame.start_corner.block;
            if child_top + float::lowest_float_bottom(tree, child, None) > new_height {
                float::add_overhanging_floats(tree, block, child, false, new_height);
            }
        }
    }

    if previous_height != new_height {
        relayout_children = true;
    }
    let is_root = tree.is_root(block);
    layout_positioned_objects(tree, context, block, relayout_children || is_root);
    compute_overflow(tree, block, old_client_after_edge, false);

    if repaint.0 != repaint.1 {
        let node = &tree[block];
        let overflow = tree.block(block).overflow;
        let (inline_start, inline_end) = match overflow {
            Some(overflow) => (overflow.min_inline_position(), overflow.max_inline_position()),
            None => (Au::zero(), node.frame.size.inline),
        };
        let mut rect = LogicalRect::new(inline_start, repaint.0, inline_end - inline_start, repaint.1 - repaint.0);
        if has_columns {
            let writing_mode = node.style.writing_mode;
            let adjusted = columns::adjust_rect_for_columns(tree, block, rect.to_physical(writing_mode));
            rect = LogicalRect::from_physical(adjusted, writing_mode);
        }
        repaint_rect(tree, context, rect);
    }

    context.pop_layout_state();

    if context.page_logical_height() > Au::zero() {
        let offset = context.page_logical_offset(tree[block].frame.start_corner.block);
        tree.block_mut(block).page_logical_offset = offset;
    }

    let values = own.values();
    let node = &mut tree[block];
    node.flags.remove(LAYOUT_FLAGS);
    node.flags.insert(LayoutFlags::EVER_HAD_LAYOUT);
    node.flags.set(LayoutFlags::MARGIN_BEFORE_QUIRK, own.before_quirk);
    node.flags.set(LayoutFlags::MARGIN_AFTER_QUIRK, own.after_quirk);
    let own_values = MarginValues::from_margins(node.margin.block_start, node.margin.block_end);
    let new_frame = node.frame;
    tree.block_mut(block).margin_values = (!is_table_cell && values != own_values).then_some(values);

    if had_layout && new_frame != old_frame {
        repaint_rect(tree, context, old_frame);
        repaint_rect(tree, context, new_frame);
    }
    trace!("Laid out {block:?}: {new_frame:?}");
}

fn column_width(tree: &BoxTree, block: BoxId) -> Option<Au> {
    tree.block(block)
        .column_info
        .as_deref()
        .map(|info| info.desired_column_width())
}

/// Relayout that only touches positioned descendants, when nothing else changed.
fn simplified_layout(tree: &mut BoxTree, context: &mut LayoutContext, block: BoxId) -> bool {
    let flags = tree[block].flags;
    if !flags.contains(LayoutFlags::POSITIONED_CHILD_NEEDS_LAYOUT) ||
        flags.intersects(LayoutFlags::SELF_NEEDS_LAYOUT | LayoutFlags::NORMAL_CHILD_NEEDS_LAYOUT)
    {
        return false;
    }
    debug!("Simplified layout of {block:?}");

    let position = tree[block].frame.start_corner;
    let column_height = tree.block(block).column_info.as_deref().map(|info| info.column_height());
    match column_height {
        Some(column_height) => {
            let content_top = tree[block].content_block_start();
            context.push_column_state(block, position, content_top, column_height, false);
        },
        None => context.push_layout_state(position, tree.is_writing_mode_root(block)),
    }

    layout_positioned_objects(tree, context, block, false);
    let old_client_after_edge = logical_height(tree, block) - tree[block].border_padding().block_end;
    compute_overflow(tree, block, old_client_after_edge, true);

    context.pop_layout_state();
    tree[block].flags.remove(LAYOUT_FLAGS);
    true
}

fn margin_container(tree: &BoxTree, block: BoxId) -> MarginContainer {
    let node = &tree[block];
    let style = &node.style;
    let is_table_cell = style.display == Display::TableCell;
    let border_padding = node.border_padding();
    let can_collapse_with_children = !tree.is_root(block) &&
        !node.is_floating_or_out_of_flow_positioned() &&
        !is_table_cell &&
        !style.has_overflow_clip() &&
        !node.is_atomic_inline() &&
        !tree.is_writing_mode_root(block) &&
        !tree.block(block).has_columns();
    MarginContainer {
        can_collapse_with_children,
        before_border_padding: border_padding.block_start,
        after_border_padding: border_padding.block_end,
        has_auto_block_size: style.block_size.is_auto(),
        is_quirk_container: MarginContainer::is_quirk_container(style, is_table_cell),
        margin_before_collapse: style.margin_before_collapse,
        margin_after_collapse: style.margin_after_collapse,
    }
}

/// Lays out the block-level children of `block` and returns the lowest bottom of the
/// floats overhanging out of them.
fn layout_block_children(
    tree: &mut BoxTree,
    context: &mut LayoutContext,
    block: BoxId,
    relayout_children: bool,
    own: &mut OwnMargins,
) -> Au {
    // Descendants whose percentage block size resolved against this block.
    if let Some(descendants) = tree.block(block).percent_height_descendants.clone() {
        for descendant in descendants {
            let mut current = descendant;
            while tree.contains(current) && current != block {
                tree[current].flags.insert(LayoutFlags::NORMAL_CHILD_NEEDS_LAYOUT);
                match tree.containing_block(current) {
                    Some(container) => current = container,
                    None => break,
                }
            }
        }
    }

    let border_padding = tree[block].border_padding();
    let mut height = border_padding.block_start;
    let container = margin_container(tree, block);
    let mut margin_info = MarginInfo::new(&container, own.before, context.options.quirks_mode);
    let mut previous_float_bottom = Au::zero();
    let mut max_float_bottom = Au::zero();

    for child in tree.children(block).to_vec() {
        // Run-in merging removes children as we go.
        if tree.parent(child) != Some(block) {
            continue;
        }
        let style = tree[child].style.clone();
        if relayout_children ||
            style.block_size.is_percentage() ||
            style.min_block_size.is_percentage() ||
            style.max_block_size.is_percentage()
        {
            tree[child].flags.insert(LayoutFlags::NORMAL_CHILD_NEEDS_LAYOUT);
        }
        if relayout_children &&
            (style.padding.inline_start.is_percentage() || style.padding.inline_end.is_percentage())
        {
            tree[child].flags.insert(LayoutFlags::PREFERRED_WIDTHS_DIRTY);
        }

        if handle_special_child(tree, context, block, child, &mut margin_info, height) {
            continue;
        }
        if !tree.is_block(child) && !tree[child].is_replaced() {
            warn!("Inline-level {child:?} among the block children of {block:?}");
            continue;
        }

        layout_block_child(
            tree,
            context,
            block,
            child,
            &mut margin_info,
            own,
            &mut height,
            &mut previous_float_bottom,
            &mut max_float_bottom,
        );
    }

    let height = margin_info.handle_after_side(
        height,
        border_padding.block_start,
        border_padding.block_end,
        own,
    );
    set_logical_height(tree, block, height);
    max_float_bottom
}

/// Positioned, floating and run-in children are not stacked. Returns whether `child` was
/// one of those.
fn handle_special_child(
    tree: &mut BoxTree,
    context: &mut LayoutContext,
    block: BoxId,
    child: BoxId,
    margin_info: &mut MarginInfo,
    height: Au,
) -> bool {
    let node = &tree[child];
    if node.is_out_of_flow_positioned() {
        if let Some(container) = tree.containing_block(child) {
            tree.insert_positioned_object(container, child);
        }
        adjust_positioned_block(tree, context, block, child, margin_info, height);
        return true;
    }
    if node.is_floating() {
        float::insert_float(tree, context, block, child);
        // Floats go below the margin of whatever precedes them, unless that margin may
        // still collapse through our before side.
        let margin_offset = if margin_info.can_collapse_with_margin_before() {
            Au::zero()
        } else {
            margin_info.margin().solve()
        };
        float::position_new_floats(tree, context, block, height + margin_offset);
        return true;
    }
    if node.style.display == Display::RunIn {
        return handle_run_in_child(tree, child);
    }
    false
}

/// Records the static position of a positioned child of a block with block children.
fn adjust_positioned_block(
    tree: &mut BoxTree,
    context: &LayoutContext,
    block: BoxId,
    child: BoxId,
    margin_info: &MarginInfo,
    height: Au,
) {
    let static_inline = tree[block].content_inline_start();
    let mut static_block = height;
    if !margin_info.can_collapse_with_margin_before() {
        let basis = margin_basis(tree, context, child);
        let margin_before = tree[child].style.margin.block_start.resolve_or_zero(basis);
        let collapsed = margin_info.margin().adjoin(&CollapsedMargin::new(margin_before));
        static_block += collapsed.solve() - margin_before;
    }

    let node = &mut tree[child];
    let static_position = LogicalVec2::new(static_inline, static_block);
    if node.static_position != static_position {
        node.static_position = static_position;
        let inset = &node.style.inset;
        let static_axis = (inset.block_start.is_auto() && inset.block_end.is_auto()) ||
            (inset.inline_start.is_auto() && inset.inline_end.is_auto());
        if static_axis {
            node.flags.insert(LayoutFlags::NORMAL_CHILD_NEEDS_LAYOUT);
        }
    }
}

/// A run-in block followed by a block with inline content becomes the first inline of
/// that block.
fn handle_run_in_child(tree: &mut BoxTree, child: BoxId) -> bool {
    if !tree.is_block(child) || !tree.block(child).children_inline {
        return false;
    }
    let mut target = tree.next_sibling(child);
    while let Some(candidate) = target {
        if !tree[candidate].is_floating_or_out_of_flow_positioned() {
            break;
        }
        target = tree.next_sibling(candidate);
    }
    let Some(target) = target else {
        return false;
    };
    let target_node = &tree[target];
    if !tree.is_block(target) ||
        !tree.block(target).children_inline ||
        target_node.style.display == Display::RunIn ||
        target_node.is_anonymous()
    {
        return false;
    }
    debug!("Merging run-in {child:?} into {target:?}");
    tree.merge_run_in(child, target);
    true
}

/// The position a child is laid out at before its margins collapse. It has to be checked
/// against the final position exactly once, through [`EstimatedTop::finalize`].
#[must_use]
#[derive(Debug)]
struct EstimatedTop(Au);

#[derive(Debug)]
enum FinalTop {
    Confirmed,
    Corrected { estimate: Au },
}

impl EstimatedTop {
    fn logical_top(&self) -> Au {
        self.0
    }

    fn finalize(self, final_top: Au) -> FinalTop {
        if self.0 == final_top {
            FinalTop::Confirmed
        } else {
            FinalTop::Corrected { estimate: self.0 }
        }
    }
}

fn estimate_logical_top(
    tree: &mut BoxTree,
    context: &LayoutContext,
    block: BoxId,
    child: BoxId,
    margin_info: &MarginInfo,
    height: Au,
) -> EstimatedTop {
    let mut estimate = height;
    if !margin_info.can_collapse_with_margin_before() {
        let child_margin_before = if tree[child].flags.contains(LayoutFlags::SELF_NEEDS_LAYOUT) {
            tree[child].margin.block_start
        } else {
            child_margin_values(tree, child).before.solve()
        };
        estimate += margin_info.margin().solve().max(child_margin_before);
    }

    let paginated = context.is_paginated();
    if paginated && estimate > height {
        estimate = estimate.min(pagination::next_page_logical_top(context, height));
    }

    estimate += float::get_clear_delta(tree, context, block, child, estimate);

    if paginated {
        estimate = pagination::apply_before_break(tree, context, child, estimate);
        let child_height = tree.size_in_containing_block(child).block;
        estimate = pagination::adjust_for_unsplittable_child(tree, context, child, estimate, child_height);
        if !tree[child].flags.contains(LayoutFlags::SELF_NEEDS_LAYOUT) && tree.is_block(child) {
            estimate += tree.block(child).pagination_strut;
        }
    }
    EstimatedTop(estimate)
}

fn child_margin_values(tree: &BoxTree, child: BoxId) -> MarginValues {
    let margin = tree[child].margin;
    let own = MarginValues::from_margins(margin.block_start, margin.block_end);
    if tree.is_writing_mode_root(child) {
        return own;
    }
    tree[child]
        .block()
        .and_then(|block| block.margin_values)
        .unwrap_or(own)
}

fn child_margins(tree: &BoxTree, context: &LayoutContext, child: BoxId) -> ChildMargins {
    let node = &tree[child];
    let (before_quirk, after_quirk) = if node.is_block_container() {
        (
            node.flags.contains(LayoutFlags::MARGIN_BEFORE_QUIRK),
            node.flags.contains(LayoutFlags::MARGIN_AFTER_QUIRK),
        )
    } else {
        (node.style.margin_before_quirk, node.style.margin_after_quirk)
    };
    ChildMargins {
        values: child_margin_values(tree, child),
        self_collapsing: is_self_collapsing_block(tree, context, child),
        before_quirk,
        after_quirk,
        margin_before_collapse: node.style.margin_before_collapse,
        margin_after_collapse: node.style.margin_after_collapse,
        margin_before: node.margin.block_start,
    }
}

/// Whether the before and after margins of `id` collapse through it: it has no block
/// size, border, padding or in-flow content.
pub(crate) fn is_self_collapsing_block(tree: &BoxTree, context: &LayoutContext, id: BoxId) -> bool {
    let node = &tree[id];
    let Some(flow) = node.block() else {
        return false;
    };
    let style = &node.style;
    let positive = |length: Length| match length {
        Length::Fixed(length) => length > Au::zero(),
        Length::Percentage(percentage) => percentage > 0.,
        Length::Auto => false,
    };
    if node.frame.size.block > Au::zero() ||
        style.display == Display::Table ||
        node.border_padding().block_sum() != Au::zero() ||
        positive(style.min_block_size) ||
        style.margin_before_collapse == MarginCollapse::Separate ||
        style.margin_after_collapse == MarginCollapse::Separate
    {
        return false;
    }

    let mut has_auto_block_size = style.block_size.is_auto();
    if style.block_size.is_percentage() && !context.options.quirks_mode {
        // A percentage of an indefinite size behaves as auto.
        has_auto_block_size = !tree.ancestors(id).any(|ancestor| {
            let ancestor = &tree[ancestor];
            matches!(ancestor.style.block_size, Length::Fixed(_)) ||
                ancestor.style.display == Display::TableCell
        });
    }
    let is_zero = match style.block_size {
        Length::Fixed(length) => length == Au::zero(),
        Length::Percentage(percentage) => percentage == 0.,
        Length::Auto => false,
    };
    if !has_auto_block_size && !is_zero {
        return false;
    }

    if flow.children_inline {
        return flow.lines.is_empty();
    }
    tree.children(id)
        .iter()
        .filter(|child| !tree[**child].is_floating_or_out_of_flow_positioned())
        .all(|child| is_self_collapsing_block(tree, context, *child))
}

/// Marks a child that moved relative to the page boundaries for layout.
fn mark_for_pagination_relayout_if_needed(tree: &mut BoxTree, context: &LayoutContext, child: BoxId) {
    if tree[child].needs_layout() || !tree.is_block(child) {
        return;
    }
    let moved = context.page_logical_height() > Au::zero() &&
        context.page_logical_offset(tree[child].frame.start_corner.block) !=
            tree.block(child).page_logical_offset;
    if context.page_logical_height_changed() || moved {
        tree[child].flags.insert(LayoutFlags::NORMAL_CHILD_NEEDS_LAYOUT);
    }
}

#[allow(clippy::too_many_arguments)]
fn layout_block_child(
    tree: &mut BoxTree,
    context: &mut LayoutContext,
    block: BoxId,
    child: BoxId,
    margin_info: &mut MarginInfo,
    own: &mut OwnMargins,
    height: &mut Au,
    previous_float_bottom: &mut Au,
    max_float_bottom: &mut Au,
) {
    let old_own_before = own.before;
    compute_block_direction_margins(tree, context, child);
    margin_info.begin_child(tree[child].style.margin_before_collapse);

    let estimate = estimate_logical_top(tree, context, block, child, margin_info, *height);
    let old_rect = tree[child].frame;
    let old_logical_top = old_rect.start_corner.block;
    tree[child].frame.start_corner.block = estimate.logical_top();

    let child_is_block = tree.is_block(child);
    let avoids_floats = tree.avoids_floats(child);
    if child_is_block {
        let mut mark_descendants = false;
        if estimate.logical_top() != old_logical_top && !avoids_floats && tree.block(child).contains_floats() {
            mark_descendants = true;
        } else if !avoids_floats || tree.shrinks_to_avoid_floats(child) {
            // A float may now intrude that did not before.
            let float_bottom = (*previous_float_bottom).max(float::lowest_float_bottom(tree, block, None));
            if float_bottom > estimate.logical_top() {
                mark_descendants = true;
            }
        }
        if mark_descendants {
            float::mark_all_descendants_with_floats_for_layout(tree, child, None, true);
        }
        if !tree.is_writing_mode_root(child) {
            *previous_float_bottom = (*previous_float_bottom)
                .max(old_logical_top + float::lowest_float_bottom(tree, child, None));
        }
    }

    mark_for_pagination_relayout_if_needed(tree, context, child);
    let child_had_layout = tree[child].flags.contains(LayoutFlags::EVER_HAD_LAYOUT);
    let child_needed_layout = tree[child].needs_layout();
    layout_if_needed(tree, context, child);

    // Collapse the before margin, clear floats, then apply pagination.
    let at_before_side = margin_info.at_before_side_of_block();
    let margins = child_margins(tree, context, child);
    let height_before_collapse = *height;
    let result = margin_info.collapse_child(&margins, *height, own);
    *height = result.parent_height;
    let mut logical_top_before_clear = result.logical_top;
    if context.is_paginated() && logical_top_before_clear > height_before_collapse {
        // Margins are truncated at page boundaries.
        let old = logical_top_before_clear;
        logical_top_before_clear =
            old.min(pagination::next_page_logical_top(context, height_before_collapse));
        *height += logical_top_before_clear - old;
    }

    let clearance = float::get_clear_delta(tree, context, block, child, logical_top_before_clear);
    let mut logical_top = logical_top_before_clear;
    if clearance != Au::zero() {
        let child_top = tree[child].frame.start_corner.block;
        *height = margin_info.apply_clearance(&margins, child_top, clearance, *height, own, old_own_before);
        if margins.self_collapsing && is_last_in_flow_child(tree, child) {
            // Nothing follows to collapse with: only the after margin is left.
            margin_info.set_margin(margins.values.after);
            *height = child_top - margin_info.margin().solve().max(Au::zero());
        }
        logical_top += clearance;
    }

    if context.is_paginated() {
        let before_breaks = logical_top;
        logical_top = pagination::apply_before_break(tree, context, child, logical_top);
        let child_height = tree.size_in_containing_block(child).block;
        let unsplit = pagination::adjust_for_unsplittable_child(tree, context, child, logical_top, child_height);
        let strut = if unsplit != logical_top {
            unsplit - logical_top
        } else if child_is_block {
            tree.block(child).pagination_strut
        } else {
            Au::zero()
        };
        if strut != Au::zero() {
            let node = &tree[block];
            if at_before_side &&
                before_breaks == logical_top_before_clear &&
                !node.is_out_of_flow_positioned() &&
                node.style.display != Display::TableCell
            {
                // The strut moves this whole block instead of pushing the child down.
                tree.block_mut(block).pagination_strut = logical_top + strut;
                if child_is_block {
                    tree.block_mut(child).pagination_strut = Au::zero();
                }
            } else {
                logical_top += strut;
            }
        }
        *height += logical_top - before_breaks;
    }

    tree[child].frame.start_corner.block = logical_top;
    match estimate.finalize(logical_top) {
        FinalTop::Confirmed => {},
        FinalTop::Corrected { estimate } => {
            debug!("Estimated top {estimate:?} of {child:?} was off, final top is {logical_top:?}");
            if tree.shrinks_to_avoid_floats(child) {
                tree[child].flags.insert(LayoutFlags::NORMAL_CHILD_NEEDS_LAYOUT);
            }
            if child_is_block {
                if !avoids_floats && tree.block(child).contains_floats() {
                    float::mark_all_descendants_with_floats_for_layout(tree, child, None, true);
                }
                mark_for_pagination_relayout_if_needed(tree, context, child);
            }
            layout_if_needed(tree, context, child);
        },
    }

    if margin_info.at_before_side_of_block() && !margins.self_collapsing {
        margin_info.set_at_before_side_of_block(false);
    }

    determine_logical_left_position_for_child(tree, block, child, *height);

    *height += tree.size_in_containing_block(child).block;
    if tree[child].style.margin_after_collapse == MarginCollapse::Separate {
        *height += tree[child].margin.block_end;
        margin_info.clear_margin();
    }

    if child_is_block && tree.block(child).contains_floats() {
        let bottom = float::add_overhanging_floats(tree, block, child, !child_needed_layout, *height);
        *max_float_bottom = (*max_float_bottom).max(bottom);
    }

    let new_rect = tree[child].frame;
    if !child_had_layout {
        repaint_rect(tree, context, new_rect);
    } else if new_rect.start_corner != old_rect.start_corner &&
        !tree[block].flags.contains(LayoutFlags::SELF_NEEDS_LAYOUT)
    {
        repaint_rect(tree, context, old_rect);
        repaint_rect(tree, context, new_rect);
    }

    if context.is_paginated() {
        *height = pagination::apply_after_break(tree, context, child, *height, margin_info);
    }
}

/// Whether only floats and positioned boxes follow `child`.
fn is_last_in_flow_child(tree: &BoxTree, child: BoxId) -> bool {
    let mut next = tree.next_sibling(child);
    while let Some(sibling) = next {
        if !tree[sibling].is_floating_or_out_of_flow_positioned() {
            return false;
        }
        next = tree.next_sibling(sibling);
    }
    true
}

/// Places `child` in the inline direction, beside the floats at `logical_top` when it
/// avoids them.
fn determine_logical_left_position_for_child(tree: &mut BoxTree, block: BoxId, child: BoxId, logical_top: Au) {
    let node = &tree[block];
    let ltr = node.style.is_left_to_right_direction();
    let border_padding = node.border_padding();
    let start_position = if ltr {
        border_padding.inline_start
    } else {
        border_padding.inline_end
    };
    let total_inline_size = node.frame.size.inline;
    let text_align = node.style.text_align;
    let margin_start = |tree: &BoxTree| {
        let margin = tree[child].margin;
        if ltr {
            margin.inline_start
        } else {
            margin.inline_end
        }
    };

    let mut new_position = start_position + margin_start(tree);
    if tree.avoids_floats(child) && tree.block(block).contains_floats() {
        let mut start_offset = if ltr {
            float::left_offset_for_line(tree, block, logical_top)
        } else {
            total_inline_size - float::right_offset_for_line(tree, block, logical_top)
        };
        let child_style = &tree[child].style;
        let margin_start_is_auto = !is_perpendicular_to_containing_block(tree, child) &&
            if ltr {
                child_style.margin.inline_start.is_auto()
            } else {
                child_style.margin.inline_end.is_auto()
            };
        if text_align != TextAlign::Center && !margin_start_is_auto {
            let child_margin_start = margin_start(tree);
            if child_margin_start < Au::zero() {
                start_offset += child_margin_start;
            }
            new_position = new_position.max(start_offset);
        } else if start_offset != start_position {
            // Shifted towards the end: auto margins are solved again in the space beside
            // the floats.
            let available = float::available_width_for_line(tree, block, tree[child].frame.start_corner.block);
            recompute_inline_direction_margins(tree, block, child, available);
            new_position = start_offset + margin_start(tree);
        }
    }

    let child_inline_size = tree.size_in_containing_block(child).inline;
    tree[child].frame.start_corner.inline = if ltr {
        new_position
    } else {
        total_inline_size - new_position - child_inline_size
    };
}

/// Solves the inline margins of `child` again for `available` inline space.
fn recompute_inline_direction_margins(tree: &mut BoxTree, block: BoxId, child: BoxId, available: Au) {
    if is_perpendicular_to_containing_block(tree, child) {
        return;
    }
    let basis = tree[block].content_inline_size();
    let center = tree[block].style.text_align == TextAlign::Center;
    let child_inline_size = tree[child].frame.size.inline;
    let node = &mut tree[child];
    let style = &node.style;
    let start = MaybeAuto::from_style(style.margin.inline_start, basis);
    let end = MaybeAuto::from_style(style.margin.inline_end, basis);
    let (start_width, end_width) = (start.specified_or_zero(), end.specified_or_zero());

    let (margin_start, margin_end) = if (start.is_auto() && end.is_auto()) ||
        (!start.is_auto() && !end.is_auto() && center)
    {
        let centered =
            ((available - child_inline_size - start_width - end_width).scale_by(0.5)).max(Au::zero());
        let margin_start = centered + start_width;
        (margin_start, available - child_inline_size - margin_start + end_width)
    } else if end.is_auto() && child_inline_size < available {
        (start_width, available - child_inline_size - start_width)
    } else if start.is_auto() && child_inline_size < available {
        (available - child_inline_size - end_width, end_width)
    } else {
        (start_width, end_width)
    };
    node.margin.inline_start = margin_start;
    node.margin.inline_end = margin_end;
}

/// Lays out the positioned boxes `block` is the containing block of.
fn layout_positioned_objects(
    tree: &mut BoxTree,
    context: &mut LayoutContext,
    block: BoxId,
    relayout_children: bool,
) {
    let Some(objects) = tree.block(block).positioned_objects.clone() else {
        return;
    };
    let live: Vec<BoxId> = objects
        .into_iter()
        .filter(|object| {
            tree.contains(*object) && tree[*object].registered_containing_block == Some(block)
        })
        .collect();
    tree.block_mut(block).positioned_objects = Some(live.clone());

    // Positioned boxes are not split across columns.
    let has_columns = tree.block(block).has_columns();
    if has_columns {
        context.push_layout_state(LogicalVec2::zero(), true);
    }

    for object in live {
        let moved_with_parent =
            positioned::has_static_block_position(tree, object) && tree.parent(object) != Some(block);
        if relayout_children || moved_with_parent {
            tree[object].flags.insert(LayoutFlags::NORMAL_CHILD_NEEDS_LAYOUT);
        }
        let style = &tree[object].style;
        if relayout_children &&
            (style.padding.inline_start.is_percentage() || style.padding.inline_end.is_percentage())
        {
            tree[object].flags.insert(LayoutFlags::PREFERRED_WIDTHS_DIRTY);
        }
        mark_for_pagination_relayout_if_needed(tree, context, object);
        layout_if_needed(tree, context, object);
    }

    if has_columns {
        context.pop_layout_state();
    }
}

/// The overflow of `id` in its own border-box coordinates, sized in the writing mode of
/// its containing block.
fn local_overflow_rect(tree: &BoxTree, id: BoxId) -> LogicalRect<Au> {
    let node = &tree[id];
    let size = tree.size_in_containing_block(id);
    let border_box = LogicalRect::new(Au::zero(), Au::zero(), size.inline, size.block);
    if node.style.has_overflow_clip() || tree.is_writing_mode_root(id) {
        return border_box;
    }
    node.block().and_then(|block| block.overflow).unwrap_or(border_box)
}

/// Gathers the overflow of `block`: its children or columns, its floats when it paints
/// them, its positioned descendants, and for scroll containers the end of the content.
fn compute_overflow(tree: &mut BoxTree, block: BoxId, old_client_after_edge: Au, recompute_floats: bool) {
    let node = &tree[block];
    let flow = tree.block(block);
    let mut rects = Vec::new();

    if let Some(info) = flow.column_info.as_deref() {
        let count = info.column_count();
        if let Some(last) = count.checked_sub(1).and_then(|index| columns::logical_column_rect_at(tree, block, index)) {
            let inline_size = node.frame.size.inline;
            let (start, end) = if node.style.is_left_to_right_direction() {
                (Au::zero(), inline_size.max(last.max_inline_position()))
            } else {
                (last.min_inline_position().min(Au::zero()), inline_size)
            };
            let block_size = node.content_block_start() + info.column_height();
            rects.push(LogicalRect::new(start, Au::zero(), end - start, block_size));
        }
    } else if flow.children_inline {
        rects.extend(flow.lines.iter().map(|line| line.rect()));
    } else {
        for child in tree.children(block) {
            if !tree[*child].is_floating_or_out_of_flow_positioned() {
                rects.push(local_overflow_rect(tree, *child).translate(tree[*child].frame.start_corner));
            }
        }
    }

    let paints_floats = recompute_floats ||
        tree.is_root(block) ||
        tree.expands_to_enclose_overhanging_floats(block) ||
        node.style.has_self_painting_layer();
    if !flow.has_columns() && paints_floats {
        if let Some(floats) = flow.floats.as_deref() {
            for (_, record) in floats.iter() {
                let float_box = record.box_id();
                if !record.is_descendant() || !tree.contains(float_box) {
                    continue;
                }
                let margin = tree[float_box].margin;
                let offset = record.rect().start_corner + margin.start_offset();
                rects.push(local_overflow_rect(tree, float_box).translate(offset));
            }
        }
    }

    for object in flow.positioned_objects.iter().flatten() {
        if tree.contains(*object) && tree[*object].style.position != Position::Fixed {
            rects.push(local_overflow_rect(tree, *object).translate(tree[*object].frame.start_corner));
        }
    }

    if node.style.has_overflow_clip() {
        // Scrollable content ends after the end padding.
        let client_top = node.border.block_start;
        rects.push(LogicalRect::new(
            node.border.inline_start,
            client_top,
            Au(1),
            (old_client_after_edge - client_top).max(Au::zero()),
        ));
    }

    tree.block_mut(block).overflow = None;
    for rect in rects {
        add_overflow_rect(tree, block, rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(
        computed_inline_size: MaybeAuto,
        inline_start_margin: MaybeAuto,
        inline_end_margin: MaybeAuto,
        available: i32,
    ) -> ISizeConstraintInput {
        ISizeConstraintInput {
            computed_inline_size,
            inline_start_margin,
            inline_end_margin,
            inline_start: MaybeAuto::Auto,
            inline_end: MaybeAuto::Auto,
            available_inline_size: Au::from_px(available),
            static_i_offset: Au::zero(),
            containing_block_is_ltr: true,
        }
    }

    #[test]
    fn test_auto_margins_center_a_sized_block() {
        let solution = BlockNonReplaced.solve_block_inline_size_constraints(&input(
            MaybeAuto::Specified(Au::from_px(100)),
            MaybeAuto::Auto,
            MaybeAuto::Auto,
            300,
        ));
        assert_eq!(solution.inline_size, Au::from_px(100));
        assert_eq!(solution.margin_inline_start, Au::from_px(100));
        assert_eq!(solution.margin_inline_end, Au::from_px(100));
    }

    #[test]
    fn test_over_constrained_drops_the_end_margin() {
        let specified = |px| MaybeAuto::Specified(Au::from_px(px));
        let ltr = BlockNonReplaced.solve_block_inline_size_constraints(&input(
            specified(100),
            specified(10),
            specified(10),
            300,
        ));
        assert_eq!(ltr.margin_inline_start, Au::from_px(10));
        assert_eq!(ltr.margin_inline_end, Au::from_px(190));

        let rtl = BlockNonReplaced.solve_block_inline_size_constraints(&ISizeConstraintInput {
            containing_block_is_ltr: false,
            ..input(specified(100), specified(10), specified(10), 300)
        });
        assert_eq!(rtl.margin_inline_start, Au::from_px(190));
        assert_eq!(rtl.margin_inline_end, Au::from_px(10));
    }

    #[test]
    fn test_auto_inline_size_fills_the_rest() {
        let solution = BlockNonReplaced.solve_block_inline_size_constraints(&input(
            MaybeAuto::Auto,
            MaybeAuto::Specified(Au::from_px(20)),
            MaybeAuto::Auto,
            300,
        ));
        assert_eq!(solution.inline_size, Au::from_px(280));
        assert_eq!(solution.margin_inline_end, Au::zero());
    }

    #[test]
    fn test_estimate_is_confirmed_only_when_unchanged() {
        assert!(matches!(
            EstimatedTop(Au::from_px(5)).finalize(Au::from_px(5)),
            FinalTop::Confirmed
        ));
        assert!(matches!(
            EstimatedTop(Au::from_px(5)).finalize(Au::from_px(9)),
            FinalTop::Corrected { .. }
        ));
    }

    #[test]
    fn test_replaced_sizes_keep_the_aspect_ratio() {
        assert_eq!(
            scale(Au::from_px(100), Au::from_px(25), Au::from_px(50)),
            Au::from_px(50)
        );
        assert_eq!(scale(Au::from_px(100), Au::from_px(25), Au::zero()), Au::from_px(100));
    }
}
