/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Breaking block content into pages or columns.
//!
//! Offsets passed in here are block offsets inside the block currently being laid out;
//! the [`LayoutContext`] knows where that block sits relative to the first page.

use app_units::Au;
use euclid::num::Zero;
use log::trace;

use crate::box_tree::{BoxId, BoxTree};
use crate::context::LayoutContext;
use crate::margins::MarginInfo;
use crate::style::BreakValue;

fn remaining_on_page(context: &LayoutContext, logical_offset: Au) -> Au {
    let page_height = context.page_logical_height();
    debug_assert!(page_height > Au::zero());
    let offset = context.page_logical_offset(logical_offset);
    page_height - Au(offset.0.rem_euclid(page_height.0))
}

/// The top of the next page, or `logical_offset` itself when it already is a page top
/// or the page height is still unknown.
pub(crate) fn next_page_logical_top(context: &LayoutContext, logical_offset: Au) -> Au {
    let page_height = context.page_logical_height();
    if page_height == Au::zero() {
        return logical_offset;
    }
    let remaining = remaining_on_page(context, logical_offset);
    logical_offset + Au(remaining.0.rem_euclid(page_height.0))
}

/// Records a forced column break while the column height is still being discovered.
fn add_forced_column_break(tree: &mut BoxTree, context: &LayoutContext, logical_offset: Au) {
    let Some(owner) = context.column_owner() else {
        return;
    };
    let offset = context.page_logical_offset(logical_offset);
    if let Some(info) = tree.block_mut(owner).column_info.as_deref_mut() {
        if info.column_height() == Au::zero() {
            info.add_forced_break(offset);
        }
    }
}

/// Whether `child` flows with the pages of the current pagination context, rather than
/// inside a float or positioned box that is not broken.
fn in_normal_flow(tree: &BoxTree, context: &LayoutContext, child: BoxId) -> bool {
    let mut current = tree.containing_block(child);
    while let Some(block) = current {
        if tree.is_root(block) || Some(block) == context.column_owner() {
            return true;
        }
        if tree.block(block).has_columns() {
            return true;
        }
        if tree[block].is_floating_or_out_of_flow_positioned() {
            return false;
        }
        current = tree.containing_block(block);
    }
    true
}

fn forces_break(context: &LayoutContext, column_break: BreakValue, page_break: BreakValue) -> bool {
    let check_column_breaks = context.column_owner().is_some();
    let check_page_breaks = !check_column_breaks && context.page_logical_height() > Au::zero();
    (check_column_breaks && column_break == BreakValue::Always) ||
        (check_page_breaks && page_break == BreakValue::Always)
}

pub(crate) fn apply_before_break(
    tree: &mut BoxTree,
    context: &LayoutContext,
    child: BoxId,
    logical_offset: Au,
) -> Au {
    let style = &tree[child].style;
    if !forces_break(context, style.column_break_before, style.page_break_before) ||
        !in_normal_flow(tree, context, child)
    {
        return logical_offset;
    }
    trace!("Forced break before {child:?} at {logical_offset:?}");
    add_forced_column_break(tree, context, logical_offset);
    next_page_logical_top(context, logical_offset)
}

pub(crate) fn apply_after_break(
    tree: &mut BoxTree,
    context: &LayoutContext,
    child: BoxId,
    logical_offset: Au,
    margin_info: &mut MarginInfo,
) -> Au {
    let style = &tree[child].style;
    if !forces_break(context, style.column_break_after, style.page_break_after) ||
        !in_normal_flow(tree, context, child)
    {
        return logical_offset;
    }
    trace!("Forced break after {child:?} at {logical_offset:?}");
    // Margins of following content are discarded at the top of the next page.
    margin_info.set_margin_after_quirk(true);
    add_forced_column_break(tree, context, logical_offset);
    next_page_logical_top(context, logical_offset)
}

pub(crate) fn is_unsplittable(tree: &BoxTree, child: BoxId) -> bool {
    let node = &tree[child];
    node.is_replaced() || node.style.scrolls_overflow() || tree.is_writing_mode_root(child)
}

/// Moves an unsplittable child of `child_logical_height` to the next page when it does not
/// fit in what remains of the current one. Also feeds the minimum column height.
pub(crate) fn adjust_for_unsplittable_child(
    tree: &mut BoxTree,
    context: &LayoutContext,
    child: BoxId,
    logical_offset: Au,
    child_logical_height: Au,
) -> Au {
    if !is_unsplittable(tree, child) {
        return logical_offset;
    }
    update_minimum_column_height(tree, context, child_logical_height);
    adjust_for_unsplittable_content(context, logical_offset, child_logical_height)
}

/// Same as [`adjust_for_unsplittable_child`] for content that is known to be
/// unsplittable, such as a line box.
pub(crate) fn adjust_for_unsplittable_content(
    context: &LayoutContext,
    logical_offset: Au,
    logical_height: Au,
) -> Au {
    let page_height = context.page_logical_height();
    if page_height == Au::zero() || logical_height > page_height {
        return logical_offset;
    }
    let remaining = Au(remaining_on_page(context, logical_offset).0.rem_euclid(page_height.0));
    if remaining < logical_height {
        logical_offset + remaining
    } else {
        logical_offset
    }
}

pub(crate) fn update_minimum_column_height(tree: &mut BoxTree, context: &LayoutContext, height: Au) {
    if let Some(owner) = context.column_owner() {
        if let Some(info) = tree.block_mut(owner).column_info.as_deref_mut() {
            info.update_minimum_column_height(height);
        }
    }
}

/// How far a line starting at `line_top` with `line_height` has to move down so that it
/// does not straddle a page boundary. Lines taller than a page stay put.
pub(crate) fn line_pagination_strut(
    tree: &mut BoxTree,
    context: &LayoutContext,
    line_top: Au,
    line_height: Au,
) -> Au {
    update_minimum_column_height(tree, context, line_height);
    let page_height = context.page_logical_height();
    if page_height == Au::zero() || line_height > page_height {
        return Au::zero();
    }
    let remaining = remaining_on_page(context, line_top);
    if remaining < line_height {
        remaining
    } else {
        Au::zero()
    }
}
