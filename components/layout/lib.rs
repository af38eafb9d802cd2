/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#![deny(unsafe_code)]

//! Block-level layout: boxes are stacked in the block direction with their margins
//! collapsed, floats are placed beside line boxes, multi-column blocks are balanced, and
//! inline content is split into bidi runs.

mod arena;
mod bidi;
mod block;
mod box_tree;
mod columns;
mod context;
mod debug;
mod float;
mod geom;
mod inline;
mod intrinsic;
mod margins;
mod model;
mod options;
mod pagination;
mod positioned;
mod style;
mod text;

use log::{debug, warn};

pub use crate::arena::{ArenaId, Handle};
pub use crate::bidi::{
    BidiResolver, BidiRun, EmbeddingLevelResolver, EmptyInlineBehavior, InlineIterator, RunHandle,
    RunList, build_bidi_runs,
};
pub use crate::box_tree::{BlockFlow, BoxId, BoxKind, BoxTree, LayoutBox, LayoutFlags};
pub use crate::columns::{ColumnInfo, adjust_point_to_column_contents, adjust_rect_for_columns, column_rect_at};
pub use crate::context::LayoutContext;
pub use crate::debug::{GeometrySnapshot, outline};
pub use crate::float::{FloatHandle, FloatRecord, FloatSide, FloatingObjects, insert_float, remove_float};
pub use crate::geom::{LogicalRect, LogicalSides, LogicalVec2, PhysicalPoint, PhysicalRect};
pub use crate::inline::{LineBox, LineBoxList, LineHandle};
pub use crate::margins::{CollapsedMargin, MarginValues};
pub use crate::options::LayoutOptions;
pub use crate::style::{
    BoxStyle, BreakValue, Clear, Display, Float, Length, MarginCollapse, Overflow, Position, TextAlign,
    UnicodeBidi, WhiteSpace, WritingMode,
};
pub use crate::text::{FixedAdvanceMeasurer, TextMeasurer};

/// Lays out `id` and everything below it that was marked for layout. `id` is normally the
/// root; any other box is laid out in place, inside its containing block as positioned by
/// the previous layout. With `relayout_children` every child is laid out again even if it
/// was not marked.
///
/// Areas that need repainting are collected in the context, see
/// [`LayoutContext::take_repaint_rects`].
pub fn layout(tree: &mut BoxTree, context: &mut LayoutContext, id: BoxId, relayout_children: bool) {
    if !tree.contains(id) {
        warn!("Layout requested for a box that is no longer in the tree: {id:?}");
        return;
    }

    // Only block containers lay themselves out; anything else is laid out by the nearest
    // one.
    let block = if tree.is_block(id) {
        id
    } else {
        match tree.containing_block(id) {
            Some(block) => {
                tree[id].flags.insert(LayoutFlags::SELF_NEEDS_LAYOUT);
                tree[block].flags.insert(LayoutFlags::NORMAL_CHILD_NEEDS_LAYOUT);
                block
            },
            None => {
                warn!("No block container to lay out {id:?} in");
                return;
            },
        }
    };
    if context.options.nonincremental_layout {
        tree[block].flags.insert(LayoutFlags::SELF_NEEDS_LAYOUT);
    }
    debug!("Layout of {block:?}, relayout_children={relayout_children}");

    // A subtree is laid out with the offset of its containing block, so that repaint
    // rectangles and pagination refer to the root.
    let ancestors: Vec<BoxId> = std::iter::successors(tree.containing_block(block), |ancestor| {
        tree.containing_block(*ancestor)
    })
    .collect();
    for ancestor in ancestors.iter().rev() {
        let node = &tree[*ancestor];
        context.push_layout_state(node.frame.start_corner, tree.is_writing_mode_root(*ancestor));
    }

    if relayout_children || tree[block].needs_layout() {
        block::layout_block(tree, context, block, relayout_children, columns::ColumnPass::Initial);
    }

    for _ in &ancestors {
        context.pop_layout_state();
    }

    if context.options.dump_box_tree {
        debug::dump(tree, block);
    }
}
