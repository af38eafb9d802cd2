/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Multi-column layout.
//!
//! A multi-column block lays its content out as one tall flow, paginated with the column
//! height as page height. Columns are then a view on that flow: column `i` shows the flow
//! band `[i * height, (i + 1) * height)` next to the previous column.

use app_units::Au;
use euclid::num::Zero;
use log::debug;

use crate::box_tree::{BoxId, BoxTree};
use crate::context::LayoutContext;
use crate::geom::{LogicalRect, LogicalVec2, PhysicalPoint, PhysicalRect, div_ceil};
use crate::style::BoxStyle;

/// Column geometry of a multi-column block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnInfo {
    desired_column_count: u32,
    desired_column_width: Au,
    /// Zero until balancing has picked a height.
    column_height: Au,
    column_count: u32,
    forced_breaks: u32,
    maximum_distance_between_forced_breaks: Au,
    forced_break_offset: Au,
    minimum_column_height: Au,
}

impl ColumnInfo {
    pub fn desired_column_count(&self) -> u32 {
        self.desired_column_count
    }

    pub fn desired_column_width(&self) -> Au {
        self.desired_column_width
    }

    pub fn column_height(&self) -> Au {
        self.column_height
    }

    pub fn column_count(&self) -> u32 {
        self.column_count
    }

    pub fn forced_breaks(&self) -> u32 {
        self.forced_breaks
    }

    pub fn minimum_column_height(&self) -> Au {
        self.minimum_column_height
    }

    pub(crate) fn set_column_height(&mut self, height: Au) {
        self.column_height = height;
    }

    fn set_column_count_and_height(&mut self, count: u32, height: Au) {
        self.column_count = count;
        self.column_height = height;
    }

    pub(crate) fn clear_forced_breaks(&mut self) {
        self.forced_breaks = 0;
        self.maximum_distance_between_forced_breaks = Au::zero();
        self.forced_break_offset = Au::zero();
    }

    /// Records a forced break at `offset_from_first_page`. Only meaningful while the column
    /// height is unknown.
    pub(crate) fn add_forced_break(&mut self, offset_from_first_page: Au) {
        debug_assert_eq!(self.column_height, Au::zero());
        if self.desired_column_count == 1 {
            return;
        }
        self.forced_breaks += 1;
        let distance = Au((offset_from_first_page - self.forced_break_offset).0.abs());
        self.maximum_distance_between_forced_breaks =
            self.maximum_distance_between_forced_breaks.max(distance);
        self.forced_break_offset = offset_from_first_page;
    }

    pub(crate) fn update_minimum_column_height(&mut self, height: Au) {
        self.minimum_column_height = self.minimum_column_height.max(height);
    }
}

/// Which column layout pass a block is in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ColumnPass {
    Initial,
    /// The one extra pass run with a balanced column height. It never re-balances.
    Corrective(Au),
}

impl ColumnPass {
    pub(crate) fn column_height(&self) -> Au {
        match *self {
            ColumnPass::Initial => Au::zero(),
            ColumnPass::Corrective(height) => height,
        }
    }
}

/// Column count and width for `available` inline space.
pub(crate) fn desired_count_and_width(style: &BoxStyle, available: Au) -> (u32, Au) {
    let available_inline = available.0.max(0) as i64;
    let gap = style.resolved_column_gap().0.max(0) as i64;
    let fitting = |column_width: Au| -> i64 {
        let column_width = (column_width.0 as i64).max(1);
        ((available_inline + gap) / (column_width + gap)).max(1)
    };

    let desired_count = match (style.column_count, style.column_width) {
        (None, None) => return (1, available),
        (Some(count), None) => count.max(1) as i64,
        (None, Some(width)) => fitting(width),
        (Some(count), Some(width)) => fitting(width).min(count.max(1) as i64),
    };
    let desired_width = if style.column_width.is_none() {
        ((available_inline - (desired_count - 1) * gap) / desired_count).max(0)
    } else {
        (available_inline + gap) / desired_count - gap
    };
    (desired_count as u32, Au(desired_width as i32))
}

/// Creates, updates or destroys the column record of `block` from its style and content
/// width. Returns the desired column width.
pub(crate) fn calc_column_width(tree: &mut BoxTree, context: &LayoutContext, block: BoxId) -> Au {
    let node = &tree[block];
    let available = node.content_inline_size();
    let enabled = context.options.columns_allowed() && node.style.specifies_columns();
    let (count, width) = if enabled {
        desired_count_and_width(&node.style, available)
    } else {
        (1, available)
    };

    let destroy = !enabled ||
        tree.children(block).is_empty() ||
        (count == 1 && node.style.column_width.is_none());
    let flow = tree.block_mut(block);
    if destroy {
        flow.column_info = None;
        return available;
    }
    let info = flow.column_info.get_or_insert_with(Default::default);
    info.desired_column_count = count;
    info.desired_column_width = width;
    width
}

/// Result of the column step of block layout.
#[derive(Debug, PartialEq)]
pub(crate) enum ColumnLayout {
    /// Columns are final. Carries the block size, when columns replaced it.
    Done(Option<Au>),
    /// The content has to be laid out again with this column height.
    Rebalance(Au),
}

/// Balances the columns of `block` after its content was laid out with `page_height`
/// as column height (zero when unconstrained). `logical_height` is the block size so far,
/// border and padding included.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        name = "ColumnInfo::layout",
        skip_all,
        fields(servo_profiling = true),
        level = "trace",
    )
)]
pub(crate) fn layout_columns(
    tree: &mut BoxTree,
    context: &LayoutContext,
    block: BoxId,
    has_specified_page_height: bool,
    page_height: Au,
    pass: ColumnPass,
    logical_height: Au,
) -> ColumnLayout {
    let node = &tree[block];
    let border_padding = node.border_padding();
    let content_height = (logical_height - border_padding.block_sum()).max(Au::zero());
    let before = border_padding.block_start;
    let Some(info) = tree.block(block).column_info.as_deref() else {
        return ColumnLayout::Done(None);
    };

    if !has_specified_page_height && pass == ColumnPass::Initial {
        let desired_count = info.desired_column_count.max(1);
        let mut column_height = page_height;
        if info.forced_breaks + 1 >= desired_count {
            // Forced breaks are in control of the balancing.
            if page_height == Au::zero() {
                let distance = info
                    .maximum_distance_between_forced_breaks
                    .max(context.page_logical_offset(before + content_height) - info.forced_break_offset);
                column_height = info.minimum_column_height.max(distance);
            }
        } else if content_height.0 as i64 > page_height.0 as i64 * desired_count as i64 {
            column_height = info
                .minimum_column_height
                .max(div_ceil(content_height, desired_count as i32));
        }
        if info.forced_breaks > 0 {
            column_height = column_height.max(info.maximum_distance_between_forced_breaks);
        }

        if column_height > Au::zero() && column_height != page_height {
            debug!("Rebalancing columns of {block:?} with height {column_height:?}");
            return ColumnLayout::Rebalance(column_height);
        }
    }

    let Some(info) = tree.block_mut(block).column_info.as_deref_mut() else {
        return ColumnLayout::Done(None);
    };
    if page_height > Au::zero() {
        let count = div_ceil(content_height, page_height.0).0.max(0) as u32;
        info.set_column_count_and_height(count, page_height);
    }
    if info.column_count > 0 {
        let height = border_padding.block_sum() + info.column_height;
        tree.block_mut(block).overflow = None;
        return ColumnLayout::Done(Some(height));
    }
    ColumnLayout::Done(None)
}

/// Column `index` in the block's logical coordinates.
pub(crate) fn logical_column_rect_at(tree: &BoxTree, block: BoxId, index: u32) -> Option<LogicalRect<Au>> {
    let node = tree.get(block)?;
    let info = node.block()?.column_info.as_deref()?;
    if index >= info.column_count {
        return None;
    }
    let width = info.desired_column_width;
    let gap = node.style.resolved_column_gap();
    let step = Au((width + gap).0.saturating_mul(index as i32));
    let left = if node.style.is_left_to_right_direction() {
        node.content_inline_start() + step
    } else {
        node.content_inline_start() + node.content_inline_size() - width - step
    };
    Some(LogicalRect::new(
        left,
        node.content_block_start(),
        width,
        info.column_height,
    ))
}

/// Physical rectangle of column `index`, relative to the block's border box. `None` when
/// the block has no columns or no such column.
pub fn column_rect_at(tree: &BoxTree, block: BoxId, index: u32) -> Option<PhysicalRect<Au>> {
    let rect = logical_column_rect_at(tree, block, index)?;
    Some(rect.to_physical(tree[block].style.writing_mode))
}

fn intersection(a: &LogicalRect<Au>, b: &LogicalRect<Au>) -> Option<LogicalRect<Au>> {
    let inline_start = a.min_inline_position().max(b.min_inline_position());
    let block_start = a.min_block_position().max(b.min_block_position());
    let inline_end = a.max_inline_position().min(b.max_inline_position());
    let block_end = a.max_block_position().min(b.max_block_position());
    if inline_end <= inline_start || block_end <= block_start {
        return None;
    }
    Some(LogicalRect::new(
        inline_start,
        block_start,
        inline_end - inline_start,
        block_end - block_start,
    ))
}

/// Maps a rectangle in flow coordinates to where it shows up in the columns: the union of
/// its intersections with each column's band, each moved into that column. Rectangles of a
/// block without columns come back unchanged.
pub fn adjust_rect_for_columns(tree: &BoxTree, block: BoxId, rect: PhysicalRect<Au>) -> PhysicalRect<Au> {
    let Some(node) = tree.get(block) else {
        return rect;
    };
    let Some(info) = node.block().and_then(|flow| flow.column_info.as_deref()) else {
        return rect;
    };
    if info.column_count == 0 {
        return rect;
    }

    let writing_mode = node.style.writing_mode;
    let logical = LogicalRect::from_physical(rect, writing_mode);
    let content_left = node.content_inline_start();
    let mut result: Option<LogicalRect<Au>> = None;
    let mut block_offset = Au::zero();
    for index in 0..info.column_count {
        let Some(column) = logical_column_rect_at(tree, block, index) else {
            break;
        };
        let moved = logical.translate(LogicalVec2::new(
            column.min_inline_position() - content_left,
            block_offset,
        ));
        block_offset -= column.size.block;
        if let Some(piece) = intersection(&moved, &column) {
            result = Some(match result {
                Some(union) => union.union(&piece),
                None => piece,
            });
        }
    }
    result.unwrap_or_else(LogicalRect::zero).to_physical(writing_mode)
}

/// Maps a point over the columns of `block` back into flow coordinates. Points in a gap
/// belong to the nearest column; points above or below a column clamp to its start or
/// to the start of the next one.
pub fn adjust_point_to_column_contents(
    tree: &BoxTree,
    block: BoxId,
    point: PhysicalPoint<Au>,
) -> PhysicalPoint<Au> {
    let Some(node) = tree.get(block) else {
        return point;
    };
    let Some(info) = node.block().and_then(|flow| flow.column_info.as_deref()) else {
        return point;
    };
    let Some(first) = logical_column_rect_at(tree, block, 0) else {
        return point;
    };

    let writing_mode = node.style.writing_mode;
    let mut logical = LogicalVec2::from_physical_point(point, writing_mode);
    let gap = node.style.resolved_column_gap();
    let half_gap = Au(gap.0 / 2);
    let mut flow_offset = Au::zero();
    for index in 0..info.column_count {
        let Some(column) = logical_column_rect_at(tree, block, index) else {
            break;
        };
        let with_gap = LogicalRect::new(
            column.min_inline_position() - half_gap,
            column.min_block_position(),
            column.size.inline + gap,
            column.size.block,
        );
        if logical.inline >= with_gap.min_inline_position() &&
            logical.inline < with_gap.max_inline_position()
        {
            if logical.block < with_gap.min_block_position() {
                logical = with_gap.start_corner;
            } else if logical.block >= with_gap.max_block_position() {
                logical = with_gap.start_corner + LogicalVec2::new(Au::zero(), with_gap.size.block);
            }
            logical = logical +
                LogicalVec2::new(
                    first.min_inline_position() - column.min_inline_position(),
                    flow_offset,
                );
            return logical.to_physical_point(writing_mode);
        }
        flow_offset += column.size.block;
    }
    point
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(count: Option<u32>, width: Option<i32>, gap: i32) -> BoxStyle {
        BoxStyle {
            column_count: count,
            column_width: width.map(Au::from_px),
            column_gap: Some(Au::from_px(gap)),
            ..BoxStyle::block()
        }
    }

    #[test]
    fn test_count_only_splits_available_space() {
        let (count, width) = desired_count_and_width(&style(Some(3), None, 10), Au::from_px(320));
        assert_eq!(count, 3);
        assert_eq!(width, Au::from_px(100));
    }

    #[test]
    fn test_width_only_fits_as_many_columns_as_possible() {
        let (count, width) = desired_count_and_width(&style(None, Some(100), 20), Au::from_px(500));
        // (500 + 20) / (100 + 20) = 4 columns, widened to fill the space.
        assert_eq!(count, 4);
        assert_eq!(width, Au::from_px(110));
    }

    #[test]
    fn test_count_caps_width_fitting() {
        let (count, _) = desired_count_and_width(&style(Some(2), Some(100), 20), Au::from_px(500));
        assert_eq!(count, 2);
        let (count, _) = desired_count_and_width(&style(Some(8), Some(100), 20), Au::from_px(500));
        assert_eq!(count, 4);
    }

    #[test]
    fn test_normal_gap_is_one_em() {
        let style = BoxStyle {
            column_count: Some(2),
            column_gap: None,
            font_size: Au::from_px(16),
            ..BoxStyle::block()
        };
        let (_, width) = desired_count_and_width(&style, Au::from_px(216));
        assert_eq!(width, Au::from_px(100));
    }

    #[test]
    fn test_forced_breaks_track_largest_distance() {
        let mut info = ColumnInfo {
            desired_column_count: 3,
            ..ColumnInfo::default()
        };
        info.add_forced_break(Au::from_px(40));
        info.add_forced_break(Au::from_px(140));
        info.add_forced_break(Au::from_px(160));
        assert_eq!(info.forced_breaks(), 3);
        assert_eq!(info.maximum_distance_between_forced_breaks, Au::from_px(100));
        info.clear_forced_breaks();
        assert_eq!(info.forced_breaks(), 0);
    }

    #[test]
    fn test_single_column_ignores_forced_breaks() {
        let mut info = ColumnInfo {
            desired_column_count: 1,
            ..ColumnInfo::default()
        };
        info.add_forced_break(Au::from_px(40));
        assert_eq!(info.forced_breaks(), 0);
    }
}
