/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Line breaking for blocks with inline children.
//!
//! Lines are rebuilt from scratch on every layout of the block. Each line is filled
//! greedily between the floats intruding at its top, its content is split into bidi runs
//! and the runs are placed in visual order. Dirty flags on the previous lines only decide
//! which part of the block is reported for repaint.

use app_units::Au;
use euclid::num::Zero;
use log::{debug, trace};

use crate::arena::{Arena, Handle};
use crate::bidi::{InlineIterator, RunList, build_bidi_runs_for_line, produces_runs};
use crate::box_tree::{BoxId, BoxKind, BoxTree, LayoutFlags};
use crate::context::LayoutContext;
use crate::float::{self, FloatHandle};
use crate::geom::{LogicalRect, LogicalVec2};
use crate::style::{BoxStyle, Display, TextAlign, WhiteSpace};
use crate::text::{TextMeasurer, ends_with_forced_break, is_collapsible_space};

pub type LineHandle = Handle<LineBox>;

/// One line of a block with inline children.
#[derive(Debug)]
pub struct LineBox {
    /// Relative to the border box of the block. The inline extent covers the content
    /// after alignment, trailing white space excluded.
    pub(crate) rect: LogicalRect<Au>,
    pub(crate) start: InlineIterator,
    pub(crate) end: InlineIterator,
    pub(crate) runs: RunList,
    pub(crate) dirty: bool,
    /// The line ends with a forced break.
    pub(crate) hard_break: bool,
    /// How far pagination moved this line down.
    pub(crate) pagination_strut: Au,
}

impl LineBox {
    pub fn rect(&self) -> LogicalRect<Au> {
        self.rect
    }

    pub fn runs(&self) -> &RunList {
        &self.runs
    }

    pub fn start(&self) -> InlineIterator {
        self.start
    }

    pub fn end(&self) -> InlineIterator {
        self.end
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the line was ended by a forced break rather than by running out of room.
    pub fn ends_with_hard_break(&self) -> bool {
        self.hard_break
    }

    pub fn pagination_strut(&self) -> Au {
        self.pagination_strut
    }

    pub(crate) fn logical_top(&self) -> Au {
        self.rect.start_corner.block
    }

    pub(crate) fn logical_bottom(&self) -> Au {
        self.rect.max_block_position()
    }
}

/// The lines of a block, in block order.
#[derive(Debug, Default)]
pub struct LineBoxList {
    lines: Arena<LineBox>,
    order: Vec<LineHandle>,
}

impl std::ops::Index<LineHandle> for LineBoxList {
    type Output = LineBox;

    fn index(&self, handle: LineHandle) -> &LineBox {
        &self.lines[handle]
    }
}

impl std::ops::IndexMut<LineHandle> for LineBoxList {
    fn index_mut(&mut self, handle: LineHandle) -> &mut LineBox {
        &mut self.lines[handle]
    }
}

impl LineBoxList {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn first(&self) -> Option<&LineBox> {
        self.order.first().map(|handle| &self.lines[*handle])
    }

    pub fn get(&self, handle: LineHandle) -> Option<&LineBox> {
        self.lines.get(handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LineBox> + '_ {
        self.order.iter().map(move |handle| &self.lines[*handle])
    }

    pub(crate) fn handles(&self) -> Vec<LineHandle> {
        self.order.clone()
    }

    fn push(&mut self, line: LineBox) -> LineHandle {
        let handle = self.lines.insert(line);
        self.order.push(handle);
        handle
    }

    /// Marks a line for repaint. Handles of a previous generation of lines are ignored.
    pub(crate) fn mark_dirty(&mut self, handle: LineHandle) {
        if let Some(line) = self.lines.get_mut(handle) {
            line.dirty = true;
        }
    }
}

/// An out-of-flow box met while filling a line, waiting for the line height to get its
/// static position.
struct PendingPositioned {
    id: BoxId,
    inline_position: Au,
    /// Block-level boxes start below a line that already has content.
    after_line_content: bool,
}

/// The line being filled.
struct LineCandidate {
    start: InlineIterator,
    top: Au,
    left: Au,
    available: Au,
    used: Au,
    /// `used` without the trailing collapsible white space.
    trimmed: Au,
    height: Au,
    has_content: bool,
    hard_break: bool,
    floats: Vec<FloatHandle>,
    /// A float that did not fit was pushed below the line, so every later float is too.
    deferring_floats: bool,
    positioned: Vec<PendingPositioned>,
}

impl LineCandidate {
    fn remaining(&self) -> Au {
        self.available - self.used
    }

    fn fits(&self, width: Au) -> bool {
        !self.has_content || self.used + width <= self.available
    }
}

fn text_indent(tree: &BoxTree, block: BoxId) -> Au {
    let node = &tree[block];
    node.style
        .text_indent
        .resolve(Some(node.content_inline_size()))
        .unwrap_or_else(Au::zero)
}

/// Line-left edge and width available for a line at `top`.
fn line_extent(tree: &BoxTree, block: BoxId, top: Au, first_line: bool) -> (Au, Au) {
    let mut left = float::left_offset_for_line(tree, block, top);
    let mut available = float::available_width_for_line(tree, block, top);
    if first_line {
        let indent = text_indent(tree, block);
        if tree[block].style.is_left_to_right_direction() {
            left += indent;
        }
        available -= indent;
    }
    (left, available.max(Au::zero()))
}

fn collapses_spaces(style: &BoxStyle) -> bool {
    !matches!(style.white_space, WhiteSpace::Pre | WhiteSpace::PreWrap)
}

/// Moves `cursor` past collapsible white space at the start of a line.
fn skip_leading_white_space(tree: &BoxTree, cursor: &mut InlineIterator) {
    while let Some(item) = cursor.item() {
        let BoxKind::Text(ref text) = tree[item].kind else {
            return;
        };
        let style = &tree[item].style;
        if !collapses_spaces(style) {
            return;
        }
        match text.get(cursor.offset()..).and_then(|rest| rest.chars().next()) {
            Some('\n') if style.white_space.preserves_newlines() => return,
            Some(character) if is_collapsible_space(character) => cursor.increment(tree, None),
            Some(_) => return,
            None => cursor.move_to_next_item(tree, None),
        }
    }
}

/// The next place after `cursor` where the text item under it may break, and whether the
/// break is forced.
fn next_break(
    measurer: &dyn TextMeasurer,
    text: &str,
    style: &BoxStyle,
    cursor: &mut InlineIterator,
) -> (usize, bool) {
    let offset = cursor.offset();
    let end = match cursor.next_breakable() {
        Some(breakable) if breakable > offset => breakable,
        _ => {
            let wraps = style.white_space.allows_wrapping();
            let breakable = measurer
                .break_opportunities(text)
                .into_iter()
                .map(|(end, _)| end)
                .find(|end| {
                    *end > offset &&
                        (wraps || *end == text.len() || ends_with_forced_break(&text[..*end], style))
                })
                .unwrap_or(text.len());
            cursor.set_next_breakable(Some(breakable));
            breakable
        },
    };
    (end, ends_with_forced_break(&text[..end], style))
}

/// Registers out-of-flow boxes with their containing blocks and lays out the atomic
/// inline-level boxes, whose sizes line breaking needs.
fn prepare_items(tree: &mut BoxTree, context: &mut LayoutContext, block: BoxId, relayout_children: bool) {
    let mut stack: Vec<BoxId> = tree.children(block).iter().rev().copied().collect();
    while let Some(item) = stack.pop() {
        let node = &tree[item];
        match node.kind {
            BoxKind::Inline => {
                stack.extend(tree.children(item).iter().rev().copied());
                tree[item].flags.remove(
                    LayoutFlags::SELF_NEEDS_LAYOUT | LayoutFlags::NORMAL_CHILD_NEEDS_LAYOUT,
                );
            },
            BoxKind::Text(_) | BoxKind::LineBreak => {
                tree[item].flags.remove(LayoutFlags::SELF_NEEDS_LAYOUT);
                tree[item].flags.insert(LayoutFlags::EVER_HAD_LAYOUT);
            },
            BoxKind::Replaced { .. } | BoxKind::Block(_) => {
                if node.is_out_of_flow_positioned() {
                    if let Some(containing_block) = tree.containing_block(item) {
                        tree.insert_positioned_object(containing_block, item);
                    }
                    continue;
                }
                if node.is_floating() {
                    continue;
                }
                if relayout_children {
                    tree[item].flags.insert(LayoutFlags::NORMAL_CHILD_NEEDS_LAYOUT);
                }
                crate::block::layout_if_needed(tree, context, item);
            },
        }
    }
}

/// Lays out the inline content of `block` into lines and returns the block range that
/// changed, for repaint. The block's logical height ends up below the last line, after
/// border and padding.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        name = "InlineFormattingContext::layout",
        skip_all,
        fields(servo_profiling = true),
        level = "trace",
    )
)]
pub(crate) fn layout_inline_children(
    tree: &mut BoxTree,
    context: &mut LayoutContext,
    block: BoxId,
    relayout_children: bool,
) -> (Au, Au) {
    let measurer = context.text_measurer();
    let border_padding = tree[block].border_padding();
    let mut height = border_padding.block_start;

    prepare_items(tree, context, block, relayout_children);

    let old_lines = std::mem::take(&mut tree.block_mut(block).lines);
    let mut lines = LineBoxList::default();

    let mut cursor = InlineIterator::first(tree, block);
    let mut first_line = true;
    let mut may_move = true;
    while !cursor.at_end() {
        skip_leading_white_space(tree, &mut cursor);
        if cursor.at_end() {
            break;
        }

        let (left, available) = line_extent(tree, block, height, first_line);
        let mut line = LineCandidate {
            start: cursor,
            top: height,
            left,
            available,
            used: Au::zero(),
            trimmed: Au::zero(),
            height: Au::zero(),
            has_content: false,
            hard_break: false,
            floats: Vec::new(),
            deferring_floats: false,
            positioned: Vec::new(),
        };

        if fill_line(tree, context, measurer, block, &mut line, &mut cursor, first_line, may_move) {
            // Nothing fits next to the floats here: try again below the next float bottom.
            let next = float::floats(tree, block).and_then(|floats| floats.next_bottom_below(height));
            cursor = line.start;
            match next {
                Some(next) => {
                    trace!("Line in {block:?} does not fit at {height:?}, moving to {next:?}");
                    height = next;
                },
                None => may_move = false,
            }
            continue;
        }
        may_move = true;

        let line_handle = if line.has_content {
            let handle = finish_line(tree, context, measurer, block, &mut line, cursor, first_line, &mut lines);
            height = lines[handle].logical_bottom();
            first_line = false;
            Some(handle)
        } else {
            None
        };

        for pending in line.positioned.drain(..) {
            let block_position = if pending.after_line_content && line_handle.is_some() {
                height
            } else {
                line.top
            };
            let node = &mut tree[pending.id];
            let static_position = LogicalVec2::new(pending.inline_position, block_position);
            if node.static_position != static_position {
                node.static_position = static_position;
                node.flags.insert(LayoutFlags::NORMAL_CHILD_NEEDS_LAYOUT);
            }
        }

        // Floats that did not fit go below the line.
        float::position_new_floats(tree, context, block, height);
        if let Some(line_handle) = line_handle {
            let registry = tree.block_mut(block).floats.as_mut();
            if let Some(registry) = registry {
                for handle in &line.floats {
                    registry.set_originating_line(*handle, line_handle);
                }
            }
        }
    }

    height += border_padding.block_end;
    crate::block::set_logical_height(tree, block, height);

    let repaint = changed_range(&old_lines, &lines);
    debug!("Laid out {} lines in {block:?}", lines.len());
    tree.block_mut(block).lines = lines;
    repaint
}

/// Adds items to `line` until one does not fit. Returns `true` when the line has to move
/// down because not even its first item fits beside the floats.
#[allow(clippy::too_many_arguments)]
fn fill_line(
    tree: &mut BoxTree,
    context: &mut LayoutContext,
    measurer: &dyn TextMeasurer,
    block: BoxId,
    line: &mut LineCandidate,
    cursor: &mut InlineIterator,
    first_line: bool,
    may_move: bool,
) -> bool {
    let content_width = tree[block].content_inline_size();

    while let Some(item) = cursor.item() {
        // Lines narrowed by floats (text-indent aside) can move down to find more room.
        let can_move = may_move &&
            float::available_width_for_line(tree, block, line.top) < content_width;
        let node = &tree[item];

        if node.is_floating() {
            let handle = float::insert_float(tree, context, block, item);
            let width = float::floats(tree, block)
                .and_then(|floats| floats.get(handle))
                .map_or(Au::zero(), |record| record.rect().size.inline);
            if !line.deferring_floats && width <= line.remaining() {
                float::position_new_floats(tree, context, block, line.top);
                let (left, available) = line_extent(tree, block, line.top, first_line);
                line.left = left;
                line.available = available;
            } else {
                line.deferring_floats = true;
            }
            line.floats.push(handle);
            cursor.move_to_next_item(tree, None);
            continue;
        }

        if node.is_out_of_flow_positioned() {
            line.positioned.push(PendingPositioned {
                id: item,
                inline_position: line.left + line.used,
                after_line_content: !node.style.is_inline_level() && line.has_content,
            });
            cursor.move_to_next_item(tree, None);
            continue;
        }

        if !produces_runs(tree, item) {
            cursor.move_to_next_item(tree, None);
            continue;
        }
        line.height = line.height.max(node.style.line_height);

        match node.kind {
            BoxKind::Text(ref text) => {
                let text = text.clone();
                let style = node.style.clone();
                if cursor.offset() >= text.len() {
                    cursor.move_to_next_item(tree, None);
                    continue;
                }
                if !line.has_content &&
                    collapses_spaces(&style) &&
                    cursor.current_char(tree).is_some_and(|character| {
                        is_collapsible_space(character) &&
                            !ends_with_forced_break(&character.to_string(), &style)
                    })
                {
                    // Leading white space after floats or positioned boxes.
                    skip_leading_white_space(tree, cursor);
                    line.start = *cursor;
                    continue;
                }
                let (end, forced) = next_break(measurer, &text, &style, cursor);
                let piece = &text[cursor.offset()..end];
                let visible = piece.trim_end_matches(is_collapsible_space);
                let visible_width = measurer.advance(visible, &style);
                let full_width = measurer.advance(piece, &style);
                if !line.fits(visible_width) {
                    return false;
                }
                if !line.has_content && line.used + visible_width > line.available && can_move {
                    return true;
                }
                line.trimmed = line.used + visible_width;
                line.used += full_width;
                line.has_content |= !visible.is_empty() || !collapses_spaces(&style);
                if end >= text.len() {
                    cursor.move_to_next_item(tree, None);
                } else {
                    *cursor = InlineIterator::new(cursor.root(), Some(item), end);
                }
                if forced {
                    line.has_content = true;
                    line.hard_break = true;
                    return false;
                }
            },
            BoxKind::LineBreak => {
                line.has_content = true;
                line.hard_break = true;
                cursor.move_to_next_item(tree, None);
                return false;
            },
            BoxKind::Replaced { .. } | BoxKind::Block(_) => {
                let size = tree.size_in_containing_block(item);
                let margin = node.margin;
                let width = size.inline + margin.inline_sum();
                if !line.fits(width) {
                    return false;
                }
                if !line.has_content && width > line.available && can_move {
                    return true;
                }
                line.height = line.height.max(size.block + margin.block_sum());
                line.used += width;
                line.trimmed = line.used;
                line.has_content = true;
                cursor.move_to_next_item(tree, None);
            },
            BoxKind::Inline => cursor.move_to_next_item(tree, None),
        }
    }
    false
}

/// Paginates the line, builds its runs, places its atomic items and appends it.
#[allow(clippy::too_many_arguments)]
fn finish_line(
    tree: &mut BoxTree,
    context: &mut LayoutContext,
    measurer: &dyn TextMeasurer,
    block: BoxId,
    line: &mut LineCandidate,
    end: InlineIterator,
    first_line: bool,
    lines: &mut LineBoxList,
) -> LineHandle {
    let mut top = line.top;
    let mut pagination_strut = Au::zero();
    if context.is_paginated() {
        let strut = crate::pagination::line_pagination_strut(tree, context, top, line.height);
        if strut > Au::zero() {
            let node = &tree[block];
            let total = line.height + top.max(Au::zero());
            if first_line &&
                total < context.page_logical_height() &&
                !node.is_out_of_flow_positioned() &&
                node.style.display != Display::TableCell
            {
                // The whole block moves instead; the parent picks this up.
                tree.block_mut(block).pagination_strut = strut + top.max(Au::zero());
            } else {
                pagination_strut = strut;
                top += strut;
            }
        }
    }

    let runs = build_bidi_runs_for_line(tree, &line.start, &end, context.bidi_resolver_mut());

    let style = &tree[block].style;
    let ltr = style.is_left_to_right_direction();
    let free = (line.available - line.trimmed).max(Au::zero());
    let align_offset = match (style.text_align, ltr) {
        (TextAlign::Start, true) | (TextAlign::End, false) => Au::zero(),
        (TextAlign::Start, false) | (TextAlign::End, true) => free,
        (TextAlign::Center, _) => free / 2,
    };
    let line_left = line.left + align_offset;

    let mut position = line_left;
    for handle in runs.visual_order() {
        let Some(run) = runs.get(handle).copied() else {
            continue;
        };
        if tree[run.item].is_out_of_flow_positioned() {
            continue;
        }
        match tree[run.item].kind {
            BoxKind::Text(ref text) => {
                let piece = text.get(run.start..run.stop).unwrap_or_default();
                position += measurer.advance(piece, &tree[run.item].style);
            },
            BoxKind::Replaced { .. } | BoxKind::Block(_) => {
                let margin = tree[run.item].margin;
                let size = tree.size_in_containing_block(run.item);
                let node = &mut tree[run.item];
                node.frame.start_corner.inline = position + margin.inline_start;
                node.frame.start_corner.block = top + margin.block_start;
                position += size.inline + margin.inline_sum();
            },
            BoxKind::LineBreak | BoxKind::Inline => {},
        }
    }

    lines.push(LineBox {
        rect: LogicalRect::new(line_left, top, line.trimmed, line.height),
        start: line.start,
        end,
        runs,
        dirty: false,
        hard_break: line.hard_break,
        pagination_strut,
    })
}

/// The block range covered by lines that differ between two layouts, or that were marked
/// dirty since the previous one.
fn changed_range(old_lines: &LineBoxList, new_lines: &LineBoxList) -> (Au, Au) {
    let mut top = Au::zero();
    let mut bottom = Au::zero();
    let mut extend = |line: &LineBox| {
        if top == bottom {
            top = line.logical_top();
            bottom = line.logical_bottom();
        } else {
            top = top.min(line.logical_top());
            bottom = bottom.max(line.logical_bottom());
        }
    };

    let mut old = old_lines.iter();
    let mut new = new_lines.iter();
    loop {
        match (old.next(), new.next()) {
            (None, None) => break,
            (Some(old_line), Some(new_line)) => {
                if old_line.dirty ||
                    old_line.rect != new_line.rect ||
                    old_line.start != new_line.start ||
                    old_line.end != new_line.end
                {
                    extend(old_line);
                    extend(new_line);
                }
            },
            (Some(line), None) | (None, Some(line)) => extend(line),
        }
    }
    (top, bottom)
}
