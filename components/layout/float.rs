/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Float layout.
//!
//! See CSS 2.1 § 9.5.1: <https://www.w3.org/TR/CSS2/visuren.html#float-position>
//!
//! Every block keeps a registry of the floats that affect its content: the floats it
//! contains, floats overhanging out of its children and floats intruding from its parent
//! or previous sibling. The same float can be registered with many blocks, but exactly one
//! registration paints it. Placed floats are also indexed in a band tree, which answers
//! "how much inline space is left at this block position" without walking every float.

use std::ops::Range;
use std::sync::Arc;

use app_units::{Au, MAX_AU, MIN_AU};
use euclid::num::Zero;
use log::{debug, trace};
use rustc_hash::FxHashMap;

use crate::arena::{Arena, Handle};
use crate::box_tree::{BoxId, BoxTree, LayoutFlags};
use crate::context::LayoutContext;
use crate::geom::{LogicalRect, LogicalVec2, saturating_add};
use crate::inline::LineHandle;
use crate::style::{Clear, Display, Float};

pub type FloatHandle = Handle<FloatRecord>;

/// The line-left or line-right side of the containing block.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FloatSide {
    Left,
    Right,
}

impl FloatSide {
    pub fn from_style(float: Float) -> Option<FloatSide> {
        match float {
            Float::None => None,
            Float::Left => Some(FloatSide::Left),
            Float::Right => Some(FloatSide::Right),
        }
    }
}

/// One registration of a float with a block.
#[derive(Clone, Debug)]
pub struct FloatRecord {
    pub(crate) box_id: BoxId,
    pub(crate) side: FloatSide,
    /// The margin box, relative to the border box of the block owning this record.
    pub(crate) rect: LogicalRect<Au>,
    pub(crate) should_paint: bool,
    /// Whether the float is a descendant of the owning block (rather than intruding).
    pub(crate) is_descendant: bool,
    pub(crate) is_placed: bool,
    pub(crate) pagination_strut: Au,
    pub(crate) originating_line: Option<LineHandle>,
}

impl FloatRecord {
    pub fn box_id(&self) -> BoxId {
        self.box_id
    }

    pub fn side(&self) -> FloatSide {
        self.side
    }

    pub fn rect(&self) -> LogicalRect<Au> {
        self.rect
    }

    pub fn should_paint(&self) -> bool {
        self.should_paint
    }

    pub fn is_descendant(&self) -> bool {
        self.is_descendant
    }

    pub fn is_placed(&self) -> bool {
        self.is_placed
    }

    pub fn logical_top(&self) -> Au {
        self.rect.min_block_position()
    }

    pub fn logical_bottom(&self) -> Au {
        self.rect.max_block_position()
    }

    pub fn logical_left(&self) -> Au {
        self.rect.min_inline_position()
    }

    pub fn logical_right(&self) -> Au {
        self.rect.max_inline_position()
    }

    /// A copy of this record for another block, whose border box is at `offset` in this
    /// record's coordinate space.
    fn copy_to_new_container(&self, offset: LogicalVec2<Au>, should_paint: bool, is_descendant: bool) -> Self {
        FloatRecord {
            box_id: self.box_id,
            side: self.side,
            rect: self.rect.translate(-offset),
            should_paint,
            is_descendant,
            is_placed: true,
            pagination_strut: Au::zero(),
            originating_line: None,
        }
    }
}

/// The float registry of one block.
#[derive(Debug, Default)]
pub struct FloatingObjects {
    records: Arena<FloatRecord>,
    /// Insertion order, which is also placement order.
    order: Vec<FloatHandle>,
    by_box: FxHashMap<BoxId, FloatHandle>,
    bands: FloatBandTree,
}

impl FloatingObjects {
    pub fn new() -> Self {
        FloatingObjects {
            bands: FloatBandTree::with_sentinels(),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, handle: FloatHandle) -> Option<&FloatRecord> {
        self.records.get(handle)
    }

    pub fn find(&self, box_id: BoxId) -> Option<FloatHandle> {
        self.by_box.get(&box_id).copied()
    }

    pub fn contains(&self, box_id: BoxId) -> bool {
        self.by_box.contains_key(&box_id)
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (FloatHandle, &FloatRecord)> + '_ {
        self.order
            .iter()
            .map(move |handle| (*handle, &self.records[*handle]))
    }

    pub(crate) fn handles(&self) -> Vec<FloatHandle> {
        self.order.clone()
    }

    pub(crate) fn add(&mut self, record: FloatRecord) -> FloatHandle {
        debug_assert!(!self.contains(record.box_id));
        let box_id = record.box_id;
        if record.is_placed {
            self.bands.add_float(&record);
        }
        let handle = self.records.insert(record);
        self.order.push(handle);
        self.by_box.insert(box_id, handle);
        handle
    }

    pub(crate) fn place(&mut self, handle: FloatHandle, rect: LogicalRect<Au>, pagination_strut: Au) {
        let record = &mut self.records[handle];
        debug_assert!(!record.is_placed);
        record.rect = rect;
        record.pagination_strut = pagination_strut;
        record.is_placed = true;
        self.bands.add_float(&self.records[handle]);
    }

    pub(crate) fn set_originating_line(&mut self, handle: FloatHandle, line: LineHandle) {
        if let Some(record) = self.records.get_mut(handle) {
            record.originating_line = Some(line);
        }
    }

    pub(crate) fn set_should_paint(&mut self, handle: FloatHandle, should_paint: bool) {
        if let Some(record) = self.records.get_mut(handle) {
            record.should_paint = should_paint;
        }
    }

    pub(crate) fn remove(&mut self, box_id: BoxId) -> Option<FloatRecord> {
        let handle = self.by_box.remove(&box_id)?;
        self.order.retain(|other| *other != handle);
        let record = self.records.remove(handle)?;
        if record.is_placed {
            self.rebuild_bands();
        }
        Some(record)
    }

    /// Drops every record. Outstanding handles become stale.
    pub(crate) fn clear(&mut self) {
        self.records.clear();
        self.order.clear();
        self.by_box.clear();
        self.bands = FloatBandTree::with_sentinels();
    }

    fn rebuild_bands(&mut self) {
        let mut bands = FloatBandTree::with_sentinels();
        for handle in &self.order {
            let record = &self.records[*handle];
            if record.is_placed {
                bands.add_float(record);
            }
        }
        self.bands = bands;
    }

    /// The last record that has been placed, if any, and the index right after it.
    fn last_placed(&self) -> Option<(usize, FloatHandle)> {
        self.order
            .iter()
            .enumerate()
            .rev()
            .find(|(_, handle)| self.records[**handle].is_placed)
            .map(|(index, handle)| (index, *handle))
    }

    /// The line-left edge available at `block_position`, never less than `fixed_offset`,
    /// and the distance to the next position where that could change.
    pub fn left_offset(&self, block_position: Au, fixed_offset: Au) -> (Au, Au) {
        let band = self.bands.find(block_position);
        let offset = match band.and_then(|band| band.inline_start) {
            Some(edge) => edge.max(fixed_offset),
            None => fixed_offset,
        };
        (offset, self.height_remaining(block_position))
    }

    /// The line-right edge available at `block_position`, never more than `fixed_offset`.
    pub fn right_offset(&self, block_position: Au, fixed_offset: Au) -> (Au, Au) {
        let band = self.bands.find(block_position);
        let offset = match band.and_then(|band| band.inline_end) {
            Some(edge) => edge.min(fixed_offset),
            None => fixed_offset,
        };
        (offset, self.height_remaining(block_position))
    }

    fn height_remaining(&self, block_position: Au) -> Au {
        match self.bands.find_next(block_position) {
            Some(next) if next.top < MAX_AU => (next.top - block_position).max(Au(1)),
            _ => Au(1),
        }
    }

    /// Bottom of the lowest placed float on `side`, or of any side.
    pub fn lowest_bottom(&self, side: Option<FloatSide>) -> Au {
        self.iter()
            .filter(|(_, record)| record.is_placed && side.is_none_or(|side| record.side == side))
            .map(|(_, record)| record.logical_bottom())
            .fold(Au::zero(), Au::max)
    }

    /// The closest float bottom strictly below `block_position`.
    pub fn next_bottom_below(&self, block_position: Au) -> Option<Au> {
        self.iter()
            .filter(|(_, record)| record.is_placed)
            .map(|(_, record)| record.logical_bottom())
            .filter(|bottom| *bottom > block_position)
            .min()
    }
}

// Float band storage

/// A nonoverlapping block range in which the available inline space is constant.
/// Content goes between `inline_start` (the right edge of the line-left floats) and
/// `inline_end` (the left edge of the line-right floats). `None` means no float on that
/// side, which is not the same thing as a zero-width float.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloatBand {
    pub top: Au,
    pub inline_start: Option<Au>,
    pub inline_end: Option<Au>,
}

/// A persistent AA tree of float bands. There is always a band at `MIN_AU` and another at
/// `MAX_AU`.
///
/// See: <https://en.wikipedia.org/wiki/AA_tree>
#[derive(Clone, Debug, Default)]
pub struct FloatBandTree {
    root: FloatBandLink,
}

#[derive(Clone, Debug, Default)]
struct FloatBandLink(Option<Arc<FloatBandNode>>);

#[derive(Clone, Debug)]
struct FloatBandNode {
    band: FloatBand,
    left: FloatBandLink,
    right: FloatBandLink,
    /// Increases towards the root; drives rebalancing.
    level: i32,
}

impl FloatBandTree {
    pub fn with_sentinels() -> FloatBandTree {
        let empty = |top| FloatBand {
            top,
            inline_start: None,
            inline_end: None,
        };
        FloatBandTree::default()
            .insert(empty(MIN_AU))
            .insert(empty(MAX_AU))
    }

    /// The last band whose top is at or above `block_position`.
    pub fn find(&self, block_position: Au) -> Option<FloatBand> {
        self.root.find(block_position)
    }

    /// The first band whose top is strictly below `block_position`.
    pub fn find_next(&self, block_position: Au) -> Option<FloatBand> {
        self.root.find_next(block_position)
    }

    /// Tightens the `side` edge of all bands whose top is within `range` to `new_value`.
    #[must_use]
    pub fn set_range(&self, range: &Range<Au>, side: FloatSide, new_value: Au) -> FloatBandTree {
        FloatBandTree {
            root: FloatBandLink(
                self.root
                    .0
                    .as_ref()
                    .map(|root| root.set_range(range, side, new_value)),
            ),
        }
    }

    /// Inserts a band, replacing any band with the same top.
    #[must_use]
    pub fn insert(&self, band: FloatBand) -> FloatBandTree {
        FloatBandTree {
            root: self.root.insert(band),
        }
    }

    /// Splits the bands at the float's top and bottom edges and narrows everything in
    /// between.
    fn add_float(&mut self, record: &FloatRecord) {
        let top = record.logical_top();
        let bottom = record.logical_bottom().max(top);
        if top == bottom {
            return;
        }
        for edge in [top, bottom] {
            if let Some(mut band) = self.find(edge) {
                if band.top != edge {
                    band.top = edge;
                    *self = self.insert(band);
                }
            }
        }
        let value = match record.side {
            FloatSide::Left => record.logical_right(),
            FloatSide::Right => record.logical_left(),
        };
        *self = self.set_range(&(top..bottom), record.side, value);
    }
}

impl FloatBandNode {
    fn new(band: FloatBand) -> FloatBandNode {
        FloatBandNode {
            band,
            left: FloatBandLink(None),
            right: FloatBandLink(None),
            level: 1,
        }
    }

    fn set_range(&self, range: &Range<Au>, side: FloatSide, new_value: Au) -> Arc<FloatBandNode> {
        let mut new_band = self.band;
        if self.band.top >= range.start && self.band.top < range.end {
            match side {
                FloatSide::Left => {
                    new_band.inline_start = Some(match new_band.inline_start {
                        Some(old_value) => old_value.max(new_value),
                        None => new_value,
                    });
                },
                FloatSide::Right => {
                    new_band.inline_end = Some(match new_band.inline_end {
                        Some(old_value) => old_value.min(new_value),
                        None => new_value,
                    });
                },
            }
        }

        let new_left = match self.left.0 {
            Some(ref old_left) if range.start < new_band.top => {
                FloatBandLink(Some(old_left.set_range(range, side, new_value)))
            },
            ref other => FloatBandLink(other.clone()),
        };
        let new_right = match self.right.0 {
            Some(ref old_right) if range.end > new_band.top => {
                FloatBandLink(Some(old_right.set_range(range, side, new_value)))
            },
            ref other => FloatBandLink(other.clone()),
        };

        Arc::new(FloatBandNode {
            band: new_band,
            left: new_left,
            right: new_right,
            level: self.level,
        })
    }
}

impl FloatBandLink {
    fn find(&self, block_position: Au) -> Option<FloatBand> {
        let this = self.0.as_ref()?;
        if block_position < this.band.top {
            return this.left.find(block_position);
        }
        this.right.find(block_position).or(Some(this.band))
    }

    fn find_next(&self, block_position: Au) -> Option<FloatBand> {
        let this = self.0.as_ref()?;
        if block_position >= this.band.top {
            return this.right.find_next(block_position);
        }
        this.left.find_next(block_position).or(Some(this.band))
    }

    fn insert(&self, band: FloatBand) -> FloatBandLink {
        let mut this = match self.0 {
            None => return FloatBandLink(Some(Arc::new(FloatBandNode::new(band)))),
            Some(ref this) => (**this).clone(),
        };

        if band.top < this.band.top {
            this.left = this.left.insert(band);
            return FloatBandLink(Some(Arc::new(this))).skew().split();
        }
        if band.top > this.band.top {
            this.right = this.right.insert(band);
            return FloatBandLink(Some(Arc::new(this))).skew().split();
        }

        this.band = band;
        FloatBandLink(Some(Arc::new(this)))
    }

    /// Corrects tree balance:
    ///```text
    ///         T          L
    ///        / \        / \
    ///       L   R  →   A   T      if level(T) = level(L)
    ///      / \            / \
    ///     A   B          B   R
    /// ```
    fn skew(&self) -> FloatBandLink {
        if let Some(ref this) = self.0 {
            if let Some(ref left) = this.left.0 {
                if this.level == left.level {
                    return FloatBandLink(Some(Arc::new(FloatBandNode {
                        level: this.level,
                        left: left.left.clone(),
                        band: left.band,
                        right: FloatBandLink(Some(Arc::new(FloatBandNode {
                            level: this.level,
                            left: left.right.clone(),
                            band: this.band,
                            right: this.right.clone(),
                        }))),
                    })));
                }
            }
        }
        self.clone()
    }

    /// Corrects tree balance:
    ///```text
    ///         T            R
    ///        / \          / \
    ///       A   R   →    T   X    if level(T) = level(X)
    ///          / \      / \
    ///         B   X    A   B
    /// ```
    fn split(&self) -> FloatBandLink {
        if let Some(ref this) = self.0 {
            if let Some(ref right) = this.right.0 {
                if let Some(ref right_right) = right.right.0 {
                    if this.level == right_right.level {
                        return FloatBandLink(Some(Arc::new(FloatBandNode {
                            level: this.level + 1,
                            left: FloatBandLink(Some(Arc::new(FloatBandNode {
                                level: this.level,
                                left: this.left.clone(),
                                band: this.band,
                                right: right.left.clone(),
                            }))),
                            band: right.band,
                            right: right.right.clone(),
                        })));
                    }
                }
            }
        }
        self.clone()
    }
}

// Registry operations on the box tree.

fn floats_mut(tree: &mut BoxTree, block: BoxId) -> &mut FloatingObjects {
    tree.block_mut(block)
        .floats
        .get_or_insert_with(|| Box::new(FloatingObjects::new()))
}

pub(crate) fn floats(tree: &BoxTree, block: BoxId) -> Option<&FloatingObjects> {
    tree.block(block).floats.as_deref()
}

pub(crate) fn contains_float(tree: &BoxTree, block: BoxId, float_box: BoxId) -> bool {
    tree.is_block(block) && floats(tree, block).is_some_and(|floats| floats.contains(float_box))
}

pub(crate) fn lowest_float_bottom(tree: &BoxTree, block: BoxId, side: Option<FloatSide>) -> Au {
    floats(tree, block).map_or(Au::zero(), |floats| floats.lowest_bottom(side))
}

/// Line-left edge for content at `block_position`, relative to the block's border box.
pub(crate) fn left_offset_for_line(tree: &BoxTree, block: BoxId, block_position: Au) -> Au {
    let fixed = tree[block].content_inline_start();
    floats(tree, block).map_or(fixed, |floats| floats.left_offset(block_position, fixed).0)
}

pub(crate) fn right_offset_for_line(tree: &BoxTree, block: BoxId, block_position: Au) -> Au {
    let node = &tree[block];
    let fixed = node.content_inline_start() + node.content_inline_size();
    floats(tree, block).map_or(fixed, |floats| floats.right_offset(block_position, fixed).0)
}

pub(crate) fn available_width_for_line(tree: &BoxTree, block: BoxId, block_position: Au) -> Au {
    (right_offset_for_line(tree, block, block_position) -
        left_offset_for_line(tree, block, block_position))
    .max(Au::zero())
}

/// Registers a floated child with `block`. Registration is idempotent: inserting a float
/// twice returns the existing handle. The float is laid out now unless pagination defers
/// it to placement, in which case only its inline size is computed.
pub fn insert_float(
    tree: &mut BoxTree,
    context: &mut LayoutContext,
    block: BoxId,
    child: BoxId,
) -> FloatHandle {
    debug_assert!(tree[child].is_floating());
    if let Some(handle) = floats(tree, block).and_then(|floats| floats.find(child)) {
        return handle;
    }

    let child_is_block = tree.is_block(child);
    if child_is_block && !tree.needs_layout(child) && context.page_logical_height_changed() {
        tree[child].flags.insert(LayoutFlags::SELF_NEEDS_LAYOUT);
    }
    let affected_by_pagination = child_is_block && context.page_logical_height() > Au::zero();
    if !affected_by_pagination || tree.is_writing_mode_root(block) {
        crate::block::layout_if_needed(tree, context, child);
    } else {
        crate::block::compute_inline_size_and_margins(tree, context, child);
    }

    let node = &tree[child];
    let inline_size = tree.size_in_containing_block(child).inline + node.margin.inline_sum();
    let record = FloatRecord {
        box_id: child,
        side: FloatSide::from_style(node.style.float).unwrap_or(FloatSide::Left),
        rect: LogicalRect::new(Au::zero(), Au::zero(), inline_size, Au::zero()),
        // A float with its own layer paints itself.
        should_paint: !node.style.has_self_painting_layer(),
        is_descendant: true,
        is_placed: false,
        pagination_strut: Au::zero(),
        originating_line: None,
    };
    trace!("Registering float {child:?} with {block:?}, inline size {inline_size:?}");
    floats_mut(tree, block).add(record)
}

/// Removes the registration of `float_box` from `block` and from every block that
/// imported it from `block`: following siblings and descendants. Lines that the float
/// touched are marked dirty.
pub fn remove_float(tree: &mut BoxTree, block: BoxId, float_box: BoxId) {
    if !tree.contains(block) || !tree.is_block(block) {
        return;
    }
    mark_siblings_with_floats_for_layout(tree, block, Some(float_box));
    mark_all_descendants_with_floats_for_layout(tree, block, Some(float_box), false);
    // Blocks that never had layout skip the cascade, but the registration still goes.
    remove_floating_object(tree, block, float_box);
}

/// Removes one registration, dirtying the lines it touched.
pub(crate) fn remove_floating_object(tree: &mut BoxTree, block: BoxId, float_box: BoxId) {
    let Some(record) = tree
        .block_mut(block)
        .floats
        .as_mut()
        .and_then(|floats| floats.remove(float_box))
    else {
        return;
    };

    if !tree.block(block).children_inline {
        return;
    }
    let logical_top = record.logical_top();
    let mut logical_bottom = record.logical_bottom();
    if logical_bottom < Au::zero() || logical_bottom < logical_top || logical_top == MAX_AU {
        logical_bottom = MAX_AU;
    } else {
        // Zero and negative height floats still dirty the line they are on.
        logical_bottom = logical_bottom.max(logical_top + Au(1));
    }
    if let Some(line) = record.originating_line {
        if !tree[block].flags.contains(LayoutFlags::SELF_NEEDS_LAYOUT) {
            tree.block_mut(block).lines.mark_dirty(line);
        }
    }
    mark_lines_dirty_in_block_range(tree, block, Au::zero(), logical_bottom);
}

/// Marks every line whose bottom is in `[logical_top, logical_bottom]` dirty, walking up
/// from the last line.
pub(crate) fn mark_lines_dirty_in_block_range(
    tree: &mut BoxTree,
    block: BoxId,
    logical_top: Au,
    logical_bottom: Au,
) {
    if logical_top >= logical_bottom {
        return;
    }
    let lines = &mut tree.block_mut(block).lines;
    let order = lines.handles();
    let mut index = order.len();
    while index > 0 &&
        lines[order[index - 1]].logical_bottom() >= logical_bottom &&
        logical_bottom < MAX_AU
    {
        index -= 1;
    }
    while index > 0 {
        let line = &mut lines[order[index - 1]];
        let bottom = line.logical_bottom();
        if bottom < logical_top && bottom >= Au::zero() {
            break;
        }
        line.dirty = true;
        index -= 1;
    }
}

/// Places every registered float that has not been placed yet, in insertion order, no
/// higher than `logical_height` nor the top of the last placed float. Returns whether
/// anything was placed.
pub(crate) fn position_new_floats(
    tree: &mut BoxTree,
    context: &mut LayoutContext,
    block: BoxId,
    logical_height: Au,
) -> bool {
    let Some(registry) = floats(tree, block) else {
        return false;
    };
    let handles = registry.handles();
    let Some(last) = handles.last() else {
        return false;
    };
    if registry.records[*last].is_placed {
        return false;
    }

    let mut logical_top = logical_height;
    let start = match registry.last_placed() {
        Some((index, handle)) => {
            logical_top = logical_top.max(registry.records[handle].logical_top());
            index + 1
        },
        None => 0,
    };

    for handle in &handles[start..] {
        let Some(record) = floats(tree, block).and_then(|floats| floats.get(*handle)).cloned() else {
            continue;
        };
        // Floats that come from elsewhere are positioned by their own containing block.
        if record.is_placed || tree.containing_block(record.box_id) != Some(block) {
            continue;
        }
        let child = record.box_id;

        let clear = tree[child].style.clear;
        if matches!(clear, Clear::Left | Clear::Both) {
            logical_top = logical_top.max(lowest_float_bottom(tree, block, Some(FloatSide::Left)));
        }
        if matches!(clear, Clear::Right | Clear::Both) {
            logical_top = logical_top.max(lowest_float_bottom(tree, block, Some(FloatSide::Right)));
        }

        let mut location = compute_logical_location_for_float(tree, block, &record, logical_top);
        set_float_child_position(tree, child, location);
        crate::block::layout_if_needed(tree, context, child);

        let mut pagination_strut = Au::zero();
        if context.is_paginated() {
            // Unsplittable floats that do not fit move down, margins included.
            let margin_box_block_size = tree.size_in_containing_block(child).block + tree[child].margin.block_sum();
            let mut new_top = crate::pagination::adjust_for_unsplittable_child(
                tree,
                context,
                child,
                location.block,
                margin_box_block_size,
            );
            if tree.is_block(child) {
                new_top += tree.block(child).pagination_strut;
            }
            if new_top != location.block {
                pagination_strut = new_top - location.block;
                location = compute_logical_location_for_float(tree, block, &record, new_top);
                set_float_child_position(tree, child, location);
                if tree.is_block(child) {
                    tree[child].flags.insert(LayoutFlags::SELF_NEEDS_LAYOUT);
                }
                crate::block::layout_if_needed(tree, context, child);
            }
        }

        let node = &tree[child];
        let size = tree.size_in_containing_block(child);
        let rect = LogicalRect::new(
            location.inline,
            location.block,
            record.rect.size.inline,
            size.block + node.margin.block_sum(),
        );
        debug!("Placed float {child:?} in {block:?} at {rect:?}");
        floats_mut(tree, block).place(*handle, rect, pagination_strut);
    }
    true
}

fn set_float_child_position(tree: &mut BoxTree, child: BoxId, location: LogicalVec2<Au>) {
    let node = &mut tree[child];
    node.frame.start_corner = LogicalVec2::new(
        location.inline + node.margin.inline_start,
        location.block + node.margin.block_start,
    );
}

/// Where a float's margin box goes when placed no higher than `logical_top`. The float
/// moves down band by band until the space between the floats on either side is wide
/// enough; the width looked for is capped to the content width.
fn compute_logical_location_for_float(
    tree: &BoxTree,
    block: BoxId,
    record: &FloatRecord,
    logical_top: Au,
) -> LogicalVec2<Au> {
    let node = &tree[block];
    let left_fixed = node.content_inline_start();
    let right_fixed = left_fixed + node.content_inline_size();
    let float_inline_size = record.rect.size.inline.min(right_fixed - left_fixed);
    let empty = FloatingObjects::new();
    let floats = floats(tree, block).unwrap_or(&empty);

    let mut logical_top = logical_top;
    let logical_left = match record.side {
        FloatSide::Left => {
            let (mut left, mut remaining_left) = floats.left_offset(logical_top, left_fixed);
            loop {
                let (right, remaining_right) = floats.right_offset(logical_top, right_fixed);
                if right - left >= float_inline_size {
                    break;
                }
                logical_top += remaining_left.min(remaining_right);
                (left, remaining_left) = floats.left_offset(logical_top, left_fixed);
            }
            left.max(Au::zero())
        },
        FloatSide::Right => {
            let (mut right, mut remaining_right) = floats.right_offset(logical_top, right_fixed);
            loop {
                let (left, remaining_left) = floats.left_offset(logical_top, left_fixed);
                if right - left >= float_inline_size {
                    break;
                }
                logical_top += remaining_left.min(remaining_right);
                (right, remaining_right) = floats.right_offset(logical_top, right_fixed);
            }
            // The uncapped width, so that an oversized right float sticks out on the left.
            right - record.rect.size.inline
        },
    };
    LogicalVec2::new(logical_left, logical_top)
}

/// Forgets the floats of the previous layout and imports the floats that intrude into
/// this block from its parent and from its previous in-flow sibling. Blocks that avoid
/// floats, roots, floats, positioned boxes and table cells start with no floats at all.
pub(crate) fn clear_floats(tree: &mut BoxTree, block: BoxId) {
    let node = &tree[block];
    if tree.avoids_floats(block) ||
        tree.is_root(block) ||
        node.is_floating_or_out_of_flow_positioned() ||
        node.style.display == Display::TableCell
    {
        if let Some(floats) = tree.block_mut(block).floats.as_mut() {
            floats.clear();
        }
        return;
    }

    let children_inline = tree.block(block).children_inline;
    let mut old_floats: FxHashMap<BoxId, FloatRecord> = FxHashMap::default();
    if let Some(floats) = tree.block_mut(block).floats.as_mut() {
        if children_inline {
            old_floats = floats
                .iter()
                .map(|(_, record)| (record.box_id, record.clone()))
                .collect();
        }
        floats.clear();
    }

    let Some(parent) = tree.parent(block).filter(|parent| tree.is_block(*parent)) else {
        return;
    };

    // Find a previous sibling that may have overhanging floats, skipping out-of-flow boxes
    // and siblings that shifted to avoid floats.
    let mut parent_has_floats = false;
    let mut previous = tree.previous_sibling(block);
    while let Some(candidate) = previous {
        let candidate_node = &tree[candidate];
        if !candidate_node.is_floating_or_out_of_flow_positioned() &&
            candidate_node.is_block_container() &&
            !tree.avoids_floats(candidate)
        {
            break;
        }
        parent_has_floats |= candidate_node.is_floating();
        previous = tree.previous_sibling(candidate);
    }

    let mut logical_top_offset = tree[block].frame.start_corner.block;
    if parent_has_floats {
        let parent_content_start = tree[parent].content_inline_start();
        add_intruding_floats(tree, block, parent, parent_content_start, logical_top_offset);
    }

    let mut logical_left_offset = Au::zero();
    let previous = match previous {
        Some(previous) => {
            logical_top_offset -= tree[previous].frame.start_corner.block;
            previous
        },
        None => {
            logical_left_offset += tree[parent].content_inline_start();
            parent
        },
    };
    if floats(tree, previous).is_some() &&
        lowest_float_bottom(tree, previous, None) > logical_top_offset
    {
        add_intruding_floats(tree, block, previous, logical_left_offset, logical_top_offset);
    }

    if children_inline {
        mark_lines_dirty_for_float_changes(tree, block, old_floats);
    }
}

/// Compares the floats of this layout with the floats of the previous one and dirties the
/// lines in the block range where anything changed.
fn mark_lines_dirty_for_float_changes(
    tree: &mut BoxTree,
    block: BoxId,
    mut old_floats: FxHashMap<BoxId, FloatRecord>,
) {
    let mut change_top = MAX_AU;
    let mut change_bottom = MIN_AU;
    let self_needs_layout = tree[block].flags.contains(LayoutFlags::SELF_NEEDS_LAYOUT);

    let current: Vec<FloatRecord> = floats(tree, block)
        .map(|floats| floats.iter().map(|(_, record)| record.clone()).collect())
        .unwrap_or_default();
    for record in current {
        let logical_bottom = record.logical_bottom();
        match old_floats.remove(&record.box_id) {
            Some(old) => {
                let old_bottom = old.logical_bottom();
                if record.rect.size.inline != old.rect.size.inline ||
                    record.logical_left() != old.logical_left()
                {
                    change_top = Au::zero();
                    change_bottom = change_bottom.max(logical_bottom.max(old_bottom));
                } else if logical_bottom != old_bottom {
                    change_top = change_top.min(logical_bottom.min(old_bottom));
                    change_bottom = change_bottom.max(logical_bottom.max(old_bottom));
                }
                if let Some(line) = old.originating_line {
                    if !self_needs_layout {
                        tree.block_mut(block).lines.mark_dirty(line);
                    }
                }
            },
            None => {
                change_top = Au::zero();
                change_bottom = change_bottom.max(logical_bottom);
            },
        }
    }
    for old in old_floats.values() {
        if !old.is_descendant {
            change_top = Au::zero();
            change_bottom = change_bottom.max(old.logical_bottom());
        }
    }
    mark_lines_dirty_in_block_range(tree, block, change_top, change_bottom);
}

/// Copies the floats of `previous` (the parent or a previous sibling) that extend below
/// `logical_top_offset` into `block`. `logical_left_offset` and `logical_top_offset` are
/// the position of `block`'s content origin in `previous`' coordinates, margins aside.
pub(crate) fn add_intruding_floats(
    tree: &mut BoxTree,
    block: BoxId,
    previous: BoxId,
    logical_left_offset: Au,
    logical_top_offset: Au,
) {
    let Some(previous_floats) = floats(tree, previous) else {
        return;
    };
    let logical_left_offset = logical_left_offset + tree[block].margin.inline_start;
    // When the floats come from a sibling, the sibling's margin separates the coordinate
    // spaces too. For the parent it is already part of `logical_left_offset`.
    let previous_margin = if tree.parent(block) == Some(previous) {
        Au::zero()
    } else {
        tree[previous].margin.inline_start
    };
    let offset = LogicalVec2::new(logical_left_offset - previous_margin, logical_top_offset);

    let copies: Vec<FloatRecord> = previous_floats
        .iter()
        .filter(|(_, record)| record.logical_bottom() > logical_top_offset)
        .filter(|(_, record)| !contains_float(tree, block, record.box_id))
        // Not in this float's chain of ancestors, so never its painter.
        .map(|(_, record)| record.copy_to_new_container(offset, false, false))
        .collect();
    if copies.is_empty() {
        return;
    }
    let registry = floats_mut(tree, block);
    for copy in copies {
        trace!("Float {:?} intrudes into {block:?} at {:?}", copy.box_id, copy.rect);
        registry.add(copy);
    }
}

/// The nearest box at or above `id` that paints its own floats.
fn enclosing_float_painting_layer(tree: &BoxTree, id: BoxId) -> Option<BoxId> {
    std::iter::once(id)
        .chain(tree.ancestors(id))
        .find(|candidate| tree[*candidate].style.has_self_painting_layer())
}

/// Copies the floats of `child` that extend below `parent_height` into `parent`, moving
/// painting responsibility outwards. Returns the lowest float bottom of the child in the
/// parent's coordinates.
pub(crate) fn add_overhanging_floats(
    tree: &mut BoxTree,
    parent: BoxId,
    child: BoxId,
    make_child_paint_other_floats: bool,
    parent_height: Au,
) -> Au {
    let child_node = &tree[child];
    if child_node.style.has_overflow_clip() ||
        !tree.block(child).contains_floats() ||
        tree.is_root(child) ||
        tree.block(child).has_columns() ||
        tree.is_writing_mode_root(child)
    {
        return Au::zero();
    }

    let child_origin = child_node.frame.start_corner;
    let parent_layer = enclosing_float_painting_layer(tree, parent);
    let child_layer = enclosing_float_painting_layer(tree, child);
    let mut lowest_bottom = Au::zero();
    let mut overflow_rects = Vec::new();

    for handle in floats(tree, child).map(FloatingObjects::handles).unwrap_or_default() {
        let Some(record) = floats(tree, child).and_then(|floats| floats.get(handle)).cloned() else {
            continue;
        };
        let bottom = saturating_add(child_origin.block, record.logical_bottom());
        lowest_bottom = lowest_bottom.max(bottom);

        if bottom > parent_height {
            if contains_float(tree, parent, record.box_id) {
                continue;
            }
            let mut copy = record.copy_to_new_container(-child_origin, true, true);
            // The outermost overlapping block paints the float, unless a layer boundary
            // is in the way.
            if enclosing_float_painting_layer(tree, record.box_id) == parent_layer {
                floats_mut(tree, child).set_should_paint(handle, false);
            } else {
                copy.should_paint = false;
            }
            trace!("Float {:?} overhangs {child:?} into {parent:?}", record.box_id);
            floats_mut(tree, parent).add(copy);
        } else {
            if make_child_paint_other_floats &&
                !record.should_paint &&
                !tree[record.box_id].style.has_self_painting_layer() &&
                tree.is_descendant_of(record.box_id, child) &&
                enclosing_float_painting_layer(tree, record.box_id) == child_layer
            {
                // Not overhanging: a descendant float is the child's to paint.
                floats_mut(tree, child).set_should_paint(handle, true);
            }
            if record.is_descendant {
                overflow_rects.push(record.rect);
            }
        }
    }

    for rect in overflow_rects {
        crate::block::add_overflow_rect(tree, child, rect);
    }
    lowest_bottom
}

/// How far `child` must move down from `logical_top` to clear floats, either because of
/// its `clear` property or because it avoids floats and does not fit beside them.
pub(crate) fn get_clear_delta(
    tree: &mut BoxTree,
    context: &LayoutContext,
    block: BoxId,
    child: BoxId,
    logical_top: Au,
) -> Au {
    if !tree.block(block).contains_floats() {
        return Au::zero();
    }

    let clear = tree[child].style.clear;
    let bottom = match clear {
        Clear::None => Au::zero(),
        Clear::Left => lowest_float_bottom(tree, block, Some(FloatSide::Left)),
        Clear::Right => lowest_float_bottom(tree, block, Some(FloatSide::Right)),
        Clear::Both => lowest_float_bottom(tree, block, None),
    };
    let result = if clear != Clear::None {
        (bottom - logical_top).max(Au::zero())
    } else {
        Au::zero()
    };
    if result != Au::zero() || !tree.avoids_floats(child) {
        return result;
    }

    let content_inline_size = tree[block].content_inline_size();
    let mut new_logical_top = logical_top;
    loop {
        let available = available_width_for_line(tree, block, new_logical_top);
        if available == content_inline_size {
            return new_logical_top - logical_top;
        }
        let child_inline_size =
            crate::block::border_box_inline_size_at(tree, context, block, child, new_logical_top);
        if child_inline_size <= available {
            return new_logical_top - logical_top;
        }
        match floats(tree, block).and_then(|floats| floats.next_bottom_below(new_logical_top)) {
            Some(next) => new_logical_top = next,
            None => break,
        }
    }
    result
}

/// Marks `block` and its descendants that know about floats (or just about `float_to_remove`)
/// for layout, removing the float's registrations on the way.
pub(crate) fn mark_all_descendants_with_floats_for_layout(
    tree: &mut BoxTree,
    block: BoxId,
    float_to_remove: Option<BoxId>,
    in_layout: bool,
) {
    if !tree[block].flags.contains(LayoutFlags::EVER_HAD_LAYOUT) {
        return;
    }
    tree[block].flags.insert(LayoutFlags::NORMAL_CHILD_NEEDS_LAYOUT);
    if !in_layout {
        tree.mark_containing_block_chain(block);
    }
    if let Some(float_box) = float_to_remove {
        remove_floating_object(tree, block, float_box);
    }

    if tree.block(block).children_inline {
        return;
    }
    for child in tree.children(block).to_vec() {
        if (float_to_remove.is_none() && tree[child].is_floating_or_out_of_flow_positioned()) ||
            !tree.is_block(child)
        {
            continue;
        }
        let affected = match float_to_remove {
            Some(float_box) => contains_float(tree, child, float_box),
            None => tree.block(child).contains_floats(),
        };
        if affected || tree.shrinks_to_avoid_floats(child) {
            mark_all_descendants_with_floats_for_layout(tree, child, float_to_remove, in_layout);
        }
    }
}

/// Marks the following siblings of `block` that imported its floats (or `float_to_remove`).
pub(crate) fn mark_siblings_with_floats_for_layout(
    tree: &mut BoxTree,
    block: BoxId,
    float_to_remove: Option<BoxId>,
) {
    let Some(registry) = floats(tree, block) else {
        return;
    };
    let float_boxes: Vec<BoxId> = registry
        .iter()
        .map(|(_, record)| record.box_id)
        .filter(|float_box| float_to_remove.is_none_or(|removed| removed == *float_box))
        .collect();

    let mut next = tree.next_sibling(block);
    while let Some(sibling) = next {
        next = tree.next_sibling(sibling);
        if !tree.is_block(sibling) ||
            tree[sibling].is_floating_or_out_of_flow_positioned() ||
            tree.avoids_floats(sibling)
        {
            continue;
        }
        for float_box in &float_boxes {
            if contains_float(tree, sibling, *float_box) {
                mark_all_descendants_with_floats_for_layout(tree, sibling, Some(*float_box), false);
            }
        }
    }
}

/// Unregisters a float that leaves the tree from the outermost block that knows about it
/// and everything that imported it from there.
pub(crate) fn remove_floating_box_from_block_ancestors(tree: &mut BoxTree, float_box: BoxId) {
    let mut outermost = None;
    for ancestor in tree.ancestors(float_box) {
        if tree.is_block(ancestor) &&
            (outermost.is_none() || contains_float(tree, ancestor, float_box))
        {
            outermost = Some(ancestor);
        }
    }
    if let Some(block) = outermost {
        mark_siblings_with_floats_for_layout(tree, block, Some(float_box));
        mark_all_descendants_with_floats_for_layout(tree, block, Some(float_box), false);
        remove_floating_object(tree, block, float_box);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(top: i32, inline_start: Option<i32>, inline_end: Option<i32>) -> FloatBand {
        FloatBand {
            top: Au::from_px(top),
            inline_start: inline_start.map(Au::from_px),
            inline_end: inline_end.map(Au::from_px),
        }
    }

    #[test]
    fn test_sentinels_are_always_found() {
        let tree = FloatBandTree::with_sentinels();
        assert_eq!(tree.find(Au::zero()).map(|band| band.top), Some(MIN_AU));
        assert_eq!(tree.find_next(Au::zero()).map(|band| band.top), Some(MAX_AU));
    }

    #[test]
    fn test_insert_replaces_band_with_same_top() {
        let tree = FloatBandTree::with_sentinels()
            .insert(band(10, Some(5), None))
            .insert(band(10, Some(7), None));
        assert_eq!(tree.find(Au::from_px(12)), Some(band(10, Some(7), None)));
    }

    #[test]
    fn test_set_range_only_tightens() {
        let tree = FloatBandTree::with_sentinels()
            .insert(band(0, None, None))
            .insert(band(10, None, None))
            .set_range(&(Au::zero()..Au::from_px(10)), FloatSide::Left, Au::from_px(50))
            .set_range(&(Au::zero()..Au::from_px(10)), FloatSide::Left, Au::from_px(30));
        assert_eq!(tree.find(Au::from_px(5)), Some(band(0, Some(50), None)));
        assert_eq!(tree.find(Au::from_px(10)), Some(band(10, None, None)));
    }

    #[test]
    fn test_many_inserts_stay_ordered() {
        let mut tree = FloatBandTree::with_sentinels();
        for top in (0..200).rev() {
            tree = tree.insert(band(top * 3, None, None));
        }
        for top in 0..200 {
            let position = Au::from_px(top * 3 + 1);
            assert_eq!(tree.find(position).map(|band| band.top), Some(Au::from_px(top * 3)));
        }
    }
}
