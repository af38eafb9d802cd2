/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The box node store.
//!
//! Every box lives in one generational arena owned by the [`BoxTree`]. Parents own the
//! list of their children; relations that do not imply ownership (a positioned box and its
//! containing block, a float and the line it originated on) are stored as ids so that a
//! stale relation simply fails to resolve.
//!
//! A block container keeps its in-flow children either all inline-level or all
//! block-level. Appending a child that breaks this creates anonymous wrapper blocks, which
//! the container then owns like any other child.

use std::sync::Arc;

use app_units::Au;
use bitflags::bitflags;
use euclid::num::Zero;
use log::warn;

use crate::arena::{Arena, Handle};
use crate::columns::ColumnInfo;
use crate::float::FloatingObjects;
use crate::geom::{LogicalRect, LogicalSides, LogicalVec2};
use crate::inline::LineBoxList;
use crate::intrinsic::IntrinsicSizes;
use crate::margins::MarginValues;
use crate::style::{BoxStyle, Display, Position};

pub type BoxId = Handle<LayoutBox>;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct LayoutFlags: u16 {
        const SELF_NEEDS_LAYOUT = 1 << 0;
        const NORMAL_CHILD_NEEDS_LAYOUT = 1 << 1;
        const POSITIONED_CHILD_NEEDS_LAYOUT = 1 << 2;
        const EVER_HAD_LAYOUT = 1 << 3;
        const PREFERRED_WIDTHS_DIRTY = 1 << 4;
        /// The box was created by layout to wrap inline content.
        const ANONYMOUS = 1 << 5;
        /// The used before margin is a quirky user-agent margin.
        const MARGIN_BEFORE_QUIRK = 1 << 6;
        const MARGIN_AFTER_QUIRK = 1 << 7;
    }
}

impl LayoutFlags {
    pub fn needs_layout(&self) -> bool {
        self.intersects(
            LayoutFlags::SELF_NEEDS_LAYOUT |
                LayoutFlags::NORMAL_CHILD_NEEDS_LAYOUT |
                LayoutFlags::POSITIONED_CHILD_NEEDS_LAYOUT,
        )
    }
}

/// What a box is, beyond its style.
#[derive(Debug)]
pub enum BoxKind {
    /// A block container: block boxes, inline blocks, floats, positioned boxes.
    Block(Box<BlockFlow>),
    /// An inline wrapper (a `span`). Its content is laid out by the enclosing block.
    Inline,
    Text(String),
    /// Replaced content with an intrinsic size.
    Replaced { intrinsic_size: LogicalVec2<Au> },
    /// A forced line break (`br`).
    LineBreak,
}

/// Layout state of a block container. Everything optional here is populated lazily: most
/// blocks never have floats, columns or positioned descendants.
#[derive(Debug)]
pub struct BlockFlow {
    pub(crate) children_inline: bool,
    pub(crate) floats: Option<Box<FloatingObjects>>,
    /// Positioned boxes for which this block is the containing block.
    pub(crate) positioned_objects: Option<Vec<BoxId>>,
    pub(crate) column_info: Option<Box<ColumnInfo>>,
    pub(crate) lines: LineBoxList,
    /// Margin extrema, only stored when they differ from the box's own margins.
    pub(crate) margin_values: Option<MarginValues>,
    /// Descendants whose percentage block size resolved against this block.
    pub(crate) percent_height_descendants: Option<Vec<BoxId>>,
    pub(crate) pagination_strut: Au,
    /// Distance from the top of the first page at the last layout, to detect moves across
    /// page boundaries.
    pub(crate) page_logical_offset: Au,
    /// Layout overflow, only stored when it extends past the border box.
    pub(crate) overflow: Option<LogicalRect<Au>>,
}

impl BlockFlow {
    fn new() -> Self {
        BlockFlow {
            children_inline: true,
            floats: None,
            positioned_objects: None,
            column_info: None,
            lines: LineBoxList::default(),
            margin_values: None,
            percent_height_descendants: None,
            pagination_strut: Au::zero(),
            page_logical_offset: Au::zero(),
            overflow: None,
        }
    }

    pub(crate) fn contains_floats(&self) -> bool {
        self.floats.as_ref().is_some_and(|floats| !floats.is_empty())
    }

    pub(crate) fn has_columns(&self) -> bool {
        self.column_info.is_some()
    }

    pub fn lines(&self) -> &LineBoxList {
        &self.lines
    }

    pub fn floats(&self) -> Option<&FloatingObjects> {
        self.floats.as_deref()
    }

    pub fn column_info(&self) -> Option<&ColumnInfo> {
        self.column_info.as_deref()
    }

    /// Layout overflow in border-box coordinates, when it exceeds the border box.
    pub fn overflow(&self) -> Option<LogicalRect<Au>> {
        self.overflow
    }
}

#[derive(Debug)]
pub struct LayoutBox {
    pub(crate) style: Arc<BoxStyle>,
    pub(crate) kind: BoxKind,
    pub(crate) parent: Option<BoxId>,
    pub(crate) children: Vec<BoxId>,
    pub(crate) flags: LayoutFlags,
    /// Border box. The position is relative to the border box of the containing block, in
    /// the containing block's logical coordinates. The size is in the box's own writing
    /// mode.
    pub(crate) frame: LogicalRect<Au>,
    /// Used margins, borders and padding.
    pub(crate) margin: LogicalSides<Au>,
    pub(crate) border: LogicalSides<Au>,
    pub(crate) padding: LogicalSides<Au>,
    pub(crate) intrinsic: Option<IntrinsicSizes>,
    /// Static position of an out-of-flow box, relative to the border box of the block that
    /// laid out its in-flow siblings.
    pub(crate) static_position: LogicalVec2<Au>,
    /// The block this positioned box is registered with.
    pub(crate) registered_containing_block: Option<BoxId>,
}

impl LayoutBox {
    fn new(style: BoxStyle, kind: BoxKind) -> Self {
        LayoutBox {
            style: Arc::new(style),
            kind,
            parent: None,
            children: Vec::new(),
            flags: LayoutFlags::SELF_NEEDS_LAYOUT | LayoutFlags::PREFERRED_WIDTHS_DIRTY,
            frame: LogicalRect::zero(),
            margin: LogicalSides::all(Au::zero()),
            border: LogicalSides::all(Au::zero()),
            padding: LogicalSides::all(Au::zero()),
            intrinsic: None,
            static_position: LogicalVec2::zero(),
            registered_containing_block: None,
        }
    }

    pub fn style(&self) -> &BoxStyle {
        &self.style
    }

    pub fn kind(&self) -> &BoxKind {
        &self.kind
    }

    pub fn frame(&self) -> LogicalRect<Au> {
        self.frame
    }

    pub fn margin(&self) -> LogicalSides<Au> {
        self.margin
    }

    pub fn flags(&self) -> LayoutFlags {
        self.flags
    }

    pub fn block(&self) -> Option<&BlockFlow> {
        match self.kind {
            BoxKind::Block(ref block) => Some(block),
            _ => None,
        }
    }

    pub(crate) fn block_mut(&mut self) -> Option<&mut BlockFlow> {
        match self.kind {
            BoxKind::Block(ref mut block) => Some(block),
            _ => None,
        }
    }

    pub fn is_block_container(&self) -> bool {
        matches!(self.kind, BoxKind::Block(_))
    }

    pub fn is_replaced(&self) -> bool {
        matches!(self.kind, BoxKind::Replaced { .. })
    }

    pub fn is_anonymous(&self) -> bool {
        self.flags.contains(LayoutFlags::ANONYMOUS)
    }

    pub fn is_floating(&self) -> bool {
        self.style.is_floating() && !self.style.is_out_of_flow_positioned()
    }

    pub fn is_out_of_flow_positioned(&self) -> bool {
        self.style.is_out_of_flow_positioned()
    }

    pub fn is_floating_or_out_of_flow_positioned(&self) -> bool {
        self.style.is_floating_or_out_of_flow_positioned()
    }

    /// Whether this box takes part in an inline formatting context when in flow.
    pub fn is_inline_level(&self) -> bool {
        match self.kind {
            BoxKind::Text(_) | BoxKind::Inline | BoxKind::LineBreak => true,
            BoxKind::Replaced { .. } | BoxKind::Block(_) => self.style.is_inline_level(),
        }
    }

    /// Atomic inline-level boxes are laid out as a unit and never split across lines.
    pub fn is_atomic_inline(&self) -> bool {
        match self.kind {
            BoxKind::Replaced { .. } | BoxKind::Block(_) => self.style.is_inline_level(),
            _ => false,
        }
    }

    pub fn needs_layout(&self) -> bool {
        self.flags.needs_layout()
    }

    pub(crate) fn border_padding(&self) -> LogicalSides<Au> {
        self.border + self.padding
    }

    pub(crate) fn content_inline_size(&self) -> Au {
        (self.frame.size.inline - self.border_padding().inline_sum()).max(Au::zero())
    }

    /// Logical left of the content box, relative to the border box.
    pub(crate) fn content_inline_start(&self) -> Au {
        self.border.inline_start + self.padding.inline_start
    }

    pub(crate) fn content_block_start(&self) -> Au {
        self.border.block_start + self.padding.block_start
    }

}

/// Owner of every box in a document.
#[derive(Debug, Default)]
pub struct BoxTree {
    pub(crate) boxes: Arena<LayoutBox>,
    root: Option<BoxId>,
}

impl std::ops::Index<BoxId> for BoxTree {
    type Output = LayoutBox;

    fn index(&self, id: BoxId) -> &LayoutBox {
        &self.boxes[id]
    }
}

impl std::ops::IndexMut<BoxId> for BoxTree {
    fn index_mut(&mut self, id: BoxId) -> &mut LayoutBox {
        &mut self.boxes[id]
    }
}

impl BoxTree {
    pub fn new() -> Self {
        BoxTree::default()
    }

    pub fn root(&self) -> Option<BoxId> {
        self.root
    }

    pub fn set_root(&mut self, root: BoxId) {
        debug_assert!(self.boxes[root].parent.is_none());
        self.root = Some(root);
        self.mark_needs_layout(root);
    }

    pub fn get(&self, id: BoxId) -> Option<&LayoutBox> {
        self.boxes.get(id)
    }

    pub fn contains(&self, id: BoxId) -> bool {
        self.boxes.contains(id)
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn new_block(&mut self, style: BoxStyle) -> BoxId {
        self.boxes
            .insert(LayoutBox::new(style, BoxKind::Block(Box::new(BlockFlow::new()))))
    }

    pub fn new_inline(&mut self, style: BoxStyle) -> BoxId {
        self.boxes.insert(LayoutBox::new(style, BoxKind::Inline))
    }

    pub fn new_text(&mut self, text: impl Into<String>, style: BoxStyle) -> BoxId {
        self.boxes
            .insert(LayoutBox::new(style, BoxKind::Text(text.into())))
    }

    pub fn new_replaced(&mut self, style: BoxStyle, intrinsic_size: LogicalVec2<Au>) -> BoxId {
        self.boxes
            .insert(LayoutBox::new(style, BoxKind::Replaced { intrinsic_size }))
    }

    pub fn new_line_break(&mut self, style: BoxStyle) -> BoxId {
        self.boxes.insert(LayoutBox::new(style, BoxKind::LineBreak))
    }

    pub fn parent(&self, id: BoxId) -> Option<BoxId> {
        self.boxes.get(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: BoxId) -> &[BoxId] {
        self.boxes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn style(&self, id: BoxId) -> Option<&BoxStyle> {
        self.boxes.get(id).map(|node| &*node.style)
    }

    pub fn frame(&self, id: BoxId) -> Option<LogicalRect<Au>> {
        self.boxes.get(id).map(|node| node.frame)
    }

    pub fn children_inline(&self, id: BoxId) -> bool {
        self.boxes
            .get(id)
            .and_then(LayoutBox::block)
            .is_some_and(|block| block.children_inline)
    }

    pub fn needs_layout(&self, id: BoxId) -> bool {
        self.boxes.get(id).is_some_and(LayoutBox::needs_layout)
    }

    pub(crate) fn block(&self, id: BoxId) -> &BlockFlow {
        match self.boxes[id].block() {
            Some(block) => block,
            None => panic!("{id:?} is not a block container"),
        }
    }

    pub(crate) fn block_mut(&mut self, id: BoxId) -> &mut BlockFlow {
        match self.boxes[id].block_mut() {
            Some(block) => block,
            None => panic!("{id:?} is not a block container"),
        }
    }

    pub(crate) fn is_block(&self, id: BoxId) -> bool {
        self.boxes.get(id).is_some_and(LayoutBox::is_block_container)
    }

    pub fn previous_sibling(&self, id: BoxId) -> Option<BoxId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|sibling| *sibling == id)?;
        index.checked_sub(1).map(|index| siblings[index])
    }

    pub fn next_sibling(&self, id: BoxId) -> Option<BoxId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|sibling| *sibling == id)?;
        siblings.get(index + 1).copied()
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: BoxId) -> impl Iterator<Item = BoxId> + '_ {
        std::iter::successors(self.parent(id), move |ancestor| self.parent(*ancestor))
    }

    pub fn is_descendant_of(&self, id: BoxId, ancestor: BoxId) -> bool {
        self.ancestors(id).any(|candidate| candidate == ancestor)
    }

    /// The nearest block container ancestor. Inline wrappers are skipped.
    pub fn containing_block(&self, id: BoxId) -> Option<BoxId> {
        let node = self.boxes.get(id)?;
        match node.style.position {
            Position::Absolute => self
                .ancestors(id)
                .find(|ancestor| {
                    let ancestor = &self.boxes[*ancestor];
                    ancestor.is_block_container() && ancestor.style.position != Position::Static
                })
                .or(self.root),
            Position::Fixed => self.root,
            Position::Static | Position::Relative => self
                .ancestors(id)
                .find(|ancestor| self.boxes[*ancestor].is_block_container()),
        }
    }

    pub fn is_root(&self, id: BoxId) -> bool {
        self.root == Some(id)
    }

    /// Appends `child` to `parent`, wrapping inline content in anonymous blocks where needed.
    pub fn append_child(&mut self, parent: BoxId, child: BoxId) {
        debug_assert!(self.boxes[child].parent.is_none());

        if !self.boxes[parent].is_block_container() {
            if !self.boxes[child].is_inline_level() &&
                !self.boxes[child].is_floating_or_out_of_flow_positioned()
            {
                warn!("Block-level {child:?} inside inline {parent:?} is laid out as an atomic inline");
            }
            self.attach(parent, child);
            return;
        }

        if self.boxes[child].is_floating_or_out_of_flow_positioned() {
            self.attach(parent, child);
            return;
        }

        let child_is_inline = self.boxes[child].is_inline_level();
        if !self.has_in_flow_children(parent) {
            self.block_mut(parent).children_inline = child_is_inline;
            self.attach(parent, child);
            return;
        }

        match (self.block(parent).children_inline, child_is_inline) {
            (true, true) | (false, false) => self.attach(parent, child),
            (false, true) => {
                let wrapper = match self.children(parent).last() {
                    Some(&last) if self.is_anonymous_inline_wrapper(last) => last,
                    _ => {
                        let wrapper = self.new_anonymous_block(parent);
                        self.attach(parent, wrapper);
                        wrapper
                    },
                };
                self.attach(wrapper, child);
            },
            (true, false) => {
                self.make_children_non_inline(parent);
                self.attach(parent, child);
            },
        }
    }

    /// Inserts `child` as the first child of `parent`. Only used for inline content.
    pub(crate) fn prepend_child(&mut self, parent: BoxId, child: BoxId) {
        debug_assert!(self.boxes[child].parent.is_none());
        self.boxes[child].parent = Some(parent);
        self.boxes[parent].children.insert(0, child);
        self.mark_needs_layout(child);
        self.mark_preferred_widths_dirty(parent);
    }

    /// Detaches `child` from its parent, unregistering it from any float list or positioned
    /// list first. The subtree stays alive and may be appended elsewhere.
    pub fn remove_child(&mut self, child: BoxId) {
        let Some(parent) = self.parent(child) else {
            return;
        };

        if self.boxes[child].is_floating() {
            crate::float::remove_floating_box_from_block_ancestors(self, child);
        }
        if let Some(containing_block) = self.boxes[child].registered_containing_block.take() {
            let list = self
                .boxes
                .get_mut(containing_block)
                .and_then(LayoutBox::block_mut)
                .and_then(|block| block.positioned_objects.as_mut());
            if let Some(list) = list {
                list.retain(|positioned| *positioned != child);
            }
        }

        self.mark_needs_layout(parent);
        self.mark_preferred_widths_dirty(parent);
        self.boxes[parent].children.retain(|sibling| *sibling != child);
        self.boxes[child].parent = None;
    }

    /// Frees `id` and its whole subtree.
    pub fn destroy_subtree(&mut self, id: BoxId) {
        self.remove_child(id);
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.boxes.remove(next) {
                stack.extend(node.children);
            }
        }
        if self.root == Some(id) {
            self.root = None;
        }
    }

    pub fn set_style(&mut self, id: BoxId, style: BoxStyle) {
        if !self.boxes.contains(id) {
            return;
        }
        self.boxes[id].style = Arc::new(style);
        self.mark_needs_layout(id);
        self.mark_preferred_widths_dirty(id);
    }

    pub fn set_text(&mut self, id: BoxId, new_text: impl Into<String>) {
        if let Some(BoxKind::Text(text)) = self.boxes.get_mut(id).map(|node| &mut node.kind) {
            *text = new_text.into();
            self.mark_needs_layout(id);
            self.mark_preferred_widths_dirty(id);
        }
    }

    /// Marks `id` for layout and flags the chain of containing blocks.
    pub fn mark_needs_layout(&mut self, id: BoxId) {
        if !self.boxes.contains(id) {
            return;
        }
        self.boxes[id].flags.insert(LayoutFlags::SELF_NEEDS_LAYOUT);
        self.mark_containing_block_chain(id);
    }

    pub(crate) fn mark_containing_block_chain(&mut self, id: BoxId) {
        let mut flag = if self.boxes[id].is_out_of_flow_positioned() {
            LayoutFlags::POSITIONED_CHILD_NEEDS_LAYOUT
        } else {
            LayoutFlags::NORMAL_CHILD_NEEDS_LAYOUT
        };
        let mut current = id;
        while let Some(container) = self.containing_block(current) {
            let container_flags = &mut self.boxes[container].flags;
            if container_flags.contains(flag) {
                break;
            }
            container_flags.insert(flag);
            flag = if self.boxes[container].is_out_of_flow_positioned() {
                LayoutFlags::POSITIONED_CHILD_NEEDS_LAYOUT
            } else {
                LayoutFlags::NORMAL_CHILD_NEEDS_LAYOUT
            };
            current = container;
        }
    }

    pub(crate) fn mark_preferred_widths_dirty(&mut self, id: BoxId) {
        let mut current = Some(id);
        while let Some(node) = current {
            let flags = &mut self.boxes[node].flags;
            if flags.contains(LayoutFlags::PREFERRED_WIDTHS_DIRTY) && node != id {
                break;
            }
            flags.insert(LayoutFlags::PREFERRED_WIDTHS_DIRTY);
            current = self.boxes[node].parent;
        }
    }

    fn attach(&mut self, parent: BoxId, child: BoxId) {
        self.boxes[child].parent = Some(parent);
        self.boxes[parent].children.push(child);
        self.mark_needs_layout(child);
        self.mark_preferred_widths_dirty(parent);
    }

    fn has_in_flow_children(&self, parent: BoxId) -> bool {
        self.children(parent)
            .iter()
            .any(|child| !self.boxes[*child].is_floating_or_out_of_flow_positioned())
    }

    fn is_anonymous_inline_wrapper(&self, id: BoxId) -> bool {
        let node = &self.boxes[id];
        node.is_anonymous() && node.block().is_some_and(|block| block.children_inline)
    }

    fn new_anonymous_block(&mut self, parent: BoxId) -> BoxId {
        let style = BoxStyle::anonymous_block_of(&self.boxes[parent].style);
        let wrapper = self.new_block(style);
        self.boxes[wrapper].flags.insert(LayoutFlags::ANONYMOUS);
        wrapper
    }

    /// Moves every child of `parent` into one anonymous block, so that a block-level child
    /// can follow.
    fn make_children_non_inline(&mut self, parent: BoxId) {
        let wrapper = self.new_anonymous_block(parent);
        let children = std::mem::take(&mut self.boxes[parent].children);
        for child in children {
            self.boxes[child].parent = None;
            self.attach(wrapper, child);
        }
        self.block_mut(wrapper).children_inline = true;
        self.block_mut(parent).children_inline = false;
        self.attach(parent, wrapper);
    }

    /// Turns a run-in block into an inline wrapper at the start of `target`. The run-in
    /// box is destroyed; its children move into the new inline.
    pub(crate) fn merge_run_in(&mut self, run_in: BoxId, target: BoxId) -> BoxId {
        let style = BoxStyle {
            display: Display::Inline,
            ..(*self.boxes[run_in].style).clone()
        };
        let inline = self.new_inline(style);
        let children = std::mem::take(&mut self.boxes[run_in].children);
        for child in children {
            self.boxes[child].parent = Some(inline);
            self.boxes[inline].children.push(child);
        }
        self.remove_child(run_in);
        self.boxes.remove(run_in);
        self.prepend_child(target, inline);
        inline
    }

    /// A box whose block flow direction differs from its containing block's starts a new
    /// writing mode root: nothing inside it interacts with floats or margins outside.
    pub(crate) fn is_writing_mode_root(&self, id: BoxId) -> bool {
        let Some(container) = self.containing_block(id) else {
            return false;
        };
        !self.boxes[id]
            .style
            .writing_mode
            .same_block_flow(self.boxes[container].style.writing_mode)
    }

    /// The border box size of `id` in the writing mode of its containing block.
    pub(crate) fn size_in_containing_block(&self, id: BoxId) -> LogicalVec2<Au> {
        let size = self.boxes[id].frame.size;
        let perpendicular = self.containing_block(id).is_some_and(|container| {
            self.boxes[container].style.writing_mode.is_horizontal() !=
                self.boxes[id].style.writing_mode.is_horizontal()
        });
        if perpendicular {
            LogicalVec2::new(size.block, size.inline)
        } else {
            size
        }
    }

    /// Whether `id` establishes a new block formatting context, so that its border box is
    /// never overlapped by floats.
    pub(crate) fn avoids_floats(&self, id: BoxId) -> bool {
        let node = &self.boxes[id];
        let style = &node.style;
        node.is_replaced() ||
            node.is_atomic_inline() ||
            style.has_overflow_clip() ||
            style.specifies_columns() ||
            matches!(
                style.display,
                Display::FlowRoot | Display::Table | Display::TableCell
            ) ||
            self.is_writing_mode_root(id)
    }

    /// Blocks with an auto inline size that avoid floats shrink to fit beside them.
    /// Replaced boxes keep their intrinsic inline size instead.
    pub(crate) fn shrinks_to_avoid_floats(&self, id: BoxId) -> bool {
        let node = &self.boxes[id];
        !node.is_inline_level() &&
            !node.is_floating() &&
            !node.is_replaced() &&
            node.style.inline_size.is_auto() &&
            self.avoids_floats(id)
    }

    /// Whether floats overhanging this block's content grow its auto block size.
    pub(crate) fn expands_to_enclose_overhanging_floats(&self, id: BoxId) -> bool {
        let node = &self.boxes[id];
        node.is_atomic_inline() ||
            node.is_floating_or_out_of_flow_positioned() ||
            node.style.has_overflow_clip() ||
            node.block().is_some_and(BlockFlow::has_columns) ||
            node.style.display == Display::TableCell ||
            self.is_writing_mode_root(id) ||
            self.is_root(id)
    }

    /// Registers a descendant whose percentage block size resolved against `block`.
    pub(crate) fn add_percent_height_descendant(&mut self, block: BoxId, descendant: BoxId) {
        let list = self
            .block_mut(block)
            .percent_height_descendants
            .get_or_insert_with(Vec::new);
        if !list.contains(&descendant) {
            list.push(descendant);
        }
    }

    /// Registers a positioned box with its containing block.
    pub(crate) fn insert_positioned_object(&mut self, containing_block: BoxId, positioned: BoxId) {
        self.boxes[positioned].registered_containing_block = Some(containing_block);
        let list = self
            .block_mut(containing_block)
            .positioned_objects
            .get_or_insert_with(Vec::new);
        if !list.contains(&positioned) {
            list.push(positioned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_after_block_gets_anonymous_wrapper() {
        let mut tree = BoxTree::new();
        let root = tree.new_block(BoxStyle::block());
        tree.set_root(root);
        let block = tree.new_block(BoxStyle::block());
        let text = tree.new_text("hello", BoxStyle::inline());
        tree.append_child(root, block);
        tree.append_child(root, text);

        assert!(!tree.children_inline(root));
        let wrapper = tree.children(root)[1];
        assert!(tree[wrapper].is_anonymous());
        assert!(tree.children_inline(wrapper));
        assert_eq!(tree.children(wrapper), &[text]);

        // Further inline content joins the same wrapper.
        let more = tree.new_text("world", BoxStyle::inline());
        tree.append_child(root, more);
        assert_eq!(tree.children(wrapper), &[text, more]);
    }

    #[test]
    fn test_block_after_inline_wraps_existing_children() {
        let mut tree = BoxTree::new();
        let root = tree.new_block(BoxStyle::block());
        tree.set_root(root);
        let text = tree.new_text("hello", BoxStyle::inline());
        let block = tree.new_block(BoxStyle::block());
        tree.append_child(root, text);
        assert!(tree.children_inline(root));
        tree.append_child(root, block);

        assert!(!tree.children_inline(root));
        let wrapper = tree.children(root)[0];
        assert_eq!(tree.children(wrapper), &[text]);
        assert_eq!(tree.children(root)[1], block);
    }

    #[test]
    fn test_removed_box_is_detached_and_marks_parent() {
        let mut tree = BoxTree::new();
        let root = tree.new_block(BoxStyle::block());
        tree.set_root(root);
        let child = tree.new_block(BoxStyle::block());
        tree.append_child(root, child);
        tree[root].flags = LayoutFlags::empty();

        tree.remove_child(child);
        assert!(tree.children(root).is_empty());
        assert_eq!(tree.parent(child), None);
        assert!(tree.needs_layout(root));
    }

    #[test]
    fn test_destroyed_ids_do_not_resolve() {
        let mut tree = BoxTree::new();
        let root = tree.new_block(BoxStyle::block());
        let child = tree.new_text("x", BoxStyle::inline());
        tree.append_child(root, child);
        tree.destroy_subtree(root);
        assert!(tree.get(root).is_none());
        assert!(tree.get(child).is_none());
        assert!(tree.is_empty());
    }
}
