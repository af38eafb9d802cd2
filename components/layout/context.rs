/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Data needed by a layout session.

use app_units::Au;
use euclid::num::Zero;

use crate::bidi::{BidiResolver, EmbeddingLevelResolver};
use crate::box_tree::BoxId;
use crate::geom::{LogicalVec2, PhysicalRect};
use crate::options::LayoutOptions;
use crate::text::TextMeasurer;

/// Pagination state of the block being laid out. One is pushed per block; nested blocks
/// inherit the page geometry of their ancestors.
#[derive(Clone, Debug, Default)]
pub(crate) struct LayoutState {
    /// Offset of the current block's border box from the root, in the root's logical
    /// coordinates.
    pub(crate) layout_offset: LogicalVec2<Au>,
    /// Block offset at which the first page (or column) starts.
    pub(crate) page_offset: Au,
    /// Zero while the page height is unknown (the first pass of column balancing).
    pub(crate) page_logical_height: Au,
    pub(crate) page_logical_height_changed: bool,
    pub(crate) is_paginated: bool,
    /// The multi-column block this state paginates into, if any.
    pub(crate) column_owner: Option<BoxId>,
}

impl LayoutState {
    fn initial(options: &LayoutOptions) -> Self {
        if options.paginated {
            LayoutState {
                page_logical_height: options.viewport_block_size(),
                is_paginated: true,
                ..LayoutState::default()
            }
        } else {
            LayoutState::default()
        }
    }
}

/// Everything layout needs besides the box tree.
pub struct LayoutContext<'a> {
    pub options: LayoutOptions,
    text_measurer: &'a dyn TextMeasurer,
    bidi_resolver: Box<dyn BidiResolver + 'a>,
    layout_state: Vec<LayoutState>,
    /// Areas that changed during layout, in root coordinates.
    repaint_rects: Vec<PhysicalRect<Au>>,
}

impl<'a> LayoutContext<'a> {
    pub fn new(options: LayoutOptions, text_measurer: &'a dyn TextMeasurer) -> Self {
        LayoutContext {
            options,
            text_measurer,
            bidi_resolver: Box::new(EmbeddingLevelResolver::default()),
            layout_state: Vec::new(),
            repaint_rects: Vec::new(),
        }
    }

    pub fn with_bidi_resolver(mut self, resolver: impl BidiResolver + 'a) -> Self {
        self.bidi_resolver = Box::new(resolver);
        self
    }

    pub fn text_measurer(&self) -> &'a dyn TextMeasurer {
        self.text_measurer
    }

    pub(crate) fn bidi_resolver_mut(&mut self) -> &mut dyn BidiResolver {
        &mut *self.bidi_resolver
    }

    /// Repaint rectangles collected since the last call.
    pub fn take_repaint_rects(&mut self) -> Vec<PhysicalRect<Au>> {
        std::mem::take(&mut self.repaint_rects)
    }

    pub(crate) fn add_repaint_rect(&mut self, rect: PhysicalRect<Au>) {
        if !rect.is_empty() {
            self.repaint_rects.push(rect);
        }
    }

    fn current_state(&self) -> LayoutState {
        self.layout_state
            .last()
            .cloned()
            .unwrap_or_else(|| LayoutState::initial(&self.options))
    }

    /// Offset of the block being laid out from the root.
    pub(crate) fn layout_offset(&self) -> LogicalVec2<Au> {
        self.layout_state
            .last()
            .map_or_else(LogicalVec2::zero, |state| state.layout_offset)
    }

    /// Enters a block whose border box is at `offset` from the current one. Blocks that
    /// start a new writing mode are never paginated.
    pub(crate) fn push_layout_state(&mut self, offset: LogicalVec2<Au>, isolate: bool) {
        let mut state = self.current_state();
        if !self.layout_state.is_empty() {
            state.layout_offset = state.layout_offset + offset;
        } else {
            state.layout_offset = offset;
        }
        if isolate {
            state.is_paginated = false;
            state.page_logical_height = Au::zero();
            state.column_owner = None;
        }
        self.layout_state.push(state);
    }

    /// Enters a multi-column block. `content_top` is the block offset of its content box
    /// from its border box.
    pub(crate) fn push_column_state(
        &mut self,
        owner: BoxId,
        offset: LogicalVec2<Au>,
        content_top: Au,
        column_height: Au,
        column_height_changed: bool,
    ) {
        self.push_layout_state(offset, false);
        if let Some(state) = self.layout_state.last_mut() {
            state.column_owner = Some(owner);
            state.is_paginated = true;
            state.page_offset = state.layout_offset.block + content_top;
            state.page_logical_height = column_height;
            state.page_logical_height_changed = column_height_changed;
        }
    }

    pub(crate) fn pop_layout_state(&mut self) {
        let popped = self.layout_state.pop();
        debug_assert!(popped.is_some(), "unbalanced layout state");
    }

    pub(crate) fn is_paginated(&self) -> bool {
        self.current_state().is_paginated
    }

    pub(crate) fn page_logical_height(&self) -> Au {
        self.current_state().page_logical_height
    }

    pub(crate) fn page_logical_height_changed(&self) -> bool {
        self.current_state().page_logical_height_changed
    }

    pub(crate) fn column_owner(&self) -> Option<BoxId> {
        self.current_state().column_owner
    }

    /// Distance from the top of the first page to `child_logical_offset` in the current
    /// block.
    pub(crate) fn page_logical_offset(&self, child_logical_offset: Au) -> Au {
        let state = self.current_state();
        state.layout_offset.block + child_logical_offset - state.page_offset
    }
}
