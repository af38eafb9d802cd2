/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Logical (writing-mode relative) geometry.
//!
//! Layout happens in logical coordinates: `inline` runs along a line, `block` runs in the
//! direction lines stack. The inline axis is not flipped for right-to-left content; the
//! logical left of a box is always the edge closest to the inline origin, as in the rest of
//! the block layout code. Conversion to physical coordinates only swaps axes for vertical
//! writing modes.

use std::ops::{Add, Neg, Sub};

use app_units::Au;
use euclid::default::{Point2D, Rect, Size2D};
use euclid::num::Zero;
use serde::Serialize;

use crate::style::WritingMode;

pub type PhysicalPoint<U> = Point2D<U>;
pub type PhysicalRect<U> = Rect<U>;

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize)]
pub struct LogicalVec2<T> {
    pub inline: T,
    pub block: T,
}

impl<T> LogicalVec2<T> {
    pub fn new(inline: T, block: T) -> Self {
        LogicalVec2 { inline, block }
    }

    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> LogicalVec2<U> {
        LogicalVec2 {
            inline: f(&self.inline),
            block: f(&self.block),
        }
    }
}

impl<T: Zero> LogicalVec2<T> {
    pub fn zero() -> Self {
        LogicalVec2 {
            inline: T::zero(),
            block: T::zero(),
        }
    }
}

impl<T: Add<Output = T>> Add for LogicalVec2<T> {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        LogicalVec2 {
            inline: self.inline + other.inline,
            block: self.block + other.block,
        }
    }
}

impl<T: Sub<Output = T>> Sub for LogicalVec2<T> {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        LogicalVec2 {
            inline: self.inline - other.inline,
            block: self.block - other.block,
        }
    }
}

impl<T: Neg<Output = T>> Neg for LogicalVec2<T> {
    type Output = Self;

    fn neg(self) -> Self {
        LogicalVec2 {
            inline: -self.inline,
            block: -self.block,
        }
    }
}

impl LogicalVec2<Au> {
    pub fn to_physical_point(self, writing_mode: WritingMode) -> PhysicalPoint<Au> {
        if writing_mode.is_horizontal() {
            Point2D::new(self.inline, self.block)
        } else {
            Point2D::new(self.block, self.inline)
        }
    }

    pub fn from_physical_point(point: PhysicalPoint<Au>, writing_mode: WritingMode) -> Self {
        if writing_mode.is_horizontal() {
            LogicalVec2::new(point.x, point.y)
        } else {
            LogicalVec2::new(point.y, point.x)
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct LogicalRect<T> {
    pub start_corner: LogicalVec2<T>,
    pub size: LogicalVec2<T>,
}

impl LogicalRect<Au> {
    pub fn new(inline: Au, block: Au, inline_size: Au, block_size: Au) -> Self {
        LogicalRect {
            start_corner: LogicalVec2::new(inline, block),
            size: LogicalVec2::new(inline_size, block_size),
        }
    }

    pub fn zero() -> Self {
        LogicalRect {
            start_corner: LogicalVec2::zero(),
            size: LogicalVec2::zero(),
        }
    }

    pub fn min_inline_position(&self) -> Au {
        self.start_corner.inline
    }

    pub fn min_block_position(&self) -> Au {
        self.start_corner.block
    }

    pub fn max_inline_position(&self) -> Au {
        self.start_corner.inline + self.size.inline
    }

    pub fn max_block_position(&self) -> Au {
        self.start_corner.block + self.size.block
    }

    pub fn is_empty(&self) -> bool {
        self.size.inline <= Au::zero() || self.size.block <= Au::zero()
    }

    pub fn translate(&self, offset: LogicalVec2<Au>) -> Self {
        LogicalRect {
            start_corner: self.start_corner + offset,
            size: self.size,
        }
    }

    /// The smallest rectangle containing both rectangles. Zero-sized rectangles still
    /// contribute their position, which is what overflow computation wants for empty
    /// children.
    pub fn union(&self, other: &Self) -> Self {
        let inline_start = self.min_inline_position().min(other.min_inline_position());
        let block_start = self.min_block_position().min(other.min_block_position());
        let inline_end = self.max_inline_position().max(other.max_inline_position());
        let block_end = self.max_block_position().max(other.max_block_position());
        LogicalRect::new(
            inline_start,
            block_start,
            inline_end - inline_start,
            block_end - block_start,
        )
    }

    pub fn to_physical(&self, writing_mode: WritingMode) -> PhysicalRect<Au> {
        let origin = self.start_corner.to_physical_point(writing_mode);
        let size = if writing_mode.is_horizontal() {
            Size2D::new(self.size.inline, self.size.block)
        } else {
            Size2D::new(self.size.block, self.size.inline)
        };
        Rect::new(origin, size)
    }

    pub fn from_physical(rect: PhysicalRect<Au>, writing_mode: WritingMode) -> Self {
        if writing_mode.is_horizontal() {
            LogicalRect::new(
                rect.origin.x,
                rect.origin.y,
                rect.size.width,
                rect.size.height,
            )
        } else {
            LogicalRect::new(
                rect.origin.y,
                rect.origin.x,
                rect.size.height,
                rect.size.width,
            )
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct LogicalSides<T> {
    pub inline_start: T,
    pub inline_end: T,
    pub block_start: T,
    pub block_end: T,
}

impl<T> LogicalSides<T> {
    pub fn new(block_start: T, inline_end: T, block_end: T, inline_start: T) -> Self {
        LogicalSides {
            inline_start,
            inline_end,
            block_start,
            block_end,
        }
    }

    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> LogicalSides<U> {
        LogicalSides {
            inline_start: f(&self.inline_start),
            inline_end: f(&self.inline_end),
            block_start: f(&self.block_start),
            block_end: f(&self.block_end),
        }
    }
}

impl<T: Copy> LogicalSides<T> {
    pub fn all(value: T) -> Self {
        LogicalSides::new(value, value, value, value)
    }
}

impl<T: Copy + Add<Output = T>> LogicalSides<T> {
    pub fn inline_sum(&self) -> T {
        self.inline_start + self.inline_end
    }

    pub fn block_sum(&self) -> T {
        self.block_start + self.block_end
    }

    pub fn start_offset(&self) -> LogicalVec2<T> {
        LogicalVec2::new(self.inline_start, self.block_start)
    }
}

impl<T: Copy + Add<Output = T>> Add for LogicalSides<T> {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        LogicalSides {
            inline_start: self.inline_start + other.inline_start,
            inline_end: self.inline_end + other.inline_end,
            block_start: self.block_start + other.block_start,
            block_end: self.block_end + other.block_end,
        }
    }
}

/// Adds two lengths without overflowing past the `Au` range.
pub(crate) fn saturating_add(a: Au, b: Au) -> Au {
    Au(a.0.saturating_add(b.0))
}

/// Ceiling division of a length by a positive count.
pub(crate) fn div_ceil(length: Au, count: i32) -> Au {
    debug_assert!(count > 0);
    let count = count.max(1) as i64;
    let length = length.0.max(0) as i64;
    Au(((length + count - 1) / count) as i32)
}
