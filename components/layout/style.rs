/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Resolved style records consumed by layout.
//!
//! The cascade is someone else's job: by the time a box reaches layout every property
//! here holds a computed value. Lengths that still depend on the containing block (auto
//! and percentages) are resolved during layout.

use app_units::Au;
use bitflags::bitflags;
use euclid::num::Zero;

use crate::geom::LogicalSides;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct WritingMode: u8 {
        /// `direction: rtl`.
        const RTL = 1 << 0;
        /// `writing-mode: vertical-*`.
        const VERTICAL = 1 << 1;
        /// `writing-mode: vertical-lr`, only meaningful together with `VERTICAL`.
        const VERTICAL_LR = 1 << 2;
    }
}

impl WritingMode {
    #[inline]
    pub fn is_horizontal(&self) -> bool {
        !self.contains(WritingMode::VERTICAL)
    }

    #[inline]
    pub fn is_bidi_ltr(&self) -> bool {
        !self.contains(WritingMode::RTL)
    }

    /// Whether two writing modes share a block flow direction. Direction (ltr/rtl) does
    /// not take part in this.
    #[inline]
    pub fn same_block_flow(&self, other: WritingMode) -> bool {
        let mask = WritingMode::VERTICAL | WritingMode::VERTICAL_LR;
        self.intersection(mask) == other.intersection(mask)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Length {
    #[default]
    Auto,
    Fixed(Au),
    /// A percentage in the `0.0..=1.0` range (`50%` is `0.5`).
    Percentage(f32),
}

impl Length {
    pub fn px(px: f32) -> Self {
        Length::Fixed(Au::from_f32_px(px))
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, Length::Auto)
    }

    pub fn is_percentage(&self) -> bool {
        matches!(self, Length::Percentage(_))
    }

    /// Resolves against `basis`. Percentages against an indefinite basis behave as auto.
    pub fn resolve(&self, basis: Option<Au>) -> Option<Au> {
        match *self {
            Length::Auto => None,
            Length::Fixed(length) => Some(length),
            Length::Percentage(percentage) => basis.map(|basis| basis.scale_by(percentage)),
        }
    }

    /// Resolves a margin or padding: auto becomes zero.
    pub fn resolve_or_zero(&self, basis: Au) -> Au {
        self.resolve(Some(basis)).unwrap_or_else(Au::zero)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Display {
    #[default]
    Block,
    Inline,
    InlineBlock,
    RunIn,
    FlowRoot,
    Table,
    TableCell,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Float {
    #[default]
    None,
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Clear {
    #[default]
    None,
    Left,
    Right,
    Both,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
    Scroll,
    Auto,
}

/// `-webkit-margin-before-collapse` and friends.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MarginCollapse {
    #[default]
    Collapse,
    Separate,
    Discard,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BreakValue {
    #[default]
    Auto,
    Always,
    Avoid,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum UnicodeBidi {
    #[default]
    Normal,
    Embed,
    BidiOverride,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TextAlign {
    #[default]
    Start,
    End,
    Center,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum WhiteSpace {
    #[default]
    Normal,
    Pre,
    PreWrap,
    PreLine,
    NoWrap,
}

impl WhiteSpace {
    pub fn preserves_newlines(&self) -> bool {
        matches!(self, WhiteSpace::Pre | WhiteSpace::PreWrap | WhiteSpace::PreLine)
    }

    pub fn allows_wrapping(&self) -> bool {
        !matches!(self, WhiteSpace::Pre | WhiteSpace::NoWrap)
    }
}

/// The computed style of one box.
#[derive(Clone, Debug)]
pub struct BoxStyle {
    pub display: Display,
    pub position: Position,
    pub float: Float,
    pub clear: Clear,
    pub writing_mode: WritingMode,
    pub unicode_bidi: UnicodeBidi,

    pub margin: LogicalSides<Length>,
    /// Whether the before margin comes from the user agent's quirky defaults.
    pub margin_before_quirk: bool,
    pub margin_after_quirk: bool,
    pub margin_before_collapse: MarginCollapse,
    pub margin_after_collapse: MarginCollapse,
    pub padding: LogicalSides<Length>,
    pub border: LogicalSides<Au>,

    pub inline_size: Length,
    pub min_inline_size: Length,
    /// `Auto` means `none`.
    pub max_inline_size: Length,
    pub block_size: Length,
    pub min_block_size: Length,
    /// `Auto` means `none`.
    pub max_block_size: Length,
    pub inset: LogicalSides<Length>,
    pub overflow: Overflow,

    pub column_count: Option<u32>,
    pub column_width: Option<Au>,
    /// `None` is `normal`, which resolves to one em.
    pub column_gap: Option<Au>,
    pub column_break_before: BreakValue,
    pub column_break_after: BreakValue,
    pub page_break_before: BreakValue,
    pub page_break_after: BreakValue,

    pub text_align: TextAlign,
    pub text_indent: Length,
    pub white_space: WhiteSpace,
    pub line_height: Au,
    pub font_size: Au,

    /// The box was generated by the document's `body` element. Body is a quirk container.
    pub is_body: bool,
}

impl Default for BoxStyle {
    fn default() -> Self {
        BoxStyle {
            display: Display::Block,
            position: Position::Static,
            float: Float::None,
            clear: Clear::None,
            writing_mode: WritingMode::empty(),
            unicode_bidi: UnicodeBidi::Normal,
            margin: LogicalSides::all(Length::Fixed(Au::zero())),
            margin_before_quirk: false,
            margin_after_quirk: false,
            margin_before_collapse: MarginCollapse::Collapse,
            margin_after_collapse: MarginCollapse::Collapse,
            padding: LogicalSides::all(Length::Fixed(Au::zero())),
            border: LogicalSides::all(Au::zero()),
            inline_size: Length::Auto,
            min_inline_size: Length::Fixed(Au::zero()),
            max_inline_size: Length::Auto,
            block_size: Length::Auto,
            min_block_size: Length::Fixed(Au::zero()),
            max_block_size: Length::Auto,
            inset: LogicalSides::all(Length::Auto),
            overflow: Overflow::Visible,
            column_count: None,
            column_width: None,
            column_gap: None,
            column_break_before: BreakValue::Auto,
            column_break_after: BreakValue::Auto,
            page_break_before: BreakValue::Auto,
            page_break_after: BreakValue::Auto,
            text_align: TextAlign::Start,
            text_indent: Length::Fixed(Au::zero()),
            white_space: WhiteSpace::Normal,
            line_height: Au::from_px(20),
            font_size: Au::from_px(16),
            is_body: false,
        }
    }
}

impl BoxStyle {
    pub fn block() -> Self {
        BoxStyle::default()
    }

    pub fn inline() -> Self {
        BoxStyle {
            display: Display::Inline,
            ..BoxStyle::default()
        }
    }

    /// A style for an anonymous block wrapping inline content of `parent`. Only inherited
    /// properties carry over.
    pub fn anonymous_block_of(parent: &BoxStyle) -> Self {
        BoxStyle {
            writing_mode: parent.writing_mode,
            text_align: parent.text_align,
            white_space: parent.white_space,
            line_height: parent.line_height,
            font_size: parent.font_size,
            ..BoxStyle::default()
        }
    }

    pub fn is_floating(&self) -> bool {
        self.float != Float::None
    }

    pub fn is_out_of_flow_positioned(&self) -> bool {
        matches!(self.position, Position::Absolute | Position::Fixed)
    }

    pub fn is_floating_or_out_of_flow_positioned(&self) -> bool {
        self.is_floating() || self.is_out_of_flow_positioned()
    }

    pub fn has_overflow_clip(&self) -> bool {
        self.overflow != Overflow::Visible
    }

    pub fn scrolls_overflow(&self) -> bool {
        matches!(self.overflow, Overflow::Scroll | Overflow::Auto)
    }

    pub fn specifies_columns(&self) -> bool {
        self.column_count.is_some() || self.column_width.is_some()
    }

    pub fn is_inline_level(&self) -> bool {
        matches!(self.display, Display::Inline | Display::InlineBlock)
    }

    pub fn is_left_to_right_direction(&self) -> bool {
        self.writing_mode.is_bidi_ltr()
    }

    /// Boxes that get a layer paint their own floats. Only out-of-flow and relatively
    /// positioned boxes get one here.
    pub fn has_self_painting_layer(&self) -> bool {
        self.position != Position::Static
    }

    pub fn resolved_column_gap(&self) -> Au {
        self.column_gap.unwrap_or(self.font_size)
    }
}
