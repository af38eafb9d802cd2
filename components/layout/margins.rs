/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Margin collapsing.
//!
//! See CSS 2.1 § 8.3.1: <https://www.w3.org/TR/CSS2/box.html#collapsing-margins>
//!
//! A set of adjoining margins is tracked as the largest positive and the most negative
//! member ([`CollapsedMargin`]). A block carries its own before/after extrema across
//! layouts ([`MarginValues`]) so that a parent can collapse through it, while the running
//! state of one pass over a block's children lives in a [`MarginInfo`].

use app_units::Au;
use euclid::num::Zero;

use crate::style::{BoxStyle, MarginCollapse};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CollapsedMargin {
    max_positive: Au,
    min_negative: Au,
}

impl CollapsedMargin {
    pub fn zero() -> Self {
        Self {
            max_positive: Au::zero(),
            min_negative: Au::zero(),
        }
    }

    pub fn new(margin: Au) -> Self {
        Self {
            max_positive: margin.max(Au::zero()),
            min_negative: margin.min(Au::zero()),
        }
    }

    pub fn from_extrema(max_positive: Au, min_negative: Au) -> Self {
        debug_assert!(max_positive >= Au::zero() && min_negative <= Au::zero());
        Self {
            max_positive,
            min_negative,
        }
    }

    pub fn max_positive(&self) -> Au {
        self.max_positive
    }

    pub fn min_negative(&self) -> Au {
        self.min_negative
    }

    pub fn adjoin(&self, other: &Self) -> Self {
        Self {
            max_positive: self.max_positive.max(other.max_positive),
            min_negative: self.min_negative.min(other.min_negative),
        }
    }

    pub fn adjoin_assign(&mut self, other: &Self) {
        *self = self.adjoin(other);
    }

    pub fn solve(&self) -> Au {
        self.max_positive + self.min_negative
    }

    pub fn is_zero(&self) -> bool {
        self.max_positive == Au::zero() && self.min_negative == Au::zero()
    }
}

/// Before/after margin extrema of a block, including everything that collapsed through
/// it from its children.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MarginValues {
    pub before: CollapsedMargin,
    pub after: CollapsedMargin,
}

impl MarginValues {
    /// The extrema of a box whose margins did not collapse with anything.
    pub fn from_margins(before: Au, after: Au) -> Self {
        MarginValues {
            before: CollapsedMargin::new(before),
            after: CollapsedMargin::new(after),
        }
    }

    /// A self-collapsing box acts as one margin: both sides adjoin.
    pub fn collapsed_through(&self) -> CollapsedMargin {
        self.before.adjoin(&self.after)
    }
}

/// Properties of a block that decide whether its children's margins may collapse with
/// its own.
#[derive(Clone, Copy, Debug)]
pub(crate) struct MarginContainer {
    /// Not the root, not floating or positioned, not a table cell, no overflow clip, not an
    /// inline block, not a writing-mode root and without columns.
    pub can_collapse_with_children: bool,
    pub before_border_padding: Au,
    pub after_border_padding: Au,
    pub has_auto_block_size: bool,
    pub is_quirk_container: bool,
    pub margin_before_collapse: MarginCollapse,
    pub margin_after_collapse: MarginCollapse,
}

impl MarginContainer {
    pub fn is_quirk_container(style: &BoxStyle, is_table_cell: bool) -> bool {
        is_table_cell ||
            style.is_body ||
            style.margin_before_collapse == MarginCollapse::Discard ||
            style.margin_after_collapse == MarginCollapse::Discard
    }
}

/// The margin of one child, as seen by the margin collapsing state machine.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ChildMargins {
    pub values: MarginValues,
    pub self_collapsing: bool,
    pub before_quirk: bool,
    pub after_quirk: bool,
    pub margin_before_collapse: MarginCollapse,
    pub margin_after_collapse: MarginCollapse,
    /// Used before margin, for `separate` collapsing.
    pub margin_before: Au,
}

/// Outcome of collapsing a child's before margin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct CollapseResult {
    /// The border-box top of the child.
    pub logical_top: Au,
    /// The content height of the parent after taking the collapsed margin into account.
    pub parent_height: Au,
}

/// Running margin state of one pass over a block's children.
#[derive(Debug)]
pub(crate) struct MarginInfo {
    can_collapse_margin_before_with_children: bool,
    can_collapse_margin_after_with_children: bool,
    quirk_container: bool,
    quirks_mode: bool,

    at_before_side_of_block: bool,
    at_after_side_of_block: bool,

    margin: CollapsedMargin,
    margin_before_quirk: bool,
    margin_after_quirk: bool,
    determined_margin_before_quirk: bool,
}

impl MarginInfo {
    /// Starts a pass. `own_before` holds the parent's current before extrema, which the
    /// first child collapses with when allowed.
    pub fn new(container: &MarginContainer, own_before: CollapsedMargin, quirks_mode: bool) -> Self {
        let can_collapse_margin_before_with_children = container.can_collapse_with_children &&
            container.before_border_padding == Au::zero() &&
            container.margin_before_collapse != MarginCollapse::Separate;
        let can_collapse_margin_after_with_children = container.can_collapse_with_children &&
            container.after_border_padding == Au::zero() &&
            container.has_auto_block_size &&
            container.margin_after_collapse != MarginCollapse::Separate;
        MarginInfo {
            can_collapse_margin_before_with_children,
            can_collapse_margin_after_with_children,
            quirk_container: container.is_quirk_container,
            quirks_mode,
            at_before_side_of_block: true,
            at_after_side_of_block: false,
            margin: if can_collapse_margin_before_with_children {
                own_before
            } else {
                CollapsedMargin::zero()
            },
            margin_before_quirk: false,
            margin_after_quirk: false,
            determined_margin_before_quirk: false,
        }
    }

    pub fn can_collapse_with_margin_before(&self) -> bool {
        self.at_before_side_of_block && self.can_collapse_margin_before_with_children
    }

    pub fn can_collapse_with_margin_after(&self) -> bool {
        self.at_after_side_of_block && self.can_collapse_margin_after_with_children
    }

    pub fn at_before_side_of_block(&self) -> bool {
        self.at_before_side_of_block
    }

    pub fn set_at_before_side_of_block(&mut self, value: bool) {
        self.at_before_side_of_block = value;
    }

    pub fn margin(&self) -> CollapsedMargin {
        self.margin
    }

    pub fn set_margin(&mut self, margin: CollapsedMargin) {
        self.margin = margin;
    }

    pub fn clear_margin(&mut self) {
        self.margin = CollapsedMargin::zero();
    }

    pub fn set_margin_after_quirk(&mut self, value: bool) {
        self.margin_after_quirk = value;
    }

    /// Whether quirky margins of this container are dropped in favour of the collapsed
    /// value of the participants.
    fn quirk_applies(&self, quirk: bool) -> bool {
        self.quirks_mode && self.quirk_container && quirk
    }

    /// Called before a child is placed. A `separate` before margin never collapses, neither
    /// with our before side nor with what precedes it.
    pub fn begin_child(&mut self, child_margin_before_collapse: MarginCollapse) {
        if child_margin_before_collapse == MarginCollapse::Separate {
            self.at_before_side_of_block = false;
            self.clear_margin();
        }
    }

    /// Collapses the before margin of a laid-out child with the running state. Returns the
    /// child's border-box top and the parent's new content height, before clearance and
    /// pagination. `own` holds the parent's before extrema and quirk flag, which are
    /// updated when the child collapses through the parent's before side.
    pub fn collapse_child(
        &mut self,
        child: &ChildMargins,
        parent_height: Au,
        own: &mut OwnMargins,
    ) -> CollapseResult {
        let mut before = child.values.before;
        if child.self_collapsing {
            before.adjoin_assign(&child.values.after);
        }
        let before_quirk =
            child.before_quirk || child.margin_before_collapse == MarginCollapse::Discard;
        let child_has_margin = before.solve() != Au::zero();

        if self.can_collapse_with_margin_before() {
            // The child's margin collapses with ours: widen our extrema unless the margin is
            // a quirk that this container throws away.
            if !self.quirk_applies(before_quirk) {
                own.before.adjoin_assign(&before);
            }
            if !self.determined_margin_before_quirk && !before_quirk && child_has_margin {
                own.before_quirk = false;
                self.determined_margin_before_quirk = true;
            }
            if !self.determined_margin_before_quirk && before_quirk && own.margin_before == Au::zero() {
                own.before_quirk = true;
            }
        }

        if self.quirk_container && self.at_before_side_of_block && child_has_margin {
            self.margin_before_quirk = before_quirk;
        }

        let mut height = parent_height;
        let mut logical_top = parent_height;
        if child.self_collapsing {
            // Position the empty child as if its margins had not collapsed with the
            // following content yet.
            let collapsed_before = self.margin.adjoin(&child.values.before);
            self.margin = collapsed_before.adjoin(&before);
            if !self.can_collapse_with_margin_before() {
                logical_top = height + collapsed_before.solve();
            }
        } else {
            if child.margin_before_collapse == MarginCollapse::Separate {
                height += self.margin.solve() + child.margin_before;
                logical_top = height;
            } else if !self.at_before_side_of_block ||
                (!self.can_collapse_margin_before_with_children &&
                    !self.quirk_applies(self.margin_before_quirk))
            {
                // Collapsing with a previous sibling rather than with our before side.
                height += self.margin.adjoin(&before).solve();
                logical_top = height;
            }
            self.margin = child.values.after;
            if !self.margin.is_zero() {
                self.margin_after_quirk = child.after_quirk ||
                    child.margin_after_collapse == MarginCollapse::Discard;
            }
        }

        CollapseResult {
            logical_top,
            parent_height: height,
        }
    }

    /// Clearance broke collapsing for `child`. For a self-collapsing child the running
    /// state restarts from its own margins; the returned value is the parent's new height.
    pub fn apply_clearance(
        &mut self,
        child: &ChildMargins,
        child_top: Au,
        clearance: Au,
        parent_height: Au,
        own: &mut OwnMargins,
        old_own_before: CollapsedMargin,
    ) -> Au {
        let height = if child.self_collapsing {
            self.margin = child.values.collapsed_through();
            child_top - self.margin.solve().max(Au::zero())
        } else {
            parent_height + clearance
        };
        if self.can_collapse_with_margin_before() {
            // The cleared child no longer collapses with our before side; what collapsed
            // before it stays inside.
            own.before = old_own_before;
            self.at_before_side_of_block = false;
        }
        height
    }

    /// Adds whatever the after side needs and returns the final content height plus after
    /// border and padding, never less than the border and padding themselves.
    pub fn handle_after_side(
        &mut self,
        height: Au,
        before_border_padding: Au,
        after_border_padding: Au,
        own: &mut OwnMargins,
    ) -> Au {
        self.at_after_side_of_block = true;

        let mut height = height;
        if !self.can_collapse_with_margin_after() &&
            !self.can_collapse_with_margin_before() &&
            !self.quirk_applies(self.margin_after_quirk)
        {
            height += self.margin.solve();
        }
        height += after_border_padding;
        height = height.max(before_border_padding + after_border_padding);

        if self.can_collapse_with_margin_after() && !self.can_collapse_with_margin_before() {
            own.after.adjoin_assign(&self.margin);
            if !self.margin_after_quirk {
                own.after_quirk = false;
            }
            if self.margin_after_quirk && own.margin_after == Au::zero() {
                own.after_quirk = true;
            }
        }
        height
    }
}

/// The margin extrema and quirk flags of the block whose children are being laid out.
#[derive(Clone, Copy, Debug)]
pub(crate) struct OwnMargins {
    pub before: CollapsedMargin,
    pub after: CollapsedMargin,
    pub margin_before: Au,
    pub margin_after: Au,
    pub before_quirk: bool,
    pub after_quirk: bool,
}

impl OwnMargins {
    pub fn values(&self) -> MarginValues {
        MarginValues {
            before: self.before,
            after: self.after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container() -> MarginContainer {
        MarginContainer {
            can_collapse_with_children: true,
            before_border_padding: Au::zero(),
            after_border_padding: Au::zero(),
            has_auto_block_size: true,
            is_quirk_container: false,
            margin_before_collapse: MarginCollapse::Collapse,
            margin_after_collapse: MarginCollapse::Collapse,
        }
    }

    fn child(before: i32, after: i32) -> ChildMargins {
        ChildMargins {
            values: MarginValues::from_margins(Au::from_px(before), Au::from_px(after)),
            self_collapsing: false,
            before_quirk: false,
            after_quirk: false,
            margin_before_collapse: MarginCollapse::Collapse,
            margin_after_collapse: MarginCollapse::Collapse,
            margin_before: Au::from_px(before),
        }
    }

    fn own(before: i32, after: i32) -> OwnMargins {
        OwnMargins {
            before: CollapsedMargin::new(Au::from_px(before)),
            after: CollapsedMargin::new(Au::from_px(after)),
            margin_before: Au::from_px(before),
            margin_after: Au::from_px(after),
            before_quirk: false,
            after_quirk: false,
        }
    }

    #[test]
    fn test_mixed_sign_margins_collapse() {
        let a = CollapsedMargin::new(Au::from_px(10)).adjoin(&CollapsedMargin::new(Au::from_px(-4)));
        let b = CollapsedMargin::new(Au::from_px(6)).adjoin(&CollapsedMargin::new(Au::from_px(-8)));
        // Largest positive plus most negative: 10 - 8.
        assert_eq!(a.adjoin(&b).solve(), Au::from_px(2));
    }

    #[test]
    fn test_first_child_collapses_through_parent_before_side() {
        let mut own = own(4, 0);
        let mut info = MarginInfo::new(&container(), own.before, false);
        let result = info.collapse_child(&child(10, 0), Au::zero(), &mut own);
        assert_eq!(result.logical_top, Au::zero());
        assert_eq!(own.before.solve(), Au::from_px(10));
    }

    #[test]
    fn test_border_keeps_child_margin_inside() {
        let mut own = own(4, 0);
        let mut container = container();
        container.before_border_padding = Au::from_px(1);
        let mut info = MarginInfo::new(&container, own.before, false);
        let result = info.collapse_child(&child(10, 0), Au::from_px(1), &mut own);
        assert_eq!(result.logical_top, Au::from_px(11));
        assert_eq!(own.before.solve(), Au::from_px(4));
    }

    #[test]
    fn test_siblings_collapse_to_largest_margin() {
        let mut own = own(0, 0);
        let mut info = MarginInfo::new(&container(), own.before, false);
        let first = info.collapse_child(&child(0, 20), Au::zero(), &mut own);
        info.set_at_before_side_of_block(false);
        let after_first = first.parent_height + Au::from_px(50);
        let second = info.collapse_child(&child(30, 0), after_first, &mut own);
        assert_eq!(second.logical_top, Au::from_px(80));
    }

    #[test]
    fn test_self_collapsing_child_acts_as_one_margin() {
        let mut own = own(0, 0);
        let mut container = container();
        container.before_border_padding = Au::from_px(1);
        let mut info = MarginInfo::new(&container, own.before, false);
        let mut empty = child(5, 3);
        empty.self_collapsing = true;
        info.collapse_child(&empty, Au::from_px(1), &mut own);
        assert_eq!(info.margin().solve(), Au::from_px(5));
    }

    #[test]
    fn test_separate_margin_adds_literal_space() {
        let mut own = own(0, 0);
        let mut info = MarginInfo::new(&container(), own.before, false);
        let first = info.collapse_child(&child(0, 10), Au::zero(), &mut own);
        info.set_at_before_side_of_block(false);
        let mut separate = child(6, 0);
        separate.margin_before_collapse = MarginCollapse::Separate;
        info.begin_child(separate.margin_before_collapse);
        let result = info.collapse_child(&separate, first.parent_height, &mut own);
        // The pending margin of the previous sibling is dropped.
        assert_eq!(result.logical_top, Au::from_px(6));
    }

    #[test]
    fn test_after_margin_collapses_into_parent() {
        let mut own = own(0, 7);
        let mut info = MarginInfo::new(&container(), own.before, false);
        let first = info.collapse_child(&child(0, 12), Au::zero(), &mut own);
        info.set_at_before_side_of_block(false);
        let height = info.handle_after_side(first.parent_height + Au::from_px(40), Au::zero(), Au::zero(), &mut own);
        assert_eq!(height, Au::from_px(40));
        assert_eq!(own.after.solve(), Au::from_px(12));
    }

    #[test]
    fn test_after_margin_stays_inside_with_padding() {
        let mut own = own(0, 7);
        let mut container = container();
        container.after_border_padding = Au::from_px(2);
        let mut info = MarginInfo::new(&container, own.before, false);
        let first = info.collapse_child(&child(0, 12), Au::zero(), &mut own);
        info.set_at_before_side_of_block(false);
        let height = info.handle_after_side(first.parent_height + Au::from_px(40), Au::zero(), Au::from_px(2), &mut own);
        assert_eq!(height, Au::from_px(54));
        assert_eq!(own.after.solve(), Au::from_px(7));
    }

    #[test]
    fn test_quirky_margin_is_dropped_in_quirk_container() {
        let mut own = own(0, 0);
        let mut container = container();
        container.is_quirk_container = true;
        container.before_border_padding = Au::from_px(1);
        let mut info = MarginInfo::new(&container, own.before, true);
        let mut quirky = child(16, 0);
        quirky.before_quirk = true;
        let result = info.collapse_child(&quirky, Au::from_px(1), &mut own);
        assert_eq!(result.logical_top, Au::from_px(1));
    }
}
