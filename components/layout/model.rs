/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Borders, padding, and margins.

use app_units::Au;
use euclid::num::Zero;

use crate::style::Length;

/// Useful helper data type when computing values for blocks and positioned elements.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum MaybeAuto {
    Auto,
    Specified(Au),
}

impl MaybeAuto {
    #[inline]
    pub(crate) fn from_style(length: Length, containing_length: Au) -> MaybeAuto {
        match length {
            Length::Auto => MaybeAuto::Auto,
            Length::Percentage(percent) => MaybeAuto::Specified(containing_length.scale_by(percent)),
            Length::Fixed(length) => MaybeAuto::Specified(length),
        }
    }

    /// Like [`MaybeAuto::from_style`], for a containing length that may be unknown, in
    /// which case percentages behave as `auto`.
    #[inline]
    pub(crate) fn from_option(length: Length, containing_length: Option<Au>) -> MaybeAuto {
        match length.resolve(containing_length) {
            Some(value) => MaybeAuto::Specified(value),
            None => MaybeAuto::Auto,
        }
    }

    #[inline]
    pub(crate) fn is_auto(&self) -> bool {
        matches!(self, MaybeAuto::Auto)
    }

    #[inline]
    pub(crate) fn specified_or_default(&self, default: Au) -> Au {
        match *self {
            MaybeAuto::Auto => default,
            MaybeAuto::Specified(value) => value,
        }
    }

    #[inline]
    pub(crate) fn specified_or_zero(&self) -> Au {
        self.specified_or_default(Au::zero())
    }
}

/// Max sizes: `auto` stands for `none`.
pub(crate) fn specified_or_none(length: Length, containing_length: Option<Au>) -> Option<Au> {
    length.resolve(containing_length)
}

/// Min sizes: `auto` and unresolvable percentages are zero.
pub(crate) fn specified(length: Length, containing_length: Option<Au>) -> Au {
    length.resolve(containing_length).unwrap_or_else(Au::zero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentages_resolve_against_containing_length() {
        let value = MaybeAuto::from_style(Length::Percentage(0.25), Au::from_px(200));
        assert_eq!(value, MaybeAuto::Specified(Au::from_px(50)));
        assert!(MaybeAuto::from_option(Length::Percentage(0.5), None).is_auto());
    }

    #[test]
    fn test_min_and_max_fallbacks() {
        assert_eq!(specified_or_none(Length::Auto, Some(Au::from_px(10))), None);
        assert_eq!(specified(Length::Percentage(0.5), None), Au::zero());
        assert_eq!(
            MaybeAuto::Auto.specified_or_default(Au::from_px(3)),
            Au::from_px(3)
        );
    }
}
