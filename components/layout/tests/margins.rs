/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use app_units::Au;
use euclid::num::Zero;
use block_layout::{
    BoxStyle, BoxTree, Clear, CollapsedMargin, FixedAdvanceMeasurer, Float, LayoutContext, LayoutOptions,
    Length, MarginValues, layout,
};
use quickcheck::quickcheck;

fn margin(px: i16) -> CollapsedMargin {
    CollapsedMargin::new(Au::from_px(px as i32))
}

quickcheck! {
    fn adjoin_is_commutative(a: i16, b: i16) -> bool {
        margin(a).adjoin(&margin(b)) == margin(b).adjoin(&margin(a))
    }

    fn adjoin_is_associative(a: i16, b: i16, c: i16) -> bool {
        margin(a).adjoin(&margin(b)).adjoin(&margin(c)) ==
            margin(a).adjoin(&margin(b).adjoin(&margin(c)))
    }

    fn solve_adds_the_extrema(a: i16, b: i16) -> bool {
        let collapsed = margin(a).adjoin(&margin(b));
        collapsed.solve() == collapsed.max_positive() + collapsed.min_negative() &&
            collapsed.max_positive() >= Au::zero() &&
            collapsed.min_negative() <= Au::zero()
    }

    fn zero_is_neutral(a: i16) -> bool {
        margin(a).adjoin(&CollapsedMargin::zero()) == margin(a)
    }
}

#[test]
fn test_mixed_sign_pairs_collapse() {
    let first = CollapsedMargin::from_extrema(Au::from_px(10), Au::from_px(-4));
    let second = CollapsedMargin::from_extrema(Au::from_px(6), Au::from_px(-8));
    assert_eq!(first.adjoin(&second).solve(), Au::from_px(2));
}

#[test]
fn test_self_collapsing_box_acts_as_one_margin() {
    let values = MarginValues::from_margins(Au::from_px(5), Au::from_px(3));
    assert_eq!(values.collapsed_through().solve(), Au::from_px(5));
}

fn sized_block(block_size: f32) -> BoxStyle {
    BoxStyle {
        block_size: Length::px(block_size),
        ..BoxStyle::block()
    }
}

#[test]
fn test_sibling_margins_collapse_in_layout() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let root = tree.new_block(BoxStyle::block());
    tree.set_root(root);

    let mut first_style = sized_block(10.);
    first_style.margin.block_end = Length::px(20.);
    let first = tree.new_block(first_style);
    let mut second_style = sized_block(10.);
    second_style.margin.block_start = Length::px(30.);
    let second = tree.new_block(second_style);
    tree.append_child(root, first);
    tree.append_child(root, second);

    let measurer = FixedAdvanceMeasurer::default();
    let mut context = LayoutContext::new(LayoutOptions::default(), &measurer);
    layout(&mut tree, &mut context, root, false);

    let second_frame = tree.frame(second).unwrap();
    assert_eq!(second_frame.start_corner.block, Au::from_px(40));
}

#[test]
fn test_empty_block_margins_collapse_through() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let root = tree.new_block(BoxStyle::block());
    tree.set_root(root);

    let first = tree.new_block(sized_block(10.));
    let mut empty_style = BoxStyle::block();
    empty_style.margin.block_start = Length::px(5.);
    empty_style.margin.block_end = Length::px(3.);
    let empty = tree.new_block(empty_style);
    let last = tree.new_block(sized_block(10.));
    tree.append_child(root, first);
    tree.append_child(root, empty);
    tree.append_child(root, last);

    let measurer = FixedAdvanceMeasurer::default();
    let mut context = LayoutContext::new(LayoutOptions::default(), &measurer);
    layout(&mut tree, &mut context, root, false);

    assert_eq!(tree.frame(empty).unwrap().size.block, Au::zero());
    assert_eq!(tree.frame(last).unwrap().start_corner.block, Au::from_px(15));
    assert_eq!(tree.frame(root).unwrap().size.block, Au::from_px(25));
}

#[test]
fn test_cleared_empty_last_child_keeps_only_its_after_margin() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let root = tree.new_block(BoxStyle::block());
    tree.set_root(root);

    // Padding on both sides keeps the children's margins inside the container.
    let mut container_style = BoxStyle::block();
    container_style.padding.block_start = Length::px(1.);
    container_style.padding.block_end = Length::px(1.);
    let container = tree.new_block(container_style);
    let float = tree.new_block(BoxStyle {
        float: Float::Left,
        inline_size: Length::px(100.),
        block_size: Length::px(50.),
        ..BoxStyle::block()
    });
    let mut empty_style = BoxStyle {
        clear: Clear::Left,
        ..BoxStyle::block()
    };
    empty_style.margin.block_start = Length::px(10.);
    empty_style.margin.block_end = Length::px(-4.);
    let empty = tree.new_block(empty_style);
    tree.append_child(root, container);
    tree.append_child(container, float);
    tree.append_child(container, empty);

    let measurer = FixedAdvanceMeasurer::default();
    let mut context = LayoutContext::new(LayoutOptions::default(), &measurer);
    layout(&mut tree, &mut context, root, false);

    // The empty block clears the float, whose bottom is at 51.
    assert_eq!(tree.frame(empty).unwrap().start_corner.block, Au::from_px(51));
    // Only the -4px after margin is left below it: 51 - 4 + 1px of padding.
    assert_eq!(tree.frame(container).unwrap().size.block, Au::from_px(48));
}
