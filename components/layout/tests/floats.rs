/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use app_units::Au;
use euclid::num::Zero;
use block_layout::{
    BoxId, BoxStyle, BoxTree, Clear, FixedAdvanceMeasurer, Float, FloatSide, LayoutContext,
    LayoutOptions, Length, LogicalRect, LogicalVec2, layout, remove_float,
};
use quickcheck::quickcheck;

fn float_style(float: Float, inline_size: f32, block_size: f32) -> BoxStyle {
    BoxStyle {
        float,
        inline_size: Length::px(inline_size),
        block_size: Length::px(block_size),
        ..BoxStyle::block()
    }
}

fn overlaps(a: &LogicalRect<Au>, b: &LogicalRect<Au>) -> bool {
    a.min_inline_position() < b.max_inline_position() &&
        b.min_inline_position() < a.max_inline_position() &&
        a.min_block_position() < b.max_block_position() &&
        b.min_block_position() < a.max_block_position()
}

quickcheck! {
    fn placed_floats_stay_inside_and_never_overlap(floats: Vec<(bool, u8, u8)>) -> bool {
        let mut tree = BoxTree::new();
        let root = tree.new_block(BoxStyle {
            inline_size: Length::px(300.),
            ..BoxStyle::block()
        });
        tree.set_root(root);
        let boxes: Vec<BoxId> = floats
            .iter()
            .take(10)
            .map(|(left, inline_size, block_size)| {
                let side = if *left { Float::Left } else { Float::Right };
                let inline_size = 10. + (*inline_size as f32 % 29.) * 10.;
                let block_size = 10. + *block_size as f32 % 90.;
                let float = tree.new_block(float_style(side, inline_size, block_size));
                tree.append_child(root, float);
                float
            })
            .collect();

        let measurer = FixedAdvanceMeasurer::default();
        let mut context = LayoutContext::new(LayoutOptions::default(), &measurer);
        layout(&mut tree, &mut context, root, false);

        let rects: Vec<LogicalRect<Au>> = boxes.iter().filter_map(|float| tree.frame(*float)).collect();
        rects.len() == boxes.len() &&
            rects.iter().all(|rect| {
                rect.min_inline_position() >= Au::zero() &&
                    rect.max_inline_position() <= Au::from_px(300)
            }) &&
            // A float is never placed above an earlier one.
            rects.windows(2).all(|pair| pair[0].start_corner.block <= pair[1].start_corner.block) &&
            rects.iter().enumerate().all(|(index, rect)| {
                rects[index + 1..].iter().all(|other| !overlaps(rect, other))
            }) &&
            tree.frame(root).is_some_and(|frame| {
                rects.iter().all(|rect| rect.max_block_position() <= frame.size.block)
            })
    }
}

/// A 300px wide root holding a 100x50 float on each side followed by some text.
fn floats_on_both_sides() -> (BoxTree, BoxId, BoxId, BoxId) {
    let mut tree = BoxTree::new();
    let root = tree.new_block(BoxStyle {
        inline_size: Length::px(300.),
        ..BoxStyle::block()
    });
    tree.set_root(root);
    let left = tree.new_block(float_style(Float::Left, 100., 50.));
    let right = tree.new_block(float_style(Float::Right, 100., 50.));
    let text = tree.new_text("aaaa bbbb cccc dddd", BoxStyle::inline());
    tree.append_child(root, left);
    tree.append_child(root, right);
    tree.append_child(root, text);
    (tree, root, left, right)
}

#[test]
fn test_floats_on_both_sides_share_a_top() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (mut tree, root, left, right) = floats_on_both_sides();
    let measurer = FixedAdvanceMeasurer::default();
    let mut context = LayoutContext::new(LayoutOptions::default(), &measurer);
    layout(&mut tree, &mut context, root, false);

    let floats = tree[root].block().and_then(|block| block.floats()).unwrap();
    assert_eq!(floats.len(), 2);
    for (_, record) in floats.iter() {
        assert!(record.is_placed());
        assert_eq!(record.logical_top(), Au::zero());
        match record.side() {
            FloatSide::Left => {
                assert_eq!(record.box_id(), left);
                assert_eq!(record.logical_left(), Au::zero());
            },
            FloatSide::Right => {
                assert_eq!(record.box_id(), right);
                assert_eq!(record.logical_left(), Au::from_px(200));
            },
        }
    }
    assert_eq!(tree.frame(left).unwrap().start_corner.inline, Au::zero());
    assert_eq!(tree.frame(right).unwrap().start_corner.inline, Au::from_px(200));

    // Only the 100px between the floats is left for the lines beside them.
    let lines = tree[root].block().unwrap().lines();
    assert!(lines.len() > 1);
    let first = lines.first().unwrap().rect();
    assert_eq!(first.start_corner.inline, Au::from_px(100));
    assert!(first.size.inline <= Au::from_px(100));
}

#[test]
fn test_removing_a_float_dirties_the_lines_beside_it() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (mut tree, root, left, _) = floats_on_both_sides();
    let measurer = FixedAdvanceMeasurer::default();
    let mut context = LayoutContext::new(LayoutOptions::default(), &measurer);
    layout(&mut tree, &mut context, root, false);
    assert!(tree[root].block().unwrap().lines().iter().all(|line| !line.is_dirty()));

    remove_float(&mut tree, root, left);

    let block = tree[root].block().unwrap();
    assert!(!block.floats().unwrap().contains(left));
    assert!(block.lines().first().unwrap().is_dirty());
}

#[test]
fn test_float_overhangs_into_following_sibling() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let root = tree.new_block(BoxStyle::block());
    tree.set_root(root);
    let holder = tree.new_block(BoxStyle::block());
    let float = tree.new_block(float_style(Float::Left, 100., 100.));
    tree.append_child(holder, float);
    let sibling = tree.new_block(BoxStyle::block());
    let text = tree.new_text("hello", BoxStyle::inline());
    tree.append_child(sibling, text);
    tree.append_child(root, holder);
    tree.append_child(root, sibling);

    let measurer = FixedAdvanceMeasurer::default();
    let mut context = LayoutContext::new(LayoutOptions::default(), &measurer);
    layout(&mut tree, &mut context, root, false);

    // The float does not make its parent taller.
    assert_eq!(tree.frame(holder).unwrap().size.block, Au::zero());
    let sibling_block = tree[sibling].block().unwrap();
    assert!(sibling_block.floats().is_some_and(|floats| floats.contains(float)));
    let line = sibling_block.lines().first().unwrap().rect();
    assert_eq!(line.start_corner.inline, Au::from_px(100));

    // Removing the float from its parent takes it out of the sibling too.
    remove_float(&mut tree, holder, float);
    let sibling_block = tree[sibling].block().unwrap();
    assert!(!sibling_block.floats().is_some_and(|floats| floats.contains(float)));
    assert!(sibling_block.lines().first().unwrap().is_dirty());
    assert!(tree.needs_layout(sibling));
}

#[test]
fn test_clearance_moves_a_block_below_the_float() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let root = tree.new_block(BoxStyle::block());
    tree.set_root(root);
    let float = tree.new_block(float_style(Float::Left, 100., 50.));
    let cleared = tree.new_block(BoxStyle {
        clear: Clear::Left,
        block_size: Length::px(10.),
        ..BoxStyle::block()
    });
    tree.append_child(root, float);
    tree.append_child(root, cleared);

    let measurer = FixedAdvanceMeasurer::default();
    let mut context = LayoutContext::new(LayoutOptions::default(), &measurer);
    layout(&mut tree, &mut context, root, false);

    assert_eq!(tree.frame(float).unwrap().start_corner.block, Au::zero());
    assert_eq!(tree.frame(cleared).unwrap().start_corner.block, Au::from_px(50));
    assert_eq!(tree.frame(root).unwrap().size.block, Au::from_px(60));
}

#[test]
fn test_replaced_block_too_wide_for_the_gap_moves_below_the_float() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let root = tree.new_block(BoxStyle {
        inline_size: Length::px(300.),
        ..BoxStyle::block()
    });
    tree.set_root(root);
    let float = tree.new_block(float_style(Float::Right, 120., 60.));
    let image = tree.new_replaced(
        BoxStyle::block(),
        LogicalVec2::new(Au::from_px(250), Au::from_px(20)),
    );
    tree.append_child(root, float);
    tree.append_child(root, image);

    let measurer = FixedAdvanceMeasurer::default();
    let mut context = LayoutContext::new(LayoutOptions::default(), &measurer);
    layout(&mut tree, &mut context, root, false);

    let float_frame = tree.frame(float).unwrap();
    assert_eq!(float_frame.start_corner.inline, Au::from_px(180));
    assert_eq!(float_frame.start_corner.block, Au::zero());

    // Only 180px are free beside the float, so the 250px image goes below it at full size.
    let image_frame = tree.frame(image).unwrap();
    assert_eq!(image_frame.size.inline, Au::from_px(250));
    assert_eq!(image_frame.start_corner.block, Au::from_px(60));
    assert_eq!(tree.frame(root).unwrap().size.block, Au::from_px(80));
}

#[test]
fn test_replaced_block_that_fits_stays_beside_the_float() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let root = tree.new_block(BoxStyle {
        inline_size: Length::px(300.),
        ..BoxStyle::block()
    });
    tree.set_root(root);
    let float = tree.new_block(float_style(Float::Right, 120., 60.));
    let image = tree.new_replaced(
        BoxStyle::block(),
        LogicalVec2::new(Au::from_px(150), Au::from_px(20)),
    );
    tree.append_child(root, float);
    tree.append_child(root, image);

    let measurer = FixedAdvanceMeasurer::default();
    let mut context = LayoutContext::new(LayoutOptions::default(), &measurer);
    layout(&mut tree, &mut context, root, false);

    let image_frame = tree.frame(image).unwrap();
    assert_eq!(image_frame.start_corner.block, Au::zero());
    assert_eq!(image_frame.size.inline, Au::from_px(150));
}
