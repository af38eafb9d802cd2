/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use app_units::Au;
use euclid::num::Zero;
use block_layout::{
    BoxId, BoxStyle, BoxTree, BreakValue, FixedAdvanceMeasurer, LayoutContext, LayoutOptions, Length,
    Position, layout, outline,
};

fn paragraphs() -> (BoxTree, BoxId, BoxId) {
    let mut tree = BoxTree::new();
    let root = tree.new_block(BoxStyle {
        inline_size: Length::px(200.),
        ..BoxStyle::block()
    });
    tree.set_root(root);
    let first = tree.new_block(BoxStyle::block());
    let text = tree.new_text("one two three four five six seven", BoxStyle::inline());
    tree.append_child(first, text);
    let second = tree.new_block(BoxStyle {
        block_size: Length::px(40.),
        ..BoxStyle::block()
    });
    tree.append_child(root, first);
    tree.append_child(root, second);
    (tree, root, text)
}

#[test]
fn test_second_layout_changes_nothing() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (mut tree, root, _) = paragraphs();
    let measurer = FixedAdvanceMeasurer::default();
    let mut context = LayoutContext::new(LayoutOptions::default(), &measurer);
    layout(&mut tree, &mut context, root, false);
    let _ = context.take_repaint_rects();
    let before = tree.geometry_snapshot(root).unwrap();

    layout(&mut tree, &mut context, root, false);
    assert!(context.take_repaint_rects().is_empty());
    assert_eq!(tree.geometry_snapshot(root).unwrap(), before);

    layout(&mut tree, &mut context, root, true);
    assert!(context.take_repaint_rects().is_empty());
    assert_eq!(tree.geometry_snapshot(root).unwrap(), before);
}

#[test]
fn test_text_change_is_laid_out_and_repainted() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (mut tree, root, text) = paragraphs();
    let measurer = FixedAdvanceMeasurer::default();
    let mut context = LayoutContext::new(LayoutOptions::default(), &measurer);
    layout(&mut tree, &mut context, root, false);
    let _ = context.take_repaint_rects();
    let paragraph = tree.parent(text).unwrap();
    // 8px per character in 200px: "one two three four five" and "six seven".
    assert_eq!(tree[paragraph].block().unwrap().lines().len(), 2);
    assert_eq!(tree.frame(paragraph).unwrap().size.block, Au::from_px(40));

    tree.set_text(text, "one");
    assert!(tree.needs_layout(root));
    layout(&mut tree, &mut context, root, false);

    assert!(!tree.needs_layout(root));
    assert_eq!(tree[paragraph].block().unwrap().lines().len(), 1);
    assert_eq!(tree.frame(paragraph).unwrap().size.block, Au::from_px(20));
    assert!(!context.take_repaint_rects().is_empty());
    assert_eq!(tree.frame(root).unwrap().size.block, Au::from_px(60));
}

#[test]
fn test_line_break_ends_a_line_early() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let root = tree.new_block(BoxStyle {
        inline_size: Length::px(200.),
        ..BoxStyle::block()
    });
    tree.set_root(root);
    let first = tree.new_text("ab", BoxStyle::inline());
    let line_break = tree.new_line_break(BoxStyle::inline());
    let second = tree.new_text("cd", BoxStyle::inline());
    tree.append_child(root, first);
    tree.append_child(root, line_break);
    tree.append_child(root, second);

    let measurer = FixedAdvanceMeasurer::default();
    let mut context = LayoutContext::new(LayoutOptions::default(), &measurer);
    layout(&mut tree, &mut context, root, false);

    let lines = tree[root].block().unwrap().lines();
    let breaks: Vec<bool> = lines.iter().map(|line| line.ends_with_hard_break()).collect();
    assert_eq!(breaks, vec![true, false]);
    assert_eq!(tree.frame(root).unwrap().size.block, Au::from_px(40));
}

#[test]
fn test_auto_inline_margins_center_a_block() {
    let mut tree = BoxTree::new();
    let root = tree.new_block(BoxStyle::block());
    tree.set_root(root);
    let mut style = BoxStyle {
        inline_size: Length::px(200.),
        ..BoxStyle::block()
    };
    style.margin.inline_start = Length::Auto;
    style.margin.inline_end = Length::Auto;
    let centered = tree.new_block(style);
    tree.append_child(root, centered);

    let measurer = FixedAdvanceMeasurer::default();
    let mut context = LayoutContext::new(LayoutOptions::default(), &measurer);
    layout(&mut tree, &mut context, root, false);

    // The root fills the 800px viewport.
    assert_eq!(tree.frame(root).unwrap().size.inline, Au::from_px(800));
    let node = &tree[centered];
    assert_eq!(node.margin().inline_start, Au::from_px(300));
    assert_eq!(node.margin().inline_end, Au::from_px(300));
    assert_eq!(node.frame().start_corner.inline, Au::from_px(300));
}

#[test]
fn test_absolutely_positioned_box_resolves_its_offsets() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let root = tree.new_block(BoxStyle::block());
    tree.set_root(root);
    let container = tree.new_block(BoxStyle {
        position: Position::Relative,
        inline_size: Length::px(400.),
        block_size: Length::px(300.),
        ..BoxStyle::block()
    });
    let mut style = BoxStyle {
        position: Position::Absolute,
        inline_size: Length::px(50.),
        block_size: Length::px(30.),
        ..BoxStyle::block()
    };
    style.inset.inline_start = Length::px(10.);
    style.inset.block_start = Length::px(20.);
    let positioned = tree.new_block(style);
    tree.append_child(container, positioned);
    tree.append_child(root, container);

    let measurer = FixedAdvanceMeasurer::default();
    let mut context = LayoutContext::new(LayoutOptions::default(), &measurer);
    layout(&mut tree, &mut context, root, false);

    let frame = tree.frame(positioned).unwrap();
    assert_eq!(frame.start_corner.inline, Au::from_px(10));
    assert_eq!(frame.start_corner.block, Au::from_px(20));
    assert_eq!(frame.size.inline, Au::from_px(50));
    assert_eq!(frame.size.block, Au::from_px(30));
    // Out of flow: the container keeps its specified size.
    assert_eq!(tree.frame(container).unwrap().size.block, Au::from_px(300));
}

#[test]
fn test_layout_of_a_removed_box_is_ignored() {
    let mut tree = BoxTree::new();
    let root = tree.new_block(BoxStyle::block());
    tree.set_root(root);
    let child = tree.new_block(BoxStyle::block());
    tree.append_child(root, child);
    tree.destroy_subtree(child);

    let measurer = FixedAdvanceMeasurer::default();
    let mut context = LayoutContext::new(LayoutOptions::default(), &measurer);
    layout(&mut tree, &mut context, child, false);
    layout(&mut tree, &mut context, root, false);
    assert_eq!(outline(&tree, root).lines().count(), 1);
}

#[test]
fn test_forced_page_break_moves_a_block_to_the_next_page() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = BoxTree::new();
    let root = tree.new_block(BoxStyle::block());
    tree.set_root(root);
    let first = tree.new_block(BoxStyle {
        block_size: Length::px(30.),
        ..BoxStyle::block()
    });
    let second = tree.new_block(BoxStyle {
        block_size: Length::px(30.),
        page_break_before: BreakValue::Always,
        ..BoxStyle::block()
    });
    tree.append_child(root, first);
    tree.append_child(root, second);

    let options = LayoutOptions {
        paginated: true,
        viewport_height: 100.,
        ..LayoutOptions::default()
    };
    let measurer = FixedAdvanceMeasurer::default();
    let mut context = LayoutContext::new(options, &measurer);
    layout(&mut tree, &mut context, root, false);

    assert_eq!(tree.frame(first).unwrap().start_corner.block, Au::zero());
    assert_eq!(tree.frame(second).unwrap().start_corner.block, Au::from_px(100));
    assert_eq!(tree.frame(root).unwrap().size.block, Au::from_px(130));
}
