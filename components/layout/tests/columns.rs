/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use app_units::Au;
use block_layout::{
    BoxId, BoxStyle, BoxTree, BreakValue, FixedAdvanceMeasurer, LayoutContext, LayoutOptions, Length,
    PhysicalPoint, PhysicalRect, adjust_point_to_column_contents, adjust_rect_for_columns, column_rect_at,
    layout,
};
use euclid::num::Zero;
use euclid::{Point2D, Size2D};
use quickcheck::quickcheck;

fn px_rect(x: i32, y: i32, width: i32, height: i32) -> PhysicalRect<Au> {
    PhysicalRect::new(
        Point2D::new(Au::from_px(x), Au::from_px(y)),
        Size2D::new(Au::from_px(width), Au::from_px(height)),
    )
}

fn px_point(x: i32, y: i32) -> PhysicalPoint<Au> {
    Point2D::new(Au::from_px(x), Au::from_px(y))
}

/// A multi-column block of `inline_size` with one child per entry of `children`, under a
/// plain root.
fn layout_multicol(
    options: LayoutOptions,
    inline_size: i32,
    count: u32,
    gap: i32,
    children: &[BoxStyle],
) -> (BoxTree, BoxId, Vec<BoxId>) {
    let mut tree = BoxTree::new();
    let root = tree.new_block(BoxStyle::block());
    tree.set_root(root);
    let multicol = tree.new_block(BoxStyle {
        inline_size: Length::px(inline_size as f32),
        column_count: Some(count),
        column_gap: Some(Au::from_px(gap)),
        ..BoxStyle::block()
    });
    tree.append_child(root, multicol);
    let children = children
        .iter()
        .map(|style| {
            let child = tree.new_block(style.clone());
            tree.append_child(multicol, child);
            child
        })
        .collect();

    let measurer = FixedAdvanceMeasurer::default();
    let mut context = LayoutContext::new(options, &measurer);
    layout(&mut tree, &mut context, root, false);
    (tree, multicol, children)
}

fn sized_block(block_size: i32) -> BoxStyle {
    BoxStyle {
        block_size: Length::px(block_size as f32),
        ..BoxStyle::block()
    }
}

/// A 300px wide two-column block with four 50px tall children.
fn two_columns(options: LayoutOptions) -> (BoxTree, BoxId) {
    let children = vec![sized_block(50); 4];
    let (tree, multicol, _) = layout_multicol(options, 300, 2, 20, &children);
    (tree, multicol)
}

quickcheck! {
    fn columns_tile_the_content_box(count: u8, gap: u8, width: u16, heights: Vec<u8>) -> bool {
        let count = 2 + count as u32 % 4;
        let gap = gap as i32 % 41;
        let inline_size = 200 + width as i32 % 401;
        let children: Vec<BoxStyle> = heights
            .iter()
            .take(8)
            .map(|height| sized_block(1 + *height as i32))
            .collect();
        if children.is_empty() {
            return true;
        }
        let content: i32 = heights.iter().take(8).map(|height| 1 + *height as i32).sum();
        let (tree, multicol, _) = layout_multicol(LayoutOptions::default(), inline_size, count, gap, &children);

        let Some(info) = tree[multicol].block().and_then(|block| block.column_info()) else {
            return false;
        };
        let used = info.column_count();
        if used == 0 || used > count || column_rect_at(&tree, multicol, used).is_some() {
            return false;
        }
        // Every piece of content has a column.
        if info.column_height().0 as i64 * (used as i64) < Au::from_px(content).0 as i64 {
            return false;
        }
        let rects: Vec<PhysicalRect<Au>> = (0..used)
            .filter_map(|index| column_rect_at(&tree, multicol, index))
            .collect();
        rects.len() == used as usize &&
            rects.iter().all(|rect| {
                rect.size == rects[0].size &&
                    rect.origin.y == Au::zero() &&
                    rect.origin.x >= Au::zero() &&
                    rect.max_x() <= Au::from_px(inline_size)
            }) &&
            rects.windows(2).all(|pair| pair[1].origin.x - pair[0].max_x() == Au::from_px(gap))
    }
}

#[test]
fn test_columns_are_balanced() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (tree, multicol) = two_columns(LayoutOptions::default());

    let info = tree[multicol].block().and_then(|block| block.column_info()).unwrap();
    assert_eq!(info.desired_column_count(), 2);
    assert_eq!(info.desired_column_width(), Au::from_px(140));
    assert_eq!(info.column_count(), 2);
    assert_eq!(info.column_height(), Au::from_px(100));
    assert_eq!(tree.frame(multicol).unwrap().size.block, Au::from_px(100));
}

#[test]
fn test_column_rects_tile_the_content_box() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (tree, multicol) = two_columns(LayoutOptions::default());

    let first = column_rect_at(&tree, multicol, 0).unwrap();
    let second = column_rect_at(&tree, multicol, 1).unwrap();
    assert!(column_rect_at(&tree, multicol, 2).is_none());

    assert_eq!(first.origin.x, Au::zero());
    assert_eq!(first.size, second.size);
    assert_eq!(second.origin.y, first.origin.y);
    // Columns and the gap between them fill the whole content width.
    assert_eq!(second.origin.x - first.max_x(), Au::from_px(20));
    assert_eq!(second.max_x(), Au::from_px(300));
}

#[test]
fn test_columns_can_be_turned_off() {
    let _ = env_logger::builder().is_test(true).try_init();
    let options = LayoutOptions {
        columns_enabled: false,
        ..LayoutOptions::default()
    };
    let (tree, multicol) = two_columns(options);

    assert!(tree[multicol].block().unwrap().column_info().is_none());
    assert!(column_rect_at(&tree, multicol, 0).is_none());
    assert_eq!(tree.frame(multicol).unwrap().size.block, Au::from_px(200));
}

#[test]
fn test_rects_in_flow_coordinates_move_into_their_column() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (tree, multicol) = two_columns(LayoutOptions::default());

    // Flow offset 120 is 20px into the second column, which starts at 140 + 20.
    let moved = adjust_rect_for_columns(&tree, multicol, px_rect(10, 120, 20, 10));
    assert_eq!(moved, px_rect(170, 20, 20, 10));

    // A rect across the column boundary covers both of its pieces.
    let split = adjust_rect_for_columns(&tree, multicol, px_rect(0, 90, 40, 20));
    assert_eq!(split, px_rect(0, 0, 200, 100));
}

#[test]
fn test_points_over_columns_map_back_to_flow_coordinates() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (tree, multicol) = two_columns(LayoutOptions::default());

    assert_eq!(
        adjust_point_to_column_contents(&tree, multicol, px_point(170, 20)),
        px_point(10, 120)
    );
    assert_eq!(
        adjust_point_to_column_contents(&tree, multicol, px_point(30, 40)),
        px_point(30, 40)
    );
    // The left half of the gap belongs to the first column.
    assert_eq!(
        adjust_point_to_column_contents(&tree, multicol, px_point(145, 40)),
        px_point(145, 40)
    );
}

#[test]
fn test_blocks_without_columns_are_not_adjusted() {
    let _ = env_logger::builder().is_test(true).try_init();
    let options = LayoutOptions {
        columns_enabled: false,
        ..LayoutOptions::default()
    };
    let (tree, multicol) = two_columns(options);

    let rect = px_rect(10, 120, 20, 10);
    assert_eq!(adjust_rect_for_columns(&tree, multicol, rect), rect);
    assert_eq!(adjust_point_to_column_contents(&tree, multicol, px_point(170, 20)), px_point(170, 20));
}

#[test]
fn test_column_height_covers_the_distance_between_forced_breaks() {
    let _ = env_logger::builder().is_test(true).try_init();
    let children = vec![
        sized_block(120),
        BoxStyle {
            column_break_before: BreakValue::Always,
            ..sized_block(20)
        },
    ];
    let (tree, multicol, children) = layout_multicol(LayoutOptions::default(), 300, 2, 20, &children);

    // Balancing alone would give 70px columns; the break sits 120px down.
    let info = tree[multicol].block().and_then(|block| block.column_info()).unwrap();
    assert_eq!(info.column_height(), Au::from_px(120));
    assert_eq!(info.column_count(), 2);
    assert_eq!(tree.frame(children[1]).unwrap().start_corner.block, Au::from_px(120));
    assert_eq!(tree.frame(multicol).unwrap().size.block, Au::from_px(120));
}
