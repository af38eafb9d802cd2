/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use block_layout::{
    BidiRun, BoxId, BoxStyle, BoxTree, EmbeddingLevelResolver, InlineIterator, UnicodeBidi, WritingMode,
    build_bidi_runs,
};
use quickcheck::quickcheck;

const ALPHABET: [char; 8] = ['a', 'b', ' ', 'א', 'ב', '1', '.', 'ش'];
const STRONG: [char; 4] = ['a', 'b', 'א', 'ב'];

/// The boxes of a generated paragraph in document order, with the text length of each
/// text item (`None` for inline boxes).
struct Nested {
    tree: BoxTree,
    root: BoxId,
    items: Vec<(BoxId, Option<usize>)>,
}

/// Builds a paragraph of text items and nested, possibly empty, embedding spans from
/// `ops`. Only strong characters are used, so a character's level depends on its
/// embeddings alone.
fn nested_paragraph(ops: &[u8], rtl: bool) -> Nested {
    let mut tree = BoxTree::new();
    let root = tree.new_block(BoxStyle {
        writing_mode: if rtl { WritingMode::RTL } else { WritingMode::empty() },
        ..BoxStyle::block()
    });
    tree.set_root(root);
    let mut open = vec![root];
    let mut items = Vec::new();
    for (index, op) in ops.iter().enumerate() {
        let parent = *open.last().unwrap();
        let span_style = |op: u8| BoxStyle {
            writing_mode: if op / 6 % 2 == 1 { WritingMode::RTL } else { WritingMode::empty() },
            unicode_bidi: if op / 12 % 2 == 1 { UnicodeBidi::BidiOverride } else { UnicodeBidi::Embed },
            ..BoxStyle::inline()
        };
        match op % 6 {
            2 => {
                let span = tree.new_inline(span_style(*op));
                tree.append_child(parent, span);
                items.push((span, None));
                open.push(span);
            },
            3 => {
                if open.len() > 1 {
                    open.pop();
                }
            },
            4 => {
                let span = tree.new_inline(span_style(*op));
                tree.append_child(parent, span);
                items.push((span, None));
            },
            _ => {
                let text: String = (0..1 + *op as usize / 6 % 3)
                    .map(|offset| STRONG[(index + offset + *op as usize / 18) % STRONG.len()])
                    .collect();
                let len = text.len();
                let item = tree.new_text(text, BoxStyle::inline());
                tree.append_child(parent, item);
                items.push((item, Some(len)));
            },
        }
    }
    Nested { tree, root, items }
}

fn runs_from(tree: &BoxTree, cursor: InlineIterator) -> Vec<BidiRun> {
    let mut resolver = EmbeddingLevelResolver::default();
    let (runs, _) = build_bidi_runs(tree, &cursor, &mut resolver);
    runs.iter().copied().collect()
}

fn paragraph(text: &str, writing_mode: WritingMode) -> (BoxTree, BoxId, BoxId) {
    let mut tree = BoxTree::new();
    let root = tree.new_block(BoxStyle {
        writing_mode,
        ..BoxStyle::block()
    });
    tree.set_root(root);
    let item = tree.new_text(text, BoxStyle::inline());
    tree.append_child(root, item);
    (tree, root, item)
}

fn runs_of(tree: &BoxTree, root: BoxId) -> Vec<BidiRun> {
    let mut resolver = EmbeddingLevelResolver::default();
    let (runs, end) = build_bidi_runs(tree, &InlineIterator::first(tree, root), &mut resolver);
    assert!(end.at_end());
    runs.iter().copied().collect()
}

fn levels(runs: &[BidiRun]) -> Vec<u8> {
    runs.iter().map(|run| run.level.number()).collect()
}

quickcheck! {
    fn runs_cover_the_text_in_order(picks: Vec<u8>, rtl: bool) -> bool {
        let text: String = picks.iter().map(|pick| ALPHABET[*pick as usize % ALPHABET.len()]).collect();
        let writing_mode = if rtl { WritingMode::RTL } else { WritingMode::empty() };
        let (tree, root, item) = paragraph(&text, writing_mode);
        let runs = runs_of(&tree, root);

        let mut offset = 0;
        for run in &runs {
            if run.item != item || run.start != offset || run.is_empty() {
                return false;
            }
            offset = run.stop;
        }
        // Neighbouring runs differ in level, or they would be one run.
        offset == text.len() && runs.windows(2).all(|pair| pair[0].level != pair[1].level)
    }

    fn runs_cover_nested_text_in_document_order(ops: Vec<u8>, rtl: bool) -> bool {
        let nested = nested_paragraph(&ops, rtl);
        let runs = runs_of(&nested.tree, nested.root);
        let texts: Vec<(BoxId, usize)> = nested
            .items
            .iter()
            .filter_map(|(item, len)| len.map(|len| (*item, len)))
            .collect();

        let (mut index, mut offset) = (0, 0);
        for run in &runs {
            let Some((item, len)) = texts.get(index) else {
                return false;
            };
            if run.item != *item || run.start != offset || run.is_empty() {
                return false;
            }
            offset = run.stop;
            if offset == *len {
                index += 1;
                offset = 0;
            }
        }
        index == texts.len() && offset == 0
    }

    fn restarting_from_any_position_matches_the_full_walk(ops: Vec<u8>, rtl: bool) -> bool {
        let nested = nested_paragraph(&ops, rtl);
        let (tree, root) = (&nested.tree, nested.root);
        let full = runs_of(tree, root);
        let position = |item: BoxId| nested.items.iter().position(|(candidate, _)| *candidate == item);

        // From the start of every run.
        let from_runs = full.iter().enumerate().all(|(index, run)| {
            runs_from(tree, InlineIterator::new(root, Some(run.item), run.start)) == full[index..].to_vec()
        });
        // From every inline box, empty or not.
        let from_inlines = nested.items.iter().filter(|(_, len)| len.is_none()).all(|(span, _)| {
            let expected: Vec<BidiRun> = full
                .iter()
                .copied()
                .filter(|run| position(run.item) > position(*span))
                .collect();
            runs_from(tree, InlineIterator::new(root, Some(*span), 0)) == expected
        });
        from_runs && from_inlines
    }

    fn runs_are_deterministic(picks: Vec<u8>) -> bool {
        let text: String = picks.iter().map(|pick| ALPHABET[*pick as usize % ALPHABET.len()]).collect();
        let (tree, root, _) = paragraph(&text, WritingMode::empty());
        runs_of(&tree, root) == runs_of(&tree, root)
    }
}

#[test]
fn test_hebrew_inside_latin_gets_its_own_run() {
    let (tree, root, _) = paragraph("abc אבג def", WritingMode::empty());
    let runs = runs_of(&tree, root);
    assert_eq!(levels(&runs), vec![0, 1, 0]);
    assert_eq!((runs[0].start, runs[0].stop), (0, 4));
    assert_eq!((runs[1].start, runs[1].stop), (4, 11));
    assert_eq!((runs[2].start, runs[2].stop), (11, 14));
    assert!(runs[1].is_rtl());
}

#[test]
fn test_right_to_left_paragraph_reverses_visual_order() {
    let (tree, root, _) = paragraph("abc אבג", WritingMode::RTL);
    let mut resolver = EmbeddingLevelResolver::default();
    let (runs, _) = build_bidi_runs(&tree, &InlineIterator::first(&tree, root), &mut resolver);
    let logical: Vec<BidiRun> = runs.iter().copied().collect();
    assert_eq!(levels(&logical), vec![2, 1]);

    let visual: Vec<BidiRun> = runs
        .visual_order()
        .into_iter()
        .filter_map(|handle| runs.get(handle).copied())
        .collect();
    assert_eq!(visual, vec![logical[1], logical[0]]);
}

#[test]
fn test_override_forces_the_direction_of_its_content() {
    let mut tree = BoxTree::new();
    let root = tree.new_block(BoxStyle::block());
    tree.set_root(root);
    let before = tree.new_text("ab ", BoxStyle::inline());
    let span = tree.new_inline(BoxStyle {
        writing_mode: WritingMode::RTL,
        unicode_bidi: UnicodeBidi::BidiOverride,
        ..BoxStyle::inline()
    });
    let inside = tree.new_text("cd", BoxStyle::inline());
    tree.append_child(span, inside);
    let after = tree.new_text(" ef", BoxStyle::inline());
    tree.append_child(root, before);
    tree.append_child(root, span);
    tree.append_child(root, after);

    let runs = runs_of(&tree, root);
    let items: Vec<BoxId> = runs.iter().map(|run| run.item).collect();
    assert_eq!(items, vec![before, inside, after]);
    assert_eq!(levels(&runs), vec![0, 1, 0]);
}

#[test]
fn test_restart_at_an_empty_span_keeps_the_enclosing_embedding() {
    let mut tree = BoxTree::new();
    let root = tree.new_block(BoxStyle::block());
    tree.set_root(root);
    let outer = tree.new_inline(BoxStyle {
        writing_mode: WritingMode::RTL,
        unicode_bidi: UnicodeBidi::Embed,
        ..BoxStyle::inline()
    });
    let first = tree.new_text("ab", BoxStyle::inline());
    let empty = tree.new_inline(BoxStyle {
        unicode_bidi: UnicodeBidi::Embed,
        ..BoxStyle::inline()
    });
    let second = tree.new_text("cd", BoxStyle::inline());
    tree.append_child(outer, first);
    tree.append_child(outer, empty);
    tree.append_child(outer, second);
    tree.append_child(root, outer);

    let full = runs_of(&tree, root);
    assert_eq!(full.iter().map(|run| run.item).collect::<Vec<_>>(), vec![first, second]);
    assert_eq!(levels(&full), vec![2, 2]);

    let restarted = runs_from(&tree, InlineIterator::new(root, Some(empty), 0));
    assert_eq!(restarted, full[1..].to_vec());
}
