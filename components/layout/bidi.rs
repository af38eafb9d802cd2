/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Bidirectional runs of inline content.
//!
//! Inline content is walked with an [`InlineIterator`], one character (or one atomic item)
//! at a time. A [`BidiResolver`] is told about embeddings as the walk enters and leaves
//! inline boxes and assigns a level to every character. Maximal stretches of one item with
//! one level become [`BidiRun`]s.

use log::trace;
use smallvec::SmallVec;
use unicode_bidi::{BidiClass, Level, bidi_class};

use crate::arena::{Arena, Handle};
use crate::box_tree::{BoxId, BoxKind, BoxTree};
use crate::style::UnicodeBidi;

/// The object replacement character, standing in for atomic inline content.
const OBJECT_REPLACEMENT_CHARACTER: char = '\u{FFFC}';

/// Embedding depth limit of the Unicode bidi algorithm.
const MAX_EMBEDDING_DEPTH: u8 = 125;

/// Assigns bidi levels to inline content in logical order.
pub trait BidiResolver {
    /// Starts a new paragraph with base level `base`, dropping all embeddings.
    fn reset(&mut self, base: Level);

    /// Enters an inline box with `unicode-bidi: embed` (or `bidi-override` when
    /// `is_override` is set).
    fn push_embedding(&mut self, rtl: bool, is_override: bool);

    fn pop_embedding(&mut self);

    /// Level of the next character.
    fn level_for_char(&mut self, character: char) -> Level;

    /// Level of the next atomic item (replaced content, inline blocks, line breaks).
    fn level_for_object(&mut self) -> Level {
        self.level_for_char(OBJECT_REPLACEMENT_CHARACTER)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum StrongDirection {
    Ltr,
    Rtl,
}

#[derive(Clone, Copy, Debug)]
struct Embedding {
    level: Level,
    /// The direction forced on every character by `bidi-override`.
    override_direction: Option<StrongDirection>,
    /// Pushes past the depth limit are recorded as no-ops so that pops stay balanced.
    overflowed: bool,
}

/// A streaming resolver: explicit embeddings, W1 and W7, the implicit rules and a
/// simplified neutral rule where neutrals take the direction of the preceding strong
/// character (or of their embedding).
#[derive(Clone, Debug)]
pub struct EmbeddingLevelResolver {
    base: Level,
    stack: SmallVec<[Embedding; 4]>,
    last_strong: Option<StrongDirection>,
    last_level: Option<Level>,
}

impl Default for EmbeddingLevelResolver {
    fn default() -> Self {
        EmbeddingLevelResolver::new(Level::ltr())
    }
}

impl EmbeddingLevelResolver {
    pub fn new(base: Level) -> Self {
        let mut resolver = EmbeddingLevelResolver {
            base,
            stack: SmallVec::new(),
            last_strong: None,
            last_level: None,
        };
        resolver.reset(base);
        resolver
    }

    fn current(&self) -> Embedding {
        self.stack.last().copied().unwrap_or(Embedding {
            level: self.base,
            override_direction: None,
            overflowed: false,
        })
    }

    fn embedding_direction(&self) -> StrongDirection {
        if self.current().level.is_rtl() {
            StrongDirection::Rtl
        } else {
            StrongDirection::Ltr
        }
    }
}

impl BidiResolver for EmbeddingLevelResolver {
    fn reset(&mut self, base: Level) {
        self.base = base;
        self.stack.clear();
        self.last_strong = None;
        self.last_level = None;
    }

    fn push_embedding(&mut self, rtl: bool, is_override: bool) {
        let current = self.current();
        let number = current.level.number();
        let next = if rtl { (number + 1) | 1 } else { (number + 2) & !1 };
        let direction = if rtl {
            StrongDirection::Rtl
        } else {
            StrongDirection::Ltr
        };
        let embedding = match Level::new(next) {
            Ok(level) if next <= MAX_EMBEDDING_DEPTH && !current.overflowed => Embedding {
                level,
                override_direction: is_override.then_some(direction),
                overflowed: false,
            },
            _ => Embedding {
                overflowed: true,
                ..current
            },
        };
        self.stack.push(embedding);
        self.last_strong = None;
    }

    fn pop_embedding(&mut self) {
        self.stack.pop();
        self.last_strong = None;
    }

    fn level_for_char(&mut self, character: char) -> Level {
        let embedding = self.current();
        let level = embedding.level;
        let raise = |by: u8| Level::new(level.number() + by).unwrap_or(level);

        let direction = match embedding.override_direction {
            Some(direction) => Some(direction),
            None => match bidi_class(character) {
                BidiClass::L => Some(StrongDirection::Ltr),
                BidiClass::R | BidiClass::AL => Some(StrongDirection::Rtl),
                BidiClass::EN | BidiClass::AN => None,
                // Segment and paragraph separators go back to the paragraph level.
                BidiClass::B | BidiClass::S => {
                    self.last_level = Some(self.base);
                    return self.base;
                },
                // Marks take the level of what they attach to.
                BidiClass::NSM | BidiClass::BN => {
                    if let Some(previous) = self.last_level {
                        return previous;
                    }
                    Some(self.last_strong.unwrap_or_else(|| self.embedding_direction()))
                },
                _ => Some(self.last_strong.unwrap_or_else(|| self.embedding_direction())),
            },
        };

        let resolved = match direction {
            Some(StrongDirection::Ltr) => {
                if embedding.override_direction.is_none() && is_strong(character) {
                    self.last_strong = Some(StrongDirection::Ltr);
                }
                if level.is_rtl() {
                    raise(1)
                } else {
                    level
                }
            },
            Some(StrongDirection::Rtl) => {
                if embedding.override_direction.is_none() && is_strong(character) {
                    self.last_strong = Some(StrongDirection::Rtl);
                }
                if level.is_rtl() {
                    level
                } else {
                    raise(1)
                }
            },
            // Numbers: European digits after left-to-right text are left-to-right (W7),
            // otherwise the implicit rules raise them.
            None => {
                let after_ltr = self
                    .last_strong
                    .unwrap_or_else(|| self.embedding_direction()) ==
                    StrongDirection::Ltr;
                if bidi_class(character) == BidiClass::EN && after_ltr {
                    if level.is_rtl() {
                        raise(1)
                    } else {
                        level
                    }
                } else if level.is_rtl() {
                    raise(1)
                } else {
                    raise(2)
                }
            },
        };
        self.last_level = Some(resolved);
        resolved
    }
}

fn is_strong(character: char) -> bool {
    matches!(bidi_class(character), BidiClass::L | BidiClass::R | BidiClass::AL)
}

/// Whether `item` is something the inline walk stops at.
fn is_iterator_target(tree: &BoxTree, item: BoxId) -> bool {
    !matches!(tree[item].kind, BoxKind::Inline)
}

/// Whether `item` is an inline box with no content at all.
fn is_empty_inline(tree: &BoxTree, item: BoxId) -> bool {
    matches!(tree[item].kind, BoxKind::Inline) &&
        tree
            .children(item)
            .iter()
            .all(|child| is_empty_inline(tree, *child))
}

fn notify_entered(tree: &BoxTree, observer: &mut Option<&mut dyn BidiResolver>, item: BoxId) {
    let Some(observer) = observer.as_deref_mut() else {
        return;
    };
    if !matches!(tree[item].kind, BoxKind::Inline) {
        return;
    }
    let style = &tree[item].style;
    let rtl = !style.is_left_to_right_direction();
    match style.unicode_bidi {
        UnicodeBidi::Normal => {},
        UnicodeBidi::Embed => observer.push_embedding(rtl, false),
        UnicodeBidi::BidiOverride => observer.push_embedding(rtl, true),
    }
}

fn notify_will_exit(tree: &BoxTree, observer: &mut Option<&mut dyn BidiResolver>, item: BoxId) {
    let Some(observer) = observer.as_deref_mut() else {
        return;
    };
    if matches!(tree[item].kind, BoxKind::Inline) &&
        tree[item].style.unicode_bidi != UnicodeBidi::Normal
    {
        observer.pop_embedding();
    }
}

/// What the inline walk does with inline boxes that contain nothing.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EmptyInlineBehavior {
    Skip,
    /// Stop at every inline box, once on the way out. Used to size empty inlines.
    Include,
}

/// The next item after `current` in the inline content of `root`, in tree order.
/// `end_of_inline` tells whether the returned inline box is being left rather than
/// entered; it has to be passed back in on the next call.
pub(crate) fn bidi_next(
    tree: &BoxTree,
    root: BoxId,
    current: BoxId,
    mut observer: Option<&mut dyn BidiResolver>,
    behavior: EmptyInlineBehavior,
    end_of_inline: &mut bool,
) -> Option<BoxId> {
    let include_empty = behavior == EmptyInlineBehavior::Include;
    let is_inline = |item: BoxId| matches!(tree[item].kind, BoxKind::Inline);
    let mut leaving = *end_of_inline;
    let mut reached_end_of_inline = false;
    let mut current = current;
    let mut next;

    loop {
        next = None;
        if !leaving && !is_iterator_target(tree, current) {
            next = tree.children(current).first().copied();
            if let Some(child) = next {
                notify_entered(tree, &mut observer, child);
            }
        }

        if next.is_none() {
            if include_empty && !leaving && is_inline(current) {
                next = Some(current);
                reached_end_of_inline = true;
                break;
            }

            let mut walker = current;
            while walker != root {
                notify_will_exit(tree, &mut observer, walker);
                next = tree.next_sibling(walker);
                if let Some(sibling) = next {
                    notify_entered(tree, &mut observer, sibling);
                    break;
                }
                let Some(parent) = tree.parent(walker) else {
                    break;
                };
                walker = parent;
                if include_empty && walker != root && is_inline(walker) {
                    next = Some(walker);
                    reached_end_of_inline = true;
                    break;
                }
            }
        }

        let Some(candidate) = next else {
            break;
        };
        if reached_end_of_inline ||
            is_iterator_target(tree, candidate) ||
            ((include_empty || is_empty_inline(tree, candidate)) && is_inline(candidate))
        {
            break;
        }
        current = candidate;
        leaving = false;
    }

    *end_of_inline = reached_end_of_inline;
    next
}

/// A position in the inline content of a block: an item and an offset into it (a byte
/// offset for text, 0 or 1 for atomic items).
#[derive(Clone, Copy, Debug)]
pub struct InlineIterator {
    root: BoxId,
    item: Option<BoxId>,
    offset: usize,
    /// Cached next break opportunity in the current text item.
    next_breakable: Option<usize>,
}

impl PartialEq for InlineIterator {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.item == other.item && self.offset == other.offset
    }
}

impl Eq for InlineIterator {}

impl InlineIterator {
    pub fn new(root: BoxId, item: Option<BoxId>, offset: usize) -> Self {
        InlineIterator {
            root,
            item,
            offset,
            next_breakable: None,
        }
    }

    /// The first item of `root`'s inline content, skipping empty inline boxes.
    pub fn first(tree: &BoxTree, root: BoxId) -> Self {
        Self::first_with_observer(tree, root, None)
    }

    fn first_with_observer(tree: &BoxTree, root: BoxId, mut observer: Option<&mut dyn BidiResolver>) -> Self {
        let Some(&first) = tree.children(root).first() else {
            return InlineIterator::new(root, None, 0);
        };
        notify_entered(tree, &mut observer, first);
        let item = if is_iterator_target(tree, first) || is_empty_inline(tree, first) {
            Some(first)
        } else {
            let mut end_of_inline = false;
            bidi_next(
                tree,
                root,
                first,
                observer,
                EmptyInlineBehavior::Skip,
                &mut end_of_inline,
            )
        };
        InlineIterator::new(root, item, 0)
    }

    pub fn root(&self) -> BoxId {
        self.root
    }

    pub fn item(&self) -> Option<BoxId> {
        self.item
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn at_end(&self) -> bool {
        self.item.is_none()
    }

    pub(crate) fn next_breakable(&self) -> Option<usize> {
        self.next_breakable.filter(|breakable| *breakable >= self.offset)
    }

    pub(crate) fn set_next_breakable(&mut self, breakable: Option<usize>) {
        self.next_breakable = breakable;
    }

    /// The character at the cursor. Atomic items read as the object replacement character.
    pub fn current_char(&self, tree: &BoxTree) -> Option<char> {
        let item = self.item?;
        match tree[item].kind {
            BoxKind::Text(ref text) => text.get(self.offset..)?.chars().next(),
            BoxKind::Inline => None,
            _ => Some(OBJECT_REPLACEMENT_CHARACTER),
        }
    }

    /// Moves one character forward, or to the next item.
    pub fn increment(&mut self, tree: &BoxTree, observer: Option<&mut dyn BidiResolver>) {
        let Some(item) = self.item else {
            return;
        };
        if let BoxKind::Text(ref text) = tree[item].kind {
            if let Some(character) = text.get(self.offset..).and_then(|rest| rest.chars().next()) {
                self.offset += character.len_utf8();
            }
            if self.offset < text.len() {
                return;
            }
        }
        self.move_to_next_item(tree, observer);
    }

    pub(crate) fn move_to_next_item(&mut self, tree: &BoxTree, observer: Option<&mut dyn BidiResolver>) {
        let Some(item) = self.item else {
            return;
        };
        let mut end_of_inline = false;
        self.item = bidi_next(
            tree,
            self.root,
            item,
            observer,
            EmptyInlineBehavior::Skip,
            &mut end_of_inline,
        );
        self.offset = 0;
        self.next_breakable = None;
    }
}

/// Maximal stretch `[start, stop)` of one item at one level.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BidiRun {
    pub item: BoxId,
    pub start: usize,
    pub stop: usize,
    pub level: Level,
}

impl BidiRun {
    pub fn len(&self) -> usize {
        self.stop - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.stop
    }

    pub fn is_rtl(&self) -> bool {
        self.level.is_rtl()
    }
}

pub type RunHandle = Handle<BidiRun>;

/// The runs of one line (or paragraph), in logical order.
#[derive(Debug, Default)]
pub struct RunList {
    runs: Arena<BidiRun>,
    logical_order: Vec<RunHandle>,
}

impl RunList {
    pub fn new() -> Self {
        RunList::default()
    }

    pub fn len(&self) -> usize {
        self.logical_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logical_order.is_empty()
    }

    pub fn get(&self, handle: RunHandle) -> Option<&BidiRun> {
        self.runs.get(handle)
    }

    pub fn handles(&self) -> &[RunHandle] {
        &self.logical_order
    }

    /// Runs in logical order.
    pub fn iter(&self) -> impl Iterator<Item = &BidiRun> + '_ {
        self.logical_order.iter().map(move |handle| &self.runs[*handle])
    }

    pub(crate) fn append(&mut self, run: BidiRun) -> RunHandle {
        debug_assert!(run.start <= run.stop);
        let handle = self.runs.insert(run);
        self.logical_order.push(handle);
        handle
    }

    pub fn clear(&mut self) {
        self.runs.clear();
        self.logical_order.clear();
    }

    /// Runs in visual order: from the highest level down to the lowest odd level, every
    /// sequence of runs at that level or above is reversed.
    pub fn visual_order(&self) -> Vec<RunHandle> {
        let mut order = self.logical_order.clone();
        let levels = |order: &[RunHandle]| -> Vec<u8> {
            order.iter().map(|handle| self.runs[*handle].level.number()).collect()
        };
        let Some(highest) = levels(&order).into_iter().max() else {
            return order;
        };
        let Some(lowest_odd) = levels(&order).into_iter().filter(|level| level % 2 == 1).min() else {
            return order;
        };

        let mut level = highest;
        while level >= lowest_odd {
            let current = levels(&order);
            let mut index = 0;
            while index < order.len() {
                if current[index] < level {
                    index += 1;
                    continue;
                }
                let start = index;
                while index < order.len() && current[index] >= level {
                    index += 1;
                }
                order[start..index].reverse();
            }
            if level == 0 {
                break;
            }
            level -= 1;
        }
        order
    }
}

/// Base level of the paragraph in `root`.
pub(crate) fn paragraph_level(tree: &BoxTree, root: BoxId) -> Level {
    if tree[root].style.is_left_to_right_direction() {
        Level::ltr()
    } else {
        Level::rtl()
    }
}

/// Rebuilds the embeddings the resolver would have seen when walking up to `cursor`.
/// An inline box under the cursor has been entered but not exited yet, so its own
/// embedding is open too.
fn restore_embeddings(tree: &BoxTree, cursor: &InlineIterator, resolver: &mut dyn BidiResolver) {
    resolver.reset(paragraph_level(tree, cursor.root));
    let Some(item) = cursor.item else {
        return;
    };
    let mut chain: SmallVec<[BoxId; 8]> = std::iter::once(item)
        .chain(tree.ancestors(item))
        .take_while(|ancestor| *ancestor != cursor.root)
        .collect();
    chain.reverse();
    let mut observer: Option<&mut dyn BidiResolver> = Some(resolver);
    for ancestor in chain {
        notify_entered(tree, &mut observer, ancestor);
    }
}

/// Whether `item` contributes content to lines. Floats and positioned boxes that were
/// block-level before being taken out of flow do not.
pub(crate) fn produces_runs(tree: &BoxTree, item: BoxId) -> bool {
    let node = &tree[item];
    match node.kind {
        BoxKind::Inline => false,
        BoxKind::Text(_) | BoxKind::LineBreak => true,
        BoxKind::Replaced { .. } | BoxKind::Block(_) => {
            if node.is_floating() {
                return false;
            }
            if node.is_out_of_flow_positioned() {
                return node.style.is_inline_level();
            }
            true
        },
    }
}

/// Appends the runs from `start` up to `end` (exclusive; `None` for the end of the
/// content) and returns where it stopped: at `end`, right after a hard line break, or at
/// the end of the content.
fn append_runs(
    tree: &BoxTree,
    start: &InlineIterator,
    end: Option<&InlineIterator>,
    resolver: &mut dyn BidiResolver,
    runs: &mut RunList,
) -> InlineIterator {
    restore_embeddings(tree, start, resolver);
    let mut cursor = *start;
    let mut pending: Option<BidiRun> = None;
    let flush = |pending: &mut Option<BidiRun>, runs: &mut RunList| {
        if let Some(run) = pending.take() {
            if !run.is_empty() {
                runs.append(run);
            }
        }
    };

    while let Some(item) = cursor.item {
        if end.is_some_and(|end| *end == cursor) {
            break;
        }
        if !produces_runs(tree, item) {
            flush(&mut pending, runs);
            cursor.move_to_next_item(tree, Some(&mut *resolver));
            continue;
        }

        match tree[item].kind {
            BoxKind::Text(ref text) => {
                let Some(character) = text.get(cursor.offset..).and_then(|rest| rest.chars().next()) else {
                    flush(&mut pending, runs);
                    cursor.move_to_next_item(tree, Some(&mut *resolver));
                    continue;
                };
                let level = resolver.level_for_char(character);
                let extends = pending.is_some_and(|run| run.item == item && run.level == level);
                if !extends {
                    flush(&mut pending, runs);
                    pending = Some(BidiRun {
                        item,
                        start: cursor.offset,
                        stop: cursor.offset,
                        level,
                    });
                }
                if let Some(run) = pending.as_mut() {
                    run.stop = cursor.offset + character.len_utf8();
                }
                let hard_break = character == '\n' && tree[item].style.white_space.preserves_newlines();
                cursor.increment(tree, Some(&mut *resolver));
                if hard_break {
                    flush(&mut pending, runs);
                    return cursor;
                }
            },
            BoxKind::LineBreak => {
                flush(&mut pending, runs);
                let level = resolver.level_for_object();
                runs.append(BidiRun {
                    item,
                    start: 0,
                    stop: 1,
                    level,
                });
                cursor.move_to_next_item(tree, Some(&mut *resolver));
                return cursor;
            },
            _ => {
                flush(&mut pending, runs);
                let level = resolver.level_for_object();
                runs.append(BidiRun {
                    item,
                    start: 0,
                    stop: 1,
                    level,
                });
                cursor.move_to_next_item(tree, Some(&mut *resolver));
            },
        }
    }
    flush(&mut pending, runs);
    cursor
}

/// Builds the runs of the paragraph starting at `cursor`: up to and including the next
/// hard line break, or to the end of the content. Returns the runs and the cursor where
/// the next paragraph starts.
pub fn build_bidi_runs(
    tree: &BoxTree,
    cursor: &InlineIterator,
    resolver: &mut dyn BidiResolver,
) -> (RunList, InlineIterator) {
    let mut runs = RunList::new();
    let end = append_runs(tree, cursor, None, resolver, &mut runs);
    trace!("Built {} runs from {:?} to {:?}", runs.len(), cursor, end);
    (runs, end)
}

/// Builds the runs of one line, between two cursors of the same content.
pub(crate) fn build_bidi_runs_for_line(
    tree: &BoxTree,
    start: &InlineIterator,
    end: &InlineIterator,
    resolver: &mut dyn BidiResolver,
) -> RunList {
    let mut runs = RunList::new();
    let mut cursor = *start;
    // A line can hold several hard breaks only when the caller passes a range that spans
    // paragraphs; keep going until `end`.
    while !cursor.at_end() && cursor != *end {
        let next = append_runs(tree, &cursor, Some(end), resolver, &mut runs);
        if next == cursor {
            break;
        }
        cursor = next;
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(resolver: &mut EmbeddingLevelResolver, text: &str) -> Vec<u8> {
        text.chars()
            .map(|character| resolver.level_for_char(character).number())
            .collect()
    }

    #[test]
    fn test_hebrew_in_ltr_paragraph_is_raised() {
        let mut resolver = EmbeddingLevelResolver::default();
        assert_eq!(levels(&mut resolver, "ab \u{05D0}\u{05D1}"), vec![0, 0, 0, 1, 1]);
    }

    #[test]
    fn test_digits_after_latin_stay_ltr() {
        let mut resolver = EmbeddingLevelResolver::default();
        assert_eq!(levels(&mut resolver, "a1"), vec![0, 0]);
        let mut resolver = EmbeddingLevelResolver::new(Level::rtl());
        assert_eq!(levels(&mut resolver, "\u{05D0}1"), vec![1, 2]);
    }

    #[test]
    fn test_override_forces_direction() {
        let mut resolver = EmbeddingLevelResolver::default();
        resolver.push_embedding(true, true);
        assert_eq!(levels(&mut resolver, "ab"), vec![1, 1]);
        resolver.pop_embedding();
        assert_eq!(levels(&mut resolver, "ab"), vec![0, 0]);
    }

    #[test]
    fn test_embedding_overflow_stays_balanced() {
        let mut resolver = EmbeddingLevelResolver::default();
        for _ in 0..200 {
            resolver.push_embedding(false, false);
        }
        for _ in 0..200 {
            resolver.pop_embedding();
        }
        assert_eq!(resolver.level_for_char('a').number(), 0);
    }

    #[test]
    fn test_visual_order_reverses_rtl_sequences() {
        let mut tree = BoxTree::new();
        let text = tree.new_text("x", crate::style::BoxStyle::inline());
        let mut runs = RunList::new();
        let level = |number| Level::new(number).unwrap();
        let a = runs.append(BidiRun { item: text, start: 0, stop: 1, level: level(0) });
        let b = runs.append(BidiRun { item: text, start: 1, stop: 2, level: level(1) });
        let c = runs.append(BidiRun { item: text, start: 2, stop: 3, level: level(2) });
        let d = runs.append(BidiRun { item: text, start: 3, stop: 4, level: level(1) });
        assert_eq!(runs.visual_order(), vec![a, d, c, b]);
    }
}
