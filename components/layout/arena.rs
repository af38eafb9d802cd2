/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Generational arenas for layout-owned records.
//!
//! Float records, line boxes and bidi runs are all allocated in arenas owned by the
//! structure that gives them their lifetime (a block's float list, a block's line list,
//! a line's run list). They are referred to by [`Handle`]s made of the owning arena's
//! identity, a slot index and the slot's generation. Clearing or re-laying out the owner
//! bumps generations, so a handle kept across a layout pass resolves to `None` instead of
//! to whatever record reused the slot.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_ARENA_ID: AtomicU32 = AtomicU32::new(1);

/// Identity of one arena. Two arenas never share an id during the life of the process.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ArenaId(u32);

impl ArenaId {
    fn next() -> Self {
        ArenaId(NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A typed, generation-checked reference into an [`Arena`].
pub struct Handle<T> {
    arena: ArenaId,
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub fn arena(&self) -> ArenaId {
        self.arena
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

// Manual impls so that `T` does not need to implement these traits.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.arena == other.arena && self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.arena.hash(state);
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Handle({}:{}#{})",
            self.arena.0, self.index, self.generation
        )
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// A slot arena with per-slot generations and a free list.
pub struct Arena<T> {
    id: ArenaId,
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Arena {
            id: ArenaId::next(),
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, value: T) -> Handle<T> {
        self.len += 1;
        let index = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                debug_assert!(slot.value.is_none());
                slot.value = Some(value);
                index
            },
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    value: Some(value),
                });
                (self.slots.len() - 1) as u32
            },
        };
        Handle {
            arena: self.id,
            index,
            generation: self.slots[index as usize].generation,
            _marker: PhantomData,
        }
    }

    fn slot(&self, handle: Handle<T>) -> Option<&Slot<T>> {
        if handle.arena != self.id {
            return None;
        }
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
    }

    /// Whether `handle` was produced by this arena and still refers to a live value.
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.slot(handle).is_some_and(|slot| slot.value.is_some())
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.slot(handle).and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        if handle.arena != self.id {
            return None;
        }
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Removes the value behind `handle`. Every copy of the handle becomes stale.
    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        if !self.contains(handle) {
            return None;
        }
        let slot = &mut self.slots[handle.index as usize];
        let value = slot.value.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        value
    }

    /// Drops every value and invalidates every handle handed out so far, keeping the
    /// allocation around for the next layout pass.
    pub fn clear(&mut self) {
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            self.free.push(index as u32);
        }
        // Hand out low indices first so that dumps stay readable.
        self.free.reverse();
        self.len = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        let id = self.id;
        self.slots.iter().enumerate().filter_map(move |(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    Handle {
                        arena: id,
                        index: index as u32,
                        generation: slot.generation,
                        _marker: PhantomData,
                    },
                    value,
                )
            })
        })
    }
}

impl<T> std::ops::Index<Handle<T>> for Arena<T> {
    type Output = T;

    fn index(&self, handle: Handle<T>) -> &T {
        match self.get(handle) {
            Some(value) => value,
            None => panic!("stale or foreign arena handle {handle:?}"),
        }
    }
}

impl<T> std::ops::IndexMut<Handle<T>> for Arena<T> {
    fn index_mut(&mut self, handle: Handle<T>) -> &mut T {
        match self.get_mut(handle) {
            Some(value) => value,
            None => panic!("stale or foreign arena handle {handle:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_handle_is_stale() {
        let mut arena = Arena::new();
        let first = arena.insert("first");
        assert_eq!(arena.remove(first), Some("first"));
        let second = arena.insert("second");

        // The slot is reused but the old handle no longer resolves.
        assert_eq!(first.index(), second.index());
        assert_eq!(arena.get(first), None);
        assert_eq!(arena.get(second), Some(&"second"));
    }

    #[test]
    fn test_clear_invalidates_everything() {
        let mut arena = Arena::new();
        let handles: Vec<_> = (0..4).map(|value| arena.insert(value)).collect();
        arena.clear();
        assert!(arena.is_empty());
        assert!(handles.iter().all(|handle| !arena.contains(*handle)));

        let fresh = arena.insert(10);
        assert_eq!(fresh.index(), 0);
        assert_eq!(arena[fresh], 10);
    }

    #[test]
    fn test_foreign_handles_do_not_resolve() {
        let mut one = Arena::new();
        let mut other = Arena::new();
        let handle = one.insert(1);
        let foreign = other.insert(2);
        assert_eq!(other.get(handle), None);
        assert_eq!(handle.index(), foreign.index());
        assert_ne!(handle.arena(), foreign.arena());
    }
}
