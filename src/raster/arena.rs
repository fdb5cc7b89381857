// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Generational storage for driver resources.
//!
//! A handle is a slot index plus the generation the slot had when the resource was
//! created.  Deleting a resource bumps the slot's generation, so every handle to the
//! deleted resource stops resolving, even after the slot is reused.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONTEXT: AtomicU64 = AtomicU64::new(1);

/// Identity of the [`Context`](super::Context) that created a resource.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    pub(crate) fn next() -> Self {
        ContextId(NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Index + generation + owning context.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct RawHandle {
    pub(crate) context: ContextId,
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $name(pub(crate) RawHandle);

        impl $name {
            /// The context that created this resource.
            pub fn context(&self) -> ContextId {
                self.0.context
            }
        }
    };
}

resource_id!(
    /// Handle to a texture (and its framebuffer).
    TextureId
);
resource_id!(
    /// Handle to a float buffer.
    BufferId
);
resource_id!(
    /// Handle to a vertex array.
    VertexArrayId
);
resource_id!(
    /// Handle to a linked program.
    ProgramId
);

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

#[derive(Debug)]
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Arena<T> {
    pub(crate) fn new() -> Self {
        Arena {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Returns `(index, generation)` of the new entry.
    pub(crate) fn insert(&mut self, value: T) -> (u32, u32) {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return (index, slot.generation);
        }
        let index = u32::try_from(self.slots.len()).expect("arena index overflow");
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        (index, 0)
    }

    pub(crate) fn get(&self, index: u32, generation: u32) -> Option<&T> {
        self.slots
            .get(index as usize)
            .filter(|s| s.generation == generation)
            .and_then(|s| s.value.as_ref())
    }

    pub(crate) fn get_mut(&mut self, index: u32, generation: u32) -> Option<&mut T> {
        self.slots
            .get_mut(index as usize)
            .filter(|s| s.generation == generation)
            .and_then(|s| s.value.as_mut())
    }

    pub(crate) fn remove(&mut self, index: u32, generation: u32) -> Option<T> {
        let slot = self
            .slots
            .get_mut(index as usize)
            .filter(|s| s.generation == generation)?;
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        self.len -= 1;
        Some(value)
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_handle_does_not_resolve_after_reuse() {
        let mut arena = Arena::new();
        let (i1, g1) = arena.insert("first");
        assert_eq!(arena.remove(i1, g1), Some("first"));
        let (i2, g2) = arena.insert("second");
        assert_eq!(i1, i2);
        assert_ne!(g1, g2);
        assert_eq!(arena.get(i1, g1), None);
        assert_eq!(arena.get(i2, g2), Some(&"second"));
    }

    #[test]
    fn repeated_reuse_keeps_old_generations_dead() {
        let mut arena = Arena::new();
        let (i, g0) = arena.insert(0);
        arena.remove(i, g0);
        let (_, g1) = arena.insert(1);
        arena.remove(i, g1);
        let (_, g2) = arena.insert(2);
        assert!(arena.get(i, g0).is_none());
        assert!(arena.get(i, g1).is_none());
        assert_eq!(arena.get(i, g2), Some(&2));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn double_remove_is_none() {
        let mut arena = Arena::new();
        let (i, g) = arena.insert(5u8);
        assert!(arena.remove(i, g).is_some());
        assert!(arena.remove(i, g).is_none());
        assert_eq!(arena.len(), 0);
    }

    #[test]
    fn contexts_are_distinct() {
        assert_ne!(ContextId::next(), ContextId::next());
    }
}
