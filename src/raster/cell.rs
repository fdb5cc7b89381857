//SPDX-License-Identifier: MPL-2.0

use std::fmt::{Debug, Formatter};
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

/**
A value that may only be touched from the thread that created it.

The cell itself can be shared freely; every access asserts the current thread.  Code on
other threads reaches the value by sending a job to the owning thread.
*/
pub struct ConfinedCell<T> {
    owner: ThreadId,
    value: Mutex<T>,
}

pub struct ConfinedGuard<'a, T> {
    guard: MutexGuard<'a, T>,
}

impl<'a, T> Deref for ConfinedGuard<'a, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<'a, T> DerefMut for ConfinedGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl<'a, T: Debug> Debug for ConfinedGuard<'a, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfinedGuard")
            .field("value", &*self.guard)
            .finish()
    }
}

impl<T> ConfinedCell<T> {
    /// Confines `value` to the calling thread.
    pub fn new(value: T) -> Self {
        ConfinedCell {
            owner: thread::current().id(),
            value: Mutex::new(value),
        }
    }

    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    #[inline]
    pub fn verify_thread(&self) {
        assert_eq!(
            thread::current().id(),
            self.owner,
            "ConfinedCell accessed from a thread other than its owner"
        );
    }

    /// Locks the value.
    ///
    /// A panic while a previous guard was held does not poison the cell.
    ///
    /// # Panics
    /// When called from any thread but the owner.
    pub fn lock(&self) -> ConfinedGuard<'_, T> {
        self.verify_thread();
        ConfinedGuard {
            guard: self.value.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    pub fn assume<C, R>(&self, c: C) -> R
    where
        C: FnOnce(&mut T) -> R,
    {
        let mut guard = self.lock();
        c(&mut guard)
    }
}

impl<T> Debug for ConfinedCell<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfinedCell")
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}
