// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Modeled mutex and condition variable, standing in for CDSChecker's
//! `mutex.h`/`conditionvariable.h` in a program under test.
//!
//! Both types are thin handles over a [`crate::ids::Location`]: all of the
//! actual blocking, wake-up, and happens-before bookkeeping lives in
//! [`crate::execution::mutex`]; these wrappers only shape the user-facing
//! calls into the right sequence of proposed actions.

use crate::action::{ActionKind, MemoryOrder, VALUE_TRYSUCCESS};
use crate::api::propose;
use crate::atomic::next_location_id;
use crate::ids::Location;

pub struct Mutex {
    pub(crate) location: Location,
}

impl Mutex {
    pub fn new() -> Self {
        Mutex { location: Location::from_addr(next_location_id()) }
    }

    pub fn lock(&self) {
        propose(ActionKind::Lock, MemoryOrder::SeqCst, self.location, 0);
    }

    /// Returns whether the lock was actually acquired.
    pub fn trylock(&self) -> bool {
        propose(ActionKind::TryLock, MemoryOrder::SeqCst, self.location, 0) == VALUE_TRYSUCCESS
    }

    pub fn unlock(&self) {
        propose(ActionKind::Unlock, MemoryOrder::SeqCst, self.location, 0);
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

/// A condition variable tied to exactly one [`Mutex`] for its whole
/// lifetime. The engine keys a condvar's waiter queue by that mutex's
/// location (`execution::mutex::wait`/`notify` both read the location off
/// the proposed action), so rather than give the condvar its own identity
/// we simply borrow the mutex's.
pub struct CondVar {
    location: Location,
}

impl CondVar {
    pub fn new(mutex: &Mutex) -> Self {
        CondVar { location: mutex.location }
    }

    /// Releases `mutex` and blocks until woken, reacquiring `mutex` before
    /// returning. Mirrors `pthread_cond_wait`'s atomic release-and-sleep
    /// semantics; the reacquire is just an ordinary `mutex.lock()` proposed
    /// right after the wait commits.
    pub fn wait(&self, mutex: &Mutex) {
        propose(ActionKind::Wait, MemoryOrder::SeqCst, self.location, 0);
        mutex.lock();
    }

    pub fn notify_one(&self) {
        propose(ActionKind::NotifyOne, MemoryOrder::SeqCst, self.location, 0);
    }

    pub fn notify_all(&self) {
        propose(ActionKind::NotifyAll, MemoryOrder::SeqCst, self.location, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condvar_shares_its_mutexs_location() {
        let m = Mutex::new();
        let c = CondVar::new(&m);
        assert_eq!(m.location, c.location);
    }

    #[test]
    fn distinct_mutexes_allocate_distinct_locations() {
        let a = Mutex::new();
        let b = Mutex::new();
        assert_ne!(a.location, b.location);
    }
}
