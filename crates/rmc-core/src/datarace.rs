// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Data Race Detection
//!
//! Shadow memory tracking the last write and the set of reads since that
//! write, per location, so that a subsequent conflicting access can be
//! compared against the accessing thread's current clock vector to decide
//! whether it happened-after every prior access or raced with one of them.
//!
//! CDSChecker packs this into a 64-bit encoded pointer-or-record
//! trick keyed by a two-level 65536-entry table, to avoid a hash lookup on
//! every memory access in a C allocator with no safe alternative. Rust gives
//! us a hash map with perfectly adequate amortized cost for a model checker
//! (whose bottleneck is state-space size, not per-access constant factors),
//! so shadow state here is a plain [`dashmap::DashMap`] keyed by
//! [`Location`], matching the sparse-external-key data [`dashmap`] is used
//! for elsewhere in this crate.

use crate::action::Action;
use crate::clock::ClockVector;
use crate::ids::{Location, ThreadId};
use dashmap::DashMap;

#[derive(Debug, Clone)]
struct Access {
    thread: ThreadId,
    clock: u64,
}

#[derive(Debug, Clone, Default)]
struct ShadowRecord {
    last_write: Option<Access>,
    reads_since_write: Vec<Access>,
}

/// A detected race between two accesses to the same location, at least one
/// of which is a write, neither of which happened-before the other.
#[derive(Debug, Clone)]
pub struct DataRace {
    pub location: Location,
    pub old_thread: ThreadId,
    pub old_clock: u64,
    pub is_old_write: bool,
    pub new_thread: ThreadId,
    pub new_clock: u64,
    pub is_new_write: bool,
}

#[derive(Debug, Default)]
pub struct RaceDetector {
    shadow: DashMap<Location, ShadowRecord>,
    unrealized: Vec<DataRace>,
}

impl RaceDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks `action` (a read or a write) against the shadow state for its
    /// location, recording any detected race, then updates the shadow state
    /// to reflect this access.
    pub fn check_access(&mut self, action: &Action) {
        if action.is_write() {
            self.check_write(action);
        } else if action.is_read() {
            self.check_read(action);
        }
    }

    fn check_write(&mut self, action: &Action) {
        let mut entry = self.shadow.entry(action.location).or_default();
        let this = Access { thread: action.tid, clock: action.clock_vector.get_clock(action.tid) };

        if let Some(w) = &entry.last_write {
            if w.thread != action.tid
                && !action.clock_vector.synchronized_since(w.thread, w.clock)
            {
                self.unrealized.push(DataRace {
                    location: action.location,
                    old_thread: w.thread,
                    old_clock: w.clock,
                    is_old_write: true,
                    new_thread: action.tid,
                    new_clock: this.clock,
                    is_new_write: true,
                });
            }
        }
        for r in &entry.reads_since_write {
            if r.thread != action.tid && !action.clock_vector.synchronized_since(r.thread, r.clock) {
                self.unrealized.push(DataRace {
                    location: action.location,
                    old_thread: r.thread,
                    old_clock: r.clock,
                    is_old_write: false,
                    new_thread: action.tid,
                    new_clock: this.clock,
                    is_new_write: true,
                });
            }
        }

        entry.last_write = Some(this);
        entry.reads_since_write.clear();
    }

    fn check_read(&mut self, action: &Action) {
        let mut entry = self.shadow.entry(action.location).or_default();
        let this = Access { thread: action.tid, clock: action.clock_vector.get_clock(action.tid) };

        if let Some(w) = &entry.last_write {
            if w.thread != action.tid && !action.clock_vector.synchronized_since(w.thread, w.clock) {
                self.unrealized.push(DataRace {
                    location: action.location,
                    old_thread: w.thread,
                    old_clock: w.clock,
                    is_old_write: true,
                    new_thread: action.tid,
                    new_clock: this.clock,
                    is_new_write: false,
                });
            }
        }

        entry.reads_since_write.push(this);
    }

    pub fn has_unrealized_races(&self) -> bool {
        !self.unrealized.is_empty()
    }

    pub fn take_races(&mut self) -> Vec<DataRace> {
        std::mem::take(&mut self.unrealized)
    }

    pub fn races(&self) -> &[DataRace] {
        &self.unrealized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionKind, MemoryOrder, VALUE_NONE};

    fn action(kind: ActionKind, tid: u32, loc: u64, cv: ClockVector) -> Action {
        Action {
            kind,
            order: MemoryOrder::Relaxed,
            location: Location(loc),
            tid: ThreadId(tid),
            value: VALUE_NONE,
            seq_number: 0,
            reads_from: None,
            clock_vector: cv,
            last_fence_release: None,
            node: None,
        }
    }

    #[test]
    fn concurrent_writes_to_same_location_race() {
        let mut det = RaceDetector::new();
        let cv0 = ClockVector::new(None, ThreadId(0), 1);
        let cv1 = ClockVector::new(None, ThreadId(1), 1);

        det.check_access(&action(ActionKind::Write, 0, 7, cv0));
        det.check_access(&action(ActionKind::Write, 1, 7, cv1));

        assert!(det.has_unrealized_races());
    }

    #[test]
    fn synchronized_writes_do_not_race() {
        let mut det = RaceDetector::new();
        let cv0 = ClockVector::new(None, ThreadId(0), 1);
        det.check_access(&action(ActionKind::Write, 0, 7, cv0.clone()));

        let mut cv1 = ClockVector::new(None, ThreadId(1), 1);
        cv1.merge(&cv0);
        det.check_access(&action(ActionKind::Write, 1, 7, cv1));

        assert!(!det.has_unrealized_races());
    }

    #[test]
    fn read_then_conflicting_write_races() {
        let mut det = RaceDetector::new();
        let cv0 = ClockVector::new(None, ThreadId(0), 1);
        det.check_access(&action(ActionKind::Read, 0, 3, cv0));

        let cv1 = ClockVector::new(None, ThreadId(1), 1);
        det.check_access(&action(ActionKind::Write, 1, 3, cv1));

        assert!(det.has_unrealized_races());
    }
}
