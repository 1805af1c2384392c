// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Clock Vectors
//!
//! A `ClockVector` is a per-thread logical clock: a mapping from thread id to
//! the highest sequence number of that thread's actions this vector has
//! observed. Clock vectors are the engine's implementation of happens-before:
//! two actions `a` and `b` are ordered `a` happens-before `b` iff
//! `b.clock_vector[a.tid] >= a.seq_number`.
//!
//! Every operation here is `O(thread count)`.

use crate::action::Action;
use crate::ids::ThreadId;

/// A growable per-thread logical clock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClockVector {
    clock: Vec<u64>,
}

impl ClockVector {
    /// Build an empty clock vector (used only for the very first action of
    /// the very first thread, which has no parent to inherit from).
    pub fn empty() -> Self {
        ClockVector { clock: Vec::new() }
    }

    /// Construct a new vector for `act`, optionally inheriting from `parent`
    /// (the thread's own previous action, or for a thread-start action, the
    /// creator's action).
    ///
    /// Mirrors CDSChecker's `ClockVector::ClockVector(ClockVector *parent, ModelAction *act)`.
    pub fn new(parent: Option<&ClockVector>, tid: ThreadId, seq: u64) -> Self {
        let mut num_threads = tid.as_usize() + 1;
        if let Some(p) = parent {
            num_threads = num_threads.max(p.clock.len());
        }
        let mut clock = vec![0u64; num_threads];
        if let Some(p) = parent {
            clock[..p.clock.len()].copy_from_slice(&p.clock);
        }
        clock[tid.as_usize()] = seq;
        ClockVector { clock }
    }

    /// Element-wise maximum merge. Returns whether any component changed,
    /// so a caller can detect a fixed point (`clock.merge(clock)` is
    /// therefore always a no-op).
    pub fn merge(&mut self, other: &ClockVector) -> bool {
        if other.clock.len() > self.clock.len() {
            self.clock.resize(other.clock.len(), 0);
        }
        let mut changed = false;
        for (i, &v) in other.clock.iter().enumerate() {
            if v > self.clock[i] {
                self.clock[i] = v;
                changed = true;
            }
        }
        changed
    }

    /// `true` iff this vector's thread has synchronized with (observed)
    /// `act`: `act.seq_number <= self.clock[act.tid]`.
    pub fn synchronized_since(&self, tid: ThreadId, seq: u64) -> bool {
        self.clock
            .get(tid.as_usize())
            .is_some_and(|&c| seq <= c)
    }

    pub fn synchronized_since_action(&self, act: &Action) -> bool {
        self.synchronized_since(act.tid, act.seq_number)
    }

    pub fn get_clock(&self, tid: ThreadId) -> u64 {
        self.clock.get(tid.as_usize()).copied().unwrap_or(0)
    }

    pub fn num_threads(&self) -> usize {
        self.clock.len()
    }
}
