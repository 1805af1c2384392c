// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Decision Nodes
//!
//! A `DecisionNode` records, for one committed step, every
//! alternative the checker could have taken instead: which other thread
//! could have run, which other write a read could have observed, which
//! future value it could have guessed, which combination of live promises
//! it could have fulfilled, which write could have broken a pending release
//! sequence, and a generic "misc" enumerator for anything else with more
//! than one outcome. Together these form the search tree the checker loop
//! walks to enumerate executions.

use crate::ids::{ActionId, NodeId, PromiseId, ThreadId};
use crate::scheduler::EnabledState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFromType {
    Past,
    Promise,
    Future,
    None,
}

#[derive(Debug, Clone, Copy)]
pub enum ReadFromCandidate {
    Past(ActionId),
    Promise { value: u64, expiration: u64 },
    Future { value: u64, expiration: u64 },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FairnessInfo {
    pub enabled_count: u32,
    pub turns: u32,
    pub priority: bool,
}

/// Trinary applicability/fulfillment flag for one live promise at this node,
/// mirroring `PROMISE_IGNORE` / `PROMISE_UNFULFILLED` / `PROMISE_FULFILLED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseFlag {
    Irrelevant,
    Unfulfilled,
    Fulfilled,
}

#[derive(Debug, Clone, Copy)]
struct PromiseSlot {
    flag: PromiseFlag,
    is_rmw: bool,
}

/// One step's choice point and backtracking set.
#[derive(Debug)]
pub struct DecisionNode {
    action: Option<ActionId>,
    parent: Option<NodeId>,
    num_threads: usize,

    explored_children: Vec<bool>,
    backtrack: Vec<bool>,
    num_backtracks: usize,
    fairness: Vec<FairnessInfo>,
    enabled_array: Vec<EnabledState>,

    read_from: Vec<ReadFromCandidate>,
    read_from_idx: usize,

    promises: Vec<PromiseSlot>,
    promise_ids: Vec<PromiseId>,

    relseq_break: Vec<Option<ActionId>>,
    relseq_break_idx: usize,

    misc_index: i32,
    misc_max: i32,
}

impl DecisionNode {
    pub fn new(
        action: Option<ActionId>,
        parent: Option<NodeId>,
        num_threads: usize,
        enabled_array: Vec<EnabledState>,
        prev_fairness: Option<&[FairnessInfo]>,
    ) -> Self {
        let fairness = match prev_fairness {
            Some(f) if f.len() >= num_threads => f[..num_threads].to_vec(),
            Some(f) => {
                let mut v = f.to_vec();
                v.resize(num_threads, FairnessInfo::default());
                v
            }
            None => vec![FairnessInfo::default(); num_threads],
        };

        DecisionNode {
            action,
            parent,
            num_threads,
            explored_children: vec![false; num_threads],
            backtrack: vec![false; num_threads],
            num_backtracks: 0,
            fairness,
            enabled_array,
            read_from: Vec::new(),
            read_from_idx: 0,
            promises: Vec::new(),
            promise_ids: Vec::new(),
            relseq_break: Vec::new(),
            relseq_break_idx: 0,
            misc_index: 0,
            misc_max: 1,
        }
    }

    pub fn action(&self) -> Option<ActionId> {
        self.action
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    // ---- thread choice / backtracking -------------------------------

    pub fn has_been_explored(&self, tid: ThreadId) -> bool {
        self.explored_children.get(tid.as_usize()).copied().unwrap_or(true)
    }

    pub fn backtrack_empty(&self) -> bool {
        self.num_backtracks == 0
    }

    pub fn clear_backtracking(&mut self) {
        self.backtrack.iter_mut().for_each(|b| *b = false);
        self.num_backtracks = 0;
    }

    /// Records that `tid` was chosen at this step, updating fairness turn
    /// counters for every thread that was enabled (the ones that didn't run
    /// accumulate `enabled_count`, building pressure toward `priority`).
    pub fn explore_child(&mut self, tid: ThreadId, enabled_threshold: u32) {
        if let Some(slot) = self.explored_children.get_mut(tid.as_usize()) {
            *slot = true;
        }
        for (i, info) in self.fairness.iter_mut().enumerate() {
            let t = ThreadId(i as u32);
            let enabled = self.enabled_array.get(t.as_usize()).copied() == Some(EnabledState::Enabled);
            if enabled {
                info.enabled_count += 1;
            }
            if t == tid {
                info.turns += 1;
                info.enabled_count = 0;
                info.priority = false;
            } else if enabled && info.enabled_count >= enabled_threshold {
                info.priority = true;
            }
        }
    }

    /// Returns `false` if `id` was already queued for backtracking.
    pub fn set_backtrack(&mut self, tid: ThreadId) -> bool {
        if tid.as_usize() >= self.backtrack.len() {
            return false;
        }
        if self.backtrack[tid.as_usize()] {
            false
        } else {
            self.backtrack[tid.as_usize()] = true;
            self.num_backtracks += 1;
            true
        }
    }

    /// Deepest-first selection of the next thread to explore from this
    /// node's backtrack set, skipping threads already explored.
    pub fn get_next_backtrack(&mut self) -> Option<ThreadId> {
        for i in 0..self.backtrack.len() {
            if self.backtrack[i] && !self.explored_children[i] {
                self.backtrack[i] = false;
                self.num_backtracks -= 1;
                return Some(ThreadId(i as u32));
            }
            if self.backtrack[i] {
                self.backtrack[i] = false;
                self.num_backtracks -= 1;
            }
        }
        None
    }

    pub fn is_enabled(&self, tid: ThreadId) -> bool {
        self.enabled_array.get(tid.as_usize()).copied() == Some(EnabledState::Enabled)
    }

    pub fn enabled_status(&self, tid: ThreadId) -> EnabledState {
        self.enabled_array
            .get(tid.as_usize())
            .copied()
            .unwrap_or(EnabledState::Disabled)
    }

    pub fn has_priority(&self, tid: ThreadId) -> bool {
        self.fairness.get(tid.as_usize()).map(|f| f.priority).unwrap_or(false)
    }

    pub fn fairness(&self) -> &[FairnessInfo] {
        &self.fairness
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    // ---- read-from / future-value enumeration ------------------------

    pub fn add_read_from_past(&mut self, write: ActionId) {
        self.read_from.push(ReadFromCandidate::Past(write));
    }

    pub fn add_read_from_promise(&mut self, value: u64, expiration: u64) {
        self.read_from.push(ReadFromCandidate::Promise { value, expiration });
    }

    pub fn add_future_value(&mut self, value: u64, expiration: u64) -> bool {
        let dup = self.read_from.iter().any(|c| {
            matches!(c, ReadFromCandidate::Future { value: v, .. } if *v == value)
        });
        if dup {
            return false;
        }
        self.read_from.push(ReadFromCandidate::Future { value, expiration });
        true
    }

    pub fn get_read_from_status(&self) -> ReadFromType {
        match self.read_from.get(self.read_from_idx) {
            Some(ReadFromCandidate::Past(_)) => ReadFromType::Past,
            Some(ReadFromCandidate::Promise { .. }) => ReadFromType::Promise,
            Some(ReadFromCandidate::Future { .. }) => ReadFromType::Future,
            None => ReadFromType::None,
        }
    }

    pub fn current_read_from(&self) -> Option<ReadFromCandidate> {
        self.read_from.get(self.read_from_idx).copied()
    }

    pub fn read_from_empty(&self) -> bool {
        self.read_from_idx + 1 >= self.read_from.len()
    }

    pub fn read_from_size(&self) -> usize {
        self.read_from.len()
    }

    pub fn increment_read_from(&mut self) -> bool {
        if self.read_from_idx + 1 < self.read_from.len() {
            self.read_from_idx += 1;
            true
        } else {
            false
        }
    }

    // ---- promise-combination counter --------------------------------

    pub fn set_promise(&mut self, id: PromiseId, is_rmw: bool) {
        self.promise_ids.push(id);
        self.promises.push(PromiseSlot { flag: PromiseFlag::Unfulfilled, is_rmw });
    }

    pub fn mark_promise_irrelevant(&mut self, idx: usize) {
        if let Some(slot) = self.promises.get_mut(idx) {
            slot.flag = PromiseFlag::Irrelevant;
        }
    }

    pub fn get_promise(&self, idx: usize) -> bool {
        self.promises.get(idx).map(|s| s.flag == PromiseFlag::Fulfilled).unwrap_or(false)
    }

    pub fn promise_ids(&self) -> &[PromiseId] {
        &self.promise_ids
    }

    pub fn promise_empty(&self) -> bool {
        self.promises
            .iter()
            .all(|s| s.flag != PromiseFlag::Unfulfilled)
    }

    /// Binary-counter increment over applicable (non-`Irrelevant`) slots.
    /// At most one RMW-flagged slot may be `Fulfilled` at a time, since a
    /// single write can satisfy at most one RMW promise (RMW-uniqueness).
    pub fn increment_promise(&mut self) -> bool {
        loop {
            let mut carry = true;
            for slot in self.promises.iter_mut() {
                if slot.flag == PromiseFlag::Irrelevant {
                    continue;
                }
                if !carry {
                    break;
                }
                if slot.flag == PromiseFlag::Unfulfilled {
                    slot.flag = PromiseFlag::Fulfilled;
                    carry = false;
                } else {
                    slot.flag = PromiseFlag::Unfulfilled;
                }
            }
            if carry {
                return false; // overflowed past all-true: exhausted
            }
            let rmw_fulfilled = self
                .promises
                .iter()
                .filter(|s| s.is_rmw && s.flag == PromiseFlag::Fulfilled)
                .count();
            if rmw_fulfilled <= 1 {
                return true;
            }
            // invalid combination (two RMW promises fulfilled at once); try the next one
        }
    }

    // ---- release-sequence break enumeration --------------------------

    pub fn add_relseq_break(&mut self, writer: Option<ActionId>) {
        self.relseq_break.push(writer);
    }

    pub fn get_relseq_break(&self) -> Option<ActionId> {
        self.relseq_break.get(self.relseq_break_idx).copied().flatten()
    }

    pub fn relseq_break_empty(&self) -> bool {
        self.relseq_break_idx + 1 >= self.relseq_break.len()
    }

    pub fn increment_relseq_break(&mut self) -> bool {
        if self.relseq_break_idx + 1 < self.relseq_break.len() {
            self.relseq_break_idx += 1;
            true
        } else {
            false
        }
    }

    // ---- misc enumerator ----------------------------------------------

    pub fn set_misc_max(&mut self, max: i32) {
        self.misc_max = max.max(1);
    }

    pub fn get_misc(&self) -> i32 {
        self.misc_index
    }

    pub fn misc_empty(&self) -> bool {
        self.misc_index + 1 >= self.misc_max
    }

    pub fn increment_misc(&mut self) -> bool {
        if self.misc_index + 1 < self.misc_max {
            self.misc_index += 1;
            true
        } else {
            false
        }
    }

    /// A node is exhausted once no enumerator has an unexplored alternative
    /// left: the backtrack set is empty, and every one of the read-from,
    /// future-value, promise, release-seq-break, and misc counters is at
    /// its last position.
    pub fn is_exhausted(&self) -> bool {
        self.backtrack_empty()
            && self.read_from_empty()
            && self.promise_empty()
            && self.relseq_break_empty()
            && self.misc_empty()
    }
}
