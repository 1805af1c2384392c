// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Execution State
//!
//! `Execution` is the heart of the engine: the per-object action lists,
//! reads-from resolution, modification
//! order, release sequences, promises, mutex/condvar state, and bug
//! collection for a single candidate interleaving. Everything here is
//! arena-indexed (see [`crate::ids`]) so the whole struct can be snapshotted
//! and rolled back by value between explorations.

mod fence;
mod mutex;
mod read;
mod relseq;
mod thread_ops;
mod write;

pub use mutex::{CondvarQueue, MutexState};
pub use relseq::ReleaseSequence;

use crate::action::{Action, ActionKind, MemoryOrder};
use crate::bugs::{BugKind, BugMessage, BugReport};
use crate::clock::ClockVector;
use crate::config::CheckerConfig;
use crate::cyclegraph::CycleGraph;
use crate::datarace::RaceDetector;
use crate::ids::{ActionId, Location, PromiseId, ThreadId};
use crate::nodestack::NodeStack;
use crate::promise::Promise;
use crate::scheduler::{EnabledState, Scheduler};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadStatus {
    Created,
    Running,
    /// Blocked on a lock, condvar, or join; `on` names what it's waiting for.
    Blocked,
    Complete,
}

#[derive(Debug, Clone)]
pub struct ThreadState {
    pub status: ThreadStatus,
    pub last_action: Option<ActionId>,
    pub creator: Option<ActionId>,
    pub joined_on: Option<ThreadId>,
}

impl ThreadState {
    fn new(creator: Option<ActionId>) -> Self {
        ThreadState { status: ThreadStatus::Created, last_action: None, creator, joined_on: None }
    }
}

/// Outcome of running one pending action through the step loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Committed,
    /// The action's thread isn't currently runnable; the scheduler must
    /// pick someone else.
    Blocked,
    /// This candidate interleaving is no longer feasible.
    Infeasible,
}

/// A request from a user thread to perform one memory/sync operation,
/// handed to the engine across the [`crate::fiber`] rendezvous channel.
pub struct PendingAction {
    pub kind: ActionKind,
    pub order: MemoryOrder,
    pub location: Location,
    pub tid: ThreadId,
    pub value: u64,
    /// Only meaningful for `ActionKind::Assert`; carries the failed
    /// condition's text since `value` has no room for a string.
    pub message: Option<String>,
    /// Only meaningful for `ActionKind::ThreadCreate`: the new thread's body,
    /// already wrapped to propose its own start/finish bookkeeping. The
    /// caller (`checker.rs`) takes this out and spawns it once the create
    /// action commits; `Execution::step` never reads it.
    pub spawn_body: Option<Box<dyn FnOnce(crate::fiber::FiberControl) + Send>>,
}

impl std::fmt::Debug for PendingAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingAction")
            .field("kind", &self.kind)
            .field("order", &self.order)
            .field("location", &self.location)
            .field("tid", &self.tid)
            .field("value", &self.value)
            .field("message", &self.message)
            .field("spawn_body", &self.spawn_body.is_some())
            .finish()
    }
}

pub struct Execution {
    pub(crate) config: CheckerConfig,
    pub(crate) actions: Vec<Action>,
    pub(crate) by_location: HashMap<Location, Vec<ActionId>>,
    pub(crate) threads: Vec<ThreadState>,
    pub(crate) cyclegraph: CycleGraph,
    pub(crate) promises: Vec<Promise>,
    pub(crate) scheduler: Scheduler,
    pub(crate) nodestack: NodeStack,
    pub(crate) race_detector: RaceDetector,
    pub(crate) bugs: BugReport,
    pub(crate) release_sequences: HashMap<ActionId, ReleaseSequence>,
    pub(crate) mutexes: HashMap<Location, MutexState>,
    pub(crate) condvars: HashMap<Location, CondvarQueue>,
    /// Every seq-cst action, in the order it committed this round. Since the
    /// engine steps exactly one action at a time, this is already a single
    /// total order over all seq-cst operations regardless of location —
    /// the witness [`read::process_read`] consults to force seq-cst reads
    /// to observe the most recent seq-cst write to their location rather
    /// than an older one a different thread happened to still find legal.
    pub(crate) seqcst_order: Vec<ActionId>,
    pub(crate) seq_counter: u64,
    pub(crate) infeasible: bool,
    pub(crate) redundant: bool,
}

impl Execution {
    pub fn new(config: CheckerConfig) -> Self {
        Execution {
            config,
            actions: Vec::new(),
            by_location: HashMap::new(),
            threads: vec![ThreadState::new(None)],
            cyclegraph: CycleGraph::new(),
            promises: Vec::new(),
            scheduler: Scheduler::new(),
            nodestack: NodeStack::new(),
            race_detector: RaceDetector::new(),
            bugs: BugReport::new(),
            release_sequences: HashMap::new(),
            mutexes: HashMap::new(),
            condvars: HashMap::new(),
            seqcst_order: Vec::new(),
            seq_counter: 0,
            infeasible: false,
            redundant: false,
        }
    }

    pub fn bugs(&self) -> &BugReport {
        &self.bugs
    }

    pub fn is_infeasible(&self) -> bool {
        self.infeasible || self.cyclegraph.has_cycle() || self.cyclegraph.has_rmw_violation()
    }

    pub fn is_redundant(&self) -> bool {
        self.redundant
    }

    pub fn action(&self, id: ActionId) -> &Action {
        &self.actions[id.as_usize()]
    }

    pub fn thread(&self, tid: ThreadId) -> &ThreadState {
        &self.threads[tid.as_usize()]
    }

    fn ensure_thread(&mut self, tid: ThreadId, creator: Option<ActionId>) {
        let idx = tid.as_usize();
        if self.threads.len() <= idx {
            self.threads.resize_with(idx + 1, || ThreadState::new(None));
        }
        if creator.is_some() {
            self.threads[idx].creator = creator;
        }
        self.scheduler.ensure_thread(tid);
    }

    fn writes_at(&self, location: Location) -> impl Iterator<Item = ActionId> + '_ {
        self.by_location
            .get(&location)
            .into_iter()
            .flatten()
            .copied()
            .filter(move |&id| self.action(id).could_be_write())
    }

    /// The most recent committed write to `location` in the seq-cst total
    /// order, if any seq-cst write to it has happened yet this round.
    fn latest_seqcst_write(&self, location: Location) -> Option<ActionId> {
        self.seqcst_order
            .iter()
            .rev()
            .find(|&&id| self.action(id).location == location && self.action(id).could_be_write())
            .copied()
    }

    fn last_action_of(&self, tid: ThreadId) -> Option<&Action> {
        self.threads.get(tid.as_usize())?.last_action.map(|id| self.action(id))
    }

    fn next_clock_vector(&self, pending: &PendingAction, creator: Option<ActionId>) -> ClockVector {
        let seq = self.seq_counter + 1;
        let parent_from_thread = self.last_action_of(pending.tid).map(|a| &a.clock_vector);
        match (parent_from_thread, creator.map(|id| &self.action(id).clock_vector)) {
            (Some(t), Some(c)) => {
                let mut cv = ClockVector::new(Some(t), pending.tid, seq);
                cv.merge(c);
                cv
            }
            (Some(t), None) => ClockVector::new(Some(t), pending.tid, seq),
            (None, Some(c)) => ClockVector::new(Some(c), pending.tid, seq),
            (None, None) => ClockVector::new(None, pending.tid, seq),
        }
    }

    /// Runs the full step loop for one pending action: initialize, enabled
    /// check, classify/dispatch, record, backtracking, feasibility check.
    pub fn step(&mut self, pending: PendingAction) -> StepOutcome {
        if self.is_infeasible() {
            return StepOutcome::Infeasible;
        }

        if pending.kind == ActionKind::Assert {
            self.assert_bug(pending.message.unwrap_or_default());
            return StepOutcome::Committed;
        }

        self.ensure_thread(pending.tid, None);

        if !self.is_enabled(&pending) {
            self.scheduler.set_status(pending.tid, EnabledState::Disabled);
            return StepOutcome::Blocked;
        }

        self.seq_counter += 1;
        let clock_vector = self.next_clock_vector(&pending, None);

        let mut action = Action {
            kind: pending.kind,
            order: pending.order,
            location: pending.location,
            tid: pending.tid,
            value: pending.value,
            seq_number: self.seq_counter,
            reads_from: None,
            clock_vector,
            last_fence_release: None,
            node: None,
        };

        let outcome = match action.kind {
            ActionKind::Read | ActionKind::RmwRead => read::process_read(self, &mut action),
            ActionKind::Write | ActionKind::RmwWrite | ActionKind::Init => {
                write::process_write(self, &mut action)
            }
            ActionKind::Fence => fence::process_fence(self, &mut action),
            ActionKind::Lock
            | ActionKind::TryLock
            | ActionKind::Unlock
            | ActionKind::Wait
            | ActionKind::NotifyOne
            | ActionKind::NotifyAll => mutex::process_mutex(self, &mut action),
            ActionKind::ThreadCreate => thread_ops::process_create(self, &mut action),
            ActionKind::ThreadStart => thread_ops::process_start(self, &mut action),
            ActionKind::ThreadJoin => thread_ops::process_join(self, &mut action),
            ActionKind::ThreadFinish => thread_ops::process_finish(self, &mut action),
            ActionKind::ThreadYield => StepOutcome::Committed,
            ActionKind::RmwCancel => StepOutcome::Committed,
            ActionKind::RelseqFixup => StepOutcome::Committed,
            ActionKind::Assert => unreachable!("Assert is handled before dispatch"),
        };

        if outcome == StepOutcome::Blocked {
            self.seq_counter -= 1;
            self.scheduler.set_status(pending.tid, EnabledState::Disabled);
            return StepOutcome::Blocked;
        }

        self.race_detector.check_access(&action);
        self.record(action);
        self.check_backtracking_conflicts();

        if self.is_infeasible() {
            return StepOutcome::Infeasible;
        }
        outcome
    }

    fn is_enabled(&self, pending: &PendingAction) -> bool {
        match pending.kind {
            ActionKind::Lock => self
                .mutexes
                .get(&pending.location)
                .map(|m| m.holder.is_none())
                .unwrap_or(true),
            ActionKind::ThreadJoin => {
                let target = ThreadId(pending.value as u32);
                self.threads
                    .get(target.as_usize())
                    .map(|t| t.status == ThreadStatus::Complete)
                    .unwrap_or(false)
            }
            ActionKind::Wait => self
                .mutexes
                .get(&pending.location)
                .map(|m| m.holder == Some(pending.tid))
                .unwrap_or(false),
            _ => true,
        }
    }

    fn record(&mut self, action: Action) -> ActionId {
        let id = ActionId(self.actions.len() as u32);
        self.by_location.entry(action.location).or_default().push(id);
        if action.is_seqcst() {
            self.seqcst_order.push(id);
        }

        let tid = action.tid;
        self.actions.push(action);
        self.ensure_thread(tid, None);
        self.threads[tid.as_usize()].last_action = Some(id);
        self.threads[tid.as_usize()].status = ThreadStatus::Running;

        let enabled_snapshot = self.scheduler.enabled_snapshot();
        let node = self.nodestack.explore_action(enabled_snapshot);
        self.actions[id.as_usize()].node = Some(node);
        id
    }

    /// Walks the trace backward from the just-committed action to find the
    /// last conflicting prior action (same location, could-synchronize-with
    /// or a conflicting lock op), and flags its thread for backtracking on
    /// that action's decision node.
    fn check_backtracking_conflicts(&mut self) {
        if self.actions.is_empty() {
            return;
        }
        let curr_id = ActionId((self.actions.len() - 1) as u32);
        let curr = self.action(curr_id).clone();
        for &other_id in self.by_location.get(&curr.location).into_iter().flatten().rev() {
            if other_id == curr_id {
                continue;
            }
            let other = self.action(other_id);
            let conflicts = curr.could_synchronize_with(other) || curr.is_conflicting_lock(other);
            if conflicts {
                if let Some(node) = other.node {
                    self.nodestack.get_mut(node).set_backtrack(curr.tid);
                }
                break;
            }
        }
    }

    pub fn assert_bug(&mut self, message: impl Into<String>) {
        self.bugs.push(BugMessage::assertion(message));
        self.infeasible = true;
    }

    pub(crate) fn report(&mut self, kind: BugKind) {
        self.bugs.push(BugMessage::new(kind));
    }

    /// Allocates a fresh promise for a read choosing a future value, scoped
    /// to `max_future_values`/`expire_slop` in the caller (`read.rs`).
    pub(crate) fn new_promise(
        &mut self,
        reader: ActionId,
        location: Location,
        value: u64,
        expiration: u64,
    ) -> PromiseId {
        let id = PromiseId(self.promises.len() as u32);
        self.promises.push(Promise::new(reader, location, value, expiration));
        id
    }

    /// Finalizes the execution: resolves any still-pending release
    /// sequences, checks every promise either got satisfied or is provably
    /// dead, and reports unrealized data races collected along the way.
    pub fn finish(&mut self) {
        for seq in self.release_sequences.values_mut() {
            seq.resolved = true;
        }
        for (idx, promise) in self.promises.iter().enumerate() {
            if !promise.is_satisfied() {
                self.bugs.push(BugMessage::new(BugKind::PromiseUnresolvable {
                    reader: promise.reader,
                }));
                let _ = idx;
            }
        }
        for race in self.race_detector.take_races() {
            self.bugs.push(BugMessage::data_race(race));
        }
    }

    pub fn all_threads_complete(&self) -> bool {
        self.threads.iter().all(|t| t.status == ThreadStatus::Complete)
    }
}
