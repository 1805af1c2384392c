// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Checker
//!
//! `Checker` is the outer driver: it
//! repeatedly re-runs the program under test to completion, one candidate
//! interleaving per round, consulting the shared [`NodeStack`] after each
//! round to find the next divergence point worth exploring. A round ends
//! because every thread finished, a deadlock was found, or the trace became
//! infeasible (a cycle, a broken promise, a failed [`crate::model_assert`]).
//!
//! Each round gets a brand-new [`Execution`] and a brand-new set of OS
//! threads running the program from its very start; only the
//! [`NodeStack`]'s decision tree survives across rounds (see
//! [`crate::snapshot`] for why re-running from scratch, rather than
//! rolling back a single long-lived `Execution` in place, is the strategy
//! used here).

use crate::action::{ActionKind, MemoryOrder};
use crate::api;
use crate::bugs::{BugKind, BugMessage};
use crate::config::CheckerConfig;
use crate::execution::{Execution, PendingAction, StepOutcome};
use crate::fiber::{FiberHandle, Yielded};
use crate::ids::{Location, ThreadId};
use crate::nodestack::NodeStack;
use crate::scheduler::EnabledState;
use crate::analyzer::TraceAnalyzer;
use std::collections::HashMap;
use std::sync::Arc;

/// How one round ended, kept only for logging; the bugs and feasibility
/// state it implies are already recorded on `Execution` itself by the time
/// a round returns.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RoundOutcome {
    Completed,
    Deadlock,
    Infeasible,
    ThreadPanicked(String),
}

/// Summary across every round [`Checker::check`] ran.
#[derive(Debug, Clone, Default)]
pub struct CheckerReport {
    pub executions_explored: u64,
    pub executions_with_bugs: u64,
    pub redundant_executions: u64,
    pub bugs: Vec<BugMessage>,
}

impl CheckerReport {
    pub fn has_bugs(&self) -> bool {
        !self.bugs.is_empty()
    }

    fn record(&mut self, exec: &Execution) {
        self.executions_explored += 1;
        if exec.is_redundant() {
            self.redundant_executions += 1;
        }
        if !exec.bugs().is_empty() {
            self.executions_with_bugs += 1;
            self.bugs.extend(exec.bugs().iter().cloned());
        }
    }
}

/// Drives the full state-space exploration of one program under test.
/// Owns the [`NodeStack`] across rounds; a fresh [`Execution`] is
/// constructed for each one and handed the stack on loan for its duration.
pub struct Checker {
    config: CheckerConfig,
    analyzers: Vec<Box<dyn TraceAnalyzer>>,
    nodestack: NodeStack,
}

impl Checker {
    pub fn new(config: CheckerConfig) -> Self {
        Checker { config, analyzers: Vec::new(), nodestack: NodeStack::new() }
    }

    pub fn register_analyzer(&mut self, analyzer: Box<dyn TraceAnalyzer>) {
        self.analyzers.push(analyzer);
    }

    /// Explores every interleaving of `main` that systematic backtracking
    /// reaches, bounded by `config.step_bound` per round. `main` is
    /// re-invoked from scratch, on a fresh modeled main thread, once per
    /// round; it must be free of any state that would make two calls behave
    /// differently (the whole point is that only the scheduler's choices
    /// should vary between rounds).
    pub fn check<F>(&mut self, main: F) -> CheckerReport
    where
        F: Fn() + Send + Sync + 'static,
    {
        let main: Arc<dyn Fn() + Send + Sync> = Arc::new(main);
        let mut report = CheckerReport::default();
        let mut forced: Option<ThreadId> = None;

        loop {
            let mut exec = Execution::new(self.config);
            exec.nodestack = std::mem::take(&mut self.nodestack);

            let outcome = self.run_round(&mut exec, &main, forced.take());
            crate::debug!("round finished: {:?}", outcome);

            exec.finish();
            report.record(&exec);

            for analyzer in self.analyzers.iter_mut() {
                analyzer.set_execution(&exec);
                analyzer.analyze();
            }

            let next = exec.nodestack.get_next_backtrack();
            self.nodestack = exec.nodestack;

            match next {
                Some((_node, tid, truncate_len)) => {
                    self.nodestack.pop_restofstack(truncate_len);
                    forced = Some(tid);
                }
                None => break,
            }
        }

        crate::info!(
            "exploration complete: {} executions, {} with bugs, {} redundant",
            report.executions_explored,
            report.executions_with_bugs,
            report.redundant_executions,
        );
        for analyzer in self.analyzers.iter_mut() {
            analyzer.finish();
        }
        report
    }

    /// Runs one candidate interleaving to completion. `forced`, if given,
    /// overrides exactly the first scheduling decision of the round (the
    /// one the caller's divergence point names); every decision after that
    /// is free exploration, same as a fresh round's.
    fn run_round(
        &self,
        exec: &mut Execution,
        main: &Arc<dyn Fn() + Send + Sync>,
        mut forced: Option<ThreadId>,
    ) -> RoundOutcome {
        exec.scheduler.ensure_thread(ThreadId::MAIN);

        let mut fibers: HashMap<ThreadId, FiberHandle> = HashMap::new();
        let mut awaiting: HashMap<ThreadId, PendingAction> = HashMap::new();

        let body = main.clone();
        let main_handle = FiberHandle::spawn(ThreadId::MAIN, move |ctl| {
            api::bind_thread(ThreadId::MAIN, ctl);
            api::propose(ActionKind::ThreadStart, MemoryOrder::Relaxed, Location(0), 0);
            body();
            api::propose(ActionKind::ThreadFinish, MemoryOrder::Relaxed, Location(0), 0);
        });
        stash_yield(main_handle.resume(0), ThreadId::MAIN, &mut awaiting);
        fibers.insert(ThreadId::MAIN, main_handle);

        let outcome = loop {
            if exec.is_infeasible() {
                break RoundOutcome::Infeasible;
            }
            if exec.all_threads_complete() {
                break RoundOutcome::Completed;
            }

            apply_priorities(exec);

            let Some(tid) = exec.scheduler.select_next(forced.take()) else {
                if awaiting.is_empty() {
                    break RoundOutcome::Completed;
                }
                let stuck: Vec<ThreadId> = awaiting.keys().copied().collect();
                exec.report(BugKind::Deadlock { stuck });
                break RoundOutcome::Deadlock;
            };

            if let Some(head) = exec.nodestack.head_id() {
                let threshold = exec.config.enabled_threshold;
                exec.nodestack.get_mut(head).explore_child(tid, threshold);
            }

            let Some(mut pending) = awaiting.remove(&tid) else {
                // Picked a thread with no outstanding proposal (it already
                // finished but the scheduler hasn't been told); disable it
                // and let the next turn pick someone else.
                exec.scheduler.set_status(tid, EnabledState::Disabled);
                continue;
            };

            let snapshot = (pending.kind, pending.order, pending.location, pending.tid, pending.value);
            let spawn_body = pending.spawn_body.take();
            let kind = pending.kind;
            let new_tid = ThreadId(pending.value as u32);

            match exec.step(pending) {
                StepOutcome::Committed => {
                    if kind == ActionKind::ThreadCreate {
                        if let Some(body) = spawn_body {
                            let handle = FiberHandle::spawn(new_tid, body);
                            exec.scheduler.ensure_thread(new_tid);
                            stash_yield(handle.resume(0), new_tid, &mut awaiting);
                            fibers.insert(new_tid, handle);
                        }
                    }
                    let committed_value = exec.actions.last().map(|a| a.value).unwrap_or(0);
                    if let Some(handle) = fibers.get(&tid) {
                        match handle.resume(committed_value) {
                            Yielded::AtOperation(next_pending) => {
                                awaiting.insert(tid, next_pending);
                            }
                            Yielded::Finished => {}
                            Yielded::Panicked(msg) => {
                                exec.report(BugKind::UncaughtAssertion {
                                    message: format!("thread {} panicked: {}", tid, msg),
                                });
                                exec.infeasible = true;
                            }
                        }
                    }
                }
                StepOutcome::Blocked => {
                    let (kind, order, location, tid, value) = snapshot;
                    awaiting.insert(
                        tid,
                        PendingAction { kind, order, location, tid, value, message: None, spawn_body: None },
                    );
                }
                StepOutcome::Infeasible => break RoundOutcome::Infeasible,
            }
        };

        for (_, handle) in fibers.drain() {
            handle.terminate();
        }
        outcome
    }
}

fn stash_yield(yielded: Yielded, tid: ThreadId, awaiting: &mut HashMap<ThreadId, PendingAction>) {
    match yielded {
        Yielded::AtOperation(pending) => {
            awaiting.insert(tid, pending);
        }
        Yielded::Finished => {}
        Yielded::Panicked(_) => {}
    }
}

/// Reads the current head node's accumulated fairness state and mirrors any
/// starved thread's priority flag onto the scheduler before it selects the
/// next thread to run.
fn apply_priorities(exec: &mut Execution) {
    exec.scheduler.clear_priorities();
    let Some(head) = exec.nodestack.head_id() else {
        return;
    };
    let node = exec.nodestack.get(head);
    for i in 0..node.num_threads() {
        let t = ThreadId(i as u32);
        if node.has_priority(t) {
            exec.scheduler.set_priority(t, true);
        }
    }
}
