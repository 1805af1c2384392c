// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `process_read`: may-read-from search, seq-cst forcing, release-sequence
//! synchronization on acquire, future-value proposal, and the `maxreads`
//! redundancy bound.

use super::{Execution, StepOutcome};
use crate::action::Action;
use crate::ids::ActionId;

/// Writes on `curr`'s location this read could plausibly observe: `w` is
/// excluded only if `curr` has already synchronized with some later write
/// on `w`'s own thread, meaning `w` is strictly superseded from `curr`'s
/// point of view (the happens-before mo-frontier).
///
/// A seq-cst read is additionally pinned to the single most recent seq-cst
/// write to this location in the execution's total seq-cst order, once one
/// exists: `Execution::seqcst_order` is a true global order over every
/// seq-cst action (the engine commits exactly one action at a time), so
/// forcing every seq-cst read to the same write for its location is what
/// rules out two seq-cst readers disagreeing on the relative order of two
/// independent seq-cst writers (the IRIW guarantee).
fn may_read_from(exec: &Execution, curr: &Action) -> Vec<ActionId> {
    if curr.is_seqcst() {
        if let Some(forced) = exec.latest_seqcst_write(curr.location) {
            return vec![forced];
        }
    }

    let all: Vec<ActionId> = exec.writes_at(curr.location).collect();
    all.iter()
        .copied()
        .filter(|&w_id| {
            let w = exec.action(w_id);
            !all.iter().any(|&other_id| {
                if other_id == w_id {
                    return false;
                }
                let other = exec.action(other_id);
                other.tid == w.tid
                    && other.seq_number > w.seq_number
                    && curr.clock_vector.synchronized_since(other.tid, other.seq_number)
            })
        })
        .collect()
}

/// Small, deterministic, bounded set of future-value guesses for a read
/// with no viable committed candidate: since the real satisfying write
/// hasn't happened yet this round, there is nothing to learn the value
/// from, so the engine simply enumerates the first `max_future_values`
/// small integers, each given a later expiration than the last. A guess
/// that's never matched by a later write is reported via
/// `BugKind::PromiseUnresolvable` in `Execution::finish`; one that is
/// survives only if it doesn't also fail the thin-air guard in
/// `write::resolve_promises`.
fn future_value_candidates(exec: &Execution, curr: &Action) -> Vec<(u64, u64)> {
    let now = curr.clock_vector.get_clock(curr.tid);
    let slop = exec.config.expire_slop.max(1);
    (0..exec.config.max_future_values as u64)
        .map(|i| (i, now + exec.config.max_future_delay + i * slop))
        .collect()
}

/// Tries `candidate` as `curr`'s reads-from: speculatively adds the mo edges
/// this choice implies, checks for a cycle, and commits or rolls back.
fn try_candidate(exec: &mut Execution, curr: &Action, candidate: ActionId) -> bool {
    exec.cyclegraph.start_changes();

    for &other in exec.writes_at(curr.location).collect::<Vec<_>>().iter() {
        if other == candidate {
            continue;
        }
        let other_action = exec.action(other);
        if curr.clock_vector.synchronized_since(other_action.tid, other_action.seq_number) {
            // `other` happens-before curr: candidate must be mo-after it,
            // unless `other` is the candidate itself or already known later.
            if !exec.cyclegraph.reachable(other, candidate) {
                exec.cyclegraph.add_edge(other, candidate);
            }
        }
    }

    let feasible = !exec.cyclegraph.has_cycle() && !exec.cyclegraph.has_rmw_violation();
    if feasible {
        exec.cyclegraph.commit_changes();
    } else {
        exec.cyclegraph.rollback_changes();
    }
    feasible
}

/// Fabricates the synthetic init-action for a location that has never been
/// written, so a read of it has something to observe instead of failing
/// outright.
fn ensure_initialized(exec: &mut Execution, location: crate::ids::Location) {
    if exec.writes_at(location).next().is_some() {
        return;
    }
    let init = Action {
        kind: crate::action::ActionKind::Init,
        order: crate::action::MemoryOrder::SeqCst,
        location,
        tid: crate::ids::ThreadId::MAIN,
        value: exec.config.uninit_value,
        seq_number: 0,
        reads_from: None,
        clock_vector: crate::clock::ClockVector::empty(),
        last_fence_release: None,
        node: None,
    };
    let id = ActionId(exec.actions.len() as u32);
    exec.by_location.entry(location).or_default().push(id);
    exec.actions.push(init);
}

pub(super) fn process_read(exec: &mut Execution, curr: &mut Action) -> StepOutcome {
    ensure_initialized(exec, curr.location);
    let candidates = may_read_from(exec, curr);
    if candidates.is_empty() {
        return propose_future_value(exec, curr);
    }

    let mut chosen = None;
    let mut alternatives = Vec::new();
    for candidate in candidates {
        if chosen.is_none() && try_candidate(exec, curr, candidate) {
            chosen = Some(candidate);
        } else {
            alternatives.push(candidate);
        }
    }

    let Some(rf) = chosen else {
        return propose_future_value(exec, curr);
    };

    curr.reads_from = Some(rf);
    curr.value = exec.action(rf).value;

    if curr.is_acquire() {
        if let Some(seq) = exec.release_sequences.get(&rf).cloned() {
            for head in seq.heads() {
                let head_cv = exec.action(head).clock_vector.clone();
                curr.clock_vector.merge(&head_cv);
            }
        } else {
            let rf_cv = exec.action(rf).clock_vector.clone();
            curr.clock_vector.merge(&rf_cv);
        }
    }

    if let Some(node) = exec.actions.last().and_then(|a| a.node) {
        let decision = exec.nodestack.get_mut(node);
        for alt in &alternatives {
            decision.add_read_from_past(*alt);
        }
    }

    redundancy_check(exec, curr, rf);

    StepOutcome::Committed
}

/// Falls back to a speculative future value when no already-committed write
/// is a legal reads-from candidate for `curr` (either nothing is pending at
/// this location yet, or every pending candidate's mo edges would cycle).
/// Records every offered guess as a backtracking alternative on the
/// governing decision node and commits to the first, opening a promise that
/// some later write must satisfy (`write::resolve_promises`) or the
/// execution is reported unresolvable at `Execution::finish`.
fn propose_future_value(exec: &mut Execution, curr: &mut Action) -> StepOutcome {
    let guesses = future_value_candidates(exec, curr);
    let Some(&(value, expiration)) = guesses.first() else {
        exec.infeasible = true;
        return StepOutcome::Infeasible;
    };

    if let Some(node) = exec.nodestack.head_id() {
        let decision = exec.nodestack.get_mut(node);
        for &(v, exp) in &guesses {
            decision.add_future_value(v, exp);
        }
    }

    let reader_id = ActionId(exec.actions.len() as u32);
    curr.reads_from = None;
    curr.value = value;
    exec.new_promise(reader_id, curr.location, value, expiration);

    StepOutcome::Committed
}

/// Marks the execution redundant once the same write has been chosen by
/// this thread's reads so many times in a row, with live alternatives
/// still on the table, that continued exploration can't find new behavior
/// (the `maxreads` liveness bound).
fn redundancy_check(exec: &mut Execution, curr: &Action, rf: ActionId) {
    let repeats = exec
        .actions
        .iter()
        .rev()
        .take_while(|a| a.tid == curr.tid)
        .filter(|a| a.is_read() && a.reads_from == Some(rf))
        .count();
    if repeats as u32 >= exec.config.maxreads {
        exec.redundant = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionKind, MemoryOrder, VALUE_NONE};
    use crate::config::CheckerConfig;
    use crate::execution::{Execution, PendingAction};
    use crate::ids::{Location, ThreadId};

    fn write(exec: &mut Execution, tid: u32, loc: u64, value: u64) -> ActionId {
        let pending = PendingAction {
            kind: ActionKind::Write,
            order: MemoryOrder::Relaxed,
            location: Location(loc),
            tid: ThreadId(tid),
            value,
            message: None,
            spawn_body: None,
        };
        assert_eq!(exec.step(pending), StepOutcome::Committed);
        ActionId((exec.actions.len() - 1) as u32)
    }

    #[test]
    fn read_observes_most_recent_same_thread_write() {
        let mut exec = Execution::new(CheckerConfig::default());
        write(&mut exec, 0, 1, 0);
        let w2 = write(&mut exec, 0, 1, 1);

        let pending = PendingAction {
            kind: ActionKind::Read,
            order: MemoryOrder::Relaxed,
            location: Location(1),
            tid: ThreadId(0),
            value: VALUE_NONE,
            message: None,
            spawn_body: None,
        };
        assert_eq!(exec.step(pending), StepOutcome::Committed);
        let read_action = exec.actions.last().unwrap();
        assert_eq!(read_action.reads_from, Some(w2));
        assert_eq!(read_action.value, 1);
    }

    #[test]
    fn read_of_never_written_location_observes_synthetic_init_value() {
        let config = CheckerConfig { uninit_value: 7, ..CheckerConfig::default() };
        let mut exec = Execution::new(config);
        let pending = PendingAction {
            kind: ActionKind::Read,
            order: MemoryOrder::Relaxed,
            location: Location(99),
            tid: ThreadId(0),
            value: VALUE_NONE,
            message: None,
            spawn_body: None,
        };
        assert_eq!(exec.step(pending), StepOutcome::Committed);
        assert_eq!(exec.actions.last().unwrap().value, 7);
    }

    #[test]
    fn propose_future_value_opens_a_promise_and_records_every_guess_on_the_head_node() {
        let mut exec = Execution::new(CheckerConfig::default());
        // One committed write first, so `record()` has already created a
        // head node for `propose_future_value` to record its guesses onto.
        write(&mut exec, 0, 1, 0);

        let mut curr = Action {
            kind: ActionKind::Read,
            order: MemoryOrder::Relaxed,
            location: Location(2),
            tid: ThreadId(0),
            value: VALUE_NONE,
            seq_number: 1,
            reads_from: None,
            clock_vector: crate::clock::ClockVector::empty(),
            last_fence_release: None,
            node: None,
        };

        let outcome = propose_future_value(&mut exec, &mut curr);
        assert_eq!(outcome, StepOutcome::Committed);
        assert_eq!(curr.reads_from, None);
        assert_eq!(curr.value, 0);

        assert_eq!(exec.promises.len(), 1);
        assert_eq!(exec.promises[0].location, Location(2));
        assert_eq!(exec.promises[0].value, 0);
        assert!(!exec.promises[0].is_satisfied());

        let head = exec.nodestack.head_id().expect("head node exists after the first write");
        assert_eq!(
            exec.nodestack.get(head).read_from_size(),
            exec.config.max_future_values as usize
        );
    }
}
