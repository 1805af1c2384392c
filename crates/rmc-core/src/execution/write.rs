// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `process_write`: `w_modification_order`, release-sequence completion
//! detection, and promise resolution.

use super::relseq::{breaks_sequence, extend_with_rmw, ReleaseSequence};
use super::{Execution, StepOutcome};
use crate::action::Action;
use crate::ids::ActionId;

/// Inserts `curr` into the mo total order for its location: every write
/// that happens-before `curr` gets an edge to it, and `curr` gets an edge to
/// every write already known to be mo-after it via a prior reader's
/// speculative edge. For an RMW, also records the rmw edge from the write it
/// read from.
fn w_modification_order(exec: &mut Execution, curr_id: ActionId) {
    let curr = exec.action(curr_id).clone();
    let others: Vec<ActionId> = exec
        .writes_at(curr.location)
        .filter(|&id| id != curr_id)
        .collect();

    for other_id in others {
        let other = exec.action(other_id).clone();
        if curr.clock_vector.synchronized_since(other.tid, other.seq_number) {
            exec.cyclegraph.add_edge(other_id, curr_id);
        }
        // else: ordering relative to `curr` is left to whatever mo edge an
        // earlier speculative read already inserted via `read::try_candidate`.
    }

    if curr.is_rmw() {
        if let Some(rf) = curr.reads_from {
            exec.cyclegraph.add_rmw_edge(rf, curr_id);
        }
    }
}

/// A pending release sequence is broken if `curr` is a non-rmw write to the
/// same location from a thread other than the sequence's own writer thread,
/// committed before the sequence resolved. Breaking sequences are recorded
/// as resolved immediately; offering the break as a backtracking
/// alternative on the originating read's decision node is future work once
/// that node's id is threaded through from `read.rs`.
fn check_relseq_breaks(exec: &mut Execution, curr_id: ActionId) {
    let curr = exec.action(curr_id).clone();
    let mut broken = Vec::new();
    for (&rf, seq) in exec.release_sequences.iter() {
        if seq.resolved {
            continue;
        }
        let rf_action = exec.action(rf).clone();
        if breaks_sequence(seq, &curr, &rf_action) {
            broken.push(rf);
        }
        if curr.is_rmw() {
            if let Some(prior_rf) = curr.reads_from {
                if prior_rf == rf || seq.rmw_chain.contains(&prior_rf) {
                    extend_with_rmw(exec.release_sequences.get_mut(&rf).unwrap(), curr_id, prior_rf);
                }
            }
        }
    }
    for rf in broken {
        if let Some(seq) = exec.release_sequences.get_mut(&rf) {
            seq.resolved = true;
        }
    }
}

/// A write may satisfy a live promise only if it matches the promise's
/// location and value within its expiration, and — the thin-air guard —
/// only if it does *not* already happen-after the very read the promise
/// speculated for. Without that guard a promise could be "satisfied" by a
/// write that causally depends on having already observed the speculated
/// read, which is exactly the circular, out-of-thin-air dependency the
/// promise mechanism must never validate as a legal execution.
fn resolve_promises(exec: &mut Execution, curr: &Action, curr_id: ActionId) {
    let now = curr.clock_vector.get_clock(curr.tid);
    let mut satisfied = Vec::new();
    for (idx, promise) in exec.promises.iter().enumerate() {
        if promise.is_satisfied() {
            continue;
        }
        if promise.location != curr.location || promise.value != curr.value {
            continue;
        }
        if now > promise.expiration {
            continue;
        }
        let reader = exec.action(promise.reader);
        if curr.clock_vector.synchronized_since(reader.tid, reader.seq_number) {
            continue;
        }
        satisfied.push(idx);
    }
    for idx in satisfied {
        exec.promises[idx].satisfy(curr_id);
    }
}

pub(super) fn process_write(exec: &mut Execution, curr: &mut Action) -> StepOutcome {
    if curr.is_release() {
        curr.last_fence_release = None;
        exec.release_sequences
            .insert(ActionId(exec.actions.len() as u32), ReleaseSequence::new(ActionId(exec.actions.len() as u32)));
    }

    let curr_id = ActionId(exec.actions.len() as u32);
    exec.actions.push(curr.clone());

    w_modification_order(exec, curr_id);
    check_relseq_breaks(exec, curr_id);
    resolve_promises(exec, curr, curr_id);

    exec.actions.pop();

    if exec.cyclegraph.has_cycle() || exec.cyclegraph.has_rmw_violation() {
        return StepOutcome::Infeasible;
    }
    StepOutcome::Committed
}
