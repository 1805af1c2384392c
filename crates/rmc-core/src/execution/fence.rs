// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `process_fence`: release fences record themselves as the thread's most
//! recent release point; acquire fences merge in the release-sequence heads
//! of every read the thread has done since its last acquire fence.

use super::{Execution, StepOutcome};
use crate::action::Action;
use crate::ids::ActionId;

pub(super) fn process_fence(exec: &mut Execution, curr: &mut Action) -> StepOutcome {
    if curr.is_acquire() {
        let since: Vec<ActionId> = exec
            .actions
            .iter()
            .enumerate()
            .rev()
            .take_while(|(_, a)| a.tid == curr.tid)
            .filter(|(_, a)| a.is_read())
            .map(|(i, _)| ActionId(i as u32))
            .collect();

        for read_id in since {
            let read_action = exec.action(read_id).clone();
            if let Some(rf) = read_action.reads_from {
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
        }
    }

    if curr.is_release() {
        if let Some(last) = exec.threads.get(curr.tid.as_usize()).and_then(|t| t.last_action) {
            curr.last_fence_release = Some(last);
        }
    }

    StepOutcome::Committed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionKind, MemoryOrder, VALUE_NONE};
    use crate::config::CheckerConfig;
    use crate::execution::{Execution, PendingAction, StepOutcome};
    use crate::ids::{Location, ThreadId};

    #[test]
    fn acquire_fence_merges_clocks_of_reads_since_last_fence() {
        let mut exec = Execution::new(CheckerConfig::default());
        exec.step(PendingAction {
            kind: ActionKind::Write,
            order: MemoryOrder::Release,
            location: Location(1),
            tid: ThreadId(1),
            value: 9,
            message: None,
            spawn_body: None,
        });
        exec.step(PendingAction {
            kind: ActionKind::Read,
            order: MemoryOrder::Relaxed,
            location: Location(1),
            tid: ThreadId(0),
            value: VALUE_NONE,
            message: None,
            spawn_body: None,
        });
        let outcome = exec.step(PendingAction {
            kind: ActionKind::Fence,
            order: MemoryOrder::Acquire,
            location: Location(0),
            tid: ThreadId(0),
            value: VALUE_NONE,
            message: None,
            spawn_body: None,
        });
        assert_eq!(outcome, StepOutcome::Committed);
        let fence_action = exec.actions.last().unwrap();
        assert!(fence_action.clock_vector.get_clock(ThreadId(1)) >= 1);
    }
}
