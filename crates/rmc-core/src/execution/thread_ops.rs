// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Thread lifecycle actions: create, start, join, finish. By convention
//! the new/target thread id for
//! `thread-create` and `thread-join` travels in [`Action::value`], since
//! those actions are issued by a thread other than (or, for join, in
//! addition to) the one they reference.

use super::{Execution, StepOutcome, ThreadState, ThreadStatus};
use crate::action::Action;
use crate::ids::{ActionId, ThreadId};

pub(super) fn process_create(exec: &mut Execution, curr: &mut Action) -> StepOutcome {
    let new_tid = ThreadId(curr.value as u32);
    let creator_id = ActionId(exec.actions.len() as u32);

    let idx = new_tid.as_usize();
    if exec.threads.len() <= idx {
        exec.threads.resize_with(idx + 1, || ThreadState::new(None));
    }
    exec.threads[idx] = ThreadState::new(Some(creator_id));
    exec.scheduler.ensure_thread(new_tid);
    StepOutcome::Committed
}

pub(super) fn process_start(exec: &mut Execution, curr: &mut Action) -> StepOutcome {
    let creator = exec.threads.get(curr.tid.as_usize()).and_then(|t| t.creator);
    if let Some(creator_id) = creator {
        let creator_cv = exec.action(creator_id).clock_vector.clone();
        curr.clock_vector.merge(&creator_cv);
    }
    if let Some(t) = exec.threads.get_mut(curr.tid.as_usize()) {
        t.status = ThreadStatus::Running;
    }
    StepOutcome::Committed
}

pub(super) fn process_join(exec: &mut Execution, curr: &mut Action) -> StepOutcome {
    let target = ThreadId(curr.value as u32);
    // Record the joiner's intent even while blocked, so `process_finish` can
    // find and wake it; `is_enabled`'s check above is what actually gates
    // re-selection, this is just bookkeeping for the wake-up.
    exec.ensure_thread(curr.tid, None);
    exec.threads[curr.tid.as_usize()].joined_on = Some(target);

    let Some(target_state) = exec.threads.get(target.as_usize()) else {
        return StepOutcome::Blocked;
    };
    if target_state.status != ThreadStatus::Complete {
        return StepOutcome::Blocked;
    }
    if let Some(finish_id) = target_state.last_action {
        let finish_cv = exec.action(finish_id).clock_vector.clone();
        curr.clock_vector.merge(&finish_cv);
    }
    StepOutcome::Committed
}

pub(super) fn process_finish(exec: &mut Execution, curr: &mut Action) -> StepOutcome {
    if let Some(t) = exec.threads.get_mut(curr.tid.as_usize()) {
        t.status = ThreadStatus::Complete;
    }
    exec.scheduler.set_status(curr.tid, crate::scheduler::EnabledState::Disabled);

    let joiners: Vec<ThreadId> = exec
        .threads
        .iter()
        .enumerate()
        .filter(|(_, t)| t.joined_on == Some(curr.tid))
        .map(|(i, _)| ThreadId(i as u32))
        .collect();
    for joiner in joiners {
        exec.scheduler.wake(joiner);
    }
    StepOutcome::Committed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionKind, MemoryOrder, VALUE_NONE};
    use crate::config::CheckerConfig;
    use crate::execution::{Execution, PendingAction};
    use crate::ids::Location;

    #[test]
    fn join_blocks_until_target_finishes_then_synchronizes() {
        let mut exec = Execution::new(CheckerConfig::default());

        exec.step(PendingAction {
            kind: ActionKind::ThreadCreate,
            order: MemoryOrder::Relaxed,
            location: Location(0),
            tid: ThreadId::MAIN,
            value: 1,
            message: None,
            spawn_body: None,
        });
        exec.step(PendingAction {
            kind: ActionKind::ThreadStart,
            order: MemoryOrder::Relaxed,
            location: Location(0),
            tid: ThreadId(1),
            value: VALUE_NONE,
            message: None,
            spawn_body: None,
        });

        let blocked = exec.step(PendingAction {
            kind: ActionKind::ThreadJoin,
            order: MemoryOrder::Relaxed,
            location: Location(0),
            tid: ThreadId::MAIN,
            value: 1,
            message: None,
            spawn_body: None,
        });
        assert_eq!(blocked, StepOutcome::Blocked);

        exec.step(PendingAction {
            kind: ActionKind::ThreadFinish,
            order: MemoryOrder::Relaxed,
            location: Location(0),
            tid: ThreadId(1),
            value: VALUE_NONE,
            message: None,
            spawn_body: None,
        });

        let joined = exec.step(PendingAction {
            kind: ActionKind::ThreadJoin,
            order: MemoryOrder::Relaxed,
            location: Location(0),
            tid: ThreadId::MAIN,
            value: 1,
            message: None,
            spawn_body: None,
        });
        assert_eq!(joined, StepOutcome::Committed);
    }
}
