// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `process_mutex`: lock/trylock/unlock and condition-variable wait/notify.

use super::{Execution, StepOutcome};
use crate::action::{Action, VALUE_TRYFAILED, VALUE_TRYSUCCESS};
use crate::ids::ThreadId;
use std::collections::VecDeque;

#[derive(Debug, Clone, Default)]
pub struct MutexState {
    pub holder: Option<ThreadId>,
    pub last_unlock_clock: Option<crate::clock::ClockVector>,
    waiters: VecDeque<ThreadId>,
}

#[derive(Debug, Clone, Default)]
pub struct CondvarQueue {
    waiting: VecDeque<ThreadId>,
}

pub(super) fn process_mutex(exec: &mut Execution, curr: &mut Action) -> StepOutcome {
    match curr.kind {
        crate::action::ActionKind::Lock => lock(exec, curr, false),
        crate::action::ActionKind::TryLock => lock(exec, curr, true),
        crate::action::ActionKind::Unlock => unlock(exec, curr),
        crate::action::ActionKind::Wait => wait(exec, curr),
        crate::action::ActionKind::NotifyOne => notify(exec, curr, false),
        crate::action::ActionKind::NotifyAll => notify(exec, curr, true),
        _ => unreachable!("process_mutex dispatched on a non-mutex action"),
    }
}

fn lock(exec: &mut Execution, curr: &mut Action, is_try: bool) -> StepOutcome {
    let state = exec.mutexes.entry(curr.location).or_default();
    if state.holder.is_some() {
        if is_try {
            curr.value = VALUE_TRYFAILED;
            return StepOutcome::Committed;
        }
        return StepOutcome::Blocked;
    }

    if let Some(unlock_cv) = state.last_unlock_clock.clone() {
        curr.clock_vector.merge(&unlock_cv);
    }
    state.holder = Some(curr.tid);
    if is_try {
        curr.value = VALUE_TRYSUCCESS;
    }
    StepOutcome::Committed
}

fn unlock(exec: &mut Execution, curr: &mut Action) -> StepOutcome {
    let state = exec.mutexes.entry(curr.location).or_default();
    if state.holder != Some(curr.tid) {
        return StepOutcome::Blocked;
    }
    state.holder = None;
    state.last_unlock_clock = Some(curr.clock_vector.clone());

    if let Some(next) = state.waiters.pop_front() {
        exec.scheduler.wake(next);
    }
    StepOutcome::Committed
}

fn wait(exec: &mut Execution, curr: &mut Action) -> StepOutcome {
    let mutex_loc = curr.location;
    let Some(state) = exec.mutexes.get_mut(&mutex_loc) else {
        return StepOutcome::Blocked;
    };
    if state.holder != Some(curr.tid) {
        return StepOutcome::Blocked;
    }
    // Atomically release the mutex and block on the condvar queue; the
    // thread must reacquire the mutex (via a later `Lock`) once notified.
    state.holder = None;
    state.last_unlock_clock = Some(curr.clock_vector.clone());
    if let Some(next) = state.waiters.pop_front() {
        exec.scheduler.wake(next);
    }

    exec.condvars.entry(mutex_loc).or_default().waiting.push_back(curr.tid);
    exec.scheduler.sleep(curr.tid);
    StepOutcome::Committed
}

fn notify(exec: &mut Execution, curr: &mut Action, all: bool) -> StepOutcome {
    let Some(queue) = exec.condvars.get_mut(&curr.location) else {
        return StepOutcome::Committed;
    };
    let woken: Vec<ThreadId> = if all {
        queue.waiting.drain(..).collect()
    } else {
        queue.waiting.pop_front().into_iter().collect()
    };
    for tid in woken {
        exec.mutexes.entry(curr.location).or_default().waiters.push_back(tid);
        exec.scheduler.wake(tid);
    }
    StepOutcome::Committed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionKind, MemoryOrder, VALUE_NONE};
    use crate::config::CheckerConfig;
    use crate::execution::{Execution, PendingAction, StepOutcome};
    use crate::ids::Location;

    fn act(kind: crate::action::ActionKind, tid: u32) -> PendingAction {
        PendingAction { kind, order: MemoryOrder::SeqCst, location: Location(1), tid: ThreadId(tid), value: VALUE_NONE, message: None, spawn_body: None }
    }

    #[test]
    fn second_lock_blocks_until_unlocked() {
        let mut exec = Execution::new(CheckerConfig::default());
        assert_eq!(exec.step(act(ActionKind::Lock, 0)), StepOutcome::Committed);
        assert_eq!(exec.step(act(ActionKind::Lock, 1)), StepOutcome::Blocked);
        assert_eq!(exec.step(act(ActionKind::Unlock, 0)), StepOutcome::Committed);
        assert_eq!(exec.step(act(ActionKind::Lock, 1)), StepOutcome::Committed);
    }

    #[test]
    fn trylock_never_blocks() {
        let mut exec = Execution::new(CheckerConfig::default());
        exec.step(act(ActionKind::Lock, 0));
        let outcome = exec.step(act(ActionKind::TryLock, 1));
        assert_eq!(outcome, StepOutcome::Committed);
        assert_eq!(exec.actions.last().unwrap().value, VALUE_TRYFAILED);
    }
}
