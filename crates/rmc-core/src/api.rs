// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! User-program API surface: the functions a program under test calls to
//! create threads and perform the modeled memory operations that
//! [`crate::atomic::Atomic`] and [`crate::sync`] build on.
//!
//! Every modeled thread's body runs with a [`crate::fiber::FiberControl`]
//! stashed in a thread-local; `propose` hands the pending action to the
//! engine across that thread's rendezvous channel and blocks until the
//! checker has committed or rejected it.

use crate::action::{ActionKind, MemoryOrder};
use crate::execution::PendingAction;
use crate::fiber::FiberControl;
use crate::ids::{Location, ThreadId};
use std::cell::RefCell;

thread_local! {
    static CONTROL: RefCell<Option<FiberControl>> = const { RefCell::new(None) };
    static CURRENT_TID: RefCell<ThreadId> = const { RefCell::new(ThreadId::MAIN) };
}

/// Installs this thread's hand-off channel and modeled id; called once by
/// [`crate::fiber::FiberHandle::spawn`]'s body closure before running any
/// user code.
pub fn bind_thread(tid: ThreadId, control: FiberControl) {
    CURRENT_TID.with(|c| *c.borrow_mut() = tid);
    CONTROL.with(|c| *c.borrow_mut() = Some(control));
}

pub fn thread_current() -> ThreadId {
    CURRENT_TID.with(|c| *c.borrow())
}

/// Hands one pending action to the engine and blocks until it is committed,
/// returning the value the engine recorded (the observed value for a read,
/// the success flag for a trylock, or the input value echoed back for a
/// write).
pub fn propose(kind: ActionKind, order: MemoryOrder, location: Location, value: u64) -> u64 {
    propose_action(PendingAction {
        kind,
        order,
        location,
        tid: thread_current(),
        value,
        message: None,
        spawn_body: None,
    })
}

fn propose_action(pending: PendingAction) -> u64 {
    let result = CONTROL.with(|c| {
        c.borrow()
            .as_ref()
            .and_then(|ctl| ctl.yield_point(pending))
    });
    match result {
        Some(value) => value,
        // The checker decided this execution is over; unwind this thread
        // via panic so `FiberHandle`'s `catch_unwind` reports it cleanly
        // rather than letting it run further user code.
        None => std::panic::panic_any(ThreadStopped),
    }
}

/// Sentinel panic payload used to unwind a modeled thread once the checker
/// has ended its execution; never surfaced to user code.
struct ThreadStopped;

pub fn thread_yield() {
    propose(ActionKind::ThreadYield, MemoryOrder::Relaxed, Location(0), 0);
}

/// A fresh thread id handed to [`thread_create`]'s spawned body, monotonic
/// for the lifetime of the process. Modeled thread ids never need to be
/// reclaimed; each checker run constructs a fresh `Execution` and fiber set.
fn next_thread_id() -> ThreadId {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(1);
    ThreadId(COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Spawns a new modeled thread running `body`, proposing the matching
/// `ThreadCreate` action on the caller's behalf. `checker.rs` is the one
/// that actually calls [`crate::fiber::FiberHandle::spawn`] with the
/// returned closure once this action commits; here we only package it and
/// wrap it so the new thread announces its own start and finish.
pub fn thread_create<F>(body: F) -> ThreadId
where
    F: FnOnce() + Send + 'static,
{
    let new_tid = next_thread_id();
    let spawn_body: Box<dyn FnOnce(FiberControl) + Send> = Box::new(move |ctl| {
        bind_thread(new_tid, ctl);
        propose(ActionKind::ThreadStart, MemoryOrder::Relaxed, Location(0), 0);
        body();
        propose(ActionKind::ThreadFinish, MemoryOrder::Relaxed, Location(0), 0);
    });
    propose_action(PendingAction {
        kind: ActionKind::ThreadCreate,
        order: MemoryOrder::Relaxed,
        location: Location(0),
        tid: thread_current(),
        value: new_tid.0 as u64,
        message: None,
        spawn_body: Some(spawn_body),
    });
    new_tid
}

pub fn thread_join(target: ThreadId) {
    propose(ActionKind::ThreadJoin, MemoryOrder::SeqCst, Location(0), target.0 as u64);
}

/// Asserts a user-program invariant; failure is reported as a bug on the
/// current execution rather than panicking the host process.
#[macro_export]
macro_rules! model_assert {
    ($cond:expr) => {
        if !($cond) {
            $crate::api::report_assertion_failure(stringify!($cond));
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        if !($cond) {
            $crate::api::report_assertion_failure(&format!($($arg)+));
        }
    };
}

pub fn report_assertion_failure(message: &str) {
    propose_action(PendingAction {
        kind: ActionKind::Assert,
        order: MemoryOrder::Relaxed,
        location: Location(0),
        tid: thread_current(),
        value: 0,
        message: Some(message.to_string()),
        spawn_body: None,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn propose_without_a_bound_control_reports_stopped() {
        let result = std::panic::catch_unwind(|| {
            propose(ActionKind::ThreadYield, MemoryOrder::Relaxed, Location(0), 0)
        });
        assert!(result.is_err(), "propose with no bound fiber control should unwind");
    }

    #[test]
    fn thread_current_defaults_to_main() {
        assert_eq!(thread_current(), ThreadId::MAIN);
    }

    #[test]
    fn thread_create_allocates_increasing_ids() {
        let a = next_thread_id();
        let b = next_thread_id();
        assert!(b.0 > a.0);
    }
}
