// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Thread Contexts
//!
//! Every modeled user thread runs on a real OS thread, but only one may be
//! running at a time: the engine hands off execution explicitly, step by
//! step, so that the checker fully controls the interleaving.
//!
//! No stackful-coroutine crate is available in our dependency stack, so we
//! don't suspend a user thread mid-expression the way CDSChecker's
//! `ucontext`-based fibers did. Instead each user thread blocks on a
//! rendezvous channel between every modeled memory operation, and the
//! checker wakes exactly one thread at a time by sending on its channel and
//! then blocking on a shared completion channel until that thread either
//! finishes its next operation or exits. This reproduces the same
//! single-runner invariant a `ucontext`-based scheduler relied on, built entirely
//! from `crossbeam::channel`.

use crate::execution::PendingAction;
use crate::ids::ThreadId;
use crossbeam::channel::{bounded, Receiver, Sender};
use std::thread::JoinHandle;

/// Sent to a parked user thread to let it run until its next memory
/// operation (or to tell it the execution is over and it should exit).
/// `Continue` carries the value the engine committed for whatever action
/// this thread last proposed (ignored on the very first resume, before the
/// thread has proposed anything).
#[derive(Debug, Clone)]
pub enum Resume {
    Continue(u64),
    Terminate,
}

/// Sent back from a user thread once it reaches its next operation (or
/// finishes).
#[derive(Debug)]
pub enum Yielded {
    /// The thread wants to perform `PendingAction` and is now parked
    /// awaiting the checker's verdict on it.
    AtOperation(PendingAction),
    Finished,
    /// The thread's closure panicked; carries the panic payload formatted as
    /// a string since `Box<dyn Any + Send>` isn't useful past this point.
    Panicked(String),
}

/// The checker's handle onto one user thread's OS thread and hand-off
/// channels. Dropping this without first sending [`Resume::Terminate`] will
/// deadlock the owning [`std::thread::JoinHandle`] on drop of its sender, so
/// callers must always terminate before tearing down a fiber set.
pub struct FiberHandle {
    pub tid: ThreadId,
    to_fiber: Sender<Resume>,
    from_fiber: Receiver<Yielded>,
    join: Option<JoinHandle<()>>,
}

impl FiberHandle {
    /// Spawns `body` on a new OS thread, parked immediately awaiting the
    /// first [`Resume`]. `body` receives a [`FiberControl`] it must call
    /// `yield_point()` on between memory operations.
    pub fn spawn<F>(tid: ThreadId, body: F) -> Self
    where
        F: FnOnce(FiberControl) + Send + 'static,
    {
        let (to_fiber_tx, to_fiber_rx) = bounded::<Resume>(0);
        let (from_fiber_tx, from_fiber_rx) = bounded::<Yielded>(0);

        let control = FiberControl {
            to_fiber: to_fiber_rx,
            from_fiber: from_fiber_tx.clone(),
        };

        let join = std::thread::Builder::new()
            .name(format!("rmc-thread-{tid}"))
            .spawn(move || {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    body(control);
                }));
                if let Err(payload) = result {
                    let msg = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "user thread panicked".to_string());
                    let _ = from_fiber_tx.send(Yielded::Panicked(msg));
                } else {
                    let _ = from_fiber_tx.send(Yielded::Finished);
                }
            })
            .expect("failed to spawn modeled-thread worker");

        FiberHandle {
            tid,
            to_fiber: to_fiber_tx,
            from_fiber: from_fiber_rx,
            join: Some(join),
        }
    }

    /// Wakes the fiber to run its next operation, handing back `value` as
    /// the result of whatever it last proposed (ignored on the first call),
    /// and blocks until it yields again (at its next operation, or by
    /// finishing/panicking).
    pub fn resume(&self, value: u64) -> Yielded {
        if self.to_fiber.send(Resume::Continue(value)).is_err() {
            return Yielded::Finished;
        }
        self.from_fiber.recv().unwrap_or(Yielded::Finished)
    }

    /// Tells the fiber to unwind without running further user code, then
    /// joins its OS thread.
    pub fn terminate(mut self) {
        let _ = self.to_fiber.send(Resume::Terminate);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for FiberHandle {
    fn drop(&mut self) {
        if let Some(join) = self.join.take() {
            let _ = self.to_fiber.send(Resume::Terminate);
            let _ = join.join();
        }
    }
}

/// Given to the body of a modeled thread; call [`Self::yield_point`] after
/// proposing every memory operation to hand control back to the checker and
/// block until it is this thread's turn again.
pub struct FiberControl {
    to_fiber: Receiver<Resume>,
    from_fiber: Sender<Yielded>,
}

impl FiberControl {
    /// Proposes `action` to the checker and parks until it is resolved.
    /// Returns `None` if the checker has decided the execution is over and
    /// this thread must stop making further calls into the engine, `Some`
    /// with the committed value otherwise.
    pub fn yield_point(&self, action: PendingAction) -> Option<u64> {
        if self.from_fiber.send(Yielded::AtOperation(action)).is_err() {
            return None;
        }
        match self.to_fiber.recv() {
            Ok(Resume::Continue(value)) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionKind, MemoryOrder, VALUE_NONE};
    use crate::ids::Location;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn probe(tid: ThreadId) -> PendingAction {
        PendingAction {
            kind: ActionKind::ThreadYield,
            order: MemoryOrder::Relaxed,
            location: Location(0),
            tid,
            value: VALUE_NONE,
            message: None,
            spawn_body: None,
        }
    }

    #[test]
    fn fiber_runs_only_between_explicit_resumes() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        let handle = FiberHandle::spawn(ThreadId(0), move |ctl| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            if ctl.yield_point(probe(ThreadId(0))).is_none() {
                return;
            }
            counter_clone.fetch_add(1, Ordering::SeqCst);
            if ctl.yield_point(probe(ThreadId(0))).is_none() {
                return;
            }
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(matches!(handle.resume(0), Yielded::AtOperation(_)));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        assert!(matches!(handle.resume(0), Yielded::AtOperation(_)));
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        assert!(matches!(handle.resume(0), Yielded::Finished));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn terminate_stops_thread_before_its_final_yield() {
        let ran_past_terminate = Arc::new(AtomicUsize::new(0));
        let flag = ran_past_terminate.clone();

        let handle = FiberHandle::spawn(ThreadId(1), move |ctl| {
            if ctl.yield_point(probe(ThreadId(1))).is_none() {
                return;
            }
            flag.fetch_add(1, Ordering::SeqCst);
        });

        handle.terminate();
        assert_eq!(ran_past_terminate.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_fiber_reports_panicked() {
        let handle = FiberHandle::spawn(ThreadId(2), move |_ctl| {
            panic!("boom");
        });
        assert!(matches!(handle.resume(0), Yielded::Panicked(_)));
    }
}
