// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # rmc-core - Relaxed-Memory Checker
//!
//! A stateless, bounded model checker for C11/C++11-style concurrent
//! programs written against relaxed atomics. Rather than testing a program
//! by running it once and hoping a race surfaces, `rmc-core` systematically
//! replays the program under every legal thread interleaving and memory-model
//! behavior up to a configurable bound, reporting data races, unrealizable
//! cycles, deadlocks, and failed user assertions as soon as some interleaving
//! exhibits them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rmc_core::api;
//! use rmc_core::atomic::Atomic;
//! use rmc_core::checker::Checker;
//! use rmc_core::config::CheckerConfig;
//! use rmc_core::action::MemoryOrder;
//!
//! let mut checker = Checker::new(CheckerConfig::default());
//! let report = checker.check(|| {
//!     let x = Atomic::new(0u64);
//!     let t = api::thread_create(move || {
//!         x.store(1, MemoryOrder::Release);
//!     });
//!     api::thread_join(t);
//! });
//! assert!(!report.has_bugs());
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +----------------------------------------------------------------+
//! |                        Checker (driver)                        |
//! |   NodeStack (decision tree) <-> one fresh Execution per round   |
//! +----------------------------------------------------------------+
//! |                      Execution (per round)                     |
//! |  clock vectors | modification order | release sequences |       |
//! |  promises/future values | data-race shadow state | bug report   |
//! +----------------------------------------------------------------+
//! |                  Fiber layer (one OS thread per                |
//! |                  modeled thread, single-runner hand-off)        |
//! +----------------------------------------------------------------+
//! |            User-program API (atomics, mutexes, threads)         |
//! +----------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`checker::Checker`] | Entry point; drives repeated rounds to exhaustion |
//! | [`execution::Execution`] | One candidate interleaving's full engine state |
//! | [`atomic::Atomic`] | A modeled relaxed/acquire/release/seqcst memory location |
//! | [`sync::Mutex`] | A modeled mutex, built on the same engine primitives |
//! | [`nodestack::NodeStack`] | Persistent decision tree driving backtracking |
//! | [`bugs::BugKind`] | The kinds of defects a round can report |
//!
//! ## Modules Overview
//!
//! - [`checker`] - outer driver: repeated rounds, backtracking, analyzers
//! - [`execution`] - one round's engine state and the `step` dispatch
//! - [`action`] - the `Action`/`ActionKind`/`MemoryOrder` vocabulary
//! - [`clock`] - clock vectors (happens-before)
//! - [`cyclegraph`] - modification-order graph and RMW atomicity
//! - [`datarace`] - shadow-memory race detection
//! - [`node`] / [`nodestack`] - the decision-tree search structure (DPOR)
//! - [`scheduler`] - deterministic thread selection
//! - [`promise`] - speculative future-value reads
//! - [`fiber`] - the OS-thread hand-off layer
//! - [`api`] - the surface a checked program calls into
//! - [`atomic`] / [`sync`] - the modeled memory and synchronization types
//! - [`analyzer`] / [`trace`] - post-hoc trace inspection
//! - [`bugs`] - defect reporting
//! - [`config`] - tunable bounds
//! - [`error`] - library error type
//! - [`logging`] - compile-time configurable logging (zero-cost when disabled)
//!
//! ## See Also
//!
//! - [Hans-J. Boehm & Sarita V. Adve, "Foundations of the C++ Concurrency
//!   Memory Model"](https://dl.acm.org/doi/10.1145/1375581.1375591)
//! - [Norris & Demsky, "CDSChecker: Checking Concurrent Data Structures
//!   Written with C/C++ Atomics"](https://dl.acm.org/doi/10.1145/2509136.2509514)

/// User-program atomic memory locations built on the engine's read/write actions.
pub mod atomic;
/// The core vocabulary of modeled memory operations (`Action`, `ActionKind`, `MemoryOrder`).
pub mod action;
/// Post-hoc trace analyzers run once per completed round.
pub mod analyzer;
/// The surface a checked program calls into (threads, atomics, assertions).
pub mod api;
/// Defect reporting: data races, unrealizable cycles, deadlocks, failed assertions.
pub mod bugs;
/// Outer driver: owns the persistent decision tree and runs rounds to exhaustion.
pub mod checker;
/// Clock vectors implementing happens-before.
pub mod clock;
/// Tunable bounds governing an exploration (step bound, fairness window, future values).
pub mod config;
/// Modification-order graph and RMW-atomicity enforcement.
pub mod cyclegraph;
/// Shadow-memory data-race detection.
pub mod datarace;
/// Library error type.
pub mod error;
/// One candidate interleaving's full engine state and its `step` dispatch.
pub mod execution;
/// The OS-thread hand-off layer standing in for stackful fibers.
pub mod fiber;
/// Arena-indexed identifiers (`ThreadId`, `ActionId`, `NodeId`, `PromiseId`, `Location`).
pub mod ids;
/// Compile-time configurable logging, zero-cost when the `logging` feature is off.
pub mod logging;
/// A single node of the decision tree: per-thread backtrack sets and read-from candidates.
pub mod node;
/// The persistent decision tree driving systematic backtracking across rounds.
pub mod nodestack;
/// Speculative future-value reads (promises) for relaxed-atomic read-from candidates.
pub mod promise;
/// Deterministic, priority- and sleep-set-aware thread selection.
pub mod scheduler;
/// Checkpoint/rollback primitives for incremental undo within a round.
pub mod snapshot;
/// Modeled synchronization types (`Mutex`, `CondVar`) built on the engine primitives.
pub mod sync;
/// Debug formatting for completed executions.
pub mod trace;

pub use bugs::{BugKind, BugMessage};
pub use checker::{Checker, CheckerReport};
pub use config::CheckerConfig;
pub use error::{Error, Result};
pub use execution::Execution;

/// `rmc-core` version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
