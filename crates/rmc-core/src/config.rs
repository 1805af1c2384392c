// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Checker Configuration - Single Source of Truth
//!
//! This module centralizes every bound and default value the engine
//! consults while exploring executions.
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: compile-time defaults for every bound (this
//!   module's `DEFAULT_*` constants).
//! - **Level 2 (Dynamic)**: [`CheckerConfig`], the runtime-tunable set of
//!   bounds a harness constructs from its own CLI flags.
//!
//! This struct intentionally does not depend on `clap` or any argument
//! parser: it documents, field by field, what each of the CLI front end's
//! flags (`-m -M -s -S -f -e -b -y -Y -u -v -t -o`) would populate, so a
//! harness crate can build a `CheckerConfig` from whatever argument parser
//! it prefers without this crate carrying that dependency.

/// `-m`: reads of the same write by the same thread beyond this count,
/// while alternatives remain, mark the execution redundant.
pub const DEFAULT_MAXREADS: u32 = 16;
/// `-M`: future values proposed per read.
pub const DEFAULT_MAX_FUTURE_VALUES: u32 = 5;
/// `-s`: ticks added to the current clock to form a future value's expiration.
pub const DEFAULT_MAX_FUTURE_DELAY: u64 = 100;
/// `-S`: minimum clock-tick gap between two proposed future values before
/// the later one is dropped as a near-duplicate.
pub const DEFAULT_EXPIRE_SLOP: u64 = 4;
/// `-f`: sliding window (in steps) over which fairness counters accumulate.
pub const DEFAULT_FAIRNESS_WINDOW: u32 = 64;
/// `-e`: `enabled_count` threshold past which a thread is flagged priority.
pub const DEFAULT_ENABLED_THRESHOLD: u32 = 32;
/// `-b`: hard cap on steps per execution.
pub const DEFAULT_STEP_BOUND: u64 = 100_000;
/// `-u`: value observed by a read of a location with no prior write.
pub const DEFAULT_UNINIT_VALUE: u64 = 0;

/// Runtime-tunable exploration bounds. Every field here corresponds to one
/// CLI flag a front end would expose; see the module doc for the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckerConfig {
    pub maxreads: u32,
    pub max_future_values: u32,
    pub max_future_delay: u64,
    pub expire_slop: u64,
    pub fairness_window: u32,
    pub enabled_threshold: u32,
    pub step_bound: u64,
    pub uninit_value: u64,
    /// `-y`: enable yield-based fairness nudging.
    pub yield_fairness: bool,
    /// `-Y`: prohibit explicit thread-yield actions entirely.
    pub prohibit_yield: bool,
    /// `-v[N]`: logging verbosity; see [`crate::logging`].
    pub verbosity: u8,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        CheckerConfig {
            maxreads: DEFAULT_MAXREADS,
            max_future_values: DEFAULT_MAX_FUTURE_VALUES,
            max_future_delay: DEFAULT_MAX_FUTURE_DELAY,
            expire_slop: DEFAULT_EXPIRE_SLOP,
            fairness_window: DEFAULT_FAIRNESS_WINDOW,
            enabled_threshold: DEFAULT_ENABLED_THRESHOLD,
            step_bound: DEFAULT_STEP_BOUND,
            uninit_value: DEFAULT_UNINIT_VALUE,
            yield_fairness: false,
            prohibit_yield: false,
            verbosity: 0,
        }
    }
}

impl CheckerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step_bound(mut self, bound: u64) -> Self {
        self.step_bound = bound;
        self
    }

    pub fn with_maxreads(mut self, maxreads: u32) -> Self {
        self.maxreads = maxreads;
        self
    }

    pub fn with_uninit_value(mut self, value: u64) -> Self {
        self.uninit_value = value;
        self
    }
}
