// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate-wide error type.
//!
//! Recoverable, per-execution findings (data races, infeasible traces, user
//! assertion failures) are reported through [`crate::bugs::BugReport`], not
//! through this type — those are expected, bounded outcomes of exploring
//! all of a program's interleavings. `Error` is reserved for conditions a
//! caller of this crate's API can hit before or around an execution:
//! misconfiguration, an exhausted search space, or an internal invariant
//! violation.

use std::fmt;

#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A [`crate::config::CheckerConfig`] bound was set to a value the
    /// engine cannot act on (e.g. a zero step bound).
    InvalidConfig(String),

    // ========================================================================
    // Search Errors
    // ========================================================================
    /// `next_execution()` was called after exploration already completed.
    ExplorationComplete,
    /// The node stack was asked to replay past a divergence point it
    /// doesn't contain; indicates caller misuse of [`crate::checker`].
    InvalidDivergencePoint,

    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// A modeled thread's OS-thread handle panicked instead of yielding.
    ThreadPanicked(String),
    /// An internal invariant was violated (arena index out of bounds, a
    /// decision node consulted after its stack frame was popped, etc).
    /// Distinct from a reported bug: this means the engine itself is wrong,
    /// not the program under test.
    Internal(String),

    // ========================================================================
    // Analyzer Errors
    // ========================================================================
    /// A [`crate::analyzer::TraceAnalyzer`] plugin was configured with an
    /// option it doesn't recognize.
    UnknownAnalyzerOption { analyzer: String, option: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            Error::ExplorationComplete => write!(f, "exploration already complete"),
            Error::InvalidDivergencePoint => write!(f, "invalid divergence point"),
            Error::ThreadPanicked(msg) => write!(f, "modeled thread panicked: {}", msg),
            Error::Internal(msg) => write!(f, "internal invariant violated: {}", msg),
            Error::UnknownAnalyzerOption { analyzer, option } => {
                write!(f, "analyzer {:?} does not recognize option {:?}", analyzer, option)
            }
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_include_the_offending_detail() {
        let err = Error::InvalidConfig("step_bound must be > 0".to_string());
        assert!(err.to_string().contains("step_bound"));

        let err = Error::UnknownAnalyzerOption {
            analyzer: "race-summary".to_string(),
            option: "--bogus".to_string(),
        };
        assert!(err.to_string().contains("race-summary"));
        assert!(err.to_string().contains("--bogus"));
    }
}
