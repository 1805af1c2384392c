// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Trace-analyzer plugin interface. `checker.rs` calls
//! every registered analyzer at the end of each execution and again once at
//! the end of the whole run, so plugins can accumulate cross-execution
//! statistics (race summaries, happens-before graphs, coverage reports).

use crate::execution::Execution;

pub trait TraceAnalyzer: Send {
    /// A short identifier, used by the front end's `-t NAME` flag and in
    /// diagnostics.
    fn name(&self) -> &str;

    /// Configures one `-o OPT` front-end option. Analyzers that don't
    /// recognize `key` should return `Err` so the front end can surface a
    /// useful message rather than silently ignoring a typo'd flag.
    fn option(&mut self, key: &str, value: &str) -> crate::error::Result<()>;

    /// Called once per execution, before `analyze`, so the plugin can
    /// inspect the execution that just finished.
    fn set_execution(&mut self, execution: &Execution);

    /// Called once per execution after `set_execution`.
    fn analyze(&mut self);

    /// Called once after the whole run (every execution) completes.
    fn finish(&mut self);
}

/// A trivial analyzer counting how many executions surfaced at least one
/// bug, useful as both a smoke test and a template for real plugins.
#[derive(Debug, Default)]
pub struct BugTallyAnalyzer {
    pub executions_seen: u64,
    pub executions_with_bugs: u64,
    current_has_bugs: bool,
}

impl TraceAnalyzer for BugTallyAnalyzer {
    fn name(&self) -> &str {
        "bug-tally"
    }

    fn option(&mut self, key: &str, _value: &str) -> crate::error::Result<()> {
        Err(crate::error::Error::UnknownAnalyzerOption {
            analyzer: self.name().to_string(),
            option: key.to_string(),
        })
    }

    fn set_execution(&mut self, execution: &Execution) {
        self.current_has_bugs = !execution.bugs().is_empty();
    }

    fn analyze(&mut self) {
        self.executions_seen += 1;
        if self.current_has_bugs {
            self.executions_with_bugs += 1;
        }
    }

    fn finish(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckerConfig;

    #[test]
    fn bug_tally_counts_only_executions_with_bugs() {
        let mut analyzer = BugTallyAnalyzer::default();

        let clean = Execution::new(CheckerConfig::default());
        analyzer.set_execution(&clean);
        analyzer.analyze();

        let mut buggy = Execution::new(CheckerConfig::default());
        buggy.assert_bug("boom");
        analyzer.set_execution(&buggy);
        analyzer.analyze();

        assert_eq!(analyzer.executions_seen, 2);
        assert_eq!(analyzer.executions_with_bugs, 1);
    }

    #[test]
    fn unknown_option_is_rejected() {
        let mut analyzer = BugTallyAnalyzer::default();
        assert!(analyzer.option("--nope", "1").is_err());
    }
}
