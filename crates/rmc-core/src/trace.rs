// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Debug formatting for executions, standing in for CDSChecker's
//! `model_print`-routed trace dump. Intended for `-v` verbose diagnostics
//! and test failure output, not for machine parsing.

use crate::execution::Execution;
use std::fmt::Write as _;

pub fn format_execution(exec: &Execution) -> String {
    let mut out = String::new();
    for (i, action) in exec.actions.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>4}  T{:<3} {:?} {:?} loc={:?} val={} seq={} rf={:?}",
            i,
            action.tid.as_usize(),
            action.kind,
            action.order,
            action.location,
            action.value,
            action.seq_number,
            action.reads_from,
        );
    }
    if !exec.bugs().is_empty() {
        let _ = writeln!(out, "--- bugs ---");
        let _ = write!(out, "{}", exec.bugs());
    }
    out
}
