// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Global logger instance and initialization.

use super::output::{LogLevel, Output};
use std::io;
use std::sync::{Arc, Mutex, OnceLock};

static LOGGER: OnceLock<Arc<Mutex<GlobalLogger>>> = OnceLock::new();

pub struct GlobalLogger {
    output: Option<Arc<dyn Output>>,
    level_filter: LogLevel,
}

impl GlobalLogger {
    fn new() -> Self {
        Self { output: None, level_filter: LogLevel::Info }
    }

    fn log(&self, level: LogLevel, message: &str) -> io::Result<()> {
        if level < self.level_filter {
            return Ok(());
        }
        if let Some(ref output) = self.output {
            output.write(level, message)?;
        }
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        if let Some(ref output) = self.output {
            output.flush()?;
        }
        Ok(())
    }
}

fn global() -> &'static Arc<Mutex<GlobalLogger>> {
    LOGGER.get_or_init(|| Arc::new(Mutex::new(GlobalLogger::new())))
}

/// Initialize the global logger. Only the first call takes effect.
pub fn init_logger(output: Arc<dyn Output>, level: LogLevel) {
    if let Ok(mut logger) = global().lock() {
        if logger.output.is_none() {
            logger.output = Some(output);
            logger.level_filter = level;
        }
    }
}

pub fn log_message(level: LogLevel, message: &str) -> io::Result<()> {
    global()
        .lock()
        .map_err(|_| io::Error::other("logger mutex poisoned"))?
        .log(level, message)
}

pub fn flush_logger() -> io::Result<()> {
    global()
        .lock()
        .map_err(|_| io::Error::other("logger mutex poisoned"))?
        .flush()
}

/// Emits a `[ENTER:FNC] name` trace marker, used by the `trace_fn!` macro.
pub fn trace_entry(fn_name: &str) -> io::Result<()> {
    log_message(LogLevel::Debug, &format!("[ENTER:FNC] {}", fn_name))
}
