// src/engine/mod.rs

//! Task execution.
//!
//! - [`executor`] walks composites (series / parallel) and runs each
//!   reachable primitive at most once per invocation.
//! - [`runner`] performs a single primitive's action against the real
//!   filesystem; tests substitute their own [`PrimitiveRunner`].

use std::path::PathBuf;

use crate::reload::ReloadKind;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// What a single primitive produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimitiveOutcome {
    /// Files written (root-relative). Unchanged files are included.
    pub outputs: Vec<PathBuf>,
    /// The task asked for viewers to be refreshed.
    pub live_reload: bool,
}

/// Aggregate result of [`Executor::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub outputs: Vec<PathBuf>,
    pub live_reload: bool,
    /// Primitives run, in completion order.
    pub tasks_run: Vec<TaskName>,
}

impl RunSummary {
    pub(crate) fn absorb(&mut self, task: &str, outcome: PrimitiveOutcome) {
        self.outputs.extend(outcome.outputs);
        self.live_reload |= outcome.live_reload;
        self.tasks_run.push(task.to_string());
    }

    /// The reload push this run calls for, if any.
    pub fn reload_kind(&self) -> Option<ReloadKind> {
        self.live_reload
            .then(|| ReloadKind::for_outputs(&self.outputs))
    }
}

pub mod executor;
pub mod runner;

pub use executor::Executor;
pub use runner::{FsRunner, PrimitiveRunner};
