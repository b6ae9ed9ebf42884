// src/dag/task.rs

//! Task definitions stored in the [`TaskGraph`](super::TaskGraph).

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::engine::TaskName;
use crate::transform::TransformChain;
use crate::types::CompositeMode;
use crate::watch::patterns::SourceGlob;

/// Per-task flags applied around the action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskOptions {
    /// Insert this suffix before the extension of every output.
    pub rename_suffix: Option<String>,
    /// Success notification sent when the task completes.
    pub notify_message: Option<String>,
    /// Ask the dev server to refresh viewers after a run.
    pub live_reload: bool,
}

impl TaskOptions {
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.rename_suffix = Some(suffix.into());
        self
    }

    pub fn with_notify(mut self, message: impl Into<String>) -> Self {
        self.notify_message = Some(message.into());
        self
    }

    pub fn with_live_reload(mut self) -> Self {
        self.live_reload = true;
        self
    }
}

/// Read matching sources, transform them, write below `destination`.
#[derive(Debug, Clone)]
pub struct PipelineSpec {
    pub sources: SourceGlob,
    pub chain: TransformChain,
    /// Root-relative output directory.
    pub destination: PathBuf,
}

/// What a primitive task does when run.
#[derive(Debug, Clone)]
pub enum Action {
    Pipeline(PipelineSpec),
    /// Recursively delete a root-relative directory.
    Clean { dir: PathBuf },
    /// Only ask viewers to reload.
    Reload,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Pipeline(p) => write!(
                f,
                "[{}] -> {} -> {}",
                p.sources,
                p.chain,
                p.destination.display()
            ),
            Action::Clean { dir } => write!(f, "clean {}", dir.display()),
            Action::Reload => f.write_str("reload"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PrimitiveTask {
    pub name: TaskName,
    pub action: Action,
    pub options: TaskOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeTask {
    pub mode: CompositeMode,
    pub children: Vec<TaskName>,
}

/// A registered task. Cheap to clone.
#[derive(Debug, Clone)]
pub enum Task {
    Primitive(Arc<PrimitiveTask>),
    Composite(CompositeTask),
}

impl Task {
    /// Direct children; empty for primitives.
    pub fn children(&self) -> &[TaskName] {
        match self {
            Task::Primitive(_) => &[],
            Task::Composite(c) => &c.children,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Primitive(p) => write!(f, "{}", p.action),
            Task::Composite(c) => write!(f, "{}({})", c.mode, c.children.join(", ")),
        }
    }
}
