// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetflowError {
    /// Unknown logical path, invalid config value, missing config file.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Unrecognised transform stage name or malformed stage options.
    #[error("Stage configuration error: {0}")]
    StageConfigError(String),

    /// A compiler or external transform rejected its input.
    #[error("Compile error in {}: {message}", path.display())]
    CompileError { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("IO error at {}: {source}", path.display())]
    IoAtError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cycle detected in task graph: {0}")]
    CycleError(String),

    #[error("Unknown task: {0}")]
    UnknownTaskError(String),

    #[error("Task '{task}' failed: {source}")]
    TaskFailedError {
        task: String,
        #[source]
        source: Box<AssetflowError>,
    },

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AssetflowError {
    /// Attach a path to a raw IO error.
    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AssetflowError::IoAtError {
            path: path.into(),
            source,
        }
    }

    /// Wrap this error with the name of the task it surfaced in.
    ///
    /// Errors that already carry a task name are returned unchanged so nested
    /// composites don't stack the same context.
    pub fn in_task(self, task: &str) -> Self {
        match self {
            err @ AssetflowError::TaskFailedError { .. } => err,
            other => AssetflowError::TaskFailedError {
                task: task.to_string(),
                source: Box::new(other),
            },
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetflowError>;
