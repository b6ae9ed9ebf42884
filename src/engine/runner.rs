// src/engine/runner.rs

//! Pluggable primitive runner.
//!
//! The executor talks to a `PrimitiveRunner` instead of touching the
//! filesystem itself. Production code uses [`FsRunner`]; tests provide a
//! runner that records timings and simulates failures.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tracing::{debug, info};

use crate::dag::{Action, PipelineSpec, PrimitiveTask};
use crate::engine::PrimitiveOutcome;
use crate::errors::{AssetflowError, Result};
use crate::fs::{remove_dir_if_exists, write_if_changed};
use crate::transform::Artifact;

/// Trait abstracting how a single primitive is performed.
pub trait PrimitiveRunner: Send + Sync {
    fn run<'a>(
        &'a self,
        task: &'a PrimitiveTask,
    ) -> Pin<Box<dyn Future<Output = Result<PrimitiveOutcome>> + Send + 'a>>;
}

/// Runner that reads and writes below a project root.
#[derive(Debug, Clone)]
pub struct FsRunner {
    root: PathBuf,
}

impl FsRunner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn run_pipeline(&self, task: &PrimitiveTask, spec: &PipelineSpec) -> Result<PrimitiveOutcome> {
        let glob = spec.sources.compile()?;
        let root = self.root.clone();
        let sources = tokio::task::spawn_blocking(move || glob.collect(&root))
            .await
            .map_err(|e| AssetflowError::Other(anyhow::anyhow!("source scan failed: {e}")))??;

        debug!(task = %task.name, sources = sources.len(), glob = %spec.sources, "collected sources");

        let mut artifacts = Vec::with_capacity(sources.len());
        for source in &sources {
            let bytes = tokio::fs::read(&source.absolute)
                .await
                .map_err(|e| AssetflowError::io_at(&source.absolute, e))?;
            artifacts.push(Artifact::from_source(source, bytes));
        }

        let artifacts = spec.chain.apply(artifacts).await?;

        let mut outputs = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            let relative = spec.destination.join(&artifact.path);
            let target = self.root.join(&relative);
            let written = write_if_changed(&target, &artifact.contents).await?;
            debug!(task = %task.name, path = ?relative, written, "output");
            outputs.push(relative);
        }

        Ok(PrimitiveOutcome {
            outputs,
            live_reload: task.options.live_reload,
        })
    }
}

impl PrimitiveRunner for FsRunner {
    fn run<'a>(
        &'a self,
        task: &'a PrimitiveTask,
    ) -> Pin<Box<dyn Future<Output = Result<PrimitiveOutcome>> + Send + 'a>> {
        Box::pin(async move {
            match &task.action {
                Action::Pipeline(spec) => self.run_pipeline(task, spec).await,
                Action::Clean { dir } => {
                    let target = self.root.join(dir);
                    let removed = remove_dir_if_exists(&target).await?;
                    info!(task = %task.name, dir = ?dir, removed, "cleaned directory");
                    Ok(PrimitiveOutcome {
                        outputs: Vec::new(),
                        live_reload: task.options.live_reload,
                    })
                }
                Action::Reload => Ok(PrimitiveOutcome {
                    outputs: Vec::new(),
                    live_reload: true,
                }),
            }
        })
    }
}
