// src/engine/executor.rs

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tokio::sync::OnceCell;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::dag::{PrimitiveTask, Task, TaskGraph};
use crate::engine::{PrimitiveRunner, RunSummary, TaskName};
use crate::errors::{AssetflowError, Result};
use crate::notifier::{Notification, Notifier};
use crate::types::CompositeMode;

type VisitFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

/// Runs tasks from a [`TaskGraph`].
///
/// `series` composites await each child in listed order and stop at the
/// first failure. `parallel` composites start every child at once and fail as
/// soon as one child fails; siblings still in flight are detached and left to
/// finish on their own. Within one [`run`](Executor::run) each primitive is
/// performed at most once, however many composites reach it.
pub struct Executor {
    graph: TaskGraph,
    runner: Arc<dyn PrimitiveRunner>,
    notifier: Arc<dyn Notifier>,
}

/// Per-invocation bookkeeping shared by every visit.
#[derive(Default)]
struct RunContext {
    /// One cell per primitive; the value is whether it succeeded.
    once: Mutex<HashMap<TaskName, Arc<OnceCell<bool>>>>,
    summary: Mutex<RunSummary>,
}

impl RunContext {
    fn cell_for(&self, name: &str) -> Arc<OnceCell<bool>> {
        let mut once = self.once.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(once.entry(name.to_string()).or_default())
    }

    fn take_summary(&self) -> RunSummary {
        let mut summary = self.summary.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *summary)
    }
}

impl Executor {
    pub fn new(
        graph: TaskGraph,
        runner: Arc<dyn PrimitiveRunner>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            graph,
            runner,
            notifier,
        }
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Run `name` and everything below it.
    pub async fn run(self: &Arc<Self>, name: &str) -> Result<RunSummary> {
        if !self.graph.contains(name) {
            return Err(AssetflowError::UnknownTaskError(name.to_string()));
        }

        let ctx = Arc::new(RunContext::default());
        let started = Instant::now();
        info!(task = %name, "run started");

        match Arc::clone(self).visit(name.to_string(), Arc::clone(&ctx)).await {
            Ok(()) => {
                let summary = ctx.take_summary();
                info!(
                    task = %name,
                    primitives = summary.tasks_run.len(),
                    outputs = summary.outputs.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "run finished"
                );
                Ok(summary)
            }
            Err(err) => {
                error!(task = %name, error = %err, "run failed");
                Err(err)
            }
        }
    }

    fn visit(self: Arc<Self>, name: TaskName, ctx: Arc<RunContext>) -> VisitFuture {
        Box::pin(async move {
            let task = self
                .graph
                .get(&name)
                .cloned()
                .ok_or_else(|| AssetflowError::UnknownTaskError(name.clone()))?;

            match task {
                Task::Primitive(primitive) => self.run_primitive_once(&primitive, &ctx).await,
                Task::Composite(composite) => {
                    debug!(task = %name, mode = %composite.mode, "entering composite");
                    match composite.mode {
                        CompositeMode::Series => {
                            for child in composite.children {
                                Arc::clone(&self).visit(child, Arc::clone(&ctx)).await?;
                            }
                            Ok(())
                        }
                        CompositeMode::Parallel => {
                            let mut set = JoinSet::new();
                            for child in composite.children {
                                set.spawn(Arc::clone(&self).visit(child, Arc::clone(&ctx)));
                            }
                            while let Some(joined) = set.join_next().await {
                                let outcome = joined.unwrap_or_else(|e| {
                                    Err(AssetflowError::Other(anyhow::anyhow!(
                                        "child of '{name}' panicked: {e}"
                                    )))
                                });
                                if let Err(err) = outcome {
                                    set.detach_all();
                                    return Err(err);
                                }
                            }
                            Ok(())
                        }
                    }
                }
            }
        })
    }

    /// Run a primitive unless this invocation already did. A visitor that
    /// arrives while the primitive is running waits for it.
    async fn run_primitive_once(&self, task: &PrimitiveTask, ctx: &RunContext) -> Result<()> {
        let cell = ctx.cell_for(&task.name);
        let mut failure = None;
        let slot = &mut failure;

        let succeeded = *cell
            .get_or_init(move || async move {
                match self.run_primitive(task, ctx).await {
                    Ok(()) => true,
                    Err(err) => {
                        *slot = Some(err);
                        false
                    }
                }
            })
            .await;

        if let Some(err) = failure {
            return Err(err);
        }
        if succeeded {
            Ok(())
        } else {
            Err(AssetflowError::TaskFailedError {
                task: task.name.clone(),
                source: Box::new(AssetflowError::Other(anyhow::anyhow!(
                    "already failed earlier in this run"
                ))),
            })
        }
    }

    async fn run_primitive(&self, task: &PrimitiveTask, ctx: &RunContext) -> Result<()> {
        let started = Instant::now();
        info!(task = %task.name, "task started");

        match self.runner.run(task).await {
            Ok(outcome) => {
                info!(
                    task = %task.name,
                    outputs = outcome.outputs.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "task finished"
                );
                if let Some(message) = &task.options.notify_message {
                    self.notifier
                        .notify(Notification::success(&task.name, message));
                }
                ctx.summary
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .absorb(&task.name, outcome);
                Ok(())
            }
            Err(err) => {
                let err = err.in_task(&task.name);
                error!(task = %task.name, error = %err, "task failed");
                Err(err)
            }
        }
    }
}
