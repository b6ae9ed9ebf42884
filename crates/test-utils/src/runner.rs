use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use assetflow::dag::PrimitiveTask;
use assetflow::engine::{PrimitiveOutcome, PrimitiveRunner};
use assetflow::errors::{AssetflowError, Result};

/// When one primitive ran.
#[derive(Debug, Clone)]
pub struct Span {
    pub task: String,
    pub start: Instant,
    pub end: Instant,
}

/// A fake runner that:
/// - sleeps for a fixed duration per primitive, or a per-task override
/// - records start/end instants for every run
/// - fails the primitives it was told to fail
/// - reports canned outputs instead of touching the filesystem.
#[derive(Debug, Clone, Default)]
pub struct InstrumentedRunner {
    delay: Duration,
    delays: HashMap<String, Duration>,
    failing: HashSet<String>,
    outputs: HashMap<String, Vec<PathBuf>>,
    started: Arc<Mutex<Vec<String>>>,
    spans: Arc<Mutex<Vec<Span>>>,
}

impl InstrumentedRunner {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Sleep `delay` for `task` instead of the default.
    pub fn with_delay(mut self, task: &str, delay: Duration) -> Self {
        self.delays.insert(task.to_string(), delay);
        self
    }

    pub fn failing(mut self, task: &str) -> Self {
        self.failing.insert(task.to_string());
        self
    }

    pub fn with_outputs(mut self, task: &str, outputs: &[&str]) -> Self {
        self.outputs.insert(
            task.to_string(),
            outputs.iter().map(PathBuf::from).collect(),
        );
        self
    }

    /// Names in the order their runs started.
    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    /// Completed runs in completion order.
    pub fn spans(&self) -> Vec<Span> {
        self.spans.lock().unwrap().clone()
    }

    pub fn span_of(&self, task: &str) -> Span {
        self.spans()
            .into_iter()
            .find(|s| s.task == task)
            .unwrap_or_else(|| panic!("task '{task}' never completed"))
    }

    pub fn runs_of(&self, task: &str) -> usize {
        self.started().iter().filter(|t| *t == task).count()
    }
}

impl PrimitiveRunner for InstrumentedRunner {
    fn run<'a>(
        &'a self,
        task: &'a PrimitiveTask,
    ) -> Pin<Box<dyn Future<Output = Result<PrimitiveOutcome>> + Send + 'a>> {
        Box::pin(async move {
            let start = Instant::now();
            self.started.lock().unwrap().push(task.name.clone());

            let delay = self.delays.get(&task.name).copied().unwrap_or(self.delay);
            tokio::time::sleep(delay).await;

            self.spans.lock().unwrap().push(Span {
                task: task.name.clone(),
                start,
                end: Instant::now(),
            });

            if self.failing.contains(&task.name) {
                return Err(AssetflowError::CompileError {
                    path: PathBuf::from(&task.name),
                    message: "simulated failure".to_string(),
                });
            }

            Ok(PrimitiveOutcome {
                outputs: self.outputs.get(&task.name).cloned().unwrap_or_default(),
                live_reload: task.options.live_reload,
            })
        })
    }
}
