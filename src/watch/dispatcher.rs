// src/watch/dispatcher.rs

//! Turns batches of file changes into task runs and reload pushes.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch as state_channel};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::engine::{Executor, TaskName};
use crate::errors::{AssetflowError, Result};
use crate::notifier::{Notification, Notifier};
use crate::reload::{LiveReload, ReloadKind};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{CompiledGlob, SourceGlob};
use crate::watch::watcher::WatcherHandle;

/// What a binding does when one of its files changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchAction {
    Run(TaskName),
    /// Refresh viewers without running anything.
    Reload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchBinding {
    pub pattern: SourceGlob,
    pub action: WatchAction,
}

impl WatchBinding {
    pub fn run(pattern: SourceGlob, task: impl Into<TaskName>) -> Self {
        Self {
            pattern,
            action: WatchAction::Run(task.into()),
        }
    }

    pub fn reload(pattern: SourceGlob) -> Self {
        Self {
            pattern,
            action: WatchAction::Reload,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    Watching,
    Dispatching,
    Stopped,
}

/// Input to [`Dispatcher::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Changed(Vec<PathBuf>),
    Shutdown,
}

/// What one dispatch did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub tasks_run: Vec<TaskName>,
    pub tasks_failed: Vec<TaskName>,
    pub reloads: Vec<ReloadKind>,
}

impl DispatchReport {
    pub fn is_empty(&self) -> bool {
        self.tasks_run.is_empty() && self.tasks_failed.is_empty() && self.reloads.is_empty()
    }
}

struct CompiledBinding {
    matcher: CompiledGlob,
    binding: WatchBinding,
}

/// Watch-mode event loop.
///
/// Changes arriving within the debounce window of the first one are handled
/// together; each distinct action bound to any of them runs once, in binding
/// order. A failing task is reported through the notifier and watching
/// continues.
pub struct Dispatcher {
    root: PathBuf,
    bindings: Vec<CompiledBinding>,
    executor: Arc<Executor>,
    reload: Arc<dyn LiveReload>,
    notifier: Arc<dyn Notifier>,
    debounce: Duration,
    state: state_channel::Sender<DispatcherState>,
    watcher: Mutex<Option<WatcherHandle>>,
}

impl Dispatcher {
    /// Every `Run` binding must name a registered task.
    pub fn new(
        root: impl Into<PathBuf>,
        bindings: Vec<WatchBinding>,
        executor: Arc<Executor>,
        reload: Arc<dyn LiveReload>,
        notifier: Arc<dyn Notifier>,
        debounce: Duration,
    ) -> Result<Self> {
        let mut compiled = Vec::with_capacity(bindings.len());
        for binding in bindings {
            if let WatchAction::Run(task) = &binding.action {
                if !executor.graph().contains(task) {
                    return Err(AssetflowError::UnknownTaskError(format!(
                        "'{task}' (watch binding for {})",
                        binding.pattern
                    )));
                }
            }
            compiled.push(CompiledBinding {
                matcher: binding.pattern.compile()?,
                binding,
            });
        }

        let (state, _) = state_channel::channel(DispatcherState::Idle);
        Ok(Self {
            root: root.into(),
            bindings: compiled,
            executor,
            reload,
            notifier,
            debounce,
            state,
            watcher: Mutex::new(None),
        })
    }

    /// Keep `handle` alive until the dispatcher stops.
    pub fn attach_watcher(&mut self, handle: WatcherHandle) {
        *self.watcher.get_mut().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    pub fn state(&self) -> DispatcherState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> state_channel::Receiver<DispatcherState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: DispatcherState) {
        debug!(?state, "dispatcher state");
        self.state.send_replace(state);
    }

    /// Actions bound to `path`, in binding order.
    pub fn actions_for(&self, path: &Path) -> Vec<&WatchAction> {
        let Some(rel) = relative_str(&self.root, path) else {
            return Vec::new();
        };
        self.bindings
            .iter()
            .filter(|b| b.matcher.matches(&rel))
            .map(|b| &b.binding.action)
            .collect()
    }

    /// Run every distinct action bound to any of `paths`.
    pub async fn dispatch(&self, paths: &[PathBuf]) -> DispatchReport {
        let mut actions: Vec<WatchAction> = Vec::new();
        for binding in &self.bindings {
            let hit = paths.iter().any(|p| {
                relative_str(&self.root, p).is_some_and(|rel| binding.matcher.matches(&rel))
            });
            if hit && !actions.contains(&binding.binding.action) {
                actions.push(binding.binding.action.clone());
            }
        }

        let mut report = DispatchReport::default();
        if actions.is_empty() {
            debug!(?paths, "change matched no watch binding");
            return report;
        }

        for action in actions {
            match action {
                WatchAction::Run(task) => match self.executor.run(&task).await {
                    Ok(summary) => {
                        if let Some(kind) = summary.reload_kind() {
                            self.reload.push(kind.clone());
                            report.reloads.push(kind);
                        }
                        report.tasks_run.push(task);
                    }
                    Err(err) => {
                        warn!(task = %task, error = %err, "watch-triggered task failed");
                        self.notifier
                            .notify(Notification::failure("assetflow", format!("File: {err}")));
                        report.tasks_failed.push(task);
                    }
                },
                WatchAction::Reload => {
                    self.reload.push(ReloadKind::Full);
                    report.reloads.push(ReloadKind::Full);
                }
            }
        }
        report
    }

    /// Consume events until [`WatchEvent::Shutdown`] or the channel closes.
    pub async fn run(mut self, mut events: mpsc::Receiver<WatchEvent>) -> Result<()> {
        self.set_state(DispatcherState::Watching);
        info!(bindings = self.bindings.len(), "watching for changes");

        while let Some(event) = events.recv().await {
            let mut paths = match event {
                WatchEvent::Changed(paths) => paths,
                WatchEvent::Shutdown => break,
            };

            // Coalesce everything that arrives within the window.
            let deadline = Instant::now() + self.debounce;
            let mut stopping = false;
            loop {
                match tokio::time::timeout_at(deadline, events.recv()).await {
                    Ok(Some(WatchEvent::Changed(more))) => paths.extend(more),
                    Ok(Some(WatchEvent::Shutdown)) | Ok(None) => {
                        stopping = true;
                        break;
                    }
                    Err(_elapsed) => break,
                }
            }
            if stopping {
                debug!(pending = paths.len(), "shutdown during debounce; pending changes dropped");
                break;
            }

            paths.sort();
            paths.dedup();

            self.set_state(DispatcherState::Dispatching);
            let report = self.dispatch(&paths).await;
            if !report.is_empty() {
                info!(
                    changed = paths.len(),
                    ran = ?report.tasks_run,
                    failed = ?report.tasks_failed,
                    reloads = report.reloads.len(),
                    "dispatched changes"
                );
            }
            self.set_state(DispatcherState::Watching);
        }

        self.stop();
        Ok(())
    }

    fn stop(&mut self) {
        // Unsubscribe from the filesystem before tearing the server down.
        self.watcher
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.reload.shutdown();
        self.set_state(DispatcherState::Stopped);
        info!("watch stopped");
    }
}
