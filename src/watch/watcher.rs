// src/watch/watcher.rs

use std::path::PathBuf;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::{AssetflowError, Result};
use crate::watch::dispatcher::WatchEvent;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `root` recursively and send a [`WatchEvent::Changed`] for every
/// batch of paths notify reports.
///
/// Access-only events are dropped. Paths are absolute; the dispatcher
/// relates them back to `root`.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    events_tx: mpsc::Sender<WatchEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    // Canonicalize once so we have a stable base path.
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    // Closure called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    // We can't log via tracing here easily, so fallback to stderr.
                    eprintln!("assetflow: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("assetflow: file watch error: {err}");
            }
        },
        Config::default(),
    )
    .map_err(|e| AssetflowError::Other(e.into()))?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .map_err(|e| AssetflowError::Other(e.into()))?;

    info!("file watcher started on {:?}", root);

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if matches!(event.kind, EventKind::Access(_)) || event.paths.is_empty() {
                continue;
            }
            debug!(?event, "received notify event");
            if events_tx.send(WatchEvent::Changed(event.paths)).await.is_err() {
                break;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}
