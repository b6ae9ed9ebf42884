//! In-memory sinks for notifications and reload pushes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use assetflow::notifier::{Notification, NotificationLevel, Notifier};
use assetflow::reload::{LiveReload, ReloadKind};

/// Records every notification it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    seen: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    pub fn successes(&self) -> Vec<Notification> {
        self.with_level(NotificationLevel::Success)
    }

    pub fn failures(&self) -> Vec<Notification> {
        self.with_level(NotificationLevel::Failure)
    }

    fn with_level(&self, level: NotificationLevel) -> Vec<Notification> {
        self.notifications()
            .into_iter()
            .filter(|n| n.level == level)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}

/// Records reload pushes and shutdown calls.
#[derive(Debug, Clone, Default)]
pub struct RecordingReload {
    pushes: Arc<Mutex<Vec<ReloadKind>>>,
    shutdowns: Arc<AtomicUsize>,
}

impl RecordingReload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pushes(&self) -> Vec<ReloadKind> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl LiveReload for RecordingReload {
    fn push(&self, kind: ReloadKind) {
        self.pushes.lock().unwrap().push(kind);
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}
