// src/notifier.rs

//! Desktop-style notifications for task outcomes.

use std::io::Write;

use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub level: NotificationLevel,
    /// Ring the terminal bell.
    pub sound: bool,
}

impl Notification {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            level: NotificationLevel::Success,
            sound: false,
        }
    }

    /// Failures always ask for sound.
    pub fn failure(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            level: NotificationLevel::Failure,
            sound: true,
        }
    }
}

/// Receives task notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Logs each notification and prints a one-line banner to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, n: Notification) {
        match n.level {
            NotificationLevel::Success => {
                info!(title = %n.title, "{}", n.message);
            }
            NotificationLevel::Failure => {
                error!(title = %n.title, "{}", n.message);
            }
        }

        let mark = match n.level {
            NotificationLevel::Success => "✔",
            NotificationLevel::Failure => "✘",
        };
        let bell = if n.sound { "\x07" } else { "" };
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{bell}[{mark} {}] {}", n.title, n.message);
    }
}
