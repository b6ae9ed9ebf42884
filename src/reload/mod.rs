// src/reload/mod.rs

//! Live reload: telling connected browsers that outputs changed.
//!
//! The dispatcher only sees the [`LiveReload`] trait; [`DevServer`] is the
//! production implementation.

use std::path::PathBuf;

pub mod server;

pub use server::DevServer;

/// What connected viewers should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadKind {
    /// Swap the named stylesheets without reloading the page.
    InjectCss(Vec<String>),
    /// Reload the whole page.
    Full,
}

impl ReloadKind {
    /// `InjectCss` when every written file is a stylesheet, `Full` otherwise.
    pub fn for_outputs(outputs: &[PathBuf]) -> Self {
        let all_css = !outputs.is_empty()
            && outputs
                .iter()
                .all(|p| p.extension().is_some_and(|e| e == "css"));
        if all_css {
            ReloadKind::InjectCss(
                outputs
                    .iter()
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .collect(),
            )
        } else {
            ReloadKind::Full
        }
    }
}

/// Sink for reload requests.
pub trait LiveReload: Send + Sync {
    fn push(&self, kind: ReloadKind);

    /// Disconnect viewers and stop serving. Further pushes are ignored.
    fn shutdown(&self);
}
