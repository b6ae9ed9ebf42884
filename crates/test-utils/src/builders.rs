#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use assetflow::dag::{Action, TaskGraph, TaskOptions};
use assetflow::engine::{Executor, PrimitiveRunner};
use assetflow::notifier::Notifier;
use assetflow::types::CompositeMode;

/// Fluent builder for task graphs made of placeholder leaves.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: TaskGraph,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A primitive whose action is irrelevant under `InstrumentedRunner`.
    pub fn leaf(self, name: &str) -> Self {
        self.leaf_with(name, TaskOptions::default())
    }

    pub fn leaf_with(mut self, name: &str, options: TaskOptions) -> Self {
        self.graph
            .register_action(name, Action::Reload, options)
            .expect("registering leaf");
        self
    }

    pub fn series(mut self, name: &str, children: &[&str]) -> Self {
        self.graph
            .register_composite(name, CompositeMode::Series, children)
            .expect("registering series");
        self
    }

    pub fn parallel(mut self, name: &str, children: &[&str]) -> Self {
        self.graph
            .register_composite(name, CompositeMode::Parallel, children)
            .expect("registering parallel");
        self
    }

    pub fn build(self) -> TaskGraph {
        self.graph
    }
}

pub fn executor(
    graph: TaskGraph,
    runner: Arc<dyn PrimitiveRunner>,
    notifier: Arc<dyn Notifier>,
) -> Arc<Executor> {
    Arc::new(Executor::new(graph, runner, notifier))
}

/// Write `contents` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("creating parent dirs");
    }
    fs::write(&path, contents).expect("writing test file");
}

pub fn read_file(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel))
        .unwrap_or_else(|e| panic!("reading {rel}: {e}"))
}

/// A temporary project with the default `assets/` layout.
pub fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("creating temp project");
    for sub in ["assets/scss", "assets/css", "assets/js"] {
        fs::create_dir_all(dir.path().join(sub)).expect("creating project dirs");
    }
    dir
}
