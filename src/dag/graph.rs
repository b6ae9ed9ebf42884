// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::task::{Action, CompositeTask, PipelineSpec, PrimitiveTask, Task, TaskOptions};
use crate::engine::TaskName;
use crate::errors::{AssetflowError, Result};
use crate::transform::{TransformChain, TransformStage};
use crate::types::CompositeMode;
use crate::watch::patterns::SourceGlob;

/// Registry of named tasks.
///
/// Composites refer to their children by name. Every mutation keeps two
/// invariants: each child of a composite is registered, and the graph is
/// acyclic. A registration that would break either is rejected and leaves
/// the graph as it was.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    tasks: BTreeMap<TaskName, Task>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a leaf that reads `sources`, applies `chain`, and writes the
    /// results below `destination`.
    ///
    /// A `rename_suffix` option is applied after every stage of `chain`.
    pub fn register_primitive(
        &mut self,
        name: impl Into<TaskName>,
        sources: SourceGlob,
        chain: TransformChain,
        destination: impl Into<PathBuf>,
        options: TaskOptions,
    ) -> Result<()> {
        let chain = match &options.rename_suffix {
            Some(suffix) => chain.then(TransformStage::Rename {
                suffix: suffix.clone(),
            }),
            None => chain,
        };
        let action = Action::Pipeline(PipelineSpec {
            sources,
            chain,
            destination: destination.into(),
        });
        self.register_action(name, action, options)
    }

    /// Register a leaf with an arbitrary action.
    pub fn register_action(
        &mut self,
        name: impl Into<TaskName>,
        action: Action,
        options: TaskOptions,
    ) -> Result<()> {
        let name = name.into();
        // A primitive has no children, so replacing a composite with one can
        // never introduce a cycle or a dangling reference.
        debug!(task = %name, %action, "registering primitive task");
        let task = Task::Primitive(Arc::new(PrimitiveTask {
            name: name.clone(),
            action,
            options,
        }));
        self.tasks.insert(name, task);
        Ok(())
    }

    /// Register a composite over already-registered children.
    pub fn register_composite<S: AsRef<str>>(
        &mut self,
        name: impl Into<TaskName>,
        mode: CompositeMode,
        children: &[S],
    ) -> Result<()> {
        let name = name.into();
        let children: Vec<TaskName> = children.iter().map(|c| c.as_ref().to_string()).collect();

        self.check_acyclic(&name, &children)?;

        if let Some(missing) = children.iter().find(|c| !self.tasks.contains_key(*c)) {
            return Err(AssetflowError::UnknownTaskError(format!(
                "'{missing}' (child of '{name}')"
            )));
        }

        debug!(task = %name, %mode, ?children, "registering composite task");
        self.tasks
            .insert(name, Task::Composite(CompositeTask { mode, children }));
        Ok(())
    }

    /// Topologically sort the graph as it would look after registering
    /// `name` with `children`.
    fn check_acyclic(&self, name: &str, children: &[TaskName]) -> Result<()> {
        if children.iter().any(|c| c == name) {
            return Err(AssetflowError::CycleError(format!(
                "task '{name}' lists itself as a child"
            )));
        }

        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for (parent, task) in &self.tasks {
            graph.add_node(parent.as_str());
            if parent == name {
                continue;
            }
            for child in task.children() {
                graph.add_edge(parent.as_str(), child.as_str(), ());
            }
        }
        graph.add_node(name);
        for child in children {
            graph.add_edge(name, child.as_str(), ());
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(AssetflowError::CycleError(format!(
                "registering '{name}' would create a cycle through '{}'",
                cycle.node_id()
            ))),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// All task names, sorted.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(|s| s.as_str())
    }

    /// Every primitive reachable from `name`, each listed once.
    pub fn leaves_of(&self, name: &str) -> Result<BTreeSet<TaskName>> {
        let mut leaves = BTreeSet::new();
        let mut stack = vec![name.to_string()];
        let mut seen = BTreeSet::new();
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            match self.tasks.get(&current) {
                Some(Task::Primitive(_)) => {
                    leaves.insert(current);
                }
                Some(Task::Composite(c)) => stack.extend(c.children.iter().cloned()),
                None => return Err(AssetflowError::UnknownTaskError(current)),
            }
        }
        Ok(leaves)
    }
}
