// src/tasks.rs

//! The standard task set and watch bindings for an `assets/` project.

use std::path::Path;

use tracing::debug;

use crate::config::{ConfigFile, PathConfig};
use crate::dag::{Action, TaskGraph, TaskOptions};
use crate::errors::Result;
use crate::transform::{build_chain, StageRegistry, TransformChain, TransformStage};
use crate::types::CompositeMode;
use crate::watch::patterns::SourceGlob;
use crate::watch::WatchBinding;

/// Name of the long-running task handled outside the graph.
pub const WATCH_TASK: &str = "watch";

/// Build the full task graph for `cfg`.
///
/// Every configured chain is resolved here, so an unknown stage name fails
/// before any task runs.
pub fn build_graph(cfg: &ConfigFile, stages: &StageRegistry) -> Result<TaskGraph> {
    let mut graph = TaskGraph::new();
    register_standard_tasks(&mut graph, cfg, stages)?;
    register_build(&mut graph, &cfg.paths)?;
    debug!(tasks = graph.task_names().count(), "task graph built");
    Ok(graph)
}

/// Script, style and reload tasks.
pub fn register_standard_tasks(
    graph: &mut TaskGraph,
    cfg: &ConfigFile,
    stages: &StageRegistry,
) -> Result<()> {
    let paths = &cfg.paths;

    graph.register_primitive(
        "concat",
        paths.js_files().clone(),
        build_chain(vec![TransformStage::Concat {
            file_name: paths.js_bundle().to_string(),
        }]),
        paths.js_dir(),
        TaskOptions::default(),
    )?;
    graph.register_primitive(
        "uglify",
        paths.js_files().clone(),
        stages.build_chain(&["uglify"])?,
        paths.js_dir(),
        TaskOptions::default().with_suffix(".min"),
    )?;
    graph.register_primitive(
        "es6",
        paths.js_files().clone(),
        stages.build_chain(&["terser"])?,
        paths.js_dir(),
        TaskOptions::default().with_suffix(".min"),
    )?;
    graph.register_primitive(
        "comb",
        paths.scss_files().clone(),
        build_chain(vec![stages.comb(true)]),
        paths.scss_dir(),
        TaskOptions::default(),
    )?;

    graph.register_primitive(
        "scss:compile",
        paths.scss_entry().clone(),
        stages.build_chain(&cfg.chains.scss)?,
        paths.css_dir(),
        TaskOptions::default()
            .with_notify("SCSS compiled successfully!")
            .with_live_reload(),
    )?;
    graph.register_primitive(
        "min",
        paths.scss_entry().clone(),
        stages.build_chain(&cfg.chains.min)?,
        paths.css_dir(),
        TaskOptions::default()
            .with_suffix(".min")
            .with_notify("MIN css builded!")
            .with_live_reload(),
    )?;
    graph.register_primitive(
        "dev",
        paths.scss_entry().clone(),
        stages.build_chain(&cfg.chains.dev)?,
        paths.css_dir(),
        TaskOptions::default()
            .with_notify("SCSS compiled!")
            .with_live_reload(),
    )?;
    graph.register_composite("scss", CompositeMode::Series, &["scss:compile", "min"])?;

    graph.register_action(SYNC_TASK, Action::Reload, TaskOptions::default())?;
    Ok(())
}

/// `build = series(clear, parallel(build:html, build:css, build:js))`.
pub fn register_build(graph: &mut TaskGraph, paths: &PathConfig) -> Result<()> {
    let build_dir = paths.build_dir();

    graph.register_action(
        "clear",
        Action::Clean {
            dir: build_dir.to_path_buf(),
        },
        TaskOptions::default(),
    )?;
    graph.register_primitive(
        "build:html",
        paths.html_files().clone(),
        copy(),
        build_dir.join("templates"),
        TaskOptions::default(),
    )?;
    graph.register_primitive(
        "build:css",
        SourceGlob::single(format!("{}/*.min.css", slashed(paths.css_dir()))),
        copy(),
        build_dir.join("css"),
        TaskOptions::default(),
    )?;
    graph.register_primitive(
        "build:js",
        SourceGlob::single(format!("{}/**/*.min.js", slashed(paths.js_dir()))),
        copy(),
        build_dir.join("js"),
        TaskOptions::default(),
    )?;
    graph.register_composite(
        "build:copy",
        CompositeMode::Parallel,
        &["build:html", "build:css", "build:js"],
    )?;
    graph.register_composite("build", CompositeMode::Series, &["clear", "build:copy"])?;
    Ok(())
}

/// Name of the task that refreshes connected browsers.
pub const SYNC_TASK: &str = "sync";

/// Bindings used by `watch`: styles rebuild, markup and scripts run `sync`.
pub fn standard_watch_bindings(paths: &PathConfig) -> Vec<WatchBinding> {
    vec![
        WatchBinding::run(paths.scss_files().clone(), "scss"),
        WatchBinding::run(paths.html_files().clone(), SYNC_TASK),
        WatchBinding::run(paths.js_files().clone(), SYNC_TASK),
    ]
}

fn copy() -> TransformChain {
    build_chain(Vec::new())
}

fn slashed(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
