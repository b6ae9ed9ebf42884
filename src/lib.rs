// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod notifier;
pub mod reload;
pub mod tasks;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::{load_or_default, ConfigFile, LogicalPath, PathEntry};
use crate::dag::TaskGraph;
use crate::engine::{Executor, FsRunner};
use crate::notifier::ConsoleNotifier;
use crate::reload::DevServer;
use crate::tasks::{build_graph, standard_watch_bindings, WATCH_TASK};
use crate::transform::registry::STAGE_NAMES;
use crate::transform::StageRegistry;
use crate::watch::{spawn_watcher, Dispatcher, WatchEvent};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and the path registry
/// - stage resolution and the task graph
/// - the executor (one-shot tasks)
/// - watcher, dispatcher and dev server (`watch`)
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_or_default(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    let root = config_root_dir(&config_path);

    let stages = StageRegistry::new(&cfg, &root)?;
    let graph = build_graph(&cfg, &stages)?;

    if args.list {
        for name in graph.task_names() {
            println!("{name}");
        }
        println!("{WATCH_TASK}");
        return Ok(());
    }

    if args.dry_run {
        print_dry_run(&cfg, &graph, &root);
        return Ok(());
    }

    let task = args.task.unwrap_or_default();
    let executor = Arc::new(Executor::new(
        graph,
        Arc::new(FsRunner::new(&root)),
        Arc::new(ConsoleNotifier),
    ));

    if task == WATCH_TASK {
        return watch(&cfg, &root, executor).await;
    }

    let summary = executor.run(&task).await?;
    info!(
        task = %task,
        outputs = summary.outputs.len(),
        "done"
    );
    if summary.reload_kind().is_some() {
        info!(task = %task, "browser refresh requested; it only reaches viewers under `{WATCH_TASK}`");
    }
    Ok(())
}

/// Serve, watch and dispatch until Ctrl-C.
async fn watch(cfg: &ConfigFile, root: &Path, executor: Arc<Executor>) -> Result<()> {
    let server = DevServer::start(
        root.join(&cfg.server.base_dir),
        &cfg.server.host,
        cfg.server.port,
    )
    .await?;
    println!("serving http://{}", server.local_addr());

    let mut dispatcher = Dispatcher::new(
        root,
        standard_watch_bindings(&cfg.paths),
        executor,
        Arc::new(server),
        Arc::new(ConsoleNotifier),
        Duration::from_millis(cfg.watch.debounce_ms),
    )?;

    let (tx, rx) = mpsc::channel::<WatchEvent>(64);
    dispatcher.attach_watcher(spawn_watcher(root, tx.clone())?);

    // Ctrl-C → graceful shutdown.
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        let _ = tx.send(WatchEvent::Shutdown).await;
    });

    dispatcher.run(rx).await?;
    Ok(())
}

/// Figure out the project root.
///
/// - If the config path has a non-empty parent (e.g. "site/Assetflow.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Assetflow.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Print resolved paths, stage names and the task graph.
fn print_dry_run(cfg: &ConfigFile, graph: &TaskGraph, root: &Path) {
    println!("assetflow dry-run");
    println!("  root = {}", root.display());
    println!();

    println!("paths:");
    for logical in LogicalPath::ALL {
        let value = match cfg.paths.get(logical) {
            PathEntry::Glob(glob) => glob.to_string(),
            PathEntry::Dir(dir) => dir.display().to_string(),
            PathEntry::FileName(name) => name,
        };
        println!("  {logical} = {value}");
    }
    println!();

    println!("stages: {}", STAGE_NAMES.join(", "));
    println!();

    println!("tasks:");
    for name in graph.task_names() {
        if let Some(task) = graph.get(name) {
            println!("  - {name}: {task}");
        }
    }
    println!("  - {WATCH_TASK}: serve {}:{}, watch sources", cfg.server.host, cfg.server.port);
}
