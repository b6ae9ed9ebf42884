use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use assetflow::config::ConfigFile;
use assetflow::dag::TaskOptions;
use assetflow::engine::{Executor, FsRunner};
use assetflow::errors::AssetflowError;
use assetflow::reload::ReloadKind;
use assetflow::tasks::{build_graph, standard_watch_bindings, SYNC_TASK};
use assetflow::transform::StageRegistry;
use assetflow::watch::{
    Dispatcher, DispatcherState, WatchAction, WatchBinding, WatchEvent,
};
use assetflow::watch::patterns::SourceGlob;
use assetflow_test_utils::builders::{executor, project, write_file, GraphBuilder};
use assetflow_test_utils::recorders::{RecordingNotifier, RecordingReload};
use assetflow_test_utils::runner::InstrumentedRunner;
use assetflow_test_utils::{init_tracing, with_timeout};
use tokio::sync::mpsc;

const ROOT: &str = "/project";

struct Fixture {
    runner: Arc<InstrumentedRunner>,
    reload: RecordingReload,
    notifier: RecordingNotifier,
    dispatcher: Dispatcher,
}

fn bindings() -> Vec<WatchBinding> {
    vec![
        WatchBinding::run(SourceGlob::single("assets/scss/**/*.scss"), "scss"),
        WatchBinding::reload(SourceGlob::single("*.html")),
        WatchBinding::reload(SourceGlob::new([
            "assets/js/**/*.js",
            "!assets/js/**/*.min.js",
        ])),
    ]
}

fn fixture(runner: InstrumentedRunner) -> Fixture {
    init_tracing();
    let graph = GraphBuilder::new()
        .leaf_with("scss", TaskOptions::default().with_live_reload())
        .build();
    let runner = Arc::new(runner);
    let notifier = RecordingNotifier::new();
    let reload = RecordingReload::new();
    let exec: Arc<Executor> = executor(graph, runner.clone(), Arc::new(notifier.clone()));

    let dispatcher = Dispatcher::new(
        ROOT,
        bindings(),
        exec,
        Arc::new(reload.clone()),
        Arc::new(notifier.clone()),
        Duration::from_millis(50),
    )
    .unwrap();

    Fixture {
        runner,
        reload,
        notifier,
        dispatcher,
    }
}

fn changed(rel: &str) -> PathBuf {
    Path::new(ROOT).join(rel)
}

#[tokio::test]
async fn markup_change_only_reloads() {
    let f = fixture(InstrumentedRunner::default());

    let report = f.dispatcher.dispatch(&[changed("index.html")]).await;

    assert!(report.tasks_run.is_empty());
    assert_eq!(report.reloads, vec![ReloadKind::Full]);
    assert_eq!(f.reload.pushes(), vec![ReloadKind::Full]);
    assert!(f.runner.started().is_empty());
}

#[tokio::test]
async fn style_change_runs_task_and_injects_css() {
    let f = fixture(
        InstrumentedRunner::default().with_outputs("scss", &["assets/css/style.css"]),
    );

    let report = f
        .dispatcher
        .dispatch(&[changed("assets/scss/blocks/_header.scss")])
        .await;

    assert_eq!(report.tasks_run, vec!["scss"]);
    assert_eq!(
        f.reload.pushes(),
        vec![ReloadKind::InjectCss(vec!["assets/css/style.css".into()])]
    );
}

#[tokio::test]
async fn each_action_runs_once_per_batch_in_binding_order() {
    let f = fixture(InstrumentedRunner::default());

    let report = f
        .dispatcher
        .dispatch(&[
            changed("about.html"),
            changed("assets/scss/a.scss"),
            changed("assets/scss/b.scss"),
            changed("index.html"),
            changed("assets/js/app.js"),
        ])
        .await;

    assert_eq!(report.tasks_run, vec!["scss"]);
    assert_eq!(f.runner.runs_of("scss"), 1);
    // One Full for the task (no outputs) and one for the deduplicated reload.
    assert_eq!(report.reloads, vec![ReloadKind::Full, ReloadKind::Full]);
}

#[tokio::test]
async fn unrelated_and_excluded_changes_do_nothing() {
    let f = fixture(InstrumentedRunner::default());

    let report = f
        .dispatcher
        .dispatch(&[
            changed("assets/js/app.min.js"),
            changed("README.md"),
            changed("pages/nested.html"),
        ])
        .await;

    assert!(report.is_empty(), "got {report:?}");
    assert!(f.reload.pushes().is_empty());
}

#[tokio::test]
async fn failure_notifies_and_keeps_watching() {
    let f = fixture(InstrumentedRunner::default().failing("scss"));
    let (tx, rx) = mpsc::channel(8);
    let mut state = f.dispatcher.subscribe_state();
    let handle = tokio::spawn(f.dispatcher.run(rx));

    tx.send(WatchEvent::Changed(vec![changed("assets/scss/style.scss")]))
        .await
        .unwrap();
    with_timeout(async {
        while f.notifier.failures().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    with_timeout(state.wait_for(|s| *s == DispatcherState::Watching))
        .await
        .unwrap();

    // Still alive: a second change is dispatched too.
    tx.send(WatchEvent::Changed(vec![changed("index.html")]))
        .await
        .unwrap();
    with_timeout(async {
        while f.reload.pushes().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    tx.send(WatchEvent::Shutdown).await.unwrap();
    with_timeout(handle).await.unwrap().unwrap();

    let failure = &f.notifier.failures()[0];
    assert!(failure.message.starts_with("File: "), "got {}", failure.message);
    assert!(failure.sound);
    assert_eq!(*state.borrow(), DispatcherState::Stopped);
    assert_eq!(f.reload.shutdown_count(), 1);
}

#[tokio::test]
async fn burst_of_changes_is_debounced() {
    let f = fixture(InstrumentedRunner::default());
    let (tx, rx) = mpsc::channel(8);
    let handle = tokio::spawn(f.dispatcher.run(rx));

    for name in ["a", "b", "c"] {
        tx.send(WatchEvent::Changed(vec![changed(&format!("assets/scss/{name}.scss"))]))
            .await
            .unwrap();
    }
    with_timeout(async {
        while f.runner.runs_of("scss") == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    tx.send(WatchEvent::Shutdown).await.unwrap();
    with_timeout(handle).await.unwrap().unwrap();

    assert_eq!(f.runner.runs_of("scss"), 1);
}

#[tokio::test]
async fn closing_the_channel_stops_the_dispatcher() {
    let f = fixture(InstrumentedRunner::default());
    let (tx, rx) = mpsc::channel::<WatchEvent>(1);
    assert_eq!(f.dispatcher.state(), DispatcherState::Idle);
    let state = f.dispatcher.subscribe_state();

    drop(tx);
    with_timeout(f.dispatcher.run(rx)).await.unwrap();

    assert_eq!(*state.borrow(), DispatcherState::Stopped);
    assert_eq!(f.reload.shutdown_count(), 1);
}

#[test]
fn actions_for_reports_bound_actions() {
    let f = fixture(InstrumentedRunner::default());

    assert_eq!(
        f.dispatcher.actions_for(&changed("assets/scss/x.scss")),
        vec![&WatchAction::Run("scss".into())]
    );
    assert_eq!(
        f.dispatcher.actions_for(Path::new("index.html")),
        vec![&WatchAction::Reload]
    );
    assert!(f.dispatcher.actions_for(Path::new("/elsewhere/index.html")).is_empty());
}

#[test]
fn binding_to_unknown_task_is_rejected() {
    let graph = GraphBuilder::new().leaf("scss").build();
    let exec = executor(
        graph,
        Arc::new(InstrumentedRunner::default()),
        Arc::new(RecordingNotifier::new()),
    );

    let result = Dispatcher::new(
        ROOT,
        vec![WatchBinding::run(SourceGlob::single("*.txt"), "missing")],
        exec,
        Arc::new(RecordingReload::new()),
        Arc::new(RecordingNotifier::new()),
        Duration::from_millis(10),
    );

    assert!(matches!(result, Err(AssetflowError::UnknownTaskError(_))));
}

#[tokio::test]
async fn standard_bindings_refresh_through_the_sync_task() {
    init_tracing();
    let dir = project();
    write_file(dir.path(), "index.html", "<body></body>");
    let cfg = ConfigFile::defaults().unwrap();
    let stages = StageRegistry::new(&cfg, dir.path()).unwrap();
    let exec = executor(
        build_graph(&cfg, &stages).unwrap(),
        Arc::new(FsRunner::new(dir.path())),
        Arc::new(RecordingNotifier::new()),
    );
    let reload = RecordingReload::new();
    let dispatcher = Dispatcher::new(
        dir.path(),
        standard_watch_bindings(&cfg.paths),
        exec,
        Arc::new(reload.clone()),
        Arc::new(RecordingNotifier::new()),
        Duration::from_millis(10),
    )
    .unwrap();

    let report = dispatcher
        .dispatch(&[dir.path().join("index.html"), dir.path().join("assets/js/app.js")])
        .await;

    assert_eq!(report.tasks_run, vec![SYNC_TASK]);
    assert!(report.tasks_failed.is_empty());
    assert_eq!(reload.pushes(), vec![ReloadKind::Full]);
}
