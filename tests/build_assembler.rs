use std::path::Path;
use std::sync::Arc;

use assetflow::config::ConfigFile;
use assetflow::engine::{Executor, FsRunner};
use assetflow::tasks::build_graph;
use assetflow::transform::StageRegistry;
use assetflow_test_utils::builders::{project, read_file, write_file};
use assetflow_test_utils::recorders::RecordingNotifier;
use assetflow_test_utils::{init_tracing, with_timeout};

fn executor_for(root: &Path) -> Arc<Executor> {
    let cfg = ConfigFile::defaults().unwrap();
    let stages = StageRegistry::new(&cfg, root).unwrap();
    Arc::new(Executor::new(
        build_graph(&cfg, &stages).unwrap(),
        Arc::new(FsRunner::new(root)),
        Arc::new(RecordingNotifier::new()),
    ))
}

#[tokio::test]
async fn build_clears_then_copies_minified_assets() {
    init_tracing();
    let dir = project();
    let root = dir.path();
    write_file(root, "dest/stale.txt", "old");
    write_file(root, "dest/css/old.min.css", "old");
    write_file(root, "assets/css/style.css", ".a { color: red; }");
    write_file(root, "assets/css/style.min.css", ".a{color:red}");
    write_file(root, "assets/js/app.js", "var a = 1;");
    write_file(root, "assets/js/app.min.js", "var a=1;");
    write_file(root, "assets/js/vendor/lib.min.js", "lib();");
    write_file(root, "index.html", "<html><body></body></html>");

    let summary = with_timeout(executor_for(root).run("build")).await.unwrap();

    assert!(!root.join("dest/stale.txt").exists());
    assert!(!root.join("dest/css/old.min.css").exists());
    assert_eq!(read_file(root, "dest/css/style.min.css"), ".a{color:red}");
    assert!(!root.join("dest/css/style.css").exists());
    assert_eq!(read_file(root, "dest/js/app.min.js"), "var a=1;");
    assert_eq!(read_file(root, "dest/js/vendor/lib.min.js"), "lib();");
    assert!(!root.join("dest/js/app.js").exists());
    assert!(root.join("dest/templates/index.html").exists());

    assert_eq!(summary.tasks_run.first().map(String::as_str), Some("clear"));
    assert_eq!(summary.tasks_run.len(), 4);
}

#[tokio::test]
async fn clear_succeeds_when_dest_is_missing() {
    let dir = project();

    let summary = executor_for(dir.path()).run("clear").await.unwrap();

    assert_eq!(summary.tasks_run, vec!["clear"]);
    assert!(summary.outputs.is_empty());
}

#[tokio::test]
async fn concat_bundles_sources_and_skips_its_own_output() {
    let dir = project();
    let root = dir.path();
    write_file(root, "assets/js/a.js", "A");
    write_file(root, "assets/js/b.js", "B");
    write_file(root, "assets/js/b.min.js", "MIN");

    let exec = executor_for(root);
    exec.run("concat").await.unwrap();
    assert_eq!(read_file(root, "assets/js/all.js"), "A\nB");

    // all.js is excluded from the sources, so a rerun is stable.
    exec.run("concat").await.unwrap();
    assert_eq!(read_file(root, "assets/js/all.js"), "A\nB");
}

#[tokio::test]
async fn unchanged_outputs_are_not_rewritten() {
    let dir = project();
    let root = dir.path();
    write_file(root, "assets/js/a.js", "A");

    let exec = executor_for(root);
    exec.run("concat").await.unwrap();
    let before = std::fs::metadata(root.join("assets/js/all.js"))
        .unwrap()
        .modified()
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    exec.run("concat").await.unwrap();
    let after = std::fs::metadata(root.join("assets/js/all.js"))
        .unwrap()
        .modified()
        .unwrap();

    assert_eq!(before, after);
}
