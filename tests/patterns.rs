use std::path::PathBuf;

use assetflow::watch::patterns::{literal_base, SourceGlob};
use assetflow_test_utils::builders::write_file;

#[test]
fn literal_base_stops_at_first_glob_component() {
    assert_eq!(literal_base("assets/scss/**/*.scss"), PathBuf::from("assets/scss"));
    assert_eq!(literal_base("assets/scss/style.scss"), PathBuf::from("assets/scss"));
    assert_eq!(literal_base("*.html"), PathBuf::new());
}

#[test]
fn star_does_not_cross_directories() {
    let glob = SourceGlob::single("./*.html").compile().unwrap();

    assert!(glob.matches("index.html"));
    assert!(!glob.matches("pages/about.html"));
}

#[test]
fn negated_patterns_exclude() {
    let glob = SourceGlob::new(["assets/js/**/*.js", "!assets/js/**/*.min.js"])
        .compile()
        .unwrap();

    assert!(glob.matches("assets/js/app.js"));
    assert!(glob.matches("assets/js/deep/er/app.js"));
    assert!(!glob.matches("assets/js/app.min.js"));
}

#[test]
fn collect_keeps_paths_relative_to_the_pattern_base() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_file(root, "assets/js/b.js", "");
    write_file(root, "assets/js/a.js", "");
    write_file(root, "assets/js/vendor/c.js", "");
    write_file(root, "assets/js/a.min.js", "");
    write_file(root, "index.html", "");
    write_file(root, "nested/page.html", "");

    let js = SourceGlob::new(["assets/js/**/*.js", "!assets/js/**/*.min.js"])
        .compile()
        .unwrap()
        .collect(root)
        .unwrap();
    let relative: Vec<PathBuf> = js.iter().map(|f| f.relative.clone()).collect();
    assert_eq!(
        relative,
        vec![
            PathBuf::from("a.js"),
            PathBuf::from("b.js"),
            PathBuf::from("vendor/c.js"),
        ]
    );
    assert!(js.iter().all(|f| f.base == PathBuf::from("assets/js")));

    let html = SourceGlob::single("*.html").compile().unwrap().collect(root).unwrap();
    assert_eq!(html.len(), 1);
    assert_eq!(html[0].relative, PathBuf::from("index.html"));
}

#[test]
fn missing_base_directory_matches_nothing() {
    let dir = tempfile::tempdir().unwrap();

    let found = SourceGlob::single("assets/scss/**/*.scss")
        .compile()
        .unwrap()
        .collect(dir.path())
        .unwrap();

    assert!(found.is_empty());
}
