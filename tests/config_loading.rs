use std::path::PathBuf;

use assetflow::config::{
    load_and_validate, load_or_default, ConfigFile, LogicalPath, PathEntry, RawConfigFile,
};
use assetflow::errors::AssetflowError;
use assetflow::watch::patterns::SourceGlob;
use assetflow_test_utils::builders::write_file;

#[test]
fn defaults_mirror_the_classic_layout() {
    let cfg = ConfigFile::defaults().unwrap();

    assert_eq!(
        cfg.paths.resolve("scss_entry").unwrap(),
        PathEntry::Glob(SourceGlob::single("assets/scss/style.scss"))
    );
    assert_eq!(
        cfg.paths.resolve("css_dir").unwrap(),
        PathEntry::Dir(PathBuf::from("assets/css"))
    );
    assert_eq!(
        cfg.paths.resolve("js_bundle").unwrap(),
        PathEntry::FileName("all.js".into())
    );
    assert_eq!(
        cfg.paths.js_files().patterns(),
        ["assets/js/**/*.js", "!assets/js/**/*.min.js", "!assets/js/**/all.js"]
    );
    assert_eq!(cfg.watch.debounce_ms, 150);
    assert_eq!(cfg.server.port, 3000);
}

#[test]
fn unknown_logical_path_is_a_config_error() {
    let cfg = ConfigFile::defaults().unwrap();

    let err = cfg.paths.resolve("fonts_dir").unwrap_err();
    assert!(matches!(err, AssetflowError::ConfigError(_)));
}

#[test]
fn every_logical_name_resolves() {
    let cfg = ConfigFile::defaults().unwrap();
    for logical in LogicalPath::ALL {
        assert!(cfg.paths.resolve(logical.as_str()).is_ok(), "{logical}");
    }
}

#[test]
fn toml_overrides_are_applied() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "Assetflow.toml",
        r#"
[paths]
scss_entry = ["./src/styles/main.scss"]
build_dir = "public"

[css]
browsers = ["defaults"]

[chains]
dev = ["sass-dev"]

[watch]
debounce_ms = 40
"#,
    );

    let cfg = load_and_validate(dir.path().join("Assetflow.toml")).unwrap();

    assert_eq!(
        cfg.paths.scss_entry().patterns(),
        ["src/styles/main.scss".to_string()]
    );
    assert_eq!(cfg.paths.build_dir(), std::path::Path::new("public"));
    assert_eq!(cfg.css.browsers, vec!["defaults"]);
    assert_eq!(cfg.chains.dev, vec!["sass-dev"]);
    // Untouched sections keep their defaults.
    assert_eq!(cfg.chains.min.last().map(String::as_str), Some("minify"));
    assert_eq!(cfg.watch.debounce_ms, 40);
}

#[test]
fn missing_explicit_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();

    let err = load_or_default(dir.path().join("custom.toml")).unwrap_err();
    assert!(matches!(err, AssetflowError::ConfigError(_)));
}

#[test]
fn malformed_toml_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "Assetflow.toml", "[paths\nscss_dir = ");

    let err = load_and_validate(dir.path().join("Assetflow.toml")).unwrap_err();
    assert!(matches!(err, AssetflowError::TomlError(_)));
}

#[test]
fn build_dir_must_stay_inside_the_project() {
    for bad in ["..", "../dist", "/tmp/dist", "."] {
        let mut raw = RawConfigFile::default();
        raw.paths.build_dir = bad.into();

        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(matches!(err, AssetflowError::ConfigError(_)), "{bad}: {err:?}");
    }
}

#[test]
fn empty_values_are_rejected() {
    let mut raw = RawConfigFile::default();
    raw.css.browsers.clear();
    assert!(ConfigFile::try_from(raw).is_err());

    let mut raw = RawConfigFile::default();
    raw.paths.scss_entry = vec!["!assets/scss/skip.scss".into()];
    assert!(ConfigFile::try_from(raw).is_err());

    let mut raw = RawConfigFile::default();
    raw.paths.js_bundle = "nested/all.js".into();
    assert!(ConfigFile::try_from(raw).is_err());

    let mut raw = RawConfigFile::default();
    raw.chains.scss = vec!["sass".into(), " ".into()];
    assert!(ConfigFile::try_from(raw).is_err());
}

#[test]
fn invalid_glob_is_a_config_error() {
    let mut raw = RawConfigFile::default();
    raw.paths.html_files = vec!["[*.html".into()];
    let cfg = ConfigFile::try_from(raw).unwrap();

    let err = cfg.paths.html_files().compile().unwrap_err();
    assert!(matches!(err, AssetflowError::ConfigError(_)));
}
