// src/config/model.rs

use serde::Deserialize;

use crate::config::paths::PathConfig;

/// Top-level configuration as read from a TOML file.
///
/// Every section is optional; the defaults reproduce the classic
/// `assets/scss` + `assets/js` project layout:
///
/// ```toml
/// [paths]
/// scss_entry = ["assets/scss/style.scss"]
/// css_dir = "assets/css"
/// build_dir = "dest"
///
/// [css]
/// browsers = ["last 5 versions", "> 1%"]
///
/// [chains]
/// min = ["sass", "comb", "autoprefix", "pack-media-queries", "minify"]
///
/// [server]
/// port = 3000
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub css: CssSection,

    #[serde(default)]
    pub js: JsSection,

    #[serde(default)]
    pub chains: ChainsSection,

    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub server: ServerSection,
}

/// Validated configuration.
///
/// Only constructible via `TryFrom<RawConfigFile>` (see `validate.rs`), so the
/// path registry inside is always well-formed.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub paths: PathConfig,
    pub css: CssSection,
    pub js: JsSection,
    pub chains: ChainsSection,
    pub watch: WatchSection,
    pub server: ServerSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile, paths: PathConfig) -> Self {
        Self {
            paths,
            css: raw.css,
            js: raw.js,
            chains: raw.chains,
            watch: raw.watch,
            server: raw.server,
        }
    }

    /// Built-in configuration used when no config file is present.
    pub fn defaults() -> crate::errors::Result<Self> {
        ConfigFile::try_from(RawConfigFile::default())
    }
}

/// `[paths]` section. Globs are relative to the project root; a leading `!`
/// turns a pattern into an exclusion.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub scss_entry: Vec<String>,
    pub scss_files: Vec<String>,
    pub scss_dir: String,
    pub css_dir: String,
    pub html_files: Vec<String>,
    pub js_files: Vec<String>,
    pub js_dir: String,
    /// File name of the `concat` output, written into `js_dir`.
    pub js_bundle: String,
    pub build_dir: String,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            scss_entry: vec!["assets/scss/style.scss".into()],
            scss_files: vec!["assets/scss/**/*.scss".into()],
            scss_dir: "assets/scss".into(),
            css_dir: "assets/css".into(),
            html_files: vec!["*.html".into()],
            js_files: vec![
                "assets/js/**/*.js".into(),
                "!assets/js/**/*.min.js".into(),
                "!assets/js/**/all.js".into(),
            ],
            js_dir: "assets/js".into(),
            js_bundle: "all.js".into(),
            build_dir: "dest".into(),
        }
    }
}

/// `[css]` section: options for the style transforms.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CssSection {
    /// Browserslist queries used by `autoprefix` and `minify`.
    pub browsers: Vec<String>,

    /// Property-ordering rules file for `comb`, relative to the project root.
    /// Ignored (tool defaults apply) when the file does not exist.
    pub comb_rules: String,

    /// Command line of the property-ordering tool. `{input}` is replaced by
    /// a temporary file that the tool rewrites in place.
    pub comb_command: String,

    /// External Sass compiler (e.g. `"sass"`). When unset the built-in
    /// compiler is used.
    pub sass_command: Option<String>,
}

impl Default for CssSection {
    fn default() -> Self {
        Self {
            browsers: vec!["last 5 versions".into(), "> 1%".into()],
            comb_rules: ".csscomb.json".into(),
            comb_command: "csscomb".into(),
            sass_command: None,
        }
    }
}

/// `[js]` section: command lines for the script minifiers. Both read the
/// script on stdin and write the result to stdout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JsSection {
    pub uglify: String,
    pub terser: String,
}

impl Default for JsSection {
    fn default() -> Self {
        Self {
            uglify: "uglifyjs --toplevel --compress --mangle --beautify beautify=false,quote_style=1"
                .into(),
            terser: "terser --toplevel --compress --mangle --format quote_style=3".into(),
        }
    }
}

/// `[chains]` section: stage-name lists for the style tasks.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChainsSection {
    pub scss: Vec<String>,
    pub min: Vec<String>,
    pub dev: Vec<String>,
}

impl Default for ChainsSection {
    fn default() -> Self {
        Self {
            scss: vec![
                "sass".into(),
                "autoprefix".into(),
                "pack-media-queries".into(),
                "comb".into(),
            ],
            min: vec![
                "sass".into(),
                "comb".into(),
                "autoprefix".into(),
                "pack-media-queries".into(),
                "minify".into(),
            ],
            dev: vec![
                "sass-dev".into(),
                "autoprefix".into(),
                "pack-media-queries".into(),
            ],
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    /// Window in which rapid successive change events are coalesced.
    pub debounce_ms: u64,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self { debounce_ms: 150 }
    }
}

/// `[server]` section: the development server started by `watch`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// Directory served to the browser, relative to the project root.
    pub base_dir: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            base_dir: ".".into(),
        }
    }
}
