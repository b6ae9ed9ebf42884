// src/transform/registry.rs

//! Resolve stage names from configuration into [`TransformStage`] values.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{ConfigFile, CssSection, JsSection};
use crate::errors::{AssetflowError, Result};
use crate::transform::css::CssTargets;
use crate::transform::exec::ExecOptions;
use crate::transform::sass::{SassOptions, SassStyle};
use crate::transform::{build_chain, TransformChain, TransformStage};

/// Names accepted by [`StageRegistry::resolve`], for error messages and
/// `--dry-run`.
pub const STAGE_NAMES: [&str; 11] = [
    "sass",
    "sass-dev",
    "autoprefix",
    "pack-media-queries",
    "minify",
    "comb",
    "uglify",
    "terser",
    "concat:<file>",
    "rename:<suffix>",
    "exec:<command>",
];

const DART_SASS: &str = "sass";

/// Turns stage names into fully configured stages.
#[derive(Debug, Clone)]
pub struct StageRegistry {
    root: PathBuf,
    targets: CssTargets,
    css: CssSection,
    js: JsSection,
}

impl StageRegistry {
    pub fn new(cfg: &ConfigFile, root: impl Into<PathBuf>) -> Result<Self> {
        Self::from_sections(&cfg.css, &cfg.js, root)
    }

    pub fn from_sections(css: &CssSection, js: &JsSection, root: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            root: root.into(),
            targets: CssTargets::from_queries(&css.browsers)?,
            css: css.clone(),
            js: js.clone(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a single stage name. Stages that take an argument use
    /// `name:argument` (`concat:all.js`, `rename:.min`, `exec:cat`).
    pub fn resolve(&self, spec: &str) -> Result<TransformStage> {
        let spec = spec.trim();
        let (name, arg) = match spec.split_once(':') {
            Some((name, arg)) => (name.trim(), Some(arg.trim())),
            None => (spec, None),
        };

        let stage = match (name, arg) {
            ("sass", None) => TransformStage::Sass(self.sass_options(false)),
            ("sass-dev", None) => TransformStage::Sass(self.sass_options(true)),
            ("autoprefix", None) => TransformStage::Autoprefix(self.targets.clone()),
            ("pack-media-queries", None) => TransformStage::PackMediaQueries,
            ("minify", None) => TransformStage::Minify(self.targets.clone()),
            ("comb", None) => self.comb(false),
            ("uglify", None) => {
                TransformStage::Exec(ExecOptions::new("uglify", self.js.uglify.clone()))
            }
            ("terser", None) => {
                TransformStage::Exec(ExecOptions::new("terser", self.js.terser.clone()))
            }
            ("concat", Some(file)) => TransformStage::Concat {
                file_name: non_empty(spec, file)?.to_string(),
            },
            ("rename", Some(suffix)) => TransformStage::Rename {
                suffix: non_empty(spec, suffix)?.to_string(),
            },
            ("exec", Some(command)) => {
                TransformStage::Exec(ExecOptions::new("exec", non_empty(spec, command)?))
            }
            _ => {
                return Err(AssetflowError::StageConfigError(format!(
                    "unknown transform stage '{spec}' (expected one of: {})",
                    STAGE_NAMES.join(", ")
                )));
            }
        };
        debug!(spec, stage = stage.name(), "resolved transform stage");
        Ok(stage)
    }

    /// Resolve and compose a list of stage names.
    pub fn build_chain<S: AsRef<str>>(&self, names: &[S]) -> Result<TransformChain> {
        let stages = names
            .iter()
            .map(|n| self.resolve(n.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(build_chain(stages))
    }

    /// Property-ordering stage. Inside chains it is optional, so a missing
    /// tool does not break compilation; the standalone `comb` task requires it.
    pub fn comb(&self, required: bool) -> TransformStage {
        let rules = self.root.join(&self.css.comb_rules);
        let command = if rules.is_file() {
            format!(
                "{} --config \"{}\" {{input}}",
                self.css.comb_command,
                rules.display()
            )
        } else {
            format!("{} {{input}}", self.css.comb_command)
        };
        let opts = ExecOptions::new("comb", command);
        TransformStage::Exec(if required { opts } else { opts.optional() })
    }

    /// `sass-dev` prefers an installed `sass` binary, which maps every
    /// rule back to its source; the built-in compiler only embeds a map
    /// naming the source file.
    fn sass_options(&self, source_map: bool) -> SassOptions {
        let command = self.css.sass_command.clone().or_else(|| {
            if !source_map {
                return None;
            }
            let found = which::which(DART_SASS).ok()?;
            debug!(path = ?found, "using installed sass for source maps");
            Some(DART_SASS.to_string())
        });
        SassOptions {
            style: SassStyle::Expanded,
            source_map,
            command,
        }
    }
}

fn non_empty<'a>(spec: &str, arg: &'a str) -> Result<&'a str> {
    if arg.is_empty() {
        return Err(AssetflowError::StageConfigError(format!(
            "stage '{spec}' needs a non-empty argument"
        )));
    }
    Ok(arg)
}
