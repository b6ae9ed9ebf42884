// src/transform/mod.rs

//! Transform stages and the chains built from them.
//!
//! A [`TransformStage`] is an immutable description of one step (compile
//! Sass, prefix, pack media queries, minify, concatenate, rename, pipe
//! through an external tool). A [`TransformChain`] applies an ordered list of
//! stages left to right; each stage receives the artifacts produced by the
//! previous one.
//!
//! - [`sass`] wraps the Sass compiler.
//! - [`css`] holds the `lightningcss`-backed style transforms.
//! - [`script`] holds concatenation and renaming.
//! - [`exec`] pipes artifacts through external commands.
//! - [`registry`] resolves stage names from config into stages.

pub mod css;
pub mod exec;
pub mod registry;
pub mod sass;
pub mod script;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::errors::{AssetflowError, Result};
use crate::watch::patterns::SourceFile;

pub use css::CssTargets;
pub use exec::ExecOptions;
pub use registry::StageRegistry;
pub use sass::{SassOptions, SassStyle};

/// One file flowing through a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Root-relative directory the artifact was read from.
    pub base: PathBuf,
    /// Path below `base`; also the path written below the destination.
    pub path: PathBuf,
    /// Absolute source file, when the artifact maps to exactly one.
    pub origin: Option<PathBuf>,
    pub contents: Vec<u8>,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            base: PathBuf::new(),
            path: path.into(),
            origin: None,
            contents: contents.into(),
        }
    }

    pub fn from_source(source: &SourceFile, contents: Vec<u8>) -> Self {
        Self {
            base: source.base.clone(),
            path: source.relative.clone(),
            origin: Some(source.absolute.clone()),
            contents,
        }
    }

    /// Path used in error messages and logs.
    pub fn display_path(&self) -> PathBuf {
        self.origin
            .clone()
            .unwrap_or_else(|| self.base.join(&self.path))
    }

    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.contents).map_err(|e| AssetflowError::CompileError {
            path: self.display_path(),
            message: format!("not valid UTF-8: {e}"),
        })
    }

    pub fn with_contents(mut self, contents: impl Into<Vec<u8>>) -> Self {
        self.contents = contents.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }

    /// Directory of the source file, used to resolve relative imports.
    pub fn source_dir(&self) -> Option<&Path> {
        self.origin.as_deref().and_then(Path::parent)
    }

    pub(crate) fn compile_error(&self, message: impl fmt::Display) -> AssetflowError {
        AssetflowError::CompileError {
            path: self.display_path(),
            message: message.to_string(),
        }
    }
}

/// A single named transform with its options.
#[derive(Debug, Clone)]
pub enum TransformStage {
    /// Compile `.scss` to `.css`; `_partials` are dropped.
    Sass(SassOptions),
    /// Add vendor prefixes for the given browser targets.
    Autoprefix(CssTargets),
    /// Merge identical `@media` blocks and move them to the end, mobile-first.
    PackMediaQueries,
    /// Whitespace/structure minification of CSS.
    Minify(CssTargets),
    /// Join every artifact into one file.
    Concat { file_name: String },
    /// `style.css` + `.min` → `style.min.css`.
    Rename { suffix: String },
    /// Run an external tool over each artifact.
    Exec(ExecOptions),
}

impl TransformStage {
    pub fn name(&self) -> &str {
        match self {
            TransformStage::Sass(opts) if opts.source_map => "sass-dev",
            TransformStage::Sass(_) => "sass",
            TransformStage::Autoprefix(_) => "autoprefix",
            TransformStage::PackMediaQueries => "pack-media-queries",
            TransformStage::Minify(_) => "minify",
            TransformStage::Concat { .. } => "concat",
            TransformStage::Rename { .. } => "rename",
            TransformStage::Exec(opts) => &opts.label,
        }
    }

    /// Apply this stage to a set of artifacts.
    pub async fn apply(&self, artifacts: Vec<Artifact>) -> Result<Vec<Artifact>> {
        match self {
            TransformStage::Sass(opts) => sass::compile_all(opts, artifacts).await,
            TransformStage::Autoprefix(targets) => {
                let targets = targets.clone();
                css::map_blocking(artifacts, move |css, name| css::autoprefix(css, &targets, name))
                    .await
            }
            TransformStage::PackMediaQueries => {
                css::map_blocking(artifacts, css::pack_media_queries).await
            }
            TransformStage::Minify(targets) => {
                let targets = targets.clone();
                css::map_blocking(artifacts, move |css, name| css::minify(css, &targets, name))
                    .await
            }
            TransformStage::Concat { file_name } => Ok(script::concat(artifacts, file_name)),
            TransformStage::Rename { suffix } => Ok(script::rename_all(artifacts, suffix)),
            TransformStage::Exec(opts) => exec::run_stage(opts, artifacts).await,
        }
    }
}

/// An ordered, immutable sequence of stages. Cheap to clone.
#[derive(Clone)]
pub struct TransformChain {
    stages: Arc<[TransformStage]>,
}

/// Compose stages into a chain applied strictly in the given order.
pub fn build_chain(stages: Vec<TransformStage>) -> TransformChain {
    TransformChain {
        stages: stages.into(),
    }
}

impl TransformChain {
    pub fn stages(&self) -> &[TransformStage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// A new chain with `stage` appended after every existing stage.
    pub fn then(&self, stage: TransformStage) -> TransformChain {
        let mut stages = self.stages.to_vec();
        stages.push(stage);
        build_chain(stages)
    }

    pub async fn apply(&self, mut artifacts: Vec<Artifact>) -> Result<Vec<Artifact>> {
        for stage in self.stages.iter() {
            let before = artifacts.len();
            artifacts = stage.apply(artifacts).await?;
            debug!(
                stage = stage.name(),
                inputs = before,
                outputs = artifacts.len(),
                "applied transform stage"
            );
        }
        Ok(artifacts)
    }
}

impl fmt::Debug for TransformChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransformChain({self})")
    }
}

impl fmt::Display for TransformChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stages.is_empty() {
            return f.write_str("copy");
        }
        let names: Vec<&str> = self.stages.iter().map(|s| s.name()).collect();
        f.write_str(&names.join(" -> "))
    }
}
