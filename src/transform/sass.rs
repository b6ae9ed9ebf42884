// src/transform/sass.rs

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use tracing::debug;

use crate::errors::{AssetflowError, Result};
use crate::transform::exec::pipe_through;
use crate::transform::Artifact;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SassStyle {
    #[default]
    Expanded,
    Compressed,
}

impl SassStyle {
    fn as_str(self) -> &'static str {
        match self {
            SassStyle::Expanded => "expanded",
            SassStyle::Compressed => "compressed",
        }
    }
}

/// Options for the `sass` / `sass-dev` stages.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SassOptions {
    pub style: SassStyle,
    /// Ask for an embedded source map (the `sass-dev` stage).
    pub source_map: bool,
    /// External compiler command line. `None` uses the built-in compiler.
    pub command: Option<String>,
}

/// Source map embedded by the built-in compiler. It names the Sass source
/// and carries its text; it has no segment mappings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceMap<'a> {
    version: u8,
    file: String,
    sources: Vec<String>,
    sources_content: Vec<&'a str>,
    names: Vec<String>,
    mappings: &'static str,
}

/// Compile every Sass source; `_partials` and non-Sass files are dropped.
pub async fn compile_all(opts: &SassOptions, artifacts: Vec<Artifact>) -> Result<Vec<Artifact>> {
    let sources: Vec<Artifact> = artifacts.into_iter().filter(is_compilable).collect();

    let mut out = Vec::with_capacity(sources.len());
    for artifact in sources {
        let path = artifact.path.with_extension("css");
        let css = match &opts.command {
            Some(command) => compile_external(command, opts, &artifact).await?,
            None => {
                let mut css = compile_builtin(opts.style, artifact.clone()).await?;
                if opts.source_map {
                    css.extend_from_slice(source_map_comment(&artifact, &path)?.as_bytes());
                }
                css
            }
        };
        out.push(artifact.with_contents(css).with_path(path));
    }
    Ok(out)
}

/// `/*# sourceMappingURL=data:... */` line pointing back at the Sass source.
///
/// The source is addressed root-absolute (`/assets/scss/style.scss`) so the
/// dev server can serve it when it serves the project root.
fn source_map_comment(artifact: &Artifact, output: &Path) -> Result<String> {
    let source = artifact
        .base
        .join(&artifact.path)
        .to_string_lossy()
        .replace('\\', "/");
    let map = SourceMap {
        version: 3,
        file: output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        sources: vec![format!("/{}", source.trim_start_matches('/'))],
        sources_content: vec![artifact.text()?],
        names: Vec::new(),
        mappings: "",
    };
    let json = serde_json::to_vec(&map).map_err(|e| artifact.compile_error(e))?;
    debug!(source = %source, "embedding source map");
    Ok(format!(
        "/*# sourceMappingURL=data:application/json;charset=utf-8;base64,{} */\n",
        BASE64.encode(json)
    ))
}

fn is_compilable(artifact: &Artifact) -> bool {
    let is_sass = matches!(artifact.extension(), Some("scss") | Some("sass"));
    is_sass && !artifact.file_name().starts_with('_')
}

fn load_dir(artifact: &Artifact) -> PathBuf {
    artifact
        .source_dir()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| artifact.base.clone())
}

async fn compile_builtin(style: SassStyle, artifact: Artifact) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || {
        let output_style = match style {
            SassStyle::Expanded => grass::OutputStyle::Expanded,
            SassStyle::Compressed => grass::OutputStyle::Compressed,
        };
        let load_dir = load_dir(&artifact);
        let options = grass::Options::default()
            .style(output_style)
            .input_syntax(syntax_of(&artifact))
            .load_path(&load_dir);

        let text = artifact.text()?;
        grass::from_string(text.to_owned(), &options)
            .map(|mut css| {
                if !css.ends_with('\n') {
                    css.push('\n');
                }
                css.into_bytes()
            })
            .map_err(|e| artifact.compile_error(e))
    })
    .await
    .map_err(|e| AssetflowError::Other(anyhow::anyhow!("sass worker failed: {e}")))?
}

fn syntax_of(artifact: &Artifact) -> grass::InputSyntax {
    match artifact.extension() {
        Some("sass") => grass::InputSyntax::Sass,
        _ => grass::InputSyntax::Scss,
    }
}

async fn compile_external(command: &str, opts: &SassOptions, artifact: &Artifact) -> Result<Vec<u8>> {
    let mut line = format!(
        "{command} --stdin --load-path=\"{}\" --style={}",
        load_dir(artifact).display(),
        opts.style.as_str()
    );
    if artifact.extension() == Some("sass") {
        line.push_str(" --indented");
    }
    if opts.source_map {
        line.push_str(" --embed-source-map");
    } else {
        line.push_str(" --no-source-map");
    }
    pipe_through(&line, &artifact.contents, &artifact.display_path()).await
}
