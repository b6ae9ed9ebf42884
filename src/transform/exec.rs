// src/transform/exec.rs

//! External-tool transform stages.
//!
//! Two invocation modes:
//!
//! - filter: the artifact is written to the tool's stdin and the result read
//!   from stdout.
//! - in place: when the command line contains `{input}`, the artifact is
//!   written to a temporary file, `{input}` is replaced by its path, and the
//!   file is read back after the tool exits.

use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::{AssetflowError, Result};
use crate::transform::Artifact;

const INPUT_PLACEHOLDER: &str = "{input}";

/// Options for a stage that shells out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOptions {
    /// Name shown in logs and chain descriptions (`uglify`, `comb`, ...).
    pub label: String,
    pub command: String,
    /// When the program is not installed, pass artifacts through with a
    /// warning instead of failing.
    pub optional: bool,
}

impl ExecOptions {
    pub fn new(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// First word of the command line.
    pub fn program(&self) -> &str {
        self.command.split_whitespace().next().unwrap_or_default()
    }

    fn in_place(&self) -> bool {
        self.command.contains(INPUT_PLACEHOLDER)
    }
}

/// Run every artifact through the configured tool, in order.
pub async fn run_stage(opts: &ExecOptions, artifacts: Vec<Artifact>) -> Result<Vec<Artifact>> {
    if artifacts.is_empty() {
        return Ok(artifacts);
    }

    let program = opts.program();
    if let Err(e) = which::which(program) {
        if opts.optional {
            warn!(
                stage = %opts.label,
                program,
                "program not found on PATH; stage skipped"
            );
            return Ok(artifacts);
        }
        return Err(AssetflowError::StageConfigError(format!(
            "stage '{}' needs '{program}', which was not found: {e}",
            opts.label
        )));
    }

    let mut out = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let display = artifact.display_path();
        let contents = if opts.in_place() {
            run_in_place(&opts.command, &artifact, &display).await?
        } else {
            pipe_through(&opts.command, &artifact.contents, &display).await?
        };
        out.push(artifact.with_contents(contents));
    }
    Ok(out)
}

/// Feed `input` to `command_line` on stdin and collect stdout.
///
/// A non-zero exit status is reported as a compile error against `path`,
/// carrying the tool's stderr.
pub async fn pipe_through(command_line: &str, input: &[u8], path: &Path) -> Result<Vec<u8>> {
    debug!(cmd = %command_line, path = %path.display(), "running external transform");

    let mut cmd = shell(command_line);
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| AssetflowError::CompileError {
        path: path.to_path_buf(),
        message: format!("spawning '{command_line}': {e}"),
    })?;

    // Write stdin from its own task so a tool that fills its stdout pipe
    // before reading all input cannot deadlock us.
    let writer = child.stdin.take().map(|mut stdin| {
        let input = input.to_vec();
        tokio::spawn(async move {
            match stdin.write_all(&input).await {
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            }
        })
    });

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| AssetflowError::io_at(path, e))?;

    if let Some(writer) = writer {
        if let Ok(Err(e)) = writer.await {
            debug!(error = %e, "writing to external transform stdin failed");
        }
    }

    check_status(command_line, path, &output)?;
    Ok(output.stdout)
}

async fn run_in_place(command_line: &str, artifact: &Artifact, path: &Path) -> Result<Vec<u8>> {
    let suffix = artifact
        .extension()
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    let tmp = tempfile::Builder::new()
        .prefix("assetflow-")
        .suffix(&suffix)
        .tempfile()?;
    tokio::fs::write(tmp.path(), &artifact.contents)
        .await
        .map_err(|e| AssetflowError::io_at(tmp.path(), e))?;

    let quoted = format!("\"{}\"", tmp.path().display());
    let command_line = command_line.replace(INPUT_PLACEHOLDER, &quoted);
    debug!(cmd = %command_line, path = %path.display(), "running in-place transform");

    let output = shell(&command_line)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| AssetflowError::CompileError {
            path: path.to_path_buf(),
            message: format!("spawning '{command_line}': {e}"),
        })?;

    check_status(&command_line, path, &output)?;

    tokio::fs::read(tmp.path())
        .await
        .map_err(|e| AssetflowError::io_at(tmp.path(), e))
}

fn shell(command_line: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command_line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command_line);
        c
    }
}

fn check_status(command_line: &str, path: &Path, output: &std::process::Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let code = output.status.code().unwrap_or(-1);
    Err(AssetflowError::CompileError {
        path: path.to_path_buf(),
        message: format!(
            "'{command_line}' exited with status {code}: {}",
            stderr.trim()
        ),
    })
}
