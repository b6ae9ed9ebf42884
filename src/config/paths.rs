// src/config/paths.rs

//! The path registry: named logical locations, resolved once at startup.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::model::PathsSection;
use crate::errors::{AssetflowError, Result};
use crate::watch::patterns::{normalize_pattern, SourceGlob};

/// Logical names understood by [`PathConfig::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalPath {
    ScssEntry,
    ScssFiles,
    ScssDir,
    CssDir,
    HtmlFiles,
    JsFiles,
    JsDir,
    JsBundle,
    BuildDir,
}

impl LogicalPath {
    pub const ALL: [LogicalPath; 9] = [
        LogicalPath::ScssEntry,
        LogicalPath::ScssFiles,
        LogicalPath::ScssDir,
        LogicalPath::CssDir,
        LogicalPath::HtmlFiles,
        LogicalPath::JsFiles,
        LogicalPath::JsDir,
        LogicalPath::JsBundle,
        LogicalPath::BuildDir,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LogicalPath::ScssEntry => "scss_entry",
            LogicalPath::ScssFiles => "scss_files",
            LogicalPath::ScssDir => "scss_dir",
            LogicalPath::CssDir => "css_dir",
            LogicalPath::HtmlFiles => "html_files",
            LogicalPath::JsFiles => "js_files",
            LogicalPath::JsDir => "js_dir",
            LogicalPath::JsBundle => "js_bundle",
            LogicalPath::BuildDir => "build_dir",
        }
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalPath {
    type Err = AssetflowError;

    fn from_str(s: &str) -> Result<Self> {
        LogicalPath::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| AssetflowError::ConfigError(format!("unknown logical path '{s}'")))
    }
}

/// What a logical name resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathEntry {
    Glob(SourceGlob),
    Dir(PathBuf),
    FileName(String),
}

/// Immutable registry of the project's locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathConfig {
    scss_entry: SourceGlob,
    scss_files: SourceGlob,
    scss_dir: PathBuf,
    css_dir: PathBuf,
    html_files: SourceGlob,
    js_files: SourceGlob,
    js_dir: PathBuf,
    js_bundle: String,
    build_dir: PathBuf,
}

impl PathConfig {
    /// Build the registry from the `[paths]` section, rejecting empty entries.
    pub fn from_section(section: &PathsSection) -> Result<Self> {
        Ok(Self {
            scss_entry: glob_entry(LogicalPath::ScssEntry, &section.scss_entry)?,
            scss_files: glob_entry(LogicalPath::ScssFiles, &section.scss_files)?,
            scss_dir: dir_entry(LogicalPath::ScssDir, &section.scss_dir)?,
            css_dir: dir_entry(LogicalPath::CssDir, &section.css_dir)?,
            html_files: glob_entry(LogicalPath::HtmlFiles, &section.html_files)?,
            js_files: glob_entry(LogicalPath::JsFiles, &section.js_files)?,
            js_dir: dir_entry(LogicalPath::JsDir, &section.js_dir)?,
            js_bundle: file_name_entry(LogicalPath::JsBundle, &section.js_bundle)?,
            build_dir: dir_entry(LogicalPath::BuildDir, &section.build_dir)?,
        })
    }

    /// Look up a logical location by name.
    pub fn resolve(&self, name: &str) -> Result<PathEntry> {
        let logical: LogicalPath = name.parse()?;
        Ok(self.get(logical))
    }

    pub fn get(&self, logical: LogicalPath) -> PathEntry {
        match logical {
            LogicalPath::ScssEntry => PathEntry::Glob(self.scss_entry.clone()),
            LogicalPath::ScssFiles => PathEntry::Glob(self.scss_files.clone()),
            LogicalPath::ScssDir => PathEntry::Dir(self.scss_dir.clone()),
            LogicalPath::CssDir => PathEntry::Dir(self.css_dir.clone()),
            LogicalPath::HtmlFiles => PathEntry::Glob(self.html_files.clone()),
            LogicalPath::JsFiles => PathEntry::Glob(self.js_files.clone()),
            LogicalPath::JsDir => PathEntry::Dir(self.js_dir.clone()),
            LogicalPath::JsBundle => PathEntry::FileName(self.js_bundle.clone()),
            LogicalPath::BuildDir => PathEntry::Dir(self.build_dir.clone()),
        }
    }

    pub fn scss_entry(&self) -> &SourceGlob {
        &self.scss_entry
    }

    pub fn scss_files(&self) -> &SourceGlob {
        &self.scss_files
    }

    pub fn scss_dir(&self) -> &Path {
        &self.scss_dir
    }

    pub fn css_dir(&self) -> &Path {
        &self.css_dir
    }

    pub fn html_files(&self) -> &SourceGlob {
        &self.html_files
    }

    pub fn js_files(&self) -> &SourceGlob {
        &self.js_files
    }

    pub fn js_dir(&self) -> &Path {
        &self.js_dir
    }

    pub fn js_bundle(&self) -> &str {
        &self.js_bundle
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }
}

fn glob_entry(name: LogicalPath, patterns: &[String]) -> Result<SourceGlob> {
    let has_include = patterns
        .iter()
        .any(|p| !p.trim().is_empty() && !p.trim_start().starts_with('!'));
    if !has_include {
        return Err(AssetflowError::ConfigError(format!(
            "[paths].{name} needs at least one non-negated pattern"
        )));
    }
    Ok(SourceGlob::new(patterns))
}

fn dir_entry(name: LogicalPath, dir: &str) -> Result<PathBuf> {
    let normalized = normalize_pattern(dir);
    let normalized = normalized.trim_end_matches('/');
    if normalized.is_empty() {
        return Err(AssetflowError::ConfigError(format!(
            "[paths].{name} must not be empty"
        )));
    }
    Ok(PathBuf::from(normalized))
}

fn file_name_entry(name: LogicalPath, file: &str) -> Result<String> {
    let file = file.trim();
    if file.is_empty() || file.contains(['/', '\\']) {
        return Err(AssetflowError::ConfigError(format!(
            "[paths].{name} must be a bare file name (got '{file}')"
        )));
    }
    Ok(file.to_string())
}
