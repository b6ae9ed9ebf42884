// src/watch/patterns.rs

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

use crate::errors::{AssetflowError, Result};

/// An ordered list of glob patterns relative to the project root.
///
/// Entries beginning with `!` exclude matches of the other entries:
///
/// ```text
/// assets/js/**/*.js
/// !assets/js/**/*.min.js
/// ```
///
/// `*` never crosses a `/`; `**` does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceGlob {
    patterns: Vec<String>,
}

impl SourceGlob {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref().trim();
                match p.strip_prefix('!') {
                    Some(rest) => format!("!{}", normalize_pattern(rest)),
                    None => normalize_pattern(p),
                }
            })
            .filter(|p| !p.is_empty() && p != "!")
            .collect();
        Self { patterns }
    }

    pub fn single(pattern: impl AsRef<str>) -> Self {
        Self::new([pattern])
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Compile into matchers. Invalid patterns are a configuration error.
    pub fn compile(&self) -> Result<CompiledGlob> {
        let mut includes = Vec::new();
        let mut excludes = Vec::new();

        for pat in &self.patterns {
            match pat.strip_prefix('!') {
                Some(neg) => excludes.push(neg.to_string()),
                None => includes.push(IncludePattern {
                    matcher: glob_matcher(pat)?,
                    base: literal_base(pat),
                    max_depth: max_depth(pat),
                }),
            }
        }

        let exclude = if excludes.is_empty() {
            None
        } else {
            Some(build_globset(&excludes)?)
        };

        Ok(CompiledGlob { includes, exclude })
    }
}

impl fmt::Display for SourceGlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.patterns.join(", "))
    }
}

#[derive(Clone)]
struct IncludePattern {
    matcher: GlobMatcher,
    /// Literal directory prefix; matched files are addressed relative to it.
    base: PathBuf,
    /// Directory levels below `base` worth walking (`None` for `**`).
    max_depth: Option<usize>,
}

/// Compiled form of a [`SourceGlob`].
#[derive(Clone)]
pub struct CompiledGlob {
    includes: Vec<IncludePattern>,
    exclude: Option<GlobSet>,
}

impl fmt::Debug for CompiledGlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bases: Vec<_> = self.includes.iter().map(|i| &i.base).collect();
        f.debug_struct("CompiledGlob")
            .field("bases", &bases)
            .finish_non_exhaustive()
    }
}

/// A file matched by a glob, addressed both absolutely and relative to the
/// base of the pattern that matched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Root-relative base directory (empty for the root itself).
    pub base: PathBuf,
    /// Path below `base`.
    pub relative: PathBuf,
    pub absolute: PathBuf,
}

impl CompiledGlob {
    /// Whether a root-relative, forward-slashed path is selected.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.matching_include(rel_path).is_some()
    }

    fn matching_include(&self, rel_path: &str) -> Option<&IncludePattern> {
        let include = self.includes.iter().find(|i| i.matcher.is_match(rel_path))?;
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel_path) {
                return None;
            }
        }
        Some(include)
    }

    /// Collect every file under `root` selected by this glob, sorted by path.
    ///
    /// Only the literal base directory of each include pattern is walked, and
    /// patterns without `**` stop at their own depth, so `*.html` never
    /// descends into the project tree.
    pub fn collect(&self, root: &Path) -> Result<Vec<SourceFile>> {
        let mut found: BTreeMap<PathBuf, SourceFile> = BTreeMap::new();

        for include in &self.includes {
            let start = root.join(&include.base);
            if start.is_file() {
                self.consider(root, &start, &mut found);
                continue;
            }
            if !start.is_dir() {
                continue;
            }

            let mut stack = vec![(start, 0usize)];
            while let Some((dir, depth)) = stack.pop() {
                let entries =
                    fs::read_dir(&dir).map_err(|e| AssetflowError::io_at(&dir, e))?;
                for entry in entries {
                    let path = entry.map_err(|e| AssetflowError::io_at(&dir, e))?.path();
                    if path.is_dir() {
                        let within = include.max_depth.is_none_or(|max| depth + 1 < max);
                        if within {
                            stack.push((path, depth + 1));
                        }
                    } else if path.is_file() {
                        self.consider(root, &path, &mut found);
                    }
                }
            }
        }

        Ok(found.into_values().collect())
    }

    fn consider(&self, root: &Path, path: &Path, found: &mut BTreeMap<PathBuf, SourceFile>) {
        if found.contains_key(path) {
            return;
        }
        let Ok(rel) = path.strip_prefix(root) else {
            return;
        };
        let rel_str = rel.to_string_lossy().replace('\\', "/");
        let Some(include) = self.matching_include(&rel_str) else {
            return;
        };
        let relative = rel
            .strip_prefix(&include.base)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| rel.to_path_buf());

        found.insert(
            path.to_path_buf(),
            SourceFile {
                base: include.base.clone(),
                relative,
                absolute: path.to_path_buf(),
            },
        );
    }
}

/// Strip a leading `./` (repeatedly) and normalise separators.
pub fn normalize_pattern(pattern: &str) -> String {
    let mut p = pattern.trim().replace('\\', "/");
    while let Some(rest) = p.strip_prefix("./") {
        p = rest.to_string();
    }
    p
}

/// The leading components of `pattern` that contain no glob syntax.
///
/// A fully literal pattern names a single file, whose base is its parent.
pub fn literal_base(pattern: &str) -> PathBuf {
    let components: Vec<&str> = pattern.split('/').collect();
    let literal: Vec<&str> = components
        .iter()
        .take_while(|c| !has_glob_meta(c))
        .copied()
        .collect();

    let base = if literal.len() == components.len() {
        &literal[..literal.len().saturating_sub(1)]
    } else {
        &literal[..]
    };
    base.iter().collect()
}

fn max_depth(pattern: &str) -> Option<usize> {
    if pattern.contains("**") {
        return None;
    }
    let total = pattern.split('/').count();
    let base = literal_base(pattern).components().count();
    Some(total.saturating_sub(base))
}

fn has_glob_meta(component: &str) -> bool {
    component.contains(['*', '?', '[', '{'])
}

fn glob_matcher(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| AssetflowError::ConfigError(format!("invalid glob pattern '{pattern}': {e}")))?;
    Ok(glob.compile_matcher())
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .map_err(|e| AssetflowError::ConfigError(format!("invalid glob pattern '{pat}': {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| AssetflowError::ConfigError(format!("building glob set: {e}")))
}
