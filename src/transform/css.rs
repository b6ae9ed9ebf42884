// src/transform/css.rs

//! Style transforms backed by `lightningcss`.
//!
//! Each transform parses the stylesheet, works on the AST, and prints it
//! again. Output is deterministic for a given input and target set.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use lightningcss::rules::CssRule;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use lightningcss::traits::ToCss;
use regex::Regex;

use crate::errors::{AssetflowError, Result};
use crate::transform::Artifact;

/// Browser targets resolved from browserslist queries.
#[derive(Clone, Default)]
pub struct CssTargets {
    queries: Vec<String>,
    browsers: Option<Browsers>,
}

impl CssTargets {
    pub fn from_queries<S: AsRef<str>>(queries: &[S]) -> Result<Self> {
        let queries: Vec<String> = queries.iter().map(|q| q.as_ref().to_string()).collect();
        let browsers = Browsers::from_browserslist(queries.iter().map(String::as_str))
            .map_err(|e| {
                AssetflowError::StageConfigError(format!(
                    "invalid browser targets {queries:?}: {e}"
                ))
            })?;
        Ok(Self { queries, browsers })
    }

    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    fn targets(&self) -> Targets {
        match self.browsers {
            Some(browsers) => Targets::from(browsers),
            None => Targets::default(),
        }
    }
}

impl fmt::Debug for CssTargets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CssTargets").field(&self.queries).finish()
    }
}

/// Run a text transform over every CSS artifact on the blocking pool.
/// Non-CSS artifacts pass through untouched.
pub async fn map_blocking<F>(artifacts: Vec<Artifact>, transform: F) -> Result<Vec<Artifact>>
where
    F: Fn(&str, &str) -> std::result::Result<String, String> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        artifacts
            .into_iter()
            .map(|artifact| {
                if artifact.extension() != Some("css") {
                    return Ok(artifact);
                }
                let name = artifact.display_path().to_string_lossy().into_owned();
                let input = artifact.text()?;
                let mut output = transform(input, &name)
                    .map_err(|message| artifact.compile_error(message))?;
                if let Some(comment) = source_map_comment(input) {
                    if source_map_comment(&output).is_none() {
                        if !output.ends_with('\n') {
                            output.push('\n');
                        }
                        output.push_str(comment);
                        output.push('\n');
                    }
                }
                Ok(artifact.with_contents(output))
            })
            .collect::<Result<Vec<_>>>()
    })
    .await
    .map_err(|e| AssetflowError::Other(anyhow::anyhow!("css transform worker failed: {e}")))?
}

/// The trailing `/*# sourceMappingURL=... */` comment of `css`, if any.
///
/// The lightningcss printer drops comments, so the transforms carry the
/// reference over from their input.
pub fn source_map_comment(css: &str) -> Option<&str> {
    let start = css.rfind("/*# sourceMappingURL=")?;
    let len = css[start..].find("*/")? + 2;
    Some(&css[start..start + len])
}

/// Add vendor prefixes required by `targets`, keeping the output readable.
///
/// Prefixing goes through the lightningcss minifier with pretty printing, so
/// besides prefixes the output also has adjacent identical selectors merged
/// and values normalised (`#ff0000` becomes `red`, longhands may collapse
/// into a shorthand).
pub fn autoprefix(css: &str, targets: &CssTargets, filename: &str) -> std::result::Result<String, String> {
    let mut sheet = parse(css, filename)?;
    sheet
        .minify(MinifyOptions {
            targets: targets.targets(),
            ..MinifyOptions::default()
        })
        .map_err(|e| e.to_string())?;
    print(&sheet, false, targets.targets())
}

/// Minify: merge and shorten rules, strip whitespace and comments.
pub fn minify(css: &str, targets: &CssTargets, filename: &str) -> std::result::Result<String, String> {
    let mut sheet = parse(css, filename)?;
    sheet
        .minify(MinifyOptions {
            targets: targets.targets(),
            ..MinifyOptions::default()
        })
        .map_err(|e| e.to_string())?;
    print(&sheet, true, targets.targets())
}

/// Merge top-level `@media` rules sharing the same query and move them after
/// all other rules, ordered mobile-first.
pub fn pack_media_queries(css: &str, filename: &str) -> std::result::Result<String, String> {
    let mut sheet = parse(css, filename)?;

    let rules = std::mem::take(&mut sheet.rules.0);
    let mut packed = Vec::with_capacity(rules.len());
    let mut media: Vec<(String, CssRule)> = Vec::new();

    for rule in rules {
        match rule {
            CssRule::Media(rule) => {
                let query = rule
                    .query
                    .to_css_string(PrinterOptions::default())
                    .map_err(|e| e.to_string())?;
                let existing = media.iter_mut().find(|(q, _)| *q == query);
                match existing {
                    Some((_, CssRule::Media(group))) => group.rules.0.extend(rule.rules.0),
                    _ => media.push((query, CssRule::Media(rule))),
                }
            }
            other => packed.push(other),
        }
    }

    // Stable sort keeps first-seen order among equal keys.
    media.sort_by(|(a, _), (b, _)| compare_media_queries(a, b));
    packed.extend(media.into_iter().map(|(_, rule)| rule));
    sheet.rules.0 = packed;

    print(&sheet, false, Targets::default())
}

fn parse<'i>(css: &'i str, filename: &str) -> std::result::Result<StyleSheet<'i>, String> {
    let options = ParserOptions {
        filename: filename.to_string(),
        ..ParserOptions::default()
    };
    StyleSheet::parse(css, options).map_err(|e| e.to_string())
}

fn print(sheet: &StyleSheet, minify: bool, targets: Targets) -> std::result::Result<String, String> {
    let printed = sheet
        .to_css(PrinterOptions {
            minify,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;
    let mut code = printed.code;
    if !minify && !code.ends_with('\n') {
        code.push('\n');
    }
    Ok(code)
}

static LEGACY_WIDTH: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(min|max)-width\s*:\s*([0-9]*\.?[0-9]+)\s*(px|em|rem)?").ok()
});

static RANGE_WIDTH: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"width\s*(>=|<=|>|<)\s*([0-9]*\.?[0-9]+)\s*(px|em|rem)?").ok()
});

#[derive(Debug, PartialEq)]
enum MediaKey {
    MinWidth(f64),
    MaxWidth(f64),
    Other,
}

/// Accepts both `min-width: 40em` and `width >= 40em`.
fn media_key(query: &str) -> MediaKey {
    let mut min = None;
    let mut max = None;

    for re in [&*LEGACY_WIDTH, &*RANGE_WIDTH] {
        let Some(re) = re else { continue };
        for caps in re.captures_iter(query) {
            let Some(value) = caps.get(2).and_then(|m| m.as_str().parse::<f64>().ok()) else {
                continue;
            };
            let scale = match caps.get(3).map(|m| m.as_str()) {
                Some("em") | Some("rem") => 16.0,
                _ => 1.0,
            };
            let is_min = matches!(caps.get(1).map(|m| m.as_str()), Some("min" | ">=" | ">"));
            let slot = if is_min { &mut min } else { &mut max };
            slot.get_or_insert(value * scale);
        }
    }

    match (min, max) {
        (Some(min), _) => MediaKey::MinWidth(min),
        (None, Some(max)) => MediaKey::MaxWidth(max),
        (None, None) => MediaKey::Other,
    }
}

/// Mobile-first: `min-width` ascending, then `max-width` descending, then
/// everything else.
pub fn compare_media_queries(a: &str, b: &str) -> Ordering {
    match (media_key(a), media_key(b)) {
        (MediaKey::MinWidth(x), MediaKey::MinWidth(y)) => x.total_cmp(&y),
        (MediaKey::MaxWidth(x), MediaKey::MaxWidth(y)) => y.total_cmp(&x),
        (MediaKey::MinWidth(_), _) => Ordering::Less,
        (_, MediaKey::MinWidth(_)) => Ordering::Greater,
        (MediaKey::MaxWidth(_), _) => Ordering::Less,
        (_, MediaKey::MaxWidth(_)) => Ordering::Greater,
        (MediaKey::Other, MediaKey::Other) => Ordering::Equal,
    }
}
