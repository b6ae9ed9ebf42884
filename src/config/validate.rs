// src/config/validate.rs

use std::path::{Component, Path};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::config::paths::PathConfig;
use crate::errors::{AssetflowError, Result};
use crate::transform::css::CssTargets;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AssetflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let paths = PathConfig::from_section(&raw.paths)?;
        validate_raw_config(&raw, &paths)?;
        Ok(ConfigFile::new_unchecked(raw, paths))
    }
}

fn validate_raw_config(cfg: &RawConfigFile, paths: &PathConfig) -> Result<()> {
    validate_build_dir(paths.build_dir())?;
    validate_css(cfg)?;
    validate_js(cfg)?;
    validate_chains(cfg)?;
    Ok(())
}

/// `build` recursively deletes this directory, so it must stay strictly
/// inside the project root.
fn validate_build_dir(dir: &Path) -> Result<()> {
    let escapes = dir.is_absolute()
        || dir
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
    let is_root = dir
        .components()
        .all(|c| matches!(c, Component::CurDir));

    if escapes || is_root {
        return Err(AssetflowError::ConfigError(format!(
            "[paths].build_dir must be a sub-directory of the project root (got '{}')",
            dir.display()
        )));
    }
    Ok(())
}

fn validate_css(cfg: &RawConfigFile) -> Result<()> {
    if cfg.css.browsers.is_empty() {
        return Err(AssetflowError::ConfigError(
            "[css].browsers must contain at least one query".to_string(),
        ));
    }
    // Surface bad browserslist queries at startup rather than on first run.
    CssTargets::from_queries(&cfg.css.browsers)?;

    if cfg.css.comb_command.trim().is_empty() {
        return Err(AssetflowError::ConfigError(
            "[css].comb_command must not be empty".to_string(),
        ));
    }
    if let Some(cmd) = &cfg.css.sass_command {
        if cmd.trim().is_empty() {
            return Err(AssetflowError::ConfigError(
                "[css].sass_command must not be empty when set".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_js(cfg: &RawConfigFile) -> Result<()> {
    for (key, cmd) in [("uglify", &cfg.js.uglify), ("terser", &cfg.js.terser)] {
        if cmd.trim().is_empty() {
            return Err(AssetflowError::ConfigError(format!(
                "[js].{key} must not be empty"
            )));
        }
    }
    Ok(())
}

fn validate_chains(cfg: &RawConfigFile) -> Result<()> {
    for (key, chain) in [
        ("scss", &cfg.chains.scss),
        ("min", &cfg.chains.min),
        ("dev", &cfg.chains.dev),
    ] {
        if chain.is_empty() {
            return Err(AssetflowError::ConfigError(format!(
                "[chains].{key} must list at least one stage"
            )));
        }
        if let Some(blank) = chain.iter().position(|s| s.trim().is_empty()) {
            return Err(AssetflowError::ConfigError(format!(
                "[chains].{key} has an empty stage name at position {blank}"
            )));
        }
    }
    Ok(())
}
