// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{AssetflowError, Result};

/// Load a configuration file and return the raw, unvalidated model.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| AssetflowError::io_at(path, e))?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde(default)` + `Default` impls).
/// - Builds the path registry and checks option sanity.
///
/// Stage names inside `[chains]` are checked when the standard tasks are
/// registered, before anything runs.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Like [`load_and_validate`], but a missing file at the *default* location
/// yields the built-in configuration. A missing file anywhere else is an
/// error, since the user asked for it explicitly.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    if !path.exists() {
        if path == default_config_path() {
            debug!(?path, "no config file found; using built-in defaults");
            return ConfigFile::defaults();
        }
        return Err(AssetflowError::ConfigError(format!(
            "config file {} does not exist",
            path.display()
        )));
    }
    load_and_validate(path)
}

/// Default config location: `Assetflow.toml` in the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Assetflow.toml")
}
