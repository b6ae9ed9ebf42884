// src/config/mod.rs

//! Configuration loading and validation for assetflow.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Resolve logical locations into globs and directories (`paths.rs`).
//! - Load a config file from disk, or fall back to defaults (`loader.rs`).
//! - Validate invariants before any task is registered (`validate.rs`).

pub mod loader;
pub mod model;
pub mod paths;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{
    ChainsSection, ConfigFile, CssSection, JsSection, PathsSection, RawConfigFile,
    ServerSection, WatchSection,
};
pub use paths::{LogicalPath, PathConfig, PathEntry};
