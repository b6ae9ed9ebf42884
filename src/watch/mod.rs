// src/watch/mod.rs

//! File watching and change dispatch.
//!
//! This module is responsible for:
//! - Compiling source and watch globs ([`patterns`]).
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Mapping changed files to bound actions and running them
//!   ([`dispatcher`]).

pub mod dispatcher;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use dispatcher::{
    DispatchReport, Dispatcher, DispatcherState, WatchAction, WatchBinding, WatchEvent,
};
pub use patterns::{CompiledGlob, SourceFile, SourceGlob};
pub use watcher::{spawn_watcher, WatcherHandle};
