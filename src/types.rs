// src/types.rs

use std::fmt;

/// How a composite task runs its children.
///
/// - `Series`: one after another, in listed order, stopping at the first
///   failure.
/// - `Parallel`: all at once; the composite fails as soon as any child does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeMode {
    Series,
    Parallel,
}

impl fmt::Display for CompositeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompositeMode::Series => "series",
            CompositeMode::Parallel => "parallel",
        })
    }
}
