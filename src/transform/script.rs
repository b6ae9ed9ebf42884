// src/transform/script.rs

use std::path::PathBuf;

use crate::transform::Artifact;

/// Join all artifacts, in order, into a single `file_name`.
///
/// The output sits in the base directory of the first input. An empty input
/// set produces no output.
pub fn concat(artifacts: Vec<Artifact>, file_name: &str) -> Vec<Artifact> {
    let Some(first) = artifacts.first() else {
        return Vec::new();
    };
    let base = first.base.clone();

    let mut contents = Vec::new();
    for (i, artifact) in artifacts.iter().enumerate() {
        if i > 0 {
            contents.push(b'\n');
        }
        contents.extend_from_slice(&artifact.contents);
    }

    vec![Artifact {
        base,
        path: PathBuf::from(file_name),
        origin: None,
        contents,
    }]
}

/// Insert `suffix` before the extension: `all.js` + `.min` gives `all.min.js`.
pub fn rename_all(artifacts: Vec<Artifact>, suffix: &str) -> Vec<Artifact> {
    artifacts
        .into_iter()
        .map(|artifact| {
            let renamed = with_suffix(&artifact.path, suffix);
            artifact.with_path(renamed)
        })
        .collect()
}

fn with_suffix(path: &std::path::Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };
    path.with_file_name(name)
}
