//! Filesystem helpers for locating edit files

use crate::error::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursively list files under `root`, optionally keeping only the given
/// extensions (with or without a leading dot, compared ignoring ASCII case,
/// matching [`Delimiter::for_path`](crate::tabular::Delimiter::for_path)).
/// Results are sorted by path.
pub fn discover_files<P: AsRef<Path>>(root: P, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let wanted: Vec<&str> = extensions
        .iter()
        .map(|ext| ext.trim_start_matches('.'))
        .collect();

    let mut paths = Vec::new();
    for entry in WalkDir::new(root.as_ref()).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let matches = wanted.is_empty()
            || path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| wanted.iter().any(|w| w.eq_ignore_ascii_case(ext)));

        if matches {
            paths.push(path.to_path_buf());
        }
    }

    Ok(paths)
}

/// Whether anything exists at `path`
pub fn path_exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().exists()
}

/// Whether `path` is an existing directory
pub fn directory_exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().is_dir()
}

/// File name including extension, e.g. `items.csv`
pub fn base_name_with_extension<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// File name without its last extension, e.g. `items`
pub fn base_name_without_extension<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
