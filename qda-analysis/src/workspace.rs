//! Workspace file discovery.
//!
//! When a project descriptor pins explicit include lists the loader uses
//! those; otherwise the corpus is whatever matching files live under the
//! workspace root. The walk honors gitignore rules and returns sorted
//! paths so repeated scans see the corpus in the same order.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

/// Collect files under `root` whose extension is in `extensions`
/// (lowercase, without the leading dot). Sorted lexicographically.
pub fn discover_files(root: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .build();
    for entry in walker.flatten() {
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = entry.into_path();
        if matches_extension(&path, extensions) {
            found.push(path);
        }
    }
    found.sort();
    found
}

/// Path as shown to users: relative to the workspace root when possible,
/// absolute otherwise.
pub fn display_path(root: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf())
}

fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_lowercase();
            extensions.iter().any(|wanted| wanted == &ext)
        })
}
