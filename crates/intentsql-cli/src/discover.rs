//! Source file discovery

use intentsql_core::QueriesConfig;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directories never scanned for sources
const SKIPPED_DIRS: &[&str] = &["node_modules", "dist", "build", "target"];

fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.') || SKIPPED_DIRS.contains(&name))
}

/// Expand files and directories into source files
///
/// Files are kept as given. Directories are walked in file-name order and
/// contribute files with a configured extension. Missing roots are reported
/// and skipped.
pub fn source_files(roots: &[PathBuf], queries: &QueriesConfig) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for root in roots {
        if root.is_file() {
            files.push(root.clone());
            continue;
        }

        if !root.is_dir() {
            tracing::warn!(path = %root.display(), "source path does not exist");
            continue;
        }

        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_skipped(e))
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() && queries.matches_extension(entry.path()) {
                files.push(entry.path().to_path_buf());
            }
        }
    }

    files.dedup();
    files
}

/// Path relative to the project root, for stable identities across machines
pub fn relative_to(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root).map(Path::to_path_buf).unwrap_or_else(|_| path.to_path_buf())
}
