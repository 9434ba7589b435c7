//! Source file discovery.
//!
//! Walks each requested path and collects `.js` files, skipping build output
//! and dependency directories. Paths are returned relative to the project
//! root and sorted, so runs are deterministic.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

use ember_data_codemod_core::error::CodemodError;

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &["node_modules", ".git", "dist", "tmp"];

const EXTENSION: &str = "js";

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

/// Collect the `.js` files under `paths`.
///
/// `paths` are relative to `root` (absolute paths are used as is). A path
/// that names a file is taken even if it is not `.js`. Missing paths are an
/// error when `explicit` is set and silently skipped otherwise, which is how
/// the default directory list behaves.
pub fn collect_source_files(
    root: &Path,
    paths: &[PathBuf],
    explicit: bool,
) -> Result<Vec<PathBuf>, CodemodError> {
    let mut files = Vec::new();

    for path in paths {
        let full = root.join(path);
        if !full.exists() {
            if explicit {
                return Err(CodemodError::PathNotFound {
                    path: path.display().to_string(),
                });
            }
            debug!(path = %path.display(), "skipping missing default path");
            continue;
        }

        if full.is_file() {
            files.push(relative_to(root, &full));
            continue;
        }

        for entry in WalkDir::new(&full)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !is_skipped_dir(e))
            .filter_map(|e| e.ok())
        {
            let file = entry.path();
            if entry.file_type().is_file() && file.extension().is_some_and(|ext| ext == EXTENSION) {
                trace!(file = %file.display(), "found source file");
                files.push(relative_to(root, file));
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn relative_to(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}
