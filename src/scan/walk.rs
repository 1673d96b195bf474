// src/scan/walk.rs
// =============================================================================
// This module walks a wiki checkout and collects its markdown pages.
//
// How it works:
// 1. Check that the root exists (a single .md file is fine too)
// 2. Let jwalk read the directory tree in parallel
// 3. Hidden directories are pruned before jwalk descends into them
// 4. Markdown files go into the results, unreadable entries are logged
// 5. Sort the results so every run visits pages in the same order
//
// Skipped:
// - hidden directories (.git, .github, ...)
// - symlinked directories (they could loop back on themselves)
// - directories we can't read (logged, not fatal)
//
// Rust concepts:
// - Iterator adapters: filter_map over the walker's Result items
// - Closures: process_read_dir gets a 'static closure run per directory
// - Path/PathBuf: borrowed and owned filesystem paths
// =============================================================================

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use tracing::{debug, warn};

use crate::error::{ArchivistError, Result};

// Collects every markdown file under `root`
//
// Parameters:
//   root: directory to walk (or a single markdown file)
//
// Returns: sorted paths of all *.md files
//
// Errors: only when `root` itself doesn't exist or can't be read
pub fn find_markdown_files(root: &Path) -> Result<Vec<PathBuf>> {
    let metadata = std::fs::metadata(root).map_err(|e| {
        ArchivistError::config(format!("workspace {} is not readable: {e}", root.display()))
    })?;

    if metadata.is_file() {
        return if is_markdown(root) {
            Ok(vec![root.to_path_buf()])
        } else {
            Err(ArchivistError::config(format!(
                "{} is not a markdown file",
                root.display()
            )))
        };
    }

    // jwalk reports an unreadable root as just another entry error
    std::fs::read_dir(root).map_err(|e| ArchivistError::io(root, e))?;

    let walker = WalkDir::new(root)
        .skip_hidden(false)
        .follow_links(false)
        .process_read_dir(|depth, _dir, _state, children| {
            // depth is None for the list holding the root itself, which may
            // have a dotted name (temp dirs do)
            if depth.is_none() {
                return;
            }
            children.retain(|child| match child {
                Ok(entry) if entry.file_type().is_dir() && is_hidden(entry.file_name()) => {
                    debug!(dir = %entry.path().display(), "skipping hidden directory");
                    false
                }
                _ => true,
            });
        });

    let mut results: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| {
            // A symlink only counts when it points at a regular file
            let file_type = entry.file_type();
            file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())
        })
        .map(|entry| entry.path())
        .filter(|path| is_markdown(path))
        .collect();

    results.sort();
    debug!(root = %root.display(), count = results.len(), "found markdown files");
    Ok(results)
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_str().is_some_and(|name| name.starts_with('.'))
}
