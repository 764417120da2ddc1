use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::types::ScanStats;

use super::ignore_dirs_contains;

/// Every regular file under `root` accepted by `accept`, sorted by path.
///
/// Symlinks are never followed. Walk errors are counted in `stats` and the
/// walk continues.
pub(crate) fn collect_files<F>(
    root: &Path,
    exclude_dirs: &HashSet<String>,
    respect_gitignore: bool,
    stats: &mut ScanStats,
    accept: F,
) -> Vec<PathBuf>
where
    F: Fn(&Path) -> bool,
{
    let exclude_dirs = exclude_dirs.clone();
    let is_git_repo = root.join(".git").exists();

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false)
        .follow_links(false)
        .ignore(false)
        .git_ignore(respect_gitignore)
        .git_global(respect_gitignore && is_git_repo)
        .git_exclude(respect_gitignore && is_git_repo)
        .parents(false)
        .require_git(false);

    let walker = builder
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            if entry.path_is_symlink() {
                return false;
            }
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            if !is_dir {
                return true;
            }
            !entry
                .file_name()
                .to_str()
                .is_some_and(|name| ignore_dirs_contains(&exclude_dirs, name))
        })
        .build();

    let mut files = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                match err.io_error().map(io::Error::kind) {
                    Some(io::ErrorKind::NotFound) => {
                        stats.skipped_not_found = stats.skipped_not_found.saturating_add(1);
                    }
                    Some(io::ErrorKind::PermissionDenied) => {
                        stats.skipped_permission_denied =
                            stats.skipped_permission_denied.saturating_add(1);
                    }
                    _ => {
                        stats.skipped_walk_errors = stats.skipped_walk_errors.saturating_add(1);
                    }
                }
                continue;
            }
        };

        if entry.depth() == 0 {
            continue;
        }
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = entry.into_path();
        if !accept(&path) {
            continue;
        }
        stats.candidate_files = stats.candidate_files.saturating_add(1);
        files.push(path);
    }

    // Walk order depends on the filesystem; reports must not.
    files.sort();
    files
}
