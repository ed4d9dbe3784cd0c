//! Home-directory walk that finds projects carrying `.claude/agents`.

use crate::paths::{AGENTS_SUBDIR, CLAUDE_DIR};
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const DEFAULT_DISCOVERY_DEPTH: usize = 12;

/// Directory names never descended into.
const SKIP_DIR_NAMES: &[&str] = &[".Trash", "node_modules", ".git", ".cache", ".npm"];

/// Folders macOS guards behind privacy prompts; walking them triggers a
/// permission dialog per folder.
#[cfg(target_os = "macos")]
pub fn protected_dirs(home: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = [
        "Applications",
        "Desktop",
        "Documents",
        "Downloads",
        "Movies",
        "Music",
        "Pictures",
        "Public",
        "Library",
    ]
    .iter()
    .map(|d| home.join(d))
    .collect();
    let library = home.join("Library");
    dirs.push(library.join("Mobile Documents"));
    dirs.push(library.join("CloudStorage"));
    dirs.push(library.join("Containers"));
    dirs
}

#[cfg(not(target_os = "macos"))]
pub fn protected_dirs(_home: &Path) -> Vec<PathBuf> {
    Vec::new()
}

/// Walk `home` up to `depth` levels and return every directory that contains
/// `.claude/agents`, excluding `home` itself. Sorted and de-duplicated.
///
/// Unreadable directories are skipped; the walk never fails as a whole.
pub fn scan_project_directories(home: &Path, depth: usize, include_protected: bool) -> Vec<String> {
    let depth = depth.max(1);
    let protected = if include_protected {
        Vec::new()
    } else {
        protected_dirs(home)
    };
    let global_claude_dir = home.join(CLAUDE_DIR);

    let walker = WalkDir::new(home)
        .max_depth(depth)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            let path = entry.path();
            if protected.iter().any(|p| path.starts_with(p)) {
                return false;
            }
            !entry
                .file_name()
                .to_str()
                .is_some_and(|name| SKIP_DIR_NAMES.contains(&name))
        });

    let mut directories = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let quiet = err.io_error().is_some_and(|e| {
                    matches!(e.kind(), ErrorKind::PermissionDenied | ErrorKind::TimedOut)
                });
                if !quiet {
                    tracing::warn!(error = %err, "skipping directory during discovery");
                }
                continue;
            }
        };

        if !entry.file_type().is_dir() || entry.file_name() != OsStr::new(CLAUDE_DIR) {
            continue;
        }
        if entry.path() == global_claude_dir || !entry.path().join(AGENTS_SUBDIR).exists() {
            continue;
        }
        if let Some(project_root) = entry.path().parent() {
            directories.push(project_root.to_string_lossy().into_owned());
        }
    }

    directories.sort();
    directories.dedup();
    tracing::debug!(count = directories.len(), depth, "project discovery finished");
    directories
}
