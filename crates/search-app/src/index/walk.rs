//! Tree walking and filtering.
//!
//! Denied directories are never descended into (`filter_entry` prunes
//! the subtree before `walkdir` recurses) rather than filtered out after
//! the fact — cheaper for large vendored trees.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

const DENYLIST_DIRS: &[&str] = &[
    "vendor",
    ".git",
    ".terraform",
    "node_modules",
    "target",
    "build",
    "dist",
    "out",
    "bin",
    "obj",
    ".venv",
    "venv",
    "__pycache__",
    ".pytest_cache",
    ".gradle",
    ".m2",
    ".idea",
    "coverage",
    ".cache",
];

const NOISE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "pdf", "webp", "lock", "zip", "svg", "exe", "dll", "xml", "sum",
    "mod", "sql",
];

fn is_denied_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| DENYLIST_DIRS.iter().any(|d| d.eq_ignore_ascii_case(name)))
            .unwrap_or(false)
}

fn is_noise_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| NOISE_EXTENSIONS.iter().any(|n| n.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// A file discovered by [`walk`], with both its absolute path (for
/// reading) and a repo-relative, forward-slashed path (for storage).
#[derive(Debug, Clone)]
pub struct WalkedFile {
    pub abs_path: PathBuf,
    pub rel_path: String,
}

/// Walk `root`, following symlinks, skipping denylisted directories and
/// binary/noise file extensions. Non-file entries (directories, FIFOs,
/// unreadable entries) are silently skipped.
pub fn walk(root: &Path) -> Vec<WalkedFile> {
    WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| !is_denied_dir(e))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| !is_noise_extension(entry.path()))
        .filter_map(|entry| {
            let rel = entry.path().strip_prefix(root).ok()?;
            let rel_path = rel.to_str()?.replace(std::path::MAIN_SEPARATOR, "/");
            Some(WalkedFile {
                abs_path: entry.into_path(),
                rel_path,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn skips_denylisted_directories_and_noise_extensions() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules/pkg.js"), "noise").unwrap();
        fs::write(dir.path().join("main.go"), "package main\n").unwrap();
        fs::write(dir.path().join("logo.png"), "binary").unwrap();

        let files = walk(dir.path());
        let rel_paths: Vec<&str> = files.iter().map(|f| f.rel_path.as_str()).collect();
        assert_eq!(rel_paths, vec!["main.go"]);
    }

    #[test]
    fn rel_path_uses_forward_slashes() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("a/b/c.go"), "package main\n").unwrap();

        let files = walk(dir.path());
        assert_eq!(files[0].rel_path, "a/b/c.go");
    }
}
