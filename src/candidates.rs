//! Candidate enumeration: which source files get sent for generation.
//!
//! Traversal is sorted by file name so two runs over the same tree dispatch
//! files in the same order. Denylisted directories are pruned with their whole
//! subtree.

use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// One source file scheduled for generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub path: PathBuf,
    /// Path relative to the project root; the absolute path when the file
    /// does not live under the root.
    pub relative_path: PathBuf,
}

impl WorkItem {
    pub fn new(root: &Path, path: PathBuf) -> Self {
        let relative_path = match path.strip_prefix(root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => {
                warn!(
                    "Failed to get relative path for {}, using it as is",
                    path.display()
                );
                path.clone()
            }
        };
        Self {
            path,
            relative_path,
        }
    }
}

/// File selection rules.
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    /// Extension without the dot, e.g. `py`.
    pub extension: String,
    /// Directory names whose subtrees are skipped entirely.
    pub excluded_dirs: Vec<String>,
}

impl Default for CandidateFilter {
    fn default() -> Self {
        Self {
            extension: "py".to_string(),
            excluded_dirs: vec![
                "venv".to_string(),
                "migrations".to_string(),
                "__pycache__".to_string(),
            ],
        }
    }
}

impl CandidateFilter {
    fn is_excluded_dir(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.excluded_dirs.iter().any(|d| d == name))
    }

    /// Whether a file name is a source file to generate tests for.
    pub fn accepts(&self, file_name: &str) -> bool {
        let Some((stem, ext)) = file_name.rsplit_once('.') else {
            return false;
        };
        ext == self.extension && stem != "__init__" && !is_test_file(stem)
    }
}

fn is_test_file(stem: &str) -> bool {
    stem.starts_with("test_") || stem.ends_with("_test")
}

/// Lazily enumerate work items under `root`.
///
/// Unreadable entries are logged and skipped.
pub fn enumerate<'a>(
    root: &'a Path,
    filter: &'a CandidateFilter,
) -> impl Iterator<Item = WorkItem> + 'a {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| !filter.is_excluded_dir(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(move |entry| entry.file_name().to_str().is_some_and(|n| filter.accepts(n)))
        .map(move |entry| WorkItem::new(root, entry.into_path()))
}
