//! Corpus folder scanner
//!
//! Recursive discovery of ingestible files below a folder root. Entries are
//! visited in file-name order so that repeated runs over the same tree fold
//! records in the same order.

use crate::dispatch::is_folder_candidate;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Corpus scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Directory entry could not be read
    #[error("Error walking {}: {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Corpus folder scanner
#[derive(Debug, Clone, Default)]
pub struct CorpusScanner {
    max_depth: Option<usize>,
}

impl CorpusScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit how deep below the root the scan descends
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// List ingestible files below `root`, sorted by path
    ///
    /// Symlinks are followed. Files with extensions that are not picked up
    /// from folders (snapshots, unknown types) are skipped silently.
    ///
    /// # Errors
    /// Any unreadable entry aborts the scan.
    pub fn scan(&self, root: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if !root.exists() {
            return Err(ScanError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let walker = WalkDir::new(root)
            .follow_links(true)
            .max_depth(self.max_depth.unwrap_or(usize::MAX))
            .sort_by_file_name();

        let mut files = Vec::new();
        let mut skipped = 0usize;
        for entry in walker {
            let entry = entry.map_err(|source| ScanError::Walk {
                root: root.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if is_folder_candidate(entry.path()) {
                files.push(entry.into_path());
            } else {
                skipped += 1;
            }
        }

        tracing::debug!(
            root = %root.display(),
            files = files.len(),
            skipped,
            "Corpus scan complete"
        );
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_is_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.lu"), "").unwrap();
        fs::write(dir.path().join("a.tsv"), "").unwrap();
        fs::write(dir.path().join("nested/c.json"), "[]").unwrap();
        fs::write(dir.path().join("model.blu"), "").unwrap();
        fs::write(dir.path().join("notes.md"), "").unwrap();

        let files = CorpusScanner::new().scan(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| {
                p.strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();

        assert_eq!(names, vec!["a.tsv", "b.lu", "nested/c.json"]);
    }

    #[test]
    fn test_scan_missing_root() {
        let dir = TempDir::new().unwrap();
        let result = CorpusScanner::new().scan(&dir.path().join("absent"));
        assert!(matches!(result, Err(ScanError::PathNotFound(_))));
    }

    #[test]
    fn test_scan_rejects_file_root() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.lu");
        fs::write(&file, "").unwrap();
        assert!(matches!(
            CorpusScanner::new().scan(&file),
            Err(ScanError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_scan_respects_max_depth() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("one/two")).unwrap();
        fs::write(dir.path().join("top.lu"), "").unwrap();
        fs::write(dir.path().join("one/mid.lu"), "").unwrap();
        fs::write(dir.path().join("one/two/deep.lu"), "").unwrap();

        let files = CorpusScanner::new().with_max_depth(2).scan(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("one/mid.lu"), dir.path().join("top.lu")]
        );
    }
}
