//! Processed-file tracking and cross-file reference resolution
//!
//! A markup corpus may pull in sibling files by relative path. Those files can
//! also be inputs in their own right (directly, or found while walking a
//! folder), so the session keeps one [`ProcessedFiles`] set and every path
//! that gets parsed, as a root input or as a reference target, is recorded
//! in it. A file is parsed at most once per session.

use crate::error::{IngestError, IngestResult};
use crate::parsers::LuSource;
use crate::source::read_source_text;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Session-scoped set of absolute paths already ingested
#[derive(Debug, Default)]
pub struct ProcessedFiles {
    paths: HashSet<PathBuf>,
}

impl ProcessedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `path` has been ingested in this session
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(&normalize_path(path))
    }

    /// Record `path`, returning `false` if it was already recorded
    pub fn mark(&mut self, path: &Path) -> bool {
        self.paths.insert(normalize_path(path))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Absolute, lexically normalized form of `path` (`.` and `..` removed)
///
/// Symlinks are not resolved.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Reference resolution callback handed to markup parsers
///
/// Reads referenced files relative to the referencing source and records them
/// in the session's processed set. Targets that were already ingested are
/// not returned again.
pub struct ReferenceResolver<'a> {
    processed: &'a mut ProcessedFiles,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(processed: &'a mut ProcessedFiles) -> Self {
        Self { processed }
    }

    /// Resolve `references` made from the source identified by `source_id`
    ///
    /// # Errors
    /// `ParseFailure` when a referenced file is missing, empty or unreadable.
    pub async fn resolve(
        &mut self,
        source_id: &str,
        references: &[String],
    ) -> IngestResult<Vec<LuSource>> {
        let base_dir = Path::new(source_id)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut resolved = Vec::new();
        for reference in references {
            let reference_path = Path::new(reference);
            let target = if reference_path.is_absolute() {
                normalize_path(reference_path)
            } else {
                normalize_path(&base_dir.join(reference_path))
            };

            if self.processed.contains(&target) {
                tracing::debug!(
                    source = source_id,
                    target = %target.display(),
                    "Reference already ingested in this session, skipping"
                );
                continue;
            }

            let content = match read_source_text(&target).await {
                Ok(content) => content,
                Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
                Err(e) => {
                    return Err(IngestError::parse_failure(
                        &target,
                        format!("Failed to read {}: {}", target.display(), e),
                    ))
                }
            };
            if content.is_empty() {
                return Err(IngestError::parse_failure(
                    &target,
                    format!("Content not found for {}", target.display()),
                ));
            }

            self.processed.mark(&target);
            tracing::debug!(
                source = source_id,
                target = %target.display(),
                "Resolved cross-file reference"
            );
            resolved.push(LuSource {
                id: target.to_string_lossy().into_owned(),
                content,
            });
        }

        Ok(resolved)
    }

    /// Whether `path` has already been ingested in this session
    pub fn is_processed(&self, path: &Path) -> bool {
        self.processed.contains(path)
    }
}
