//! Error types for labelkit-ingest
//!
//! Every variant here is fatal to the ingestion call that raised it: there is
//! no partial-success mode. Duplicate labels are not errors; they are recorded
//! in the duplicate maps of [`crate::IngestionResult`].

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Ingestion error type
#[derive(Debug, Error)]
pub enum IngestError {
    /// File extension is not one of the supported corpus formats
    #[error(
        "{} has invalid extension - only lu, qna, json, tsv, txt and blu files are supported",
        path.display()
    )]
    UnsupportedFormat { path: PathBuf },

    /// Required field missing or structurally invalid
    #[error("Malformed record: {context}")]
    MalformedRecord { context: String },

    /// Underlying parser or schema decoder failed on a file
    #[error("Failed to parse {}: {message}", path.display())]
    ParseFailure { path: PathBuf, message: String },

    /// External label resolver failed
    #[error("Label resolver error: {0}")]
    Resolver(String),

    /// Folder traversal failed
    #[error("Scan error: {0}")]
    Scan(#[from] crate::services::ScanError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// labelkit-common error
    #[error("Common error: {0}")]
    Common(#[from] labelkit_common::Error),
}

impl IngestError {
    /// Malformed record with the offending record's context
    pub fn malformed(context: impl Into<String>) -> Self {
        IngestError::MalformedRecord {
            context: context.into(),
        }
    }

    /// Parse failure for `path`
    pub fn parse_failure(path: &Path, message: impl Into<String>) -> Self {
        IngestError::ParseFailure {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Attach the originating file to an error raised while processing it
    ///
    /// Format and record errors already carry their own context and pass
    /// through unchanged; everything else becomes a [`IngestError::ParseFailure`].
    pub fn in_file(self, path: &Path) -> Self {
        match self {
            IngestError::UnsupportedFormat { .. }
            | IngestError::MalformedRecord { .. }
            | IngestError::ParseFailure { .. } => self,
            other => IngestError::parse_failure(path, other.to_string()),
        }
    }
}

/// Result type for ingestion operations
pub type IngestResult<T> = Result<T, IngestError>;
