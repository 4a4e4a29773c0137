//! Format dispatch
//!
//! Picks the extractor for a file from its extension and, for tab-separated
//! and JSON files, from its content.

use crate::error::{IngestError, IngestResult};
use crate::extractors::{
    JsonExtractor, LuExtractor, QnaExtractor, SnapshotTsvExtractor, TsvExtractor, TsvLayout,
};
use crate::parsers::MarkupParsers;
use crate::types::{SourceDocument, SourceExtractor};
use std::path::Path;
use tracing::debug;

/// Corpus file format, by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// `.lu` markup
    Lu,
    /// `.qna` markup
    Qna,
    /// `.tsv` / `.txt` tables
    Tsv,
    /// `.blu` snapshot export
    SnapshotTsv,
    /// `.json` corpora
    Json,
    /// `.dispatch` routing files (recognized but not ingestible)
    Dispatch,
}

impl SourceFormat {
    /// Map a file extension (without the dot, any case)
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "lu" => Some(SourceFormat::Lu),
            "qna" => Some(SourceFormat::Qna),
            "tsv" | "txt" => Some(SourceFormat::Tsv),
            "blu" => Some(SourceFormat::SnapshotTsv),
            "json" => Some(SourceFormat::Json),
            "dispatch" => Some(SourceFormat::Dispatch),
            _ => None,
        }
    }

    /// Format of `path`
    ///
    /// # Errors
    /// `UnsupportedFormat` for unknown extensions and for `.dispatch` files.
    pub fn from_path(path: &Path) -> IngestResult<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .filter(|format| *format != SourceFormat::Dispatch)
            .ok_or_else(|| IngestError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
    }

    /// Whether files of this format are picked up when walking a folder
    ///
    /// Snapshot exports are only ingested when named explicitly.
    pub fn is_folder_candidate(self) -> bool {
        matches!(
            self,
            SourceFormat::Lu | SourceFormat::Qna | SourceFormat::Tsv | SourceFormat::Json
        )
    }
}

/// Whether a file found while walking a folder should be ingested
pub fn is_folder_candidate(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(SourceFormat::from_extension)
        .is_some_and(SourceFormat::is_folder_candidate)
}

/// Chooses the extractor for each source document
#[derive(Clone, Default)]
pub struct FormatDispatcher {
    parsers: MarkupParsers,
}

impl FormatDispatcher {
    pub fn new(parsers: MarkupParsers) -> Self {
        Self { parsers }
    }

    /// Select the extractor for `document`
    ///
    /// # Errors
    /// `UnsupportedFormat` for unknown extensions; `ParseFailure` for JSON
    /// that does not parse or matches no known shape.
    pub fn select(&self, document: &SourceDocument) -> IngestResult<Box<dyn SourceExtractor>> {
        let format = SourceFormat::from_path(&document.path)?;

        let extractor: Box<dyn SourceExtractor> = match format {
            SourceFormat::Lu => Box::new(LuExtractor::new(self.parsers.lu.clone())),
            SourceFormat::Qna => Box::new(QnaExtractor::new(self.parsers.qna.clone())),
            SourceFormat::SnapshotTsv => Box::new(SnapshotTsvExtractor),
            SourceFormat::Tsv => {
                let first_line = document.content.lines().next().unwrap_or_default();
                Box::new(TsvExtractor::new(TsvLayout::detect(first_line)))
            }
            SourceFormat::Json => Box::new(JsonExtractor::from_content(
                &document.path,
                &document.content,
            )?),
            SourceFormat::Dispatch => {
                return Err(IngestError::UnsupportedFormat {
                    path: document.path.clone(),
                })
            }
        };

        debug!(
            file = %document.path.display(),
            format = ?format,
            extractor = extractor.name(),
            "Selected extractor"
        );
        Ok(extractor)
    }
}
