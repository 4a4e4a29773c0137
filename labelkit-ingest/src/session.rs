//! Ingestion session
//!
//! One session owns the processed-file set and the label aggregate for a
//! single ingestion call. Inputs are processed sequentially; the first error
//! aborts the session and no partial result is returned.
//!
//! # Phases
//! 1. Split the comma-separated input list into roots
//! 2. Folder roots are scanned (sorted, recursive); file roots are taken as-is
//! 3. Each file: format check, processed-set check, read, select extractor,
//!    extract, fold into the aggregate

use crate::aggregator::LabelAggregator;
use crate::dispatch::{FormatDispatcher, SourceFormat};
use crate::error::{IngestError, IngestResult};
use crate::models::IngestionResult;
use crate::parsers::MarkupParsers;
use crate::references::{ProcessedFiles, ReferenceResolver};
use crate::services::{CorpusScanner, ScanError};
use crate::source::read_source_text;
use crate::types::{RoutingPolicy, SourceDocument};
use chrono::{DateTime, Utc};
use labelkit_common::config::IngestConfig;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

/// Single-use ingestion session
pub struct IngestionSession {
    session_id: Uuid,
    started_at: DateTime<Utc>,
    config: IngestConfig,
    dispatcher: FormatDispatcher,
    scanner: CorpusScanner,
    processed: ProcessedFiles,
    aggregator: LabelAggregator,
    files_ingested: usize,
}

impl IngestionSession {
    pub fn new(config: IngestConfig, parsers: MarkupParsers) -> Self {
        let session_id = Uuid::new_v4();
        debug!(session_id = %session_id, "Created ingestion session");

        Self {
            session_id,
            started_at: Utc::now(),
            aggregator: LabelAggregator::with_max_entity_depth(config.max_entity_depth),
            config,
            dispatcher: FormatDispatcher::new(parsers),
            scanner: CorpusScanner::new(),
            processed: ProcessedFiles::new(),
            files_ingested: 0,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Files ingested so far (reference targets not included)
    pub fn files_ingested(&self) -> usize {
        self.files_ingested
    }

    /// Ingest a comma-separated list of files and folders
    ///
    /// With `hierarchical` set, every label from a file is replaced by the
    /// file's stem (for formats whose labels follow routing).
    pub async fn ingest(&mut self, inputs: &str, hierarchical: bool) -> IngestResult<()> {
        let roots: Vec<&str> = inputs
            .split(',')
            .map(str::trim)
            .filter(|root| !root.is_empty())
            .collect();

        info!(
            session_id = %self.session_id,
            roots = roots.len(),
            hierarchical,
            "Starting ingestion"
        );

        for root in roots {
            let path = Path::new(root);
            let metadata = tokio::fs::metadata(path)
                .await
                .map_err(|_| IngestError::from(ScanError::PathNotFound(path.to_path_buf())))?;

            if metadata.is_dir() {
                self.ingest_folder(path, hierarchical).await?;
            } else {
                let routing_name = if hierarchical { file_stem(path) } else { String::new() };
                self.ingest_file(path, &routing_name).await?;
            }
        }

        Ok(())
    }

    /// Ingest every eligible file below `dir`
    pub async fn ingest_folder(&mut self, dir: &Path, hierarchical: bool) -> IngestResult<()> {
        let files = self.scanner.scan(dir)?;
        debug!(
            session_id = %self.session_id,
            folder = %dir.display(),
            files = files.len(),
            "Ingesting folder"
        );

        for file in files {
            let routing_name = if hierarchical { file_stem(&file) } else { String::new() };
            self.ingest_file(&file, &routing_name).await?;
        }
        Ok(())
    }

    /// Ingest one file, replacing its labels with `routing_name` when set
    ///
    /// Files already ingested in this session (directly or as a reference
    /// target) and the build settings file are skipped.
    pub async fn ingest_file(&mut self, path: &Path, routing_name: &str) -> IngestResult<()> {
        SourceFormat::from_path(path)?;

        if self.is_settings_file(path) {
            debug!(file = %path.display(), "Skipping build settings file");
            return Ok(());
        }
        if !self.processed.mark(path) {
            debug!(file = %path.display(), "File already ingested in this session, skipping");
            return Ok(());
        }

        self.ingest_unmarked(path, routing_name)
            .await
            .map_err(|e| e.in_file(path))
    }

    async fn ingest_unmarked(&mut self, path: &Path, routing_name: &str) -> IngestResult<()> {
        let content = read_source_text(path).await?;
        let document = SourceDocument::new(path, content);
        let extractor = self.dispatcher.select(&document)?;

        let records = {
            let mut references = ReferenceResolver::new(&mut self.processed);
            extractor.extract(&document, &mut references).await?
        };

        let label_override = match extractor.routing() {
            RoutingPolicy::ApplyOverride => routing_name,
            RoutingPolicy::Ignore => "",
        };

        let record_count = records.len();
        for record in records {
            self.aggregator.fold(record, label_override)?;
        }
        self.files_ingested += 1;

        info!(
            session_id = %self.session_id,
            file = %path.display(),
            extractor = extractor.name(),
            records = record_count,
            routing = label_override,
            "Ingested file"
        );
        Ok(())
    }

    fn is_settings_file(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.eq_ignore_ascii_case(&self.config.settings_file_name))
    }

    /// Aggregate collected so far
    pub fn result(&self) -> &IngestionResult {
        self.aggregator.result()
    }

    /// Close the session and hand over the aggregate
    pub fn finish(self) -> IngestionResult {
        let result = self.aggregator.into_result();
        let summary = result.summary();
        let elapsed_ms = (Utc::now() - self.started_at).num_milliseconds();

        info!(
            session_id = %self.session_id,
            files = self.files_ingested,
            utterances = summary.utterances,
            labels = summary.distinct_labels,
            multi_label_utterances = summary.multi_label_utterances,
            entity_labels = summary.entity_labels,
            elapsed_ms,
            "Ingestion complete"
        );
        result
    }
}

/// Ingest `inputs` in a fresh session using `config.hierarchical`
pub async fn ingest_inputs(
    inputs: &str,
    config: &IngestConfig,
    parsers: MarkupParsers,
) -> IngestResult<IngestionResult> {
    let mut session = IngestionSession::new(config.clone(), parsers);
    session.ingest(inputs, config.hierarchical).await?;
    Ok(session.finish())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn session() -> IngestionSession {
        IngestionSession::new(IngestConfig::default(), MarkupParsers::default())
    }

    #[tokio::test]
    async fn test_single_tsv_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("greetings.tsv");
        fs::write(&file, "Greeting\thello\nGreeting\thi\n").unwrap();

        let mut session = session();
        session
            .ingest(file.to_str().unwrap(), false)
            .await
            .unwrap();

        assert_eq!(session.files_ingested(), 1);
        let result = session.finish();
        assert_eq!(result.utterance_labels.len(), 2);
    }

    #[tokio::test]
    async fn test_same_file_twice_is_ingested_once() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.tsv");
        fs::write(&file, "Greeting\thello\n").unwrap();
        let input = format!("{0}, {0} ,", file.display());

        let mut session = session();
        session.ingest(&input, false).await.unwrap();
        assert_eq!(session.files_ingested(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_extension_aborts() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("notes.md");
        fs::write(&file, "# notes").unwrap();

        let mut session = session();
        let err = session
            .ingest(file.to_str().unwrap(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat { .. }));
    }

    #[tokio::test]
    async fn test_missing_root_aborts() {
        let dir = TempDir::new().unwrap();
        let mut session = session();
        let err = session
            .ingest(dir.path().join("absent.tsv").to_str().unwrap(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Scan(ScanError::PathNotFound(_))));
    }

    #[tokio::test]
    async fn test_settings_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("orchestratorsettings.json"),
            r#"{"modelFolder": "model"}"#,
        )
        .unwrap();
        fs::write(dir.path().join("a.json"), r#"[{"text": "hi", "intents": ["Greeting"]}]"#)
            .unwrap();

        let mut session = session();
        session
            .ingest(dir.path().to_str().unwrap(), false)
            .await
            .unwrap();
        assert_eq!(session.files_ingested(), 1);
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem(Path::new("/corpus/weather.en-us.lu")), "weather.en-us");
        assert_eq!(file_stem(Path::new("/corpus/travel.json")), "travel");
    }
}
