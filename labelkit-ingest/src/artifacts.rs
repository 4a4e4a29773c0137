//! Build artifact I/O
//!
//! Snapshot and descriptor files on disk, and the loaders that read them (and
//! markup corpora) back for incremental builds.

use crate::error::IngestResult;
use crate::parsers::LuSource;
use crate::snapshot::BuildOutput;
use crate::source::read_source_text;
use labelkit_common::config::SnapshotConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Base name to snapshot path, as referenced from recognizer documents
/// (`=settings.orchestrator.snapshots.<base>`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSettings {
    pub snapshots: BTreeMap<String, String>,
}

/// Where the snapshot built from `input` is written
///
/// When `out` is a directory the file name is derived: the configured default
/// name for a folder input, `<input stem>.<ext>` for a file input. Otherwise
/// `out` is used as given.
pub fn snapshot_file_path(out: &Path, input: &Path, config: &SnapshotConfig) -> PathBuf {
    if !out.is_dir() {
        return out.to_path_buf();
    }
    if input.is_dir() {
        return out.join(&config.default_file_name);
    }

    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    out.join(format!("{}.{}", stem, config.extension))
}

/// Write every build output into `dir` and record its snapshot path
///
/// Writes `<base>.<ext>`, plus `<base>.lu.dialog` and `<base>.en-us.lu.dialog`
/// when descriptors were built.
pub async fn write_build_outputs(
    dir: &Path,
    outputs: &[BuildOutput],
    settings: &mut SnapshotSettings,
    config: &SnapshotConfig,
) -> IngestResult<()> {
    tokio::fs::create_dir_all(dir).await?;

    for output in outputs {
        let snapshot_file = dir.join(format!("{}.{}", output.id, config.extension));
        tokio::fs::write(&snapshot_file, &output.snapshot).await?;
        debug!(file = %snapshot_file.display(), "Snapshot written");

        if let Some(documents) = &output.recognizer {
            let recognizer_file = dir.join(format!("{}.lu.dialog", output.id));
            let json = serde_json::to_string_pretty(&documents.recognizer)?;
            tokio::fs::write(&recognizer_file, json).await?;

            let multi_language_file = dir.join(format!("{}.en-us.lu.dialog", output.id));
            let json = serde_json::to_string_pretty(&documents.multi_language)?;
            tokio::fs::write(&multi_language_file, json).await?;
            debug!(base_name = %output.id, "Recognizer documents written");
        }

        settings.snapshots.insert(
            output.id.clone(),
            snapshot_file.to_string_lossy().replace('\\', "/"),
        );
    }

    info!(dir = %dir.display(), outputs = outputs.len(), "Build outputs written");
    Ok(())
}

/// Snapshot bytes at `path`, empty when the path is missing or a directory
pub async fn read_snapshot(path: &Path) -> IngestResult<Vec<u8>> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => Ok(tokio::fs::read(path).await?),
        _ => Ok(Vec::new()),
    }
}

/// Every snapshot below `path`, keyed by file stem
///
/// A later file with the same stem replaces an earlier one (paths visited in
/// sorted order).
pub async fn load_snapshots(
    path: &Path,
    config: &SnapshotConfig,
) -> IngestResult<BTreeMap<String, Vec<u8>>> {
    let mut snapshots = BTreeMap::new();
    for file in files_with_extension(path, &config.extension)? {
        let stem = stem_of(&file);
        snapshots.insert(stem, read_snapshot(&file).await?);
    }
    debug!(path = %path.display(), snapshots = snapshots.len(), "Loaded snapshots");
    Ok(snapshots)
}

/// Every non-empty `.lu` corpus below `path`, identified by file stem
pub async fn collect_corpus_sources(path: &Path) -> IngestResult<Vec<LuSource>> {
    let mut sources = Vec::new();
    for file in files_with_extension(path, "lu")? {
        let content = read_source_text(&file).await?;
        if content.is_empty() {
            debug!(file = %file.display(), "Skipping empty corpus");
            continue;
        }
        sources.push(LuSource::new(stem_of(&file), content));
    }
    Ok(sources)
}

fn files_with_extension(root: &Path, extension: &str) -> IngestResult<Vec<PathBuf>> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let matches = entry
            .path()
            .extension()
            .is_some_and(|ext| ext == extension);
        if entry.file_type().is_file() && matches {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
