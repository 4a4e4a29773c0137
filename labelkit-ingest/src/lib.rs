//! labelkit-ingest: labelled-utterance corpus ingestion
//!
//! Reads training corpora in several encodings (`.lu` and `.qna` markup,
//! tab-separated tables, snapshot exports, JSON exports) and folds them into
//! one utterance-keyed [`IngestionResult`]. The [`snapshot`] module feeds that
//! result to an external label-resolution engine and writes the artifacts.
//!
//! ```rust,ignore
//! use labelkit_ingest::{ingest_inputs, MarkupParsers};
//!
//! let config = labelkit_common::config::LabelkitConfig::load(None)?;
//! let result = ingest_inputs("corpus/,extra.tsv", &config.ingest, MarkupParsers::default()).await?;
//! print!("{}", result.to_tsv());
//! ```

pub mod aggregator;
pub mod artifacts;
pub mod dispatch;
pub mod error;
pub mod extractors;
pub mod models;
pub mod parsers;
pub mod recognizer;
pub mod references;
pub mod services;
pub mod session;
pub mod snapshot;
pub mod source;
pub mod types;

pub use crate::aggregator::LabelAggregator;
pub use crate::dispatch::{FormatDispatcher, SourceFormat};
pub use crate::error::{IngestError, IngestResult};
pub use crate::models::{IngestionResult, IngestionSummary};
pub use crate::parsers::{LuParser, LuSource, MarkupParsers, QnaParser};
pub use crate::session::{ingest_inputs, IngestionSession};
pub use crate::snapshot::{
    BuildOutput, BuildRequest, LabelResolver, LabelResolverFactory, ResolverOptions,
    SnapshotOrchestrator,
};
