//! Data models for labelkit-ingest

pub mod ingestion_result;

pub use ingestion_result::{IngestionResult, IngestionSummary};
