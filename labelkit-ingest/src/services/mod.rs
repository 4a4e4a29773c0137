//! Service modules for corpus ingestion

pub mod corpus_scanner;

pub use corpus_scanner::{CorpusScanner, ScanError};
