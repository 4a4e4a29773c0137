//! # labelkit common library
//!
//! Shared code for the labelkit crates:
//! - Error and result types
//! - Configuration loading (TOML + environment)
//! - Tracing initialisation
//! - Label data types (intent/entity labels, label sets, scores)

pub mod config;
pub mod error;
pub mod labels;
pub mod logging;

pub use error::{Error, Result};
pub use labels::{Label, LabelSet, LabelType, ScoredLabel};
