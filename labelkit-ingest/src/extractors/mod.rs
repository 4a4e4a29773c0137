//! Per-format source extractors
//!
//! Each extractor turns one [`crate::types::SourceDocument`] into the common
//! [`crate::types::ExtractedRecord`] list. Which extractor handles a file is
//! decided by [`crate::dispatch::FormatDispatcher`].
//!
//! # Extractors
//! 1. **lu** - `.lu` markup through an external [`crate::parsers::LuParser`]
//! 2. **qna** - `.qna` markup through an external [`crate::parsers::QnaParser`]
//! 3. **tsv** - tab-separated tables (plain, Q&A and `.blu` snapshot layouts)
//! 4. **json** - LUIS app, snapshot export, scored, labeled and flat JSON
//!
//! Extractors never touch the aggregate; the session folds their output.

pub mod json;
pub mod lu;
pub mod qna;
pub mod tsv;

pub use json::{JsonExtractor, JsonVariant};
pub use lu::LuExtractor;
pub use qna::QnaExtractor;
pub use tsv::{SnapshotTsvExtractor, TsvExtractor, TsvLayout};

/// Collapse runs of whitespace and commas into single spaces, then trim
///
/// Q&A answers become intent labels, and labels are comma-separated in the
/// tab-separated exports, so commas cannot survive.
pub fn clean_label_text(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    let mut in_separator_run = false;

    for ch in text.chars() {
        if ch.is_whitespace() || ch == ',' {
            in_separator_run = true;
            continue;
        }
        if in_separator_run && !cleaned.is_empty() {
            cleaned.push(' ');
        }
        in_separator_run = false;
        cleaned.push(ch);
    }

    cleaned
}
