//! Tab-separated extractors
//!
//! Three layouts share this module:
//! - plain `labels<TAB>utterance` tables, with or without a header row
//! - Q&A tables (`Question<TAB>Answer` header), answer used as the label
//! - `.blu` snapshot exports, whose first line is always a header
//!
//! Plain and snapshot tables carry their labels literally; the routing name
//! of a hierarchical ingestion does not apply to them.

use super::clean_label_text;
use crate::error::IngestResult;
use crate::references::ReferenceResolver;
use crate::types::{
    ExtractedRecord, LabeledExample, RoutingPolicy, SourceDocument, SourceExtractor,
};
use async_trait::async_trait;
use tracing::debug;

/// Layout of a tab-separated file, decided from its first line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsvLayout {
    /// `Question<TAB>Answer` table
    QnaTable,
    /// Label table whose first line is a `Label`/`Text` (or `Utterance`) header
    LabeledWithHeader,
    /// Label table without a header
    Headerless,
}

impl TsvLayout {
    /// Inspect the first line of a table
    ///
    /// Header keywords are case-sensitive, and the second keyword must not
    /// start the line.
    pub fn detect(first_line: &str) -> Self {
        if first_line.contains("Question") && keyword_after_start(first_line, "Answer") {
            TsvLayout::QnaTable
        } else if first_line.contains("Label")
            && (keyword_after_start(first_line, "Text")
                || keyword_after_start(first_line, "Utterance"))
        {
            TsvLayout::LabeledWithHeader
        } else {
            TsvLayout::Headerless
        }
    }
}

fn keyword_after_start(line: &str, keyword: &str) -> bool {
    matches!(line.find(keyword), Some(index) if index > 0)
}

/// Plain or Q&A table extractor
pub struct TsvExtractor {
    layout: TsvLayout,
}

impl TsvExtractor {
    pub fn new(layout: TsvLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> TsvLayout {
        self.layout
    }
}

#[async_trait]
impl SourceExtractor for TsvExtractor {
    fn name(&self) -> &'static str {
        match self.layout {
            TsvLayout::QnaTable => "qna-tsv",
            _ => "tsv",
        }
    }

    fn routing(&self) -> RoutingPolicy {
        match self.layout {
            TsvLayout::QnaTable => RoutingPolicy::ApplyOverride,
            _ => RoutingPolicy::Ignore,
        }
    }

    async fn extract(
        &self,
        document: &SourceDocument,
        _references: &mut ReferenceResolver<'_>,
    ) -> IngestResult<Vec<ExtractedRecord>> {
        let mut lines = document.content.split('\n');
        let records = match self.layout {
            TsvLayout::QnaTable => {
                lines.next();
                question_answer_records(lines)
            }
            TsvLayout::LabeledWithHeader => {
                lines.next();
                label_utterance_records(lines, true)
            }
            TsvLayout::Headerless => label_utterance_records(lines, true),
        };

        debug!(
            file = %document.path.display(),
            layout = ?self.layout,
            records = records.len(),
            "Extracted tab-separated records"
        );
        Ok(records)
    }
}

/// `.blu` snapshot export extractor
pub struct SnapshotTsvExtractor;

#[async_trait]
impl SourceExtractor for SnapshotTsvExtractor {
    fn name(&self) -> &'static str {
        "blu"
    }

    fn routing(&self) -> RoutingPolicy {
        RoutingPolicy::Ignore
    }

    async fn extract(
        &self,
        document: &SourceDocument,
        _references: &mut ReferenceResolver<'_>,
    ) -> IngestResult<Vec<ExtractedRecord>> {
        let lines: Vec<&str> = document.content.split('\n').collect();
        if lines.len() <= 1 {
            return Ok(Vec::new());
        }

        let records = label_utterance_records(lines.into_iter().skip(1), false);
        debug!(
            file = %document.path.display(),
            records = records.len(),
            "Extracted snapshot records"
        );
        Ok(records)
    }
}

/// Rows of `labels<TAB>utterance`
///
/// `labels` is comma-separated. With `three_column_utterance_last` set, a
/// three-column row keeps its utterance in the third column (the middle one
/// is reserved by the exporter); otherwise the utterance is always column 2.
fn label_utterance_records<'a>(
    lines: impl Iterator<Item = &'a str>,
    three_column_utterance_last: bool,
) -> Vec<ExtractedRecord> {
    let mut records = Vec::new();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let items: Vec<&str> = line.split('\t').collect();
        if items.len() < 2 {
            debug!(line, "Skipping row with fewer than two columns");
            continue;
        }

        let utterance_index = if three_column_utterance_last && items.len() == 3 {
            2
        } else {
            1
        };
        let utterance = items[utterance_index].trim();

        let intents: Vec<String> = items[0]
            .split(',')
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(str::to_string)
            .collect();
        if intents.is_empty() {
            continue;
        }

        records.push(ExtractedRecord::Labeled(LabeledExample {
            utterance: utterance.to_string(),
            intents,
            entities: Vec::new(),
        }));
    }

    records
}

/// Rows of `question<TAB>answer`
fn question_answer_records<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<ExtractedRecord> {
    let mut records = Vec::new();

    for line in lines {
        let items: Vec<&str> = line.split('\t').collect();
        if items.len() < 2 {
            continue;
        }

        let question = items[0].trim();
        let answer = clean_label_text(items[1]);
        records.push(ExtractedRecord::Labeled(
            LabeledExample::new(question).with_intent(answer),
        ));
    }

    records
}
