//! `.qna` markup extractor
//!
//! Every question of a Q&A pair becomes an utterance labelled with the
//! cleaned answer text.

use super::clean_label_text;
use super::lu::parser_error;
use crate::error::IngestResult;
use crate::parsers::{LuSource, QnaParser};
use crate::references::ReferenceResolver;
use crate::types::{ExtractedRecord, LabeledExample, SourceDocument, SourceExtractor};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Q&A corpus extractor
pub struct QnaExtractor {
    parser: Arc<dyn QnaParser>,
}

impl QnaExtractor {
    pub fn new(parser: Arc<dyn QnaParser>) -> Self {
        Self { parser }
    }
}

#[async_trait]
impl SourceExtractor for QnaExtractor {
    fn name(&self) -> &'static str {
        "qna"
    }

    async fn extract(
        &self,
        document: &SourceDocument,
        _references: &mut ReferenceResolver<'_>,
    ) -> IngestResult<Vec<ExtractedRecord>> {
        if document.content.trim().is_empty() {
            debug!(file = %document.path.display(), "Empty Q&A corpus");
            return Ok(Vec::new());
        }

        let source = LuSource::new(document.id(), document.content.clone());
        let parsed = self
            .parser
            .parse(&source)
            .await
            .map_err(|e| parser_error(&document.path, e))?;

        let mut records = Vec::new();
        for pair in &parsed.qna_list {
            // A missing answer yields an empty label; the aggregator rejects it
            // unless a routing name replaces it.
            let answer = clean_label_text(pair.answer.as_deref().unwrap_or_default());
            for question in &pair.questions {
                records.push(ExtractedRecord::Labeled(
                    LabeledExample::new(question.trim()).with_intent(answer.clone()),
                ));
            }
        }

        debug!(
            file = %document.path.display(),
            pairs = parsed.qna_list.len(),
            records = records.len(),
            "Extracted Q&A pairs"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::mock::FixedQnaParser;
    use crate::parsers::{QnaDocument, QnaPair};
    use crate::references::ProcessedFiles;

    #[tokio::test]
    async fn test_each_question_is_labelled_with_cleaned_answer() {
        let parsed = QnaDocument {
            qna_list: vec![QnaPair {
                answer: Some("We open at 9,  close at 5".to_string()),
                questions: vec!["When do you open?".to_string(), " hours ".to_string()],
            }],
        };
        let extractor = QnaExtractor::new(Arc::new(FixedQnaParser(parsed)));
        let document = SourceDocument::new("/corpus/faq.qna", "# ? When do you open?");
        let mut processed = ProcessedFiles::new();
        let mut references = ReferenceResolver::new(&mut processed);

        let records = extractor.extract(&document, &mut references).await.unwrap();

        assert_eq!(
            records,
            vec![
                ExtractedRecord::Labeled(
                    LabeledExample::new("When do you open?").with_intent("We open at 9 close at 5")
                ),
                ExtractedRecord::Labeled(
                    LabeledExample::new("hours").with_intent("We open at 9 close at 5")
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_pair_without_questions_yields_nothing() {
        let parsed = QnaDocument {
            qna_list: vec![QnaPair {
                answer: Some("orphan".to_string()),
                questions: Vec::new(),
            }],
        };
        let extractor = QnaExtractor::new(Arc::new(FixedQnaParser(parsed)));
        let document = SourceDocument::new("/corpus/faq.qna", "> answer only");
        let mut processed = ProcessedFiles::new();
        let mut references = ReferenceResolver::new(&mut processed);

        assert!(extractor
            .extract(&document, &mut references)
            .await
            .unwrap()
            .is_empty());
    }
}
