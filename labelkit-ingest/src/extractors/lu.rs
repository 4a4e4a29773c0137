//! `.lu` markup extractor
//!
//! Delegates the grammar to an external [`LuParser`] and converts the parsed
//! LUIS app into labelled examples. The same conversion serves JSON files
//! that already hold a LUIS app (`utterances` key).

use crate::error::{IngestError, IngestResult};
use crate::parsers::{LuParser, LuSource, LuisApp};
use crate::references::ReferenceResolver;
use crate::types::{
    EntityAnnotation, ExtractedRecord, LabeledExample, SourceDocument, SourceExtractor,
};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Markup corpus extractor
pub struct LuExtractor {
    parser: Arc<dyn LuParser>,
}

impl LuExtractor {
    pub fn new(parser: Arc<dyn LuParser>) -> Self {
        Self { parser }
    }
}

#[async_trait]
impl SourceExtractor for LuExtractor {
    fn name(&self) -> &'static str {
        "lu"
    }

    async fn extract(
        &self,
        document: &SourceDocument,
        references: &mut ReferenceResolver<'_>,
    ) -> IngestResult<Vec<ExtractedRecord>> {
        if document.content.trim().is_empty() {
            debug!(file = %document.path.display(), "Empty markup corpus");
            return Ok(Vec::new());
        }

        let source = LuSource::new(document.id(), document.content.clone());
        let app = self
            .parser
            .parse(&source, references)
            .await
            .map_err(|e| parser_error(&document.path, e))?;

        luis_app_records(&app)
    }
}

/// Keep ingestion errors raised inside the parser (reference resolution),
/// wrap anything else as a parse failure of `path`
pub(crate) fn parser_error(path: &Path, error: anyhow::Error) -> IngestError {
    match error.downcast::<IngestError>() {
        Ok(inner) => inner,
        Err(other) => IngestError::parse_failure(path, format!("{:#}", other)),
    }
}

/// Convert a LUIS app into one labelled example per utterance
///
/// # Errors
/// `MalformedRecord` when an utterance lacks `text` or `intent`.
pub(crate) fn luis_app_records(app: &LuisApp) -> IngestResult<Vec<ExtractedRecord>> {
    let mut records = Vec::with_capacity(app.utterances.len());

    for (index, utterance) in app.utterances.iter().enumerate() {
        let text = utterance.text.as_deref().ok_or_else(|| {
            IngestError::malformed(format!("utterance {} has no text", index))
        })?;
        let intent = utterance.intent.as_deref().ok_or_else(|| {
            IngestError::malformed(format!("utterance {} ('{}') has no intent", index, text))
        })?;

        let mut example = LabeledExample::new(text.trim()).with_intent(intent.trim());
        example.entities = utterance
            .entities
            .iter()
            .cloned()
            .map(EntityAnnotation::Tree)
            .collect();

        records.push(ExtractedRecord::Labeled(example));
    }

    Ok(records)
}
