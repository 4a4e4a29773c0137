//! JSON corpus extractor
//!
//! JSON corpora come in several exporter shapes. The shape is detected from
//! the parsed document's top-level keys, then the document is decoded into
//! the matching typed schema.
//!
//! # Detection order
//! 1. object with `utterances` - LUIS app
//! 2. object with `examples` - snapshot export (`intents`/`entities` with offset+length)
//! 3. array whose elements carry `intent_scores` or `entity_scores` - scored predictions
//! 4. array whose elements carry `labels` - typed label array (`label_type` + `span`)
//! 5. any other array of objects - flat `{text, intents, entities}` list
//!
//! Every element of an array must have the same shape; a mixed array is
//! rejected rather than decoded with fields dropped.

use super::lu::luis_app_records;
use crate::error::{IngestError, IngestResult};
use crate::parsers::LuisApp;
use crate::references::ReferenceResolver;
use crate::types::{
    position_value, EntityAnnotation, EntityNode, ExtractedRecord, LabeledExample,
    ScoredExample, SourceDocument, SourceExtractor,
};
use async_trait::async_trait;
use labelkit_common::{Label, LabelType, ScoredLabel};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Recognized JSON corpus shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonVariant {
    LuisApp,
    SnapshotExport,
    Scored,
    LabeledArray,
    Flat,
    /// Empty array: nothing to extract
    Empty,
}

impl JsonVariant {
    /// Detect the shape of a parsed document, `None` when nothing matches
    pub fn detect(document: &Value) -> Option<Self> {
        match document {
            Value::Object(map) => {
                if map.get("utterances").is_some_and(Value::is_array) {
                    Some(JsonVariant::LuisApp)
                } else if map.get("examples").is_some_and(Value::is_array) {
                    Some(JsonVariant::SnapshotExport)
                } else {
                    None
                }
            }
            Value::Array(items) => {
                if items.is_empty() {
                    return Some(JsonVariant::Empty);
                }
                let variant = element_variant(&items[0])?;
                match first_mismatch(items, variant) {
                    None => Some(variant),
                    Some(_) => None,
                }
            }
            _ => None,
        }
    }
}

/// Shape of one array element, `None` for non-objects
fn element_variant(item: &Value) -> Option<JsonVariant> {
    let map = item.as_object()?;
    if map.contains_key("intent_scores") || map.contains_key("entity_scores") {
        Some(JsonVariant::Scored)
    } else if map.contains_key("labels") {
        Some(JsonVariant::LabeledArray)
    } else {
        Some(JsonVariant::Flat)
    }
}

/// Index of the first element whose shape differs from `variant`
fn first_mismatch(items: &[Value], variant: JsonVariant) -> Option<usize> {
    items
        .iter()
        .position(|item| element_variant(item) != Some(variant))
}

/// First element of an object array that breaks the shape of element 0
fn mixed_array_element(document: &Value) -> Option<(usize, JsonVariant)> {
    let items = document.as_array()?;
    let expected = element_variant(items.first()?)?;
    first_mismatch(items, expected).map(|index| (index, expected))
}

/// Extractor over an already parsed JSON document
pub struct JsonExtractor {
    variant: JsonVariant,
    document: Value,
}

impl JsonExtractor {
    /// Parse `content` and detect its shape
    ///
    /// Blank content is treated as an empty array.
    ///
    /// # Errors
    /// `ParseFailure` when the content is not JSON, matches no known shape,
    /// or is an array whose elements have different shapes.
    pub fn from_content(path: &Path, content: &str) -> IngestResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self {
                variant: JsonVariant::Empty,
                document: Value::Array(Vec::new()),
            });
        }

        let document: Value = serde_json::from_str(content)
            .map_err(|e| IngestError::parse_failure(path, e.to_string()))?;
        let variant = JsonVariant::detect(&document).ok_or_else(|| {
            match mixed_array_element(&document) {
                Some((index, expected)) => IngestError::parse_failure(
                    path,
                    format!(
                        "JSON array element {} does not match the {:?} shape of element 0",
                        index, expected
                    ),
                ),
                None => IngestError::parse_failure(
                    path,
                    "Failed to parse LUIS or JSON file on intent/entity labels",
                ),
            }
        })?;

        Ok(Self { variant, document })
    }

    pub fn variant(&self) -> JsonVariant {
        self.variant
    }

    fn decode<T: DeserializeOwned>(&self) -> IngestResult<T> {
        T::deserialize(&self.document)
            .map_err(|e| IngestError::malformed(format!("{:?} JSON record: {}", self.variant, e)))
    }
}

#[async_trait]
impl SourceExtractor for JsonExtractor {
    fn name(&self) -> &'static str {
        "json"
    }

    async fn extract(
        &self,
        document: &SourceDocument,
        _references: &mut ReferenceResolver<'_>,
    ) -> IngestResult<Vec<ExtractedRecord>> {
        let records = match self.variant {
            JsonVariant::Empty => Vec::new(),
            JsonVariant::LuisApp => luis_app_records(&self.decode::<LuisApp>()?)?,
            JsonVariant::SnapshotExport => {
                snapshot_export_records(self.decode::<SnapshotExport>()?)?
            }
            JsonVariant::Scored => scored_records(self.decode::<Vec<ScoredItem>>()?)?,
            JsonVariant::LabeledArray => labeled_records(self.decode::<Vec<LabeledItem>>()?)?,
            JsonVariant::Flat => flat_records(self.decode::<Vec<FlatItem>>()?)?,
        };

        debug!(
            file = %document.path.display(),
            variant = ?self.variant,
            records = records.len(),
            "Extracted JSON records"
        );
        Ok(records)
    }
}

// ============================================================================
// Decoded schemas
// ============================================================================

#[derive(Debug, Deserialize)]
struct SnapshotExport {
    examples: Vec<SnapshotExample>,
}

#[derive(Debug, Deserialize)]
struct SnapshotExample {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    intents: Vec<NamedLabel>,
    #[serde(default)]
    entities: Vec<SpanEntity>,
}

#[derive(Debug, Deserialize)]
struct NamedLabel {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpanEntity {
    #[serde(default)]
    entity: Option<String>,
    #[serde(default)]
    offset: Option<Value>,
    #[serde(default)]
    length: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ScoredItem {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    intent_scores: Option<Vec<IntentScore>>,
    #[serde(default)]
    entity_scores: Option<Vec<EntityScore>>,
}

#[derive(Debug, Deserialize)]
struct IntentScore {
    #[serde(default)]
    intent: Option<String>,
    score: f64,
}

#[derive(Debug, Deserialize)]
struct EntityScore {
    #[serde(default)]
    entity: Option<String>,
    #[serde(default, rename = "startPos")]
    start_pos: Option<Value>,
    #[serde(default, rename = "endPos")]
    end_pos: Option<Value>,
    score: f64,
}

#[derive(Debug, Deserialize)]
struct LabeledItem {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    labels: Vec<TypedLabel>,
}

#[derive(Debug, Deserialize)]
struct TypedLabel {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    label_type: Option<i64>,
    #[serde(default)]
    span: Option<Span>,
}

#[derive(Debug, Deserialize)]
struct Span {
    #[serde(default)]
    offset: Option<Value>,
    #[serde(default)]
    length: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct FlatItem {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    intents: Vec<String>,
    #[serde(default)]
    entities: Vec<EntityNode>,
}

// ============================================================================
// Conversion
// ============================================================================

fn required_text(text: Option<String>, index: usize) -> IngestResult<String> {
    text.map(|t| t.trim().to_string())
        .ok_or_else(|| IngestError::malformed(format!("JSON record {} has no text", index)))
}

fn span_label(
    name: Option<String>,
    offset: Option<&Value>,
    length: Option<&Value>,
    context: &str,
) -> IngestResult<Label> {
    let name = name
        .ok_or_else(|| IngestError::malformed(format!("{}: entity label has no name", context)))?;
    let offset = offset.and_then(position_value).ok_or_else(|| {
        IngestError::malformed(format!("{}: entity '{}' has no valid offset", context, name))
    })?;
    let length = length.and_then(position_value).ok_or_else(|| {
        IngestError::malformed(format!("{}: entity '{}' has no valid length", context, name))
    })?;

    Label::entity_by_span(name.trim(), offset, length)
        .map_err(|e| IngestError::malformed(format!("{}: {}", context, e)))
}

fn snapshot_export_records(export: SnapshotExport) -> IngestResult<Vec<ExtractedRecord>> {
    let mut records = Vec::with_capacity(export.examples.len());

    for (index, example) in export.examples.into_iter().enumerate() {
        let utterance = required_text(example.text, index)?;
        let context = format!("example '{}'", utterance);

        let intents = example
            .intents
            .into_iter()
            .map(|intent| {
                intent.name.map(|n| n.trim().to_string()).ok_or_else(|| {
                    IngestError::malformed(format!("{}: intent has no name", context))
                })
            })
            .collect::<IngestResult<Vec<_>>>()?;

        let entities = example
            .entities
            .into_iter()
            .map(|entity| {
                span_label(
                    entity.entity,
                    entity.offset.as_ref(),
                    entity.length.as_ref(),
                    &context,
                )
                .map(EntityAnnotation::Label)
            })
            .collect::<IngestResult<Vec<_>>>()?;

        records.push(ExtractedRecord::Labeled(LabeledExample {
            utterance,
            intents,
            entities,
        }));
    }

    Ok(records)
}

fn scored_records(items: Vec<ScoredItem>) -> IngestResult<Vec<ExtractedRecord>> {
    let mut records = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        let utterance = required_text(item.text, index)?;
        let context = format!("scored record '{}'", utterance);

        let intent_scores = item
            .intent_scores
            .map(|scores| {
                scores
                    .into_iter()
                    .map(|s| {
                        let name = s.intent.ok_or_else(|| {
                            IngestError::malformed(format!("{}: intent score has no intent", context))
                        })?;
                        Ok(ScoredLabel::new(Label::intent(name.trim()), s.score))
                    })
                    .collect::<IngestResult<Vec<_>>>()
            })
            .transpose()?;

        let entity_scores = item
            .entity_scores
            .map(|scores| {
                scores
                    .into_iter()
                    .map(|s| {
                        let name = s.entity.ok_or_else(|| {
                            IngestError::malformed(format!("{}: entity score has no entity", context))
                        })?;
                        let start = s.start_pos.as_ref().and_then(position_value);
                        let end = s.end_pos.as_ref().and_then(position_value);
                        let (Some(start), Some(end)) = (start, end) else {
                            return Err(IngestError::malformed(format!(
                                "{}: entity '{}' has no valid position",
                                context, name
                            )));
                        };
                        let label = Label::entity_by_position(name.trim(), start, end)
                            .map_err(|e| IngestError::malformed(format!("{}: {}", context, e)))?;
                        Ok(ScoredLabel::new(label, s.score))
                    })
                    .collect::<IngestResult<Vec<_>>>()
            })
            .transpose()?;

        records.push(ExtractedRecord::Scored(ScoredExample {
            utterance,
            intent_scores,
            entity_scores,
        }));
    }

    Ok(records)
}

fn labeled_records(items: Vec<LabeledItem>) -> IngestResult<Vec<ExtractedRecord>> {
    let mut records = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        let utterance = required_text(item.text, index)?;
        let context = format!("labeled record '{}'", utterance);
        let mut example = LabeledExample::new(utterance);

        for label in item.labels {
            let Some(code) = label.label_type else {
                debug!(utterance = %example.utterance, "Skipping label without label_type");
                continue;
            };

            match LabelType::from_code(code) {
                Some(LabelType::Intent) => {
                    let name = label.name.ok_or_else(|| {
                        IngestError::malformed(format!("{}: intent label has no name", context))
                    })?;
                    example.intents.push(name.trim().to_string());
                }
                Some(LabelType::Entity) => {
                    let span = label.span.as_ref();
                    let entity = span_label(
                        label.name,
                        span.and_then(|s| s.offset.as_ref()),
                        span.and_then(|s| s.length.as_ref()),
                        &context,
                    )?;
                    example.entities.push(EntityAnnotation::Label(entity));
                }
                None => {
                    debug!(code, utterance = %example.utterance, "Skipping label of unknown type");
                }
            }
        }

        records.push(ExtractedRecord::Labeled(example));
    }

    Ok(records)
}

fn flat_records(items: Vec<FlatItem>) -> IngestResult<Vec<ExtractedRecord>> {
    let mut records = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        let utterance = required_text(item.text, index)?;
        records.push(ExtractedRecord::Labeled(LabeledExample {
            utterance,
            intents: item.intents.iter().map(|i| i.trim().to_string()).collect(),
            entities: item.entities.into_iter().map(EntityAnnotation::Tree).collect(),
        }));
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::references::ProcessedFiles;
    use serde_json::json;

    async fn extract(content: &str) -> IngestResult<Vec<ExtractedRecord>> {
        let path = Path::new("/corpus/data.json");
        let extractor = JsonExtractor::from_content(path, content)?;
        let document = SourceDocument::new(path, content);
        let mut processed = ProcessedFiles::new();
        let mut references = ReferenceResolver::new(&mut processed);
        extractor.extract(&document, &mut references).await
    }

    #[test]
    fn test_variant_detection_priority() {
        assert_eq!(
            JsonVariant::detect(&json!({"utterances": [], "examples": []})),
            Some(JsonVariant::LuisApp)
        );
        assert_eq!(
            JsonVariant::detect(&json!({"examples": []})),
            Some(JsonVariant::SnapshotExport)
        );
        assert_eq!(
            JsonVariant::detect(&json!([{"text": "a", "labels": [], "intent_scores": []}])),
            Some(JsonVariant::Scored)
        );
        assert_eq!(
            JsonVariant::detect(&json!([{"text": "a", "labels": []}])),
            Some(JsonVariant::LabeledArray)
        );
        assert_eq!(
            JsonVariant::detect(&json!([{"text": "a", "intents": ["x"]}])),
            Some(JsonVariant::Flat)
        );
        assert_eq!(JsonVariant::detect(&json!([])), Some(JsonVariant::Empty));
        assert_eq!(JsonVariant::detect(&json!({"name": "app"})), None);
        assert_eq!(JsonVariant::detect(&json!([1, 2])), None);
    }

    #[tokio::test]
    async fn test_luis_app_document() {
        let content = json!({
            "utterances": [
                { "text": "book a flight", "intent": "BookFlight", "entities": [] }
            ]
        })
        .to_string();

        let records = extract(&content).await.unwrap();
        assert_eq!(
            records,
            vec![ExtractedRecord::Labeled(
                LabeledExample::new("book a flight").with_intent("BookFlight")
            )]
        );
    }

    #[tokio::test]
    async fn test_snapshot_export_converts_offset_length() {
        let content = json!({
            "examples": [{
                "text": "fly to paris",
                "intents": [{ "name": "BookFlight" }],
                "entities": [{ "entity": "city", "offset": 7, "length": 5 }]
            }]
        })
        .to_string();

        let records = extract(&content).await.unwrap();
        let ExtractedRecord::Labeled(example) = &records[0] else {
            panic!("Expected labeled record");
        };
        assert_eq!(example.intents, vec!["BookFlight".to_string()]);
        assert_eq!(
            example.entities,
            vec![EntityAnnotation::Label(
                Label::entity_by_position("city", 7, 11).unwrap()
            )]
        );
    }

    #[tokio::test]
    async fn test_scored_array_keeps_absent_and_empty_lists_apart() {
        let content = json!([
            { "text": "hello", "intent_scores": [{ "intent": "Greeting", "score": 0.9 }] },
            { "text": "bye", "intent_scores": [], "entity_scores": [
                { "entity": "name", "startPos": 0, "endPos": 2, "score": 0.4 }
            ]}
        ])
        .to_string();

        let records = extract(&content).await.unwrap();
        assert_eq!(records.len(), 2);

        let ExtractedRecord::Scored(first) = &records[0] else {
            panic!("Expected scored record");
        };
        assert_eq!(first.intent_scores.as_ref().unwrap()[0].score, 0.9);
        assert!(first.entity_scores.is_none());

        let ExtractedRecord::Scored(second) = &records[1] else {
            panic!("Expected scored record");
        };
        assert_eq!(second.intent_scores, Some(Vec::new()));
        assert_eq!(second.entity_scores.as_ref().unwrap()[0].label.end_offset, 2);
    }

    #[tokio::test]
    async fn test_labeled_array_reads_typed_labels() {
        let content = json!([{
            "text": "weather in oslo",
            "labels": [
                { "name": "GetWeather", "label_type": 1 },
                { "name": "city", "label_type": 2, "span": { "offset": 11, "length": 4 } },
                { "name": "ignored", "label_type": 9 }
            ]
        }])
        .to_string();

        let records = extract(&content).await.unwrap();
        let ExtractedRecord::Labeled(example) = &records[0] else {
            panic!("Expected labeled record");
        };
        assert_eq!(example.intents, vec!["GetWeather".to_string()]);
        assert_eq!(
            example.entities,
            vec![EntityAnnotation::Label(
                Label::entity_by_position("city", 11, 14).unwrap()
            )]
        );
    }

    #[tokio::test]
    async fn test_flat_array_and_missing_text() {
        let records = extract(r#"[{"text": " hi ", "intents": ["Greeting"]}]"#)
            .await
            .unwrap();
        assert_eq!(
            records,
            vec![ExtractedRecord::Labeled(
                LabeledExample::new("hi").with_intent("Greeting")
            )]
        );

        let err = extract(r#"[{"intents": ["Greeting"]}]"#).await.unwrap_err();
        assert!(matches!(err, IngestError::MalformedRecord { .. }));
    }

    #[tokio::test]
    async fn test_empty_and_unknown_documents() {
        assert!(extract("").await.unwrap().is_empty());
        assert!(extract("[]").await.unwrap().is_empty());

        let err = extract(r#"{"name": "not a corpus"}"#).await.unwrap_err();
        assert!(matches!(err, IngestError::ParseFailure { .. }));

        let err = extract("{ not json").await.unwrap_err();
        assert!(matches!(err, IngestError::ParseFailure { .. }));
    }

    #[tokio::test]
    async fn test_zero_length_span_is_malformed() {
        let content = json!({
            "examples": [{
                "text": "fly",
                "entities": [{ "entity": "city", "offset": 0, "length": 0 }]
            }]
        })
        .to_string();

        let err = extract(&content).await.unwrap_err();
        assert!(matches!(err, IngestError::MalformedRecord { .. }));
    }

    #[tokio::test]
    async fn test_label_without_type_is_skipped() {
        let content = json!([{
            "text": "weather in oslo",
            "labels": [
                { "name": "GetWeather", "label_type": 1 },
                { "name": "note" }
            ]
        }])
        .to_string();

        let records = extract(&content).await.unwrap();
        assert_eq!(
            records,
            vec![ExtractedRecord::Labeled(
                LabeledExample::new("weather in oslo").with_intent("GetWeather")
            )]
        );
    }

    #[tokio::test]
    async fn test_overflowing_span_offset_is_malformed() {
        let content = format!(
            r#"{{"examples": [{{"text": "fly", "entities": [{{"entity": "city", "offset": {}, "length": 2}}]}}]}}"#,
            u64::MAX
        );

        let err = extract(&content).await.unwrap_err();
        assert!(matches!(err, IngestError::MalformedRecord { .. }));
    }

    #[tokio::test]
    async fn test_mixed_array_shapes_are_rejected() {
        let content = json!([
            { "text": "hello", "intents": ["Greeting"] },
            { "text": "bye", "labels": [{ "name": "Farewell", "label_type": 1 }] }
        ]);
        assert_eq!(JsonVariant::detect(&content), None);

        match extract(&content.to_string()).await.unwrap_err() {
            IngestError::ParseFailure { message, .. } => {
                assert!(message.contains("element 1"));
                assert!(message.contains("Flat"));
            }
            other => panic!("Expected ParseFailure, got {:?}", other),
        }
    }
}
