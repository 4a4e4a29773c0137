//! Core types and trait definitions for labelkit-ingest
//!
//! Every extractor turns one source file into a list of [`ExtractedRecord`]s,
//! the common shape the [`crate::aggregator::LabelAggregator`] folds into the
//! canonical maps:
//! - [`LabeledExample`]: utterance + intent labels + entity annotations
//! - [`ScoredExample`]: utterance + scored intents/entities (evaluation input)

use crate::error::IngestResult;
use crate::references::ReferenceResolver;
use labelkit_common::{Label, ScoredLabel};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

// ============================================================================
// Source Documents
// ============================================================================

/// File content handed to an extractor
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Path the content was read from
    pub path: PathBuf,
    /// Full text (BOM stripped)
    pub content: String,
}

impl SourceDocument {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Source identifier passed to markup parsers (the path as text)
    pub fn id(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

// ============================================================================
// Entity Annotations
// ============================================================================

/// Nested entity annotation as found in markup corpora and flat JSON
///
/// Positions are kept as raw JSON values because exporters write them either
/// as numbers or as numeric strings; validation happens when the node is
/// turned into a [`Label`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityNode {
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default, rename = "startPos")]
    pub start_pos: Option<Value>,
    #[serde(default, rename = "endPos")]
    pub end_pos: Option<Value>,
    #[serde(default)]
    pub children: Option<Vec<EntityNode>>,
}

impl EntityNode {
    /// Convenience constructor used by parsers and tests
    pub fn new(entity: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            entity: Some(entity.into()),
            start_pos: Some(Value::from(start)),
            end_pos: Some(Value::from(end)),
            children: None,
        }
    }

    pub fn with_children(mut self, children: Vec<EntityNode>) -> Self {
        self.children = Some(children);
        self
    }

    /// Child nodes in source order
    pub fn children(&self) -> &[EntityNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn start(&self) -> Option<usize> {
        self.start_pos.as_ref().and_then(position_value)
    }

    pub fn end(&self) -> Option<usize> {
        self.end_pos.as_ref().and_then(position_value)
    }
}

/// Read a non-negative integer position from a number or numeric string
pub(crate) fn position_value(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                return usize::try_from(u).ok();
            }
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as usize)
        }
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    }
}

/// Entity annotation attached to an extracted example
#[derive(Debug, Clone, PartialEq)]
pub enum EntityAnnotation {
    /// Nested tree, flattened by the aggregator
    Tree(EntityNode),
    /// Pre-built label (offset/length schemas)
    Label(Label),
}

// ============================================================================
// Extracted Records
// ============================================================================

/// Training example: one utterance with its labels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledExample {
    pub utterance: String,
    pub intents: Vec<String>,
    pub entities: Vec<EntityAnnotation>,
}

impl LabeledExample {
    pub fn new(utterance: impl Into<String>) -> Self {
        Self {
            utterance: utterance.into(),
            ..Default::default()
        }
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intents.push(intent.into());
        self
    }
}

/// Evaluation example: one utterance with scored predictions
///
/// `None` means the source carried no scores of that kind for the utterance;
/// `Some(vec![])` means it carried an explicitly empty list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoredExample {
    pub utterance: String,
    pub intent_scores: Option<Vec<ScoredLabel>>,
    pub entity_scores: Option<Vec<ScoredLabel>>,
}

/// Normalized output of an extractor
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedRecord {
    Labeled(LabeledExample),
    Scored(ScoredExample),
}

// ============================================================================
// Source Extractor Trait
// ============================================================================

/// Whether the per-file hierarchical label applies to an extractor's output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingPolicy {
    /// Every intent is replaced by the file's routing name when one is set
    ApplyOverride,
    /// Labels are taken literally (plain and snapshot tab-separated files)
    Ignore,
}

/// Per-format extractor
///
/// Extractors are pure with respect to their input. The only state they may
/// touch is the session's processed-file set, through the
/// [`ReferenceResolver`] handed to markup parsers for cross-file references.
#[async_trait::async_trait]
pub trait SourceExtractor: Send + Sync {
    /// Extractor name for logging
    fn name(&self) -> &'static str;

    /// Routing behaviour of this extractor's labels
    fn routing(&self) -> RoutingPolicy {
        RoutingPolicy::ApplyOverride
    }

    /// Extract normalized records from one source document
    ///
    /// # Errors
    /// Structurally invalid records are `MalformedRecord`; parser failures are
    /// `ParseFailure`. Empty content yields an empty list.
    async fn extract(
        &self,
        document: &SourceDocument,
        references: &mut ReferenceResolver<'_>,
    ) -> IngestResult<Vec<ExtractedRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_positions_accept_numbers_and_numeric_strings() {
        assert_eq!(position_value(&json!(4)), Some(4));
        assert_eq!(position_value(&json!("10")), Some(10));
        assert_eq!(position_value(&json!(6.0)), Some(6));
        assert_eq!(position_value(&json!(-1)), None);
        assert_eq!(position_value(&json!("six")), None);
        assert_eq!(position_value(&json!(null)), None);
    }

    #[test]
    fn test_entity_node_deserializes_nested_children() {
        let node: EntityNode = serde_json::from_value(json!({
            "entity": "city",
            "startPos": 0,
            "endPos": 4,
            "children": [{ "entity": "country", "startPos": "6", "endPos": "10" }]
        }))
        .unwrap();

        assert_eq!(node.start(), Some(0));
        assert_eq!(node.children().len(), 1);
        assert_eq!(node.children()[0].end(), Some(10));
    }
}
