//! Label aggregation
//!
//! Folds extracted records into the utterance-keyed maps of an
//! [`IngestionResult`], recording duplicates instead of rejecting them.
//!
//! # Intent labels
//! For each `(utterance, label)` the candidate is the routing override when
//! one is set, otherwise the label itself:
//! - candidate already present: nothing changes
//! - utterance has no labels yet: candidate becomes its first label
//! - utterance already has other labels: candidate is added and also recorded
//!   in the duplicate map, flagging the utterance as multi-labelled
//!
//! # Entity labels
//! Nested entity trees are flattened depth-first (children in source order)
//! with an explicit stack. Each node becomes an entity label named
//! `prefix:name`; a label already present for the utterance is recorded as a
//! duplicate instead.

use crate::error::{IngestError, IngestResult};
use crate::models::IngestionResult;
use crate::types::{EntityAnnotation, EntityNode, ExtractedRecord, ScoredExample};
use labelkit_common::{Label, LabelSet};
use tracing::{debug, trace};

/// Default nesting limit for entity trees
pub const DEFAULT_MAX_ENTITY_DEPTH: usize = 32;

/// Accumulates labels for one ingestion session
#[derive(Debug)]
pub struct LabelAggregator {
    result: IngestionResult,
    max_entity_depth: usize,
}

impl Default for LabelAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelAggregator {
    pub fn new() -> Self {
        Self::with_max_entity_depth(DEFAULT_MAX_ENTITY_DEPTH)
    }

    pub fn with_max_entity_depth(max_entity_depth: usize) -> Self {
        Self {
            result: IngestionResult::new(),
            max_entity_depth,
        }
    }

    /// Add one intent label for `utterance`
    ///
    /// A non-empty `hierarchical_override` replaces `label`.
    ///
    /// # Errors
    /// `MalformedRecord` when the effective label is empty.
    pub fn add_label(
        &mut self,
        utterance: &str,
        label: &str,
        hierarchical_override: &str,
    ) -> IngestResult<()> {
        let utterance = utterance.trim();
        let candidate = if hierarchical_override.is_empty() {
            label
        } else {
            hierarchical_override
        };
        if candidate.is_empty() {
            return Err(IngestError::malformed(format!(
                "empty intent label for utterance '{}'",
                utterance
            )));
        }

        let labels = self
            .result
            .utterance_labels
            .entry(utterance.to_string())
            .or_insert_with(LabelSet::new);

        if labels.contains(candidate) {
            trace!(utterance, label = candidate, "Label already present");
            return Ok(());
        }

        let had_labels = !labels.is_empty();
        labels.insert(candidate);

        if had_labels {
            debug!(utterance, label = candidate, "Utterance carries multiple labels");
            self.result
                .utterance_label_duplicates
                .entry(utterance.to_string())
                .or_insert_with(LabelSet::new)
                .insert(candidate);
        }

        Ok(())
    }

    /// Flatten an entity tree into entity labels for `utterance`
    ///
    /// Nodes are validated before their children are visited, so a malformed
    /// node stops the walk before anything below it is recorded.
    ///
    /// # Errors
    /// `MalformedRecord` for a node without an entity name or with invalid
    /// positions, or for trees nested deeper than the configured limit.
    pub fn add_entity_label(
        &mut self,
        utterance: &str,
        tree: &EntityNode,
        name_prefix: &str,
    ) -> IngestResult<()> {
        let utterance = utterance.trim();
        let mut stack: Vec<(&EntityNode, String, usize)> = vec![(tree, name_prefix.to_string(), 1)];

        while let Some((node, prefix, depth)) = stack.pop() {
            if depth > self.max_entity_depth {
                return Err(IngestError::malformed(format!(
                    "entity tree for utterance '{}' is nested deeper than {} levels",
                    utterance, self.max_entity_depth
                )));
            }

            let name = node
                .entity
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| {
                    IngestError::malformed(format!(
                        "entity without a name in utterance '{}'",
                        utterance
                    ))
                })?;
            let (Some(start), Some(end)) = (node.start(), node.end()) else {
                return Err(IngestError::malformed(format!(
                    "entity '{}' in utterance '{}' has no valid start/end position",
                    name, utterance
                )));
            };

            let full_name = if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{}:{}", prefix, name)
            };
            let label = Label::entity_by_position(full_name.clone(), start, end).map_err(|e| {
                IngestError::malformed(format!("utterance '{}': {}", utterance, e))
            })?;
            self.insert_entity_label(utterance, label);

            // Reverse push keeps children in source order when popped
            for child in node.children().iter().rev() {
                stack.push((child, full_name.clone(), depth + 1));
            }
        }

        Ok(())
    }

    /// Add an already built entity label for `utterance`
    pub fn add_entity_label_object(&mut self, utterance: &str, label: Label) -> IngestResult<()> {
        if label.name.trim().is_empty() {
            return Err(IngestError::malformed(format!(
                "entity without a name in utterance '{}'",
                utterance.trim()
            )));
        }
        self.insert_entity_label(utterance.trim(), label);
        Ok(())
    }

    /// Record scored predictions for an utterance
    ///
    /// Lists replace whatever an earlier record stored for the utterance; a
    /// missing list leaves the map untouched.
    pub fn add_scores(&mut self, example: ScoredExample) {
        let utterance = example.utterance.trim().to_string();
        if let Some(scores) = example.intent_scores {
            self.result
                .utterance_label_scores
                .insert(utterance.clone(), scores);
        }
        if let Some(scores) = example.entity_scores {
            self.result
                .utterance_entity_label_scores
                .insert(utterance, scores);
        }
    }

    /// Fold one extracted record
    pub fn fold(&mut self, record: ExtractedRecord, hierarchical_override: &str) -> IngestResult<()> {
        match record {
            ExtractedRecord::Labeled(example) => {
                for intent in &example.intents {
                    self.add_label(&example.utterance, intent, hierarchical_override)?;
                }
                for entity in example.entities {
                    match entity {
                        EntityAnnotation::Tree(tree) => {
                            self.add_entity_label(&example.utterance, &tree, "")?
                        }
                        EntityAnnotation::Label(label) => {
                            self.add_entity_label_object(&example.utterance, label)?
                        }
                    }
                }
                Ok(())
            }
            ExtractedRecord::Scored(example) => {
                self.add_scores(example);
                Ok(())
            }
        }
    }

    pub fn result(&self) -> &IngestionResult {
        &self.result
    }

    pub fn into_result(self) -> IngestionResult {
        self.result
    }

    fn insert_entity_label(&mut self, utterance: &str, label: Label) {
        let labels = self
            .result
            .utterance_entity_labels
            .entry(utterance.to_string())
            .or_default();

        if labels.contains(&label) {
            debug!(utterance, label = %label, "Duplicate entity label");
            let duplicates = self
                .result
                .utterance_entity_label_duplicates
                .entry(utterance.to_string())
                .or_default();
            if !duplicates.contains(&label) {
                duplicates.push(label);
            }
        } else {
            labels.push(label);
        }
    }
}
