//! Canonical aggregate produced by an ingestion session

use labelkit_common::{Label, LabelSet, ScoredLabel};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Utterance-keyed label maps
///
/// Keys are trimmed utterance text. Maps are ordered by utterance so that
/// exports are deterministic; label order inside each entry is insertion
/// order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestionResult {
    /// Intent labels per utterance
    pub utterance_labels: BTreeMap<String, LabelSet>,

    /// Labels that were added to an utterance that already had a different one
    pub utterance_label_duplicates: BTreeMap<String, LabelSet>,

    /// Entity labels per utterance (distinct, insertion-ordered)
    pub utterance_entity_labels: BTreeMap<String, Vec<Label>>,

    /// Entity labels seen again for the same utterance
    pub utterance_entity_label_duplicates: BTreeMap<String, Vec<Label>>,

    /// Scored intent predictions per utterance
    pub utterance_label_scores: BTreeMap<String, Vec<ScoredLabel>>,

    /// Scored entity predictions per utterance
    pub utterance_entity_label_scores: BTreeMap<String, Vec<ScoredLabel>>,
}

/// Counts reported at the end of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionSummary {
    /// Utterances with at least one intent label
    pub utterances: usize,
    /// Distinct intent labels across all utterances
    pub distinct_labels: usize,
    /// Utterances carrying more than one intent label
    pub multi_label_utterances: usize,
    /// Total entity labels
    pub entity_labels: usize,
    /// Total duplicate entity labels
    pub duplicate_entity_labels: usize,
    /// Utterances with scored predictions
    pub scored_utterances: usize,
}

impl IngestionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no map holds anything
    pub fn is_empty(&self) -> bool {
        self.utterance_labels.is_empty()
            && self.utterance_entity_labels.is_empty()
            && self.utterance_label_scores.is_empty()
            && self.utterance_entity_label_scores.is_empty()
    }

    pub fn labels_for(&self, utterance: &str) -> Option<&LabelSet> {
        self.utterance_labels.get(utterance)
    }

    pub fn entity_labels_for(&self, utterance: &str) -> &[Label] {
        self.utterance_entity_labels
            .get(utterance)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Distinct intent labels in first-seen order (utterances in map order)
    pub fn distinct_labels(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        let mut ordered = Vec::new();
        for labels in self.utterance_labels.values() {
            for label in labels {
                if seen.insert(label.as_str()) {
                    ordered.push(label.as_str());
                }
            }
        }
        ordered
    }

    /// Export as `labels<TAB>utterance` lines, labels comma-joined
    ///
    /// Lines come in lexicographic utterance order, not the order in which
    /// utterances were first ingested.
    pub fn to_tsv(&self) -> String {
        let mut out = String::new();
        for (utterance, labels) in &self.utterance_labels {
            out.push_str(&labels.as_slice().join(","));
            out.push('\t');
            out.push_str(utterance);
            out.push('\n');
        }
        out
    }

    /// Export as `index<TAB>label<TAB>utterance|utterance...` lines, one per label
    pub fn to_label_grouped_tsv(&self) -> String {
        let mut grouped: Vec<(&str, Vec<&str>)> = Vec::new();
        for (utterance, labels) in &self.utterance_labels {
            for label in labels {
                match grouped.iter_mut().find(|(name, _)| *name == label.as_str()) {
                    Some((_, utterances)) => utterances.push(utterance),
                    None => grouped.push((label.as_str(), vec![utterance.as_str()])),
                }
            }
        }

        let mut out = String::new();
        for (index, (label, utterances)) in grouped.iter().enumerate() {
            out.push_str(&format!("{}\t{}\t{}\n", index, label, utterances.join("|")));
        }
        out
    }

    pub fn summary(&self) -> IngestionSummary {
        IngestionSummary {
            utterances: self.utterance_labels.len(),
            distinct_labels: self.distinct_labels().len(),
            multi_label_utterances: self
                .utterance_labels
                .values()
                .filter(|labels| labels.len() > 1)
                .count(),
            entity_labels: self.utterance_entity_labels.values().map(Vec::len).sum(),
            duplicate_entity_labels: self
                .utterance_entity_label_duplicates
                .values()
                .map(Vec::len)
                .sum(),
            scored_utterances: self
                .utterance_label_scores
                .keys()
                .chain(self.utterance_entity_label_scores.keys())
                .collect::<BTreeSet<_>>()
                .len(),
        }
    }
}
