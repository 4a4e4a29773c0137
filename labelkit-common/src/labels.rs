//! Label data types shared by the ingestion engine and its consumers
//!
//! An utterance carries intent labels (plain strings, kept in a [`LabelSet`])
//! and entity labels (named spans, [`Label`]). Entity names may be
//! colon-delimited paths (`city:country`) when they come from nested
//! annotations.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelType {
    /// Utterance-level category
    Intent,
    /// Named span within the utterance
    Entity,
}

impl LabelType {
    /// Map the numeric label-type code used by exported example arrays
    ///
    /// `1` is an intent, `2` is an entity; every other code is unknown.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(LabelType::Intent),
            2 => Some(LabelType::Entity),
            _ => None,
        }
    }

    /// Numeric code of this label type
    pub fn code(self) -> i64 {
        match self {
            LabelType::Intent => 1,
            LabelType::Entity => 2,
        }
    }
}

/// Intent or entity label
///
/// Equality is structural: two labels are the same label iff name, offsets
/// and type all match. `end_offset` is inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub label_type: LabelType,
}

impl Label {
    /// Intent label (offsets are not meaningful and stay at zero)
    pub fn intent(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start_offset: 0,
            end_offset: 0,
            label_type: LabelType::Intent,
        }
    }

    /// Entity label from inclusive start/end positions
    pub fn entity_by_position(name: impl Into<String>, start: usize, end: usize) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("entity label name is empty".to_string()));
        }
        if end < start {
            return Err(Error::InvalidInput(format!(
                "entity label '{}' ends before it starts ({} > {})",
                name, start, end
            )));
        }
        Ok(Self {
            name,
            start_offset: start,
            end_offset: end,
            label_type: LabelType::Entity,
        })
    }

    /// Entity label from an `(offset, length)` span
    pub fn entity_by_span(name: impl Into<String>, offset: usize, length: usize) -> Result<Self> {
        let name = name.into();
        if length == 0 {
            return Err(Error::InvalidInput(format!(
                "entity label '{}' has an empty span at offset {}",
                name, offset
            )));
        }
        let end = offset.checked_add(length - 1).ok_or_else(|| {
            Error::InvalidInput(format!(
                "entity label '{}' span overflows (offset {}, length {})",
                name, offset, length
            ))
        })?;
        Self::entity_by_position(name, offset, end)
    }

    /// Span length in characters
    pub fn length(&self) -> usize {
        (self.end_offset - self.start_offset).saturating_add(1)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label_type {
            LabelType::Intent => write!(f, "{}", self.name),
            LabelType::Entity => write!(
                f,
                "{}[{}..={}]",
                self.name, self.start_offset, self.end_offset
            ),
        }
    }
}

/// Label with a prediction score, used when scoring utterances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredLabel {
    pub label: Label,
    pub score: f64,
}

impl ScoredLabel {
    pub fn new(label: Label, score: f64) -> Self {
        Self { label, score }
    }
}

/// Insertion-ordered set of distinct label strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(Vec<String>);

impl LabelSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert a label, returning `false` if it was already present
    pub fn insert(&mut self, label: impl Into<String>) -> bool {
        let label = label.into();
        if self.contains(&label) {
            return false;
        }
        self.0.push(label);
        true
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|l| l == label)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a LabelSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for LabelSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = LabelSet::new();
        for label in iter {
            set.insert(label);
        }
        set
    }
}
