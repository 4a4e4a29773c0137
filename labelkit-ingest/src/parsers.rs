//! Markup parser seams
//!
//! The `.lu` and `.qna` grammars live outside this crate. Implementations of
//! [`LuParser`] and [`QnaParser`] turn markup text into the structured shapes
//! below; the extractors take it from there.

use crate::references::ReferenceResolver;
use crate::types::EntityNode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Markup source handed to a parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LuSource {
    /// Source identifier: a path for files read from disk, a base name for
    /// in-memory corpora
    pub id: String,
    pub content: String,
}

impl LuSource {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}

/// Structured form of a markup corpus (also the LUIS app JSON shape)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LuisApp {
    #[serde(default)]
    pub utterances: Vec<LuisUtterance>,
    #[serde(default)]
    pub prebuilt_entities: Vec<PrebuiltEntity>,
}

/// One labelled utterance of a markup corpus
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LuisUtterance {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub entities: Vec<EntityNode>,
}

impl LuisUtterance {
    pub fn new(text: impl Into<String>, intent: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            intent: Some(intent.into()),
            entities: Vec::new(),
        }
    }

    pub fn with_entity(mut self, entity: EntityNode) -> Self {
        self.entities.push(entity);
        self
    }
}

/// Prebuilt entity declared by a markup corpus (`number`, `datetimeV2`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrebuiltEntity {
    pub name: String,
}

/// Structured form of a Q&A corpus
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QnaDocument {
    #[serde(default, rename = "qnaList")]
    pub qna_list: Vec<QnaPair>,
}

/// One answer with the questions that lead to it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QnaPair {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub questions: Vec<String>,
}

/// `.lu` grammar
#[async_trait::async_trait]
pub trait LuParser: Send + Sync {
    /// Parse one markup corpus
    ///
    /// References to sibling files must be resolved through `references`,
    /// which reads them and records them as processed for the session.
    async fn parse(
        &self,
        source: &LuSource,
        references: &mut ReferenceResolver<'_>,
    ) -> anyhow::Result<LuisApp>;
}

/// `.qna` grammar
#[async_trait::async_trait]
pub trait QnaParser: Send + Sync {
    async fn parse(&self, source: &LuSource) -> anyhow::Result<QnaDocument>;
}

/// Placeholder used when no grammar has been supplied
///
/// Fails every parse so that a markup file is never silently dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredParser;

#[async_trait::async_trait]
impl LuParser for UnconfiguredParser {
    async fn parse(
        &self,
        source: &LuSource,
        _references: &mut ReferenceResolver<'_>,
    ) -> anyhow::Result<LuisApp> {
        anyhow::bail!("no .lu parser configured (source: {})", source.id)
    }
}

#[async_trait::async_trait]
impl QnaParser for UnconfiguredParser {
    async fn parse(&self, source: &LuSource) -> anyhow::Result<QnaDocument> {
        anyhow::bail!("no .qna parser configured (source: {})", source.id)
    }
}

/// Parsers available to a session
#[derive(Clone)]
pub struct MarkupParsers {
    pub lu: Arc<dyn LuParser>,
    pub qna: Arc<dyn QnaParser>,
}

impl MarkupParsers {
    pub fn new(lu: Arc<dyn LuParser>, qna: Arc<dyn QnaParser>) -> Self {
        Self { lu, qna }
    }
}

impl Default for MarkupParsers {
    fn default() -> Self {
        Self {
            lu: Arc::new(UnconfiguredParser),
            qna: Arc::new(UnconfiguredParser),
        }
    }
}
