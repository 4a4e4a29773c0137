//! Snapshot orchestration
//!
//! Builds resolver snapshots for markup corpora. One resolver handle is kept
//! per corpus base name for the lifetime of the orchestrator: the first build
//! of a base name creates and populates a handle, later builds synchronize
//! the cached handle with the new content instead.

use crate::aggregator::LabelAggregator;
use crate::error::{IngestError, IngestResult};
use crate::extractors::lu::{luis_app_records, parser_error};
use crate::models::IngestionResult;
use crate::parsers::{LuSource, LuisApp, MarkupParsers};
use crate::recognizer::{build_recognizer_documents, entity_recognizers, RecognizerDocuments};
use crate::references::{ProcessedFiles, ReferenceResolver};
use labelkit_common::config::IngestConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// External label-resolution engine
///
/// Implementations own the trained model state for one corpus.
pub trait LabelResolver: Send {
    /// Feed aggregated training examples
    fn add_examples(&mut self, examples: &IngestionResult) -> anyhow::Result<()>;

    /// Bring the model in line with updated markup content
    fn sync(&mut self, content: &str) -> anyhow::Result<()>;

    /// Export the current model state
    fn create_snapshot(&self) -> anyhow::Result<Vec<u8>>;
}

/// Options passed when creating a resolver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Use full rather than compact embeddings
    pub full_embedding: bool,
}

/// Creates resolver handles
pub trait LabelResolverFactory: Send + Sync {
    fn create(&self, options: &ResolverOptions) -> anyhow::Result<Box<dyn LabelResolver>>;
}

/// Parameters of one snapshot build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildRequest {
    /// Label replacing every intent of the corpus (empty: labels kept)
    pub routing_name: String,
    /// Also produce recognizer descriptor documents
    pub emit_recognizer: bool,
    pub full_embedding: bool,
    /// Skill the descriptor should hand off to
    pub skill_name: Option<String>,
}

/// Result of one snapshot build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildOutput {
    /// Corpus base name
    pub id: String,
    pub snapshot: Vec<u8>,
    pub recognizer: Option<RecognizerDocuments>,
}

/// Resolver cache plus the collaborators needed to fill it
pub struct SnapshotOrchestrator {
    factory: Arc<dyn LabelResolverFactory>,
    parsers: MarkupParsers,
    config: IngestConfig,
    resolvers: HashMap<String, Box<dyn LabelResolver>>,
}

impl SnapshotOrchestrator {
    pub fn new(
        factory: Arc<dyn LabelResolverFactory>,
        parsers: MarkupParsers,
        config: IngestConfig,
    ) -> Self {
        Self {
            factory,
            parsers,
            config,
            resolvers: HashMap::new(),
        }
    }

    /// Whether a resolver handle exists for `base_name`
    pub fn is_cached(&self, base_name: &str) -> bool {
        self.resolvers.contains_key(base_name)
    }

    pub fn cached_count(&self) -> usize {
        self.resolvers.len()
    }

    /// Build the snapshot (and optional descriptors) for one corpus
    ///
    /// `source.id` is the base name the resolver handle is cached under.
    ///
    /// # Errors
    /// Parser failures are `ParseFailure`; resolver failures are `Resolver`.
    pub async fn process_corpus(
        &mut self,
        source: &LuSource,
        request: &BuildRequest,
    ) -> IngestResult<BuildOutput> {
        let base_name = source.id.as_str();

        let snapshot = match self.resolvers.get_mut(base_name) {
            Some(resolver) => {
                debug!(base_name, "Synchronizing cached resolver");
                resolver.sync(&source.content).map_err(resolver_error)?;
                resolver.create_snapshot().map_err(resolver_error)?
            }
            None => {
                debug!(base_name, full_embedding = request.full_embedding, "Creating resolver");
                let mut resolver = self
                    .factory
                    .create(&ResolverOptions {
                        full_embedding: request.full_embedding,
                    })
                    .map_err(resolver_error)?;

                let app = self.parse(source).await?;
                let examples = self.aggregate(&app, &request.routing_name)?;
                resolver.add_examples(&examples).map_err(resolver_error)?;
                let snapshot = resolver.create_snapshot().map_err(resolver_error)?;

                self.resolvers.insert(base_name.to_string(), resolver);
                snapshot
            }
        };

        let recognizer = if request.emit_recognizer {
            let app = self.parse(source).await?;
            Some(build_recognizer_documents(
                base_name,
                entity_recognizers(&app.prebuilt_entities),
                &request.routing_name,
                request.skill_name.as_deref(),
            ))
        } else {
            None
        };

        info!(
            base_name,
            snapshot_bytes = snapshot.len(),
            recognizer = recognizer.is_some(),
            "Built snapshot"
        );
        Ok(BuildOutput {
            id: base_name.to_string(),
            snapshot,
            recognizer,
        })
    }

    /// Build every corpus in order with the same request
    pub async fn process_corpora(
        &mut self,
        sources: &[LuSource],
        request: &BuildRequest,
    ) -> IngestResult<Vec<BuildOutput>> {
        let mut outputs = Vec::with_capacity(sources.len());
        for source in sources {
            outputs.push(self.process_corpus(source, request).await?);
        }
        Ok(outputs)
    }

    async fn parse(&self, source: &LuSource) -> IngestResult<LuisApp> {
        if source.content.trim().is_empty() {
            return Ok(LuisApp::default());
        }

        let mut processed = ProcessedFiles::new();
        let mut references = ReferenceResolver::new(&mut processed);
        self.parsers
            .lu
            .parse(source, &mut references)
            .await
            .map_err(|e| parser_error(Path::new(&source.id), e))
    }

    fn aggregate(&self, app: &LuisApp, routing_name: &str) -> IngestResult<IngestionResult> {
        let mut aggregator = LabelAggregator::with_max_entity_depth(self.config.max_entity_depth);
        for record in luis_app_records(app)? {
            aggregator.fold(record, routing_name)?;
        }
        Ok(aggregator.into_result())
    }
}

fn resolver_error(error: anyhow::Error) -> IngestError {
    IngestError::Resolver(format!("{:#}", error))
}
