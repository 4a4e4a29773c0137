//! Test Helper Utilities
//!
//! Shared utilities for testing labelkit-ingest: small stand-ins for the
//! external markup grammars and resolver engine, plus temp corpus builders.

#![allow(dead_code)]

pub mod log_capture;

pub use log_capture::LogCapture;

use async_trait::async_trait;
use labelkit_ingest::models::IngestionResult;
use labelkit_ingest::parsers::{
    LuParser, LuSource, LuisApp, LuisUtterance, MarkupParsers, PrebuiltEntity, QnaDocument,
    QnaPair, QnaParser,
};
use labelkit_ingest::references::ReferenceResolver;
use labelkit_ingest::snapshot::{LabelResolver, LabelResolverFactory, ResolverOptions};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// =============================================================================
// Markup grammars
// =============================================================================

/// Minimal `.lu` grammar
///
/// ```text
/// # IntentName
/// - utterance
/// @ prebuilt number
/// [shared](shared.lu)
/// ```
#[derive(Default)]
pub struct SimpleLuParser {
    parsed: Mutex<Vec<String>>,
}

impl SimpleLuParser {
    /// Source ids parsed so far, references included
    pub fn parsed_ids(&self) -> Vec<String> {
        self.parsed.lock().unwrap().clone()
    }
}

#[async_trait]
impl LuParser for SimpleLuParser {
    async fn parse(
        &self,
        source: &LuSource,
        references: &mut ReferenceResolver<'_>,
    ) -> anyhow::Result<LuisApp> {
        let mut app = LuisApp::default();
        let mut pending = vec![source.clone()];

        while let Some(current) = pending.pop() {
            self.parsed.lock().unwrap().push(current.id.clone());

            let mut intent: Option<String> = None;
            let mut imports = Vec::new();
            for line in current.content.lines().map(str::trim) {
                if let Some(name) = line.strip_prefix("@ prebuilt ") {
                    app.prebuilt_entities.push(PrebuiltEntity {
                        name: name.trim().to_string(),
                    });
                } else if let Some(name) = line.strip_prefix('#') {
                    intent = Some(name.trim().to_string());
                } else if let Some(text) = line.strip_prefix('-') {
                    let Some(intent) = intent.clone() else {
                        anyhow::bail!("utterance outside an intent section in {}", current.id);
                    };
                    app.utterances.push(LuisUtterance::new(text.trim(), intent));
                } else if line.starts_with('[') && line.ends_with(')') {
                    if let Some(start) = line.find("](") {
                        imports.push(line[start + 2..line.len() - 1].to_string());
                    }
                }
            }

            if !imports.is_empty() {
                pending.extend(references.resolve(&current.id, &imports).await?);
            }
        }

        Ok(app)
    }
}

/// Minimal `.qna` grammar
///
/// ```text
/// # ? question
/// # ? another phrasing
/// > answer
/// ```
pub struct SimpleQnaParser;

#[async_trait]
impl QnaParser for SimpleQnaParser {
    async fn parse(&self, source: &LuSource) -> anyhow::Result<QnaDocument> {
        let mut document = QnaDocument::default();
        let mut questions = Vec::new();

        for line in source.content.lines().map(str::trim) {
            if let Some(question) = line.strip_prefix("# ?") {
                questions.push(question.trim().to_string());
            } else if let Some(answer) = line.strip_prefix('>') {
                document.qna_list.push(QnaPair {
                    answer: Some(answer.trim().to_string()),
                    questions: std::mem::take(&mut questions),
                });
            }
        }

        if !questions.is_empty() {
            anyhow::bail!("questions without an answer in {}", source.id);
        }
        Ok(document)
    }
}

/// Parsers wired to the minimal grammars, plus a handle to inspect `.lu` parsing
pub fn simple_parsers() -> (MarkupParsers, Arc<SimpleLuParser>) {
    let lu = Arc::new(SimpleLuParser::default());
    let parsers = MarkupParsers::new(lu.clone(), Arc::new(SimpleQnaParser));
    (parsers, lu)
}

// =============================================================================
// Resolver engine
// =============================================================================

/// Resolver whose snapshot lists `label<TAB>utterance` lines
pub struct TableResolver {
    lines: Vec<String>,
    syncs: usize,
}

impl LabelResolver for TableResolver {
    fn add_examples(&mut self, examples: &IngestionResult) -> anyhow::Result<()> {
        for (utterance, labels) in &examples.utterance_labels {
            for label in labels {
                self.lines.push(format!("{}\t{}", label, utterance));
            }
        }
        Ok(())
    }

    fn sync(&mut self, _content: &str) -> anyhow::Result<()> {
        self.syncs += 1;
        Ok(())
    }

    fn create_snapshot(&self) -> anyhow::Result<Vec<u8>> {
        let mut snapshot = format!("syncs={}\n", self.syncs);
        snapshot.push_str(&self.lines.join("\n"));
        Ok(snapshot.into_bytes())
    }
}

#[derive(Default)]
pub struct TableResolverFactory {
    created: Mutex<usize>,
}

impl TableResolverFactory {
    pub fn created(&self) -> usize {
        *self.created.lock().unwrap()
    }
}

impl LabelResolverFactory for TableResolverFactory {
    fn create(&self, _options: &ResolverOptions) -> anyhow::Result<Box<dyn LabelResolver>> {
        *self.created.lock().unwrap() += 1;
        Ok(Box::new(TableResolver {
            lines: Vec::new(),
            syncs: 0,
        }))
    }
}

// =============================================================================
// Temp corpora
// =============================================================================

/// Temp directory populated with corpus files
pub struct TestCorpus {
    dir: TempDir,
}

impl TestCorpus {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Write `content` at `relative` (parent folders created)
    pub fn file(self, relative: &str, content: &str) -> Self {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
        self
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Path as an ingestion input string
    pub fn input(&self, relative: &str) -> String {
        self.path(relative).to_string_lossy().into_owned()
    }

    pub fn root_input(&self) -> String {
        self.root().to_string_lossy().into_owned()
    }
}

/// Labels of `utterance` as plain strings
pub fn labels_of(result: &IngestionResult, utterance: &str) -> Vec<String> {
    result
        .labels_for(utterance)
        .map(|labels| labels.as_slice().to_vec())
        .unwrap_or_default()
}
