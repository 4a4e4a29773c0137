//! Recognizer descriptor documents
//!
//! Declarative dialog documents emitted next to a snapshot. Two shapes exist:
//! a direct recognizer bound to the model folder and the snapshot file, and an
//! intent trigger that hands the conversation to a remote skill. Both are
//! referenced from a multi-language wrapper.

use crate::parsers::PrebuiltEntity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Prebuilt entity name (lowercase) to recognizer kind
///
/// Entries with an empty kind are known entities without a local recognizer.
const PREBUILT_RECOGNIZERS: &[(&str, &str)] = &[
    ("age", "Microsoft.AgeEntityRecognizer"),
    ("datetime", "Microsoft.DateTimeEntityRecognizer"),
    ("datetimev2", "Microsoft.DateTimeEntityRecognizer"),
    ("dimension", "Microsoft.DimensionEntityRecognizer"),
    ("email", "Microsoft.EmailEntityRecognizer"),
    ("geographyv2", ""),
    ("keyphrase", ""),
    ("money", "Microsoft.CurrencyEntityRecognizer"),
    ("number", "Microsoft.NumberEntityRecognizer"),
    ("ordinal", "Microsoft.OrdinalEntityRecognizer"),
    ("percentage", "Microsoft.PercentageEntityRecognizer"),
    ("personname", ""),
    ("phonenumber", "Microsoft.PhoneNumberEntityRecognizer"),
    ("temperature", "Microsoft.TemperatureEntityRecognizer"),
    ("url", "Microsoft.UrlEntityRecognizer"),
];

/// Recognizer kind for a prebuilt entity name (case-insensitive, trimmed)
pub fn prebuilt_recognizer_kind(name: &str) -> Option<&'static str> {
    let key = name.trim().to_lowercase();
    PREBUILT_RECOGNIZERS
        .iter()
        .find(|(entity, _)| *entity == key)
        .map(|(_, kind)| *kind)
        .filter(|kind| !kind.is_empty())
}

/// `{"$kind": ...}` entry of a recognizer's `entityRecognizers` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecognizer {
    #[serde(rename = "$kind")]
    pub kind: String,
}

/// Entity recognizers for the prebuilt entities of a corpus
///
/// Entities without a recognizer are skipped with a warning.
pub fn entity_recognizers(prebuilt: &[PrebuiltEntity]) -> Vec<EntityRecognizer> {
    prebuilt
        .iter()
        .filter_map(|entity| match prebuilt_recognizer_kind(&entity.name) {
            Some(kind) => Some(EntityRecognizer {
                kind: kind.to_string(),
            }),
            None => {
                warn!(entity = %entity.name, "No entity recognizer available for prebuilt entity");
                None
            }
        })
        .collect()
}

/// In-process recognizer reading the snapshot named after the base name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorRecognizer {
    #[serde(rename = "$kind")]
    pub kind: String,
    pub model_folder: String,
    pub snapshot_file: String,
    pub entity_recognizers: Vec<EntityRecognizer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Designer {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Action starting a remote skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginSkill {
    #[serde(rename = "$kind")]
    pub kind: String,
    #[serde(rename = "$designer")]
    pub designer: Designer,
    pub activity_processed: bool,
    pub bot_id: String,
    pub skill_host_endpoint: String,
    pub connection_name: String,
    pub allow_interruptions: bool,
    pub skill_endpoint: String,
    pub skill_app_id: String,
}

/// Intent trigger that forwards to a skill instead of recognizing locally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillTrigger {
    #[serde(rename = "$kind")]
    pub kind: String,
    #[serde(rename = "$designer")]
    pub designer: Designer,
    pub intent: String,
    pub actions: Vec<BeginSkill>,
}

/// Per-base-name recognizer document (`<base>.lu.dialog`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecognizerDocument {
    Orchestrator(OrchestratorRecognizer),
    Skill(SkillTrigger),
}

/// Language wrapper document (`<base>.en-us.lu.dialog`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiLanguageRecognizer {
    #[serde(rename = "$kind")]
    pub kind: String,
    pub recognizers: BTreeMap<String, String>,
}

/// Descriptor pair produced for one base name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizerDocuments {
    pub recognizer: RecognizerDocument,
    pub multi_language: MultiLanguageRecognizer,
}

/// Build the descriptor documents for `base_name`
///
/// Without a skill the result is a direct recognizer; with one, an intent
/// trigger named after `routing_name` (or `base_name` when that is empty).
pub fn build_recognizer_documents(
    base_name: &str,
    entity_recognizers: Vec<EntityRecognizer>,
    routing_name: &str,
    skill_name: Option<&str>,
) -> RecognizerDocuments {
    let recognizer = match skill_name.filter(|skill| !skill.trim().is_empty()) {
        None => RecognizerDocument::Orchestrator(OrchestratorRecognizer {
            kind: "Microsoft.OrchestratorRecognizer".to_string(),
            model_folder: "=settings.orchestrator.modelPath".to_string(),
            snapshot_file: format!("=settings.orchestrator.snapshots.{}", base_name),
            entity_recognizers,
        }),
        Some(skill) => {
            let intent = if routing_name.is_empty() {
                base_name
            } else {
                routing_name
            };
            RecognizerDocument::Skill(SkillTrigger {
                kind: "Microsoft.OnIntent".to_string(),
                designer: Designer {
                    id: "2oSiwz".to_string(),
                    name: Some(intent.to_string()),
                },
                intent: intent.to_string(),
                actions: vec![BeginSkill {
                    kind: "Microsoft.BeginSkill".to_string(),
                    designer: Designer {
                        id: "pDok9V".to_string(),
                        name: None,
                    },
                    activity_processed: true,
                    bot_id: "=settings.MicrosoftAppId".to_string(),
                    skill_host_endpoint: "=settings.skillHostEndpoint".to_string(),
                    connection_name: "=settings.connectionName".to_string(),
                    allow_interruptions: true,
                    skill_endpoint: format!("=settings.skill['{}'].endpointUrl", skill),
                    skill_app_id: format!("=settings.skill['{}'].msAppId", skill),
                }],
            })
        }
    };

    let resource = format!("{}.en-us.lu", base_name);
    let multi_language = MultiLanguageRecognizer {
        kind: "Microsoft.MultiLanguageRecognizer".to_string(),
        recognizers: BTreeMap::from([
            ("en-us".to_string(), resource.clone()),
            (String::new(), resource),
        ]),
    };

    RecognizerDocuments {
        recognizer,
        multi_language,
    }
}
