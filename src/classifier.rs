//! Intent classification for free-text questions.
//!
//! The primary path asks the LLM for a JSON classification. Any failure
//! (no client, transport error, unparsable reply) drops to a keyword table,
//! so [`IntentClassifier::classify`] always yields a result.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::Intent;
use crate::llm::{LlmClient, Sampling, strip_markdown_fences};

/// Confidence reported for a keyword match.
pub const KEYWORD_CONFIDENCE: f64 = 0.7;

/// Confidence reported when nothing matched.
pub const GENERAL_CONFIDENCE: f64 = 0.5;

/// Keyword fallback table. Iteration order is the tie-break: the first
/// intent with any matching keyword wins.
pub const KEYWORD_TABLE: &[(Intent, &[&str])] = &[
    (
        Intent::ConcurrentManager,
        &[
            "concurrent",
            "manager",
            "request",
            "job",
            "schedule",
            "fnd_concurrent",
            "icm",
            "running request",
        ],
    ),
    (
        Intent::Workflow,
        &["workflow", "wf_", "iş akışı", "stuck", "notification"],
    ),
    (
        Intent::InvalidObjects,
        &["invalid", "geçersiz", "compile", "dba_objects"],
    ),
    (
        Intent::Tablespace,
        &["tablespace", "disk", "alan", "storage", "space", "dolu"],
    ),
];

const INTENT_PROMPT: &str = r#"Kullanıcının Oracle EBS sorusunu analiz et ve yalnızca aşağıdaki JSON formatında yanıt ver:

{
  "intent": "concurrent_manager|concurrent_requests|workflow|workflow_stuck|invalid_objects|tablespace|tablespace_detail|alerts|profile_options|user_sessions|general|unknown",
  "entities": {
    "manager_name": "opsiyonel - soruda geçen manager adı",
    "schema_name": "opsiyonel - soruda geçen şema adı",
    "status_filter": "opsiyonel - STUCK, ACTIVE veya COMPLETED"
  },
  "confidence": 0.0
}

Intent açıklamaları:
- concurrent_manager: Concurrent Manager durumu, manager process sayıları
- concurrent_requests: Çalışan veya bekleyen concurrent request'ler
- workflow: Oracle Workflow genel durumu, iş akışları
- workflow_stuck: Uzun süredir takılı kalmış workflow detayları
- invalid_objects: Invalid / geçersiz objeler, compile sorunları
- tablespace: Tablespace doluluk oranları, disk ve alan kullanımı
- tablespace_detail: Datafile ve boş alan detayları
- alerts: Aktif Oracle Alert tanımları
- profile_options: Site seviyesi profile option değerleri
- user_sessions: Aktif kullanıcı oturumları
- general: Diğer genel EBS soruları
- unknown: Oracle EBS ile ilgisi olmayan veya anlaşılamayan sorular

Sadece JSON döndür, başka bir şey yazma."#;

// ============================================================================
// Result Types
// ============================================================================

/// Optional query refinements extracted from the question.
///
/// Extraction is best-effort: nothing checks that a named manager or schema
/// exists. Values are only ever used as bind parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default, alias = "managerName")]
    pub manager_name: Option<String>,
    #[serde(default, alias = "schemaName")]
    pub schema_name: Option<String>,
    #[serde(default, alias = "statusFilter")]
    pub status_filter: Option<String>,
}

impl Entities {
    fn normalized(self) -> Self {
        let clean = |v: Option<String>| {
            v.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        Self {
            manager_name: clean(self.manager_name),
            schema_name: clean(self.schema_name),
            status_filter: clean(self.status_filter),
        }
    }
}

/// Which path produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    Llm,
    Keyword,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentResult {
    pub intent: Intent,
    pub entities: Entities,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub method: ClassificationMethod,
    /// `false` only when the LLM explicitly labelled the question
    /// [`Intent::Unknown`]. The keyword path always succeeds.
    pub succeeded: bool,
}

/// Reply shape requested from the LLM.
#[derive(Debug, Deserialize)]
struct LlmClassification {
    intent: String,
    #[serde(default)]
    entities: Option<Entities>,
    #[serde(default)]
    confidence: Option<f64>,
}

// ============================================================================
// Classifier
// ============================================================================

#[derive(Clone)]
pub struct IntentClassifier {
    llm: Option<Arc<dyn LlmClient>>,
}

impl IntentClassifier {
    pub fn new(llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self { llm }
    }

    /// Classify a question. Never fails.
    pub async fn classify(&self, question: &str) -> IntentResult {
        let Some(llm) = &self.llm else {
            return classify_by_keywords(question);
        };

        match llm.complete(INTENT_PROMPT, question, Sampling::CLASSIFY).await {
            Ok(completion) => match parse_classification(&completion.text) {
                Ok(result) => {
                    debug!(intent = %result.intent, confidence = result.confidence, "LLM classification");
                    result
                }
                Err(e) => {
                    warn!("Unparsable LLM classification, using keywords: {e}");
                    classify_by_keywords(question)
                }
            },
            Err(e) => {
                warn!("LLM intent detection failed, using keywords: {e}");
                classify_by_keywords(question)
            }
        }
    }
}

/// Parse the LLM's JSON reply into an [`IntentResult`].
fn parse_classification(text: &str) -> Result<IntentResult, String> {
    let cleaned = strip_markdown_fences(text);
    let parsed: LlmClassification =
        serde_json::from_str(&cleaned).map_err(|e| format!("JSON parse error: {e}"))?;

    let intent = Intent::parse_lenient(&parsed.intent);
    let confidence = parsed
        .confidence
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(GENERAL_CONFIDENCE);

    Ok(IntentResult {
        intent,
        entities: parsed.entities.unwrap_or_default().normalized(),
        confidence,
        method: ClassificationMethod::Llm,
        succeeded: intent != Intent::Unknown,
    })
}

/// Keyword-table classification used whenever the LLM path is unavailable.
pub fn classify_by_keywords(question: &str) -> IntentResult {
    let lowered = question.to_lowercase();

    let matched = KEYWORD_TABLE
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| lowered.contains(kw)))
        .map(|(intent, _)| *intent);

    let (intent, confidence) = match matched {
        Some(intent) => (intent, KEYWORD_CONFIDENCE),
        None => (Intent::General, GENERAL_CONFIDENCE),
    };

    IntentResult {
        intent,
        entities: Entities::default(),
        confidence,
        method: ClassificationMethod::Keyword,
        succeeded: true,
    }
}
