//! Turns query results into prose.
//!
//! With an LLM the answer is written by the assistant persona; without one
//! (or when the call fails) a deterministic summary is rendered.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::catalog::Intent;
use crate::executor::QueryResult;
use crate::llm::{LlmClient, Sampling};

/// Maximum rows listed by the fallback summary.
pub const MAX_LISTED_ROWS: usize = 10;

pub const NOT_EXECUTED_MESSAGE: &str =
    "Veritabanı sorgusu çalıştırılamadı. Lütfen bağlantı ayarlarını kontrol edin.";

const DEMO_NOTE: &str = "_Not: Veritabanı bağlantısı olmadığı için demo verisi gösteriliyor._";

const DEFAULT_SYSTEM_PROMPT: &str = "Sen Oracle EBS R12.2.9 uzmanı bir asistansın. Kullanıcıların Oracle E-Business Suite hakkındaki sorularını analiz edip, uygun veritabanı sorgularını çalıştırarak yanıt veriyorsun.

Desteklenen kontrol alanları:
- concurrent_manager: Concurrent Manager durumu ve işleri
- workflow: Oracle Workflow durumu
- invalid_objects: Invalid veritabanı objeleri
- tablespace: Tablespace kullanım durumu
- general: Genel EBS soruları";

/// Load the assistant persona prompt, falling back to the built-in text.
pub fn load_system_prompt(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => {
            debug!(path = %path.display(), "Loaded system prompt");
            text
        }
        Ok(_) => {
            warn!(path = %path.display(), "System prompt file is empty, using built-in prompt");
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
        Err(e) => {
            warn!(path = %path.display(), "System prompt not readable ({e}), using built-in prompt");
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
    }
}

#[derive(Clone)]
pub struct ResponseFormatter {
    llm: Option<Arc<dyn LlmClient>>,
    system_prompt: String,
}

impl ResponseFormatter {
    pub fn new(llm: Option<Arc<dyn LlmClient>>, system_prompt: String) -> Self {
        Self { llm, system_prompt }
    }

    pub async fn format(&self, question: &str, intent: Intent, result: Option<&QueryResult>) -> String {
        let Some(llm) = &self.llm else {
            return summarize(intent, result);
        };

        let context = llm_context(question, intent, result);
        match llm.complete(&self.system_prompt, &context, Sampling::FORMAT).await {
            Ok(completion) => completion.text,
            Err(e) => {
                warn!("LLM response formatting failed, using summary: {e}");
                summarize(intent, result)
            }
        }
    }
}

fn llm_context(question: &str, intent: Intent, result: Option<&QueryResult>) -> String {
    let serialized = result
        .and_then(|r| serde_json::to_string(r).ok())
        .unwrap_or_else(|| "Sorgu çalıştırılmadı".to_string());

    format!(
        "Kullanıcı sorusu: {question}\nTespit edilen intent: {intent}\nVeritabanı sonucu: {serialized}"
    )
}

/// Deterministic text summary of a query result.
pub fn summarize(intent: Intent, result: Option<&QueryResult>) -> String {
    let Some(result) = result else {
        return NOT_EXECUTED_MESSAGE.to_string();
    };

    if let Some(error) = &result.error {
        return format!("Sorgu hatası: {error}");
    }

    if result.rows.is_empty() {
        return format!("{intent} kontrolü tamamlandı. Herhangi bir sorun tespit edilmedi.");
    }

    let mut lines = vec![
        format!("**{} Sonuçları:**\n", title_case(intent.as_str())),
        format!("Toplam {} kayıt bulundu.\n", result.rows.len()),
    ];

    for (i, row) in result.rows.iter().take(MAX_LISTED_ROWS).enumerate() {
        let cells: Vec<String> = result
            .columns
            .iter()
            .zip(row)
            .map(|(column, value)| format!("{column}: {}", display_value(value)))
            .collect();
        lines.push(format!("{}. {}", i + 1, cells.join(" | ")));
    }

    if result.rows.len() > MAX_LISTED_ROWS {
        lines.push(format!(
            "\n... ve {} kayıt daha.",
            result.rows.len() - MAX_LISTED_ROWS
        ));
    }

    if result.is_demo_data {
        lines.push(format!("\n{DEMO_NOTE}"));
    }

    lines.join("\n")
}

/// `invalid_objects` → `Invalid Objects`.
fn title_case(label: &str) -> String {
    label
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
