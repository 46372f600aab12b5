//! Diagora: natural-language health checks for Oracle E-Business Suite.

pub mod catalog;
pub mod classifier;
pub mod config;
pub mod error;
pub mod executor;
pub mod formatter;
pub mod llm;
pub mod mapper;
pub mod pipeline;
pub mod server;
pub mod telemetry;

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::catalog::QueryCatalog;
use crate::classifier::IntentClassifier;
use crate::config::{DEFAULT_SECRET_KEY, Settings};
use crate::executor::{DataExecutor, Database, OracleDatabase};
use crate::formatter::{ResponseFormatter, load_system_prompt};
use crate::llm::{AzureOpenAiClient, LlmClient};
use crate::mapper::QueryMapper;
use crate::pipeline::Assistant;

/// Default location of the assistant persona prompt.
pub const DEFAULT_PROMPT_PATH: &str = "prompts/system_prompt.txt";

/// Capabilities shared by every request, built once at process start.
#[derive(Clone)]
pub struct Capabilities {
    pub llm: Option<Arc<dyn LlmClient>>,
    pub database: Arc<dyn Database>,
}

impl Capabilities {
    /// Build capabilities from settings. Missing configuration yields an
    /// absent LLM or an always-unavailable database, never an error.
    pub fn from_settings(settings: &Settings) -> Self {
        if settings.secret_key == DEFAULT_SECRET_KEY {
            warn!("SECRET_KEY not set, using the development default");
        }

        let llm: Option<Arc<dyn LlmClient>> = match &settings.llm {
            Some(cfg) => {
                info!(deployment = %cfg.deployment, "Azure OpenAI configured");
                Some(Arc::new(AzureOpenAiClient::new(cfg.clone())))
            }
            None => {
                info!("Azure OpenAI not configured, using keyword classification");
                None
            }
        };

        match &settings.oracle {
            Some(cfg) => info!(host = %cfg.host, port = cfg.port, service = %cfg.service_name, "Oracle configured"),
            None => info!("Oracle not configured, serving demo data"),
        }

        Self {
            llm,
            database: Arc::new(OracleDatabase::new(settings.oracle.clone())),
        }
    }
}

/// Assemble the full question-answering pipeline.
pub fn build_assistant(capabilities: &Capabilities, prompt_path: &Path) -> Assistant {
    let catalog = Arc::new(QueryCatalog::ebs());
    let system_prompt = load_system_prompt(prompt_path);

    Assistant::new(
        IntentClassifier::new(capabilities.llm.clone()),
        QueryMapper::new(catalog),
        DataExecutor::new(capabilities.database.clone()),
        ResponseFormatter::new(capabilities.llm.clone(), system_prompt),
    )
}
