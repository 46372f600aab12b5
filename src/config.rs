//! Environment-provided settings.
//!
//! Absent language-model or database settings disable the capability; they
//! never fail startup.

use tracing::warn;

pub const DEFAULT_SECRET_KEY: &str = "dev-secret-key-change-in-production";
pub const DEFAULT_DEPLOYMENT: &str = "gpt-4";
pub const DEFAULT_API_VERSION: &str = "2024-02-15-preview";
pub const DEFAULT_ORACLE_PORT: u16 = 1521;

/// Azure OpenAI connection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AzureOpenAiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
}

/// Oracle connection settings.
#[derive(Clone, PartialEq)]
pub struct OracleConfig {
    pub host: String,
    pub port: u16,
    pub service_name: String,
    pub user: String,
    pub password: String,
}

impl OracleConfig {
    /// EZConnect string, `//host:port/service`.
    pub fn connect_string(&self) -> String {
        format!("//{}:{}/{}", self.host, self.port, self.service_name)
    }
}

impl std::fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("service_name", &self.service_name)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub secret_key: String,
    pub llm: Option<AzureOpenAiConfig>,
    pub oracle: Option<OracleConfig>,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup. Empty values count as
    /// absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let secret_key = get("SECRET_KEY").unwrap_or_else(|| DEFAULT_SECRET_KEY.to_string());

        let llm = match (get("AZURE_OPENAI_ENDPOINT"), get("AZURE_OPENAI_API_KEY")) {
            (Some(endpoint), Some(api_key)) => Some(AzureOpenAiConfig {
                endpoint,
                api_key,
                deployment: get("AZURE_OPENAI_DEPLOYMENT_NAME")
                    .unwrap_or_else(|| DEFAULT_DEPLOYMENT.to_string()),
                api_version: get("AZURE_OPENAI_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            }),
            _ => None,
        };

        let oracle = oracle_config(&get);

        Self {
            secret_key,
            llm,
            oracle,
        }
    }
}

fn oracle_config(get: &dyn Fn(&str) -> Option<String>) -> Option<OracleConfig> {
    let host = get("ORACLE_HOST")?;
    let service_name = get("ORACLE_SERVICE_NAME")?;
    let user = get("ORACLE_USER")?;
    let password = get("ORACLE_PASSWORD")?;

    let port = match get("ORACLE_PORT") {
        None => DEFAULT_ORACLE_PORT,
        Some(raw) => match raw.trim().parse() {
            Ok(port) => port,
            Err(_) => {
                warn!("ORACLE_PORT '{raw}' is not a valid port, database disabled");
                return None;
            }
        },
    };

    Some(OracleConfig {
        host,
        port,
        service_name,
        user,
        password,
    })
}
