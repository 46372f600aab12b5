//! LLM client abstraction and Azure OpenAI implementation.
//!
//! This module provides a generic [`LlmClient`] trait for interacting with
//! language models, along with concrete implementations:
//!
//! - [`AzureOpenAiClient`]: production client for Azure OpenAI chat completions
//! - `MockLlmClient`: test double for unit tests
//!
//! Used by the intent classifier and the response formatter. Both treat any
//! [`LlmError`] as a signal to fall back to deterministic behaviour.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AzureOpenAiConfig;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Endpoint or API key is not configured.
    #[error("Azure OpenAI is not configured")]
    NotConfigured,

    /// HTTP or network error occurred.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The API answered with a non-success status.
    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Failed to parse the API response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Model returned no text content.
    #[error("Model returned empty response")]
    EmptyResponse,
}

// ============================================================================
// Completion Types
// ============================================================================

/// The result of a successful LLM completion request.
#[derive(Debug, Clone)]
pub struct Completion {
    /// The generated text from the model.
    pub text: String,
}

/// Sampling settings for a single completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Sampling {
    /// Near-deterministic, short output for structured classification.
    pub const CLASSIFY: Self = Self {
        temperature: 0.1,
        max_tokens: 500,
    };

    /// Slightly warmer, longer output for prose answers.
    pub const FORMAT: Self = Self {
        temperature: 0.3,
        max_tokens: 1000,
    };
}

// ============================================================================
// LlmClient Trait
// ============================================================================

/// Generic interface for LLM clients.
///
/// Supports simple system+user prompt completion with text response.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion given a system prompt and user message.
    async fn complete(
        &self,
        system: &str,
        user: &str,
        sampling: Sampling,
    ) -> Result<Completion, LlmError>;
}

// ============================================================================
// Azure OpenAI Implementation
// ============================================================================

/// Client for Azure OpenAI chat completions.
pub struct AzureOpenAiClient {
    config: AzureOpenAiConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl AzureOpenAiClient {
    pub fn new(config: AzureOpenAiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions",
            self.config.endpoint.trim_end_matches('/'),
            self.config.deployment
        )
    }
}

#[async_trait]
impl LlmClient for AzureOpenAiClient {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        sampling: Sampling,
    ) -> Result<Completion, LlmError> {
        let request_body = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
        };

        let response = self
            .client
            .post(self.completions_url())
            .query(&[("api-version", self.config.api_version.as_str())])
            .header("api-key", &self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let text = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        Ok(Completion { text })
    }
}

/// Strip markdown code fences from LLM output.
pub fn strip_markdown_fences(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        let after_first_fence = trimmed
            .find('\n')
            .map(|i| &trimmed[i + 1..])
            .unwrap_or(trimmed);
        if let Some(end) = after_first_fence.rfind("```") {
            return after_first_fence[..end].trim().to_string();
        }
    }
    trimmed.to_string()
}

// ============================================================================
// Mock Implementation (Test Only)
// ============================================================================

/// Mock LLM client for testing. Returns pre-programmed results in FIFO order
/// and records every prompt it receives.
#[cfg(test)]
pub struct MockLlmClient {
    results: std::sync::Mutex<std::collections::VecDeque<Result<String, LlmError>>>,
    /// `(system, user)` pairs in call order.
    pub calls: std::sync::Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
impl MockLlmClient {
    /// Create a mock that answers with each response in turn.
    pub fn new(responses: Vec<String>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    /// Create a mock whose every call fails with an HTTP error.
    pub fn failing() -> Self {
        Self::with_results(Vec::new())
    }

    pub fn with_results(results: Vec<Result<String, LlmError>>) -> Self {
        Self {
            results: std::sync::Mutex::new(results.into()),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        _sampling: Sampling,
    ) -> Result<Completion, LlmError> {
        self.calls
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string()));

        let text = self
            .results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Http("connection refused".into())))?;

        Ok(Completion { text })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AzureOpenAiClient {
        AzureOpenAiClient::new(AzureOpenAiConfig {
            endpoint: format!("{}/", server.uri()),
            api_key: "test-key".into(),
            deployment: "gpt-4".into(),
            api_version: "2024-02-15-preview".into(),
        })
    }

    #[tokio::test]
    async fn test_azure_complete_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/gpt-4/chat/completions"))
            .and(query_param("api-version", "2024-02-15-preview"))
            .and(header("api-key", "test-key"))
            .and(body_partial_json(json!({
                "max_tokens": 500,
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "merhaba"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let completion = client_for(&server)
            .complete("sys", "hello", Sampling::CLASSIFY)
            .await
            .unwrap();
        assert_eq!(completion.text, "merhaba");
    }

    #[tokio::test]
    async fn test_azure_complete_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete("sys", "hello", Sampling::FORMAT)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_azure_complete_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete("sys", "hello", Sampling::FORMAT)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_azure_complete_garbage_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .complete("sys", "hello", Sampling::FORMAT)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
    }

    #[tokio::test]
    async fn test_mock_returns_responses_in_order() {
        let mock = MockLlmClient::new(vec!["first".to_string(), "second".to_string()]);

        let completion1 = mock.complete("sys", "user", Sampling::CLASSIFY).await.unwrap();
        assert_eq!(completion1.text, "first");

        let completion2 = mock.complete("sys", "user", Sampling::CLASSIFY).await.unwrap();
        assert_eq!(completion2.text, "second");

        // Exhausted mocks behave like an unreachable endpoint.
        assert!(mock.complete("sys", "user", Sampling::CLASSIFY).await.is_err());
        assert_eq!(mock.calls.lock().unwrap().len(), 3);
    }

    // --- strip_markdown_fences ---

    #[test]
    fn test_strip_no_fences() {
        assert_eq!(strip_markdown_fences("hello"), "hello");
    }

    #[test]
    fn test_strip_json_fences() {
        assert_eq!(strip_markdown_fences("```json\n{}\n```"), "{}");
    }

    #[test]
    fn test_strip_bare_fences() {
        assert_eq!(strip_markdown_fences("```\nfoo\n```"), "foo");
    }
}
