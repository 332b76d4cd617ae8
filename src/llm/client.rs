//! Async LLM client used by the remote intent oracle
//!
//! Model-agnostic HTTP client. Speaks the Anthropic messages format and the
//! OpenAI-compatible chat format (DeepSeek, OpenAI, local gateways). The LLM
//! only classifies commands; it never decides game outcomes.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::config::LlmSettings;
use crate::core::error::{EngineError, Result};

/// API format type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFormat {
    Anthropic,
    OpenAI,
}

/// Async LLM client for making API calls
pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    api_format: ApiFormat,
    max_retries: u32,
}

impl LlmClient {
    /// Create a client; `request_timeout` bounds each HTTP attempt
    pub fn new(settings: LlmSettings, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| EngineError::LlmError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_format: Self::detect_api_format(&settings.api_url),
            api_key: settings.api_key,
            api_url: settings.api_url,
            model: settings.model,
            max_retries: settings.max_retries,
        })
    }

    /// Create a client from `LLM_API_KEY`, `LLM_API_URL` and `LLM_MODEL`
    pub fn from_env(request_timeout: Duration) -> Result<Self> {
        Self::new(LlmSettings::from_env()?, request_timeout)
    }

    /// Detect API format from URL
    fn detect_api_format(url: &str) -> ApiFormat {
        if url.contains("anthropic.com") {
            ApiFormat::Anthropic
        } else {
            ApiFormat::OpenAI
        }
    }

    pub fn api_format(&self) -> ApiFormat {
        self.api_format
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a completion request, retrying transport failures
    ///
    /// API errors (non-2xx responses) are returned immediately; only
    /// connection-level failures are retried.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            let result = match self.api_format {
                ApiFormat::Anthropic => self.complete_anthropic(system, user).await,
                ApiFormat::OpenAI => self.complete_openai(system, user).await,
            };
            match result {
                Err(Attempt::Transport(e)) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::debug!("LLM request failed (attempt {}): {}", attempt, e);
                }
                Err(Attempt::Transport(e)) | Err(Attempt::Fatal(e)) => {
                    return Err(EngineError::LlmError(e))
                }
                Ok(text) => return Ok(text),
            }
        }
    }

    async fn complete_anthropic(
        &self,
        system: &str,
        user: &str,
    ) -> std::result::Result<String, Attempt> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: 512,
            system: system.into(),
            messages: vec![Message {
                role: "user".into(),
                content: user.into(),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Attempt::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Attempt::Fatal(format!("API error: {}", error_text)));
        }

        let completion: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| Attempt::Fatal(e.to_string()))?;

        completion
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| Attempt::Fatal("Empty response".into()))
    }

    async fn complete_openai(&self, system: &str, user: &str) -> std::result::Result<String, Attempt> {
        let request = OpenAIRequest {
            model: self.model.clone(),
            max_tokens: 512,
            temperature: 0.1,
            messages: vec![
                Message {
                    role: "system".into(),
                    content: system.into(),
                },
                Message {
                    role: "user".into(),
                    content: user.into(),
                },
            ],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Attempt::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Attempt::Fatal(format!("API error: {}", error_text)));
        }

        let completion: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| Attempt::Fatal(e.to_string()))?;

        completion
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| Attempt::Fatal("Empty response".into()))
    }
}

enum Attempt {
    /// Worth retrying
    Transport(String),
    Fatal(String),
}

// Anthropic API format
#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

// OpenAI-compatible API format
#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(url: &str) -> LlmSettings {
        LlmSettings {
            api_key: "test-key".into(),
            api_url: url.into(),
            model: "test-model".into(),
            max_retries: 0,
        }
    }

    #[test]
    fn test_client_creation() {
        let client =
            LlmClient::new(settings("https://api.example.com"), Duration::from_secs(5)).unwrap();
        assert_eq!(client.api_key, "test-key");
        assert_eq!(client.model(), "test-model");
        assert_eq!(client.api_format(), ApiFormat::OpenAI);
    }

    #[test]
    fn test_anthropic_url_detected() {
        let client = LlmClient::new(
            settings("https://api.anthropic.com/v1/messages"),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.api_format(), ApiFormat::Anthropic);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_llm_error() {
        let client =
            LlmClient::new(settings("http://127.0.0.1:9/v1/chat"), Duration::from_millis(500))
                .unwrap();
        let result = client.complete("system", "user").await;
        assert!(matches!(result, Err(EngineError::LlmError(_))));
    }
}
