//! OpenAI-compatible chat completions client for the writing assistant.

use std::sync::Arc;

use praxis_config::LlmConfig;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM is not configured")]
    NotConfigured,
    #[error("LLM request failed: {0}")]
    Request(String),
    #[error("LLM returned no content")]
    EmptyResponse,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    config: Arc<LlmConfig>,
}

impl LlmClient {
    #[must_use]
    pub fn new(http: reqwest::Client, config: LlmConfig) -> Self {
        Self {
            http,
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Run a single system + user prompt and return the reply text.
    ///
    /// # Errors
    ///
    /// `LlmError::NotConfigured` without an API key, `Request` on transport
    /// or HTTP failures, `EmptyResponse` when no choice carries content.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        if !self.is_configured() {
            return Err(LlmError::NotConfigured);
        }

        let resp = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({
                "model": self.config.model,
                "max_tokens": self.config.max_tokens,
                "messages": [
                    { "role": "system", "content": system },
                    { "role": "user", "content": user },
                ],
            }))
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let body: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Request(format!("invalid response: {e}")))?;

        body.choices
            .into_iter()
            .find_map(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}
