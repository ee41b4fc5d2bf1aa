use async_trait::async_trait;
use log::warn;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::llm_manager::{Completion, LLMProvider, TokenUsage};
use crate::providers::ProviderSettings;
use crate::providers::openai_compat::error_message;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: String,
    #[serde(rename = "type")]
    content_type: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: usize,
    output_tokens: usize,
}

/// Anthropic Claude API provider implementation
pub struct AnthropicProvider {
    api_key: String,
    settings: ProviderSettings,
    client: Client,
}

impl AnthropicProvider {
    pub fn new(api_key: String, settings: ProviderSettings) -> Self {
        Self {
            api_key,
            settings,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "Anthropic"
    }

    fn model_name(&self) -> &str {
        &self.settings.model
    }

    async fn send_prompt(&self, prompt: &str) -> Result<Completion, BackendError> {
        let request = AnthropicRequest {
            model: &self.settings.model,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let response = self
            .client
            .post(format!("{}/messages", self.settings.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(BackendError::from_status(
                self.name(),
                status.as_u16(),
                error_message(&body),
            ));
        }

        let api_response: AnthropicResponse = serde_json::from_str(&body)
            .map_err(|e| BackendError::malformed(self.name(), e.to_string()))?;

        match api_response.stop_reason.as_deref() {
            Some("max_tokens") => warn!(
                "Anthropic response was truncated due to max_tokens limit ({}). Response may be incomplete.",
                self.settings.max_tokens
            ),
            Some("end_turn") | None => {}
            Some(other) => warn!("Anthropic response stopped with reason: {}", other),
        }

        let usage = api_response.usage.map(|u| TokenUsage {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
        });

        api_response
            .content
            .into_iter()
            .find(|c| c.content_type == "text")
            .map(|c| Completion { text: c.text, usage })
            .ok_or_else(|| BackendError::malformed(self.name(), "no text content in response"))
    }
}
