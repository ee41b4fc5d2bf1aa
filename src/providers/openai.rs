use async_trait::async_trait;

use crate::error::BackendError;
use crate::llm_manager::{Completion, LLMProvider};
use crate::providers::ProviderSettings;
use crate::providers::openai_compat::ChatCompletionsClient;

/// OpenAI API provider implementation
pub struct OpenAIProvider {
    client: ChatCompletionsClient,
}

impl OpenAIProvider {
    pub fn new(api_key: String, settings: ProviderSettings) -> Self {
        Self {
            client: ChatCompletionsClient::new("OpenAI", api_key, settings),
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn name(&self) -> &str {
        self.client.provider()
    }

    fn model_name(&self) -> &str {
        self.client.model()
    }

    async fn send_prompt(&self, prompt: &str) -> Result<Completion, BackendError> {
        self.client.send(prompt).await
    }
}
