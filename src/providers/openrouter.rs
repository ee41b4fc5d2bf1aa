use async_trait::async_trait;

use crate::error::BackendError;
use crate::llm_manager::{Completion, LLMProvider};
use crate::providers::ProviderSettings;
use crate::providers::openai_compat::ChatCompletionsClient;

pub struct OpenRouterProvider {
    client: ChatCompletionsClient,
}

impl OpenRouterProvider {
    pub fn new(api_key: String, settings: ProviderSettings) -> Self {
        let client = ChatCompletionsClient::new("OpenRouter", api_key, settings)
            .with_header("X-Title", "pairgen");
        Self { client }
    }
}

#[async_trait]
impl LLMProvider for OpenRouterProvider {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::providers::ProviderKind;

    #[test]
    fn test_names_come_from_client() {
        let config = ProviderConfig {
            model: Some("meta-llama/llama-3-70b".into()),
            ..ProviderConfig::default()
        };
        let settings = ProviderSettings::resolve(ProviderKind::OpenRouter, &config);
        let provider = OpenRouterProvider::new("key".into(), settings);
        assert_eq!(provider.name(), "OpenRouter");
        assert_eq!(provider.model_name(), "meta-llama/llama-3-70b");
    }
}
