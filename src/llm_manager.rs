use crate::config::Config;
use crate::error::BackendError;
use crate::event_bus::{Event, EventBus};
use crate::providers::{
    AnthropicProvider, GeminiProvider, OpenAIProvider, OpenRouterProvider, ProviderKind,
    ProviderSettings,
};
use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;

/// Token counts reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

/// Text returned by a backend for one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

impl Completion {
    #[cfg(test)]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// Trait representing an LLM provider.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Name of the provider.
    fn name(&self) -> &str;

    /// Model name of the provider.
    fn model_name(&self) -> &str {
        "Unknown"
    }

    /// Send a prompt to the provider and return the response.
    async fn send_prompt(&self, prompt: &str) -> Result<Completion, BackendError>;
}

/// Wraps the active provider with event reporting and cost accounting.
pub struct LLMManager {
    provider: Box<dyn LLMProvider>,
    event_bus: Option<Arc<EventBus>>,
    cost_per_1m_input_tokens: f32,
    cost_per_1m_output_tokens: f32,
}

impl LLMManager {
    pub fn new(provider: Box<dyn LLMProvider>) -> Self {
        Self {
            provider,
            event_bus: None,
            cost_per_1m_input_tokens: 0.0,
            cost_per_1m_output_tokens: 0.0,
        }
    }

    /// Build the provider selected in `config`, reading its API key once.
    pub fn from_config(config: &Config) -> Result<Self, BackendError> {
        let kind = config.provider;
        let provider_config = config.provider_config(kind);
        let api_key = config.resolve_api_key(kind)?;
        let settings = ProviderSettings::resolve(kind, &provider_config);
        debug!("Using {} model {} at {}", kind, settings.model, settings.base_url);

        let provider: Box<dyn LLMProvider> = match kind {
            ProviderKind::Gemini => Box::new(GeminiProvider::new(api_key, settings)),
            ProviderKind::OpenAI => Box::new(OpenAIProvider::new(api_key, settings)),
            ProviderKind::OpenRouter => Box::new(OpenRouterProvider::new(api_key, settings)),
            ProviderKind::Anthropic => Box::new(AnthropicProvider::new(api_key, settings)),
        };

        Ok(Self::new(provider).with_pricing(
            provider_config.cost_per_1m_input_tokens.unwrap_or(0.0),
            provider_config.cost_per_1m_output_tokens.unwrap_or(0.0),
        ))
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn with_pricing(mut self, input_per_1m: f32, output_per_1m: f32) -> Self {
        self.cost_per_1m_input_tokens = input_per_1m;
        self.cost_per_1m_output_tokens = output_per_1m;
        self
    }

    /// Get the active provider.
    pub fn provider(&self) -> &dyn LLMProvider {
        &*self.provider
    }

    pub fn event_bus(&self) -> Option<&Arc<EventBus>> {
        self.event_bus.as_ref()
    }

    /// Send one prompt to the active provider and return the generated text.
    pub async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let provider = &self.provider;

        if let Some(bus) = &self.event_bus {
            let _ = bus
                .emit(Event::APICallStarted {
                    provider: provider.name().to_string(),
                    model: provider.model_name().to_string(),
                })
                .await;
        }

        let result = provider.send_prompt(prompt).await;

        match &result {
            Ok(completion) => {
                // Rough estimate when the backend reports nothing: 1 token ≈ 4 characters
                let usage = completion.usage.unwrap_or(TokenUsage {
                    prompt_tokens: prompt.len() / 4,
                    completion_tokens: completion.text.len() / 4,
                });
                let cost = self.calculate_cost(usage.prompt_tokens, usage.completion_tokens);
                debug!(
                    "{} call completed: {} prompt + {} completion tokens, ${:.6}",
                    provider.name(),
                    usage.prompt_tokens,
                    usage.completion_tokens,
                    cost
                );
                if let Some(bus) = &self.event_bus {
                    let _ = bus
                        .emit(Event::APICallCompleted {
                            provider: provider.name().to_string(),
                            tokens: usage.prompt_tokens + usage.completion_tokens,
                            cost,
                        })
                        .await;
                }
            }
            Err(e) => {
                warn!("{} call failed: {}", provider.name(), e);
                if let Some(bus) = &self.event_bus {
                    let _ = bus
                        .emit(Event::APIError {
                            provider: provider.name().to_string(),
                            error: e.to_string(),
                        })
                        .await;
                }
            }
        }

        result.map(|completion| completion.text)
    }

    fn calculate_cost(&self, input_tokens: usize, output_tokens: usize) -> f32 {
        let input_cost = self.cost_per_1m_input_tokens * (input_tokens as f32) / 1_000_000.0;
        let output_cost = self.cost_per_1m_output_tokens * (output_tokens as f32) / 1_000_000.0;
        input_cost + output_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProvider {
        reply: Result<Completion, u16>,
    }

    #[async_trait]
    impl LLMProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn send_prompt(&self, _prompt: &str) -> Result<Completion, BackendError> {
            match &self.reply {
                Ok(completion) => Ok(completion.clone()),
                Err(status) => Err(BackendError::from_status("fixed", *status, "nope".into())),
            }
        }
    }

    #[tokio::test]
    async fn test_generate_uses_reported_usage_for_cost() {
        let bus = Arc::new(EventBus::new(16));
        let manager = LLMManager::new(Box::new(FixedProvider {
            reply: Ok(Completion {
                text: "print(1)".into(),
                usage: Some(TokenUsage {
                    prompt_tokens: 1_000_000,
                    completion_tokens: 500_000,
                }),
            }),
        }))
        .with_event_bus(bus.clone())
        .with_pricing(1.0, 4.0);

        let text = manager.generate("prompt").await.unwrap();
        assert_eq!(text, "print(1)");

        let metrics = bus.get_metrics().await;
        assert_eq!(metrics.total_api_calls, 1);
        assert_eq!(metrics.total_tokens, 1_500_000);
        assert!((metrics.total_cost - 3.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_generate_estimates_tokens_without_usage() {
        let bus = Arc::new(EventBus::new(16));
        let manager = LLMManager::new(Box::new(FixedProvider {
            reply: Ok(Completion::text("12345678")),
        }))
        .with_event_bus(bus.clone());

        manager.generate("abcdefghijkl").await.unwrap();
        assert_eq!(bus.get_metrics().await.total_tokens, 5);
    }

    #[tokio::test]
    async fn test_generate_reports_errors() {
        let bus = Arc::new(EventBus::new(16));
        let mut receiver = bus.subscribe();
        let manager =
            LLMManager::new(Box::new(FixedProvider { reply: Err(429) })).with_event_bus(bus.clone());

        let err = manager.generate("prompt").await.unwrap_err();
        assert!(matches!(err, BackendError::RateLimited { .. }));

        assert!(matches!(receiver.recv().await.unwrap(), Event::APICallStarted { .. }));
        match receiver.recv().await.unwrap() {
            Event::APIError { provider, error } => {
                assert_eq!(provider, "fixed");
                assert!(error.contains("rate limit"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(bus.get_metrics().await.api_errors, 1);
    }

    #[test]
    fn test_from_config_requires_credential() {
        let mut config = Config::default();
        config.ai_providers.gemini = Some(crate::config::ProviderConfig {
            api_key_env: Some("PAIRGEN_TEST_NO_SUCH_GEMINI_KEY".into()),
            ..Default::default()
        });
        match LLMManager::from_config(&config) {
            Err(BackendError::MissingCredential { var, .. }) => {
                assert_eq!(var, "PAIRGEN_TEST_NO_SUCH_GEMINI_KEY")
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected a missing credential error"),
        }
    }
}
