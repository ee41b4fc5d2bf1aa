use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ProviderConfig;

pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod openai_compat;
pub mod openrouter;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAIProvider;
pub use openrouter::OpenRouterProvider;

/// Hosted backends the generator can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    OpenAI,
    Anthropic,
    OpenRouter,
}

impl ProviderKind {
    pub fn key(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAI => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenRouter => "openrouter",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-2.0-flash",
            ProviderKind::OpenAI => "gpt-4.1-mini",
            ProviderKind::Anthropic => "claude-sonnet-4-0",
            ProviderKind::OpenRouter => "deepseek/deepseek-r1-0528-qwen3-8b",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
            ProviderKind::OpenAI => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1",
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }

    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GOOGLE_API_KEY",
            ProviderKind::OpenAI => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::OpenRouter => "OPENROUTER_API_KEY",
        }
    }
}

/// Connection settings for one provider after applying defaults.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl ProviderSettings {
    pub fn resolve(kind: ProviderKind, config: &ProviderConfig) -> Self {
        Self {
            model: config
                .model
                .clone()
                .unwrap_or_else(|| kind.default_model().to_string()),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| kind.default_base_url().to_string())
                .trim_end_matches('/')
                .to_string(),
            temperature: config.temperature.unwrap_or(0.2),
            max_tokens: config.max_tokens.unwrap_or(8192),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "openai" => Ok(ProviderKind::OpenAI),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "openrouter" => Ok(ProviderKind::OpenRouter),
            other => Err(format!(
                "unknown provider '{other}' (expected gemini, openai, anthropic or openrouter)"
            )),
        }
    }
}
