use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::providers::ProviderKind;

/// Main configuration structure for pairgen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Backend used for both pipeline stages
    #[serde(default)]
    pub provider: ProviderKind,

    /// AI provider configurations
    #[serde(default)]
    pub ai_providers: AIProvidersConfig,

    /// Input validation
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Web form server
    #[serde(default)]
    pub server: ServerConfig,

    /// Terminal display configuration
    #[serde(default)]
    pub ui: UIConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AIProvidersConfig {
    pub gemini: Option<ProviderConfig>,
    pub openai: Option<ProviderConfig>,
    pub anthropic: Option<ProviderConfig>,
    pub openrouter: Option<ProviderConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Model to use
    pub model: Option<String>,

    /// Temperature setting
    pub temperature: Option<f32>,

    /// Upper bound on generated tokens per call
    pub max_tokens: Option<usize>,

    /// Override for the API endpoint (proxies, compatible gateways)
    pub base_url: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: Option<String>,

    pub cost_per_1m_input_tokens: Option<f32>,
    pub cost_per_1m_output_tokens: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Languages accepted by both the CLI and the web form
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UIConfig {
    /// Enable colorful output
    #[serde(default = "default_colorful")]
    pub colorful: bool,

    /// Show a spinner while a backend call is in flight
    #[serde(default = "default_progress_bars")]
    pub progress_bars: bool,
}

// Default value functions
fn default_languages() -> Vec<String> {
    [
        "Python",
        "C++",
        "TypeScript",
        "C",
        "Java",
        "Ruby",
        "Go",
        "Rust",
        "JavaScript",
        "PHP",
        "Swift",
        "Kotlin",
        "C#",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_bind() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8501 }
fn default_colorful() -> bool { true }
fn default_progress_bars() -> bool { true }

impl Default for GenerationConfig {
    fn default() -> Self {
        Self { languages: default_languages() }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            colorful: default_colorful(),
            progress_bars: default_progress_bars(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: ProviderKind::Gemini,
            ai_providers: AIProvidersConfig {
                gemini: Some(ProviderConfig {
                    model: Some(ProviderKind::Gemini.default_model().to_string()),
                    temperature: Some(0.2),
                    ..Default::default()
                }),
                ..Default::default()
            },
            generation: GenerationConfig::default(),
            server: ServerConfig::default(),
            ui: UIConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))
    }

    /// Load configuration from command line argument or default locations
    pub fn load(config_path: &Option<String>) -> Result<Self> {
        if let Some(path) = config_path {
            let expanded = shellexpand::tilde(path);
            return Self::from_file(expanded.as_ref());
        }

        let default_paths = ["pairgen.toml", ".pairgen.toml", "~/.config/pairgen/config.toml"];

        for path in default_paths {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                match Self::from_file(expanded_path.as_ref()) {
                    Ok(config) => {
                        log::info!("Loaded configuration from {}", path);
                        return Ok(config);
                    }
                    Err(e) => log::warn!("Failed to load config from {}: {:#}", path, e),
                }
            }
        }

        Ok(Self::default())
    }

    /// Merge with command-line arguments (CLI args take precedence)
    pub fn merge_with_args(
        &mut self,
        headless: bool,
        provider: Option<ProviderKind>,
        model: Option<String>,
    ) {
        if headless {
            self.ui.colorful = false;
            self.ui.progress_bars = false;
        }
        if let Some(provider) = provider {
            self.provider = provider;
        }
        if let Some(model) = model {
            self.provider_config_mut(self.provider).model = Some(model);
        }
    }

    /// Settings for a provider, empty when the file has no section for it.
    pub fn provider_config(&self, kind: ProviderKind) -> ProviderConfig {
        let section = match kind {
            ProviderKind::Gemini => &self.ai_providers.gemini,
            ProviderKind::OpenAI => &self.ai_providers.openai,
            ProviderKind::Anthropic => &self.ai_providers.anthropic,
            ProviderKind::OpenRouter => &self.ai_providers.openrouter,
        };
        section.clone().unwrap_or_default()
    }

    fn provider_config_mut(&mut self, kind: ProviderKind) -> &mut ProviderConfig {
        let section = match kind {
            ProviderKind::Gemini => &mut self.ai_providers.gemini,
            ProviderKind::OpenAI => &mut self.ai_providers.openai,
            ProviderKind::Anthropic => &mut self.ai_providers.anthropic,
            ProviderKind::OpenRouter => &mut self.ai_providers.openrouter,
        };
        section.get_or_insert_with(ProviderConfig::default)
    }

    /// Read the API key for `kind` from the process environment.
    ///
    /// This is the only place credentials are looked up; providers receive the
    /// key through their constructors.
    pub fn resolve_api_key(&self, kind: ProviderKind) -> Result<String, BackendError> {
        let var = self
            .provider_config(kind)
            .api_key_env
            .unwrap_or_else(|| kind.default_api_key_env().to_string());
        match env::var(&var) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(BackendError::MissingCredential {
                provider: kind.to_string(),
                var,
            }),
        }
    }
}
