use std::fmt;

use thiserror::Error;

/// Pipeline step that produced an outcome or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Code,
    Test,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Code => write!(f, "code generation"),
            Stage::Test => write!(f, "test generation"),
        }
    }
}

/// Errors raised while parsing or rendering a prompt template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    #[error("missing value for prompt variable '{0}'")]
    MissingVariable(String),

    #[error("malformed prompt template at byte {position}: {reason}")]
    Malformed { position: usize, reason: String },
}

/// Rejected user input. Both entry points share these checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("please enter a task description")]
    EmptyTask,

    #[error("unsupported language '{language}' (supported: {supported})")]
    UnsupportedLanguage { language: String, supported: String },
}

/// Failure talking to a hosted text-generation backend.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("{provider} API key not found: set the {var} environment variable")]
    MissingCredential { provider: String, var: String },

    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{provider} rejected the credentials: {message}")]
    Unauthorized { provider: String, message: String },

    #[error("{provider} rate limit exceeded: {message}")]
    RateLimited { provider: String, message: String },

    #[error("{provider} API error (status {status}): {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("malformed {provider} response: {message}")]
    MalformedResponse { provider: String, message: String },
}

impl BackendError {
    /// Classify a non-success HTTP status into the matching variant.
    pub fn from_status(provider: &str, status: u16, message: String) -> Self {
        let provider = provider.to_string();
        match status {
            401 | 403 => BackendError::Unauthorized { provider, message },
            429 => BackendError::RateLimited { provider, message },
            _ => BackendError::Api {
                provider,
                status,
                message,
            },
        }
    }

    pub fn malformed(provider: &str, message: impl Into<String>) -> Self {
        BackendError::MalformedResponse {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

/// The single failure kind surfaced to users of either entry point.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error("{stage} failed: {source}")]
    Backend {
        stage: Stage,
        #[source]
        source: BackendError,
    },
}

impl GenerationError {
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, GenerationError::Invalid(_))
    }
}
