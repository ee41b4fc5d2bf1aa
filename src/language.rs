use crate::config::GenerationConfig;
use crate::error::ValidationError;
use crate::models::GenerationRequest;

/// Accepted target languages, shared by the CLI and the web form.
#[derive(Debug, Clone)]
pub struct LanguagePolicy {
    languages: Vec<String>,
}

impl LanguagePolicy {
    pub fn new(languages: Vec<String>) -> Self {
        Self { languages }
    }

    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::new(config.languages.clone())
    }

    /// Display names in configured order.
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// Check user input and build a request from it.
    ///
    /// Language matching ignores case and surrounding whitespace, but the
    /// request keeps the user's spelling so prompts read the way they typed it.
    pub fn validate(&self, language: &str, task: &str) -> Result<GenerationRequest, ValidationError> {
        if task.trim().is_empty() {
            return Err(ValidationError::EmptyTask);
        }
        let language = language.trim();
        if self.canonical(language).is_none() {
            return Err(ValidationError::UnsupportedLanguage {
                language: language.to_string(),
                supported: self.languages.join(", "),
            });
        }
        Ok(GenerationRequest::new(language, task))
    }

    /// Configured display name matching `language`, if any.
    pub fn canonical(&self, language: &str) -> Option<&str> {
        let wanted = language.trim();
        self.languages
            .iter()
            .find(|l| l.eq_ignore_ascii_case(wanted))
            .map(String::as_str)
    }
}

/// Syntax-highlighting class for a language name.
pub fn highlight_id(language: &str) -> String {
    match language.trim().to_lowercase().as_str() {
        "c++" | "cpp" => "cpp".to_string(),
        "c#" | "csharp" => "csharp".to_string(),
        "f#" => "fsharp".to_string(),
        "objective-c" => "objectivec".to_string(),
        other => other
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect(),
    }
}
