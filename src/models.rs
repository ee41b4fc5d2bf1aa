use serde::Serialize;

use crate::error::{GenerationError, Stage};

/// Validated user input for one pipeline run.
///
/// Built only through [`crate::language::LanguagePolicy::validate`] outside of tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    language: String,
    task: String,
}

impl GenerationRequest {
    pub(crate) fn new(language: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            task: task.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn task(&self) -> &str {
        &self.task
    }
}

/// Generated implementation and its test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationResult {
    pub code: String,
    pub test: String,
}

/// Outcome of a single pipeline stage.
#[derive(Debug)]
pub enum StageOutcome {
    Ready(String),
    Failed(GenerationError),
    /// Not attempted because an earlier stage failed.
    Skipped,
}

impl StageOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            StageOutcome::Ready(text) => Some(text),
            _ => None,
        }
    }
}

/// Per-stage outcomes of one run, so callers can decide whether a
/// generated implementation is worth showing when its test failed.
///
/// Only the constructors below can build one, so a skipped test stage always
/// follows a failed code stage.
#[derive(Debug)]
pub struct StagedGeneration {
    code: StageOutcome,
    test: StageOutcome,
}

impl StagedGeneration {
    pub fn completed(code: String, test: String) -> Self {
        Self {
            code: StageOutcome::Ready(code),
            test: StageOutcome::Ready(test),
        }
    }

    pub fn code_failed(err: GenerationError) -> Self {
        Self {
            code: StageOutcome::Failed(err),
            test: StageOutcome::Skipped,
        }
    }

    pub fn test_failed(code: String, err: GenerationError) -> Self {
        Self {
            code: StageOutcome::Ready(code),
            test: StageOutcome::Failed(err),
        }
    }

    #[cfg(test)]
    pub fn code(&self) -> &StageOutcome {
        &self.code
    }

    #[cfg(test)]
    pub fn test(&self) -> &StageOutcome {
        &self.test
    }

    /// The first failure, with the stage it happened in.
    pub fn failed_stage(&self) -> Option<Stage> {
        if matches!(self.code, StageOutcome::Failed(_)) {
            Some(Stage::Code)
        } else if matches!(self.test, StageOutcome::Failed(_)) {
            Some(Stage::Test)
        } else {
            None
        }
    }

    /// Collapse into an all-or-nothing result. Any generated code is dropped
    /// when the test stage failed.
    pub fn into_result(self) -> Result<GenerationResult, GenerationError> {
        match (self.code, self.test) {
            (StageOutcome::Ready(code), StageOutcome::Ready(test)) => {
                Ok(GenerationResult { code, test })
            }
            (StageOutcome::Failed(err), _) | (_, StageOutcome::Failed(err)) => Err(err),
            _ => unreachable!("constructors never pair a skipped stage with a ready one"),
        }
    }

    /// Split into the generated code (if any) and the all-or-nothing result.
    pub fn into_partial(self) -> (Option<String>, Result<GenerationResult, GenerationError>) {
        let partial = self.code.text().map(str::to_string);
        (partial, self.into_result())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BackendError, ValidationError};

    #[test]
    fn test_into_result_success() {
        let staged = StagedGeneration::completed("code".into(), "test".into());
        assert_eq!(staged.failed_stage(), None);
        let result = staged.into_result().unwrap();
        assert_eq!(result.code, "code");
        assert_eq!(result.test, "test");
    }

    #[test]
    fn test_test_failure_discards_code_in_result() {
        let staged = StagedGeneration::test_failed(
            "code".into(),
            GenerationError::Backend {
                stage: Stage::Test,
                source: BackendError::malformed("Gemini", "empty"),
            },
        );
        assert_eq!(staged.failed_stage(), Some(Stage::Test));
        let (partial, result) = staged.into_partial();
        assert_eq!(partial.as_deref(), Some("code"));
        assert!(result.is_err());
    }

    #[test]
    fn test_code_failure() {
        let staged = StagedGeneration::code_failed(ValidationError::EmptyTask.into());
        assert_eq!(staged.failed_stage(), Some(Stage::Code));
        assert!(matches!(staged.test(), StageOutcome::Skipped));
        let (partial, result) = staged.into_partial();
        assert!(partial.is_none());
        assert!(result.unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_every_constructor_collapses_without_panic() {
        let err = || GenerationError::Backend {
            stage: Stage::Code,
            source: BackendError::malformed("Gemini", "empty"),
        };
        let shapes = [
            StagedGeneration::completed("c".into(), "t".into()),
            StagedGeneration::code_failed(err()),
            StagedGeneration::test_failed("c".into(), err()),
        ];
        let outcomes: Vec<bool> = shapes
            .into_iter()
            .map(|staged| staged.into_result().is_ok())
            .collect();
        assert_eq!(outcomes, [true, false, false]);
    }
}
