use log::{debug, info};
use uuid::Uuid;

use crate::error::{GenerationError, Stage};
use crate::event_bus::Event;
use crate::llm_manager::LLMManager;
use crate::models::{GenerationRequest, GenerationResult, StagedGeneration};
use crate::prompt::{PromptTemplate, code_template, test_template};

/// Generates an implementation, then a test for that implementation.
///
/// The two backend calls are strictly sequential: the test prompt embeds the
/// generated code verbatim.
pub struct Pipeline<'a> {
    llm: &'a LLMManager,
    code_prompt: PromptTemplate,
    test_prompt: PromptTemplate,
}

impl<'a> Pipeline<'a> {
    pub fn new(llm: &'a LLMManager) -> Self {
        Self {
            llm,
            code_prompt: code_template(),
            test_prompt: test_template(),
        }
    }

    /// Run both stages. Any failure aborts the run and no result is produced.
    pub async fn run(&self, request: &GenerationRequest) -> Result<GenerationResult, GenerationError> {
        self.run_staged(request).await.into_result()
    }

    /// Run both stages and report each stage's outcome separately.
    pub async fn run_staged(&self, request: &GenerationRequest) -> StagedGeneration {
        let run_id = Uuid::new_v4().to_string();
        info!("[{}] Generating {} code for: {}", run_id, request.language(), request.task());
        self.emit(Event::GenerationStarted {
            run_id: run_id.clone(),
            language: request.language().to_string(),
        })
        .await;

        let code_values = [("language", request.language()), ("task", request.task())];
        let code = match self
            .stage(&run_id, Stage::Code, &self.code_prompt, &code_values)
            .await
        {
            Ok(code) => code,
            Err(err) => {
                self.finish_failed(&run_id, &err).await;
                return StagedGeneration::code_failed(err);
            }
        };

        let test_values = [("language", request.language()), ("code", code.as_str())];
        match self
            .stage(&run_id, Stage::Test, &self.test_prompt, &test_values)
            .await
        {
            Ok(test) => {
                info!("[{}] Generation complete", run_id);
                self.emit(Event::GenerationCompleted { run_id }).await;
                StagedGeneration::completed(code, test)
            }
            Err(err) => {
                self.finish_failed(&run_id, &err).await;
                StagedGeneration::test_failed(code, err)
            }
        }
    }

    async fn stage(
        &self,
        run_id: &str,
        stage: Stage,
        template: &PromptTemplate,
        values: &[(&str, &str)],
    ) -> Result<String, GenerationError> {
        self.emit(Event::StageStarted {
            run_id: run_id.to_string(),
            stage: stage.to_string(),
        })
        .await;

        let result = match template.render(values) {
            Ok(prompt) => {
                debug!("[{}] {} prompt:\n{}", run_id, stage, prompt);
                self.llm
                    .generate(&prompt)
                    .await
                    .map_err(|source| GenerationError::Backend { stage, source })
            }
            Err(err) => Err(err.into()),
        };

        let event = match &result {
            Ok(text) => Event::StageCompleted {
                run_id: run_id.to_string(),
                stage: stage.to_string(),
                chars: text.len(),
            },
            Err(err) => Event::StageFailed {
                run_id: run_id.to_string(),
                stage: stage.to_string(),
                error: err.to_string(),
            },
        };
        self.emit(event).await;
        result
    }

    async fn finish_failed(&self, run_id: &str, err: &GenerationError) {
        info!("[{}] Generation failed: {}", run_id, err);
        self.emit(Event::GenerationFailed {
            run_id: run_id.to_string(),
            error: err.to_string(),
        })
        .await;
    }

    async fn emit(&self, event: Event) {
        if let Some(bus) = self.llm.event_bus() {
            let _ = bus.emit(event).await;
        }
    }
}
