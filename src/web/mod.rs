pub mod page;

use std::sync::Arc;

use anyhow::Result;
use axum::{
    Form, Json, Router,
    extract::State,
    http::StatusCode,
    response::Html,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crate::error::{GenerationError, Stage};
use crate::language::{LanguagePolicy, highlight_id};
use crate::llm_manager::LLMManager;
use crate::models::GenerationResult;
use crate::pipeline::Pipeline;
use page::{FormOutcome, PageView};

pub struct InnerAppState {
    pub llm: LLMManager,
    pub policy: LanguagePolicy,
}

pub type AppState = Arc<InnerAppState>;

/// Fields submitted by the page, either urlencoded or as JSON.
#[derive(Debug, Deserialize)]
pub struct GenerateForm {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub task: String,
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    language: String,
    highlight: String,
    code: String,
    test: String,
    generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    /// Banner text, identical to what the form page shows.
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<Stage>,
    /// Code from a run whose test stage failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    partial_code: Option<String>,
}

pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let app = build_router(state);
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/generate", post(generate_form))
        .route("/api/generate", post(generate_json))
        .route("/api/languages", get(languages))
        .route("/api/health", get(health))
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let languages = state.policy.languages();
    let selected = languages.first().map(String::as_str).unwrap_or_default();
    Html(page::render(&PageView {
        languages,
        selected,
        task: "",
        outcome: None,
    }))
}

async fn generate_form(State(state): State<AppState>, Form(input): Form<GenerateForm>) -> Html<String> {
    let outcome = match state.policy.validate(&input.language, &input.task) {
        Ok(request) => {
            info!("Form submission: {} / {}", request.language(), request.task());
            match Pipeline::new(&state.llm).run(&request).await {
                Ok(result) => FormOutcome::Generated(result),
                Err(err) => FormOutcome::Failed(banner_message(&err)),
            }
        }
        Err(err) => FormOutcome::Failed(banner_message(&err.into())),
    };
    Html(page::render(&PageView {
        languages: state.policy.languages(),
        selected: &input.language,
        task: &input.task,
        outcome: Some(outcome),
    }))
}

async fn generate_json(
    State(state): State<AppState>,
    Json(input): Json<GenerateForm>,
) -> Result<Json<GenerateResponse>, (StatusCode, Json<ErrorResponse>)> {
    match run(&state, &input).await {
        (_, Ok(result)) => Ok(Json(GenerateResponse {
            language: input.language.trim().to_string(),
            highlight: highlight_id(&input.language),
            code: result.code,
            test: result.test,
            generated_at: Utc::now(),
        })),
        (partial_code, Err(err)) => Err(to_error(err, partial_code)),
    }
}

async fn languages(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.policy.languages()))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Validate and run one API submission. Returns any generated code alongside
/// the all-or-nothing result.
async fn run(
    state: &AppState,
    input: &GenerateForm,
) -> (Option<String>, Result<GenerationResult, GenerationError>) {
    let request = match state.policy.validate(&input.language, &input.task) {
        Ok(request) => request,
        Err(err) => {
            info!("Rejected submission: {}", err);
            return (None, Err(err.into()));
        }
    };
    info!("API submission: {} / {}", request.language(), request.task());
    Pipeline::new(&state.llm)
        .run_staged(&request)
        .await
        .into_partial()
}

fn banner_message(err: &GenerationError) -> String {
    if err.is_invalid_input() {
        err.to_string()
    } else {
        format!("Error generating code: {err}")
    }
}

fn to_error(err: GenerationError, partial_code: Option<String>) -> (StatusCode, Json<ErrorResponse>) {
    let (status, stage) = match &err {
        GenerationError::Invalid(_) => (StatusCode::BAD_REQUEST, None),
        GenerationError::Prompt(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
        GenerationError::Backend { stage, .. } => (StatusCode::BAD_GATEWAY, Some(*stage)),
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            message: banner_message(&err),
            stage,
            partial_code,
        }),
    )
}
