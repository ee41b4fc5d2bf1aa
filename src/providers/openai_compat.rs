use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::llm_manager::{Completion, TokenUsage};
use crate::providers::ProviderSettings;

/// Client for `/chat/completions` endpoints speaking the OpenAI wire format.
///
/// Gemini, OpenAI and OpenRouter all expose this shape; they differ only in
/// base URL, default model and a few extra headers.
pub struct ChatCompletionsClient {
    provider: &'static str,
    api_key: String,
    settings: ProviderSettings,
    extra_headers: Vec<(&'static str, String)>,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

impl ChatCompletionsClient {
    pub fn new(provider: &'static str, api_key: String, settings: ProviderSettings) -> Self {
        Self {
            provider,
            api_key,
            settings,
            extra_headers: Vec::new(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.extra_headers.push((name, value.into()));
        self
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub async fn send(&self, prompt: &str) -> Result<Completion, BackendError> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            stream: false,
        };

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.settings.base_url))
            .bearer_auth(&self.api_key)
            .json(&request);
        for (name, value) in &self.extra_headers {
            builder = builder.header(*name, value);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(BackendError::from_status(
                self.provider,
                status.as_u16(),
                error_message(&body),
            ));
        }

        debug!("Raw {} response: {}", self.provider, body);
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| BackendError::malformed(self.provider, e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::malformed(self.provider, "no choices in response"))?;

        if choice.finish_reason.as_deref() == Some("length") {
            warn!(
                "{} response was truncated at the max_tokens limit ({}). Output may be incomplete.",
                self.provider, self.settings.max_tokens
            );
        }

        let text = choice
            .message
            .content
            .ok_or_else(|| BackendError::malformed(self.provider, "response message has no content"))?;

        Ok(Completion {
            text,
            usage: parsed.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            }),
        })
    }
}

/// Best-effort human readable message from an error body.
///
/// Handles `{"error": {"message": ..}}`, the list-wrapped variant some
/// gateways return, and falls back to the raw body.
pub(crate) fn error_message(body: &str) -> String {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return body.trim().to_string(),
    };
    let error = if value.is_array() { &value[0]["error"] } else { &value["error"] };
    if let Some(message) = error["message"].as_str() {
        return message.to_string();
    }
    if let Some(message) = error.as_str() {
        return message.to_string();
    }
    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::test_support::spawn_stub;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    fn settings(base_url: String) -> ProviderSettings {
        ProviderSettings {
            model: "test-model".into(),
            base_url,
            temperature: 0.2,
            max_tokens: 256,
        }
    }

    async fn stub(status: StatusCode, reply: Value) -> (String, Arc<Mutex<Vec<(HeaderMap, Value)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let app = Router::new().route(
            "/chat/completions",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let recorder = recorder.clone();
                let reply = reply.clone();
                async move {
                    recorder.lock().unwrap().push((headers, body));
                    (status, Json(reply))
                }
            }),
        );
        (spawn_stub(app).await, seen)
    }

    #[tokio::test]
    async fn test_send_success() {
        let (url, seen) = stub(
            StatusCode::OK,
            json!({
                "choices": [{"message": {"role": "assistant", "content": "def f(): pass"}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
            }),
        )
        .await;

        let client = ChatCompletionsClient::new("Gemini", "secret".into(), settings(url))
            .with_header("X-Title", "pairgen");
        let completion = client.send("Write a python code").await.unwrap();
        assert_eq!(completion.text, "def f(): pass");
        assert_eq!(
            completion.usage,
            Some(TokenUsage {
                prompt_tokens: 12,
                completion_tokens: 4
            })
        );

        let seen = seen.lock().unwrap();
        let (headers, body) = &seen[0];
        assert_eq!(headers["authorization"], "Bearer secret");
        assert_eq!(headers["x-title"], "pairgen");
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Write a python code");
        assert_eq!(body["stream"], false);
    }

    #[tokio::test]
    async fn test_send_unauthorized() {
        let (url, _) = stub(
            StatusCode::UNAUTHORIZED,
            json!({"error": {"message": "API key not valid", "type": "invalid_request_error"}}),
        )
        .await;
        let client = ChatCompletionsClient::new("Gemini", "bad".into(), settings(url));
        match client.send("hi").await.unwrap_err() {
            BackendError::Unauthorized { provider, message } => {
                assert_eq!(provider, "Gemini");
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_rate_limited_list_body() {
        let (url, _) = stub(
            StatusCode::TOO_MANY_REQUESTS,
            json!([{"error": {"code": 429, "message": "Resource has been exhausted"}}]),
        )
        .await;
        let client = ChatCompletionsClient::new("Gemini", "k".into(), settings(url));
        match client.send("hi").await.unwrap_err() {
            BackendError::RateLimited { message, .. } => {
                assert_eq!(message, "Resource has been exhausted")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_without_choices_is_malformed() {
        let (url, _) = stub(StatusCode::OK, json!({"choices": []})).await;
        let client = ChatCompletionsClient::new("OpenAI", "k".into(), settings(url));
        assert!(matches!(
            client.send("hi").await.unwrap_err(),
            BackendError::MalformedResponse { .. }
        ));
    }

    #[tokio::test]
    async fn test_send_null_content_is_malformed() {
        let (url, _) = stub(
            StatusCode::OK,
            json!({"choices": [{"message": {"content": null}, "finish_reason": "content_filter"}]}),
        )
        .await;
        let client = ChatCompletionsClient::new("OpenAI", "k".into(), settings(url));
        assert!(matches!(
            client.send("hi").await.unwrap_err(),
            BackendError::MalformedResponse { .. }
        ));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let client = ChatCompletionsClient::new(
            "OpenAI",
            "k".into(),
            settings("http://127.0.0.1:1".into()),
        );
        assert!(matches!(
            client.send("hi").await.unwrap_err(),
            BackendError::Network(_)
        ));
    }

    #[test]
    fn test_error_message_fallbacks() {
        assert_eq!(error_message("  plain text  "), "plain text");
        assert_eq!(error_message(r#"{"error": "quota"}"#), "quota");
        assert_eq!(error_message(r#"{"detail": "x"}"#), r#"{"detail": "x"}"#);
    }
}
