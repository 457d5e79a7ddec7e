//! Language-model backend.
//!
//! The core only needs one operation: send a system instruction and a user
//! message, get text back. [`CompletionBackend`] is that seam;
//! [`OpenAiClient`] implements it against an OpenAI-compatible
//! `/chat/completions` endpoint.

use crate::config::env::BackendCredentials;
use crate::config::settings::LanguageModelSettings;
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// One request/response completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System instruction
    pub system: String,
    /// User message
    pub user: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Optional cap on generated tokens
    pub max_tokens: Option<u32>,
    /// Ask the backend for a JSON object instead of free text
    pub json_output: bool,
}

/// Anything that can turn a [`CompletionRequest`] into generated text.
pub trait CompletionBackend: Send + Sync + 'static {
    /// Runs a single completion. No retries.
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// HTTP client for an OpenAI-compatible chat completions API.
///
/// Built even when credentials are missing; every call then fails with
/// [`Error::Config`].
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    credentials: Option<BackendCredentials>,
    model: String,
}

impl OpenAiClient {
    /// Creates a client with the transport timeout from `settings`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built (TLS backend init).
    pub fn new(
        credentials: Option<BackendCredentials>,
        settings: &LanguageModelSettings,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()?;
        Ok(Self {
            http,
            credentials,
            model: settings.model.clone(),
        })
    }

    fn credentials(&self) -> Result<&BackendCredentials> {
        self.credentials.as_ref().ok_or_else(|| Error::Config {
            message: "language model backend is not configured".to_string(),
        })
    }
}

impl CompletionBackend for OpenAiClient {
    #[instrument(skip(self, request), fields(model = %self.model, json = request.json_output))]
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let credentials = self.credentials()?;
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_output.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let url = format!("{}/chat/completions", credentials.url.trim_end_matches('/'));
        let response = self
            .http
            .post(url)
            .bearer_auth(&credentials.key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::LanguageModel {
                message: format!("backend returned {status}: {detail}"),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::LanguageModel {
                message: "response contained no completion".to_string(),
            })?;
        debug!(chars = content.len(), "Completion received");
        Ok(content)
    }
}
