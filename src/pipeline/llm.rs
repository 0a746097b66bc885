//! Chat-completion call: build the two-turn request and send it once.
//!
//! The request is plain: one system turn, one user turn,
//! low temperature, no streaming. There is no retry loop. A failed call ends
//! the run, and the failure is classified so the operator can tell a network
//! problem from a rejected request from anything else:
//!
//! | failure | error |
//! |---------|-------|
//! | transport (DNS, connect, TLS, timeout, body read) | [`Invoice2XmlError::ConnectionFailure`] |
//! | HTTP 400 / 402 / 422 | [`Invoice2XmlError::RequestRejected`] |
//! | other non-2xx, undecodable JSON | [`Invoice2XmlError::UnexpectedApiFailure`] |
//! | no choices / blank content | [`Invoice2XmlError::EmptyResponse`] |

use crate::config::PipelineConfig;
use crate::error::Invoice2XmlError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

// ── Request / response wire types ────────────────────────────────────────

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Body of `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: usize,
    pub stream: bool,
}

impl ChatRequest {
    /// System prompt from `config`, `user_message` as the user turn.
    pub fn from_config(config: &PipelineConfig, user_message: &str) -> Self {
        Self {
            model: config.model.clone(),
            messages: vec![
                ChatMessage::system(config.system_prompt.as_str()),
                ChatMessage::user(user_message),
            ],
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            stream: false,
        }
    }
}

/// Token accounting reported by the server, when it reports any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// The model's reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Reply text, exactly as returned.
    pub content: String,
    pub usage: Option<TokenUsage>,
}

// ── Provider seam ────────────────────────────────────────────────────────

/// Anything that can answer a [`ChatRequest`].
///
/// [`OpenAiCompatibleClient`] is the production implementation; tests plug
/// in stubs to count calls or return canned replies.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<Completion, Invoice2XmlError>;
}

/// Send `request` through `provider` once and reject blank replies.
pub async fn request_completion(
    provider: &dyn CompletionProvider,
    request: &ChatRequest,
) -> Result<Completion, Invoice2XmlError> {
    info!("Requesting completion from model {}", request.model);
    let completion = provider.complete(request).await?;

    if completion.content.trim().is_empty() {
        return Err(Invoice2XmlError::EmptyResponse {
            detail: "El contenido de la respuesta está vacío.".to_string(),
        });
    }

    if let Some(usage) = completion.usage {
        debug!(
            "Usage: {} prompt + {} completion = {} tokens",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        );
    }
    Ok(completion)
}

// ── HTTP client ──────────────────────────────────────────────────────────

/// OpenAI-compatible `/chat/completions` client (DeepSeek by default).
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl OpenAiCompatibleClient {
    /// Client for `{base_url}/chat/completions`.
    ///
    /// `timeout_secs = None` keeps reqwest's default (no overall timeout).
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, Invoice2XmlError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| Invoice2XmlError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
        })
    }

    /// Client built from the endpoint, key and timeout in `config`.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, Invoice2XmlError> {
        Self::new(
            &config.base_url,
            config.api_key.clone().unwrap_or_default(),
            config.api_timeout_secs,
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleClient {
    async fn complete(&self, request: &ChatRequest) -> Result<Completion, Invoice2XmlError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| Invoice2XmlError::ConnectionFailure {
                detail: e.to_string(),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Invoice2XmlError::ConnectionFailure {
                detail: e.to_string(),
            })?;

        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        parse_completion(&body)
    }
}

/// Map a non-success status to the matching failure kind.
fn classify_status(status: StatusCode, body: &str) -> Invoice2XmlError {
    let message = api_error_message(body);
    match status {
        StatusCode::BAD_REQUEST
        | StatusCode::PAYMENT_REQUIRED
        | StatusCode::UNPROCESSABLE_ENTITY => Invoice2XmlError::RequestRejected {
            status: status.as_u16(),
            message,
        },
        _ => Invoice2XmlError::UnexpectedApiFailure {
            detail: format!("HTTP {}: {}", status.as_u16(), message),
        },
    }
}

/// `error.message` from an OpenAI-style error body, else the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Decode a success body into a [`Completion`].
fn parse_completion(body: &str) -> Result<Completion, Invoice2XmlError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| Invoice2XmlError::UnexpectedApiFailure {
            detail: format!("respuesta no válida: {e}"),
        })?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| Invoice2XmlError::EmptyResponse {
            detail: "Respuesta vacía o incompleta de la API.".to_string(),
        })?;

    Ok(Completion {
        content,
        usage: parsed.usage,
    })
}
