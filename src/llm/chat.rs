//! Core `ChatGateway` trait and `OpenAiChat` implementation.
//!
//! `OpenAiChat` calls any OpenAI-compatible `/v1/chat/completions` endpoint.
//! The service keeps no session, so the caller passes the complete history
//! (system message included) on every call.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::config::ChatConfig;
use crate::conversation::Message;
use crate::credential::Credential;

// ---------------------------------------------------------------------------
// ChatServiceError
// ---------------------------------------------------------------------------

/// Errors that can occur during a chat-completion call.
#[derive(Debug, Error)]
pub enum ChatServiceError {
    /// The service rejected the API key (HTTP 401 / 403).
    #[error("chat service rejected the API key: {0}")]
    Auth(String),

    /// Too many requests or quota exhausted (HTTP 429).
    #[error("chat service rate limit reached: {0}")]
    RateLimited(String),

    /// The request did not complete within the configured timeout.
    #[error("chat request timed out")]
    Timeout,

    /// HTTP transport or connection error.
    #[error("chat request failed: {0}")]
    Request(String),

    /// Any other non-success HTTP status.
    #[error("chat service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not the expected JSON shape.
    #[error("malformed chat response: {0}")]
    MalformedResponse(String),

    /// The response parsed but carried no reply text.
    #[error("chat service returned an empty reply")]
    EmptyReply,
}

impl From<reqwest::Error> for ChatServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ChatServiceError::Timeout
        } else {
            ChatServiceError::Request(e.to_string())
        }
    }
}

impl ChatServiceError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ChatServiceError::Auth(body),
            StatusCode::TOO_MANY_REQUESTS => ChatServiceError::RateLimited(body),
            _ => ChatServiceError::Status {
                status: status.as_u16(),
                body,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// ChatGateway trait
// ---------------------------------------------------------------------------

/// Async trait for chat-completion backends.
///
/// Implementors must be `Send + Sync` so they can be held behind
/// `Arc<dyn ChatGateway>`.
///
/// # Arguments
/// * `history`  – Ordered messages, system message first.
/// * `model_id` – Concrete service model id (see
///   [`ModelChoice::service_model_id`](crate::llm::ModelChoice::service_model_id)).
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn complete(&self, history: &[Message], model_id: &str)
        -> Result<String, ChatServiceError>;
}

// ---------------------------------------------------------------------------
// OpenAiChat
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint.
pub struct OpenAiChat {
    client: reqwest::Client,
    base_url: String,
    credential: Credential,
}

impl OpenAiChat {
    /// Build a gateway from config and a validated key.
    ///
    /// The HTTP client carries the per-request timeout from
    /// `config.timeout_secs`; a default client is the fallback if the
    /// builder fails.
    pub fn from_config(config: &ChatConfig, credential: Credential) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credential,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ChatGateway for OpenAiChat {
    async fn complete(
        &self,
        history: &[Message],
        model_id: &str,
    ) -> Result<String, ChatServiceError> {
        log::debug!(
            "chat: sending {} messages to model {model_id}",
            history.len()
        );

        let body = ChatRequest {
            model: model_id,
            messages: history,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.credential.expose())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("chat: service returned {status}");
            return Err(ChatServiceError::from_status(status, body));
        }

        let body = response.text().await?;
        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ChatServiceError::MalformedResponse(e.to_string()))?;

        parse_reply(&json)
    }
}

/// Extract `choices[0].message.content` from a chat-completions response.
pub(crate) fn parse_reply(json: &serde_json::Value) -> Result<String, ChatServiceError> {
    let content = &json["choices"][0]["message"]["content"];

    if content.is_null() {
        return Err(ChatServiceError::MalformedResponse(
            "missing choices[0].message.content".into(),
        ));
    }

    let reply = content
        .as_str()
        .ok_or_else(|| {
            ChatServiceError::MalformedResponse("message content is not a string".into())
        })?
        .trim()
        .to_string();

    if reply.is_empty() {
        return Err(ChatServiceError::EmptyReply);
    }

    Ok(reply)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
