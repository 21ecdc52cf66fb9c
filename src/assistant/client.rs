//! Chat-completion client for OpenAI-compatible APIs.

use std::{future::Future, time::Duration};

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, Error)]
pub enum ChatError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("invalid api key")]
    InvalidApiKey,
    #[error("json error: {0}")]
    Serde(String),
    #[error("missing api key: set OPENAI_API_KEY or [assistant].api_key in the config file")]
    MissingApiKey,
    #[error("empty response from model")]
    EmptyResponse,
}

/// One request to a chat model: a system instruction and a user message.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub system: &'a str,
    pub user: &'a str,
    /// Ask the model for a JSON object rather than prose.
    pub json: bool,
    pub max_tokens: u32,
}

/// Anything that can answer a [`ChatRequest`] with text.
pub trait ChatModel {
    fn complete(&self, request: ChatRequest<'_>) -> impl Future<Output = Result<String, ChatError>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
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

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

    pub fn new(api_key: String, model: Option<String>, base_url: Option<String>) -> Result<Self, ChatError> {
        if api_key.trim().is_empty() {
            return Err(ChatError::MissingApiKey);
        }
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("sitetrack/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, request: ChatRequest<'_>) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: vec![Message::system(request.system), Message::user(request.user)],
            max_tokens: request.max_tokens,
            temperature: 0.2,
            response_format: request.json.then_some(ResponseFormat { kind: "json_object" }),
        }
    }
}

impl ChatModel for OpenAiClient {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<String, ChatError> {
        let body = self.build_request(request);
        let res = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let response = match res.status() {
            s if s.is_success() => res
                .json::<CompletionResponse>()
                .await
                .map_err(|e| ChatError::Serde(e.to_string()))?,
            StatusCode::UNAUTHORIZED => return Err(ChatError::InvalidApiKey),
            StatusCode::TOO_MANY_REQUESTS => return Err(ChatError::RateLimited),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                tracing::warn!(status, "Chat completion request failed");
                return Err(ChatError::Http { status, body });
            }
        };

        response
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ChatError::EmptyResponse)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::Timeout
    } else {
        ChatError::Transport(e.to_string())
    }
}
