//! Chat model seam and the Ollama implementation behind it.

use crate::agent::tools::{ToolCall, ToolDefinition};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Message in the chat history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role("user", content)
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self::with_role("tool", content)
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Option<Vec<ToolCall>>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
            tool_calls,
        }
    }

    fn with_role(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            tool_calls: None,
        }
    }
}

/// One chat completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: f32,
}

/// The assistant's reply to a chat request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatReply {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("request timed out after {0}s")]
    Timeout(u64),
    #[error("cannot connect to Ollama at {0}. Is Ollama running?")]
    Connect(String),
    #[error("failed to send request: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Ollama API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid model response: {0}")]
    InvalidResponse(String),
}

/// Anything that can answer a chat request.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ModelError>;
}

/// Client for Ollama's `/api/chat` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http_client: reqwest::Client,
    base_url: String,
    timeout_seconds: u64,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, timeout_seconds: u64) -> Result<Self, ModelError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            timeout_seconds,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolDefinition],
    stream: bool,
    options: OllamaOptions,
}

fn no_tools(tools: &&[ToolDefinition]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[async_trait]
impl ChatModel for OllamaClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ModelError> {
        let payload = OllamaChatRequest {
            model: &request.model,
            messages: &request.messages,
            tools: &request.tools,
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
            },
        };

        debug!("Sending chat request with {} messages", request.messages.len());

        let response = self
            .http_client
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout(self.timeout_seconds)
                } else if e.is_connect() {
                    ModelError::Connect(self.base_url.clone())
                } else {
                    ModelError::Request(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status { status, body });
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        let message = chat_response
            .message
            .ok_or_else(|| ModelError::InvalidResponse("missing message field".to_string()))?;

        Ok(ChatReply {
            content: message.content,
            tool_calls: message.tool_calls.unwrap_or_default(),
        })
    }
}
