// ABOUTME: OpenAI-compatible LLM provider for chat completions and embeddings
// ABOUTME: Works with api.openai.com or any endpoint implementing the same surface
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

//! # `OpenAI`-Compatible Provider
//!
//! Client for the `OpenAI` chat-completions and embeddings API shape. The
//! base URL is configurable, so any compatible endpoint works. Upstream
//! failures are classified into the error taxonomy here; the retry policy
//! consumes that classification.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::{ChatRequest, ChatResponse, LlmCapabilities, LlmProvider, TokenUsage};
use crate::config::LlmConfig;
use crate::errors::{AppError, AppResult};

/// Connection timeout for the provider endpoint
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Request timeout for completion calls
const REQUEST_TIMEOUT_SECS: u64 = 60;

// ============================================================================
// API Request/Response Types (OpenAI format)
// ============================================================================

/// Chat completions request body
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Message structure for the wire format
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

/// Chat completions response body
#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// Embeddings request body
#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    input: String,
}

/// Embeddings response body
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Error response body
#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// `OpenAI`-compatible LLM provider
pub struct OpenAiProvider {
    client: Client,
    config: LlmConfig,
}

impl OpenAiProvider {
    /// Create a new provider with the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: LlmConfig) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))?;

        info!(
            "Initializing LLM provider: base_url={}, model={}, embedding_model={}",
            config.base_url, config.model, config.embedding_model
        );

        Ok(Self { client, config })
    }

    /// Build the API URL for a given endpoint
    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint
        )
    }

    /// Resolve the configured credential or fail as a permanent error
    fn api_key(&self) -> AppResult<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::credential_missing("LLM_API_KEY"))
    }

    /// Map a non-success HTTP response to the error taxonomy
    async fn classify_error(response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        // Prefer the structured error message when the body parses
        let detail = serde_json::from_str::<OpenAiErrorResponse>(&body)
            .map_or(body, |parsed| parsed.error.message);

        match status {
            StatusCode::TOO_MANY_REQUESTS => AppError::upstream_rate_limited("llm"),
            s if s.is_server_error() => {
                AppError::upstream_unavailable("llm", format!("HTTP {s}: {detail}"))
            }
            s => AppError::upstream_rejected("llm", format!("HTTP {s}: {detail}")),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn capabilities(&self) -> LlmCapabilities {
        LlmCapabilities::EMBEDDINGS | LlmCapabilities::SYSTEM_MESSAGES
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        let api_key = self.api_key()?;

        let body = OpenAiRequest {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.config.model.clone()),
            messages: request
                .messages
                .iter()
                .map(|m| OpenAiMessage {
                    role: m.role.as_str().to_owned(),
                    content: m.content.clone(),
                })
                .collect(),
            temperature: request.temperature.or(self.config.temperature),
            max_tokens: request.max_tokens.or(self.config.max_tokens),
        };

        debug!(
            model = body.model,
            messages = body.messages.len(),
            "sending chat completion request"
        );

        let response = self
            .client
            .post(self.api_url("chat/completions"))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(AppError::from)?;

        if !response.status().is_success() {
            return Err(Self::classify_error(response).await);
        }

        let parsed: OpenAiResponse = response.json().await.map_err(AppError::from)?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::upstream_rejected("llm", "response contained no choices"))?;

        Ok(ChatResponse {
            content: choice.message.content.unwrap_or_default(),
            model: parsed.model,
            usage: parsed.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.finish_reason,
        })
    }

    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let api_key = self.api_key()?;

        let body = EmbeddingRequest {
            model: self.config.embedding_model.clone(),
            input: text.to_owned(),
        };

        let response = self
            .client
            .post(self.api_url("embeddings"))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(AppError::from)?;

        if !response.status().is_success() {
            return Err(Self::classify_error(response).await);
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(AppError::from)?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AppError::upstream_rejected("llm", "embedding response was empty"))
    }

    async fn health_check(&self) -> AppResult<bool> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Ok(false);
        };

        let response = self
            .client
            .get(self.api_url("models"))
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(AppError::from)?;

        Ok(response.status().is_success())
    }
}
