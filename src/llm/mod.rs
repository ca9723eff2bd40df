// ABOUTME: LLM provider abstraction for pluggable completion and embedding backends
// ABOUTME: Defines the provider contract plus the retrying completion client
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

//! # LLM Provider Interface
//!
//! This module defines the contract a language-model backend must implement
//! to serve FastBot chat turns: non-streaming chat completion, query
//! embedding for the context retriever, and a reachability check for the
//! detailed health endpoint.
//!
//! [`CompletionClient`] is the piece the pipeline talks to: a provider plus
//! the shared [`RetryPolicy`](retry::RetryPolicy), retrying transient
//! failures only and surfacing a distinguishable error when the budget is
//! exhausted.

mod openai;
/// Retry policy for outbound LLM calls
pub mod retry;

pub use openai::OpenAiProvider;
pub use retry::RetryPolicy;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::{AppError, AppResult};

// ============================================================================
// Capability Flags
// ============================================================================

bitflags::bitflags! {
    /// LLM provider capability flags
    ///
    /// Used to decide whether optional pipeline stages (vector retrieval)
    /// can run against the configured backend.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct LlmCapabilities: u8 {
        /// Provider exposes an embeddings endpoint
        const EMBEDDINGS = 0b0000_0001;
        /// Provider supports system messages
        const SYSTEM_MESSAGES = 0b0000_0010;
    }
}

impl LlmCapabilities {
    /// Check if embeddings are supported
    #[must_use]
    pub const fn supports_embeddings(&self) -> bool {
        self.contains(Self::EMBEDDINGS)
    }
}

// ============================================================================
// Message and Request Types
// ============================================================================

/// Role of a message sent to the completion endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System instruction message
    System,
    /// User input message
    User,
    /// Assistant response message
    Assistant,
}

impl ChatRole {
    /// String representation for API payloads
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single message in a completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: ChatRole,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Configuration for a chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Conversation messages
    pub messages: Vec<ChatMessage>,
    /// Model identifier override (provider default when absent)
    pub model: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Create a new chat request with messages
    #[must_use]
    pub const fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the model to use
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Response from a chat completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Generated message content
    pub content: String,
    /// Model used for generation
    pub model: String,
    /// Token usage statistics
    pub usage: Option<TokenUsage>,
    /// Finish reason (stop, length, etc.)
    pub finish_reason: Option<String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the prompt
    pub prompt_tokens: u32,
    /// Number of tokens in the completion
    pub completion_tokens: u32,
    /// Total tokens used
    pub total_tokens: u32,
}

// ============================================================================
// Provider Trait
// ============================================================================

/// LLM provider trait for chat completion and query embedding
///
/// Implementations classify upstream failures into the error taxonomy
/// (429 → rate limited, 5xx/network → unavailable, other 4xx → rejected) so
/// the retry policy can distinguish transient from permanent conditions.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Unique provider identifier (e.g. "openai")
    fn name(&self) -> &'static str;

    /// Provider capabilities
    fn capabilities(&self) -> LlmCapabilities;

    /// Default model used when a request does not override it
    fn default_model(&self) -> &str;

    /// Perform a chat completion
    ///
    /// # Errors
    ///
    /// Returns a classified `AppError` if the API call fails.
    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse>;

    /// Compute an embedding vector for a piece of text
    ///
    /// # Errors
    ///
    /// Returns a classified `AppError` if the API call fails or the provider
    /// has no embedding capability.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>>;

    /// Check whether the provider endpoint is reachable with the configured
    /// credential
    ///
    /// # Errors
    ///
    /// Returns an error if the reachability probe itself fails.
    async fn health_check(&self) -> AppResult<bool>;
}

// ============================================================================
// Completion Client
// ============================================================================

/// Completion client: a provider plus the shared retry policy
///
/// The assembled prompt is sent as a single combined system payload. One
/// attempt moves `Pending -> Success | RetryableFailure | TerminalFailure`;
/// retryable failures loop back into `Pending` until the policy's attempt
/// budget is spent.
#[derive(Clone)]
pub struct CompletionClient {
    provider: Arc<dyn LlmProvider>,
    policy: RetryPolicy,
}

impl CompletionClient {
    /// Create a client over a provider with the given retry policy
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    /// Send the assembled prompt and extract the reply text
    ///
    /// # Errors
    ///
    /// Returns the final classified `AppError` once retries are exhausted or
    /// on the first non-retryable failure. Never yields a silently empty
    /// reply: an empty completion is reported as an upstream rejection.
    pub async fn complete(&self, prompt: &str) -> AppResult<String> {
        let request = ChatRequest::new(vec![ChatMessage::system(prompt)]);
        let provider = &self.provider;

        let response = self
            .policy
            .run("chat completion", || provider.complete(&request))
            .await?;

        if response.content.trim().is_empty() {
            return Err(AppError::upstream_rejected(
                provider.name(),
                "completion returned empty content",
            ));
        }

        Ok(response.content)
    }
}
