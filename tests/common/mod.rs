// ABOUTME: Shared fakes and wiring helpers for integration tests
// ABOUTME: In-memory data store and scripted LLM providers behind the real trait seams
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use fastbot_server::cache::memory::InMemorySessionCache;
use fastbot_server::cache::{CacheConfig, SessionCache};
use fastbot_server::config::{AuthConfig, ServerConfig};
use fastbot_server::database::DataStore;
use fastbot_server::errors::{AppError, AppResult};
use fastbot_server::llm::{
    ChatRequest, ChatResponse, LlmCapabilities, LlmProvider, RetryPolicy,
};
use fastbot_server::models::{
    ChatbotConfigRow, ConversationMessage, ScoredChunk, SessionKey,
};
use fastbot_server::pipeline::PipelineConfig;
use fastbot_server::server::ServerResources;

// ============================================================================
// Fake Data Store
// ============================================================================

/// In-memory data store with per-account chunk fixtures and failure toggles
#[derive(Default)]
pub struct FakeDataStore {
    pub config_rows: Mutex<HashMap<Uuid, ChatbotConfigRow>>,
    pub chunks: Mutex<Vec<ScoredChunk>>,
    pub saved: Mutex<HashMap<String, Vec<ConversationMessage>>>,
    pub config_calls: AtomicU32,
    pub fail_config: AtomicBool,
    pub fail_search: AtomicBool,
    pub fail_writes: AtomicBool,
    pub fail_health: AtomicBool,
    /// Simulate a misbehaving similarity RPC that ignores account scoping
    pub leak_foreign_chunks: AtomicBool,
}

impl FakeDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(self, row: ChatbotConfigRow) -> Self {
        self.config_rows.lock().unwrap().insert(row.account_id, row);
        self
    }

    pub fn with_chunk(self, owner_id: Uuid, text: &str, similarity: f32) -> Self {
        self.chunks.lock().unwrap().push(ScoredChunk {
            chunk_text: text.to_owned(),
            owner_id,
            similarity,
        });
        self
    }

    /// Messages recorded for a session, in insertion order
    pub fn saved_messages(&self, key: &SessionKey) -> Vec<ConversationMessage> {
        self.saved
            .lock()
            .unwrap()
            .get(&key.to_string())
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DataStore for FakeDataStore {
    async fn chatbot_config(&self, account_id: Uuid) -> AppResult<Option<ChatbotConfigRow>> {
        self.config_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_config.load(Ordering::SeqCst) {
            return Err(AppError::storage("config fetch failed (injected)"));
        }
        Ok(self.config_rows.lock().unwrap().get(&account_id).cloned())
    }

    async fn match_chunks(
        &self,
        account_id: Uuid,
        _embedding: &[f32],
        threshold: f32,
        max_candidates: usize,
    ) -> AppResult<Vec<ScoredChunk>> {
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(AppError::storage("similarity search failed (injected)"));
        }

        let leak = self.leak_foreign_chunks.load(Ordering::SeqCst);
        let mut matches: Vec<ScoredChunk> = self
            .chunks
            .lock()
            .unwrap()
            .iter()
            .filter(|c| (leak || c.owner_id == account_id) && c.similarity >= threshold)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        matches.truncate(max_candidates);
        Ok(matches)
    }

    async fn append_messages(
        &self,
        key: &SessionKey,
        messages: &[ConversationMessage],
    ) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::storage("write failed (injected)"));
        }
        self.saved
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .extend_from_slice(messages);
        Ok(())
    }

    async fn recent_messages(
        &self,
        key: &SessionKey,
        limit: usize,
    ) -> AppResult<Vec<ConversationMessage>> {
        let saved = self.saved_messages(key);
        let start = saved.len().saturating_sub(limit);
        Ok(saved[start..].to_vec())
    }

    async fn health_check(&self) -> AppResult<()> {
        if self.fail_health.load(Ordering::SeqCst) {
            return Err(AppError::storage("database unreachable (injected)"));
        }
        Ok(())
    }
}

// ============================================================================
// Scripted LLM Providers
// ============================================================================

/// Provider that answers every completion with a fixed reply and captures prompts
pub struct StubLlmProvider {
    pub reply: String,
    pub prompts: Mutex<Vec<String>>,
    pub complete_calls: AtomicU32,
    pub fail_embedding: AtomicBool,
    pub healthy: AtomicBool,
}

impl StubLlmProvider {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_owned(),
            prompts: Mutex::new(Vec::new()),
            complete_calls: AtomicU32::new(0),
            fail_embedding: AtomicBool::new(false),
            healthy: AtomicBool::new(true),
        }
    }

    /// The last prompt sent to the completion endpoint
    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for StubLlmProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn capabilities(&self) -> LlmCapabilities {
        LlmCapabilities::EMBEDDINGS | LlmCapabilities::SYSTEM_MESSAGES
    }

    fn default_model(&self) -> &str {
        "stub-model"
    }

    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        let prompt = request
            .messages
            .first()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts.lock().unwrap().push(prompt);

        Ok(ChatResponse {
            content: self.reply.clone(),
            model: "stub-model".to_owned(),
            usage: None,
            finish_reason: Some("stop".to_owned()),
        })
    }

    async fn embed(&self, _text: &str) -> AppResult<Vec<f32>> {
        if self.fail_embedding.load(Ordering::SeqCst) {
            return Err(AppError::upstream_unavailable(
                "embedding",
                "connection refused (injected)",
            ));
        }
        Ok(vec![0.1, 0.2, 0.3])
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(self.healthy.load(Ordering::SeqCst))
    }
}

/// Provider whose completion always fails with a fixed error class
pub struct FailingLlmProvider {
    pub attempts: AtomicU32,
    transient: bool,
}

impl FailingLlmProvider {
    /// Always returns HTTP-503-style transient failures
    pub fn always_unavailable() -> Self {
        Self {
            attempts: AtomicU32::new(0),
            transient: true,
        }
    }

    /// Always returns permanent upstream rejections
    pub fn always_rejected() -> Self {
        Self {
            attempts: AtomicU32::new(0),
            transient: false,
        }
    }
}

#[async_trait]
impl LlmProvider for FailingLlmProvider {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn capabilities(&self) -> LlmCapabilities {
        LlmCapabilities::EMBEDDINGS | LlmCapabilities::SYSTEM_MESSAGES
    }

    fn default_model(&self) -> &str {
        "failing-model"
    }

    async fn complete(&self, _request: &ChatRequest) -> AppResult<ChatResponse> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.transient {
            Err(AppError::upstream_unavailable("llm", "HTTP 503 (injected)"))
        } else {
            Err(AppError::upstream_rejected("llm", "HTTP 400 (injected)"))
        }
    }

    async fn embed(&self, _text: &str) -> AppResult<Vec<f32>> {
        Err(AppError::upstream_unavailable(
            "embedding",
            "HTTP 503 (injected)",
        ))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(false)
    }
}

/// Provider that fails a set number of times before succeeding
pub struct FlakyLlmProvider {
    pub attempts: AtomicU32,
    failures_before_success: u32,
    reply: String,
}

impl FlakyLlmProvider {
    pub fn new(failures_before_success: u32, reply: &str) -> Self {
        Self {
            attempts: AtomicU32::new(0),
            failures_before_success,
            reply: reply.to_owned(),
        }
    }
}

#[async_trait]
impl LlmProvider for FlakyLlmProvider {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn capabilities(&self) -> LlmCapabilities {
        LlmCapabilities::SYSTEM_MESSAGES
    }

    fn default_model(&self) -> &str {
        "flaky-model"
    }

    async fn complete(&self, _request: &ChatRequest) -> AppResult<ChatResponse> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failures_before_success {
            return Err(AppError::upstream_rate_limited("llm"));
        }
        Ok(ChatResponse {
            content: self.reply.clone(),
            model: "flaky-model".to_owned(),
            usage: None,
            finish_reason: Some("stop".to_owned()),
        })
    }

    async fn embed(&self, _text: &str) -> AppResult<Vec<f32>> {
        Err(AppError::upstream_unavailable("embedding", "no embeddings"))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

// ============================================================================
// Wiring Helpers
// ============================================================================

/// Retry policy with millisecond delays so tests stay fast
pub fn fast_retry_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(10),
        backoff_factor: 2,
        max_delay: Duration::from_millis(50),
    }
}

/// Session cache with background cleanup disabled for tests
pub fn test_cache() -> Arc<dyn SessionCache> {
    Arc::new(InMemorySessionCache::new(&CacheConfig {
        max_sessions: 100,
        cleanup_interval: Duration::from_secs(300),
        enable_background_cleanup: false,
    }))
}

/// Build server resources over fakes, optionally requiring an API key
pub fn build_resources(
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn DataStore>,
    api_key: Option<&str>,
) -> Arc<ServerResources> {
    let config = ServerConfig {
        auth: AuthConfig {
            api_key: api_key.map(ToOwned::to_owned),
        },
        ..ServerConfig::default()
    };

    ServerResources::new(
        config,
        provider,
        store,
        test_cache(),
        fast_retry_policy(),
        PipelineConfig::default(),
    )
}
