// ABOUTME: The conversation-context assembly pipeline: one chat turn end to end
// ABOUTME: Resolve config, retrieve context, read history, assemble, complete, record
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

//! # Chat Pipeline
//!
//! One visitor message flows through: configuration resolution (cached per
//! account) → vector context retrieval → short-term history read →
//! prompt assembly → completion with retry → recording of the finished
//! turn in the session cache (best effort) and the persistent conversation
//! log (degraded-save warning on failure).
//!
//! Failure policy: retrieval problems degrade to empty context, cache
//! problems degrade to empty or store-loaded history, and a failed
//! completion produces a configuration-derived canned reply. Nothing is
//! persisted for a turn that never produced a model reply.

/// Prompt assembly from ordered section builders
pub mod assembler;
/// Canned replies for failed completions
pub mod fallback;
/// Configuration resolution with defaults-on-absence
pub mod resolver;
/// Vector context retrieval
pub mod retriever;

pub use assembler::PromptAssembler;
pub use fallback::fallback_reply;
pub use resolver::ConfigResolver;
pub use retriever::{RetrievalConfig, VectorContextRetriever};

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::SessionCache;
use crate::constants::{cache as cache_defaults, retrieval};
use crate::database::DataStore;
use crate::errors::AppResult;
use crate::llm::CompletionClient;
use crate::models::{
    ChatbotConfigPatch, ConversationMessage, MessageMetadata, SessionKey,
};

/// Pipeline tuning parameters
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum messages retained per session in the cache and rendered as history
    pub max_messages: usize,
    /// Session cache entry TTL
    pub cache_ttl: Duration,
    /// Token budget for retrieved document context
    pub token_budget: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_messages: cache_defaults::DEFAULT_MAX_MESSAGES,
            cache_ttl: Duration::from_secs(cache_defaults::DEFAULT_TTL_SECS),
            token_budget: retrieval::DEFAULT_TOKEN_BUDGET,
        }
    }
}

/// One incoming chat turn
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// Owning account
    pub account_id: Uuid,
    /// Opaque widget session id
    pub session_id: String,
    /// The visitor's message
    pub message: String,
    /// Page the widget was embedded on, if known
    pub page: Option<String>,
    /// Inline configuration override carried by the relay payload
    pub config_patch: Option<ChatbotConfigPatch>,
}

/// Result of a processed turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Reply text for the visitor
    pub reply: String,
    /// True when the reply is a canned fallback rather than a model answer
    pub fallback_used: bool,
    /// True when the turn was written to the persistent store
    pub persisted: bool,
}

/// The conversation pipeline with all collaborators injected
///
/// Construction takes every dependency explicitly so tests can substitute
/// fakes without process-wide state.
pub struct ChatPipeline {
    resolver: ConfigResolver,
    retriever: VectorContextRetriever,
    completion: CompletionClient,
    cache: Arc<dyn SessionCache>,
    store: Arc<dyn DataStore>,
    options: PipelineConfig,
}

impl ChatPipeline {
    /// Create a pipeline over the given collaborators
    #[must_use]
    pub fn new(
        resolver: ConfigResolver,
        retriever: VectorContextRetriever,
        completion: CompletionClient,
        cache: Arc<dyn SessionCache>,
        store: Arc<dyn DataStore>,
        options: PipelineConfig,
    ) -> Self {
        Self {
            resolver,
            retriever,
            completion,
            cache,
            store,
            options,
        }
    }

    /// Process one chat turn
    ///
    /// # Errors
    ///
    /// Only validation problems surface as errors; upstream failures are
    /// absorbed into a fallback reply so the visitor always gets an answer.
    pub async fn process_turn(&self, request: TurnRequest) -> AppResult<TurnOutcome> {
        let key = SessionKey::new(request.account_id, request.session_id.clone());

        let mut config = self.resolver.resolve(request.account_id).await;
        if let Some(patch) = &request.config_patch {
            patch.apply_to(&mut config);
        }

        let context = self
            .retriever
            .retrieve(&request.message, request.account_id, self.options.token_budget)
            .await;

        let history = if config.remember_context {
            self.load_history(&key).await
        } else {
            Vec::new()
        };

        let prompt = PromptAssembler::assemble(&config, &context, &history, &request.message);
        debug!(
            session = %key,
            prompt_chars = prompt.len(),
            context_chars = context.len(),
            history_len = history.len(),
            "prompt assembled"
        );

        let (reply, fallback_used) = match self.completion.complete(&prompt).await {
            Ok(reply) => (reply, false),
            Err(error) => {
                warn!(session = %key, "completion failed ({error}), using fallback reply");
                (fallback_reply(&config), true)
            }
        };

        // A canned fallback is not a model reply; record nothing for it so
        // a later retry of the same question starts from clean history.
        let persisted = if fallback_used {
            false
        } else {
            self.record_turn(&key, &request, &reply).await
        };

        info!(
            session = %key,
            fallback = fallback_used,
            persisted,
            "turn completed"
        );

        Ok(TurnOutcome {
            reply,
            fallback_used,
            persisted,
        })
    }

    /// Read recent history: cache first, persistent store on a miss
    async fn load_history(&self, key: &SessionKey) -> Vec<ConversationMessage> {
        match self.cache.get(key).await {
            Ok(messages) if !messages.is_empty() => return messages,
            Ok(_) => {}
            Err(error) => {
                debug!(session = %key, "cache read failed ({error}), treating as miss");
            }
        }

        match self.store.recent_messages(key, self.options.max_messages).await {
            Ok(messages) => messages,
            Err(error) => {
                debug!(session = %key, "history load from store failed ({error})");
                Vec::new()
            }
        }
    }

    /// Record a finished turn in cache and persistent store
    ///
    /// Returns whether the durable write succeeded.
    async fn record_turn(&self, key: &SessionKey, request: &TurnRequest, reply: &str) -> bool {
        let metadata = MessageMetadata {
            page: request.page.clone(),
            session_id: Some(request.session_id.clone()),
            user_id: Some(request.account_id),
        };
        let turn = [
            ConversationMessage::user(&request.message).with_metadata(metadata.clone()),
            ConversationMessage::assistant(reply).with_metadata(metadata),
        ];

        if let Err(error) = self
            .cache
            .append(key, &turn, self.options.max_messages, self.options.cache_ttl)
            .await
        {
            debug!(session = %key, "cache append failed ({error}), ignoring");
        }

        match self.store.append_messages(key, &turn).await {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    session = %key,
                    "conversation save degraded: persistent write failed ({error})"
                );
                false
            }
        }
    }
}
