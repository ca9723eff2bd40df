// ABOUTME: Vector context retrieval: query embedding, scoped similarity search, budget trimming
// ABOUTME: Every failure degrades to empty context; cross-account chunks are a hard invariant
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::constants::retrieval;
use crate::database::DataStore;
use crate::llm::LlmProvider;

/// Retrieval tuning parameters
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Minimum similarity a chunk must score
    pub similarity_threshold: f32,
    /// Maximum candidates requested from the search
    pub max_candidates: usize,
    /// Deadline applied to the embedding call and the search, each
    pub timeout: Duration,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: retrieval::DEFAULT_SIMILARITY_THRESHOLD,
            max_candidates: retrieval::DEFAULT_MAX_CANDIDATES,
            timeout: Duration::from_secs(retrieval::DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Turns a visitor question into document context for the prompt
///
/// The returned text is natural context only: no filenames, no similarity
/// scores, no provenance of any kind, because it is interpolated directly
/// into a user-facing prompt. Chunks belonging to a different account than
/// the querying one must never appear - the search RPC is scoped, and the
/// owner of every returned chunk is checked again here.
pub struct VectorContextRetriever {
    provider: Arc<dyn LlmProvider>,
    store: Arc<dyn DataStore>,
    options: RetrievalConfig,
}

impl VectorContextRetriever {
    /// Create a retriever over the given provider and store
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn DataStore>,
        options: RetrievalConfig,
    ) -> Self {
        Self {
            provider,
            store,
            options,
        }
    }

    /// Retrieve document context for a query, bounded by `token_budget`
    ///
    /// Never fails the turn: embedding errors, search errors, timeouts, and
    /// missing capability all return empty text and the caller proceeds
    /// without document context.
    pub async fn retrieve(&self, query: &str, account_id: Uuid, token_budget: usize) -> String {
        if !self.provider.capabilities().supports_embeddings() {
            debug!("provider has no embedding capability, skipping retrieval");
            return String::new();
        }

        let embedding =
            match tokio::time::timeout(self.options.timeout, self.provider.embed(query)).await {
                Ok(Ok(embedding)) => embedding,
                Ok(Err(error)) => {
                    warn!("query embedding failed ({error}), continuing without document context");
                    return String::new();
                }
                Err(_) => {
                    warn!("query embedding timed out, continuing without document context");
                    return String::new();
                }
            };

        let search = self.store.match_chunks(
            account_id,
            &embedding,
            self.options.similarity_threshold,
            self.options.max_candidates,
        );
        let chunks = match tokio::time::timeout(self.options.timeout, search).await {
            Ok(Ok(chunks)) => chunks,
            Ok(Err(error)) => {
                warn!("similarity search failed ({error}), continuing without document context");
                return String::new();
            }
            Err(_) => {
                warn!("similarity search timed out, continuing without document context");
                return String::new();
            }
        };

        let mut context = String::new();
        for chunk in chunks {
            // Account isolation is a hard invariant, not a ranking preference
            if chunk.owner_id != account_id {
                warn!(
                    expected = %account_id,
                    got = %chunk.owner_id,
                    "similarity search returned a foreign chunk, discarding"
                );
                continue;
            }

            let added_len = if context.is_empty() {
                chunk.chunk_text.len()
            } else {
                chunk.chunk_text.len() + 2
            };
            if estimated_tokens(context.len() + added_len) > token_budget {
                break;
            }

            if !context.is_empty() {
                context.push_str("\n\n");
            }
            context.push_str(&chunk.chunk_text);
        }

        debug!(
            account_id = %account_id,
            context_chars = context.len(),
            "retrieval completed"
        );

        context
    }
}

/// Rough token estimate from character count
fn estimated_tokens(chars: usize) -> usize {
    (chars as f64 * retrieval::TOKENS_PER_CHAR).ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_estimate_rounds_up() {
        assert_eq!(estimated_tokens(0), 0);
        assert_eq!(estimated_tokens(4), 1);
        assert_eq!(estimated_tokens(5), 2);
        assert_eq!(estimated_tokens(100), 25);
    }
}
