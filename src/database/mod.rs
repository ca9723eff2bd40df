// ABOUTME: Data store abstraction over the hosted database's REST surface
// ABOUTME: Covers chatbot config rows, the similarity-search RPC, and the durable conversation log
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

//! # Data Store
//!
//! The hosted database is an external collaborator reached over REST. This
//! module defines the contract the pipeline depends on; tests substitute
//! fakes behind the same trait. The persistent conversation log is
//! authoritative - the session cache is only an optimization in front of it.

/// Hosted-database REST client
pub mod rest;

pub use rest::RestDatabase;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::{ChatbotConfigRow, ConversationMessage, ScoredChunk, SessionKey};

/// Contract for the hosted database
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Fetch the stored chatbot configuration row for an account, if any
    ///
    /// # Errors
    ///
    /// Returns an error if the database is unreachable or the row is
    /// malformed. An absent row is `Ok(None)`, never an error.
    async fn chatbot_config(&self, account_id: Uuid) -> AppResult<Option<ChatbotConfigRow>>;

    /// Run the similarity-search RPC scoped to one account
    ///
    /// Results are ranked by descending similarity, pre-filtered to the
    /// given threshold, and capped at `max_candidates`. The RPC must never
    /// return chunks owned by a different account.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is unreachable or the RPC fails.
    async fn match_chunks(
        &self,
        account_id: Uuid,
        embedding: &[f32],
        threshold: f32,
        max_candidates: usize,
    ) -> AppResult<Vec<ScoredChunk>>;

    /// Append finished-turn messages to the durable conversation log
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; callers surface this as a
    /// degraded-save warning and continue the conversation.
    async fn append_messages(
        &self,
        key: &SessionKey,
        messages: &[ConversationMessage],
    ) -> AppResult<()>;

    /// Load the most recent messages of a session, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    async fn recent_messages(
        &self,
        key: &SessionKey,
        limit: usize,
    ) -> AppResult<Vec<ConversationMessage>>;

    /// Verify the database REST surface is reachable
    ///
    /// # Errors
    ///
    /// Returns an error when unreachable or misconfigured.
    async fn health_check(&self) -> AppResult<()>;
}
