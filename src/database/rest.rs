// ABOUTME: REST client for the hosted database (PostgREST-style tables and RPC endpoints)
// ABOUTME: Sends the service credential with every request and maps failures to storage errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::DataStore;
use crate::config::DatabaseConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{
    ChatbotConfigRow, ConversationMessage, MessageMetadata, MessageRole, ScoredChunk, SessionKey,
};

/// Connection timeout for the hosted database
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Request timeout for table reads/writes and the similarity RPC
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Conversation message row as stored in the hosted database
#[derive(Debug, Serialize, Deserialize)]
struct MessageRow {
    id: String,
    user_id: Uuid,
    session_id: String,
    role: MessageRole,
    content: String,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<String>,
}

impl MessageRow {
    fn from_message(key: &SessionKey, message: &ConversationMessage) -> Self {
        Self {
            id: message.id.clone(),
            user_id: key.user_id,
            session_id: key.session_id.clone(),
            role: message.role,
            content: message.content.clone(),
            created_at: message.timestamp,
            page: message.metadata.as_ref().and_then(|m| m.page.clone()),
        }
    }

    fn into_message(self) -> ConversationMessage {
        let metadata = MessageMetadata {
            page: self.page,
            session_id: Some(self.session_id),
            user_id: Some(self.user_id),
        };
        ConversationMessage {
            id: self.id,
            role: self.role,
            content: self.content,
            timestamp: self.created_at,
            metadata: Some(metadata),
        }
    }
}

/// Similarity RPC request body
#[derive(Debug, Serialize)]
struct MatchChunksRequest<'a> {
    query_embedding: &'a [f32],
    owner_id: Uuid,
    match_threshold: f32,
    match_count: usize,
}

/// Client for the hosted database's REST surface
///
/// Table reads and writes go through `/rest/v1/<table>` filters; the vector
/// search goes through `/rest/v1/rpc/match_document_chunks`. When the
/// database is not configured every call fails with a credential error,
/// which callers degrade on - the server still boots and answers from
/// configuration defaults.
pub struct RestDatabase {
    client: Client,
    base_url: Option<String>,
    service_key: Option<String>,
}

impl RestDatabase {
    /// Create a client from the database configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &DatabaseConfig) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.url.clone().map(|u| {
                let trimmed = u.trim_end_matches('/');
                trimmed.to_owned()
            }),
            service_key: config.service_key.clone(),
        })
    }

    /// Resolve connection details or fail as a permanent credential error
    fn connection(&self) -> AppResult<(&str, &str)> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| AppError::credential_missing("DATABASE_URL"))?;
        let service_key = self
            .service_key
            .as_deref()
            .ok_or_else(|| AppError::credential_missing("DATABASE_SERVICE_KEY"))?;
        Ok((base_url, service_key))
    }

    /// Issue a GET against a table path with query filters
    async fn get_rows<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> AppResult<Vec<T>> {
        let (base_url, service_key) = self.connection()?;

        let response = self
            .client
            .get(format!("{base_url}/rest/v1/{path}"))
            .header("apikey", service_key)
            .bearer_auth(service_key)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::storage(format!("database read failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::storage(format!(
                "database read returned HTTP {status} for {path}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::storage(format!("database row decoding failed: {e}")))
    }
}

#[async_trait]
impl DataStore for RestDatabase {
    async fn chatbot_config(&self, account_id: Uuid) -> AppResult<Option<ChatbotConfigRow>> {
        let rows: Vec<ChatbotConfigRow> = self
            .get_rows(
                "chatbot_configs",
                &[
                    ("account_id", format!("eq.{account_id}")),
                    ("limit", "1".to_owned()),
                ],
            )
            .await?;

        Ok(rows.into_iter().next())
    }

    async fn match_chunks(
        &self,
        account_id: Uuid,
        embedding: &[f32],
        threshold: f32,
        max_candidates: usize,
    ) -> AppResult<Vec<ScoredChunk>> {
        let (base_url, service_key) = self.connection()?;

        let body = MatchChunksRequest {
            query_embedding: embedding,
            owner_id: account_id,
            match_threshold: threshold,
            match_count: max_candidates,
        };

        let response = self
            .client
            .post(format!("{base_url}/rest/v1/rpc/match_document_chunks"))
            .header("apikey", service_key)
            .bearer_auth(service_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::storage(format!("similarity search failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::storage(format!(
                "similarity search returned HTTP {status}"
            )));
        }

        let chunks: Vec<ScoredChunk> = response
            .json()
            .await
            .map_err(|e| AppError::storage(format!("similarity row decoding failed: {e}")))?;

        debug!(
            account_id = %account_id,
            candidates = chunks.len(),
            "similarity search completed"
        );

        Ok(chunks)
    }

    async fn append_messages(
        &self,
        key: &SessionKey,
        messages: &[ConversationMessage],
    ) -> AppResult<()> {
        let (base_url, service_key) = self.connection()?;

        let rows: Vec<MessageRow> = messages
            .iter()
            .map(|m| MessageRow::from_message(key, m))
            .collect();

        let response = self
            .client
            .post(format!("{base_url}/rest/v1/conversation_messages"))
            .header("apikey", service_key)
            .bearer_auth(service_key)
            .json(&rows)
            .send()
            .await
            .map_err(|e| AppError::storage(format!("conversation write failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::storage(format!(
                "conversation write returned HTTP {status}"
            )));
        }

        Ok(())
    }

    async fn recent_messages(
        &self,
        key: &SessionKey,
        limit: usize,
    ) -> AppResult<Vec<ConversationMessage>> {
        let rows: Vec<MessageRow> = self
            .get_rows(
                "conversation_messages",
                &[
                    ("user_id", format!("eq.{}", key.user_id)),
                    ("session_id", format!("eq.{}", key.session_id)),
                    ("order", "created_at.desc".to_owned()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        // Rows arrive newest-first; the pipeline wants chronological order
        let mut messages: Vec<ConversationMessage> =
            rows.into_iter().map(MessageRow::into_message).collect();
        messages.reverse();

        Ok(messages)
    }

    async fn health_check(&self) -> AppResult<()> {
        let (base_url, service_key) = self.connection()?;

        let response = self
            .client
            .get(format!("{base_url}/rest/v1/"))
            .header("apikey", service_key)
            .bearer_auth(service_key)
            .send()
            .await
            .map_err(|e| AppError::storage(format!("database unreachable: {e}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::storage(format!(
                "database health probe returned HTTP {}",
                response.status()
            )))
        }
    }
}
