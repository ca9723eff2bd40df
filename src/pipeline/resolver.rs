// ABOUTME: Chatbot configuration resolution with defaults-on-absence and per-account caching
// ABOUTME: The single place where sparse stored rows are merged over documented defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::database::DataStore;
use crate::models::{ChatbotConfig, ChatbotConfigRow};

/// Resolves the chatbot configuration for an account
///
/// A chatbot with no stored configuration row must still be usable, so
/// resolution never fails: an absent row, an unreachable database, or a
/// malformed row all degrade to the documented defaults. Resolved configs
/// are cached for the session's lifetime - configuration is not expected to
/// change mid-conversation.
pub struct ConfigResolver {
    store: Arc<dyn DataStore>,
    resolved: DashMap<Uuid, ChatbotConfig>,
}

impl ConfigResolver {
    /// Create a resolver over the given store
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            store,
            resolved: DashMap::new(),
        }
    }

    /// Resolve the configuration for an account
    ///
    /// Idempotent; repeated calls for the same account return the cached
    /// result.
    pub async fn resolve(&self, account_id: Uuid) -> ChatbotConfig {
        if let Some(cached) = self.resolved.get(&account_id) {
            return cached.clone();
        }

        let config = match self.store.chatbot_config(account_id).await {
            Ok(Some(row)) => Self::freeze(row),
            Ok(None) => {
                debug!(account_id = %account_id, "no stored configuration, using defaults");
                ChatbotConfig::default()
            }
            Err(error) => {
                warn!(account_id = %account_id, "configuration fetch failed ({error}), using defaults");
                ChatbotConfig::default()
            }
        };

        self.resolved.insert(account_id, config.clone());
        config
    }

    /// Drop the cached configuration for an account
    pub fn invalidate(&self, account_id: Uuid) {
        self.resolved.remove(&account_id);
    }

    /// Merge a sparse stored row over the documented defaults
    ///
    /// Sliders are clamped to 0-100; out-of-range stored values are not
    /// trusted.
    fn freeze(row: ChatbotConfigRow) -> ChatbotConfig {
        let defaults = ChatbotConfig::default();

        ChatbotConfig {
            name: row.chatbot_name.unwrap_or(defaults.name),
            welcome_message: row.welcome_message.unwrap_or(defaults.welcome_message),
            system_instructions: row.system_instructions,
            office_hours: row.office_hours,
            office_address: row.office_address,
            specialties: row.specialties,
            whatsapp: row.whatsapp,
            formality: row.formality.unwrap_or(defaults.formality).min(100),
            use_emojis: row.use_emojis.unwrap_or(defaults.use_emojis),
            paragraph_size: row
                .paragraph_size
                .unwrap_or(defaults.paragraph_size)
                .min(100),
            source_strictness: row
                .source_strictness
                .unwrap_or(defaults.source_strictness)
                .min(100),
            confidence_threshold: row
                .confidence_threshold
                .unwrap_or(defaults.confidence_threshold)
                .min(100),
            fallback_action: row.fallback_action.unwrap_or(defaults.fallback_action),
            allow_internet_search: row
                .allow_internet_search
                .unwrap_or(defaults.allow_internet_search),
            remember_context: row.remember_context.unwrap_or(defaults.remember_context),
            ask_for_name: row.ask_for_name.unwrap_or(defaults.ask_for_name),
        }
    }
}
