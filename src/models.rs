// ABOUTME: Core data model for conversations, chatbot configuration, and document chunks
// ABOUTME: Messages are immutable after creation; configuration follows resolve-then-freeze
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

//! Common data models shared across the pipeline, storage, and HTTP layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::constants::behavior;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Visitor input message
    User,
    /// Chatbot response message
    Assistant,
}

impl MessageRole {
    /// String representation used in rendered prompts and storage rows
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Informational message metadata; never used in ranking or retrieval
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Page the widget was embedded on when the message was sent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    /// Session the message belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Owning account
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
}

/// A single conversation message
///
/// Created when a visitor sends input or the model responds; never mutated
/// afterwards. The cache prunes old messages, the persistent store keeps the
/// full history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Opaque unique identifier
    pub id: String,
    /// Sender role
    pub role: MessageRole,
    /// Message text
    pub content: String,
    /// Creation instant
    pub timestamp: DateTime<Utc>,
    /// Optional informational metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl ConversationMessage {
    /// Create a new message with a generated id and the current timestamp
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    /// Create a visitor message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create a chatbot message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Attach informational metadata
    #[must_use]
    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Key identifying one widget session for one account
///
/// Session identity is an opaque client-generated string, uniformly across
/// the webhook and in-app chat paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    /// Owning account
    pub user_id: Uuid,
    /// Opaque per-widget-activation session id
    pub session_id: String,
}

impl SessionKey {
    /// Create a new session key
    #[must_use]
    pub fn new(user_id: Uuid, session_id: impl Into<String>) -> Self {
        Self {
            user_id,
            session_id: session_id.into(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user:{}:session:{}", self.user_id, self.session_id)
    }
}

/// What the chatbot does when it cannot answer confidently
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackAction {
    /// Defer to a human contact
    #[default]
    Human,
    /// Reply with a fixed apology message
    Message,
    /// Answer as best it can with no special handling
    None,
}

/// Fully resolved chatbot configuration for one account
///
/// Every field is concrete after resolution; the only place defaults are
/// applied is [`crate::pipeline::ConfigResolver`]. Read-only from the
/// chat-turn pipeline's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatbotConfig {
    /// Display name shown in the widget header and prompts
    pub name: String,
    /// Greeting shown when the widget opens
    pub welcome_message: String,
    /// Free-text system instructions from the account owner
    pub system_instructions: Option<String>,

    /// Office hours contact fact
    pub office_hours: Option<String>,
    /// Office address contact fact
    pub office_address: Option<String>,
    /// Specialties contact fact
    pub specialties: Option<String>,
    /// WhatsApp/phone contact fact
    pub whatsapp: Option<String>,

    /// Tone slider, 0 = casual, 100 = formal
    pub formality: u8,
    /// Whether replies may contain emojis
    pub use_emojis: bool,
    /// Reply length slider, 0 = terse, 100 = expansive
    pub paragraph_size: u8,
    /// How strictly replies must stick to provided material, 0-100
    pub source_strictness: u8,
    /// Confidence below which the fallback action applies, 0-100
    pub confidence_threshold: u8,
    /// Behavior when the bot cannot answer confidently
    pub fallback_action: FallbackAction,
    /// Whether the bot may reference general internet knowledge
    pub allow_internet_search: bool,
    /// Whether earlier turns in the session are carried into the prompt
    pub remember_context: bool,
    /// Whether the bot should ask for the visitor's name early on
    pub ask_for_name: bool,
}

impl Default for ChatbotConfig {
    fn default() -> Self {
        Self {
            name: "Assistant".to_owned(),
            welcome_message: "Hello! How can I help you today?".to_owned(),
            system_instructions: None,
            office_hours: None,
            office_address: None,
            specialties: None,
            whatsapp: None,
            formality: behavior::DEFAULT_FORMALITY,
            use_emojis: false,
            paragraph_size: behavior::DEFAULT_PARAGRAPH_SIZE,
            source_strictness: behavior::DEFAULT_SOURCE_STRICTNESS,
            confidence_threshold: behavior::DEFAULT_CONFIDENCE_THRESHOLD,
            fallback_action: FallbackAction::Human,
            allow_internet_search: false,
            remember_context: true,
            ask_for_name: true,
        }
    }
}

/// Sparse chatbot configuration row as stored by the hosted database
///
/// All fields are optional; resolution merges them over the documented
/// defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatbotConfigRow {
    /// Owning account
    pub account_id: Uuid,
    /// Display name
    pub chatbot_name: Option<String>,
    /// Widget greeting
    pub welcome_message: Option<String>,
    /// Free-text system instructions
    pub system_instructions: Option<String>,
    /// Office hours contact fact
    pub office_hours: Option<String>,
    /// Office address contact fact
    pub office_address: Option<String>,
    /// Specialties contact fact
    pub specialties: Option<String>,
    /// WhatsApp/phone contact fact
    pub whatsapp: Option<String>,
    /// Tone slider
    pub formality: Option<u8>,
    /// Emoji flag
    pub use_emojis: Option<bool>,
    /// Reply length slider
    pub paragraph_size: Option<u8>,
    /// Source strictness slider
    pub source_strictness: Option<u8>,
    /// Confidence threshold slider
    pub confidence_threshold: Option<u8>,
    /// Fallback action
    pub fallback_action: Option<FallbackAction>,
    /// Internet knowledge flag
    pub allow_internet_search: Option<bool>,
    /// Context memory flag
    pub remember_context: Option<bool>,
    /// Ask-for-name flag
    pub ask_for_name: Option<bool>,
}

/// Partial configuration override carried inline in a webhook payload
///
/// Field names mirror the relay wire format rather than the internal
/// configuration record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatbotConfigPatch {
    /// Display name override
    pub chatbot_name: Option<String>,
    /// Widget greeting override
    pub welcome_message: Option<String>,
    /// Office address override
    pub office_address: Option<String>,
    /// Office hours override
    pub office_hours: Option<String>,
    /// Specialties override
    pub specialties: Option<String>,
    /// WhatsApp/phone override
    pub whatsapp: Option<String>,
    /// System instructions override
    pub system_message: Option<String>,
}

impl ChatbotConfigPatch {
    /// Apply every present field over a resolved configuration
    pub fn apply_to(&self, config: &mut ChatbotConfig) {
        if let Some(name) = &self.chatbot_name {
            config.name.clone_from(name);
        }
        if let Some(welcome) = &self.welcome_message {
            config.welcome_message.clone_from(welcome);
        }
        if self.office_address.is_some() {
            config.office_address.clone_from(&self.office_address);
        }
        if self.office_hours.is_some() {
            config.office_hours.clone_from(&self.office_hours);
        }
        if self.specialties.is_some() {
            config.specialties.clone_from(&self.specialties);
        }
        if self.whatsapp.is_some() {
            config.whatsapp.clone_from(&self.whatsapp);
        }
        if self.system_message.is_some() {
            config.system_instructions.clone_from(&self.system_message);
        }
    }
}

/// A document chunk returned by the similarity search, with its score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// Chunk text
    pub chunk_text: String,
    /// Account the chunk belongs to
    pub owner_id: Uuid,
    /// Cosine similarity against the query embedding
    pub similarity: f32,
}
