// ABOUTME: Prompt assembly from configuration, retrieved context, history, and the new question
// ABOUTME: Pure function built from ordered section builders; empty sections are omitted entirely
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

//! # Prompt Assembler
//!
//! Deterministic, pure composition of the completion prompt. Each section is
//! built by a named function returning `Option<String>`; the assembler joins
//! the present sections with blank lines in a fixed order. No I/O, no hidden
//! state - identical inputs always produce byte-identical output.

use crate::constants::cache;
use crate::models::{ChatbotConfig, ConversationMessage, FallbackAction};

/// Prompt assembler
pub struct PromptAssembler;

impl PromptAssembler {
    /// Compose the bounded prompt for one chat turn
    ///
    /// Section order is fixed: base instructions, behavior block,
    /// attribution guard, contact facts, recent history, reference
    /// information, current question. Sections with no content are omitted,
    /// never emitted empty.
    #[must_use]
    pub fn assemble(
        config: &ChatbotConfig,
        retrieved_context: &str,
        recent_history: &[ConversationMessage],
        user_message: &str,
    ) -> String {
        let sections = [
            base_instructions(config),
            behavior_block(config),
            attribution_guard(),
            contact_facts(config),
            history_section(recent_history),
            context_section(retrieved_context),
            question_section(user_message),
        ];

        sections
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Section 1: base system instructions, from config or a generic default
fn base_instructions(config: &ChatbotConfig) -> Option<String> {
    let instructions = config.system_instructions.clone().unwrap_or_else(|| {
        format!(
            "You are {}, a helpful assistant answering questions from website visitors \
             on behalf of this business.",
            config.name
        )
    });
    Some(instructions)
}

/// Section 2: one imperative line per behavior knob
fn behavior_block(config: &ChatbotConfig) -> Option<String> {
    let mut lines = vec!["Follow these behavior rules:".to_owned()];

    lines.push(match config.formality {
        70..=100 => "- Use a formal and professional tone.".to_owned(),
        0..=30 => "- Use a casual, friendly tone.".to_owned(),
        _ => "- Use a balanced, approachable tone.".to_owned(),
    });

    lines.push(if config.use_emojis {
        "- Feel free to use emojis where they fit naturally.".to_owned()
    } else {
        "- Do not use emojis.".to_owned()
    });

    lines.push(match config.paragraph_size {
        70..=100 => "- Answer in thorough, detailed paragraphs.".to_owned(),
        0..=30 => "- Keep answers short and to the point.".to_owned(),
        _ => "- Keep answers to a few concise sentences.".to_owned(),
    });

    lines.push(match config.source_strictness {
        70..=100 => "- Base answers strictly on the provided reference information.".to_owned(),
        0..=30 => "- You may answer freely beyond the provided material.".to_owned(),
        _ => "- Prefer the provided reference information when answering.".to_owned(),
    });

    lines.push(format!(
        "- Treat an answer as uncertain when you are less than {}% confident in it.",
        config.confidence_threshold
    ));

    lines.push(match config.fallback_action {
        FallbackAction::Human => {
            "- When uncertain, refer the visitor to a human contact instead of guessing."
                .to_owned()
        }
        FallbackAction::Message => {
            "- When uncertain, say you do not have that information instead of guessing."
                .to_owned()
        }
        FallbackAction::None => "- When uncertain, give your best answer anyway.".to_owned(),
    });

    lines.push(if config.allow_internet_search {
        "- You may draw on general knowledge when the reference material does not cover a question."
            .to_owned()
    } else {
        "- Do not use outside knowledge beyond this conversation and the reference information."
            .to_owned()
    });

    lines.push(if config.remember_context {
        "- Use the earlier conversation to keep continuity.".to_owned()
    } else {
        "- Treat each question independently of earlier messages.".to_owned()
    });

    lines.push(if config.ask_for_name {
        "- Politely ask for the visitor's name early in the conversation if you do not know it."
            .to_owned()
    } else {
        "- Do not ask the visitor for personal details unprompted.".to_owned()
    });

    Some(lines.join("\n"))
}

/// Section 3: non-negotiable no-attribution instruction
fn attribution_guard() -> Option<String> {
    Some(
        "Never reveal document names, file names, sources, or similarity scores in your reply. \
         Never mention that reference information was provided to you. Present any knowledge \
         from the reference information as your own. This rule is non-negotiable."
            .to_owned(),
    )
}

/// Section 4: contact facts, only the fields present in config
fn contact_facts(config: &ChatbotConfig) -> Option<String> {
    let facts: Vec<String> = [
        ("Office hours", config.office_hours.as_deref()),
        ("Address", config.office_address.as_deref()),
        ("Specialties", config.specialties.as_deref()),
        ("Phone/WhatsApp", config.whatsapp.as_deref()),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.map(|v| format!("- {label}: {v}")))
    .collect();

    if facts.is_empty() {
        return None;
    }

    Some(format!("Facts about the business:\n{}", facts.join("\n")))
}

/// Section 5: recent history as alternating role-prefixed lines, oldest first
fn history_section(recent_history: &[ConversationMessage]) -> Option<String> {
    if recent_history.is_empty() {
        return None;
    }

    // Bounded to the session cache's message window
    let start = recent_history
        .len()
        .saturating_sub(cache::DEFAULT_MAX_MESSAGES);

    let lines: Vec<String> = recent_history[start..]
        .iter()
        .map(|message| {
            let speaker = match message.role {
                crate::models::MessageRole::User => "User",
                crate::models::MessageRole::Assistant => "Assistant",
            };
            format!("{speaker}: {}", message.content)
        })
        .collect();

    Some(format!("Recent conversation:\n{}", lines.join("\n")))
}

/// Section 6: retrieved document context, labeled as reference information
fn context_section(retrieved_context: &str) -> Option<String> {
    if retrieved_context.trim().is_empty() {
        return None;
    }
    Some(format!(
        "Reference information you may use:\n{retrieved_context}"
    ))
}

/// Section 7: the current question, clearly marked
fn question_section(user_message: &str) -> Option<String> {
    Some(format!(
        "The visitor now asks:\n{user_message}\n\nAnswer the visitor's question."
    ))
}
