// ABOUTME: Configuration-derived canned replies used when the completion call fails
// ABOUTME: End users never see internal error text, only these fallback messages
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

use crate::models::{ChatbotConfig, FallbackAction};

/// Build the canned reply for a turn whose completion failed
///
/// The message is derived from the account's configuration: the fallback
/// action picks the shape, and contact details are woven in when present so
/// the visitor still has somewhere to go.
#[must_use]
pub fn fallback_reply(config: &ChatbotConfig) -> String {
    match config.fallback_action {
        FallbackAction::Human => {
            let mut reply = String::from(
                "I'm sorry, I can't answer that right now. Please reach our team directly",
            );
            if let Some(whatsapp) = &config.whatsapp {
                reply.push_str(&format!(" at {whatsapp}"));
            }
            if let Some(hours) = &config.office_hours {
                reply.push_str(&format!(" (office hours: {hours})"));
            }
            reply.push('.');
            reply
        }
        FallbackAction::Message => {
            "I'm sorry, I don't have that information at the moment. Please try again in a little \
             while."
                .to_owned()
        }
        FallbackAction::None => {
            "I'm having trouble answering right now. Could you rephrase your question?".to_owned()
        }
    }
}
