// ABOUTME: Webhook relay route handlers: payload validation and chat turn dispatch
// ABOUTME: Schema violations return 400 with per-field details; the echo endpoint stays open
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use chrono::DateTime;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use super::success_envelope;
use crate::errors::{AppError, AppResult};
use crate::models::ChatbotConfigPatch;
use crate::pipeline::TurnRequest;
use crate::server::ServerResources;

/// Validated webhook payload
#[derive(Debug)]
pub struct WebhookPayload {
    /// The visitor's message
    pub message: String,
    /// System instructions assembled by the caller
    pub system_message: String,
    /// Client-side timestamp
    pub timestamp: String,
    /// Opaque session id (uniform string representation)
    pub session_id: String,
    /// Owning account
    pub user_id: Uuid,
    /// Page the widget was embedded on
    pub page: Option<String>,
    /// Inline configuration override
    pub chatbot_config: Option<ChatbotConfigPatch>,
}

/// Read a required non-empty string field
fn required_string(body: &Value, field: &str, violations: &mut Vec<Value>) -> Option<String> {
    match body.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::String(_)) => {
            violations.push(serde_json::json!({
                "field": field,
                "message": format!("{field} must not be empty"),
            }));
            None
        }
        Some(_) => {
            violations.push(serde_json::json!({
                "field": field,
                "message": format!("{field} must be a string"),
            }));
            None
        }
        None => {
            violations.push(serde_json::json!({
                "field": field,
                "message": format!("{field} is required"),
            }));
            None
        }
    }
}

/// Read an optional string field
fn optional_string(body: &Value, field: &str) -> Option<String> {
    body.get(field)
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

/// Validate the webhook body against the fixed schema
///
/// Every violation is collected so the caller sees the full list at once,
/// matching the validation-error envelope: 400 with `details`.
fn validate_payload(body: &Value) -> AppResult<WebhookPayload> {
    let mut violations = Vec::new();

    let message = required_string(body, "message", &mut violations);
    let system_message = required_string(body, "systemMessage", &mut violations);

    let timestamp = required_string(body, "timestamp", &mut violations).and_then(|raw| {
        if DateTime::parse_from_rfc3339(&raw).is_ok() {
            Some(raw)
        } else {
            violations.push(serde_json::json!({
                "field": "timestamp",
                "message": "timestamp must be an ISO 8601 datetime",
            }));
            None
        }
    });

    let session_id = required_string(body, "sessionId", &mut violations);

    let user_id = required_string(body, "userId", &mut violations).and_then(|raw| {
        Uuid::parse_str(&raw).map_or_else(
            |_| {
                violations.push(serde_json::json!({
                    "field": "userId",
                    "message": "userId must be a UUID",
                }));
                None
            },
            Some,
        )
    });

    let chatbot_config = match body.get("chatbotConfig") {
        None | Some(Value::Null) => None,
        Some(value) => match serde_json::from_value::<ChatbotConfigPatch>(value.clone()) {
            Ok(patch) => Some(patch),
            Err(_) => {
                violations.push(serde_json::json!({
                    "field": "chatbotConfig",
                    "message": "chatbotConfig must be an object of string fields",
                }));
                None
            }
        },
    };

    if !violations.is_empty() {
        return Err(AppError::invalid_input("webhook payload failed validation")
            .with_details(Value::Array(violations)));
    }

    // All unwraps are guarded by the violations check above
    Ok(WebhookPayload {
        message: message.unwrap_or_default(),
        system_message: system_message.unwrap_or_default(),
        timestamp: timestamp.unwrap_or_default(),
        session_id: session_id.unwrap_or_default(),
        user_id: user_id.unwrap_or_default(),
        page: optional_string(body, "page"),
        chatbot_config,
    })
}

/// `POST /webhook/` - validate the payload and run one chat turn
pub async fn handle_webhook(
    State(resources): State<Arc<ServerResources>>,
    Json(body): Json<Value>,
) -> AppResult<Response> {
    let payload = validate_payload(&body)?;

    // The caller-assembled system message acts as the instruction override
    // unless the inline config already carries one
    let mut patch = payload.chatbot_config.unwrap_or_default();
    if patch.system_message.is_none() {
        patch.system_message = Some(payload.system_message.clone());
    }

    let outcome = resources
        .pipeline
        .process_turn(TurnRequest {
            account_id: payload.user_id,
            session_id: payload.session_id.clone(),
            message: payload.message,
            page: payload.page,
            config_patch: Some(patch),
        })
        .await?;

    Ok(success_envelope(serde_json::json!({
        "response": outcome.reply,
        "metadata": {
            "userId": payload.user_id,
            "sessionId": payload.session_id,
            "timestamp": payload.timestamp,
            "processed": true,
        },
    })))
}

/// `POST /webhook/test` - unauthenticated echo for integration checks
pub async fn webhook_test(Json(body): Json<Value>) -> Response {
    success_envelope(serde_json::json!({
        "message": "Webhook test successful",
        "echo": body,
    }))
}
