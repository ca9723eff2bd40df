// ABOUTME: Chat route handlers for the in-app message path and the config acknowledgement
// ABOUTME: Shares the pipeline and envelope shapes with the webhook path
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use super::success_envelope;
use crate::errors::{AppError, AppResult};
use crate::models::ChatbotConfigPatch;
use crate::pipeline::TurnRequest;
use crate::server::ServerResources;

/// Request body for `POST /chat/message`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageRequest {
    /// The visitor's message
    #[serde(default)]
    pub message: Option<String>,
    /// System instructions assembled by the caller
    #[serde(default)]
    pub system_message: Option<String>,
    /// Owning account; anonymous sessions resolve to defaults
    #[serde(default)]
    pub user_id: Option<Uuid>,
    /// Opaque session id; generated when absent
    #[serde(default)]
    pub session_id: Option<String>,
    /// Page the widget was embedded on
    #[serde(default)]
    pub page: Option<String>,
}

/// `POST /chat/message` - run one chat turn for the in-app path
pub async fn send_message(
    State(resources): State<Arc<ServerResources>>,
    Json(request): Json<ChatMessageRequest>,
) -> AppResult<Response> {
    let message = request
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| AppError::missing_field("message"))?;
    let system_message = request
        .system_message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| AppError::missing_field("systemMessage"))?;

    // Anonymous widget sessions get the nil account (documented defaults)
    // and a fresh opaque session id
    let account_id = request.user_id.unwrap_or_else(Uuid::nil);
    let session_id = request
        .session_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let patch = ChatbotConfigPatch {
        system_message: Some(system_message),
        ..ChatbotConfigPatch::default()
    };

    let outcome = resources
        .pipeline
        .process_turn(TurnRequest {
            account_id,
            session_id: session_id.clone(),
            message,
            page: request.page,
            config_patch: Some(patch),
        })
        .await?;

    Ok(success_envelope(serde_json::json!({
        "response": outcome.reply,
        "metadata": {
            "userId": account_id,
            "sessionId": session_id,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "processed": true,
        },
    })))
}

/// `GET /chat/config/:user_id` - fixed acknowledgement payload
///
/// Configuration is served to widgets by the hosted database directly; this
/// endpoint only confirms the relay recognizes the account path.
pub async fn get_config(Path(user_id): Path<Uuid>) -> Response {
    success_envelope(serde_json::json!({
        "message": "Chatbot configuration is managed by the account dashboard",
        "userId": user_id,
        "status": "acknowledged",
    }))
}
