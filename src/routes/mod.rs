// ABOUTME: HTTP route composition and the shared success envelope for the relay API
// ABOUTME: Protected routes get API key auth and rate limiting; health and echo stay open
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

//! HTTP routes for the relay surface
//!
//! Route modules hold thin handlers that validate input, delegate to the
//! pipeline or health checker, and translate outcomes into the wire
//! envelopes: `{success: true, data, timestamp}` on success and
//! `{success: false, error, details?, timestamp}` on failure (the latter is
//! produced by [`AppError`](crate::errors::AppError)'s `IntoResponse`).

/// Chat message and config routes
pub mod chat;
/// Health probe routes
pub mod health;
/// Webhook relay routes
pub mod webhook;

use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::middleware::auth::require_api_key;
use crate::middleware::rate_limit::enforce_rate_limit;
use crate::server::ServerResources;

/// Wrap payload data in the success envelope
pub fn success_envelope<T: Serialize>(data: T) -> Response {
    Json(serde_json::json!({
        "success": true,
        "data": data,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
    .into_response()
}

/// Build the full application router
#[must_use]
pub fn router(resources: Arc<ServerResources>) -> Router {
    let protected = Router::new()
        .route("/webhook", post(webhook::handle_webhook))
        .route("/webhook/", post(webhook::handle_webhook))
        .route("/chat/message", post(chat::send_message))
        .route("/chat/config/:user_id", get(chat::get_config))
        .route_layer(from_fn_with_state(
            resources.auth.clone(),
            require_api_key,
        ))
        .route_layer(from_fn_with_state(
            resources.limiter.clone(),
            enforce_rate_limit,
        ));

    let open = Router::new()
        .route("/webhook/test", post(webhook::webhook_test))
        .route("/health", get(health::basic_health))
        .route("/health/", get(health::basic_health))
        .route("/health/detailed", get(health::detailed_health));

    protected.merge(open).with_state(resources)
}
