// ABOUTME: Health route handlers for service monitoring
// ABOUTME: Fast probe plus a detailed check that returns 503 unless every component passes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;

use super::success_envelope;
use crate::server::ServerResources;

/// `GET /health` - fast liveness probe
pub async fn basic_health(State(resources): State<Arc<ServerResources>>) -> Response {
    let info = resources.health.basic();

    success_envelope(serde_json::json!({
        "status": info.status,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime": info.uptime_seconds,
        "memory": info.memory_kb,
        "version": info.version,
    }))
}

/// `GET /health/detailed` - independent component checks
///
/// Returns 200 when configuration, database, and LLM provider all pass;
/// 503 otherwise, with the per-check status/message objects either way.
pub async fn detailed_health(State(resources): State<Arc<ServerResources>>) -> Response {
    let detailed = resources.health.detailed().await;

    let status = if detailed.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = serde_json::json!({
        "success": detailed.healthy,
        "data": {
            "status": if detailed.healthy { "healthy" } else { "unhealthy" },
            "checks": detailed.checks,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status, Json(body)).into_response()
}
