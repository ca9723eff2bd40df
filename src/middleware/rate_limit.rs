// ABOUTME: Fixed-window rate limiting middleware for the relay surface
// ABOUTME: Keys windows by API key when present, else peer address; sets X-RateLimit headers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use http::{HeaderMap, HeaderValue};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;
use crate::errors::{AppError, AppResult};

/// HTTP header names for rate limiting
pub mod headers {
    /// Maximum requests allowed in the current window
    pub const X_RATE_LIMIT_LIMIT: &str = "X-RateLimit-Limit";
    /// Remaining requests in the current window
    pub const X_RATE_LIMIT_REMAINING: &str = "X-RateLimit-Remaining";
    /// Unix timestamp when the window resets
    pub const X_RATE_LIMIT_RESET: &str = "X-RateLimit-Reset";
    /// Seconds until the client may retry
    pub const RETRY_AFTER: &str = "Retry-After";
}

/// Snapshot of a client's window after counting a request
#[derive(Debug, Clone, Copy)]
pub struct RateLimitStatus {
    /// Window budget
    pub limit: u32,
    /// Requests left in the window
    pub remaining: u32,
    /// When the window resets
    pub reset_at: DateTime<Utc>,
}

#[derive(Debug)]
struct WindowState {
    started: Instant,
    count: u32,
}

/// Fixed-window request limiter
///
/// One window per client key. The dashmap entry is the only shared state
/// and the per-entry lock makes count-and-check atomic per client.
pub struct FixedWindowLimiter {
    windows: DashMap<String, WindowState>,
    window: Duration,
    max_requests: u32,
}

impl FixedWindowLimiter {
    /// Create a limiter from the rate limit configuration
    #[must_use]
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            window: Duration::from_secs(config.window_secs),
            max_requests: config.max_requests,
        }
    }

    /// Count a request for a client and decide whether it may proceed
    ///
    /// # Errors
    ///
    /// Returns a `RateLimitExceeded` error carrying the reset time when the
    /// window budget is spent.
    pub fn check(&self, client: &str) -> AppResult<RateLimitStatus> {
        let now = Instant::now();
        let mut entry = self
            .windows
            .entry(client.to_owned())
            .or_insert_with(|| WindowState {
                started: now,
                count: 0,
            });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        let elapsed = now.duration_since(entry.started);
        let reset_at = Utc::now()
            + chrono::Duration::from_std(self.window - elapsed)
                .unwrap_or_else(|_| chrono::Duration::seconds(0));

        if entry.count >= self.max_requests {
            drop(entry);
            return Err(AppError::rate_limit_exceeded(self.max_requests, reset_at));
        }

        entry.count += 1;
        let status = RateLimitStatus {
            limit: self.max_requests,
            remaining: self.max_requests - entry.count,
            reset_at,
        };
        drop(entry);

        Ok(status)
    }
}

/// Pick the window key for a request: presented API key first, peer IP otherwise
fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(key) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        return format!("key:{key}");
    }
    if let Some(bearer) = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return format!("key:{bearer}");
    }
    peer.map_or_else(|| "ip:unknown".to_owned(), |addr| format!("ip:{}", addr.ip()))
}

/// Attach `X-RateLimit-*` headers to a response
fn apply_headers(response: &mut Response, status: RateLimitStatus) {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&status.limit.to_string()) {
        headers.insert(headers::X_RATE_LIMIT_LIMIT, value);
    }
    if let Ok(value) = HeaderValue::from_str(&status.remaining.to_string()) {
        headers.insert(headers::X_RATE_LIMIT_REMAINING, value);
    }
    if let Ok(value) = HeaderValue::from_str(&status.reset_at.timestamp().to_string()) {
        headers.insert(headers::X_RATE_LIMIT_RESET, value);
    }
}

/// Axum middleware enforcing the fixed-window limit
///
/// # Errors
///
/// Rejects the request with 429 when the client's window budget is spent.
pub async fn enforce_rate_limit(
    State(limiter): State<Arc<FixedWindowLimiter>>,
    request: Request,
    next: Next,
) -> AppResult<Response> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let client = client_key(request.headers(), peer);

    let status = limiter.check(&client)?;

    let mut response = next.run(request).await;
    apply_headers(&mut response, status);
    Ok(response)
}
