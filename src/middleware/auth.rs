// ABOUTME: Shared API key authentication middleware for the relay surface
// ABOUTME: Accepts x-api-key or Authorization Bearer; skipped when no key is configured
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use http::HeaderMap;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::errors::{AppError, AppResult};

/// Shared API key verifier
///
/// When no key is configured server-side, authentication is skipped. That is
/// documented development-mode behavior; production deployments must set
/// `WEBHOOK_API_KEY` (startup validation flags it).
#[derive(Clone)]
pub struct ApiKeyAuth {
    expected: Option<Arc<str>>,
}

impl ApiKeyAuth {
    /// Create a verifier from the auth configuration
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        if config.api_key.is_none() {
            warn!("relay authentication disabled: no shared API key configured");
        }
        Self {
            expected: config.api_key.as_deref().map(Arc::from),
        }
    }

    /// Extract the presented key from `x-api-key` or `Authorization: Bearer`
    fn presented_key(headers: &HeaderMap) -> Option<&str> {
        if let Some(key) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
            return Some(key);
        }
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }

    /// Verify the request headers against the configured key
    ///
    /// # Errors
    ///
    /// Returns `AuthRequired` when no key is presented and `AuthInvalid`
    /// when the presented key does not match.
    pub fn verify(&self, headers: &HeaderMap) -> AppResult<()> {
        let Some(expected) = &self.expected else {
            debug!("authentication skipped (development mode)");
            return Ok(());
        };

        let Some(presented) = Self::presented_key(headers) else {
            return Err(AppError::auth_required());
        };

        // Constant-time comparison; length mismatch short-circuits but leaks
        // nothing an attacker does not already control
        if presented.as_bytes().ct_eq(expected.as_bytes()).into() {
            Ok(())
        } else {
            Err(AppError::auth_invalid("API key does not match"))
        }
    }
}

/// Axum middleware enforcing the shared API key
///
/// # Errors
///
/// Rejects the request with 401 when verification fails.
pub async fn require_api_key(
    State(auth): State<ApiKeyAuth>,
    request: Request,
    next: Next,
) -> AppResult<Response> {
    auth.verify(request.headers())?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn auth_with_key(key: &str) -> ApiKeyAuth {
        ApiKeyAuth::new(&AuthConfig {
            api_key: Some(key.to_owned()),
        })
    }

    #[test]
    fn test_unconfigured_key_skips_auth() {
        let auth = ApiKeyAuth::new(&AuthConfig::default());
        assert!(auth.verify(&HeaderMap::new()).is_ok());
    }

    #[test]
    fn test_x_api_key_header_accepted() {
        let auth = auth_with_key("secret-key");
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("secret-key"));
        assert!(auth.verify(&headers).is_ok());
    }

    #[test]
    fn test_bearer_header_accepted() {
        let auth = auth_with_key("secret-key");
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer secret-key"));
        assert!(auth.verify(&headers).is_ok());
    }

    #[test]
    fn test_missing_key_rejected() {
        let auth = auth_with_key("secret-key");
        let error = auth.verify(&HeaderMap::new()).unwrap_err();
        assert_eq!(error.http_status(), 401);
    }

    #[test]
    fn test_wrong_key_rejected() {
        let auth = auth_with_key("secret-key");
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("other-key"));
        let error = auth.verify(&headers).unwrap_err();
        assert_eq!(error.http_status(), 401);
    }
}
