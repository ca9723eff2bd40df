// ABOUTME: Unified error handling with standard error codes and HTTP response mapping
// ABOUTME: Groups failures into validation, upstream-transient, upstream-permanent, and storage classes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

//! # Unified Error Handling System
//!
//! This module provides the centralized error system for the FastBot server.
//! Every fallible operation returns [`AppError`], whose [`ErrorCode`] decides
//! the HTTP status, whether the completion retry policy may retry it, and how
//! it is rendered into the API error envelope.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Authentication (1000-1999)
    /// No credentials were supplied
    #[serde(rename = "AUTH_REQUIRED")]
    AuthRequired = 1000,
    /// Credentials were supplied but do not match the configured key
    #[serde(rename = "AUTH_INVALID")]
    AuthInvalid = 1001,

    // Rate limiting (2000-2999)
    /// The client exceeded the request window
    #[serde(rename = "RATE_LIMIT_EXCEEDED")]
    RateLimitExceeded = 2000,

    // Validation (3000-3999)
    /// The provided input is invalid
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 3000,
    /// A required field is missing
    #[serde(rename = "MISSING_REQUIRED_FIELD")]
    MissingRequiredField = 3001,
    /// A field is present but malformed
    #[serde(rename = "INVALID_FORMAT")]
    InvalidFormat = 3002,

    // Resource management (4000-4999)
    /// The requested resource does not exist
    #[serde(rename = "RESOURCE_NOT_FOUND")]
    ResourceNotFound = 4000,

    // Upstream services, transient (5000-5499)
    /// Upstream provider unreachable or returned a 5xx
    #[serde(rename = "UPSTREAM_UNAVAILABLE")]
    UpstreamUnavailable = 5000,
    /// Upstream provider returned 429
    #[serde(rename = "UPSTREAM_RATE_LIMITED")]
    UpstreamRateLimited = 5001,
    /// Upstream call exceeded its deadline
    #[serde(rename = "UPSTREAM_TIMEOUT")]
    UpstreamTimeout = 5002,

    // Upstream services, permanent (5500-5999)
    /// Upstream provider rejected the request (4xx other than 429)
    #[serde(rename = "UPSTREAM_REJECTED")]
    UpstreamRejected = 5500,
    /// A required upstream credential is not configured
    #[serde(rename = "CREDENTIAL_MISSING")]
    CredentialMissing = 5501,

    // Configuration (6000-6999)
    /// Server configuration error
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError = 6000,

    // Internal errors (9000-9999)
    /// Unclassified internal failure
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    /// Cache or persistent store operation failed
    #[serde(rename = "STORAGE_ERROR")]
    StorageError = 9001,
    /// Data serialization/deserialization failed
    #[serde(rename = "SERIALIZATION_ERROR")]
    SerializationError = 9002,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            // 400 Bad Request
            Self::InvalidInput | Self::MissingRequiredField | Self::InvalidFormat => 400,

            // 401 Unauthorized
            Self::AuthRequired | Self::AuthInvalid => 401,

            // 404 Not Found
            Self::ResourceNotFound => 404,

            // 429 Too Many Requests
            Self::RateLimitExceeded => 429,

            // 502 Bad Gateway
            Self::UpstreamRejected => 502,

            // 503 Service Unavailable
            Self::UpstreamUnavailable | Self::UpstreamRateLimited => 503,

            // 504 Gateway Timeout
            Self::UpstreamTimeout => 504,

            // 500 Internal Server Error
            Self::CredentialMissing
            | Self::ConfigError
            | Self::InternalError
            | Self::StorageError
            | Self::SerializationError => 500,
        }
    }

    /// Whether a retry policy is allowed to retry a failure carrying this code
    ///
    /// Only transient upstream conditions qualify; validation failures,
    /// upstream rejections, and missing credentials never do.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable | Self::UpstreamRateLimited | Self::UpstreamTimeout
        )
    }

    /// Get a user-safe description of this error
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::AuthRequired => "Authentication is required to access this resource",
            Self::AuthInvalid => "The provided API key is invalid",
            Self::RateLimitExceeded => "Rate limit exceeded. Please slow down your requests",
            Self::InvalidInput => "The provided input is invalid",
            Self::MissingRequiredField => "A required field is missing from the request",
            Self::InvalidFormat => "The data format is invalid",
            Self::ResourceNotFound => "The requested resource was not found",
            Self::UpstreamUnavailable => "An external service is currently unavailable",
            Self::UpstreamRateLimited => "External service rate limit exceeded",
            Self::UpstreamTimeout => "An external service did not respond in time",
            Self::UpstreamRejected => "An external service rejected the request",
            Self::CredentialMissing => "A required external credential is not configured",
            Self::ConfigError => "Configuration error encountered",
            Self::InternalError => "An internal server error occurred",
            Self::StorageError => "Storage operation failed",
            Self::SerializationError => "Data serialization/deserialization failed",
        }
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Operator-facing error message; never shown to end users verbatim for
    /// upstream failures
    pub message: String,
    /// Structured details attached to validation errors for the API envelope
    pub details: Option<serde_json::Value>,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Attach structured details (rendered in the error envelope)
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Attach a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Whether the retry policy may retry this failure
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        self.code.is_transient()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Convenience constructors for common errors
impl AppError {
    /// Authentication required
    #[must_use]
    pub fn auth_required() -> Self {
        Self::new(ErrorCode::AuthRequired, "Authentication required")
    }

    /// Invalid authentication
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    /// Rate limit exceeded
    #[must_use]
    pub fn rate_limit_exceeded(limit: u32, reset_at: chrono::DateTime<chrono::Utc>) -> Self {
        Self::new(
            ErrorCode::RateLimitExceeded,
            format!("Rate limit of {limit} requests exceeded"),
        )
        .with_details(serde_json::json!({
            "limit": limit,
            "reset_at": reset_at.to_rfc3339(),
        }))
    }

    /// Invalid input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Missing required field
    pub fn missing_field(field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("Missing required field: {field}"),
        )
        .with_details(serde_json::json!({ "field": field }))
    }

    /// Field present but malformed
    pub fn invalid_format(field: impl Into<String>, expected: impl Into<String>) -> Self {
        let field = field.into();
        let expected = expected.into();
        Self::new(
            ErrorCode::InvalidFormat,
            format!("Field '{field}' is malformed (expected {expected})"),
        )
        .with_details(serde_json::json!({ "field": field, "expected": expected }))
    }

    /// Resource not found
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// Transient upstream failure (unreachable or 5xx)
    pub fn upstream_unavailable(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::UpstreamUnavailable,
            format!("{}: {}", service.into(), message.into()),
        )
    }

    /// Upstream 429
    pub fn upstream_rate_limited(service: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::UpstreamRateLimited,
            format!("{} rate limit hit", service.into()),
        )
    }

    /// Upstream deadline exceeded
    pub fn upstream_timeout(service: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::UpstreamTimeout,
            format!("{} request timed out", service.into()),
        )
    }

    /// Permanent upstream rejection (4xx other than 429)
    pub fn upstream_rejected(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::UpstreamRejected,
            format!("{}: {}", service.into(), message.into()),
        )
    }

    /// Required upstream credential not configured
    pub fn credential_missing(name: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::CredentialMissing,
            format!("Credential {} is not configured", name.into()),
        )
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Storage error (cache or persistent store)
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }

    /// Internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

/// Conversion from reqwest errors, classified for the retry predicate
impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        let classified = if error.is_timeout() {
            Self::upstream_timeout("upstream")
        } else {
            Self::upstream_unavailable("upstream", error.to_string())
        };
        classified.with_source(error)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(ErrorCode::SerializationError, error.to_string()).with_source(error)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(ErrorCode::InternalError, error.to_string())
    }
}

/// Render the error as the API envelope: `{success, error, details?, timestamp}`
///
/// End users only ever see the code's generic description plus whatever
/// structured `details` a validation error attached; the full message and
/// source chain stay in operator logs.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = axum::http::StatusCode::from_u16(self.http_status())
            .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(code = ?self.code, "request failed: {self}");
        } else {
            tracing::debug!(code = ?self.code, "request rejected: {self}");
        }

        let mut body = serde_json::json!({
            "success": false,
            "error": self.code.description(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        if let (Some(details), Some(map)) = (self.details, body.as_object_mut()) {
            map.insert("details".to_owned(), details);
        }

        (status, Json(body)).into_response()
    }
}
