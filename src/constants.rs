// ABOUTME: Application constants organized by domain, plus env-var accessor helpers
// ABOUTME: Single home for every documented default so behavior is auditable in one place
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

//! Constants module
//!
//! Documented defaults for the conversation pipeline, grouped by domain.
//! Anything a deployment may want to tune reads its override from the
//! environment through [`env_config`].

/// Session cache defaults
pub mod cache {
    /// Maximum messages retained in the active cache view of a session
    pub const DEFAULT_MAX_MESSAGES: usize = 10;

    /// Session cache entry TTL in seconds (30 minutes)
    pub const DEFAULT_TTL_SECS: u64 = 1800;

    /// Maximum number of sessions held in the in-memory cache
    pub const DEFAULT_MAX_SESSIONS: usize = 1000;

    /// Interval between background sweeps for expired entries
    pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 300;
}

/// Vector context retrieval defaults
pub mod retrieval {
    /// Minimum similarity a chunk must score to be considered
    pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.5;

    /// Maximum candidate chunks requested from the similarity search
    pub const DEFAULT_MAX_CANDIDATES: usize = 5;

    /// Token budget for concatenated document context
    pub const DEFAULT_TOKEN_BUDGET: usize = 1500;

    /// Rough token estimate per character of text
    pub const TOKENS_PER_CHAR: f64 = 0.25;

    /// Deadline for the embedding call and the similarity search, each
    pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
}

/// Completion retry policy defaults
pub mod retry {
    /// Maximum completion attempts (first call included)
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// Base backoff delay in milliseconds
    pub const DEFAULT_BASE_DELAY_MS: u64 = 2000;

    /// Multiplier applied to the delay after each failed attempt
    pub const DEFAULT_BACKOFF_FACTOR: u32 = 2;

    /// Upper bound on a single backoff delay in milliseconds
    pub const DEFAULT_MAX_DELAY_MS: u64 = 15_000;
}

/// Behavior-knob defaults applied when an account has no stored configuration
pub mod behavior {
    /// Formality slider midpoint-leaning-formal default (0-100)
    pub const DEFAULT_FORMALITY: u8 = 60;

    /// Paragraph size preference default (0-100)
    pub const DEFAULT_PARAGRAPH_SIZE: u8 = 50;

    /// Source strictness default: stick closely to provided material (0-100)
    pub const DEFAULT_SOURCE_STRICTNESS: u8 = 90;

    /// Confidence threshold below which the fallback action applies (0-100)
    pub const DEFAULT_CONFIDENCE_THRESHOLD: u8 = 80;

    /// Default history window rendered into the prompt, in turns
    pub const DEFAULT_HISTORY_TURNS: usize = 5;
}

/// Relay API rate limiting defaults
pub mod rate_limit {
    /// Window length in seconds (15 minutes)
    pub const DEFAULT_WINDOW_SECS: u64 = 900;

    /// Maximum requests per client per window
    pub const DEFAULT_MAX_REQUESTS: u32 = 100;
}

/// Service identity
pub mod service {
    /// Service name used in logs and health payloads
    pub const NAME: &str = "fastbot-server";
}

/// Environment-based configuration accessors
pub mod env_config {
    use std::env;

    /// Get HTTP server port from environment or default
    #[must_use]
    pub fn http_port() -> u16 {
        env::var("HTTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080)
    }

    /// Get rate limit window length from environment or default
    #[must_use]
    pub fn rate_limit_window_secs() -> u64 {
        env::var("RATE_LIMIT_WINDOW_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(super::rate_limit::DEFAULT_WINDOW_SECS)
    }

    /// Get per-window request budget from environment or default
    #[must_use]
    pub fn rate_limit_max_requests() -> u32 {
        env::var("RATE_LIMIT_MAX_REQUESTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(super::rate_limit::DEFAULT_MAX_REQUESTS)
    }

    /// Get allowed CORS origins from environment (comma-separated, `*` allowed)
    #[must_use]
    pub fn cors_allowed_origins() -> String {
        env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_owned())
    }
}
