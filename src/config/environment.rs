// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Parses environment variables into typed sub-configs with documented defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

//! Environment-based configuration management for production deployment

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;

use crate::constants::env_config;

/// Strongly typed log level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Errors only
    Error,
    /// Warnings and errors
    Warn,
    /// Standard operational logging
    #[default]
    Info,
    /// Verbose debugging
    Debug,
    /// Everything
    Trace,
}

impl LogLevel {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => Self::Error,
            "warn" => Self::Warn,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Info,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

/// Environment type controlling security posture
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development (relaxed auth, pretty logs)
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Test runs
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    /// API key; completion and embedding calls degrade when absent
    pub api_key: Option<String>,
    /// Chat completion model
    pub model: String,
    /// Embedding model used by the context retriever
    pub embedding_model: String,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Completion token cap
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_owned(),
            api_key: None,
            model: "gpt-4o-mini".to_owned(),
            embedding_model: "text-embedding-3-small".to_owned(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Hosted database (REST surface) configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Base URL of the hosted database REST API
    pub url: Option<String>,
    /// Service credential sent with every request
    pub service_key: Option<String>,
}

/// Relay authentication configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared API key expected in `x-api-key` or `Authorization: Bearer`.
    /// When unset, authentication is skipped (development mode only).
    pub api_key: Option<String>,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated origin list, or `*`
    pub allowed_origins: String,
}

/// Fixed-window rate limit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Window length in seconds
    pub window_secs: u64,
    /// Requests allowed per client per window
    pub max_requests: u32,
}

/// Top-level server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP API port
    pub http_port: u16,
    /// Log level
    pub log_level: LogLevel,
    /// Deployment environment
    pub environment: Environment,
    /// LLM provider settings
    pub llm: LlmConfig,
    /// Hosted database settings
    pub database: DatabaseConfig,
    /// Relay authentication settings
    pub auth: AuthConfig,
    /// CORS settings
    pub cors: CorsConfig,
    /// Rate limiting settings
    pub rate_limit: RateLimitConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but unparseable
    /// (e.g. a non-numeric `LLM_TEMPERATURE`).
    pub fn from_env() -> Result<Self> {
        let environment = Environment::from_str_or_default(
            &env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_owned()),
        );
        let log_level = LogLevel::from_str_or_default(
            &env::var("RUST_LOG").unwrap_or_else(|_| "info".to_owned()),
        );

        let temperature = env::var("LLM_TEMPERATURE")
            .ok()
            .map(|s| s.parse::<f32>().context("LLM_TEMPERATURE must be a float"))
            .transpose()?;
        let max_tokens = env::var("LLM_MAX_TOKENS")
            .ok()
            .map(|s| {
                s.parse::<u32>()
                    .context("LLM_MAX_TOKENS must be an integer")
            })
            .transpose()?;

        let defaults = LlmConfig::default();
        let llm = LlmConfig {
            base_url: env::var("LLM_BASE_URL").unwrap_or(defaults.base_url),
            api_key: env::var("LLM_API_KEY").ok().filter(|k| !k.is_empty()),
            model: env::var("LLM_MODEL").unwrap_or(defaults.model),
            embedding_model: env::var("LLM_EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            temperature,
            max_tokens,
        };

        let database = DatabaseConfig {
            url: env::var("DATABASE_URL").ok().filter(|u| !u.is_empty()),
            service_key: env::var("DATABASE_SERVICE_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
        };

        let auth = AuthConfig {
            api_key: env::var("WEBHOOK_API_KEY").ok().filter(|k| !k.is_empty()),
        };

        if auth.api_key.is_none() {
            warn!("WEBHOOK_API_KEY is not set - relay authentication is DISABLED (development mode only)");
        }

        Ok(Self {
            http_port: env_config::http_port(),
            log_level,
            environment,
            llm,
            database,
            auth,
            cors: CorsConfig {
                allowed_origins: env_config::cors_allowed_origins(),
            },
            rate_limit: RateLimitConfig {
                window_secs: env_config::rate_limit_window_secs(),
                max_requests: env_config::rate_limit_max_requests(),
            },
        })
    }

    /// Problems that make this configuration unusable or unsafe
    ///
    /// Empty means the configuration check passes. Used by the detailed
    /// health endpoint and by startup validation in production.
    #[must_use]
    pub fn validation_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.llm.api_key.is_none() {
            issues.push("LLM_API_KEY is not configured".to_owned());
        }
        if self.database.url.is_none() {
            issues.push("DATABASE_URL is not configured".to_owned());
        }
        if self.database.url.is_some() && self.database.service_key.is_none() {
            issues.push("DATABASE_SERVICE_KEY is not configured".to_owned());
        }
        if self.environment.is_production() && self.auth.api_key.is_none() {
            issues.push("WEBHOOK_API_KEY must be set in production".to_owned());
        }

        issues
    }

    /// One-line startup summary safe to log (no secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "env={} port={} llm_model={} llm_key={} database={} relay_auth={} rate_limit={}/{}s",
            self.environment,
            self.http_port,
            self.llm.model,
            if self.llm.api_key.is_some() {
                "set"
            } else {
                "MISSING"
            },
            if self.database.url.is_some() {
                "set"
            } else {
                "MISSING"
            },
            if self.auth.api_key.is_some() {
                "enabled"
            } else {
                "DISABLED"
            },
            self.rate_limit.max_requests,
            self.rate_limit.window_secs,
        )
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            log_level: LogLevel::default(),
            environment: Environment::default(),
            llm: LlmConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            cors: CorsConfig {
                allowed_origins: "*".to_owned(),
            },
            rate_limit: RateLimitConfig {
                window_secs: crate::constants::rate_limit::DEFAULT_WINDOW_SECS,
                max_requests: crate::constants::rate_limit::DEFAULT_MAX_REQUESTS,
            },
        }
    }
}
