// ABOUTME: Configuration management for environment-driven server settings
// ABOUTME: Re-exports the environment module's typed configuration structs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

/// Environment-based configuration management
pub mod environment;

pub use environment::{
    AuthConfig, CorsConfig, DatabaseConfig, Environment, LlmConfig, LogLevel, RateLimitConfig,
    ServerConfig,
};
