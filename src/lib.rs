// ABOUTME: Main library entry point for the FastBot chatbot backend
// ABOUTME: Exposes the conversation pipeline and the webhook relay HTTP surface
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

#![deny(unsafe_code)]

//! # FastBot Server
//!
//! Backend for configurable per-account chatbots. Each chat turn combines
//! stored chatbot configuration, vector-retrieved document context, and
//! recent conversation memory into a bounded prompt, calls a
//! language-model completion endpoint with a retry policy, and records the
//! finished turn.
//!
//! ## Architecture
//!
//! - **Pipeline**: configuration resolution, vector context retrieval,
//!   prompt assembly, retrying completion client
//! - **Cache**: in-memory per-session TTL cache in front of the durable
//!   conversation log
//! - **Database**: REST client for the hosted database (config rows,
//!   similarity-search RPC, conversation log)
//! - **Routes**: webhook relay, chat, and health endpoints behind shared
//!   API key auth and rate limiting
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fastbot_server::config::ServerConfig;
//! use fastbot_server::server::{self, ServerResources};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     let resources = ServerResources::from_config(config)?;
//!     server::run(resources).await?;
//!     Ok(())
//! }
//! ```

/// Session cache abstraction with pluggable backends
pub mod cache;

/// Configuration management
pub mod config;

/// Application constants and documented defaults
pub mod constants;

/// Hosted database access
pub mod database;

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Health checks and monitoring
pub mod health;

/// LLM provider abstraction and the retrying completion client
pub mod llm;

/// Production logging and structured output
pub mod logging;

/// HTTP middleware for authentication, rate limiting, and CORS
pub mod middleware;

/// Common data models
pub mod models;

/// The conversation-context assembly pipeline
pub mod pipeline;

/// HTTP routes for the relay surface
pub mod routes;

/// Server resource wiring and the serve loop
pub mod server;
