// ABOUTME: HTTP middleware for relay authentication, rate limiting, and CORS
// ABOUTME: Applied to the API-key-protected webhook and chat surfaces
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

/// Shared API key authentication
pub mod auth;
/// CORS layer construction
pub mod cors;
/// Fixed-window rate limiting
pub mod rate_limit;

pub use auth::ApiKeyAuth;
pub use rate_limit::FixedWindowLimiter;
