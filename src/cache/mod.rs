// ABOUTME: Session cache abstraction for short-term conversation memory with TTL expiry
// ABOUTME: Best-effort by contract - callers treat every failure as a cache miss
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

//! # Session Cache
//!
//! Short-term conversation memory, keyed per `(user, session)`. The cache is
//! an optimization, never a correctness requirement: the persistent
//! conversation store remains authoritative, and callers swallow cache
//! errors as misses. Expired entries behave exactly like absent entries and
//! are removed lazily on the next access.

/// In-memory cache implementation
pub mod memory;

use async_trait::async_trait;
use std::time::Duration;

use crate::constants::cache as cache_defaults;
use crate::errors::AppResult;
use crate::models::{ConversationMessage, SessionKey};

/// Session cache contract
///
/// `append` is a read-modify-write: new messages are merged into any
/// existing non-expired entry, the list is truncated to the last
/// `max_messages` entries (oldest dropped first), and the entry's expiry is
/// reset to `now + ttl`.
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Return the cached message list if present and not expired, otherwise empty
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails; callers treat this
    /// as a miss.
    async fn get(&self, key: &SessionKey) -> AppResult<Vec<ConversationMessage>>;

    /// Merge new messages into the session entry and reset its expiry
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails; callers log and
    /// continue.
    async fn append(
        &self,
        key: &SessionKey,
        messages: &[ConversationMessage],
        max_messages: usize,
        ttl: Duration,
    ) -> AppResult<()>;

    /// Remove the session entry immediately
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    async fn clear(&self, key: &SessionKey) -> AppResult<()>;

    /// Verify the cache backend is usable
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unhealthy.
    async fn health_check(&self) -> AppResult<()>;
}

/// Session cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of sessions retained before LRU eviction
    pub max_sessions: usize,
    /// Interval between background sweeps for expired entries
    pub cleanup_interval: Duration,
    /// Enable the background cleanup task (disable in tests to avoid
    /// runtime conflicts)
    pub enable_background_cleanup: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_sessions: cache_defaults::DEFAULT_MAX_SESSIONS,
            cleanup_interval: Duration::from_secs(cache_defaults::DEFAULT_CLEANUP_INTERVAL_SECS),
            enable_background_cleanup: true,
        }
    }
}
