// ABOUTME: In-memory session cache with LRU eviction and TTL expiry
// ABOUTME: Includes background cleanup task for expired entries
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright (c) 2025 FastBot

use super::{CacheConfig, SessionCache};
use crate::errors::AppResult;
use crate::models::{ConversationMessage, SessionKey};
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Cached session entry with expiration
#[derive(Debug, Clone)]
struct SessionEntry {
    messages: Vec<ConversationMessage>,
    expires_at: Instant,
}

impl SessionEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory session cache with LRU eviction and background cleanup
///
/// Uses `Arc<RwLock<LruCache>>` for shared state between cache operations
/// and the background cleanup task. The write lock also serializes the
/// read-modify-write performed by `append`, so concurrent sessions sharing
/// this process never interleave a merge.
#[derive(Clone)]
pub struct InMemorySessionCache {
    store: Arc<RwLock<LruCache<String, SessionEntry>>>,
    shutdown_tx: Option<Arc<tokio::sync::mpsc::Sender<()>>>,
}

impl InMemorySessionCache {
    /// Default capacity when config specifies zero sessions
    const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1000) {
        Some(n) => n,
        None => unreachable!(),
    };

    /// Create a new in-memory cache with optional background cleanup task
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_sessions).unwrap_or(Self::DEFAULT_CAPACITY);
        let store = Arc::new(RwLock::new(LruCache::new(capacity)));

        let shutdown_tx = if config.enable_background_cleanup {
            let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
            let store_clone = store.clone();
            let cleanup_interval = config.cleanup_interval;

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(cleanup_interval);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            Self::cleanup_expired(&store_clone).await;
                        }
                        _ = shutdown_rx.recv() => {
                            tracing::debug!("session cache cleanup task received shutdown signal");
                            break;
                        }
                    }
                }
            });

            Some(Arc::new(shutdown_tx))
        } else {
            None
        };

        Self { store, shutdown_tx }
    }

    /// Remove all expired entries from the store
    async fn cleanup_expired(store: &Arc<RwLock<LruCache<String, SessionEntry>>>) {
        let mut store_guard = store.write().await;

        // Collect expired keys first (can't modify while iterating)
        let expired_keys: Vec<String> = store_guard
            .iter()
            .filter_map(|(k, v)| v.is_expired().then(|| k.clone()))
            .collect();

        for key in &expired_keys {
            store_guard.pop(key);
        }

        let removed = expired_keys.len();
        drop(store_guard);
        if removed > 0 {
            tracing::debug!("cleaned up {} expired session cache entries", removed);
        }
    }
}

#[async_trait]
impl SessionCache for InMemorySessionCache {
    async fn get(&self, key: &SessionKey) -> AppResult<Vec<ConversationMessage>> {
        let mut store = self.store.write().await;

        // LruCache::get is mutable (updates access order)
        if let Some(entry) = store.get(&key.to_string()) {
            if entry.is_expired() {
                store.pop(&key.to_string());
                drop(store);
                return Ok(Vec::new());
            }

            let messages = entry.messages.clone();
            drop(store);
            return Ok(messages);
        }
        drop(store);

        Ok(Vec::new())
    }

    async fn append(
        &self,
        key: &SessionKey,
        messages: &[ConversationMessage],
        max_messages: usize,
        ttl: Duration,
    ) -> AppResult<()> {
        let mut store = self.store.write().await;

        let mut merged = match store.get(&key.to_string()) {
            Some(entry) if !entry.is_expired() => entry.messages.clone(),
            _ => Vec::new(),
        };
        merged.extend_from_slice(messages);

        // Keep the most recent max_messages, oldest dropped first
        if merged.len() > max_messages {
            merged.drain(..merged.len() - max_messages);
        }

        let entry = SessionEntry {
            messages: merged,
            expires_at: Instant::now() + ttl,
        };

        // LruCache handles eviction automatically on push
        store.push(key.to_string(), entry);
        drop(store);

        Ok(())
    }

    async fn clear(&self, key: &SessionKey) -> AppResult<()> {
        self.store.write().await.pop(&key.to_string());
        Ok(())
    }

    async fn health_check(&self) -> AppResult<()> {
        // In-memory cache is always healthy
        Ok(())
    }
}

impl Drop for InMemorySessionCache {
    fn drop(&mut self) {
        // Signal the background cleanup task to shut down once all clones
        // of the sender are gone
        if let Some(tx) = &self.shutdown_tx {
            if let Err(e) = tx.try_send(()) {
                tracing::debug!(error = ?e, "session cache shutdown signal send failed (channel likely closed)");
            }
        }
    }
}
