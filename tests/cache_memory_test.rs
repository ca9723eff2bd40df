// ABOUTME: Unit tests for the in-memory session cache
// ABOUTME: Covers message bounding, TTL expiry, merge order, and clearing
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright (c) 2025 FastBot

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use anyhow::Result;
use fastbot_server::cache::memory::InMemorySessionCache;
use fastbot_server::cache::{CacheConfig, SessionCache};
use fastbot_server::models::{ConversationMessage, SessionKey};
use std::time::Duration;
use uuid::Uuid;

fn test_key() -> SessionKey {
    SessionKey::new(Uuid::new_v4(), Uuid::new_v4().to_string())
}

fn create_test_cache(max_sessions: usize) -> InMemorySessionCache {
    InMemorySessionCache::new(&CacheConfig {
        max_sessions,
        cleanup_interval: Duration::from_secs(300),
        enable_background_cleanup: false, // Disable in tests to avoid runtime conflicts
    })
}

fn turn(question: &str, answer: &str) -> Vec<ConversationMessage> {
    vec![
        ConversationMessage::user(question),
        ConversationMessage::assistant(answer),
    ]
}

#[tokio::test]
async fn test_append_and_get() -> Result<()> {
    let cache = create_test_cache(100);
    let key = test_key();

    cache
        .append(&key, &turn("hi", "hello"), 10, Duration::from_secs(60))
        .await?;

    let messages = cache.get(&key).await?;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "hi");
    assert_eq!(messages[1].content, "hello");

    Ok(())
}

#[tokio::test]
async fn test_miss_returns_empty() -> Result<()> {
    let cache = create_test_cache(100);
    let messages = cache.get(&test_key()).await?;
    assert!(messages.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_bounding_keeps_most_recent_in_order() -> Result<()> {
    let cache = create_test_cache(100);
    let key = test_key();

    // 8 appends of 2 messages each with a window of 6
    for i in 0..8 {
        cache
            .append(
                &key,
                &turn(&format!("q{i}"), &format!("a{i}")),
                6,
                Duration::from_secs(60),
            )
            .await?;
    }

    let messages = cache.get(&key).await?;
    assert_eq!(messages.len(), 6);

    // The oldest entries were dropped first, order is preserved
    let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["q5", "a5", "q6", "a6", "q7", "a7"]);

    Ok(())
}

#[tokio::test]
async fn test_entry_expires_after_ttl() -> Result<()> {
    let cache = create_test_cache(100);
    let key = test_key();

    cache
        .append(&key, &turn("hi", "hello"), 10, Duration::from_millis(100))
        .await?;

    // Hit before expiry
    assert_eq!(cache.get(&key).await?.len(), 2);

    tokio::time::sleep(Duration::from_millis(150)).await;

    // Miss after expiry
    assert!(cache.get(&key).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_append_resets_expiry() -> Result<()> {
    let cache = create_test_cache(100);
    let key = test_key();

    cache
        .append(&key, &turn("q0", "a0"), 10, Duration::from_millis(200))
        .await?;
    tokio::time::sleep(Duration::from_millis(120)).await;

    // The second append restarts the clock for the whole entry
    cache
        .append(&key, &turn("q1", "a1"), 10, Duration::from_millis(200))
        .await?;
    tokio::time::sleep(Duration::from_millis(120)).await;

    let messages = cache.get(&key).await?;
    assert_eq!(messages.len(), 4);

    Ok(())
}

#[tokio::test]
async fn test_append_to_expired_entry_starts_fresh() -> Result<()> {
    let cache = create_test_cache(100);
    let key = test_key();

    cache
        .append(&key, &turn("old", "turn"), 10, Duration::from_millis(50))
        .await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    cache
        .append(&key, &turn("new", "turn"), 10, Duration::from_secs(60))
        .await?;

    let messages = cache.get(&key).await?;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "new");

    Ok(())
}

#[tokio::test]
async fn test_clear_removes_entry() -> Result<()> {
    let cache = create_test_cache(100);
    let key = test_key();

    cache
        .append(&key, &turn("hi", "hello"), 10, Duration::from_secs(60))
        .await?;
    cache.clear(&key).await?;

    assert!(cache.get(&key).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_sessions_are_isolated() -> Result<()> {
    let cache = create_test_cache(100);
    let key_a = test_key();
    let key_b = test_key();

    cache
        .append(&key_a, &turn("for a", "reply a"), 10, Duration::from_secs(60))
        .await?;

    assert!(cache.get(&key_b).await?.is_empty());
    assert_eq!(cache.get(&key_a).await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_lru_evicts_oldest_session() -> Result<()> {
    let cache = create_test_cache(2);
    let key_a = test_key();
    let key_b = test_key();
    let key_c = test_key();

    for key in [&key_a, &key_b, &key_c] {
        cache
            .append(key, &turn("q", "a"), 10, Duration::from_secs(60))
            .await?;
    }

    // Capacity 2: the least recently used session fell out
    assert!(cache.get(&key_a).await?.is_empty());
    assert_eq!(cache.get(&key_b).await?.len(), 2);
    assert_eq!(cache.get(&key_c).await?.len(), 2);

    Ok(())
}
