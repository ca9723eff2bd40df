// ABOUTME: Integration tests for vector context retrieval
// ABOUTME: Account isolation, provenance hygiene, token budget trimming, and degradation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use common::{FakeDataStore, StubLlmProvider};
use fastbot_server::pipeline::{RetrievalConfig, VectorContextRetriever};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn retriever(
    provider: Arc<StubLlmProvider>,
    store: Arc<FakeDataStore>,
) -> VectorContextRetriever {
    VectorContextRetriever::new(
        provider,
        store,
        RetrievalConfig {
            similarity_threshold: 0.5,
            max_candidates: 5,
            timeout: Duration::from_secs(2),
        },
    )
}

#[tokio::test]
async fn test_retrieval_concatenates_ranked_chunks() {
    let account = Uuid::new_v4();
    let store = Arc::new(
        FakeDataStore::new()
            .with_chunk(account, "Second best chunk.", 0.7)
            .with_chunk(account, "Best chunk.", 0.9),
    );
    let provider = Arc::new(StubLlmProvider::new("unused"));

    let context = retriever(provider, store)
        .retrieve("question", account, 1000)
        .await;

    assert_eq!(context, "Best chunk.\n\nSecond best chunk.");
}

#[tokio::test]
async fn test_chunks_below_threshold_are_excluded() {
    let account = Uuid::new_v4();
    let store = Arc::new(
        FakeDataStore::new()
            .with_chunk(account, "Relevant chunk.", 0.8)
            .with_chunk(account, "Barely related chunk.", 0.3),
    );
    let provider = Arc::new(StubLlmProvider::new("unused"));

    let context = retriever(provider, store)
        .retrieve("question", account, 1000)
        .await;

    assert!(context.contains("Relevant chunk."));
    assert!(!context.contains("Barely related"));
}

#[tokio::test]
async fn test_cross_account_chunks_never_leak() {
    let account_a = Uuid::new_v4();
    let account_b = Uuid::new_v4();
    let store = Arc::new(
        FakeDataStore::new()
            .with_chunk(account_a, "ALPHA_SECRET_42 belongs to account A.", 0.95)
            .with_chunk(account_b, "Account B's own material.", 0.6),
    );
    let provider = Arc::new(StubLlmProvider::new("unused"));

    let context = retriever(provider, store.clone())
        .retrieve("semantically similar question", account_b, 1000)
        .await;

    assert!(!context.contains("ALPHA_SECRET_42"));
    assert!(context.contains("Account B's own material."));
}

#[tokio::test]
async fn test_foreign_chunks_are_discarded_even_if_the_search_leaks() {
    let account_a = Uuid::new_v4();
    let account_b = Uuid::new_v4();
    let store = Arc::new(
        FakeDataStore::new()
            .with_chunk(account_a, "ALPHA_SECRET_42 belongs to account A.", 0.95)
            .with_chunk(account_b, "Account B's own material.", 0.6),
    );
    // Simulate a misbehaving RPC that ignores the owner scope
    store.leak_foreign_chunks.store(true, Ordering::SeqCst);
    let provider = Arc::new(StubLlmProvider::new("unused"));

    let context = retriever(provider, store)
        .retrieve("semantically similar question", account_b, 1000)
        .await;

    // The client-side owner check is the backstop for the hard invariant
    assert!(!context.contains("ALPHA_SECRET_42"));
    assert!(context.contains("Account B's own material."));
}

#[tokio::test]
async fn test_no_provenance_in_returned_text() {
    let account = Uuid::new_v4();
    let store = Arc::new(FakeDataStore::new().with_chunk(
        account,
        "Our office opens at nine.",
        0.9,
    ));
    let provider = Arc::new(StubLlmProvider::new("unused"));

    let context = retriever(provider, store)
        .retrieve("when do you open?", account, 1000)
        .await;

    assert!(!context.contains("Fonte:"));
    assert!(!context.contains("Similarity"));
    assert!(!context.contains("0.9"));
    assert!(!context.contains("handbook.pdf"));
}

#[tokio::test]
async fn test_token_budget_stops_before_overflow() {
    let account = Uuid::new_v4();
    // Each chunk is 100 chars = ~25 tokens
    let chunk_text = "x".repeat(100);
    let store = Arc::new(
        FakeDataStore::new()
            .with_chunk(account, &chunk_text, 0.9)
            .with_chunk(account, &chunk_text, 0.8)
            .with_chunk(account, &chunk_text, 0.7),
    );
    let provider = Arc::new(StubLlmProvider::new("unused"));

    // Budget fits two chunks plus a separator, not three
    let context = retriever(provider, store)
        .retrieve("question", account, 55)
        .await;

    assert_eq!(context.len(), 202);
}

#[tokio::test]
async fn test_embedding_failure_degrades_to_empty() {
    let account = Uuid::new_v4();
    let store = Arc::new(FakeDataStore::new().with_chunk(account, "Available chunk.", 0.9));
    let provider = Arc::new(StubLlmProvider::new("unused"));
    provider.fail_embedding.store(true, Ordering::SeqCst);

    let context = retriever(provider, store)
        .retrieve("question", account, 1000)
        .await;

    assert!(context.is_empty());
}

#[tokio::test]
async fn test_search_failure_degrades_to_empty() {
    let account = Uuid::new_v4();
    let store = Arc::new(FakeDataStore::new().with_chunk(account, "Available chunk.", 0.9));
    store.fail_search.store(true, Ordering::SeqCst);
    let provider = Arc::new(StubLlmProvider::new("unused"));

    let context = retriever(provider, store)
        .retrieve("question", account, 1000)
        .await;

    assert!(context.is_empty());
}

#[tokio::test]
async fn test_empty_corpus_returns_empty() {
    let store = Arc::new(FakeDataStore::new());
    let provider = Arc::new(StubLlmProvider::new("unused"));

    let context = retriever(provider, store)
        .retrieve("question", Uuid::new_v4(), 1000)
        .await;

    assert!(context.is_empty());
}
