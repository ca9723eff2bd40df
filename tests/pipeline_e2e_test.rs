// ABOUTME: End-to-end pipeline tests: happy path, retrieval degradation, account isolation
// ABOUTME: Exercises one full chat turn against fakes behind the real trait seams
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use common::{fast_retry_policy, test_cache, FailingLlmProvider, FakeDataStore, StubLlmProvider};
use fastbot_server::cache::SessionCache;
use fastbot_server::database::DataStore;
use fastbot_server::llm::{CompletionClient, LlmProvider};
use fastbot_server::models::{ChatbotConfigRow, ConversationMessage, MessageRole, SessionKey};
use fastbot_server::pipeline::{
    ChatPipeline, ConfigResolver, PipelineConfig, RetrievalConfig, TurnRequest,
    VectorContextRetriever,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use uuid::Uuid;

struct TestHarness {
    pipeline: ChatPipeline,
    store: Arc<FakeDataStore>,
    cache: Arc<dyn SessionCache>,
}

fn harness(provider: Arc<dyn LlmProvider>, store: Arc<FakeDataStore>) -> TestHarness {
    let cache = test_cache();
    let pipeline = ChatPipeline::new(
        ConfigResolver::new(store.clone()),
        VectorContextRetriever::new(provider.clone(), store.clone(), RetrievalConfig::default()),
        CompletionClient::new(provider, fast_retry_policy()),
        cache.clone(),
        store.clone(),
        PipelineConfig::default(),
    );
    TestHarness {
        pipeline,
        store,
        cache,
    }
}

fn turn_request(account_id: Uuid, session_id: &str, message: &str) -> TurnRequest {
    TurnRequest {
        account_id,
        session_id: session_id.to_owned(),
        message: message.to_owned(),
        page: None,
        config_patch: None,
    }
}

#[tokio::test]
async fn test_happy_path_turn() {
    let account = Uuid::new_v4();
    let store = Arc::new(FakeDataStore::new().with_config(ChatbotConfigRow {
        account_id: account,
        chatbot_name: Some("Dr. Bot".to_owned()),
        office_hours: Some("9-18".to_owned()),
        ..ChatbotConfigRow::default()
    }));
    let provider = Arc::new(StubLlmProvider::new("We are open from 9 to 18."));
    let h = harness(provider.clone(), store);

    let outcome = h
        .pipeline
        .process_turn(turn_request(account, "session-1", "What are your hours?"))
        .await
        .unwrap();

    assert_eq!(outcome.reply, "We are open from 9 to 18.");
    assert!(!outcome.fallback_used);
    assert!(outcome.persisted);

    // The assembled prompt carries the configured facts and the behavior block
    let prompt = provider.last_prompt();
    assert!(prompt.contains("9-18"));
    assert!(prompt.contains("Follow these behavior rules:"));
    assert!(prompt.contains("What are your hours?"));

    // The finished turn landed in both the cache and the persistent store
    let key = SessionKey::new(account, "session-1");
    let cached = h.cache.get(&key).await.unwrap();
    assert_eq!(cached.len(), 2);
    assert_eq!(cached[0].role, MessageRole::User);
    assert_eq!(cached[1].role, MessageRole::Assistant);

    let saved = h.store.saved_messages(&key);
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].content, "What are your hours?");
    assert_eq!(saved[1].content, "We are open from 9 to 18.");
}

#[tokio::test]
async fn test_retrieval_degradation_still_completes_the_turn() {
    let account = Uuid::new_v4();
    let store = Arc::new(FakeDataStore::new().with_chunk(account, "Unreachable chunk.", 0.9));
    let provider = Arc::new(StubLlmProvider::new("Answer without documents."));
    provider.fail_embedding.store(true, Ordering::SeqCst);
    let h = harness(provider.clone(), store);

    let outcome = h
        .pipeline
        .process_turn(turn_request(account, "session-1", "What do you offer?"))
        .await
        .unwrap();

    assert_eq!(outcome.reply, "Answer without documents.");
    assert!(!outcome.fallback_used);

    // No empty reference section placeholder appears in the prompt
    let prompt = provider.last_prompt();
    assert!(!prompt.contains("Reference information"));
    assert!(!prompt.contains("Unreachable chunk."));
}

#[tokio::test]
async fn test_cross_account_isolation_end_to_end() {
    let account_a = Uuid::new_v4();
    let account_b = Uuid::new_v4();
    let store = Arc::new(
        FakeDataStore::new()
            .with_chunk(account_a, "ALPHA_SECRET_42 is account A's token.", 0.95)
            .with_chunk(account_b, "Account B public info.", 0.7),
    );
    let provider = Arc::new(StubLlmProvider::new("reply"));
    let h = harness(provider.clone(), store);

    h.pipeline
        .process_turn(turn_request(account_b, "session-b", "Tell me the secret token"))
        .await
        .unwrap();

    let prompt = provider.last_prompt();
    assert!(!prompt.contains("ALPHA_SECRET_42"));
    assert!(prompt.contains("Account B public info."));
}

#[tokio::test]
async fn test_completion_failure_yields_fallback_and_no_persistence() {
    let account = Uuid::new_v4();
    let store = Arc::new(FakeDataStore::new().with_config(ChatbotConfigRow {
        account_id: account,
        whatsapp: Some("+1 555 0100".to_owned()),
        ..ChatbotConfigRow::default()
    }));
    let provider = Arc::new(FailingLlmProvider::always_unavailable());
    let h = harness(provider.clone(), store);

    let outcome = h
        .pipeline
        .process_turn(turn_request(account, "session-1", "Hello?"))
        .await
        .unwrap();

    assert!(outcome.fallback_used);
    assert!(!outcome.persisted);
    // Configuration-derived canned reply, no internal error text
    assert!(outcome.reply.contains("+1 555 0100"));
    assert!(!outcome.reply.contains("503"));
    assert!(!outcome.reply.contains("injected"));

    // Nothing was written for the failed turn
    let key = SessionKey::new(account, "session-1");
    assert!(h.store.saved_messages(&key).is_empty());
    assert!(h.cache.get(&key).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_history_flows_into_the_next_prompt() {
    let account = Uuid::new_v4();
    let store = Arc::new(FakeDataStore::new());
    let provider = Arc::new(StubLlmProvider::new("a reply"));
    let h = harness(provider.clone(), store);

    h.pipeline
        .process_turn(turn_request(account, "session-1", "First question"))
        .await
        .unwrap();
    h.pipeline
        .process_turn(turn_request(account, "session-1", "Second question"))
        .await
        .unwrap();

    let prompt = provider.last_prompt();
    assert!(prompt.contains("Recent conversation:"));
    assert!(prompt.contains("User: First question"));
    assert!(prompt.contains("Assistant: a reply"));
}

#[tokio::test]
async fn test_history_falls_back_to_the_store_on_cache_miss() {
    let account = Uuid::new_v4();
    let store = Arc::new(FakeDataStore::new());
    let key = SessionKey::new(account, "session-1");

    // A previous turn exists only in the durable log (e.g. process restart)
    store
        .append_messages(
            &key,
            &[
                ConversationMessage::user("Earlier question"),
                ConversationMessage::assistant("Earlier answer"),
            ],
        )
        .await
        .unwrap();

    let provider = Arc::new(StubLlmProvider::new("a reply"));
    let h = harness(provider.clone(), store);

    h.pipeline
        .process_turn(turn_request(account, "session-1", "Follow-up"))
        .await
        .unwrap();

    let prompt = provider.last_prompt();
    assert!(prompt.contains("User: Earlier question"));
    assert!(prompt.contains("Assistant: Earlier answer"));
}

#[tokio::test]
async fn test_degraded_save_still_returns_the_reply() {
    let account = Uuid::new_v4();
    let store = Arc::new(FakeDataStore::new());
    store.fail_writes.store(true, Ordering::SeqCst);
    let provider = Arc::new(StubLlmProvider::new("still answered"));
    let h = harness(provider, store);

    let outcome = h
        .pipeline
        .process_turn(turn_request(account, "session-1", "Hello"))
        .await
        .unwrap();

    // The conversation continues; only durability is at risk
    assert_eq!(outcome.reply, "still answered");
    assert!(!outcome.fallback_used);
    assert!(!outcome.persisted);
}

#[tokio::test]
async fn test_remember_context_off_excludes_history() {
    let account = Uuid::new_v4();
    let store = Arc::new(FakeDataStore::new().with_config(ChatbotConfigRow {
        account_id: account,
        remember_context: Some(false),
        ..ChatbotConfigRow::default()
    }));
    let provider = Arc::new(StubLlmProvider::new("a reply"));
    let h = harness(provider.clone(), store);

    h.pipeline
        .process_turn(turn_request(account, "session-1", "First"))
        .await
        .unwrap();
    h.pipeline
        .process_turn(turn_request(account, "session-1", "Second"))
        .await
        .unwrap();

    let prompt = provider.last_prompt();
    assert!(!prompt.contains("Recent conversation:"));
    assert!(!prompt.contains("User: First"));
}
