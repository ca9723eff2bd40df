// ABOUTME: Server resource wiring and the HTTP serve loop with graceful shutdown
// ABOUTME: Dependencies are constructed once and injected; tests substitute fakes here
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

//! Server composition: explicit dependency container plus the serve loop.

use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::cache::memory::InMemorySessionCache;
use crate::cache::{CacheConfig, SessionCache};
use crate::config::ServerConfig;
use crate::database::{DataStore, RestDatabase};
use crate::errors::{AppError, AppResult};
use crate::health::HealthChecker;
use crate::llm::{CompletionClient, LlmProvider, OpenAiProvider, RetryPolicy};
use crate::middleware::cors::setup_cors;
use crate::middleware::{ApiKeyAuth, FixedWindowLimiter};
use crate::pipeline::{
    ChatPipeline, ConfigResolver, PipelineConfig, RetrievalConfig, VectorContextRetriever,
};
use crate::routes;

/// Explicit dependency container handed to route handlers as axum state
pub struct ServerResources {
    /// Server configuration
    pub config: ServerConfig,
    /// The conversation pipeline
    pub pipeline: ChatPipeline,
    /// Health checker
    pub health: HealthChecker,
    /// Shared API key verifier
    pub auth: ApiKeyAuth,
    /// Fixed-window rate limiter
    pub limiter: Arc<FixedWindowLimiter>,
}

impl ServerResources {
    /// Wire resources over explicit collaborators
    ///
    /// Tests call this with fake stores and providers; production wiring
    /// lives in [`ServerResources::from_config`].
    #[must_use]
    pub fn new(
        config: ServerConfig,
        provider: Arc<dyn LlmProvider>,
        store: Arc<dyn DataStore>,
        cache: Arc<dyn SessionCache>,
        retry_policy: RetryPolicy,
        pipeline_config: PipelineConfig,
    ) -> Arc<Self> {
        let resolver = ConfigResolver::new(store.clone());
        let retriever = VectorContextRetriever::new(
            provider.clone(),
            store.clone(),
            RetrievalConfig::default(),
        );
        let completion = CompletionClient::new(provider.clone(), retry_policy);

        let pipeline = ChatPipeline::new(
            resolver,
            retriever,
            completion,
            cache,
            store.clone(),
            pipeline_config,
        );

        let health = HealthChecker::new(config.clone(), store, provider);
        let auth = ApiKeyAuth::new(&config.auth);
        let limiter = Arc::new(FixedWindowLimiter::new(&config.rate_limit));

        Arc::new(Self {
            config,
            pipeline,
            health,
            auth,
            limiter,
        })
    }

    /// Wire production resources from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be constructed.
    pub fn from_config(config: ServerConfig) -> AppResult<Arc<Self>> {
        let provider: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::new(config.llm.clone())?);
        let store: Arc<dyn DataStore> = Arc::new(RestDatabase::new(&config.database)?);
        let cache: Arc<dyn SessionCache> =
            Arc::new(InMemorySessionCache::new(&CacheConfig::default()));

        Ok(Self::new(
            config,
            provider,
            store,
            cache,
            RetryPolicy::default(),
            PipelineConfig::default(),
        ))
    }
}

/// Bind and serve the relay API until shutdown
///
/// # Errors
///
/// Returns an error if binding the port or serving fails.
pub async fn run(resources: Arc<ServerResources>) -> AppResult<()> {
    let cors = setup_cors(&resources.config.cors);
    let port = resources.config.http_port;

    let app = routes::router(resources)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::internal(format!("failed to bind {addr}: {e}")))?;

    info!("listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| AppError::internal(format!("server error: {e}")))
}

/// Resolve when the process receives ctrl-c
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install ctrl-c handler: {e}");
        return;
    }
    info!("shutdown signal received");
}
