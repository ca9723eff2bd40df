// ABOUTME: Service health monitoring: fast liveness info plus independent component checks
// ABOUTME: Detailed checks cover configuration validity, database, and LLM provider reachability
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

//! Health check endpoints and monitoring utilities

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::info;

use crate::config::ServerConfig;
use crate::database::DataStore;
use crate::llm::LlmProvider;

/// Component health status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Check passed
    Healthy,
    /// Check failed
    Unhealthy,
}

/// Individual component check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Status description
    pub message: String,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

impl ComponentHealth {
    fn passed(name: &str, message: impl Into<String>, started: Instant) -> Self {
        Self {
            name: name.to_owned(),
            status: HealthStatus::Healthy,
            message: message.into(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    fn failed(name: &str, message: impl Into<String>, started: Instant) -> Self {
        Self {
            name: name.to_owned(),
            status: HealthStatus::Unhealthy,
            message: message.into(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Result of the comprehensive health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedHealth {
    /// True when every component check passed
    pub healthy: bool,
    /// Individual component results
    pub checks: Vec<ComponentHealth>,
}

/// Basic service information for the fast probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Overall status (always healthy when the process answers)
    pub status: HealthStatus,
    /// Service uptime in seconds
    pub uptime_seconds: u64,
    /// Resident memory in kilobytes, when the platform exposes it
    pub memory_kb: Option<u64>,
    /// Service version
    pub version: String,
}

/// Health checker for the FastBot server
pub struct HealthChecker {
    start_time: Instant,
    config: ServerConfig,
    store: Arc<dyn DataStore>,
    provider: Arc<dyn LlmProvider>,
    cached: RwLock<Option<(DetailedHealth, Instant)>>,
    cache_ttl: Duration,
}

impl HealthChecker {
    /// Create a new health checker
    #[must_use]
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn DataStore>,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            start_time: Instant::now(),
            config,
            store,
            provider,
            cached: RwLock::new(None),
            cache_ttl: Duration::from_secs(15),
        }
    }

    /// Fast health info, suitable for load balancer probes
    #[must_use]
    pub fn basic(&self) -> ServiceInfo {
        ServiceInfo {
            status: HealthStatus::Healthy,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            memory_kb: resident_memory_kb(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }

    /// Comprehensive health check with all component checks
    ///
    /// Results are cached briefly so probe storms do not hammer the
    /// upstream services.
    pub async fn detailed(&self) -> DetailedHealth {
        {
            let cached = self.cached.read().await;
            if let Some((response, cached_at)) = cached.as_ref() {
                if cached_at.elapsed() < self.cache_ttl {
                    return response.clone();
                }
            }
        }

        info!("performing comprehensive health check");

        let checks = vec![
            self.check_configuration(),
            self.check_database().await,
            self.check_llm_provider().await,
        ];

        let healthy = checks.iter().all(|c| c.status == HealthStatus::Healthy);
        let response = DetailedHealth { healthy, checks };

        let mut cached = self.cached.write().await;
        *cached = Some((response.clone(), Instant::now()));
        drop(cached);

        response
    }

    /// Check configuration validity
    fn check_configuration(&self) -> ComponentHealth {
        let started = Instant::now();
        let issues = self.config.validation_issues();

        if issues.is_empty() {
            ComponentHealth::passed("configuration", "Configuration is valid", started)
        } else {
            ComponentHealth::failed("configuration", issues.join("; "), started)
        }
    }

    /// Check database reachability
    async fn check_database(&self) -> ComponentHealth {
        let started = Instant::now();

        match self.store.health_check().await {
            Ok(()) => {
                ComponentHealth::passed("database", "Database is reachable", started)
            }
            Err(error) => ComponentHealth::failed(
                "database",
                format!("Database check failed: {error}"),
                started,
            ),
        }
    }

    /// Check LLM provider reachability
    async fn check_llm_provider(&self) -> ComponentHealth {
        let started = Instant::now();

        match self.provider.health_check().await {
            Ok(true) => ComponentHealth::passed(
                "llm_provider",
                "LLM provider is reachable",
                started,
            ),
            Ok(false) => ComponentHealth::failed(
                "llm_provider",
                "LLM provider rejected the credential or is not configured",
                started,
            ),
            Err(error) => ComponentHealth::failed(
                "llm_provider",
                format!("LLM provider check failed: {error}"),
                started,
            ),
        }
    }
}

/// Resident set size of this process in kilobytes (Linux); `None` elsewhere
fn resident_memory_kb() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    status
        .lines()
        .find(|line| line.starts_with("VmRSS:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kb| kb.parse().ok())
}
