// ABOUTME: FastBot server binary: configuration, logging, resource wiring, serve loop
// ABOUTME: Production entry point for the webhook relay and chat pipeline
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FastBot

//! # FastBot Server Binary
//!
//! Starts the relay API with the conversation pipeline wired against the
//! configured LLM provider and hosted database.

use anyhow::Result;
use clap::Parser;
use fastbot_server::{
    config::ServerConfig,
    logging,
    server::{self, ServerResources},
};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "fastbot-server")]
#[command(about = "FastBot - configurable per-account chatbot backend")]
struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    logging::init_from_env()?;

    info!("starting FastBot server");
    info!("{}", config.summary());

    let issues = config.validation_issues();
    if !issues.is_empty() {
        if config.environment.is_production() {
            for issue in &issues {
                error!("configuration problem: {issue}");
            }
            anyhow::bail!("refusing to start in production with invalid configuration");
        }
        for issue in &issues {
            warn!("configuration problem (continuing in {}): {issue}", config.environment);
        }
    }

    let resources = ServerResources::from_config(config)?;
    server::run(resources).await?;

    info!("server stopped");
    Ok(())
}
