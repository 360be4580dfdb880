//! Flashdeck: SM-2 spaced repetition over a file-backed card store

pub mod activity;
pub mod config;
pub mod flashcards;
pub mod server;
pub mod study;

use std::sync::Arc;

use config::AppConfig;
use study::StudyService;

/// Serve the HTTP API for `config` until Ctrl-C
pub async fn serve(config: &AppConfig) -> anyhow::Result<()> {
    use anyhow::Context;

    let service = StudyService::from_config(config).context("Failed to resolve data directory")?;
    std::fs::create_dir_all(service.cards().data_dir())
        .context("Failed to create data directory")?;
    let addr = config.server.socket_addr()?;

    let server = server::start_server(Arc::new(service), addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    println!("Listening on {}", server.base_url());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    server.stop().await;
    Ok(())
}
