use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

mod config;
mod dashboard;
mod engine;
mod models;
mod predict;
mod stats;

use config::Config;
use dashboard::AppState;
use engine::MatchEngine;
use predict::OutcomePredictor;
use stats::{GeminiClient, StatsCache, StatsProvider};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let gemini = GeminiClient::new(
        config.gemini_api_key.clone(),
        &config.gemini_api_url,
        &config.gemini_model,
        config.request_timeout(),
    )?;
    if gemini.has_api_key() {
        info!("Team stats from {} ({})", config.gemini_model, config.gemini_api_url);
    } else {
        warn!("GEMINI_API_KEY is not set – every team will use the fallback stats");
    }

    let cache = StatsCache::new(config.stats_cache_ttl());
    if !cache.is_enabled() {
        info!("Stats cache disabled");
    }
    let stats = StatsProvider::new(Arc::new(gemini), cache);

    // Train once before serving; requests never trigger a refit.
    let mut predictor = OutcomePredictor::new(config.forest_params());
    let predictor = tokio::task::spawn_blocking(move || predictor.train().map(|_| predictor))
        .await
        .context("Classifier training task panicked")??;

    let state = AppState {
        engine: MatchEngine::new(stats, predictor),
    };
    let app = dashboard::router(state);
    let addr: SocketAddr = config.dashboard_addr.parse()?;
    info!("Predictor listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app).await?;

    Ok(())
}
