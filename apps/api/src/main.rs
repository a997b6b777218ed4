mod config;
mod db;
mod embeddings;
mod errors;
mod llm_client;
mod matching;
mod models;
mod routes;
mod scorecards;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::embeddings::EmbeddingClient;
use crate::llm_client::{LlmClient, LlmSettings};
use crate::matching::MatchEngine;
use crate::routes::build_router;
use crate::scorecards::{CachedScorecardRepository, PgScorecardRepository};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting scorecard matcher v{}", env!("CARGO_PKG_VERSION"));

    // Scorecard store: Postgres behind a Redis read-through cache
    let db = create_pool(&config.database_url).await?;
    let redis = redis::Client::open(config.redis_url.clone())?;
    let scorecards = CachedScorecardRepository::new(
        PgScorecardRepository::new(db),
        redis,
        config.scorecard_cache_ttl_secs,
        config.scorecard_cache_timeout,
    );
    info!(
        "Scorecard repository initialized (cache ttl: {}s)",
        config.scorecard_cache_ttl_secs
    );

    let embedder = EmbeddingClient::new(&config.embedding)?;
    info!(
        "Embedding client initialized (model: {}, dimensions: {})",
        config.embedding.model, config.embedding.dimensions
    );

    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        LlmSettings::for_judging(config.matching.judge_timeout),
    )?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let engine = MatchEngine::new(
        Arc::new(scorecards),
        Arc::new(embedder),
        Arc::new(llm),
        &config.matching,
    );
    info!(
        "Match engine ready (top_k: {}, concurrency: {}, policy: {:?})",
        config.matching.top_k, config.matching.max_concurrency, config.matching.no_evidence_policy
    );

    let state = AppState {
        engine: Arc::new(engine),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the dashboard domain is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
