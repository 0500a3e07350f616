mod acquire;
mod analysis;
mod auth;
mod billing;
mod cache;
mod catalog;
mod compliance;
mod config;
mod db;
mod errors;
mod extract;
mod governor;
mod query;
mod routes;
mod scoring;
mod state;
mod store;
mod telemetry;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::http::HeaderValue;
use chrono::Utc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::acquire::Fetcher;
use crate::billing::OfflinePaymentProcessor;
use crate::cache::{AnalysisCache, SingleFlight};
use crate::catalog::catalog;
use crate::config::Config;
use crate::db::create_pool;
use crate::governor::Governor;
use crate::routes::build_router;
use crate::scoring::KeywordSentimentProvider;
use crate::state::AppState;
use crate::store::PgStore;
use crate::telemetry::ApiMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting esglens-api v{}", env!("CARGO_PKG_VERSION"));

    // Load the framework catalog; a corrupt catalog aborts startup.
    let loaded = catalog();
    let requirement_count: usize = loaded
        .frameworks()
        .map(|fw| loaded.requirements(fw).len())
        .sum();
    info!(requirement_count, "Framework catalog loaded");

    // Initialize PostgreSQL
    let pool = create_pool(&config.db_uri, config.db_pool_min, config.db_pool_max).await?;
    let store = PgStore::new(pool);
    store.init_schema().await?;
    info!("Schema initialized");

    // Initialize the analysis cache (degrades to no-op when unreachable)
    let cache = AnalysisCache::connect(&config.cache_url, config.cache_ttl_sec).await;

    // Content fetcher with SSRF guard and size/timeout limits
    let fetcher = Arc::new(Fetcher::new(
        config.fetch_max_bytes,
        config.fetch_timeout_ms,
    )?);

    let governor = Arc::new(Governor::new(config.rate_limit_overrides.clone()));
    let metrics = Arc::new(ApiMetrics::new()?);

    let cors = build_cors(&config);

    let state = AppState {
        store,
        cache,
        single_flight: Arc::new(SingleFlight::new()),
        fetcher,
        governor,
        sentiment: Arc::new(KeywordSentimentProvider),
        payments: Arc::new(OfflinePaymentProcessor),
        metrics,
        config: Arc::new(config.clone()),
        start_time: Utc::now(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down gracefully");
        })
        .await?;

    Ok(())
}

fn build_cors(config: &Config) -> CorsLayer {
    if config.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}
