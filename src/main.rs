mod circuit_breaker;
mod config;
mod config_model;
mod config_store;
mod db;
mod dedup;
mod doc_store;
mod enrichment;
mod errors;
mod filter;
mod handlers;
mod lead_store;
mod models;
mod normalize;
mod services;

use axum::{
    routing::{get, post},
    Router,
};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::config_store::ConfigStore;
use crate::db::Database;
use crate::doc_store::DocStore;
use crate::lead_store::LeadStore;

/// Main entry point for the application.
///
/// Initializes logging, configuration, the database-backed document store,
/// caches and shared state, then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_leadgen_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize database connection pool and document table
    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    let docs = DocStore::new(db.pool.clone());
    let config_store = ConfigStore::new(docs.clone());
    let lead_store = LeadStore::new(docs.clone());

    // Global configuration cache (30 second TTL): config reads happen on
    // every pipeline run, edits must show up quickly
    let global_config_cache = Cache::builder()
        .time_to_live(Duration::from_secs(30))
        .max_capacity(4)
        .build();

    // Per-project run guard. The TTL is a safety valve in case a run dies
    // without clearing its entry
    let active_runs = Cache::builder()
        .time_to_live(Duration::from_secs(1800))
        .max_capacity(10_000)
        .build();

    let research_breaker = Arc::new(circuit_breaker::create_research_circuit_breaker());

    // Build application state
    let app_state = Arc::new(handlers::AppState {
        db: db.pool.clone(),
        config: config.clone(),
        docs,
        config_store,
        lead_store,
        global_config_cache,
        active_runs,
        research_breaker,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Build protected routes with security layers
    let protected_routes = Router::new()
        .route(
            "/api/v1/config/global",
            get(handlers::get_global_config).put(handlers::update_global_config),
        )
        .route(
            "/api/v1/projects/:project_id/config",
            get(handlers::get_project_config).put(handlers::update_project_config),
        )
        .route(
            "/api/v1/projects/:project_id/find-leads",
            post(handlers::find_leads),
        )
        .route(
            "/api/v1/projects/:project_id/enrich-leads",
            post(handlers::enrich_leads),
        )
        .route(
            "/api/v1/projects/:project_id/enrichment-status",
            get(handlers::enrichment_status),
        )
        .layer(
            ServiceBuilder::new()
                // Request size limit: 5MB max payload
                .layer(RequestBodyLimitLayer::new(5 * 1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Build final app with health check (bypasses rate limiting)
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
