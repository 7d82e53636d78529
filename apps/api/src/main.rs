mod cache;
mod config;
mod context;
mod enrichment;
mod errors;
mod llm_client;
mod models;
mod routes;
mod state;
mod store;
mod tasks;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cache::SuggestionCache;
use crate::config::Config;
use crate::enrichment::orchestrator::Enricher;
use crate::llm_client::{GeminiClient, LlmProvider};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{memory::MemoryStore, postgres::PgStore, ContextStore, TaskStore};

const DB_MAX_CONNECTIONS: u32 = 10;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Smart Todo API v{}", env!("CARGO_PKG_VERSION"));

    // Storage: PostgreSQL when configured, in-memory otherwise
    let (contexts, tasks): (Arc<dyn ContextStore>, Arc<dyn TaskStore>) =
        match &config.database_url {
            Some(url) => {
                let store = PgStore::connect(url, DB_MAX_CONNECTIONS).await?;
                info!("PostgreSQL store ready");
                (Arc::new(store.clone()), Arc::new(store))
            }
            None => {
                warn!("DATABASE_URL not set; using the in-memory store");
                let store = MemoryStore::new();
                (Arc::new(store.clone()), Arc::new(store))
            }
        };

    // Suggestion cache is optional
    let cache = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str())?;
            info!("Redis suggestion cache enabled");
            Some(SuggestionCache::new(client, config.ai_cache_ttl))
        }
        None => None,
    };

    // Initialize the AI provider
    let provider = GeminiClient::new(config.gemini_settings())?;
    info!(
        "AI provider initialized ({} / {})",
        provider.name(),
        provider.model()
    );

    let state = AppState {
        contexts,
        tasks,
        enricher: Enricher::new(Arc::new(provider)),
        cache,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
