use std::sync::Arc;

use crate::cache::SuggestionCache;
use crate::config::Config;
use crate::enrichment::orchestrator::Enricher;
use crate::store::{ContextStore, TaskStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub contexts: Arc<dyn ContextStore>,
    pub tasks: Arc<dyn TaskStore>,
    /// Wraps the provider client built once at startup.
    pub enricher: Enricher,
    /// Present only when `REDIS_URL` is set.
    pub cache: Option<SuggestionCache>,
    pub config: Config,
}
