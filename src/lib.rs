// src/lib.rs
// Public library surface for the shuttle binary and integration tests.

pub mod api;
pub mod broadcast;
pub mod cache;
pub mod chat;
pub mod config;
pub mod engine;
pub mod impact;
pub mod ingest;
pub mod institutions;
pub mod mentions;
pub mod metrics;
pub mod query;
pub mod scheduler;
pub mod sentiment;
pub mod snapshot;
pub mod source_weights;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::broadcast::UpdateBroadcaster;
pub use crate::cache::{SnapshotCache, SystemClock};
pub use crate::snapshot::Snapshot;

use std::sync::Arc;
use std::time::Duration;

use crate::cache::NewsPipeline;
use crate::config::AppConfig;
use crate::impact::HotReloadWeights;
use crate::ingest::providers::RssProvider;
use crate::ingest::types::ArticleProvider;
use crate::institutions::InstitutionRegistry;
use crate::source_weights::SourceWeightsConfig;

/// Wire the full production state from a config: feed providers, scoring
/// pipeline, cache and chat backend. The scheduler is spawned separately by
/// the binary so tests can drive the cache directly.
pub fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let registry = Arc::new(InstitutionRegistry::load()?);
    let weights = Arc::new(HotReloadWeights::new(Some(&config.impact_weights_path)));
    let sources = Arc::new(SourceWeightsConfig::load_from_file(
        &config.source_weights_path,
    ));

    let providers: Vec<Box<dyn ArticleProvider>> = config
        .feeds
        .iter()
        .map(|(name, url)| {
            Box::new(RssProvider::new(name.clone(), url.clone())) as Box<dyn ArticleProvider>
        })
        .collect();

    let pipeline = Arc::new(NewsPipeline::new(providers, registry, weights, sources));
    let cache = Arc::new(SnapshotCache::new(
        pipeline,
        Arc::new(SystemClock),
        UpdateBroadcaster::new(),
        Duration::from_secs(config.refresh_interval_secs),
        Duration::from_secs(config.quick_refresh_secs),
    ));

    Ok(AppState {
        cache,
        chat: chat::build_backend_from_env(),
    })
}

/// Build the router with env-derived configuration.
pub async fn app() -> anyhow::Result<axum::Router> {
    let config = AppConfig::from_env();
    let state = build_state(&config)?;
    Ok(api::create_router(state))
}
