//! Financial News Impact Analyzer — Binary Entrypoint
//! Boots the Axum HTTP server, wiring the snapshot cache, the background
//! refresh scheduler, the chat backend, and the Prometheus exporter.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_impact_analyzer::config::AppConfig;
use news_impact_analyzer::metrics::Metrics;
use news_impact_analyzer::scheduler::{spawn_refresh_scheduler, RefreshSchedulerCfg};
use news_impact_analyzer::{build_state, create_router};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - NEWS_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("NEWS_DEV_LOG").ok().is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("refresh=info,scheduler=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let config = AppConfig::from_env();
    let metrics = Metrics::init(config.refresh_interval_secs, config.quick_refresh_secs);

    let state = build_state(&config).expect("Failed to wire the news pipeline");

    // Periodic forced refresh; the first tick doubles as the initial fetch.
    spawn_refresh_scheduler(
        state.cache.clone(),
        RefreshSchedulerCfg {
            interval_secs: config.refresh_interval_secs,
        },
    );

    let router = create_router(state).merge(metrics.router());
    Ok(router.into())
}
