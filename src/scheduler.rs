// src/scheduler.rs
//! Background periodic refresh: one interval task forcing a recomputation
//! through the cache. The single-flight lock in the cache keeps this from
//! ever overlapping a request-driven refresh.

use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::cache::SnapshotCache;

#[derive(Clone, Copy, Debug)]
pub struct RefreshSchedulerCfg {
    pub interval_secs: u64,
}

/// Spawn the refresh loop. The first tick fires immediately, which doubles
/// as the initial fetch at boot; failures are logged and retried next tick.
pub fn spawn_refresh_scheduler(
    cache: Arc<SnapshotCache>,
    cfg: RefreshSchedulerCfg,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(Duration::from_secs(cfg.interval_secs.max(1)));
        loop {
            ticker.tick().await;
            counter!("news_scheduler_ticks_total").increment(1);

            match cache.get(true).await {
                Ok(snap) => {
                    tracing::info!(
                        target: "scheduler",
                        institutions = snap.institutions.len(),
                        articles = snap.total_articles,
                        "scheduled refresh complete"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        target: "scheduler",
                        error = ?e,
                        "scheduled refresh failed; serving last good snapshot"
                    );
                }
            }
        }
    })
}
