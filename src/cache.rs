//! # Snapshot Cache
//! Owns the single current `Snapshot`, the staleness policy, and the
//! single-flight refresh discipline.
//!
//! - `get(force)` serves the cached snapshot while it is younger than the
//!   TTL; otherwise it recomputes through the injected pipeline.
//! - At most one recomputation is in flight. Callers that arrive while one
//!   is running wait on the refresh lock and receive the same result
//!   (generation check after acquiring the lock).
//! - A failed refresh never invalidates the cache: the last good snapshot
//!   keeps serving, and only a caller that *forced* the refresh sees the
//!   error.
//!
//! The clock is injected so TTL behavior is deterministic in tests.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::broadcast::UpdateBroadcaster;
use crate::engine;
use crate::impact::HotReloadWeights;
use crate::ingest::{self, types::ArticleProvider};
use crate::institutions::InstitutionRegistry;
use crate::snapshot::Snapshot;
use crate::source_weights::SourceWeightsConfig;

pub const DEFAULT_TTL_SECS: u64 = 1800;
pub const DEFAULT_QUICK_TTL_SECS: u64 = 300;

/// Injected time source.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock used in production.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock for tests and tools: starts at a fixed instant and
/// only moves when told to.
pub struct ManualClock {
    unix: std::sync::atomic::AtomicI64,
}

impl ManualClock {
    pub fn new(start_unix: i64) -> Self {
        Self {
            unix: std::sync::atomic::AtomicI64::new(start_unix),
        }
    }

    pub fn advance(&self, secs: i64) {
        self.unix
            .fetch_add(secs, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let ts = self.unix.load(std::sync::atomic::Ordering::SeqCst);
        DateTime::<Utc>::from_timestamp(ts, 0).unwrap_or_else(Utc::now)
    }
}

/// The recomputation the cache coordinates. Production uses `NewsPipeline`;
/// tests inject counting/failing mocks.
#[async_trait::async_trait]
pub trait RefreshPipeline: Send + Sync {
    async fn compute(&self, now: DateTime<Utc>) -> Result<Snapshot>;
}

/// Fetch articles from every configured provider, then score and aggregate.
pub struct NewsPipeline {
    providers: Vec<Box<dyn ArticleProvider>>,
    registry: Arc<InstitutionRegistry>,
    weights: Arc<HotReloadWeights>,
    sources: Arc<SourceWeightsConfig>,
}

impl NewsPipeline {
    pub fn new(
        providers: Vec<Box<dyn ArticleProvider>>,
        registry: Arc<InstitutionRegistry>,
        weights: Arc<HotReloadWeights>,
        sources: Arc<SourceWeightsConfig>,
    ) -> Self {
        Self {
            providers,
            registry,
            weights,
            sources,
        }
    }
}

#[async_trait::async_trait]
impl RefreshPipeline for NewsPipeline {
    async fn compute(&self, now: DateTime<Utc>) -> Result<Snapshot> {
        let now_unix = now.timestamp().max(0) as u64;
        let (articles, failed_sources) = ingest::fetch_all(&self.providers, now_unix).await;

        // Per-source failures are tolerated; a refresh where every source
        // failed is a refresh failure.
        if !self.providers.is_empty() && failed_sources == self.providers.len() {
            return Err(anyhow!("all {} news sources failed", failed_sources));
        }

        let weights = self.weights.current();
        let snapshot =
            engine::build_snapshot(&articles, &self.registry, &weights, &self.sources, now);
        info!(
            target: "refresh",
            articles = snapshot.total_articles,
            institutions = snapshot.total_institutions,
            failed_sources,
            "snapshot computed"
        );
        Ok(snapshot)
    }
}

#[derive(Default)]
struct CacheState {
    snapshot: Option<Arc<Snapshot>>,
    generation: u64,
    refreshing: bool,
}

/// Status projection for the `/api/status` endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStatus {
    pub last_computed_at: Option<DateTime<Utc>>,
    pub institutions_tracked: u32,
    pub is_refreshing: bool,
}

pub struct SnapshotCache {
    pipeline: Arc<dyn RefreshPipeline>,
    clock: Arc<dyn Clock>,
    broadcaster: UpdateBroadcaster,
    ttl: Duration,
    quick_ttl: Duration,
    state: RwLock<CacheState>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl SnapshotCache {
    pub fn new(
        pipeline: Arc<dyn RefreshPipeline>,
        clock: Arc<dyn Clock>,
        broadcaster: UpdateBroadcaster,
        ttl: Duration,
        quick_ttl: Duration,
    ) -> Self {
        ingest::ensure_metrics_described();
        gauge!("news_cache_ttl_secs").set(ttl.as_secs() as f64);
        Self {
            pipeline,
            clock,
            broadcaster,
            ttl,
            quick_ttl,
            state: RwLock::new(CacheState::default()),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// The broadcaster snapshots are published to; the API layer subscribes
    /// its push adapters here.
    pub fn broadcaster(&self) -> &UpdateBroadcaster {
        &self.broadcaster
    }

    /// Current snapshot without any refresh, however stale. Query and chat
    /// read through this.
    pub fn peek(&self) -> Option<Arc<Snapshot>> {
        self.state.read().expect("cache lock poisoned").snapshot.clone()
    }

    pub fn status(&self) -> CacheStatus {
        let st = self.state.read().expect("cache lock poisoned");
        CacheStatus {
            last_computed_at: st.snapshot.as_ref().map(|s| s.computed_at),
            institutions_tracked: st
                .snapshot
                .as_ref()
                .map(|s| s.total_institutions)
                .unwrap_or(0),
            is_refreshing: st.refreshing,
        }
    }

    /// Serve the snapshot under the main TTL; recompute when forced, stale,
    /// or absent.
    pub async fn get(&self, force: bool) -> Result<Arc<Snapshot>> {
        self.get_with_ttl(self.ttl, force).await
    }

    /// Serve under the shorter quick TTL (the dashboard read path).
    pub async fn get_quick(&self) -> Result<Arc<Snapshot>> {
        self.get_with_ttl(self.quick_ttl, false).await
    }

    async fn get_with_ttl(&self, ttl: Duration, force: bool) -> Result<Arc<Snapshot>> {
        if !force {
            if let Some(snap) = self.fresh_under(ttl) {
                counter!("news_cache_hits_total").increment(1);
                return Ok(snap);
            }
        }

        let entry_generation = {
            self.state.read().expect("cache lock poisoned").generation
        };

        // Single-flight: everyone races for this lock; whoever wins computes,
        // the rest observe the bumped generation and share the result.
        let _guard = self.refresh_lock.lock().await;
        {
            let st = self.state.read().expect("cache lock poisoned");
            if st.generation > entry_generation {
                if let Some(snap) = &st.snapshot {
                    counter!("news_cache_joined_total").increment(1);
                    return Ok(snap.clone());
                }
            }
        }

        self.set_refreshing(true);
        let started = Instant::now();
        let result = self.pipeline.compute(self.clock.now()).await;
        self.set_refreshing(false);
        histogram!("news_refresh_duration_ms")
            .record(started.elapsed().as_secs_f64() * 1_000.0);

        match result {
            Ok(snapshot) => Ok(self.install(snapshot)),
            Err(e) => {
                counter!("news_refresh_errors_total").increment(1);
                warn!(target: "refresh", error = ?e, "refresh failed");
                let last_good = self.peek();
                match (force, last_good) {
                    // The forced caller asked for fresh data; tell it the truth.
                    (true, _) => Err(e.context("forced refresh failed")),
                    // Stale-but-present beats no data.
                    (false, Some(snap)) => Ok(snap),
                    (false, None) => Err(e.context("no snapshot computed yet")),
                }
            }
        }
    }

    fn fresh_under(&self, ttl: Duration) -> Option<Arc<Snapshot>> {
        let now_unix = self.clock.now().timestamp().max(0) as u64;
        let st = self.state.read().expect("cache lock poisoned");
        st.snapshot
            .as_ref()
            .filter(|s| s.age_secs(now_unix) < ttl.as_secs())
            .cloned()
    }

    fn set_refreshing(&self, refreshing: bool) {
        self.state.write().expect("cache lock poisoned").refreshing = refreshing;
    }

    fn install(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snap = Arc::new(snapshot);
        {
            let mut st = self.state.write().expect("cache lock poisoned");
            st.snapshot = Some(snap.clone());
            st.generation += 1;
        }
        counter!("news_refresh_runs_total").increment(1);
        gauge!("news_snapshot_last_computed_ts")
            .set(snap.computed_at.timestamp().max(0) as f64);
        self.broadcaster.publish(snap.clone());
        info!(
            target: "refresh",
            computed_at = %snap.computed_at,
            institutions = snap.institutions.len(),
            "snapshot installed"
        );
        snap
    }
}
