//! Cache discipline under concurrency: single-flight refresh, TTL policy,
//! and last-good retention, driven through a counting mock pipeline and a
//! manual clock.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use news_impact_analyzer::broadcast::UpdateBroadcaster;
use news_impact_analyzer::cache::{ManualClock, RefreshPipeline, SnapshotCache};
use news_impact_analyzer::snapshot::Snapshot;

const START: i64 = 1_800_000_000;
const TTL: u64 = 1800;
const QUICK_TTL: u64 = 300;

/// Counts compute calls; optionally sleeps (to widen the single-flight race
/// window) or fails.
struct MockPipeline {
    calls: AtomicUsize,
    delay_ms: u64,
    fail: AtomicBool,
}

impl MockPipeline {
    fn new(delay_ms: u64) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay_ms,
            fail: AtomicBool::new(false),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RefreshPipeline for MockPipeline {
    async fn compute(&self, now: DateTime<Utc>) -> Result<Snapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("every source failed"));
        }
        Ok(Snapshot {
            computed_at: now,
            institutions: Vec::new(),
            summary: vec!["mock".into()],
            total_articles: 1,
            total_institutions: 0,
            positive_count: 0,
            negative_count: 0,
        })
    }
}

fn build_cache(
    pipeline: Arc<MockPipeline>,
    clock: Arc<ManualClock>,
) -> (Arc<SnapshotCache>, UpdateBroadcaster) {
    let broadcaster = UpdateBroadcaster::new();
    let cache = SnapshotCache::new(
        pipeline,
        clock,
        broadcaster.clone(),
        Duration::from_secs(TTL),
        Duration::from_secs(QUICK_TTL),
    );
    (Arc::new(cache), broadcaster)
}

#[tokio::test]
async fn concurrent_forced_refreshes_share_one_computation() {
    let pipeline = Arc::new(MockPipeline::new(50));
    let clock = Arc::new(ManualClock::new(START));
    let (cache, _) = build_cache(pipeline.clone(), clock);

    let (a, b) = tokio::join!(cache.get(true), cache.get(true));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(pipeline.calls(), 1, "second caller must join the first flight");
    assert!(
        Arc::ptr_eq(&a, &b),
        "both callers must receive the same snapshot"
    );
}

#[tokio::test]
async fn many_concurrent_callers_still_one_fetch() {
    let pipeline = Arc::new(MockPipeline::new(30));
    let clock = Arc::new(ManualClock::new(START));
    let (cache, _) = build_cache(pipeline.clone(), clock);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move { cache.get(true).await }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }
    assert_eq!(pipeline.calls(), 1);
}

#[tokio::test]
async fn fresh_read_after_refresh_does_not_refetch() {
    let pipeline = Arc::new(MockPipeline::new(0));
    let clock = Arc::new(ManualClock::new(START));
    let (cache, _) = build_cache(pipeline.clone(), clock.clone());

    cache.get(true).await.unwrap();
    assert_eq!(pipeline.calls(), 1);

    clock.advance(TTL as i64 - 2);
    cache.get(false).await.unwrap();
    assert_eq!(pipeline.calls(), 1, "fresh snapshot must be served from cache");

    clock.advance(5);
    cache.get(false).await.unwrap();
    assert_eq!(pipeline.calls(), 2, "expired TTL must trigger exactly one fetch");
}

#[tokio::test]
async fn failed_refresh_serves_last_good_and_skips_broadcast() {
    let pipeline = Arc::new(MockPipeline::new(0));
    let clock = Arc::new(ManualClock::new(START));
    let (cache, broadcaster) = build_cache(pipeline.clone(), clock.clone());

    let mut rx = broadcaster.subscribe();
    let good = cache.get(true).await.unwrap();
    assert!(Arc::ptr_eq(&rx.recv().await.unwrap(), &good));

    pipeline.fail.store(true, Ordering::SeqCst);
    clock.advance(TTL as i64 + 1);

    // Unforced stale read: last good snapshot, no broadcast.
    let served = cache.get(false).await.unwrap();
    assert!(Arc::ptr_eq(&served, &good));
    assert!(matches!(
        rx.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));

    // Forced read: the failure surfaces, the cache survives.
    assert!(cache.get(true).await.is_err());
    assert!(cache.peek().is_some());
}

#[tokio::test]
async fn successful_refresh_broadcasts_exactly_once() {
    let pipeline = Arc::new(MockPipeline::new(20));
    let clock = Arc::new(ManualClock::new(START));
    let (cache, broadcaster) = build_cache(pipeline.clone(), clock);

    let mut rx = broadcaster.subscribe();
    let (a, b) = tokio::join!(cache.get(true), cache.get(true));
    a.unwrap();
    b.unwrap();

    rx.recv().await.unwrap();
    assert!(
        matches!(
            rx.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ),
        "one shared computation must publish exactly one update"
    );
}

#[tokio::test]
async fn scheduler_forces_an_initial_refresh() {
    use news_impact_analyzer::scheduler::{spawn_refresh_scheduler, RefreshSchedulerCfg};

    let pipeline = Arc::new(MockPipeline::new(0));
    let clock = Arc::new(ManualClock::new(START));
    let (cache, _) = build_cache(pipeline.clone(), clock);

    let handle = spawn_refresh_scheduler(
        cache.clone(),
        RefreshSchedulerCfg { interval_secs: 3600 },
    );

    // The first tick fires immediately and acts as the boot-time fetch.
    tokio::time::timeout(Duration::from_secs(2), async {
        while pipeline.calls() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("scheduler never ran the initial refresh");

    assert!(cache.peek().is_some());
    handle.abort();
}

#[tokio::test]
async fn quick_ttl_drives_the_dashboard_read_path() {
    let pipeline = Arc::new(MockPipeline::new(0));
    let clock = Arc::new(ManualClock::new(START));
    let (cache, _) = build_cache(pipeline.clone(), clock.clone());

    cache.get_quick().await.unwrap();
    assert_eq!(pipeline.calls(), 1);

    clock.advance(QUICK_TTL as i64 - 5);
    cache.get_quick().await.unwrap();
    assert_eq!(pipeline.calls(), 1);

    clock.advance(10);
    cache.get_quick().await.unwrap();
    assert_eq!(pipeline.calls(), 2);
}
