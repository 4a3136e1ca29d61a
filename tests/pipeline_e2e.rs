//! End-to-end pipeline scenarios: fixture RSS through the production
//! pipeline, cache and broadcaster.

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;

use news_impact_analyzer::broadcast::UpdateBroadcaster;
use news_impact_analyzer::cache::{NewsPipeline, SnapshotCache, SystemClock};
use news_impact_analyzer::impact::HotReloadWeights;
use news_impact_analyzer::ingest::providers::RssProvider;
use news_impact_analyzer::ingest::types::ArticleProvider;
use news_impact_analyzer::institutions::InstitutionRegistry;
use news_impact_analyzer::query;
use news_impact_analyzer::sentiment::SentimentLabel;
use news_impact_analyzer::source_weights::SourceWeightsConfig;

fn item(title: &str, description: &str, link: &str, hours_ago: i64) -> String {
    let pub_date = (Utc::now() - ChronoDuration::hours(hours_ago)).to_rfc2822();
    format!(
        "<item><title>{title}</title><link>{link}</link>\
         <pubDate>{pub_date}</pubDate><description>{description}</description></item>"
    )
}

fn feed(items: &[String]) -> String {
    format!(
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Fixture</title>{}</channel></rss>"#,
        items.join("")
    )
}

fn build_cache(providers: Vec<Box<dyn ArticleProvider>>) -> (Arc<SnapshotCache>, UpdateBroadcaster) {
    let registry = Arc::new(InstitutionRegistry::load().expect("registry"));
    let weights = Arc::new(HotReloadWeights::new(None));
    let sources = Arc::new(SourceWeightsConfig::default_seed());
    let pipeline = Arc::new(NewsPipeline::new(providers, registry, weights, sources));
    let broadcaster = UpdateBroadcaster::new();
    let cache = SnapshotCache::new(
        pipeline,
        Arc::new(SystemClock),
        broadcaster.clone(),
        Duration::from_secs(1800),
        Duration::from_secs(300),
    );
    (Arc::new(cache), broadcaster)
}

#[tokio::test]
async fn jpmorgan_two_article_scenario() {
    let xml = feed(&[
        item(
            "JPMorgan sees strong India-linked growth, RBI praises resilience",
            "",
            "https://example.com/1",
            2,
        ),
        item(
            "JPMorgan faces losses amid volatility",
            "",
            "https://example.com/2",
            5,
        ),
    ]);
    let (cache, _) = build_cache(vec![Box::new(RssProvider::from_fixture("Reuters", &xml))]);

    let snap = cache.get(true).await.expect("refresh");
    let jpm = snap.institution("JPMorgan").expect("JPMorgan scored");

    assert_eq!(jpm.mentions, 2);
    assert_eq!(jpm.sentiment_label, SentimentLabel::Mixed);
    assert!(jpm.india_linkage >= 2, "india_linkage = {}", jpm.india_linkage);
    assert_eq!(snap.total_articles, 2);
    assert!(jpm.impact_score >= 0.0);
}

#[tokio::test]
async fn empty_feed_builds_an_empty_snapshot() {
    let xml = feed(&[]);
    let (cache, _) = build_cache(vec![Box::new(RssProvider::from_fixture("Reuters", &xml))]);

    let snap = cache.get(true).await.expect("refresh");
    assert_eq!(snap.total_articles, 0);
    assert!(snap.institutions.is_empty());
    assert_eq!(snap.total_institutions, 0);
    assert!(snap.summary[0].contains("No significant financial news"));
}

#[tokio::test]
async fn one_dead_source_does_not_fail_the_computation() {
    let xml = feed(&[item(
        "HSBC upbeat on Indian markets recovery",
        "Rupee stability praised.",
        "https://example.com/h",
        2,
    )]);
    let providers: Vec<Box<dyn ArticleProvider>> = vec![
        Box::new(RssProvider::from_fixture("Broken", "not xml")),
        Box::new(RssProvider::from_fixture("Reuters", &xml)),
    ];
    let (cache, _) = build_cache(providers);

    let snap = cache.get(true).await.expect("partial source failure tolerated");
    assert_eq!(snap.total_articles, 1);
    assert!(snap.institution("HSBC").is_some());
}

#[tokio::test]
async fn all_dead_sources_fail_the_forced_refresh() {
    let providers: Vec<Box<dyn ArticleProvider>> = vec![
        Box::new(RssProvider::from_fixture("Broken1", "not xml")),
        Box::new(RssProvider::from_fixture("Broken2", "<rss><chan")),
    ];
    let (cache, _) = build_cache(providers);

    assert!(cache.get(true).await.is_err());
    assert!(cache.peek().is_none());
}

#[tokio::test]
async fn refresh_broadcasts_the_installed_snapshot() {
    let xml = feed(&[item(
        "BlackRock surges on record India inflows",
        "Sensex and Nifty rally.",
        "https://example.com/b",
        1,
    )]);
    let (cache, broadcaster) =
        build_cache(vec![Box::new(RssProvider::from_fixture("Reuters", &xml))]);

    let mut rx = broadcaster.subscribe();
    let snap = cache.get(true).await.expect("refresh");
    let pushed = rx.recv().await.expect("broadcast");
    assert!(Arc::ptr_eq(&snap, &pushed));
}

#[tokio::test]
async fn query_projections_read_the_cached_snapshot() {
    let xml = feed(&[
        item(
            "BlackRock surges on record India inflows, Sensex rallies",
            "Nifty and rupee strength cited.",
            "https://example.com/b1",
            1,
        ),
        item(
            "HSBC faces losses amid volatility warnings",
            "",
            "https://example.com/h1",
            2,
        ),
    ]);
    let (cache, _) = build_cache(vec![Box::new(RssProvider::from_fixture("Reuters", &xml))]);
    let snap = cache.get(true).await.expect("refresh");

    let top = query::top_n(&snap, 1);
    assert_eq!(top.len(), 1);

    let negative = query::by_sentiment(&snap, SentimentLabel::Negative);
    assert!(negative.iter().any(|s| s.institution == "HSBC"));

    let india = query::by_min_india_linkage(&snap, 1);
    assert!(india.iter().any(|s| s.institution == "BlackRock"));

    assert!(query::digest(&snap).contains("2 articles"));
}
