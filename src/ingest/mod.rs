// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::ingest::types::{Article, ArticleProvider};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};

/// Articles older than this are excluded from a computation.
pub const ARTICLE_WINDOW_SECS: u64 = 48 * 3600;

/// Two titles at or above this normalized similarity are near-duplicates.
const NEAR_DUP_SIMILARITY: f64 = 0.90;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("news_articles_fetched_total", "Articles parsed from providers.");
        describe_counter!(
            "news_articles_kept_total",
            "Articles kept after windowing + dedup."
        );
        describe_counter!(
            "news_articles_dropped_total",
            "Articles dropped by the recency window or near-dup filter."
        );
        describe_counter!(
            "news_provider_errors_total",
            "Provider fetch/parse errors."
        );
        describe_counter!("news_refresh_runs_total", "Completed refresh computations.");
        describe_counter!("news_refresh_errors_total", "Failed refresh computations.");
        describe_gauge!(
            "news_snapshot_last_computed_ts",
            "Unix ts of the last successful snapshot."
        );
        describe_gauge!("news_broadcast_subscribers", "Live update subscribers.");
        describe_histogram!("news_refresh_duration_ms", "Refresh wall-clock time in ms.");
        describe_histogram!("news_provider_parse_ms", "Provider parse time in ms.");
    });
}

/// Normalize text: decode entities, strip tags, collapse whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize curly quotes to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Length cap: 4000 chars
    if out.chars().count() > 4000 {
        out = out.chars().take(4000).collect();
    }

    out
}

/// Short stable id for an article: first 6 bytes of sha256(url|source|title), hex.
pub fn article_id(source: &str, title: &str, url: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.unwrap_or_default().as_bytes());
    hasher.update(b"|");
    hasher.update(source.as_bytes());
    hasher.update(b"|");
    hasher.update(title.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Window + near-duplicate filtering. Returns (kept, dropped_count).
///
/// An article is kept when it is inside the recency window and its title is
/// not a near-duplicate of an earlier kept title (cross-feed syndication).
pub fn window_and_dedup(now: u64, articles: Vec<Article>) -> (Vec<Article>, usize) {
    let mut kept: Vec<Article> = Vec::with_capacity(articles.len());
    let mut dropped = 0usize;

    for art in articles {
        let in_window = now.saturating_sub(art.published_at) <= ARTICLE_WINDOW_SECS;
        if !in_window || art.title.is_empty() {
            dropped += 1;
            continue;
        }
        let title_lc = art.title.to_ascii_lowercase();
        let dup = kept.iter().any(|k| {
            strsim::normalized_levenshtein(&k.title.to_ascii_lowercase(), &title_lc)
                >= NEAR_DUP_SIMILARITY
        });
        if dup {
            dropped += 1;
            continue;
        }
        kept.push(art);
    }

    (kept, dropped)
}

/// Fetch from every provider once, tolerating per-provider failures.
///
/// Returns the filtered article batch plus the number of providers that
/// errored; a failed source is simply absent from this computation.
pub async fn fetch_all(
    providers: &[Box<dyn ArticleProvider>],
    now: u64,
) -> (Vec<Article>, usize) {
    ensure_metrics_described();

    let mut raw = Vec::new();
    let mut failed = 0usize;
    for p in providers {
        match p.fetch_latest().await {
            Ok(mut v) => raw.append(&mut v),
            Err(e) => {
                tracing::warn!(error = ?e, provider = p.name(), "provider error");
                counter!("news_provider_errors_total").increment(1);
                failed += 1;
            }
        }
    }

    counter!("news_articles_fetched_total").increment(raw.len() as u64);
    let (kept, dropped) = window_and_dedup(now, raw);
    counter!("news_articles_kept_total").increment(kept.len() as u64);
    counter!("news_articles_dropped_total").increment(dropped as u64);

    (kept, failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn art(title: &str, published_at: u64) -> Article {
        Article {
            id: article_id("Test", title, None),
            source: "Test".into(),
            title: title.into(),
            body: String::new(),
            published_at,
            url: None,
        }
    }

    #[test]
    fn normalize_text_strips_markup_and_whitespace() {
        let s = "  <p>Banks&nbsp;rally   as</p> <b>rates</b> hold ";
        assert_eq!(normalize_text(s), "Banks rally as rates hold");
    }

    #[test]
    fn article_ids_are_stable_and_distinct() {
        let a = article_id("Reuters", "Banks rally", Some("https://x/1"));
        let b = article_id("Reuters", "Banks rally", Some("https://x/1"));
        let c = article_id("Reuters", "Banks slump", Some("https://x/2"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 12);
    }

    #[test]
    fn window_drops_old_articles() {
        let now = 1_000_000u64;
        let fresh = art("JPMorgan expands in Mumbai", now - 3600);
        let stale = art("HSBC quarterly report from last month", now - ARTICLE_WINDOW_SECS - 1);
        let (kept, dropped) = window_and_dedup(now, vec![fresh.clone(), stale]);
        assert_eq!(kept, vec![fresh]);
        assert_eq!(dropped, 1);
    }

    #[test]
    fn near_duplicate_titles_are_suppressed() {
        let now = 1_000_000u64;
        let a = art("RBI holds rates steady amid inflation concerns", now - 10);
        let b = art("RBI holds rates steady amid inflation concern", now - 5);
        let c = art("BlackRock launches new Mumbai office", now - 5);
        let (kept, dropped) = window_and_dedup(now, vec![a.clone(), b, c.clone()]);
        assert_eq!(kept, vec![a, c]);
        assert_eq!(dropped, 1);
    }
}
