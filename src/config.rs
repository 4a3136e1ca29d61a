//! Environment configuration surface. Values come from the process
//! environment (`.env` is loaded in dev); every knob has a default so the
//! service boots with no configuration at all.

use std::path::PathBuf;

pub const ENV_REFRESH_INTERVAL: &str = "NEWS_REFRESH_INTERVAL";
pub const ENV_QUICK_REFRESH_INTERVAL: &str = "QUICK_REFRESH_INTERVAL";
pub const ENV_RSS_FEEDS: &str = "NEWS_RSS_FEEDS";
pub const ENV_IMPACT_WEIGHTS_PATH: &str = "IMPACT_WEIGHTS_PATH";
pub const ENV_SOURCE_WEIGHTS_PATH: &str = "SOURCE_WEIGHTS_PATH";

pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 1800;
pub const DEFAULT_QUICK_REFRESH_SECS: u64 = 300;
pub const DEFAULT_IMPACT_WEIGHTS_PATH: &str = "config/impact_weights.json";
pub const DEFAULT_SOURCE_WEIGHTS_PATH: &str = "config/source_weights.json";

/// Feeds polled when `NEWS_RSS_FEEDS` is not set.
const DEFAULT_FEEDS: &[(&str, &str)] = &[
    ("Reuters", "https://feeds.reuters.com/reuters/businessNews"),
    (
        "Economic Times",
        "https://economictimes.indiatimes.com/rssfeedstopstories.cms",
    ),
    (
        "Moneycontrol",
        "https://www.moneycontrol.com/rss/business.xml",
    ),
];

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Main snapshot TTL and the scheduler period.
    pub refresh_interval_secs: u64,
    /// Quick TTL used by the dashboard read path.
    pub quick_refresh_secs: u64,
    pub impact_weights_path: PathBuf,
    pub source_weights_path: PathBuf,
    /// `(source name, feed url)` pairs.
    pub feeds: Vec<(String, String)>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            quick_refresh_secs: DEFAULT_QUICK_REFRESH_SECS,
            impact_weights_path: PathBuf::from(DEFAULT_IMPACT_WEIGHTS_PATH),
            source_weights_path: PathBuf::from(DEFAULT_SOURCE_WEIGHTS_PATH),
            feeds: DEFAULT_FEEDS
                .iter()
                .map(|(n, u)| (n.to_string(), u.to_string()))
                .collect(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = parse_secs_env(ENV_REFRESH_INTERVAL) {
            cfg.refresh_interval_secs = v;
        }
        if let Some(v) = parse_secs_env(ENV_QUICK_REFRESH_INTERVAL) {
            cfg.quick_refresh_secs = v;
        }
        if let Ok(p) = std::env::var(ENV_IMPACT_WEIGHTS_PATH) {
            cfg.impact_weights_path = PathBuf::from(p);
        }
        if let Ok(p) = std::env::var(ENV_SOURCE_WEIGHTS_PATH) {
            cfg.source_weights_path = PathBuf::from(p);
        }
        if let Ok(raw) = std::env::var(ENV_RSS_FEEDS) {
            let feeds = parse_feeds(&raw);
            if !feeds.is_empty() {
                cfg.feeds = feeds;
            }
        }
        cfg
    }
}

/// Positive integer seconds, anything else ignored.
fn parse_secs_env(name: &str) -> Option<u64> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
}

/// `Name=url,Name=url` pairs; malformed entries are skipped.
fn parse_feeds(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| {
            let (name, url) = pair.split_once('=')?;
            let (name, url) = (name.trim(), url.trim());
            if name.is_empty() || !url.starts_with("http") {
                return None;
            }
            Some((name.to_string(), url.to_string()))
        })
        .collect()
}
