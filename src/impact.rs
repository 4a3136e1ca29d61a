//! # Impact Aggregator
//! Reduces mention records into ranked per-institution statistics.
//!
//! The impact score is a tunable policy, not a fixed constant set. Its shape
//! is fixed so the contract holds: every term is non-negative and adding a
//! mention (or raising |sentiment| or india linkage, holding the rest) never
//! lowers the score:
//!
//! `impact = mention_weight * n * (1 + |mean compound|)
//!         + india_weight * india_linkage
//!         + freshness_weight * sum(recency_i * credibility_i)`
//!
//! Note `n * (1 + |mean|) = n + |sum of compounds|`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::RwLock,
    time::SystemTime,
};

use crate::ingest::types::Article;
use crate::mentions::MentionRecord;
use crate::sentiment::SentimentLabel;
use crate::source_weights::SourceWeightsConfig;

/// Linear recency decay horizon.
const RECENCY_HORIZON_SECS: u64 = 48 * 3600;
/// Window for the `recent_articles` count.
const RECENT_WINDOW_SECS: u64 = 24 * 3600;
/// Key drivers kept per institution.
const KEY_DRIVER_COUNT: usize = 3;

/// Tunable impact-score coefficients. Negative values are clamped to zero on
/// load so the score stays non-negative and monotone.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct ImpactWeights {
    pub mention_weight: f64,
    pub india_weight: f64,
    pub freshness_weight: f64,
}

impl Default for ImpactWeights {
    fn default() -> Self {
        Self {
            mention_weight: 1.0,
            india_weight: 0.5,
            freshness_weight: 0.5,
        }
    }
}

impl ImpactWeights {
    fn clamped(self) -> Self {
        Self {
            mention_weight: self.mention_weight.max(0.0),
            india_weight: self.india_weight.max(0.0),
            freshness_weight: self.freshness_weight.max(0.0),
        }
    }
}

/// Hot-reload wrapper: reloads when the config file mtime changes.
#[derive(Debug)]
pub struct HotReloadWeights {
    path: PathBuf,
    inner: RwLock<State>,
}

#[derive(Debug)]
struct State {
    weights: ImpactWeights,
    last_modified: Option<SystemTime>,
}

impl HotReloadWeights {
    /// Create with a path (defaults to "config/impact_weights.json" if `None`).
    pub fn new(path: Option<&Path>) -> Self {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("config/impact_weights.json"));
        Self {
            path,
            inner: RwLock::new(State {
                weights: ImpactWeights::default(),
                last_modified: None,
            }),
        }
    }

    /// Get the latest weights, reloading if the config file changed.
    pub fn current(&self) -> ImpactWeights {
        let needs_reload = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(mtime) => {
                let guard = self.inner.read().expect("weights lock poisoned");
                guard.last_modified != Some(mtime)
            }
            // If the file isn't there, keep defaults; no reload.
            Err(_) => false,
        };

        if !needs_reload {
            return self.inner.read().expect("weights lock poisoned").weights;
        }

        let mut guard = self.inner.write().expect("weights lock poisoned");
        if let Ok(mtime) = fs::metadata(&self.path).and_then(|m| m.modified()) {
            if guard.last_modified != Some(mtime) {
                if let Ok(w) = load_weights_file(&self.path) {
                    guard.weights = w;
                    guard.last_modified = Some(mtime);
                }
            }
        }
        guard.weights
    }
}

/// Load weights directly (no caching). Public for tests/tools.
pub fn load_weights_file(path: &Path) -> io::Result<ImpactWeights> {
    let bytes = fs::read(path)?;
    let w: ImpactWeights = serde_json::from_slice(&bytes)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(w.clamped())
}

/// Aggregate statistics for one institution within one computation.
/// Replaced wholesale every refresh, never patched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstitutionStats {
    pub institution: String,
    pub impact_score: f64,
    pub mentions: u32,
    #[serde(rename = "sentiment")]
    pub sentiment_label: SentimentLabel,
    pub sentiment_value: f64,
    pub india_linkage: u32,
    pub recent_articles: u32,
    pub key_drivers: Vec<String>,
}

/// Reduce mention records into per-institution stats, ranked by impact score
/// descending with ties broken by institution name ascending.
///
/// An empty mention list is a valid input and yields an empty vec.
pub fn aggregate(
    mentions: &[MentionRecord],
    articles: &[Article],
    weights: &ImpactWeights,
    sources: &SourceWeightsConfig,
    now_unix: u64,
) -> Vec<InstitutionStats> {
    let by_id: HashMap<&str, &Article> =
        articles.iter().map(|a| (a.id.as_str(), a)).collect();

    // BTreeMap keeps grouping independent of input order.
    let mut groups: BTreeMap<&str, Vec<&MentionRecord>> = BTreeMap::new();
    for m in mentions {
        groups.entry(m.institution.as_str()).or_default().push(m);
    }

    let mut out = Vec::with_capacity(groups.len());
    for (institution, mut group) in groups {
        // Fixed reduce order, so float sums cannot drift with input order.
        group.sort_by(|a, b| a.article_id.cmp(&b.article_id));
        let n = group.len() as u32;

        let sentiment_value =
            group.iter().map(|m| m.sentiment.compound).sum::<f64>() / group.len() as f64;
        let india: f64 = group.iter().map(|m| m.india_linkage_weight).sum();

        let mut freshness = 0.0f64;
        let mut recent = 0u32;
        for m in group.iter() {
            if let Some(art) = by_id.get(m.article_id.as_str()) {
                let age = now_unix.saturating_sub(art.published_at);
                let recency = 1.0 - (age as f64 / RECENCY_HORIZON_SECS as f64);
                freshness += recency.max(0.0) * sources.weight_for(&art.source);
                if age <= RECENT_WINDOW_SECS {
                    recent += 1;
                }
            }
        }

        let impact = weights.mention_weight * n as f64 * (1.0 + sentiment_value.abs())
            + weights.india_weight * india
            + weights.freshness_weight * freshness;

        out.push(InstitutionStats {
            institution: institution.to_string(),
            impact_score: round2(impact),
            mentions: n,
            sentiment_label: majority_label(group.iter().map(|m| m.sentiment.label)),
            sentiment_value: round3(sentiment_value),
            india_linkage: india.round() as u32,
            recent_articles: recent,
            key_drivers: key_drivers(&group, &by_id),
        });
    }

    out.sort_by(|a, b| {
        b.impact_score
            .partial_cmp(&a.impact_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.institution.cmp(&b.institution))
    });
    out
}

/// Majority label across a group; any tie for the lead resolves to Mixed.
fn majority_label(labels: impl Iterator<Item = SentimentLabel>) -> SentimentLabel {
    let (mut pos, mut neg, mut mixed) = (0u32, 0u32, 0u32);
    for l in labels {
        match l {
            SentimentLabel::Positive => pos += 1,
            SentimentLabel::Negative => neg += 1,
            SentimentLabel::Mixed => mixed += 1,
        }
    }
    if pos > neg && pos > mixed {
        SentimentLabel::Positive
    } else if neg > pos && neg > mixed {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Mixed
    }
}

/// Titles of the most sentiment-extreme articles in the group,
/// |compound| descending, capped at 80 chars each.
fn key_drivers(group: &[&MentionRecord], by_id: &HashMap<&str, &Article>) -> Vec<String> {
    let mut ranked: Vec<(&MentionRecord, &str)> = group
        .iter()
        .filter_map(|m| {
            by_id
                .get(m.article_id.as_str())
                .map(|a| (*m, a.title.as_str()))
        })
        .collect();
    ranked.sort_by(|(ma, ta), (mb, tb)| {
        mb.sentiment
            .compound
            .abs()
            .partial_cmp(&ma.sentiment.compound.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| ta.cmp(tb))
    });
    ranked
        .into_iter()
        .take(KEY_DRIVER_COUNT)
        .map(|(_, title)| truncate_title(title))
        .collect()
}

fn truncate_title(title: &str) -> String {
    if title.chars().count() > 80 {
        let cut: String = title.chars().take(80).collect();
        format!("{cut}...")
    } else {
        title.to_string()
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
