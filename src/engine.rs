//! # Snapshot Engine
//! Pure, testable assembly that maps a fetched article batch to a `Snapshot`.
//! No I/O; the cache layer owns fetching, locking and broadcast.

use chrono::{DateTime, Utc};

use crate::impact::{self, ImpactWeights, InstitutionStats};
use crate::ingest::types::Article;
use crate::institutions::InstitutionRegistry;
use crate::mentions;
use crate::sentiment::SentimentLabel;
use crate::snapshot::Snapshot;
use crate::source_weights::SourceWeightsConfig;

/// Institutions carried in the served snapshot.
const SERVED_INSTITUTIONS: usize = 10;
/// India linkage above which an institution counts as India-focused.
const HIGH_INDIA_LINKAGE: u32 = 5;

/// Build a complete snapshot from one article batch.
///
/// An empty batch is valid and produces an empty (but servable) snapshot.
pub fn build_snapshot(
    articles: &[Article],
    registry: &InstitutionRegistry,
    weights: &ImpactWeights,
    sources: &SourceWeightsConfig,
    now: DateTime<Utc>,
) -> Snapshot {
    let now_unix = now.timestamp().max(0) as u64;

    let mention_records: Vec<_> = articles
        .iter()
        .flat_map(|a| mentions::build(a, registry))
        .collect();

    let stats = impact::aggregate(&mention_records, articles, weights, sources, now_unix);
    let summary = generate_summary(&stats);

    let total_institutions = stats.len() as u32;
    let served: Vec<InstitutionStats> =
        stats.into_iter().take(SERVED_INSTITUTIONS).collect();

    let positive_count = served
        .iter()
        .filter(|s| s.sentiment_label == SentimentLabel::Positive)
        .count() as u32;
    let negative_count = served
        .iter()
        .filter(|s| s.sentiment_label == SentimentLabel::Negative)
        .count() as u32;

    Snapshot {
        computed_at: now,
        institutions: served,
        summary,
        total_articles: articles.len() as u32,
        total_institutions,
        positive_count,
        negative_count,
    }
}

/// Three-line executive summary over the full ranked stats.
fn generate_summary(stats: &[InstitutionStats]) -> Vec<String> {
    if stats.is_empty() {
        return vec![
            "No significant financial news found in the last 48 hours".to_string(),
            "Try adjusting the time range or check back later".to_string(),
            "Markets may be experiencing low volatility".to_string(),
        ];
    }

    let positive = stats
        .iter()
        .filter(|s| s.sentiment_label == SentimentLabel::Positive)
        .count();
    let negative = stats
        .iter()
        .filter(|s| s.sentiment_label == SentimentLabel::Negative)
        .count();
    let high_india = stats
        .iter()
        .filter(|s| s.india_linkage > HIGH_INDIA_LINKAGE)
        .count();

    let mut summary = Vec::with_capacity(3);

    let top = &stats[0];
    summary.push(format!(
        "{} leads with highest India market impact (Score: {:.1})",
        top.institution, top.impact_score
    ));

    summary.push(if positive > negative {
        format!(
            "Market sentiment trending positive with {positive} institutions showing bullish signals"
        )
    } else if negative > positive {
        format!(
            "Cautionary signals detected with {negative} institutions showing bearish trends"
        )
    } else {
        format!(
            "Mixed market sentiment with balanced positive ({positive}) and negative ({negative}) signals"
        )
    });

    summary.push(if high_india > 0 {
        format!("Strong India focus detected in {high_india} major institutions")
    } else {
        "Limited direct India-specific news; monitoring broader emerging market trends"
            .to_string()
    });

    summary
}
