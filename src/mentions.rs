//! # Mention Builder
//! Joins the sentiment scorer and the institution matcher into per-article
//! mention records. An article yields at most one record per institution,
//! however many times the name appears.

use serde::{Deserialize, Serialize};

use crate::ingest::types::Article;
use crate::institutions::InstitutionRegistry;
use crate::sentiment::{self, SentimentResult};

/// One (institution, article) pairing inside a single computation.
/// Transient; consumed only by the aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionRecord {
    pub institution: String,
    pub article_id: String,
    pub sentiment: SentimentResult,
    pub india_linkage_weight: f64,
}

/// Build mention records for one article.
///
/// Sentiment and India linkage are computed once per article and shared by
/// every institution it mentions. Records come back ordered by institution
/// name, so downstream aggregation is deterministic.
pub fn build(article: &Article, registry: &InstitutionRegistry) -> Vec<MentionRecord> {
    let text = article.scoring_text();
    let matched = registry.match_text(&text);
    if matched.is_empty() {
        return Vec::new();
    }

    let sentiment = sentiment::score(&text);
    let india_weight = registry.india_linkage(&text) as f64;

    matched
        .into_iter()
        .map(|institution| MentionRecord {
            institution,
            article_id: article.id.clone(),
            sentiment: sentiment.clone(),
            india_linkage_weight: india_weight,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::article_id;

    fn registry() -> InstitutionRegistry {
        InstitutionRegistry::load().expect("embedded registry")
    }

    fn art(title: &str, body: &str) -> Article {
        Article {
            id: article_id("Test", title, None),
            source: "Test".into(),
            title: title.into(),
            body: body.into(),
            published_at: 0,
            url: None,
        }
    }

    #[test]
    fn one_record_per_institution_even_on_repeats() {
        let a = art(
            "JPMorgan doubles down: JPMorgan to expand JPMorgan Chase India desk",
            "",
        );
        let records = build(&a, &registry());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].institution, "JPMorgan");
    }

    #[test]
    fn multiple_institutions_share_the_article_sentiment() {
        let a = art(
            "HSBC and Barclays report strong growth in India",
            "Both banks praised the rupee stability.",
        );
        let records = build(&a, &registry());
        let names: Vec<&str> = records.iter().map(|r| r.institution.as_str()).collect();
        assert_eq!(names, vec!["Barclays", "HSBC"]); // ordered by name
        assert_eq!(records[0].sentiment.compound, records[1].sentiment.compound);
        assert!(records[0].india_linkage_weight >= 2.0); // India + rupee
    }

    #[test]
    fn unmatched_article_yields_nothing() {
        let a = art("City council approves new bike lanes", "");
        assert!(build(&a, &registry()).is_empty());
    }
}
