//! # Sentiment Scorer
//! Pure ensemble scoring of article text: a valence-lexicon estimator, a
//! word-polarity estimator, and a finance keyword heuristic. Each sub-scorer
//! returns `Option<f64>` in [-1, 1]; the reported compound is the mean of the
//! sub-scores that produced a value. No I/O, no shared state.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).expect("valid sentiment lexicon")
});

/// Finance-specific positive terms for the keyword heuristic.
const POSITIVE_TERMS: &[&str] = &[
    "growth", "profit", "upgrade", "investment", "expansion", "positive", "gains",
    "optimistic", "rally", "surge", "boom", "bullish", "outperform", "strong",
    "robust", "recovery", "upbeat", "accelerate", "breakthrough",
];

/// Finance-specific negative terms for the keyword heuristic.
const NEGATIVE_TERMS: &[&str] = &[
    "loss", "losses", "decline", "downgrade", "concern", "risk", "negative",
    "falls", "warning", "crash", "recession", "bearish", "weak", "slowdown",
    "crisis", "plunge", "underperform", "volatile", "volatility", "threat",
];

/// Sentiment label derived from the compound score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Mixed,
}

impl SentimentLabel {
    /// Fixed thresholds: > 0.1 positive, < -0.1 negative, otherwise mixed.
    pub fn from_compound(compound: f64) -> Self {
        if compound > 0.1 {
            SentimentLabel::Positive
        } else if compound < -0.1 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Mixed
        }
    }
}

/// Result of scoring one text. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentResult {
    pub compound: f64,
    pub label: SentimentLabel,
    /// Raw score per sub-scorer that produced a value.
    pub components: BTreeMap<String, f64>,
}

impl SentimentResult {
    /// Neutral result used when every sub-scorer abstains or fails.
    pub fn neutral() -> Self {
        Self {
            compound: 0.0,
            label: SentimentLabel::Mixed,
            components: BTreeMap::new(),
        }
    }
}

/// Score a text with the full ensemble.
pub fn score(text: &str) -> SentimentResult {
    let tokens: Vec<String> = tokenize(text).collect();

    let parts: [(&str, Option<f64>); 3] = [
        ("lexicon", lexicon_score(&tokens)),
        ("polarity", polarity_score(&tokens)),
        ("keywords", keyword_score(&tokens)),
    ];

    let mut components = BTreeMap::new();
    for (name, part) in parts.iter() {
        if let Some(v) = part {
            components.insert((*name).to_string(), round3(*v));
        }
    }

    let compound = round3(combine(&parts.map(|(_, p)| p)));
    SentimentResult {
        compound,
        label: SentimentLabel::from_compound(compound),
        components,
    }
}

/// Mean of the sub-scores that are present, clamped to [-1, 1].
/// An absent sub-score is skipped, never treated as zero.
pub fn combine(parts: &[Option<f64>]) -> f64 {
    let present: Vec<f64> = parts.iter().flatten().copied().collect();
    if present.is_empty() {
        return 0.0;
    }
    let mean = present.iter().sum::<f64>() / present.len() as f64;
    mean.clamp(-1.0, 1.0)
}

/// Lexicon estimator: signed valence sum with negation handling, squashed
/// into (-1, 1) via `sum / sqrt(sum^2 + 15)`.
fn lexicon_score(tokens: &[String]) -> Option<f64> {
    if tokens.is_empty() {
        return None;
    }
    let mut sum: i64 = 0;
    for (i, w) in tokens.iter().enumerate() {
        let base = *LEXICON.get(w.as_str()).unwrap_or(&0) as i64;
        if base != 0 {
            // invert sign when a negator appears within the last 1..=3 tokens
            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            sum += if negated { -base } else { base };
        }
    }
    let s = sum as f64;
    Some(s / (s * s + 15.0).sqrt())
}

/// Polarity estimator: mean per-word polarity over lexicon hits only,
/// each word contributing `valence / 5` in [-1, 1]. Abstains with no hits.
fn polarity_score(tokens: &[String]) -> Option<f64> {
    let mut sum = 0.0f64;
    let mut hits = 0usize;
    for (i, w) in tokens.iter().enumerate() {
        if let Some(&v) = LEXICON.get(w.as_str()) {
            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            let p = v as f64 / 5.0;
            sum += if negated { -p } else { p };
            hits += 1;
        }
    }
    if hits == 0 {
        return None;
    }
    Some((sum / hits as f64).clamp(-1.0, 1.0))
}

/// Keyword heuristic: `(pos - neg) / (pos + neg)` over finance term hits.
/// Abstains when neither list matches.
fn keyword_score(tokens: &[String]) -> Option<f64> {
    let pos = tokens
        .iter()
        .filter(|t| POSITIVE_TERMS.contains(&t.as_str()))
        .count() as f64;
    let neg = tokens
        .iter()
        .filter(|t| NEGATIVE_TERMS.contains(&t.as_str()))
        .count() as f64;
    let total = pos + neg;
    if total == 0.0 {
        return None;
    }
    Some((pos - neg) / total)
}

/// Alphanumeric tokens, lower-cased.
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
}

// Tokens are alphanumeric, so contracted negators arrive split ("isn t");
// the bare "t" is not worth matching.
fn is_negator(tok: &str) -> bool {
    matches!(tok, "not" | "no" | "never" | "nor" | "cannot" | "without")
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
