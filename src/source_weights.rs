//! # Source Credibility Weights
//!
//! Configurable mapping from news sources (e.g. "Reuters", "Economic Times")
//! to normalized credibility weights in `[0.0, 1.0]`, folded into the
//! freshness term of the impact score.
//!
//! - Loads from JSON config (weights + aliases).
//! - Case-insensitive lookup with punctuation/dash normalization.
//! - Fallback order: aliases -> exact match -> substring match -> default.
//! - Includes a built-in `default_seed()` with the tracked feeds.

use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

pub const DEFAULT_SOURCE_WEIGHTS_PATH: &str = "config/source_weights.json";

/// Configuration for source credibility, loaded from JSON or defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceWeightsConfig {
    /// Default weight if no match is found.
    #[serde(default = "default_default_weight")]
    pub default_weight: f64,
    /// Explicit weights for canonical source names.
    #[serde(default)]
    pub weights: HashMap<String, f64>,
    /// Aliases mapping non-canonical names -> canonical names.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

fn default_default_weight() -> f64 {
    0.70
}

impl SourceWeightsConfig {
    /// Load configuration from a JSON file.
    /// Falls back to `default_seed()` on error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|_| Self::default_seed()),
            Err(_) => Self::default_seed(),
        }
    }

    /// Credibility weight for a source name.
    ///
    /// Steps:
    /// 1. Alias lookup (normalized) -> canonical -> weight.
    /// 2. Exact weight match.
    /// 3. Substring fallback (e.g. "economictimes.indiatimes.com").
    /// 4. Default weight.
    pub fn weight_for(&self, source: &str) -> f64 {
        let s = normalize(source);

        if let Some(canon) = self.aliases.get(&s) {
            let c = normalize(canon);
            if let Some(&w) = self.weights.get(&c) {
                return clamp01(w);
            }
        }

        if let Some(&w) = self.weights.get(&s) {
            return clamp01(w);
        }

        for (k, &w) in &self.weights {
            if s.contains(k) {
                return clamp01(w);
            }
        }

        clamp01(self.default_weight)
    }

    /// Built-in seed covering the configured feeds.
    pub fn default_seed() -> Self {
        let mut weights = HashMap::new();
        let mut aliases = HashMap::new();

        for (k, v) in [
            ("reuters", 1.0),
            ("bloomberg", 1.0),
            ("financial times", 0.95),
            ("economic times", 0.90),
            ("moneycontrol", 0.85),
            ("ai search", 0.95),
        ] {
            weights.insert(k.to_string(), v);
        }

        for (a, c) in [
            ("reuters com", "reuters"),
            ("ft", "financial times"),
            ("ft com", "financial times"),
            ("economictimes indiatimes com", "economic times"),
            ("et", "economic times"),
            ("moneycontrol com", "moneycontrol"),
        ] {
            aliases.insert(a.to_string(), c.to_string());
        }

        Self {
            default_weight: 0.70,
            weights,
            aliases,
        }
    }
}

/// Normalize input string: lowercase, separators to spaces, collapse spaces.
fn normalize(s: &str) -> String {
    let mut out = s.trim().to_ascii_lowercase();

    for ch in ['—', '–', '-', '_', '/', '\\'] {
        out = out.replace(ch, " ");
    }
    out = out.replace(['\n', '\r', '\t', '.', ',', '\''], " ");

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SourceWeightsConfig {
        SourceWeightsConfig::default_seed()
    }

    #[test]
    fn exact_match() {
        let c = cfg();
        assert!((c.weight_for("Reuters") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn alias_and_domain_match() {
        let c = cfg();
        assert!((c.weight_for("economictimes.indiatimes.com") - 0.90).abs() < 1e-9);
        assert!((c.weight_for("FT") - 0.95).abs() < 1e-9);
    }

    #[test]
    fn substring_fallback() {
        let c = cfg();
        assert!((c.weight_for("Moneycontrol Markets Desk") - 0.85).abs() < 1e-9);
    }

    #[test]
    fn default_weight_for_unknown_source() {
        let c = cfg();
        assert!((c.weight_for("Totally Unknown Blog") - c.default_weight).abs() < 1e-9);
    }

    #[test]
    fn case_insensitive_lookup() {
        let c = cfg();
        assert_eq!(c.weight_for("REUTERS"), c.weight_for("reuters"));
    }
}
