//! Snapshot: the immutable unit of caching and broadcast.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impact::InstitutionStats;

/// One fully-computed aggregate result set. Built wholesale by
/// `engine::build_snapshot`, then shared read-only behind an `Arc` until the
/// next successful recomputation replaces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub computed_at: DateTime<Utc>,
    /// Served institutions, ordered by impact score descending
    /// (ties by name ascending).
    pub institutions: Vec<InstitutionStats>,
    /// Executive summary lines.
    pub summary: Vec<String>,
    pub total_articles: u32,
    /// All institutions that scored, including those beyond the served cut.
    pub total_institutions: u32,
    pub positive_count: u32,
    pub negative_count: u32,
}

impl Snapshot {
    /// Age relative to `now_unix`, saturating at zero.
    pub fn age_secs(&self, now_unix: u64) -> u64 {
        let computed = self.computed_at.timestamp().max(0) as u64;
        now_unix.saturating_sub(computed)
    }

    pub fn institution(&self, name: &str) -> Option<&InstitutionStats> {
        self.institutions
            .iter()
            .find(|s| s.institution.eq_ignore_ascii_case(name))
    }
}
