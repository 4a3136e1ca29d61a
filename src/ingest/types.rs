// src/ingest/types.rs
use anyhow::Result;

/// One fetched news article. Immutable once built; the scoring pipeline
/// borrows articles for the duration of a single computation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Article {
    /// Stable short id derived from url/title (see `ingest::article_id`).
    pub id: String,
    pub source: String, // e.g., "Reuters", "Economic Times"
    pub title: String,
    pub body: String,
    pub published_at: u64, // unix seconds
    pub url: Option<String>,
}

impl Article {
    /// Text submitted to the scorer: headline first, then body.
    pub fn scoring_text(&self) -> String {
        if self.body.is_empty() {
            self.title.clone()
        } else {
            format!("{}. {}", self.title, self.body)
        }
    }
}

#[async_trait::async_trait]
pub trait ArticleProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Article>>;
    /// Source name feeds come from config, so this is not `'static`.
    fn name(&self) -> &str;
}
