// src/ingest/providers/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::ingest::types::{Article, ArticleProvider};
use crate::ingest::{article_id, normalize_text};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> u64 {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
        .unwrap_or(0)
}

enum Content {
    /// Fixed XML for tests; no network.
    Fixture(String),
    /// Fetched over HTTP at each refresh.
    Remote { http: reqwest::Client, url: String },
}

/// Generic RSS feed provider. One instance per configured feed.
pub struct RssProvider {
    source_name: String,
    content: Content,
}

impl RssProvider {
    pub fn new(source_name: impl Into<String>, url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("news-impact-analyzer/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            source_name: source_name.into(),
            content: Content::Remote {
                http,
                url: url.into(),
            },
        }
    }

    pub fn from_fixture(source_name: impl Into<String>, content: &str) -> Self {
        Self {
            source_name: source_name.into(),
            content: Content::Fixture(content.to_string()),
        }
    }

    fn parse(&self, xml: &str) -> Result<Vec<Article>> {
        let t0 = std::time::Instant::now();

        let rss: Rss = from_str(xml)
            .with_context(|| format!("parsing {} rss xml", self.source_name))?;
        let mut out = Vec::with_capacity(rss.channel.item.len());

        for it in rss.channel.item {
            let title = normalize_text(it.title.as_deref().unwrap_or_default());
            if title.is_empty() {
                continue;
            }
            let body = normalize_text(it.description.as_deref().unwrap_or_default());
            out.push(Article {
                id: article_id(&self.source_name, &title, it.link.as_deref()),
                source: self.source_name.clone(),
                title,
                body,
                published_at: it
                    .pub_date
                    .as_deref()
                    .map(parse_rfc2822_to_unix)
                    .unwrap_or(0),
                url: it.link,
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("news_provider_parse_ms").record(ms);
        counter!("news_provider_items_total").increment(out.len() as u64);

        Ok(out)
    }
}

#[async_trait]
impl ArticleProvider for RssProvider {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        let xml = match &self.content {
            Content::Fixture(raw) => raw.clone(),
            Content::Remote { http, url } => http
                .get(url)
                .send()
                .await
                .with_context(|| format!("fetching {url}"))?
                .error_for_status()
                .with_context(|| format!("fetching {url}"))?
                .text()
                .await
                .with_context(|| format!("reading {url}"))?,
        };
        self.parse(&xml)
    }

    fn name(&self) -> &str {
        &self.source_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <item>
      <title>JPMorgan sees strong India-linked growth</title>
      <link>https://example.com/a</link>
      <pubDate>Mon, 03 Aug 2026 10:00:00 GMT</pubDate>
      <description>RBI praises resilience of foreign banks.</description>
    </item>
    <item>
      <title></title>
      <description>No headline, dropped.</description>
    </item>
  </channel>
</rss>"#;

    #[tokio::test]
    async fn parses_fixture_items_and_skips_untitled() {
        let p = RssProvider::from_fixture("Reuters", FIXTURE);
        let arts = p.fetch_latest().await.unwrap();
        assert_eq!(arts.len(), 1);
        let a = &arts[0];
        assert_eq!(a.source, "Reuters");
        assert_eq!(a.title, "JPMorgan sees strong India-linked growth");
        assert!(a.body.contains("RBI praises"));
        assert!(a.published_at > 0);
        assert_eq!(a.url.as_deref(), Some("https://example.com/a"));
    }

    #[test]
    fn rfc2822_parse_is_lenient_on_garbage() {
        assert_eq!(parse_rfc2822_to_unix("not a date"), 0);
        assert!(parse_rfc2822_to_unix("Mon, 03 Aug 2026 10:00:00 GMT") > 0);
    }
}
