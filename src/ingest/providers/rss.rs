use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::ingest::config::FeedConfig;
use crate::ingest::strip_html;
use crate::ingest::types::SourceCollector;
use crate::model::RawItem;

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
    enclosure: Option<Enclosure>,
}
#[derive(Debug, Deserialize)]
struct Enclosure {
    #[serde(rename = "@url")]
    url: Option<String>,
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

enum Mode {
    Fixture(String),
    Http(reqwest::Client),
}

/// Collects from several RSS feeds. Each feed is isolated: a feed that
/// fails to download or parse is logged and skipped, the rest still count.
pub struct RssCollector {
    name: String,
    feeds: Vec<FeedConfig>,
    mode: Mode,
}

impl RssCollector {
    pub fn new(name: impl Into<String>, feeds: Vec<FeedConfig>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("situation-monitor/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .context("building rss http client")?;
        Ok(Self {
            name: name.into(),
            feeds,
            mode: Mode::Http(client),
        })
    }

    /// Every feed resolves to the same XML document; for tests and local runs.
    pub fn from_fixture(name: impl Into<String>, feeds: Vec<FeedConfig>, xml: &str) -> Self {
        Self {
            name: name.into(),
            feeds,
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    async fn fetch_feed(&self, feed: &FeedConfig) -> Result<Vec<RawItem>> {
        let body = match &self.mode {
            Mode::Fixture(s) => s.clone(),
            Mode::Http(client) => client
                .get(&feed.url)
                .send()
                .await
                .with_context(|| format!("GET {}", feed.url))?
                .error_for_status()
                .with_context(|| format!("non-2xx from {}", feed.url))?
                .text()
                .await
                .context("feed .text()")?,
        };
        parse_feed(&body, feed, Utc::now())
    }
}

#[async_trait]
impl SourceCollector for RssCollector {
    async fn fetch(&self) -> Result<Vec<RawItem>> {
        let mut out = Vec::new();
        for feed in &self.feeds {
            match self.fetch_feed(feed).await {
                Ok(mut items) => out.append(&mut items),
                Err(e) => {
                    tracing::warn!(target: "ingest", error = ?e, collector = %self.name, feed = %feed.name, "feed error");
                    counter!("ingest_feed_errors_total").increment(1);
                }
            }
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Parse one RSS document into raw items, applying the feed's filters.
/// `now` stands in for a missing or unparseable `pubDate`.
pub fn parse_feed(xml: &str, feed: &FeedConfig, now: DateTime<Utc>) -> Result<Vec<RawItem>> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&xml_clean).with_context(|| format!("parsing rss xml for {}", feed.name))?;

    let title_filter = feed.title_filter.as_deref().map(str::to_lowercase);
    let mut out = Vec::new();
    for it in rss.channel.item {
        let title = strip_html(it.title.as_deref().unwrap_or_default());
        let link = it.link.as_deref().unwrap_or_default().trim().to_string();
        let description = strip_html(it.description.as_deref().unwrap_or_default());

        if title.is_empty() || link.is_empty() {
            continue;
        }
        if description.chars().count() <= feed.min_description_len {
            continue;
        }
        if let Some(f) = &title_filter {
            if !title.to_lowercase().contains(f.as_str()) {
                continue;
            }
        }

        out.push(RawItem {
            title,
            content: description,
            source_url: link,
            source_name: feed.name.clone(),
            published_at: it.pub_date.as_deref().and_then(parse_rfc2822).unwrap_or(now),
            platform: feed.platform,
            image_url: it.enclosure.and_then(|e| e.url),
        });

        if feed.max_items.is_some_and(|max| out.len() >= max) {
            break;
        }
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    Ok(out)
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
