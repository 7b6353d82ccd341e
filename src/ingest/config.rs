// src/ingest/config.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::ingest::providers::rss::RssCollector;
use crate::ingest::types::SourceCollector;
use crate::ingest::CollectorSet;
use crate::model::Platform;

fn default_min_description_len() -> usize {
    20
}

/// One RSS feed inside a collector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
    pub platform: Platform,
    /// Case-insensitive substring the item title must contain.
    #[serde(default)]
    pub title_filter: Option<String>,
    /// Items whose description is not longer than this are skipped.
    #[serde(default = "default_min_description_len")]
    pub min_description_len: usize,
    #[serde(default)]
    pub max_items: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectorConfig {
    pub name: String,
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

/// Build the registered collector set, keeping configuration order.
pub fn build_collectors(cfgs: &[CollectorConfig]) -> Result<CollectorSet> {
    let mut set = CollectorSet::default();
    for c in cfgs {
        let collector: Box<dyn SourceCollector> =
            Box::new(RssCollector::new(c.name.clone(), c.feeds.clone())?);
        set.register(collector);
    }
    Ok(set)
}

fn google_news(query: &str) -> FeedConfig {
    FeedConfig {
        name: "Google News".into(),
        url: format!(
            "https://news.google.com/rss/search?q={}&hl=en-US&gl=US&ceid=US:en",
            query.replace(' ', "+")
        ),
        platform: Platform::News,
        title_filter: None,
        min_description_len: default_min_description_len(),
        max_items: None,
    }
}

fn outlet(name: &str, url: &str, topic: &str) -> FeedConfig {
    FeedConfig {
        name: name.into(),
        url: url.into(),
        platform: Platform::News,
        title_filter: Some(topic.to_lowercase()),
        min_description_len: default_min_description_len(),
        max_items: None,
    }
}

fn telegram_bridge(channel: &str) -> FeedConfig {
    FeedConfig {
        name: format!("Telegram @{channel}"),
        url: format!("https://rsshub.app/telegram/channel/{channel}"),
        platform: Platform::Telegram,
        title_filter: None,
        min_description_len: 0,
        max_items: Some(10),
    }
}

/// Collectors used when no config file provides any.
pub fn default_collectors(topic: &str) -> Vec<CollectorConfig> {
    let queries = ["crisis", "economy", "politics", "sanctions"];
    let mut news: Vec<FeedConfig> = queries
        .iter()
        .map(|q| google_news(&format!("{topic} {q}")))
        .collect();
    news.push(outlet(
        "Al Jazeera",
        "https://www.aljazeera.com/xml/rss/all.xml",
        topic,
    ));
    news.push(outlet(
        "BBC",
        "https://www.bbc.com/news/world/latin_america/rss.xml",
        topic,
    ));
    news.push(outlet(
        "New York Times",
        "https://rss.nytimes.com/services/xml/rss/nyt/World.xml",
        topic,
    ));

    vec![
        CollectorConfig {
            name: "news".into(),
            feeds: news,
        },
        CollectorConfig {
            name: "telegram".into(),
            feeds: vec![
                telegram_bridge("venezuela_news_en"),
                telegram_bridge("VenezuelaAnalysis"),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_defaults_apply() {
        let toml = r#"
            name = "BBC"
            url = "https://example.test/rss"
            platform = "NEWS"
        "#;
        let f: FeedConfig = toml::from_str(toml).unwrap();
        assert_eq!(f.min_description_len, 20);
        assert!(f.title_filter.is_none());
        assert!(f.max_items.is_none());
    }

    #[test]
    fn defaults_cover_news_and_telegram() {
        let cfgs = default_collectors("Venezuela");
        assert_eq!(cfgs.len(), 2);
        assert!(cfgs[0].feeds.iter().all(|f| f.platform == Platform::News));
        assert!(cfgs[1]
            .feeds
            .iter()
            .all(|f| f.platform == Platform::Telegram && f.max_items == Some(10)));
        assert!(cfgs[0].feeds[0].url.contains("Venezuela+crisis"));
    }

    #[test]
    fn build_keeps_order() {
        let set = build_collectors(&default_collectors("Venezuela")).unwrap();
        assert_eq!(set.len(), 2);
    }
}
