//! Domain records shared by the pipeline, the store and the report synthesizer.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a raw item was collected from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Platform {
    News,
    Twitter,
    Telegram,
    Facebook,
    Tiktok,
}

#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    KeyEvents,
    Political,
    Economic,
    Social,
    #[default]
    Other,
}

/// Ordered urgency: `Low < Medium < High < Critical`.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entities {
    #[serde(default)]
    pub people: Vec<String>,
    #[serde(default)]
    pub organizations: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
}

/// Item as produced by a collector; lives for one cycle only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub content: String,
    /// Identity key for deduplication.
    pub source_url: String,
    pub source_name: String,
    pub published_at: DateTime<Utc>,
    pub platform: Platform,
    pub image_url: Option<String>,
}

/// Persisted, append-only. At most one per distinct `source_url`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifiedItem {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub category: Category,
    pub severity: Severity,
    pub is_breaking: bool,
    pub platform: Platform,
    pub source_url: String,
    pub source_name: String,
    pub published_at: DateTime<Utc>,
    pub image_url: Option<String>,
    pub sentiment: Sentiment,
    pub keywords: Vec<String>,
    pub entities: Entities,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: Uuid,
    pub news_item_id: Uuid,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub category: Category,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Analysis {
    pub trends: Vec<String>,
    pub implications: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Statistics {
    pub total_items: usize,
    pub by_platform: BTreeMap<Platform, usize>,
    pub by_category: BTreeMap<Category, usize>,
    pub by_severity: BTreeMap<Severity, usize>,
}

impl Statistics {
    pub fn from_items(items: &[ClassifiedItem]) -> Self {
        let mut stats = Statistics {
            total_items: items.len(),
            ..Default::default()
        };
        for it in items {
            *stats.by_platform.entry(it.platform).or_default() += 1;
            *stats.by_category.entry(it.category).or_default() += 1;
            *stats.by_severity.entry(it.severity).or_default() += 1;
        }
        stats
    }
}

/// One per calendar date; bucket fields hold `ClassifiedItem` ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyReport {
    pub id: Uuid,
    pub date: NaiveDate,
    pub summary: String,
    pub key_events: Vec<Uuid>,
    pub political_updates: Vec<Uuid>,
    pub economic_situation: Vec<Uuid>,
    pub social_issues: Vec<Uuid>,
    pub analysis: Analysis,
    pub statistics: Statistics,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_is_ordered() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
        assert_eq!(Severity::Low.max(Severity::High), Severity::High);
    }

    #[test]
    fn enums_use_upper_snake_case_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&Category::KeyEvents).unwrap(),
            "\"KEY_EVENTS\""
        );
        let p: Platform = serde_json::from_str("\"TELEGRAM\"").unwrap();
        assert_eq!(p, Platform::Telegram);
    }

    #[test]
    fn statistics_count_every_item() {
        let now = Utc::now();
        let mk = |platform, category, severity| ClassifiedItem {
            id: Uuid::new_v4(),
            title: "t".into(),
            content: "c".into(),
            summary: "s".into(),
            category,
            severity,
            is_breaking: false,
            platform,
            source_url: Uuid::new_v4().to_string(),
            source_name: "n".into(),
            published_at: now,
            image_url: None,
            sentiment: Sentiment::Neutral,
            keywords: vec![],
            entities: Entities::default(),
            created_at: now,
        };
        let items = vec![
            mk(Platform::News, Category::Political, Severity::Low),
            mk(Platform::News, Category::Economic, Severity::High),
            mk(Platform::Telegram, Category::Political, Severity::High),
        ];
        let s = Statistics::from_items(&items);
        assert_eq!(s.total_items, 3);
        assert_eq!(s.by_platform[&Platform::News], 2);
        assert_eq!(s.by_category[&Category::Political], 2);
        assert_eq!(s.by_severity[&Severity::High], 2);
        assert!(!s.by_severity.contains_key(&Severity::Critical));
    }
}
