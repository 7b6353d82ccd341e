// src/store/memory.rs
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::model::{Alert, ClassifiedItem, DailyReport};

/// Process-local store. The write lock around `insert_item` is the
/// serialization point for `source_url` uniqueness.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    items: Vec<ClassifiedItem>,
    by_url: HashMap<String, usize>,
    by_id: HashMap<Uuid, usize>,
    alerts: Vec<Alert>,
    reports: BTreeMap<NaiveDate, DailyReport>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item_count(&self) -> usize {
        self.read().map(|g| g.items.len()).unwrap_or(0)
    }

    pub fn alert_count(&self) -> usize {
        self.read().map(|g| g.alerts.len()).unwrap_or(0)
    }

    pub fn report_count(&self) -> usize {
        self.read().map(|g| g.reports.len()).unwrap_or(0)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_by_url(&self, url: &str) -> StoreResult<Option<ClassifiedItem>> {
        let g = self.read()?;
        Ok(g.by_url.get(url).map(|&i| g.items[i].clone()))
    }

    async fn insert_item(&self, item: ClassifiedItem) -> StoreResult<()> {
        let mut g = self.write()?;
        if g.by_url.contains_key(&item.source_url) {
            return Err(StoreError::Duplicate(item.source_url));
        }
        let idx = g.items.len();
        g.by_url.insert(item.source_url.clone(), idx);
        g.by_id.insert(item.id, idx);
        g.items.push(item);
        Ok(())
    }

    async fn items_published_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<ClassifiedItem>> {
        let g = self.read()?;
        let mut out: Vec<ClassifiedItem> = g
            .items
            .iter()
            .filter(|it| it.published_at >= start && it.published_at <= end)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(out)
    }

    async fn items_created_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<ClassifiedItem>> {
        let g = self.read()?;
        let mut out: Vec<ClassifiedItem> = g
            .items
            .iter()
            .filter(|it| it.created_at >= since)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.truncate(limit);
        Ok(out)
    }

    async fn items_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<ClassifiedItem>> {
        let g = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| g.by_id.get(id).map(|&i| g.items[i].clone()))
            .collect())
    }

    async fn insert_alert(&self, alert: Alert) -> StoreResult<()> {
        let mut g = self.write()?;
        if g.alerts.iter().any(|a| a.news_item_id == alert.news_item_id) {
            return Err(StoreError::Duplicate(alert.news_item_id.to_string()));
        }
        g.alerts.push(alert);
        Ok(())
    }

    async fn mark_alert_read(&self, id: Uuid) -> StoreResult<bool> {
        let mut g = self.write()?;
        match g.alerts.iter_mut().find(|a| a.id == id) {
            Some(a) => {
                a.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn recent_alerts(&self, limit: usize) -> StoreResult<Vec<Alert>> {
        let g = self.read()?;
        let mut out = g.alerts.clone();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.truncate(limit);
        Ok(out)
    }

    async fn find_report_by_date(&self, date: NaiveDate) -> StoreResult<Option<DailyReport>> {
        Ok(self.read()?.reports.get(&date).cloned())
    }

    async fn delete_report_by_date(&self, date: NaiveDate) -> StoreResult<bool> {
        Ok(self.write()?.reports.remove(&date).is_some())
    }

    async fn insert_report(&self, report: DailyReport) -> StoreResult<()> {
        let mut g = self.write()?;
        if g.reports.contains_key(&report.date) {
            return Err(StoreError::Duplicate(report.date.to_string()));
        }
        g.reports.insert(report.date, report);
        Ok(())
    }

    async fn recent_reports(&self, limit: usize) -> StoreResult<Vec<DailyReport>> {
        let g = self.read()?;
        Ok(g.reports.values().rev().take(limit).cloned().collect())
    }

    /// Swap under one write guard so concurrent regenerations of a date
    /// cannot interleave their delete and insert.
    async fn replace_report(&self, report: DailyReport) -> StoreResult<()> {
        let date = report.date;
        if self.write()?.reports.insert(date, report).is_some() {
            tracing::info!(target: "report", %date, "existing report replaced");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Analysis, Category, Entities, Platform, Sentiment, Severity, Statistics};
    use chrono::{Duration, TimeZone};

    fn item(url: &str, published_at: DateTime<Utc>) -> ClassifiedItem {
        ClassifiedItem {
            id: Uuid::new_v4(),
            title: format!("title {url}"),
            content: "content".into(),
            summary: "summary".into(),
            category: Category::Political,
            severity: Severity::Low,
            is_breaking: false,
            platform: Platform::News,
            source_url: url.into(),
            source_name: "Test".into(),
            published_at,
            image_url: None,
            sentiment: Sentiment::Neutral,
            keywords: vec![],
            entities: Entities::default(),
            created_at: published_at,
        }
    }

    fn report(date: NaiveDate, summary: &str) -> DailyReport {
        DailyReport {
            id: Uuid::new_v4(),
            date,
            summary: summary.into(),
            key_events: vec![],
            political_updates: vec![],
            economic_situation: vec![],
            social_issues: vec![],
            analysis: Analysis::default(),
            statistics: Statistics::default(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn second_insert_of_same_url_fails() {
        let store = MemoryStore::new();
        let t = Utc::now();
        store.insert_item(item("u1", t)).await.unwrap();
        let err = store.insert_item(item("u1", t)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(ref k) if k == "u1"));
        assert_eq!(store.item_count(), 1);
    }

    #[tokio::test]
    async fn published_range_is_inclusive_and_newest_first() {
        let store = MemoryStore::new();
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let end = start + Duration::hours(24) - Duration::nanoseconds(1);
        store.insert_item(item("a", start)).await.unwrap();
        store.insert_item(item("b", end)).await.unwrap();
        store
            .insert_item(item("c", end + Duration::nanoseconds(1)))
            .await
            .unwrap();

        let got = store.items_published_between(start, end).await.unwrap();
        let urls: Vec<_> = got.iter().map(|i| i.source_url.as_str()).collect();
        assert_eq!(urls, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn replace_report_swaps_existing() {
        let store = MemoryStore::new();
        let d = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        store.insert_report(report(d, "first")).await.unwrap();
        assert!(store.insert_report(report(d, "dup")).await.is_err());

        store.replace_report(report(d, "second")).await.unwrap();
        assert_eq!(store.report_count(), 1);
        let got = store.find_report_by_date(d).await.unwrap().unwrap();
        assert_eq!(got.summary, "second");
    }

    #[tokio::test]
    async fn mark_alert_read_toggles_flag() {
        let store = MemoryStore::new();
        let alert = Alert {
            id: Uuid::new_v4(),
            news_item_id: Uuid::new_v4(),
            title: "t".into(),
            message: "m".into(),
            severity: Severity::High,
            category: Category::Other,
            read: false,
            created_at: Utc::now(),
        };
        let id = alert.id;
        store.insert_alert(alert).await.unwrap();
        assert!(store.mark_alert_read(id).await.unwrap());
        assert!(!store.mark_alert_read(Uuid::new_v4()).await.unwrap());
        assert!(store.recent_alerts(10).await.unwrap()[0].read);
    }
}
