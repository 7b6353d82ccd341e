//! Persistence contract used by the pipeline and the report synthesizer.
//!
//! Uniqueness is enforced here, not by callers: `insert_item` fails with
//! [`StoreError::Duplicate`] when `source_url` is already present, and
//! `insert_report` fails the same way for an existing date.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{Alert, ClassifiedItem, DailyReport};

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_by_url(&self, url: &str) -> StoreResult<Option<ClassifiedItem>>;

    async fn insert_item(&self, item: ClassifiedItem) -> StoreResult<()>;

    /// Items with `start <= published_at <= end`, newest publication first.
    async fn items_published_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<ClassifiedItem>>;

    /// Items with `created_at >= since`, newest creation first, at most `limit`.
    async fn items_created_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<ClassifiedItem>>;

    /// Resolves ids in the given order; unknown ids are skipped.
    async fn items_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<ClassifiedItem>>;

    async fn insert_alert(&self, alert: Alert) -> StoreResult<()>;

    /// Returns `false` when no alert has that id.
    async fn mark_alert_read(&self, id: Uuid) -> StoreResult<bool>;

    /// Newest first.
    async fn recent_alerts(&self, limit: usize) -> StoreResult<Vec<Alert>>;

    async fn find_report_by_date(&self, date: NaiveDate) -> StoreResult<Option<DailyReport>>;

    /// Returns `true` if a report was removed.
    async fn delete_report_by_date(&self, date: NaiveDate) -> StoreResult<bool>;

    async fn insert_report(&self, report: DailyReport) -> StoreResult<()>;

    /// Newest date first.
    async fn recent_reports(&self, limit: usize) -> StoreResult<Vec<DailyReport>>;

    /// Regenerate-on-request persistence: drop whatever exists for the
    /// report's date, then insert the new one.
    async fn replace_report(&self, report: DailyReport) -> StoreResult<()> {
        if self.delete_report_by_date(report.date).await? {
            tracing::info!(target: "report", date = %report.date, "existing report removed for regeneration");
        }
        self.insert_report(report).await
    }
}
