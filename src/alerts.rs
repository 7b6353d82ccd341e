//! Alert decision: breaking items and anything above LOW get one alert.

use chrono::{DateTime, Utc};
use metrics::counter;
use uuid::Uuid;

use crate::model::{Alert, ClassifiedItem, Severity};
use crate::notify::{EventSink, MonitorEvent};
use crate::store::{Store, StoreResult};

pub fn qualifies(item: &ClassifiedItem) -> bool {
    item.is_breaking || item.severity >= Severity::Medium
}

pub fn build_alert(item: &ClassifiedItem, now: DateTime<Utc>) -> Alert {
    Alert {
        id: Uuid::new_v4(),
        news_item_id: item.id,
        title: item.title.clone(),
        message: item.summary.clone(),
        severity: item.severity,
        category: item.category,
        read: false,
        created_at: now,
    }
}

/// Persist an alert for `item` if it qualifies, then emit `breaking-news`.
/// The event goes out only after the alert is stored.
pub async fn maybe_alert(
    store: &dyn Store,
    events: &dyn EventSink,
    item: &ClassifiedItem,
) -> StoreResult<Option<Alert>> {
    if !qualifies(item) {
        return Ok(None);
    }

    let alert = build_alert(item, Utc::now());
    store.insert_alert(alert.clone()).await?;
    counter!("alerts_created_total").increment(1);

    tracing::info!(
        target: "alerts",
        severity = ?item.severity,
        breaking = item.is_breaking,
        title = %item.title,
        "alert raised"
    );

    events.emit(MonitorEvent::BreakingNews {
        alert: alert.clone(),
        item: item.clone(),
    });
    Ok(Some(alert))
}
