//! # Cycle controller
//! One monitoring cycle = collect -> dedup -> classify -> persist -> alert.
//!
//! State machine `Idle -> Running -> Idle`. The `Running` flag is taken with
//! a compare-exchange before the first collector call and released by a drop
//! guard after the last item, so it also clears on panic. A trigger while
//! running is a logged no-op, never queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use metrics::{counter, describe_counter, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::alerts;
use crate::analyze::Classifier;
use crate::ingest::{dedup, CollectorSet};
use crate::model::RawItem;
use crate::notify::{EventSink, MonitorEvent};
use crate::store::{Store, StoreError};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("monitor_cycles_total", "Completed monitoring cycles.");
        describe_counter!(
            "monitor_cycles_skipped_total",
            "Triggers rejected because a cycle was already running."
        );
        describe_counter!("monitor_items_persisted_total", "Classified items stored.");
        describe_counter!(
            "monitor_items_duplicate_total",
            "Inserts rejected by source URL uniqueness."
        );
        describe_counter!("monitor_items_failed_total", "Items skipped after an error.");
        describe_counter!("classify_ai_fallback_total", "Items classified by rules only.");
        describe_counter!("classify_translations_total", "Item contents translated.");
        describe_counter!("alerts_created_total", "Alerts persisted.");
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    /// Raw items returned by all collectors.
    pub collected: usize,
    /// Raw items left after deduplication against the store.
    pub fresh: usize,
    pub persisted: usize,
    /// Inserts rejected as duplicates (same URL twice in one batch).
    pub duplicates: usize,
    pub failed: usize,
    pub alerts: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Skipped,
    Completed(CycleStats),
}

enum ItemOutcome {
    Persisted { alerted: bool },
    Duplicate,
    Failed,
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Monitor {
    collectors: CollectorSet,
    classifier: Classifier,
    store: Arc<dyn Store>,
    events: Arc<dyn EventSink>,
    item_concurrency: usize,
    running: AtomicBool,
}

impl Monitor {
    pub fn new(
        collectors: CollectorSet,
        classifier: Classifier,
        store: Arc<dyn Store>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            collectors,
            classifier,
            store,
            events,
            item_concurrency: 1,
            running: AtomicBool::new(false),
        }
    }

    pub fn with_item_concurrency(mut self, n: usize) -> Self {
        self.item_concurrency = n.max(1);
        self
    }

    pub fn state(&self) -> CycleState {
        if self.running.load(Ordering::Acquire) {
            CycleState::Running
        } else {
            CycleState::Idle
        }
    }

    /// Run one cycle unless one is already in flight.
    pub async fn start(&self) -> CycleOutcome {
        ensure_metrics_described();

        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!(target: "monitor", "monitoring cycle already running, skipping");
            counter!("monitor_cycles_skipped_total").increment(1);
            return CycleOutcome::Skipped;
        }
        let _guard = RunningGuard(&self.running);

        let started = Utc::now();
        info!(target: "monitor", collectors = self.collectors.len(), "starting monitoring cycle");
        self.events.emit(MonitorEvent::CycleStarted { at: started });

        let raw = self.collectors.run().await;
        let mut stats = CycleStats {
            collected: raw.len(),
            ..Default::default()
        };

        let fresh = dedup::filter_new(self.store.as_ref(), raw).await;
        stats.fresh = fresh.len();
        info!(target: "monitor", collected = stats.collected, fresh = stats.fresh, "collected items, processing");

        let outcomes: Vec<ItemOutcome> = stream::iter(fresh)
            .map(|raw| self.process_item(raw))
            .buffer_unordered(self.item_concurrency)
            .collect()
            .await;

        for o in outcomes {
            match o {
                ItemOutcome::Persisted { alerted } => {
                    stats.persisted += 1;
                    if alerted {
                        stats.alerts += 1;
                    }
                }
                ItemOutcome::Duplicate => stats.duplicates += 1,
                ItemOutcome::Failed => stats.failed += 1,
            }
        }

        counter!("monitor_cycles_total").increment(1);
        counter!("monitor_items_persisted_total").increment(stats.persisted as u64);
        counter!("monitor_items_duplicate_total").increment(stats.duplicates as u64);
        counter!("monitor_items_failed_total").increment(stats.failed as u64);
        let finished = Utc::now();
        gauge!("monitor_last_cycle_ts").set(finished.timestamp() as f64);

        info!(
            target: "monitor",
            persisted = stats.persisted,
            duplicates = stats.duplicates,
            failed = stats.failed,
            alerts = stats.alerts,
            elapsed_ms = (finished - started).num_milliseconds(),
            "monitoring cycle completed"
        );
        self.events.emit(MonitorEvent::CycleFinished {
            at: finished,
            stats: stats.clone(),
        });

        CycleOutcome::Completed(stats)
    }

    async fn process_item(&self, raw: RawItem) -> ItemOutcome {
        let item = self.classifier.classify(raw, Utc::now()).await;

        match self.store.insert_item(item.clone()).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(url)) => {
                debug!(target: "monitor", url = %url, "already processed, skipping");
                return ItemOutcome::Duplicate;
            }
            Err(e) => {
                warn!(target: "monitor", error = %e, url = %item.source_url, "item processing failed");
                return ItemOutcome::Failed;
            }
        }

        debug!(
            target: "monitor",
            severity = ?item.severity,
            breaking = item.is_breaking,
            title = %item.title.chars().take(50).collect::<String>(),
            "processed"
        );

        match alerts::maybe_alert(self.store.as_ref(), self.events.as_ref(), &item).await {
            Ok(alert) => ItemOutcome::Persisted {
                alerted: alert.is_some(),
            },
            Err(e) => {
                warn!(target: "monitor", error = %e, url = %item.source_url, "alert persistence failed");
                ItemOutcome::Persisted { alerted: false }
            }
        }
    }
}
