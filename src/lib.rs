// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod ai_bootstrap;
pub mod alerts;
pub mod analyze;
pub mod api;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod monitor;
pub mod notify;
pub mod report;
pub mod store;

use std::sync::Arc;

use shuttle_axum::axum::Router;

// ---- Re-exports for stable public API ----
pub use analyze::ai_adapter;
pub use crate::api::router;
pub use crate::monitor::{CycleOutcome, CycleStats, Monitor};
pub use crate::notify::{EventBus, EventSink, MonitorEvent};
pub use crate::report::{ReportError, ReportSynthesizer};

use crate::analyze::{Classifier, DynAi, HotReloadTiers};
use crate::config::MonitorConfig;
use crate::store::{MemoryStore, Store};

/// Fully wired pipeline: store, AI, classifier, monitor, reports, events.
pub struct App {
    pub config: MonitorConfig,
    pub store: Arc<dyn Store>,
    pub events: Arc<EventBus>,
    pub monitor: Arc<Monitor>,
    pub reports: Arc<ReportSynthesizer>,
}

impl App {
    /// Build every component from config. Fails only when a configured
    /// collector cannot be constructed.
    pub fn build(config: MonitorConfig, ai: DynAi) -> anyhow::Result<Self> {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let events = Arc::new(EventBus::default());

        let collectors = ingest::config::build_collectors(&config.effective_collectors())?;
        tracing::info!(collectors = collectors.len(), topic = %config.topic, "collectors ready");

        let tiers = HotReloadTiers::new(Some(config.severity_tiers_path.as_path()));
        let classifier = Classifier::new(ai.clone(), tiers);

        let monitor = Arc::new(
            Monitor::new(collectors, classifier, store.clone(), events.clone())
                .with_item_concurrency(config.item_concurrency),
        );
        let reports = Arc::new(ReportSynthesizer::new(store.clone(), ai, config.topic.clone()));

        Ok(Self {
            config,
            store,
            events,
            monitor,
            reports,
        })
    }

    pub fn router(&self) -> Router {
        api::router(api::AppState {
            monitor: self.monitor.clone(),
            reports: self.reports.clone(),
            store: self.store.clone(),
        })
    }

    /// Spawn the cycle scheduler and the daily report task.
    pub fn spawn_background(&self) {
        ingest::scheduler::spawn_monitor_scheduler(
            self.monitor.clone(),
            self.config.cycle_interval_secs,
        );
        ingest::scheduler::spawn_daily_report_task(
            self.reports.clone(),
            self.events.clone(),
            self.config.report_hour_utc,
        );
    }
}

