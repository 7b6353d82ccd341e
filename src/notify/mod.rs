//! Typed events produced by the core. Delivery (websockets, webhooks, ...)
//! belongs to whoever subscribes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::model::{Alert, ClassifiedItem, DailyReport};
use crate::monitor::CycleStats;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum MonitorEvent {
    CycleStarted { at: DateTime<Utc> },
    CycleFinished { at: DateTime<Utc>, stats: CycleStats },
    BreakingNews { alert: Alert, item: ClassifiedItem },
    DailyReport { report: DailyReport },
}

impl MonitorEvent {
    pub fn name(&self) -> &'static str {
        match self {
            MonitorEvent::CycleStarted { .. } => "cycle-started",
            MonitorEvent::CycleFinished { .. } => "cycle-finished",
            MonitorEvent::BreakingNews { .. } => "breaking-news",
            MonitorEvent::DailyReport { .. } => "daily-report",
        }
    }
}

/// Fire-and-forget sink; no acknowledgement.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: MonitorEvent);
}

/// Broadcast fan-out to any number of subscribers. Events emitted while
/// nobody listens are dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MonitorEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: MonitorEvent) {
        let name = event.name();
        if self.tx.send(event).is_err() {
            tracing::trace!(event = name, "no subscribers");
        }
    }
}

/// Discards everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: MonitorEvent) {}
}
