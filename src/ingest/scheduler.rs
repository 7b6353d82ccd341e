// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};
use metrics::counter;
use tokio::task::JoinHandle;

use crate::monitor::{CycleOutcome, Monitor};
use crate::notify::{EventSink, MonitorEvent};
use crate::report::ReportSynthesizer;

/// Periodic monitoring cycles. The first tick fires immediately so the store
/// fills at boot. Overlapping ticks are rejected by the monitor itself.
pub fn spawn_monitor_scheduler(monitor: Arc<Monitor>, interval_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let m = monitor.clone();
            // Own task: a slow cycle must not hold up the ticker.
            tokio::spawn(async move {
                if let CycleOutcome::Completed(stats) = m.start().await {
                    tracing::debug!(target: "scheduler", ?stats, "scheduled cycle done");
                }
            });
        }
    })
}

/// Time until the next `hour_utc:00:00` strictly after `now`.
pub fn until_next_run(now: DateTime<Utc>, hour_utc: u32) -> Duration {
    let at = NaiveTime::from_hms_opt(hour_utc.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let mut next = now.date_naive().and_time(at).and_utc();
    if next <= now {
        next += chrono::Duration::days(1);
    }
    (next - now).to_std().unwrap_or_default()
}

/// Generates the report for the current UTC day once a day at `hour_utc`
/// and emits `daily-report` when one was written.
pub fn spawn_daily_report_task(
    reports: Arc<ReportSynthesizer>,
    events: Arc<dyn EventSink>,
    hour_utc: u32,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let wait = until_next_run(Utc::now(), hour_utc);
            tracing::info!(target: "scheduler", wait_secs = wait.as_secs(), "next daily report scheduled");
            tokio::time::sleep(wait).await;

            let today = Utc::now().date_naive();
            match reports.generate(today).await {
                Ok(Some(report)) => {
                    counter!("scheduler_reports_total").increment(1);
                    events.emit(MonitorEvent::DailyReport { report });
                }
                Ok(None) => tracing::info!(target: "scheduler", %today, "no items; daily report skipped"),
                Err(e) => tracing::warn!(target: "scheduler", error = %e, %today, "daily report failed"),
            }
        }
    })
}
