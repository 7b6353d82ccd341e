// tests/monitor_cycle.rs
//
// End-to-end monitoring cycles against the in-memory store with scripted
// collectors and the deterministic mock AI.
//
// Covered:
// - collector failure isolation
// - dedup across repeated cycles and within one batch
// - keyword escalation, breaking detection, alert correspondence
// - one alert per item across repeated cycles
// - AI failure fallback
// - overlapping triggers are skipped, not queued
// - lifecycle event order

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::Notify;

use common::*;
use situation_monitor::ai_adapter::{AiAnalysis, MockAi};
use situation_monitor::ingest::types::SourceCollector;
use situation_monitor::model::{Category, Severity};
use situation_monitor::monitor::CycleState;
use situation_monitor::store::Store;
use situation_monitor::{CycleOutcome, MonitorEvent};

fn completed(outcome: CycleOutcome) -> situation_monitor::CycleStats {
    match outcome {
        CycleOutcome::Completed(stats) => stats,
        CycleOutcome::Skipped => panic!("cycle unexpectedly skipped"),
    }
}

const QUIET: &str = "Vendors set up their stalls as usual this morning.";

#[tokio::test]
async fn failing_collector_does_not_block_the_others() {
    let collectors: Vec<Box<dyn SourceCollector>> = vec![
        Box::new(StaticCollector::new(
            "a",
            vec![
                raw("https://a.test/1", "Market opens", QUIET),
                raw("https://a.test/2", "Market closes", QUIET),
            ],
        )),
        Box::new(FailingCollector),
        Box::new(StaticCollector::new(
            "c",
            vec![raw("https://c.test/1", "Bus route changes", QUIET)],
        )),
    ];
    let h = harness(collectors, MockAi::default());

    let stats = completed(h.monitor.start().await);
    assert_eq!(stats.collected, 3);
    assert_eq!(stats.persisted, 3);
    assert_eq!(stats.failed, 0);
    assert_eq!(h.store.item_count(), 3);
    assert!(h.store.find_by_url("https://c.test/1").await.unwrap().is_some());
}

#[tokio::test]
async fn repeated_cycles_do_not_duplicate_items() {
    let src = StaticCollector::new(
        "a",
        vec![
            raw("https://a.test/1", "Market opens", QUIET),
            raw("https://a.test/2", "Market closes", QUIET),
        ],
    );
    let calls = src.calls.clone();
    let h = harness(vec![Box::new(src)], MockAi::default());

    let first = completed(h.monitor.start().await);
    assert_eq!(first.persisted, 2);

    let second = completed(h.monitor.start().await);
    assert_eq!(second.collected, 2);
    assert_eq!(second.fresh, 0);
    assert_eq!(second.persisted, 0);

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.store.item_count(), 2);
}

#[tokio::test]
async fn same_url_from_two_collectors_is_stored_once() {
    let collectors: Vec<Box<dyn SourceCollector>> = vec![
        Box::new(StaticCollector::new(
            "a",
            vec![
                raw("https://x.test/u1", "First story", QUIET),
                raw("https://x.test/u2", "Second story", QUIET),
            ],
        )),
        Box::new(StaticCollector::new(
            "b",
            vec![raw("https://x.test/u1", "First story (mirror)", QUIET)],
        )),
    ];
    let h = harness(collectors, MockAi::default());

    let stats = completed(h.monitor.start().await);
    assert_eq!(stats.collected, 3);
    assert_eq!(stats.persisted, 2);
    assert_eq!(stats.persisted + stats.duplicates + stats.failed, stats.fresh);
    assert_eq!(h.store.item_count(), 2);
}

#[tokio::test]
async fn state_of_emergency_headline_is_critical_breaking_and_alerted() {
    let h = harness(
        vec![Box::new(StaticCollector::new(
            "wire",
            vec![raw(
                "https://wire.test/soe",
                "BREAKING: Maduro announces state of emergency",
                "Caracas: the government has suspended several constitutional guarantees.",
            )],
        ))],
        MockAi::default(),
    );
    let mut rx = h.events.subscribe();

    let stats = completed(h.monitor.start().await);
    assert_eq!(stats.persisted, 1);
    assert_eq!(stats.alerts, 1);

    let item = h
        .store
        .find_by_url("https://wire.test/soe")
        .await
        .unwrap()
        .expect("item stored");
    assert_eq!(item.severity, Severity::Critical);
    assert!(item.is_breaking);

    let alerts = h.store.recent_alerts(10).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].news_item_id, item.id);
    assert_eq!(alerts[0].severity, Severity::Critical);
    assert!(!alerts[0].read);

    let mut names = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        if let MonitorEvent::BreakingNews { alert, .. } = &ev {
            assert_eq!(alert.id, alerts[0].id);
        }
        names.push(ev.name());
    }
    assert_eq!(names, vec!["cycle-started", "breaking-news", "cycle-finished"]);
}

#[tokio::test]
async fn rerunning_a_cycle_over_a_breaking_item_alerts_once() {
    let h = harness(
        vec![Box::new(StaticCollector::new(
            "wire",
            vec![raw(
                "https://wire.test/blackout",
                "BREAKING: nationwide power outage hits Caracas",
                "Metro service halted as the grid failed across several states.",
            )],
        ))],
        MockAi::default(),
    );
    let mut rx = h.events.subscribe();

    let first = completed(h.monitor.start().await);
    assert_eq!(first.alerts, 1);
    let second = completed(h.monitor.start().await);
    assert_eq!(second.fresh, 0);
    assert_eq!(second.alerts, 0);

    assert_eq!(h.store.item_count(), 1);
    assert_eq!(h.store.alert_count(), 1);

    let mut breaking = 0;
    while let Ok(ev) = rx.try_recv() {
        if ev.name() == "breaking-news" {
            breaking += 1;
        }
    }
    assert_eq!(breaking, 1);
}

#[tokio::test]
async fn keyword_tiers_never_lower_ai_severity() {
    let ai = MockAi::new(AiAnalysis {
        severity: Some(Severity::Critical),
        category: Some(Category::Economic),
        ..Default::default()
    });
    let h = harness(
        vec![Box::new(StaticCollector::new(
            "a",
            vec![raw("https://a.test/inflation", "Inflation figures published", QUIET)],
        ))],
        ai,
    );
    completed(h.monitor.start().await);

    let item = h.store.find_by_url("https://a.test/inflation").await.unwrap().unwrap();
    assert_eq!(item.severity, Severity::Critical);
    assert_eq!(item.category, Category::Economic);
    assert!(item.is_breaking, "HIGH and above is breaking");
}

#[tokio::test]
async fn only_qualifying_items_get_alerts() {
    let h = harness(
        vec![Box::new(StaticCollector::new(
            "a",
            vec![
                raw("https://a.test/low", "Market opens", QUIET),
                raw("https://a.test/med", "Opposition plans protest", QUIET),
                raw("https://a.test/high", "Nationwide power outage", QUIET),
            ],
        ))],
        MockAi::default(),
    );
    let stats = completed(h.monitor.start().await);
    assert_eq!(stats.persisted, 3);
    assert_eq!(stats.alerts, 2);

    let low = h.store.find_by_url("https://a.test/low").await.unwrap().unwrap();
    assert_eq!(low.severity, Severity::Low);
    assert!(!low.is_breaking);

    let alerts = h.store.recent_alerts(10).await.unwrap();
    assert_eq!(alerts.len(), 2);
    assert!(alerts.iter().all(|a| a.news_item_id != low.id));
}

#[tokio::test]
async fn ai_outage_falls_back_to_rules() {
    let long = "Thousands gathered downtown. ".repeat(20);
    let h = harness(
        vec![Box::new(StaticCollector::new(
            "a",
            vec![raw("https://a.test/riot", "Riot reported near the capitol", &long)],
        ))],
        MockAi::failing(),
    );
    let stats = completed(h.monitor.start().await);
    assert_eq!(stats.persisted, 1);

    let item = h.store.find_by_url("https://a.test/riot").await.unwrap().unwrap();
    assert_eq!(item.severity, Severity::High);
    assert_eq!(item.category, Category::Other);
    assert!(item.is_breaking);
    assert_eq!(item.summary.chars().count(), 203);
    assert!(item.summary.ends_with("..."));
    assert_eq!(item.content, long);
}

#[tokio::test]
async fn spanish_content_is_translated() {
    let h = harness(
        vec![Box::new(StaticCollector::new(
            "a",
            vec![raw(
                "https://a.test/es",
                "Nuevo horario del metro",
                "El metro de Caracas cambia su horario para los fines de semana.",
            )],
        ))],
        MockAi::default(),
    );
    completed(h.monitor.start().await);
    let item = h.store.find_by_url("https://a.test/es").await.unwrap().unwrap();
    assert!(item.content.starts_with("[EN] "));
}

#[tokio::test]
async fn trigger_during_running_cycle_is_skipped() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let blocking = BlockingCollector {
        entered: entered.clone(),
        release: release.clone(),
        items: vec![raw("https://a.test/slow", "Market opens", QUIET)],
    };
    let h = harness(vec![Box::new(blocking)], MockAi::default());

    let m = h.monitor.clone();
    let first = tokio::spawn(async move { m.start().await });

    entered.notified().await;
    assert_eq!(h.monitor.state(), CycleState::Running);
    assert_eq!(h.monitor.start().await, CycleOutcome::Skipped);

    release.notify_one();
    let stats = completed(first.await.unwrap());
    assert_eq!(stats.persisted, 1);
    assert_eq!(h.monitor.state(), CycleState::Idle);

    // The flag is released: the next trigger runs again.
    release.notify_one();
    assert!(matches!(h.monitor.start().await, CycleOutcome::Completed(_)));
}
