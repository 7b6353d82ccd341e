// tests/common/mod.rs
//
// Shared fixtures: scripted collectors and a monitor wired to a MemoryStore.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use situation_monitor::ai_adapter::{DynAi, MockAi};
use situation_monitor::analyze::{Classifier, KeywordTiers};
use situation_monitor::ingest::types::SourceCollector;
use situation_monitor::ingest::CollectorSet;
use situation_monitor::model::{Platform, RawItem};
use situation_monitor::notify::{EventBus, EventSink};
use situation_monitor::store::{MemoryStore, Store};
use situation_monitor::Monitor;

pub fn raw(url: &str, title: &str, content: &str) -> RawItem {
    raw_at(url, title, content, Utc::now())
}

pub fn raw_at(url: &str, title: &str, content: &str, published_at: DateTime<Utc>) -> RawItem {
    RawItem {
        title: title.to_string(),
        content: content.to_string(),
        source_url: url.to_string(),
        source_name: "Test Wire".to_string(),
        published_at,
        platform: Platform::News,
        image_url: None,
    }
}

/// Returns the same batch on every fetch and counts calls.
pub struct StaticCollector {
    pub name: String,
    pub items: Vec<RawItem>,
    pub calls: Arc<AtomicUsize>,
}

impl StaticCollector {
    pub fn new(name: &str, items: Vec<RawItem>) -> Self {
        Self {
            name: name.to_string(),
            items,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl SourceCollector for StaticCollector {
    async fn fetch(&self) -> anyhow::Result<Vec<RawItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.items.clone())
    }
    fn name(&self) -> &str {
        &self.name
    }
}

pub struct FailingCollector;

#[async_trait]
impl SourceCollector for FailingCollector {
    async fn fetch(&self) -> anyhow::Result<Vec<RawItem>> {
        anyhow::bail!("upstream unavailable")
    }
    fn name(&self) -> &str {
        "failing"
    }
}

/// Signals `entered`, then parks until `release` is notified.
pub struct BlockingCollector {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
    pub items: Vec<RawItem>,
}

#[async_trait]
impl SourceCollector for BlockingCollector {
    async fn fetch(&self) -> anyhow::Result<Vec<RawItem>> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(self.items.clone())
    }
    fn name(&self) -> &str {
        "blocking"
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub events: Arc<EventBus>,
    pub monitor: Arc<Monitor>,
}

pub fn harness(collectors: Vec<Box<dyn SourceCollector>>, ai: MockAi) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let events = Arc::new(EventBus::new(64));
    let ai: DynAi = Arc::new(ai);
    let classifier = Classifier::with_tiers(ai, KeywordTiers::default());
    let store_dyn: Arc<dyn Store> = store.clone();
    let events_dyn: Arc<dyn EventSink> = events.clone();
    let monitor = Arc::new(
        Monitor::new(CollectorSet::new(collectors), classifier, store_dyn, events_dyn)
            .with_item_concurrency(4),
    );
    Harness {
        store,
        events,
        monitor,
    }
}
