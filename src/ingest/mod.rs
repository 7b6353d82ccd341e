// src/ingest/mod.rs
pub mod config;
pub mod dedup;
pub mod providers;
pub mod scheduler;
pub mod types;

use crate::ingest::types::SourceCollector;
use crate::model::RawItem;
use futures::future::join_all;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_items_total", "Raw items returned by collectors.");
        describe_counter!(
            "ingest_collector_errors_total",
            "Collector fetch failures (isolated, zero contribution)."
        );
        describe_counter!(
            "ingest_feed_errors_total",
            "Single-feed failures inside a multi-feed collector."
        );
        describe_counter!(
            "ingest_dedup_dropped_total",
            "Raw items dropped because their source URL is already stored."
        );
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!(
            "monitor_last_cycle_ts",
            "Unix ts when the monitoring cycle last completed."
        );
    });
}

/// Strip markup from feed text: decode entities, drop tags, collapse whitespace.
pub fn strip_html(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    let out = re_tags.replace_all(&decoded, "");

    // Non-breaking spaces survive entity decoding as U+00A0.
    let out = out.replace('\u{00A0}', " ");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// The registered collectors, invoked together once per cycle.
#[derive(Default)]
pub struct CollectorSet {
    collectors: Vec<Box<dyn SourceCollector>>,
}

impl CollectorSet {
    pub fn new(collectors: Vec<Box<dyn SourceCollector>>) -> Self {
        Self { collectors }
    }

    pub fn register(&mut self, collector: Box<dyn SourceCollector>) {
        self.collectors.push(collector);
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Fetch from every collector concurrently and join before returning.
    ///
    /// Output is concatenated in registration order; a failing collector is
    /// logged and contributes nothing. Never fails.
    pub async fn run(&self) -> Vec<RawItem> {
        ensure_metrics_described();

        let results = join_all(self.collectors.iter().map(|c| c.fetch())).await;

        let mut out = Vec::new();
        for (collector, res) in self.collectors.iter().zip(results) {
            match res {
                Ok(mut items) => {
                    tracing::debug!(target: "ingest", collector = collector.name(), items = items.len(), "collector fetched");
                    counter!("ingest_items_total").increment(items.len() as u64);
                    out.append(&mut items);
                }
                Err(e) => {
                    tracing::warn!(target: "ingest", error = ?e, collector = collector.name(), "collector error");
                    counter!("ingest_collector_errors_total").increment(1);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_html_removes_tags_and_entities() {
        let s = "  <b>Hello</b>&nbsp;&nbsp; <a href=\"x\">world</a> &amp; more  ";
        assert_eq!(strip_html(s), "Hello world & more");
    }

    #[test]
    fn strip_html_handles_escaped_markup() {
        let s = "&lt;p&gt;Caracas &quot;calm&quot;&lt;/p&gt;";
        assert_eq!(strip_html(s), "Caracas \"calm\"");
    }

    #[tokio::test]
    async fn empty_set_yields_nothing() {
        let set = CollectorSet::default();
        assert!(set.is_empty());
        assert!(set.run().await.is_empty());
    }
}
