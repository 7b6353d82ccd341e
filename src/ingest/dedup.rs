// src/ingest/dedup.rs
use metrics::counter;

use crate::model::RawItem;
use crate::store::Store;

/// Drop raw items whose `source_url` already exists in the store.
///
/// Point-in-time lookup per item, not a batch-wide set: two items sharing a
/// URL within one batch both pass, and the store's uniqueness constraint
/// rejects the second insert later. Relative order is preserved.
pub async fn filter_new(store: &dyn Store, items: Vec<RawItem>) -> Vec<RawItem> {
    let mut keep = Vec::with_capacity(items.len());
    let mut dropped = 0u64;

    for it in items {
        match store.find_by_url(&it.source_url).await {
            Ok(Some(_)) => dropped += 1,
            Ok(None) => keep.push(it),
            Err(e) => {
                // The insert constraint still guards uniqueness downstream.
                tracing::warn!(target: "ingest", error = %e, url = %it.source_url, "dedup lookup failed; keeping item");
                keep.push(it);
            }
        }
    }

    counter!("ingest_dedup_dropped_total").increment(dropped);
    keep
}
