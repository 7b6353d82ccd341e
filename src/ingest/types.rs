// src/ingest/types.rs
use anyhow::Result;

use crate::model::RawItem;

/// One source of raw items. Implementations may fail independently; the
/// orchestrator turns a failure into an empty contribution.
#[async_trait::async_trait]
pub trait SourceCollector: Send + Sync {
    async fn fetch(&self) -> Result<Vec<RawItem>>;
    fn name(&self) -> &str;
}
