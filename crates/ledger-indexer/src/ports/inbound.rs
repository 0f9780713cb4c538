//! # Inbound Ports
//!
//! API trait defining what the ingestion service can do.

use async_trait::async_trait;

use crate::application::IngestStats;
use crate::error::IngestError;

/// Ingestion API - inbound port.
#[async_trait]
pub trait IngestApi: Send + Sync {
    /// Ingest ledgers `start..end` in order, or tail forever from `start`
    /// when `end` is 0.
    ///
    /// Returns `Ok(())` once every ledger below a bounded `end` is persisted.
    async fn run(&self, start: u32, end: u32) -> Result<(), IngestError>;

    /// Progress counters of the current or last run.
    fn stats(&self) -> IngestStats;
}
