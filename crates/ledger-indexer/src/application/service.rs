//! # Ingest Service
//!
//! The sequencer: advances through the ledger stream one sequence at a time,
//! retrying ledgers that are not available yet, running the engine on each
//! ledger and handing completed ledgers to the sink.
//!
//! ```text
//! prepare_range ─→ ┌─────────────────────────────────────────────┐
//!                  │ fetch(n) ──transient──→ warn, sleep, retry n │
//!                  │    │ ──fatal──────────→ Err(Fetch)           │
//!                  │    ↓                                         │
//!                  │ engine(n) ──error────→ Err(Processing)       │
//!                  │    ↓                                         │
//!                  │ sink.persist(n) ─────→ n += 1                │
//!                  └─────────────────────────────────────────────┘
//! ```
//!
//! Fetching and backoff both watch the shutdown signal.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{info, info_span, warn, Instrument};

use crate::application::indexer::Indexer;
use crate::config::IngestConfig;
use crate::domain::{IndexerBuffer, IndexerError, LedgerRecord};
use crate::error::IngestError;
use crate::ports::{IngestApi, LedgerRange, LedgerSink, LedgerSource};

/// Progress counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Ledgers persisted
    pub ledgers_processed: u64,
    /// Transactions merged
    pub transactions: u64,
    /// Operations merged
    pub operations: u64,
    /// State changes merged
    pub state_changes: u64,
    /// Sum of per-ledger distinct participant counts
    pub participants: u64,
    /// Fetch attempts that were retried
    pub retries: u64,
    /// Last ledger persisted
    pub last_ledger: Option<u32>,
}

/// Ingest Service - drives ledger-by-ledger ingestion.
pub struct IngestService<S: LedgerSource, K: LedgerSink> {
    /// Ledger backend.
    source: Arc<S>,
    /// Store for completed ledgers.
    sink: Arc<K>,
    /// Per-ledger engine.
    indexer: Arc<Indexer>,
    /// Pause between fetch attempts.
    retry_backoff: Duration,
    /// Shutdown signal; `true` stops the run.
    shutdown: watch::Receiver<bool>,
    /// Progress.
    stats: Mutex<IngestStats>,
}

impl<S: LedgerSource, K: LedgerSink> IngestService<S, K> {
    /// Create a service from its collaborators.
    pub fn new(
        source: Arc<S>,
        sink: Arc<K>,
        indexer: Indexer,
        retry_backoff: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            source,
            sink,
            indexer: Arc::new(indexer),
            retry_backoff,
            shutdown,
            stats: Mutex::new(IngestStats::default()),
        }
    }

    /// Validate `config` and build the engine it describes.
    pub fn from_config(
        config: &IngestConfig,
        source: Arc<S>,
        sink: Arc<K>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, IngestError> {
        config.validate()?;
        let indexer = Indexer::from_config(config).map_err(IngestError::Engine)?;
        info!(
            backend = %config.ledger_backend,
            workers = indexer.worker_count(),
            participant_filtering = config.enable_participant_filtering,
            "Ingest service configured"
        );
        Ok(Self::new(
            source,
            sink,
            indexer,
            config.retry_backoff(),
            shutdown,
        ))
    }

    /// Fetch `sequence`, retrying transient failures until it arrives.
    async fn fetch_ledger(
        &self,
        shutdown: &mut watch::Receiver<bool>,
        sequence: u32,
    ) -> Result<LedgerRecord, IngestError> {
        loop {
            let result = tokio::select! {
                biased;
                _ = wait_for_shutdown(shutdown) => return Err(IngestError::Cancelled),
                result = self.source.get_ledger(sequence) => result,
            };

            match result {
                Ok(ledger) => return Ok(ledger),
                Err(e) if e.is_transient() => {
                    warn!(
                        ledger = sequence,
                        error = %e,
                        backoff_ms = self.retry_backoff.as_millis() as u64,
                        "Ledger not available, retrying"
                    );
                    self.stats.lock().retries += 1;
                    tokio::select! {
                        biased;
                        _ = wait_for_shutdown(shutdown) => return Err(IngestError::Cancelled),
                        _ = tokio::time::sleep(self.retry_backoff) => {}
                    }
                }
                Err(source) => {
                    return Err(IngestError::Fetch {
                        ledger: sequence,
                        source,
                    })
                }
            }
        }
    }

    /// Run the engine on one ledger and persist the result.
    async fn ingest_ledger(
        &self,
        shutdown: &watch::Receiver<bool>,
        ledger: LedgerRecord,
    ) -> Result<(), IngestError> {
        let started = Instant::now();
        let sequence = ledger.sequence;
        let indexer = Arc::clone(&self.indexer);
        let engine_shutdown = shutdown.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            let mut buffer = IndexerBuffer::new();
            indexer
                .process_ledger_transactions(&engine_shutdown, &ledger.transactions, &mut buffer)
                .map(|participants| (buffer, participants))
        })
        .await
        .map_err(|e| IngestError::Processing {
            ledger: sequence,
            source: IndexerError::WorkerFailed(e.to_string()),
        })?;

        let (buffer, participants) = match outcome {
            Ok(merged) => merged,
            Err(_) if *shutdown.borrow() => return Err(IngestError::Cancelled),
            Err(source) => {
                return Err(IngestError::Processing {
                    ledger: sequence,
                    source,
                })
            }
        };

        let transactions = buffer.transaction_count() as u64;
        let operations = buffer.operation_count() as u64;
        let state_changes = buffer.state_changes().len() as u64;

        self.sink
            .persist_ledger(sequence, buffer)
            .await
            .map_err(|source| IngestError::Persist {
                ledger: sequence,
                source,
            })?;

        {
            let mut stats = self.stats.lock();
            stats.ledgers_processed += 1;
            stats.transactions += transactions;
            stats.operations += operations;
            stats.state_changes += state_changes;
            stats.participants += participants as u64;
            stats.last_ledger = Some(sequence);
        }

        info!(
            transactions,
            operations,
            state_changes,
            participants,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ledger ingested"
        );
        Ok(())
    }
}

#[async_trait]
impl<S: LedgerSource + 'static, K: LedgerSink + 'static> IngestApi for IngestService<S, K> {
    async fn run(&self, start: u32, end: u32) -> Result<(), IngestError> {
        if end != 0 && end <= start {
            return Err(IngestError::InvalidRange { start, end });
        }

        let range = LedgerRange::for_run(start, end);
        self.source
            .prepare_range(range)
            .await
            .map_err(|source| IngestError::PrepareRange { range, source })?;
        info!(%range, "Prepared ledger backend range");

        let mut shutdown = self.shutdown.clone();
        let mut current = start;
        while end == 0 || current < end {
            let ledger = self.fetch_ledger(&mut shutdown, current).await?;
            self.ingest_ledger(&shutdown, ledger)
                .instrument(info_span!("ingest_ledger", ledger = current))
                .await?;
            let Some(next) = current.checked_add(1) else {
                info!(ledger = current, "Reached last representable ledger");
                break;
            };
            current = next;
        }

        info!(start, end, "Ledger range ingested");
        Ok(())
    }

    fn stats(&self) -> IngestStats {
        self.stats.lock().clone()
    }
}

/// Resolves once shutdown is requested. Never resolves if the sender is
/// dropped without requesting it.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
