//! # Per-Ledger Processing Engine
//!
//! Fans the transactions of one ledger out to a bounded rayon pool, one task
//! per transaction, then merges the per-transaction buffers in application
//! order.
//!
//! ```text
//! transactions: [tx1, tx2, tx3, ...]
//!                 │    │    │
//!      pool.scope ↓    ↓    ↓          each task writes only its own slot
//!   slots:      [b1] [b2] [b3] ...
//!                 └────┴────┴──→ merge in slot order (only if no task failed)
//! ```
//!
//! A ledger is all-or-nothing: when any transaction fails, every failure is
//! reported and the ledger buffer is left untouched.

use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::HashSet;
use tokio::sync::watch;
use tracing::{debug, error};

use crate::config::IngestConfig;
use crate::domain::{
    ContractChange, IndexerBuffer, IndexerError, NetworkId, ProcessorRegistry, TransactionView,
    TrustlineChange,
};

/// Engine switches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexerOptions {
    /// Drop result meta XDR before buffering.
    pub skip_tx_meta: bool,
    /// Drop envelope XDR before buffering.
    pub skip_tx_envelope: bool,
    /// When set, keep only transactions with a participant in this set.
    pub participant_filter: Option<HashSet<String>>,
}

/// Per-ledger transaction processor.
pub struct Indexer {
    registry: ProcessorRegistry,
    pool: ThreadPool,
    options: IndexerOptions,
}

impl Indexer {
    /// Engine with the standard processors and default options.
    pub fn new(network_id: NetworkId, worker_count: usize) -> Result<Self, IndexerError> {
        Self::with_registry(
            ProcessorRegistry::standard(network_id),
            worker_count,
            IndexerOptions::default(),
        )
    }

    /// Engine configured from an [`IngestConfig`].
    pub fn from_config(config: &IngestConfig) -> Result<Self, IndexerError> {
        Self::with_registry(
            ProcessorRegistry::standard(config.network_id()),
            config.worker_count,
            config.indexer_options(),
        )
    }

    /// Engine running `registry` on `worker_count` threads.
    pub fn with_registry(
        registry: ProcessorRegistry,
        worker_count: usize,
        options: IndexerOptions,
    ) -> Result<Self, IndexerError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(worker_count.max(1))
            .thread_name(|i| format!("indexer-worker-{i}"))
            .build()
            .map_err(|e| IndexerError::ThreadPool(e.to_string()))?;
        Ok(Self {
            registry,
            pool,
            options,
        })
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Engine options.
    pub fn options(&self) -> &IndexerOptions {
        &self.options
    }

    /// Process every transaction of one ledger and merge the results into
    /// `ledger_buffer`.
    ///
    /// Returns the number of distinct participants across the merged
    /// transactions. On failure `ledger_buffer` is not modified.
    pub fn process_ledger_transactions(
        &self,
        shutdown: &watch::Receiver<bool>,
        transactions: &[TransactionView],
        ledger_buffer: &mut IndexerBuffer,
    ) -> Result<usize, IndexerError> {
        let mut slots: Vec<Option<IndexerBuffer>> = transactions.iter().map(|_| None).collect();
        let failures = Mutex::new(Vec::new());

        self.pool.scope(|scope| {
            for (tx, slot) in transactions.iter().zip(slots.iter_mut()) {
                if *shutdown.borrow() {
                    failures
                        .lock()
                        .push(transaction_failure(tx, IndexerError::Cancelled));
                    continue;
                }
                let failures = &failures;
                scope.spawn(move |_| match self.process_transaction(tx) {
                    Ok(buffer) => *slot = Some(buffer),
                    Err(e) => failures.lock().push(transaction_failure(tx, e)),
                });
            }
        });

        let mut failures = failures.into_inner();
        if !failures.is_empty() {
            failures.sort_by_key(|e| e.transaction_index());
            error!(
                failed = failures.len(),
                total = transactions.len(),
                "Ledger transactions failed, discarding ledger"
            );
            return Err(IndexerError::Transactions(failures));
        }

        let mut participants = HashSet::new();
        for buffer in slots.into_iter().flatten() {
            participants.extend(buffer.all_participants());
            ledger_buffer.merge(buffer);
        }
        Ok(participants.len())
    }

    /// Build the buffer of a single transaction.
    pub fn process_transaction(&self, tx: &TransactionView) -> Result<IndexerBuffer, IndexerError> {
        let stored = tx.without_raw_xdr(self.options.skip_tx_meta, self.options.skip_tx_envelope);
        let mut buffer = IndexerBuffer::new();
        buffer.push_transaction(&tx.source_account, &stored);

        for op in tx.operation_views() {
            let record = op.to_record();
            buffer.push_operation(&record.source_account, &record, &stored);

            for change in self.registry.process(&op)? {
                if let Some(contract) = ContractChange::from_deployment(&change) {
                    buffer.push_contract_change(contract);
                }
                buffer.push_state_change(&stored, &record, change);
            }
            if let Some(trustline) = TrustlineChange::from_operation(&op) {
                buffer.push_trustline_change(trustline);
            }
        }

        if let Some(filter) = &self.options.participant_filter {
            let relevant = buffer
                .all_participants()
                .iter()
                .any(|participant| filter.contains(participant));
            if !relevant {
                debug!(
                    ledger = tx.ledger_sequence,
                    tx = tx.index,
                    "No registered participant, skipping transaction"
                );
                return Ok(IndexerBuffer::new());
            }
        }

        Ok(buffer)
    }
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer")
            .field("registry", &self.registry)
            .field("workers", &self.worker_count())
            .field("options", &self.options)
            .finish()
    }
}

fn transaction_failure(tx: &TransactionView, source: IndexerError) -> IndexerError {
    IndexerError::Transaction {
        ledger: tx.ledger_sequence,
        index: tx.index,
        source: Box::new(source),
    }
}
