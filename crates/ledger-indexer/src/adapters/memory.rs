//! In-Memory Adapters
//!
//! `LedgerSource` and `LedgerSink` backed by process memory, with scripted
//! failures. Used by tests and for replaying captured ledgers.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::domain::{IndexerBuffer, LedgerRecord};
use crate::ports::outbound::{
    LedgerRange, LedgerSink, LedgerSource, LedgerSourceError, SinkError,
};

#[derive(Default)]
struct SourceState {
    ledgers: BTreeMap<u32, LedgerRecord>,
    transient_failures: HashMap<u32, usize>,
    fatal_failures: HashMap<u32, String>,
    prepare_failure: Option<String>,
    prepared: Option<LedgerRange>,
    fetch_log: Vec<u32>,
}

/// Ledger source serving ledgers from memory.
///
/// Sequences with no stored ledger answer `NotYetAvailable`.
#[derive(Default)]
pub struct InMemoryLedgerSource {
    state: Mutex<SourceState>,
}

impl InMemoryLedgerSource {
    /// Empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Source holding `ledgers`.
    pub fn with_ledgers(ledgers: impl IntoIterator<Item = LedgerRecord>) -> Self {
        let source = Self::new();
        for ledger in ledgers {
            source.insert_ledger(ledger);
        }
        source
    }

    /// Store or replace a ledger.
    pub fn insert_ledger(&self, ledger: LedgerRecord) {
        self.state.lock().ledgers.insert(ledger.sequence, ledger);
    }

    /// Answer the next `times` fetches of `sequence` with `Unavailable`.
    pub fn fail_transiently(&self, sequence: u32, times: usize) {
        self.state.lock().transient_failures.insert(sequence, times);
    }

    /// Answer every fetch of `sequence` with `Fatal`.
    pub fn fail_fatally(&self, sequence: u32, message: impl Into<String>) {
        self.state
            .lock()
            .fatal_failures
            .insert(sequence, message.into());
    }

    /// Reject `prepare_range`.
    pub fn fail_prepare(&self, message: impl Into<String>) {
        self.state.lock().prepare_failure = Some(message.into());
    }

    /// Every fetched sequence, in call order.
    pub fn fetch_log(&self) -> Vec<u32> {
        self.state.lock().fetch_log.clone()
    }

    /// Number of fetches of `sequence`.
    pub fn fetch_count(&self, sequence: u32) -> usize {
        self.state
            .lock()
            .fetch_log
            .iter()
            .filter(|s| **s == sequence)
            .count()
    }

    /// Range passed to the last successful `prepare_range`.
    pub fn prepared_range(&self) -> Option<LedgerRange> {
        self.state.lock().prepared
    }
}

#[async_trait]
impl LedgerSource for InMemoryLedgerSource {
    async fn prepare_range(&self, range: LedgerRange) -> Result<(), LedgerSourceError> {
        let mut state = self.state.lock();
        if let Some(message) = &state.prepare_failure {
            return Err(LedgerSourceError::Fatal(message.clone()));
        }
        state.prepared = Some(range);
        Ok(())
    }

    async fn get_ledger(&self, sequence: u32) -> Result<LedgerRecord, LedgerSourceError> {
        let mut state = self.state.lock();
        state.fetch_log.push(sequence);

        if let Some(message) = state.fatal_failures.get(&sequence) {
            return Err(LedgerSourceError::Fatal(message.clone()));
        }
        if let Some(remaining) = state.transient_failures.get_mut(&sequence) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(LedgerSourceError::Unavailable(format!(
                    "scripted failure for ledger {sequence}"
                )));
            }
        }
        state
            .ledgers
            .get(&sequence)
            .cloned()
            .ok_or(LedgerSourceError::NotYetAvailable { sequence })
    }
}

#[derive(Default)]
struct SinkState {
    ledgers: BTreeMap<u32, IndexerBuffer>,
    order: Vec<u32>,
    calls: usize,
    failing: Option<u32>,
}

/// Sink keeping persisted ledgers in memory, keyed by sequence.
///
/// Persisting a sequence again replaces the stored buffer.
#[derive(Default)]
pub struct InMemoryLedgerSink {
    state: Mutex<SinkState>,
}

impl InMemoryLedgerSink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes of `sequence`.
    pub fn fail_at(&self, sequence: u32) {
        self.state.lock().failing = Some(sequence);
    }

    /// Stored buffer of `sequence`.
    pub fn ledger(&self, sequence: u32) -> Option<IndexerBuffer> {
        self.state.lock().ledgers.get(&sequence).cloned()
    }

    /// Stored sequences, ascending.
    pub fn sequences(&self) -> Vec<u32> {
        self.state.lock().ledgers.keys().copied().collect()
    }

    /// Sequences in the order they were persisted.
    pub fn persist_order(&self) -> Vec<u32> {
        self.state.lock().order.clone()
    }

    /// Number of successful `persist_ledger` calls.
    pub fn persist_calls(&self) -> usize {
        self.state.lock().calls
    }
}

#[async_trait]
impl LedgerSink for InMemoryLedgerSink {
    async fn persist_ledger(&self, sequence: u32, buffer: IndexerBuffer) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        if state.failing == Some(sequence) {
            return Err(SinkError::Storage(format!(
                "write of ledger {sequence} rejected"
            )));
        }
        debug!(
            ledger = sequence,
            transactions = buffer.transaction_count(),
            "Persisting ledger"
        );
        state.ledgers.insert(sequence, buffer);
        state.order.push(sequence);
        state.calls += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[tokio::test]
    async fn test_missing_ledger_not_yet_available() {
        let source = InMemoryLedgerSource::new();
        let err = source.get_ledger(9).await.unwrap_err();
        assert_eq!(err, LedgerSourceError::NotYetAvailable { sequence: 9 });
        assert_eq!(source.fetch_log(), vec![9]);
    }

    #[tokio::test]
    async fn test_scripted_transient_failures() {
        let source = InMemoryLedgerSource::with_ledgers(vec![fixtures::payment_ledger(4, 1)]);
        source.fail_transiently(4, 2);

        assert!(source.get_ledger(4).await.unwrap_err().is_transient());
        assert!(source.get_ledger(4).await.unwrap_err().is_transient());
        assert_eq!(source.get_ledger(4).await.unwrap().sequence, 4);
        assert_eq!(source.fetch_count(4), 3);
    }

    #[tokio::test]
    async fn test_fatal_failure() {
        let source = InMemoryLedgerSource::with_ledgers(vec![fixtures::payment_ledger(4, 1)]);
        source.fail_fatally(4, "corrupt");
        let err = source.get_ledger(4).await.unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_prepare_records_range() {
        let source = InMemoryLedgerSource::new();
        let range = LedgerRange::Bounded {
            from: 1,
            to_exclusive: 3,
        };
        source.prepare_range(range).await.unwrap();
        assert_eq!(source.prepared_range(), Some(range));
    }

    #[tokio::test]
    async fn test_sink_overwrites_by_sequence() {
        let sink = InMemoryLedgerSink::new();
        let mut buffer = IndexerBuffer::new();
        sink.persist_ledger(5, buffer.clone()).await.unwrap();

        let tx = fixtures::transaction(5, 1, 1, vec![]);
        buffer.push_transaction("GA", &tx);
        sink.persist_ledger(5, buffer.clone()).await.unwrap();

        assert_eq!(sink.sequences(), vec![5]);
        assert_eq!(sink.ledger(5), Some(buffer));
        assert_eq!(sink.persist_calls(), 2);
    }

    #[tokio::test]
    async fn test_sink_failure() {
        let sink = InMemoryLedgerSink::new();
        sink.fail_at(2);
        assert!(sink.persist_ledger(2, IndexerBuffer::new()).await.is_err());
        assert_eq!(sink.persist_calls(), 0);
    }
}
