//! # Indexer Buffer
//!
//! Accumulates everything derived from one transaction (or, after merging,
//! one ledger) before it is handed to the sink.
//!
//! ## Ordering
//!
//! Records keep the order in which they were first pushed. Merging appends
//! the other buffer's records after this one's and unions participant sets,
//! so merging per-transaction buffers in transaction order yields ledger
//! order.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::changes::{ContractChange, TrustlineChange};
use super::entities::{Hash, OperationRecord, TransactionView};
use super::state_change::StateChange;

/// Ordered, deduplicated ingestion output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexerBuffer {
    tx_participants: HashMap<i64, HashSet<String>>,
    op_participants: HashMap<i64, HashSet<String>>,
    transactions: Vec<TransactionView>,
    seen_transactions: HashSet<Hash>,
    operations: Vec<OperationRecord>,
    seen_operations: HashSet<i64>,
    state_changes: Vec<StateChange>,
    trustline_changes: Vec<TrustlineChange>,
    contract_changes: Vec<ContractChange>,
}

impl IndexerBuffer {
    /// Empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transaction and one of its participants.
    pub fn push_transaction(&mut self, participant: &str, tx: &TransactionView) {
        self.tx_participants
            .entry(tx.id())
            .or_default()
            .insert(participant.to_string());
        self.insert_transaction(tx);
    }

    /// Record an operation and one of its participants.
    ///
    /// The participant is also a participant of the owning transaction.
    pub fn push_operation(
        &mut self,
        participant: &str,
        operation: &OperationRecord,
        tx: &TransactionView,
    ) {
        self.op_participants
            .entry(operation.id)
            .or_default()
            .insert(participant.to_string());
        self.push_transaction(participant, tx);
        self.insert_operation(operation);
    }

    /// Record a state change; its addresses become participants of the
    /// operation and the transaction.
    pub fn push_state_change(
        &mut self,
        tx: &TransactionView,
        operation: &OperationRecord,
        change: StateChange,
    ) {
        for participant in change.participants() {
            self.push_operation(participant, operation, tx);
        }
        self.insert_transaction(tx);
        self.insert_operation(operation);
        self.state_changes.push(change);
    }

    /// Record a trustline change.
    pub fn push_trustline_change(&mut self, change: TrustlineChange) {
        self.trustline_changes.push(change);
    }

    /// Record a contract change.
    pub fn push_contract_change(&mut self, change: ContractChange) {
        self.contract_changes.push(change);
    }

    /// Append `other` after this buffer's contents and union participants.
    pub fn merge(&mut self, other: IndexerBuffer) {
        for (id, participants) in other.tx_participants {
            self.tx_participants.entry(id).or_default().extend(participants);
        }
        for (id, participants) in other.op_participants {
            self.op_participants.entry(id).or_default().extend(participants);
        }
        for tx in other.transactions {
            if self.seen_transactions.insert(tx.hash) {
                self.transactions.push(tx);
            }
        }
        for op in other.operations {
            if self.seen_operations.insert(op.id) {
                self.operations.push(op);
            }
        }
        self.state_changes.extend(other.state_changes);
        self.trustline_changes.extend(other.trustline_changes);
        self.contract_changes.extend(other.contract_changes);
    }

    /// Participants per transaction id.
    pub fn transactions_participants(&self) -> &HashMap<i64, HashSet<String>> {
        &self.tx_participants
    }

    /// Participants per operation id.
    pub fn operations_participants(&self) -> &HashMap<i64, HashSet<String>> {
        &self.op_participants
    }

    /// Every distinct participant, sorted.
    pub fn all_participants(&self) -> Vec<String> {
        self.participant_set().into_iter().map(str::to_string).collect()
    }

    /// Number of distinct participants.
    pub fn participant_count(&self) -> usize {
        self.participant_set().len()
    }

    /// Transactions in first-seen order.
    pub fn transactions(&self) -> &[TransactionView] {
        &self.transactions
    }

    /// Operations in first-seen order.
    pub fn operations(&self) -> &[OperationRecord] {
        &self.operations
    }

    /// State changes in push order.
    pub fn state_changes(&self) -> &[StateChange] {
        &self.state_changes
    }

    /// Trustline changes in push order.
    pub fn trustline_changes(&self) -> &[TrustlineChange] {
        &self.trustline_changes
    }

    /// Contract changes in push order.
    pub fn contract_changes(&self) -> &[ContractChange] {
        &self.contract_changes
    }

    /// Number of transactions.
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Number of operations.
    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
            && self.operations.is_empty()
            && self.state_changes.is_empty()
            && self.trustline_changes.is_empty()
            && self.contract_changes.is_empty()
    }

    fn insert_transaction(&mut self, tx: &TransactionView) {
        if self.seen_transactions.insert(tx.hash) {
            self.transactions.push(tx.clone());
        }
    }

    fn insert_operation(&mut self, operation: &OperationRecord) {
        if self.seen_operations.insert(operation.id) {
            self.operations.push(operation.clone());
        }
    }

    fn participant_set(&self) -> BTreeSet<&str> {
        self.tx_participants
            .values()
            .chain(self.op_participants.values())
            .flatten()
            .map(String::as_str)
            .collect()
    }
}
