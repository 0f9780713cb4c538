//! # Domain Entities
//!
//! Ledger, transaction and operation views handed to the processing engine.
//!
//! Decoding `LedgerCloseMeta` into these views is the ledger source's job;
//! the engine only reads the fields below.

use stellar_xdr::curr::{Operation, OperationBody, OperationType};

use super::contract_id::muxed_account_strkey;
use super::toid::Toid;

/// 32-byte transaction hash.
pub type Hash = [u8; 32];

/// A closed ledger and its transactions in application order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRecord {
    /// Ledger sequence number.
    pub sequence: u32,
    /// Close time, unix seconds.
    pub close_time: i64,
    /// Transactions in application order.
    pub transactions: Vec<TransactionView>,
}

impl LedgerRecord {
    /// Create a ledger record.
    pub fn new(sequence: u32, close_time: i64, transactions: Vec<TransactionView>) -> Self {
        Self {
            sequence,
            close_time,
            transactions,
        }
    }

    /// Number of transactions in the ledger.
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Number of operations across all transactions.
    pub fn operation_count(&self) -> usize {
        self.transactions.iter().map(|tx| tx.operations.len()).sum()
    }
}

/// A transaction as seen by the processors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionView {
    /// Sequence of the ledger that applied this transaction.
    pub ledger_sequence: u32,
    /// Close time of that ledger, unix seconds.
    pub ledger_close_time: i64,
    /// Transaction hash.
    pub hash: Hash,
    /// 1-based application order within the ledger.
    pub index: u32,
    /// Source account strkey (`G...`).
    pub source_account: String,
    /// Operations in envelope order.
    pub operations: Vec<Operation>,
    /// Raw envelope, base64 XDR.
    pub envelope_xdr: Option<String>,
    /// Raw result meta, base64 XDR.
    pub result_meta_xdr: Option<String>,
}

impl TransactionView {
    /// Total order id of the transaction.
    pub fn id(&self) -> i64 {
        Toid::transaction(self.ledger_sequence, self.index).to_i64()
    }

    /// Lowercase hex rendering of the hash.
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Borrowed views over the operations, in order.
    pub fn operation_views(&self) -> impl Iterator<Item = OperationView<'_>> {
        self.operations
            .iter()
            .enumerate()
            .map(move |(index, operation)| OperationView::new(self, index as u32, operation))
    }

    /// Copy of this transaction without the raw XDR that is configured off.
    pub fn without_raw_xdr(&self, skip_meta: bool, skip_envelope: bool) -> Self {
        let mut stored = self.clone();
        if skip_meta {
            stored.result_meta_xdr = None;
        }
        if skip_envelope {
            stored.envelope_xdr = None;
        }
        stored
    }
}

/// Borrowed view of one operation inside its transaction.
///
/// Holds a back-reference to the transaction; never owns it.
#[derive(Debug, Clone, Copy)]
pub struct OperationView<'a> {
    /// 0-based index within the transaction.
    pub index: u32,
    /// The raw operation.
    pub operation: &'a Operation,
    /// Owning transaction.
    pub transaction: &'a TransactionView,
}

impl<'a> OperationView<'a> {
    /// Create a view.
    pub fn new(transaction: &'a TransactionView, index: u32, operation: &'a Operation) -> Self {
        Self {
            index,
            operation,
            transaction,
        }
    }

    /// Operation kind discriminator.
    pub fn kind(&self) -> OperationType {
        self.operation.body.discriminant()
    }

    /// Raw operation body.
    pub fn body(&self) -> &'a OperationBody {
        &self.operation.body
    }

    /// Total order id of the operation.
    pub fn id(&self) -> i64 {
        Toid::new(
            self.transaction.ledger_sequence,
            self.transaction.index,
            self.index + 1,
        )
        .to_i64()
    }

    /// Total order id of the owning transaction.
    pub fn transaction_id(&self) -> i64 {
        self.transaction.id()
    }

    /// Operation source if set, otherwise the transaction source.
    pub fn source_account(&self) -> String {
        match &self.operation.source_account {
            Some(account) => muxed_account_strkey(account),
            None => self.transaction.source_account.clone(),
        }
    }

    /// Owned copy suitable for buffering.
    pub fn to_record(&self) -> OperationRecord {
        OperationRecord {
            id: self.id(),
            transaction_id: self.transaction_id(),
            transaction_hash: self.transaction.hash_hex(),
            ledger_sequence: self.transaction.ledger_sequence,
            index: self.index,
            kind: self.kind(),
            source_account: self.source_account(),
            body: self.operation.body.clone(),
        }
    }
}

/// Owned operation stored in a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRecord {
    /// Total order id.
    pub id: i64,
    /// Total order id of the owning transaction.
    pub transaction_id: i64,
    /// Hex hash of the owning transaction.
    pub transaction_hash: String,
    /// Ledger that applied the operation.
    pub ledger_sequence: u32,
    /// 0-based index within the transaction.
    pub index: u32,
    /// Operation kind.
    pub kind: OperationType,
    /// Effective source account.
    pub source_account: String,
    /// Raw operation body.
    pub body: OperationBody,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_operation_ids_follow_transaction() {
        let tx = fixtures::transaction(
            100,
            3,
            1,
            vec![fixtures::payment_op(2, 10), fixtures::payment_op(3, 20)],
        );
        let ids: Vec<i64> = tx.operation_views().map(|op| op.id()).collect();
        assert_eq!(ids[0], Toid::new(100, 3, 1).to_i64());
        assert_eq!(ids[1], Toid::new(100, 3, 2).to_i64());
        assert!(tx.operation_views().all(|op| op.transaction_id() == tx.id()));
    }

    #[test]
    fn test_operation_source_falls_back_to_transaction() {
        let tx = fixtures::transaction(
            1,
            1,
            7,
            vec![
                fixtures::payment_op(2, 10),
                fixtures::with_source(fixtures::payment_op(2, 10), 9),
            ],
        );
        let sources: Vec<String> = tx.operation_views().map(|op| op.source_account()).collect();
        assert_eq!(sources[0], fixtures::account_strkey(7));
        assert_eq!(sources[1], fixtures::account_strkey(9));
    }

    #[test]
    fn test_without_raw_xdr() {
        let tx = fixtures::transaction(1, 1, 1, vec![]);
        assert!(tx.envelope_xdr.is_some());

        let stripped = tx.without_raw_xdr(true, false);
        assert!(stripped.result_meta_xdr.is_none());
        assert!(stripped.envelope_xdr.is_some());

        let stripped = tx.without_raw_xdr(false, true);
        assert!(stripped.result_meta_xdr.is_some());
        assert!(stripped.envelope_xdr.is_none());
    }

    #[test]
    fn test_ledger_counts() {
        let ledger = fixtures::ledger(
            5,
            vec![
                fixtures::transaction(5, 1, 1, vec![fixtures::payment_op(2, 1)]),
                fixtures::transaction(
                    5,
                    2,
                    1,
                    vec![fixtures::payment_op(2, 1), fixtures::payment_op(3, 1)],
                ),
            ],
        );
        assert_eq!(ledger.transaction_count(), 2);
        assert_eq!(ledger.operation_count(), 3);
    }
}
