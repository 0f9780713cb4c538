//! # Domain Errors
//!
//! Error types for operation processing and the per-ledger engine.

use thiserror::Error;

/// Invocation tree deeper than `MAX_INVOCATION_DEPTH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invocation tree exceeds maximum depth {max}")]
pub struct InvocationDepthExceeded {
    /// The configured limit
    pub max: usize,
}

/// A state change was built without a required field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateChangeError {
    /// Category or reason unset
    #[error("State change is missing required field `{0}`")]
    MissingField(&'static str),
}

/// Errors returned by an operation processor.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// The processor does not handle this operation. Callers skip it.
    #[error("Operation not applicable to processor")]
    NotApplicable,

    /// Contract id preimage could not be serialized.
    #[error("Deriving contract id: {0}")]
    ContractId(String),

    /// Address type that has no account or contract strkey.
    #[error("Unsupported address type: {0}")]
    UnsupportedAddress(String),

    /// Authorization tree too deep.
    #[error(transparent)]
    InvocationDepth(#[from] InvocationDepthExceeded),

    /// Builder rejected the state change.
    #[error(transparent)]
    StateChange(#[from] StateChangeError),
}

impl ProcessorError {
    /// Whether this is the skip signal rather than a failure.
    pub fn is_not_applicable(&self) -> bool {
        matches!(self, Self::NotApplicable)
    }
}

/// Errors raised by the per-ledger processing engine.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// A processor failed on an operation.
    #[error("processor {processor} on operation {operation_id}: {source}")]
    Processor {
        /// Processor name
        processor: &'static str,
        /// Total order id of the operation
        operation_id: i64,
        /// Processor failure
        source: ProcessorError,
    },

    /// A transaction failed; wraps the cause with its position.
    #[error("processing transaction at ledger={ledger} tx={index}: {source}")]
    Transaction {
        /// Ledger sequence
        ledger: u32,
        /// 1-based application index
        index: u32,
        /// Cause
        source: Box<IndexerError>,
    },

    /// Every failure of one ledger, ordered by transaction index.
    #[error("{}", join_errors(.0))]
    Transactions(Vec<IndexerError>),

    /// Shutdown observed before the transaction was submitted.
    #[error("cancelled before processing")]
    Cancelled,

    /// Worker pool could not be built.
    #[error("Building worker pool: {0}")]
    ThreadPool(String),

    /// Blocking task running the engine did not complete.
    #[error("Engine worker failed: {0}")]
    WorkerFailed(String),
}

impl IndexerError {
    /// Transaction index for positional errors, used for ordering.
    pub fn transaction_index(&self) -> Option<u32> {
        match self {
            Self::Transaction { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Number of individual failures carried.
    pub fn failure_count(&self) -> usize {
        match self {
            Self::Transactions(errors) => errors.len(),
            _ => 1,
        }
    }
}

fn join_errors(errors: &[IndexerError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx_error(index: u32) -> IndexerError {
        IndexerError::Transaction {
            ledger: 9,
            index,
            source: Box::new(IndexerError::Cancelled),
        }
    }

    #[test]
    fn test_joined_display_lists_every_failure() {
        let err = IndexerError::Transactions(vec![tx_error(2), tx_error(5)]);
        let message = err.to_string();
        assert!(message.contains("ledger=9 tx=2"));
        assert!(message.contains("ledger=9 tx=5"));
        assert_eq!(message.lines().count(), 2);
        assert_eq!(err.failure_count(), 2);
    }

    #[test]
    fn test_transaction_index() {
        assert_eq!(tx_error(3).transaction_index(), Some(3));
        assert_eq!(IndexerError::Cancelled.transaction_index(), None);
    }

    #[test]
    fn test_processor_error_conversions() {
        let err: ProcessorError = InvocationDepthExceeded { max: 64 }.into();
        assert!(err.to_string().contains("64"));
        let err: ProcessorError = StateChangeError::MissingField("category").into();
        assert!(err.to_string().contains("category"));
        assert!(!err.is_not_applicable());
        assert!(ProcessorError::NotApplicable.is_not_applicable());
    }
}
