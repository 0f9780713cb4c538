//! Error types for the ingestion service

use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::IndexerError;
use crate::ports::{LedgerRange, LedgerSourceError, SinkError};

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Errors that abort an ingestion run
#[derive(Debug, Error)]
pub enum IngestError {
    /// Bounded range whose end does not lie above its start
    #[error("Invalid ledger range: end {end} must be greater than start {start}")]
    InvalidRange {
        /// First ledger requested
        start: u32,
        /// Exclusive upper bound requested
        end: u32,
    },

    /// Ledger source rejected the requested range
    #[error("Preparing backend range {range}: {source}")]
    PrepareRange {
        /// Range handed to the source
        range: LedgerRange,
        /// Underlying source failure
        source: LedgerSourceError,
    },

    /// Non-retryable fetch failure
    #[error("Fetching ledger {ledger}: {source}")]
    Fetch {
        /// Sequence being fetched
        ledger: u32,
        /// Underlying source failure
        source: LedgerSourceError,
    },

    /// Transaction processing failed; the ledger was discarded
    #[error("Processing ledger {ledger}: {source}")]
    Processing {
        /// Sequence being processed
        ledger: u32,
        /// Engine failure
        source: IndexerError,
    },

    /// Persistence collaborator rejected a completed ledger
    #[error("Persisting ledger {ledger}: {source}")]
    Persist {
        /// Sequence being persisted
        ledger: u32,
        /// Sink failure
        source: SinkError,
    },

    /// Processing engine could not be built
    #[error("Building processing engine: {0}")]
    Engine(IndexerError),

    /// Shutdown was signalled
    #[error("Ingestion cancelled")]
    Cancelled,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl IngestError {
    /// Whether the run ended because shutdown was requested.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_error_names_ledger() {
        let err = IngestError::Processing {
            ledger: 42,
            source: IndexerError::Cancelled,
        };
        assert!(err.to_string().contains("42"));
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_fetch_error_display() {
        let err = IngestError::Fetch {
            ledger: 7,
            source: LedgerSourceError::Fatal("archive corrupted".to_string()),
        };
        let message = err.to_string();
        assert!(message.contains("ledger 7"));
        assert!(message.contains("archive corrupted"));
    }

    #[test]
    fn test_cancelled() {
        assert!(IngestError::Cancelled.is_cancelled());
    }
}
