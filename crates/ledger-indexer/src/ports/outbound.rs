//! # Outbound Ports
//!
//! Traits for the collaborators the ingestion service drives: the ledger
//! backend it reads from and the store it writes completed ledgers to.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use crate::domain::{IndexerBuffer, LedgerRecord};

/// Ledgers a source should prepare to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerRange {
    /// `from` and everything after it.
    Unbounded {
        /// First ledger
        from: u32,
    },
    /// `from` up to, but excluding, `to_exclusive`.
    Bounded {
        /// First ledger
        from: u32,
        /// First ledger past the range
        to_exclusive: u32,
    },
}

impl LedgerRange {
    /// Range for a run over `start..end`, unbounded when `end` is 0.
    pub fn for_run(start: u32, end: u32) -> Self {
        if end == 0 {
            Self::Unbounded { from: start }
        } else {
            Self::Bounded {
                from: start,
                to_exclusive: end,
            }
        }
    }

    /// First ledger of the range.
    pub fn from(&self) -> u32 {
        match self {
            Self::Unbounded { from } | Self::Bounded { from, .. } => *from,
        }
    }

    /// Whether `sequence` lies in the range.
    pub fn contains(&self, sequence: u32) -> bool {
        match self {
            Self::Unbounded { from } => sequence >= *from,
            Self::Bounded { from, to_exclusive } => sequence >= *from && sequence < *to_exclusive,
        }
    }
}

impl fmt::Display for LedgerRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded { from } => write!(f, "[{from}, ∞)"),
            Self::Bounded { from, to_exclusive } => write!(f, "[{from}, {to_exclusive})"),
        }
    }
}

/// Ledger backend failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerSourceError {
    /// The ledger has not closed yet.
    #[error("Ledger {sequence} not yet available")]
    NotYetAvailable {
        /// Requested sequence
        sequence: u32,
    },

    /// Backend temporarily unreachable.
    #[error("Ledger backend unavailable: {0}")]
    Unavailable(String),

    /// Unrecoverable backend failure.
    #[error("Ledger backend failure: {0}")]
    Fatal(String),
}

impl LedgerSourceError {
    /// Whether retrying the same request can succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NotYetAvailable { .. } | Self::Unavailable(_))
    }
}

/// Ledger backend - outbound port.
#[async_trait]
pub trait LedgerSource: Send + Sync {
    /// Announce the range about to be read.
    async fn prepare_range(&self, range: LedgerRange) -> Result<(), LedgerSourceError>;

    /// Fetch one closed ledger.
    async fn get_ledger(&self, sequence: u32) -> Result<LedgerRecord, LedgerSourceError>;
}

/// Ledger store failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// Write rejected by the store.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Store for completed ledgers - outbound port.
///
/// Only called for ledgers that processed without error. Writing the same
/// sequence twice must leave the store as if it was written once.
#[async_trait]
pub trait LedgerSink: Send + Sync {
    /// Persist the merged buffer of ledger `sequence`.
    async fn persist_ledger(&self, sequence: u32, buffer: IndexerBuffer) -> Result<(), SinkError>;
}
