//! # Ledger Indexer
//!
//! Tails a Stellar ledger stream and derives normalized state changes for
//! Soroban contract activity.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Pipeline
//!
//! ```text
//! LedgerSource ──get_ledger(n)──→ IngestService (sequencer, retry/backoff)
//!                                        │
//!                                        ↓
//!                              Indexer (rayon worker pool)
//!                     ┌──────────────────┼──────────────────┐
//!                     ↓                  ↓                  ↓
//!               tx buffer 0        tx buffer 1   ...  tx buffer k
//!            (ProcessorRegistry + invocation walk per operation)
//!                     └──────────────────┼──────────────────┘
//!                                        ↓
//!                        ledger buffer (ordered, all-or-nothing merge)
//!                                        │
//!                                        ↓
//!                                   LedgerSink
//! ```
//!
//! ## Guarantees
//!
//! | Guarantee | Enforcement | Location |
//! |-----------|-------------|----------|
//! | Strict ledger order | Single sequencer loop, never skips a sequence | application/service.rs |
//! | All-or-nothing ledgers | No merge when any transaction fails | application/indexer.rs |
//! | Deterministic merge order | Pre-sized result slots indexed by position | application/indexer.rs |
//! | One record per deployed contract | Dedup by derived contract id per operation | domain/processors/contract_deploy.rs |
//! | Bounded tree walk | `MAX_INVOCATION_DEPTH` | domain/invocation.rs |
//!
//! ## Module Structure
//!
//! ```text
//! ledger-indexer/
//! ├── domain/          # Buffer, StateChangeBuilder, invocation walk, processors, TOIDs
//! ├── ports/           # IngestApi (inbound) + LedgerSource / LedgerSink (outbound)
//! ├── application/     # Indexer (per-ledger engine) and IngestService (sequencer)
//! ├── adapters/        # In-memory ledger source and sink
//! ├── fixtures.rs      # XDR builders for tests and replays
//! └── config.rs        # IngestConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod fixtures;
pub mod ports;

// Re-exports
pub use adapters::{InMemoryLedgerSink, InMemoryLedgerSource};
pub use application::{IngestService, IngestStats, Indexer, IndexerOptions};
pub use config::{ConfigError, IngestConfig, LedgerBackendType};
pub use domain::{
    derive_contract_id, walk_invocation, ContractChange, ContractDeploymentProcessor,
    EscrowInitializationProcessor, EscrowKind, IndexerBuffer, IndexerError, InvocationDepthExceeded,
    LedgerRecord, NetworkId, OperationProcessor, OperationRecord, OperationView, ProcessorError,
    ProcessorRegistry, StateChange, StateChangeBuilder, StateChangeCategory, StateChangeError,
    StateChangeReason, Toid, TransactionView, TrustlineChange, MAX_INVOCATION_DEPTH,
};
pub use error::IngestError;
pub use ports::{IngestApi, LedgerRange, LedgerSink, LedgerSource, LedgerSourceError, SinkError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
