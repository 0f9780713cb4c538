//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements outbound port traits. The network backends live in the
//! embedding binary; this crate ships the in-memory pair.

mod memory;

pub use memory::{InMemoryLedgerSink, InMemoryLedgerSource};
