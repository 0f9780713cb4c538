//! # Ledger Indexer Test Suite
//!
//! End-to-end ingestion flows across the sequencer, the engine, the
//! processors and the in-memory adapters.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/      # Full pipeline flows
//!     └── flows.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p indexer-tests
//! ```

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod integration;
