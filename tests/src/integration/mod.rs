//! # Integration Tests
//!
//! Ledgers flow from an in-memory source through the whole pipeline into an
//! in-memory sink.

pub mod flows;
