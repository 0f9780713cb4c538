//! # Application Module
//!
//! Application services orchestrating the domain and outbound ports.

pub mod indexer;
pub mod service;

pub use indexer::{Indexer, IndexerOptions};
pub use service::{IngestService, IngestStats};
