//! # Ports Module
//!
//! Hexagonal architecture ports (inbound API, outbound ledger source and sink).

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
