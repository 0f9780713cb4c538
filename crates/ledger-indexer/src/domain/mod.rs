//! # Domain Layer
//!
//! Pure ingestion logic: buffers, state-change construction, the
//! authorization-tree walk and the operation processors.
//!
//! ## Hexagonal Architecture
//!
//! This module contains NO I/O dependencies. Fetching ledgers and persisting
//! results go through the `ports` module.

pub mod buffer;
pub mod changes;
pub mod contract_id;
pub mod entities;
pub mod errors;
pub mod invocation;
pub mod processors;
pub mod state_change;
pub mod toid;
pub mod value_objects;

pub use buffer::*;
pub use changes::*;
pub use contract_id::*;
pub use entities::*;
pub use errors::*;
pub use invocation::*;
pub use processors::*;
pub use state_change::*;
pub use toid::*;
pub use value_objects::*;
