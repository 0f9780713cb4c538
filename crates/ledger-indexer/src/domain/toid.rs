//! # Total Order IDs
//!
//! Stellar orders every transaction and operation in the network history with
//! a single 64-bit id:
//!
//! ```text
//!  63                    32 31                 12 11          0
//! ┌────────────────────────┬─────────────────────┬─────────────┐
//! │   ledger sequence      │  transaction order  │  op order   │
//! └────────────────────────┴─────────────────────┴─────────────┘
//! ```
//!
//! Transaction order is the 1-based application index within the ledger.
//! Operation order is 1-based for operations and 0 for the transaction itself.

use serde::{Deserialize, Serialize};

/// Bits reserved for the transaction order.
pub const TRANSACTION_ORDER_BITS: u32 = 20;

/// Bits reserved for the operation order.
pub const OPERATION_ORDER_BITS: u32 = 12;

const TRANSACTION_ORDER_MASK: i64 = (1 << TRANSACTION_ORDER_BITS) - 1;
const OPERATION_ORDER_MASK: i64 = (1 << OPERATION_ORDER_BITS) - 1;
const LEDGER_SHIFT: u32 = TRANSACTION_ORDER_BITS + OPERATION_ORDER_BITS;

/// A decoded total order id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Toid {
    /// Ledger sequence.
    pub ledger_sequence: u32,
    /// 1-based transaction order within the ledger.
    pub transaction_order: u32,
    /// 1-based operation order within the transaction, 0 for the transaction.
    pub operation_order: u32,
}

impl Toid {
    /// Id of an operation.
    pub fn new(ledger_sequence: u32, transaction_order: u32, operation_order: u32) -> Self {
        Self {
            ledger_sequence,
            transaction_order,
            operation_order,
        }
    }

    /// Id of a transaction.
    pub fn transaction(ledger_sequence: u32, transaction_order: u32) -> Self {
        Self::new(ledger_sequence, transaction_order, 0)
    }

    /// Pack into the 64-bit representation.
    ///
    /// Orders wider than their bit field are masked.
    pub fn to_i64(self) -> i64 {
        (i64::from(self.ledger_sequence) << LEDGER_SHIFT)
            | ((i64::from(self.transaction_order) & TRANSACTION_ORDER_MASK) << OPERATION_ORDER_BITS)
            | (i64::from(self.operation_order) & OPERATION_ORDER_MASK)
    }

    /// Unpack a 64-bit id.
    pub fn parse(id: i64) -> Self {
        Self {
            ledger_sequence: (id >> LEDGER_SHIFT) as u32,
            transaction_order: ((id >> OPERATION_ORDER_BITS) & TRANSACTION_ORDER_MASK) as u32,
            operation_order: (id & OPERATION_ORDER_MASK) as u32,
        }
    }

    /// The transaction this id belongs to.
    pub fn transaction_id(self) -> Self {
        Self::transaction(self.ledger_sequence, self.transaction_order)
    }
}

impl From<Toid> for i64 {
    fn from(toid: Toid) -> Self {
        toid.to_i64()
    }
}
