//! # State Changes
//!
//! Normalized records of what a transaction did to an account, contract,
//! trustline or escrow.
//!
//! Processors obtain a [`StateChangeBuilder`] seeded with the transaction
//! context, clone it per record and fill in the variable fields:
//!
//! ```text
//! StateChangeBuilder::for_operation(&op)    ledger, close time, tx hash, tx id, op id
//!     .clone()
//!     .with_category(Account)
//!     .with_reason(Create)
//!     .with_account(contract_id)
//!     .with_deployer(deployer)
//!     .build()?                              → StateChange
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use super::entities::{OperationView, TransactionView};
use super::errors::StateChangeError;

/// What kind of entity changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateChangeCategory {
    /// Account or contract instance
    Account,
    /// Contract code or data
    Contract,
    /// Trustline
    Trustline,
    /// Escrow created through a known contract entry point
    Escrow,
}

/// Why the entity changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateChangeReason {
    /// Entity came into existence
    Create,
    /// Entity was modified
    Update,
    /// Entity was deleted
    Remove,
    /// Application level initialization
    Initialize,
}

/// Escrow flavour, from the contract function that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowKind {
    /// Funds released in one step
    SingleRelease,
    /// Funds released per milestone
    MultiRelease,
}

impl fmt::Display for StateChangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Account => "ACCOUNT",
            Self::Contract => "CONTRACT",
            Self::Trustline => "TRUSTLINE",
            Self::Escrow => "ESCROW",
        };
        f.write_str(s)
    }
}

impl fmt::Display for StateChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Remove => "REMOVE",
            Self::Initialize => "INITIALIZE",
        };
        f.write_str(s)
    }
}

/// An immutable state change record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    /// Ledger sequence
    pub ledger_number: u32,
    /// Ledger close time, unix seconds
    pub ledger_close_time: i64,
    /// Hex hash of the transaction
    pub tx_hash: String,
    /// Total order id of the transaction
    pub tx_id: i64,
    /// Total order id of the operation, if any
    pub operation_id: Option<i64>,
    /// Entity kind
    pub category: StateChangeCategory,
    /// Change kind
    pub reason: StateChangeReason,
    /// Subject account or contract
    pub account_id: Option<String>,
    /// Account that caused the change
    pub deployer_account_id: Option<String>,
    /// Contract function that caused the change
    pub function_name: Option<String>,
    /// Escrow flavour for escrow records
    pub escrow_kind: Option<EscrowKind>,
}

impl StateChange {
    /// Addresses touched by this change.
    pub fn participants(&self) -> impl Iterator<Item = &str> {
        self.account_id
            .iter()
            .chain(self.deployer_account_id.iter())
            .map(String::as_str)
    }

    /// Whether this records a contract deployment.
    pub fn is_deployment(&self) -> bool {
        self.category == StateChangeCategory::Account
            && self.reason == StateChangeReason::Create
            && self.deployer_account_id.is_some()
    }
}

/// Builder seeded with transaction context.
///
/// Setters take and return the builder by value; clone it to derive several
/// records from one context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChangeBuilder {
    ledger_number: u32,
    ledger_close_time: i64,
    tx_hash: String,
    tx_id: i64,
    operation_id: Option<i64>,
    category: Option<StateChangeCategory>,
    reason: Option<StateChangeReason>,
    account_id: Option<String>,
    deployer_account_id: Option<String>,
    function_name: Option<String>,
    escrow_kind: Option<EscrowKind>,
}

impl StateChangeBuilder {
    /// Builder with the immutable transaction context.
    pub fn new(ledger_number: u32, ledger_close_time: i64, tx_hash: String, tx_id: i64) -> Self {
        Self {
            ledger_number,
            ledger_close_time,
            tx_hash,
            tx_id,
            operation_id: None,
            category: None,
            reason: None,
            account_id: None,
            deployer_account_id: None,
            function_name: None,
            escrow_kind: None,
        }
    }

    /// Builder for a transaction.
    pub fn for_transaction(tx: &TransactionView) -> Self {
        Self::new(tx.ledger_sequence, tx.ledger_close_time, tx.hash_hex(), tx.id())
    }

    /// Builder for an operation, with the operation id set.
    pub fn for_operation(op: &OperationView<'_>) -> Self {
        Self::for_transaction(op.transaction).with_operation_id(op.id())
    }

    /// Set the operation id.
    pub fn with_operation_id(mut self, operation_id: i64) -> Self {
        self.operation_id = Some(operation_id);
        self
    }

    /// Set the category.
    pub fn with_category(mut self, category: StateChangeCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Set the reason.
    pub fn with_reason(mut self, reason: StateChangeReason) -> Self {
        self.reason = Some(reason);
        self
    }

    /// Set the subject account or contract.
    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Set the deployer.
    pub fn with_deployer(mut self, deployer_account_id: impl Into<String>) -> Self {
        self.deployer_account_id = Some(deployer_account_id.into());
        self
    }

    /// Set the contract function name.
    pub fn with_function_name(mut self, function_name: impl Into<String>) -> Self {
        self.function_name = Some(function_name.into());
        self
    }

    /// Set the escrow kind.
    pub fn with_escrow_kind(mut self, escrow_kind: EscrowKind) -> Self {
        self.escrow_kind = Some(escrow_kind);
        self
    }

    /// Produce the record. Category and reason are required.
    pub fn build(self) -> Result<StateChange, StateChangeError> {
        let category = self
            .category
            .ok_or(StateChangeError::MissingField("category"))?;
        let reason = self.reason.ok_or(StateChangeError::MissingField("reason"))?;

        Ok(StateChange {
            ledger_number: self.ledger_number,
            ledger_close_time: self.ledger_close_time,
            tx_hash: self.tx_hash,
            tx_id: self.tx_id,
            operation_id: self.operation_id,
            category,
            reason,
            account_id: self.account_id,
            deployer_account_id: self.deployer_account_id,
            function_name: self.function_name,
            escrow_kind: self.escrow_kind,
        })
    }
}
