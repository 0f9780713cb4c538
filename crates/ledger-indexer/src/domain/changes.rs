//! # Trustline and Contract Changes
//!
//! Secondary records derived alongside state changes: trustlines from
//! `ChangeTrust` operations and contract registrations from deployments.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use stellar_xdr::curr::{ChangeTrustAsset, Limits, OperationBody, WriteXdr};

use super::contract_id::account_id_strkey;
use super::entities::OperationView;
use super::state_change::{StateChange, StateChangeReason};

/// A trustline set, updated or removed by `ChangeTrust`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustlineChange {
    /// Account holding the trustline
    pub account_id: String,
    /// `CODE:ISSUER`, `native`, or the liquidity pool id in hex
    pub asset: String,
    /// New limit; zero removes the trustline
    pub limit: i64,
    /// `Update` for a non-zero limit, `Remove` for zero
    pub reason: StateChangeReason,
    /// Total order id of the operation
    pub operation_id: i64,
    /// Ledger sequence
    pub ledger_number: u32,
}

impl TrustlineChange {
    /// Trustline change for a `ChangeTrust` operation, `None` for other kinds.
    ///
    /// Whether a non-zero limit creates or updates the line is only visible
    /// in the ledger entry changes, which are not decoded here.
    pub fn from_operation(op: &OperationView<'_>) -> Option<Self> {
        let OperationBody::ChangeTrust(change_trust) = op.body() else {
            return None;
        };
        let reason = if change_trust.limit == 0 {
            StateChangeReason::Remove
        } else {
            StateChangeReason::Update
        };
        Some(Self {
            account_id: op.source_account(),
            asset: change_trust_asset_string(&change_trust.line),
            limit: change_trust.limit,
            reason,
            operation_id: op.id(),
            ledger_number: op.transaction.ledger_sequence,
        })
    }
}

/// A contract registered by a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractChange {
    /// `C...` strkey of the deployed contract
    pub contract_id: String,
    /// Account that deployed it
    pub deployer_account_id: String,
    /// Total order id of the operation
    pub operation_id: i64,
    /// Hex hash of the transaction
    pub tx_hash: String,
    /// Ledger sequence
    pub ledger_number: u32,
}

impl ContractChange {
    /// Contract change for a deployment state change, `None` otherwise.
    pub fn from_deployment(change: &StateChange) -> Option<Self> {
        if !change.is_deployment() {
            return None;
        }
        Some(Self {
            contract_id: change.account_id.clone()?,
            deployer_account_id: change.deployer_account_id.clone()?,
            operation_id: change.operation_id?,
            tx_hash: change.tx_hash.clone(),
            ledger_number: change.ledger_number,
        })
    }
}

fn change_trust_asset_string(asset: &ChangeTrustAsset) -> String {
    match asset {
        ChangeTrustAsset::Native => "native".to_string(),
        ChangeTrustAsset::CreditAlphanum4(a) => {
            format!("{}:{}", asset_code(&a.asset_code.0), account_id_strkey(&a.issuer))
        }
        ChangeTrustAsset::CreditAlphanum12(a) => {
            format!("{}:{}", asset_code(&a.asset_code.0), account_id_strkey(&a.issuer))
        }
        ChangeTrustAsset::PoolShare(params) => match params.to_xdr(Limits::none()) {
            Ok(bytes) => hex::encode(Sha256::digest(&bytes)),
            Err(_) => "pool_share".to_string(),
        },
    }
}

fn asset_code(code: &[u8]) -> String {
    let end = code.iter().position(|b| *b == 0).unwrap_or(code.len());
    String::from_utf8_lossy(&code[..end]).into_owned()
}
