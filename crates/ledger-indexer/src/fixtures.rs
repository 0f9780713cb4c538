//! # Fixtures
//!
//! Builders for XDR operations, authorization trees, transactions and
//! ledgers. Accounts and contracts are identified by a one-byte seed that
//! fills their 32-byte key, so tests can recompute any strkey.

use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    AccountId, AlphaNum12, AlphaNum4, Asset, AssetCode12, AssetCode4, ChangeTrustAsset,
    ChangeTrustOp, ContractExecutable, ContractId, ContractIdPreimage,
    ContractIdPreimageFromAddress, CreateContractArgs, CreateContractArgsV2, Hash, HostFunction,
    InvokeContractArgs, InvokeHostFunctionOp, MuxedAccount, Operation, OperationBody, PaymentOp,
    PublicKey, ScAddress, ScSymbol, SorobanAuthorizationEntry, SorobanAuthorizedFunction,
    SorobanAuthorizedInvocation, SorobanCredentials, StringM, Uint256,
};

use crate::domain::{LedgerRecord, TransactionView};

/// Close time of ledger 0 in fixture ledgers.
pub const GENESIS_CLOSE_TIME: i64 = 1_700_000_000;

/// Account id with every key byte set to `seed`.
pub fn account_id(seed: u8) -> AccountId {
    AccountId(PublicKey::PublicKeyTypeEd25519(Uint256([seed; 32])))
}

/// `G...` strkey of [`account_id`].
pub fn account_strkey(seed: u8) -> String {
    stellar_strkey::ed25519::PublicKey([seed; 32]).to_string()
}

/// Account address.
pub fn account_address(seed: u8) -> ScAddress {
    ScAddress::Account(account_id(seed))
}

/// Contract address.
pub fn contract_address(seed: u8) -> ScAddress {
    ScAddress::Contract(ContractId(Hash([seed; 32])))
}

/// Address preimage deploying from account `deployer` with `salt`.
pub fn address_preimage(deployer: u8, salt: u8) -> ContractIdPreimageFromAddress {
    ContractIdPreimageFromAddress {
        address: account_address(deployer),
        salt: Uint256([salt; 32]),
    }
}

/// `CreateContract` arguments for [`address_preimage`].
pub fn create_contract_args(deployer: u8, salt: u8) -> CreateContractArgs {
    CreateContractArgs {
        contract_id_preimage: ContractIdPreimage::Address(address_preimage(deployer, salt)),
        executable: ContractExecutable::Wasm(Hash([0xAA; 32])),
    }
}

/// `CreateContractV2` arguments for [`address_preimage`], no constructor args.
pub fn create_contract_args_v2(deployer: u8, salt: u8) -> CreateContractArgsV2 {
    CreateContractArgsV2 {
        contract_id_preimage: ContractIdPreimage::Address(address_preimage(deployer, salt)),
        executable: ContractExecutable::Wasm(Hash([0xAA; 32])),
        constructor_args: Default::default(),
    }
}

/// Call of `function` on contract `contract`, without arguments.
///
/// Names longer than a symbol allows become the empty symbol.
pub fn invoke_contract_args(contract: u8, function: &str) -> InvokeContractArgs {
    InvokeContractArgs {
        contract_address: contract_address(contract),
        function_name: ScSymbol(StringM::try_from(function).unwrap_or_default()),
        args: Default::default(),
    }
}

/// Authorization tree node.
pub fn invocation(
    function: SorobanAuthorizedFunction,
    children: Vec<SorobanAuthorizedInvocation>,
) -> SorobanAuthorizedInvocation {
    SorobanAuthorizedInvocation {
        function,
        sub_invocations: children.try_into().unwrap_or_default(),
    }
}

/// Chain of `nodes` contract calls, each the only child of the previous.
pub fn deep_invocation(nodes: usize) -> SorobanAuthorizedInvocation {
    let call = || SorobanAuthorizedFunction::ContractFn(invoke_contract_args(1, "nested"));
    let mut node = invocation(call(), vec![]);
    for _ in 1..nodes {
        node = invocation(call(), vec![node]);
    }
    node
}

/// Auth entry signed by the transaction source.
pub fn auth_entry(root_invocation: SorobanAuthorizedInvocation) -> SorobanAuthorizationEntry {
    SorobanAuthorizationEntry {
        credentials: SorobanCredentials::SourceAccount,
        root_invocation,
    }
}

/// `InvokeHostFunction` operation.
pub fn invoke_host_function_op(
    host_function: HostFunction,
    auth: Vec<SorobanAuthorizationEntry>,
) -> Operation {
    Operation {
        source_account: None,
        body: OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
            host_function,
            auth: auth.try_into().unwrap_or_default(),
        }),
    }
}

/// Top level `CreateContract` deployment.
pub fn deploy_contract_op(deployer: u8, salt: u8) -> Operation {
    invoke_host_function_op(
        HostFunction::CreateContract(create_contract_args(deployer, salt)),
        vec![],
    )
}

/// Call of `function` on contract `contract`.
pub fn invoke_contract_op(contract: u8, function: &str) -> Operation {
    invoke_host_function_op(
        HostFunction::InvokeContract(invoke_contract_args(contract, function)),
        vec![],
    )
}

/// Native payment to `destination`.
pub fn payment_op(destination: u8, amount: i64) -> Operation {
    Operation {
        source_account: None,
        body: OperationBody::Payment(PaymentOp {
            destination: MuxedAccount::Ed25519(Uint256([destination; 32])),
            asset: Asset::Native,
            amount,
        }),
    }
}

/// `ChangeTrust` for `code` issued by `issuer`.
pub fn change_trust_op(code: &str, issuer: u8, limit: i64) -> Operation {
    let line = if code.len() <= 4 {
        let mut bytes = [0u8; 4];
        bytes[..code.len()].copy_from_slice(code.as_bytes());
        ChangeTrustAsset::CreditAlphanum4(AlphaNum4 {
            asset_code: AssetCode4(bytes),
            issuer: account_id(issuer),
        })
    } else {
        let mut bytes = [0u8; 12];
        let len = code.len().min(12);
        bytes[..len].copy_from_slice(&code.as_bytes()[..len]);
        ChangeTrustAsset::CreditAlphanum12(AlphaNum12 {
            asset_code: AssetCode12(bytes),
            issuer: account_id(issuer),
        })
    };
    Operation {
        source_account: None,
        body: OperationBody::ChangeTrust(ChangeTrustOp { line, limit }),
    }
}

/// Set an explicit operation source.
pub fn with_source(mut operation: Operation, source: u8) -> Operation {
    operation.source_account = Some(MuxedAccount::Ed25519(Uint256([source; 32])));
    operation
}

/// Close time of fixture ledger `sequence`.
pub fn close_time(sequence: u32) -> i64 {
    GENESIS_CLOSE_TIME + i64::from(sequence) * 5
}

/// Transaction at 1-based `index` of ledger `ledger`, sourced by `source`.
///
/// The hash is derived from all three, so distinct positions never collide.
pub fn transaction(ledger: u32, index: u32, source: u8, operations: Vec<Operation>) -> TransactionView {
    let hash: [u8; 32] = Sha256::digest(format!("{ledger}:{index}:{source}").as_bytes()).into();
    TransactionView {
        ledger_sequence: ledger,
        ledger_close_time: close_time(ledger),
        hash,
        index,
        source_account: account_strkey(source),
        operations,
        envelope_xdr: Some("AAAAAgAAAAA=".to_string()),
        result_meta_xdr: Some("AAAAAwAAAAA=".to_string()),
    }
}

/// Ledger holding `transactions`.
pub fn ledger(sequence: u32, transactions: Vec<TransactionView>) -> LedgerRecord {
    LedgerRecord::new(sequence, close_time(sequence), transactions)
}

/// Ledger with `count` single-payment transactions from distinct sources.
pub fn payment_ledger(sequence: u32, count: u32) -> LedgerRecord {
    let transactions = (1..=count)
        .map(|index| transaction(sequence, index, index as u8, vec![payment_op(200, 10)]))
        .collect();
    ledger(sequence, transactions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deep_invocation_node_count() {
        let mut node = deep_invocation(5);
        let mut count = 1;
        while let Some(child) = node.sub_invocations.first().cloned() {
            node = child;
            count += 1;
        }
        assert_eq!(count, 5);
    }

    #[test]
    fn test_transaction_hashes_are_unique_per_position() {
        assert_ne!(transaction(1, 1, 1, vec![]).hash, transaction(1, 2, 1, vec![]).hash);
        assert_ne!(transaction(1, 1, 1, vec![]).hash, transaction(2, 1, 1, vec![]).hash);
    }

    #[test]
    fn test_symbol_name_round_trips() {
        let args = invoke_contract_args(1, "tw_new_single_release_escrow");
        let name: &[u8] = args.function_name.0.as_ref();
        assert_eq!(name, b"tw_new_single_release_escrow");
    }
}
