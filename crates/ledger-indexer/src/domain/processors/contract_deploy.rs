//! Contract deployment extraction.

use std::collections::HashSet;

use stellar_xdr::curr::{
    ContractIdPreimage, ContractIdPreimageFromAddress, HostFunction, SorobanAuthorizedFunction,
};
use tracing::{debug, info};

use super::{invoke_host_function, is_invoke_host_function, OperationProcessor};
use crate::domain::contract_id::{derive_contract_id, sc_address_strkey, NetworkId};
use crate::domain::entities::OperationView;
use crate::domain::errors::ProcessorError;
use crate::domain::invocation::walk_invocation;
use crate::domain::state_change::{
    StateChange, StateChangeBuilder, StateChangeCategory, StateChangeReason,
};

/// Emits one `Account/Create` change per contract deployed by an operation.
///
/// Deployments are found in the host function itself and in every
/// authorization tree. A contract reachable through several paths is
/// reported once, at its first occurrence.
#[derive(Debug, Clone)]
pub struct ContractDeploymentProcessor {
    network_id: NetworkId,
}

impl ContractDeploymentProcessor {
    /// Processor deriving contract ids for `network_id`.
    pub fn new(network_id: NetworkId) -> Self {
        Self { network_id }
    }
}

struct Deployments<'a> {
    network_id: &'a NetworkId,
    builder: StateChangeBuilder,
    seen: HashSet<String>,
    changes: Vec<StateChange>,
}

impl Deployments<'_> {
    fn record_preimage(&mut self, preimage: &ContractIdPreimage) -> Result<(), ProcessorError> {
        match preimage {
            ContractIdPreimage::Address(from_address) => self.record_creation(from_address),
            ContractIdPreimage::Asset(_) => Ok(()),
        }
    }

    fn record_creation(
        &mut self,
        from_address: &ContractIdPreimageFromAddress,
    ) -> Result<(), ProcessorError> {
        let contract_id = derive_contract_id(self.network_id, from_address)?;
        if !self.seen.insert(contract_id.clone()) {
            return Ok(());
        }
        let deployer = sc_address_strkey(&from_address.address)?;
        let change = self
            .builder
            .clone()
            .with_account(contract_id)
            .with_deployer(deployer)
            .build()?;
        self.changes.push(change);
        Ok(())
    }
}

impl OperationProcessor for ContractDeploymentProcessor {
    fn name(&self) -> &'static str {
        "contract_deploy"
    }

    fn applies_to(&self, op: &OperationView<'_>) -> bool {
        is_invoke_host_function(op)
    }

    fn process_operation(
        &self,
        op: &OperationView<'_>,
    ) -> Result<Vec<StateChange>, ProcessorError> {
        let invoke = invoke_host_function(op)?;
        let operation_id = op.id();

        let mut deployments = Deployments {
            network_id: &self.network_id,
            builder: StateChangeBuilder::for_operation(op)
                .with_category(StateChangeCategory::Account)
                .with_reason(StateChangeReason::Create),
            seen: HashSet::new(),
            changes: Vec::new(),
        };

        match &invoke.host_function {
            HostFunction::CreateContract(args) => {
                if matches!(args.contract_id_preimage, ContractIdPreimage::Asset(_)) {
                    debug!(operation_id, "CreateContract with asset preimage");
                }
                deployments.record_preimage(&args.contract_id_preimage)?;
            }
            HostFunction::CreateContractV2(args) => {
                if matches!(args.contract_id_preimage, ContractIdPreimage::Asset(_)) {
                    debug!(operation_id, "CreateContractV2 with asset preimage");
                }
                deployments.record_preimage(&args.contract_id_preimage)?;
            }
            HostFunction::UploadContractWasm(_) => {
                debug!(operation_id, "UploadContractWasm");
            }
            HostFunction::InvokeContract(args) => {
                debug!(
                    operation_id,
                    function = %String::from_utf8_lossy(args.function_name.0.as_ref()),
                    args = args.args.len(),
                    "InvokeContract"
                );
            }
        }

        for entry in invoke.auth.iter() {
            walk_invocation(&entry.root_invocation, &mut |node, _depth| {
                match &node.function {
                    SorobanAuthorizedFunction::CreateContractHostFn(args) => {
                        deployments.record_preimage(&args.contract_id_preimage)
                    }
                    SorobanAuthorizedFunction::CreateContractV2HostFn(args) => {
                        deployments.record_preimage(&args.contract_id_preimage)
                    }
                    SorobanAuthorizedFunction::ContractFn(_) => Ok(()),
                }
            })?;
        }

        if !deployments.changes.is_empty() {
            let contract_ids: Vec<&str> = deployments
                .changes
                .iter()
                .filter_map(|c| c.account_id.as_deref())
                .collect();
            info!(
                operation_id,
                tx_hash = %op.transaction.hash_hex(),
                total = contract_ids.len(),
                ids = ?contract_ids,
                "Contract deployments"
            );
        }

        Ok(deployments.changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn processor() -> ContractDeploymentProcessor {
        ContractDeploymentProcessor::new(NetworkId::testnet())
    }

    fn create_fn(deployer: u8, salt: u8) -> SorobanAuthorizedFunction {
        SorobanAuthorizedFunction::CreateContractHostFn(fixtures::create_contract_args(
            deployer, salt,
        ))
    }

    fn create_v2_fn(deployer: u8, salt: u8) -> SorobanAuthorizedFunction {
        SorobanAuthorizedFunction::CreateContractV2HostFn(fixtures::create_contract_args_v2(
            deployer, salt,
        ))
    }

    fn call_fn(name: &str) -> SorobanAuthorizedFunction {
        SorobanAuthorizedFunction::ContractFn(fixtures::invoke_contract_args(7, name))
    }

    fn run(op: stellar_xdr::curr::Operation) -> Result<Vec<StateChange>, ProcessorError> {
        let tx = fixtures::transaction(200, 4, 1, vec![op]);
        let view = tx.operation_views().next().unwrap();
        processor().process_operation(&view)
    }

    #[test]
    fn test_top_level_create_contract() {
        let op = fixtures::invoke_host_function_op(
            HostFunction::CreateContract(fixtures::create_contract_args(2, 1)),
            vec![],
        );
        let changes = run(op).unwrap();

        let expected =
            derive_contract_id(&NetworkId::testnet(), &fixtures::address_preimage(2, 1)).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].account_id.as_deref(), Some(expected.as_str()));
        assert_eq!(
            changes[0].deployer_account_id,
            Some(fixtures::account_strkey(2))
        );
        assert_eq!(changes[0].category, StateChangeCategory::Account);
        assert_eq!(changes[0].reason, StateChangeReason::Create);
        assert_eq!(changes[0].ledger_number, 200);
    }

    #[test]
    fn test_derivation_is_deterministic_across_runs() {
        let op = fixtures::invoke_host_function_op(
            HostFunction::CreateContractV2(fixtures::create_contract_args_v2(3, 8)),
            vec![],
        );
        let a = run(op.clone()).unwrap();
        let b = run(op).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_nested_deployments_in_auth_tree() {
        let tree = fixtures::invocation(
            call_fn("deploy_many"),
            vec![
                fixtures::invocation(create_fn(2, 1), vec![]),
                fixtures::invocation(
                    call_fn("inner"),
                    vec![fixtures::invocation(create_v2_fn(2, 2), vec![])],
                ),
            ],
        );
        let op = fixtures::invoke_host_function_op(
            HostFunction::InvokeContract(fixtures::invoke_contract_args(7, "deploy_many")),
            vec![fixtures::auth_entry(tree)],
        );
        let changes = run(op).unwrap();
        assert_eq!(changes.len(), 2);

        let network = NetworkId::testnet();
        let first = derive_contract_id(&network, &fixtures::address_preimage(2, 1)).unwrap();
        let second = derive_contract_id(&network, &fixtures::address_preimage(2, 2)).unwrap();
        assert_eq!(changes[0].account_id.as_deref(), Some(first.as_str()));
        assert_eq!(changes[1].account_id.as_deref(), Some(second.as_str()));
    }

    #[test]
    fn test_same_contract_via_two_paths_reported_once() {
        let first_path = fixtures::invocation(
            call_fn("a"),
            vec![fixtures::invocation(create_fn(5, 5), vec![])],
        );
        let second_path = fixtures::invocation(
            call_fn("b"),
            vec![fixtures::invocation(
                call_fn("c"),
                vec![fixtures::invocation(create_v2_fn(5, 5), vec![])],
            )],
        );
        let op = fixtures::invoke_host_function_op(
            HostFunction::CreateContract(fixtures::create_contract_args(5, 5)),
            vec![fixtures::auth_entry(first_path), fixtures::auth_entry(second_path)],
        );
        let changes = run(op).unwrap();
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn test_asset_preimage_and_upload_are_skipped() {
        let mut args = fixtures::create_contract_args(1, 1);
        args.contract_id_preimage =
            ContractIdPreimage::Asset(stellar_xdr::curr::Asset::Native);
        let op = fixtures::invoke_host_function_op(HostFunction::CreateContract(args), vec![]);
        assert!(run(op).unwrap().is_empty());

        let op = fixtures::invoke_host_function_op(
            HostFunction::UploadContractWasm(vec![0u8; 8].try_into().unwrap()),
            vec![],
        );
        assert!(run(op).unwrap().is_empty());
    }

    #[test]
    fn test_non_invoke_operation_not_applicable() {
        let result = run(fixtures::payment_op(2, 10));
        assert!(matches!(result, Err(ProcessorError::NotApplicable)));

        let tx = fixtures::transaction(1, 1, 1, vec![fixtures::payment_op(2, 10)]);
        let view = tx.operation_views().next().unwrap();
        assert!(!processor().applies_to(&view));
    }

    #[test]
    fn test_too_deep_auth_tree_fails() {
        let op = fixtures::invoke_host_function_op(
            HostFunction::InvokeContract(fixtures::invoke_contract_args(7, "deep")),
            vec![fixtures::auth_entry(fixtures::deep_invocation(
                crate::domain::MAX_INVOCATION_DEPTH + 1,
            ))],
        );
        assert!(matches!(run(op), Err(ProcessorError::InvocationDepth(_))));
    }
}
