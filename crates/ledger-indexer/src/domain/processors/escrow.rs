//! Escrow initialization extraction.

use stellar_xdr::curr::HostFunction;
use tracing::info;

use super::{invoke_host_function, OperationProcessor};
use crate::domain::contract_id::sc_address_strkey;
use crate::domain::entities::OperationView;
use crate::domain::errors::ProcessorError;
use crate::domain::state_change::{
    EscrowKind, StateChange, StateChangeBuilder, StateChangeCategory, StateChangeReason,
};
use crate::domain::value_objects::{MULTI_RELEASE_ESCROW_FN, SINGLE_RELEASE_ESCROW_FN};

impl EscrowKind {
    /// Escrow kind created by a contract function, if it is an escrow
    /// constructor.
    pub fn from_function_name(name: &[u8]) -> Option<Self> {
        if name == SINGLE_RELEASE_ESCROW_FN.as_bytes() {
            Some(Self::SingleRelease)
        } else if name == MULTI_RELEASE_ESCROW_FN.as_bytes() {
            Some(Self::MultiRelease)
        } else {
            None
        }
    }
}

/// Emits an `Escrow/Initialize` change when an operation calls one of the
/// escrow constructors.
#[derive(Debug, Clone, Default)]
pub struct EscrowInitializationProcessor;

impl EscrowInitializationProcessor {
    /// New processor.
    pub fn new() -> Self {
        Self
    }
}

impl OperationProcessor for EscrowInitializationProcessor {
    fn name(&self) -> &'static str {
        "initialize_escrow"
    }

    fn applies_to(&self, op: &OperationView<'_>) -> bool {
        invoke_host_function(op)
            .is_ok_and(|invoke| matches!(invoke.host_function, HostFunction::InvokeContract(_)))
    }

    fn process_operation(
        &self,
        op: &OperationView<'_>,
    ) -> Result<Vec<StateChange>, ProcessorError> {
        let invoke = invoke_host_function(op)?;
        let HostFunction::InvokeContract(args) = &invoke.host_function else {
            return Err(ProcessorError::NotApplicable);
        };

        let function_name: &[u8] = args.function_name.0.as_ref();
        let Some(kind) = EscrowKind::from_function_name(function_name) else {
            return Ok(Vec::new());
        };

        let contract_id = sc_address_strkey(&args.contract_address)?;
        let function_name = String::from_utf8_lossy(function_name).into_owned();
        info!(
            operation_id = op.id(),
            contract = %contract_id,
            kind = ?kind,
            "Escrow initialized"
        );

        let change = StateChangeBuilder::for_operation(op)
            .with_category(StateChangeCategory::Escrow)
            .with_reason(StateChangeReason::Initialize)
            .with_account(contract_id)
            .with_deployer(op.source_account())
            .with_function_name(function_name)
            .with_escrow_kind(kind)
            .build()?;
        Ok(vec![change])
    }
}
