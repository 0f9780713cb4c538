//! # Operation Processors
//!
//! Pluggable extractors turning one operation into zero or more state
//! changes.
//!
//! | Processor | Name | Operations |
//! |-----------|------|------------|
//! | [`ContractDeploymentProcessor`] | `contract_deploy` | `InvokeHostFunction` creating contracts, top level or nested in auth trees |
//! | [`EscrowInitializationProcessor`] | `initialize_escrow` | `InvokeHostFunction` calling an escrow constructor |
//!
//! Returning [`ProcessorError::NotApplicable`] means "skip", not failure.

mod contract_deploy;
mod escrow;

pub use contract_deploy::ContractDeploymentProcessor;
pub use escrow::EscrowInitializationProcessor;

use std::sync::Arc;

use stellar_xdr::curr::{InvokeHostFunctionOp, OperationBody, OperationType};
use tracing::debug;

use super::contract_id::NetworkId;
use super::entities::OperationView;
use super::errors::{IndexerError, ProcessorError};
use super::state_change::StateChange;

/// Extracts state changes from one operation.
pub trait OperationProcessor: Send + Sync {
    /// Stable name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Cheap pre-filter; the registry only calls processors that accept.
    fn applies_to(&self, op: &OperationView<'_>) -> bool;

    /// State changes for the operation, in emission order.
    fn process_operation(&self, op: &OperationView<'_>)
        -> Result<Vec<StateChange>, ProcessorError>;
}

/// Ordered set of processors run against every operation.
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    processors: Vec<Arc<dyn OperationProcessor>>,
}

impl ProcessorRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Contract deployment followed by escrow initialization.
    pub fn standard(network_id: NetworkId) -> Self {
        Self::new()
            .with(Arc::new(ContractDeploymentProcessor::new(network_id)))
            .with(Arc::new(EscrowInitializationProcessor::new()))
    }

    /// Append a processor.
    pub fn with(mut self, processor: Arc<dyn OperationProcessor>) -> Self {
        self.register(processor);
        self
    }

    /// Append a processor in place.
    pub fn register(&mut self, processor: Arc<dyn OperationProcessor>) {
        self.processors.push(processor);
    }

    /// Registered processor names, in run order.
    pub fn names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Number of processors.
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Whether no processor is registered.
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Run every applicable processor and concatenate their output.
    pub fn process(&self, op: &OperationView<'_>) -> Result<Vec<StateChange>, IndexerError> {
        let mut changes = Vec::new();
        for processor in self.processors.iter().filter(|p| p.applies_to(op)) {
            match processor.process_operation(op) {
                Ok(mut produced) => changes.append(&mut produced),
                Err(ProcessorError::NotApplicable) => {
                    debug!(
                        processor = processor.name(),
                        operation_id = op.id(),
                        kind = op.kind().name(),
                        "Processor skipped operation"
                    );
                }
                Err(source) => {
                    return Err(IndexerError::Processor {
                        processor: processor.name(),
                        operation_id: op.id(),
                        source,
                    })
                }
            }
        }
        Ok(changes)
    }
}

impl std::fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("processors", &self.names())
            .finish()
    }
}

/// The `InvokeHostFunction` body of an operation, or `NotApplicable`.
pub fn invoke_host_function<'a>(
    op: &OperationView<'a>,
) -> Result<&'a InvokeHostFunctionOp, ProcessorError> {
    match op.body() {
        OperationBody::InvokeHostFunction(invoke) => Ok(invoke),
        _ => Err(ProcessorError::NotApplicable),
    }
}

pub(crate) fn is_invoke_host_function(op: &OperationView<'_>) -> bool {
    op.kind() == OperationType::InvokeHostFunction
}
