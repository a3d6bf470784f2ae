#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::pipeline::schema::StepDescriptor;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Execution context provided to each operator run.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    /// Directory every relative path in a step is resolved against.
    pub project_root: PathBuf,
    pub run_id: String,
    pub step_id: String,
}

/// Trait implemented by pipeline step handlers.
#[async_trait]
pub trait Operator: Send + Sync + 'static {
    /// Step kind handled by this operator (the part of a step id before the first dot).
    fn name(&self) -> &'static str;

    /// Keys of the output object other steps may reference via `outputs.`.
    fn outputs(&self) -> &'static [&'static str] {
        &[]
    }

    /// Validate the step shape ahead of execution.
    fn validate(&self, step: &StepDescriptor) -> Result<(), AppError>;

    /// Execute the step with every placeholder resolved.
    async fn execute(&self, step: StepDescriptor, ctx: ExecutionContext) -> Result<Value, AppError>;
}

/// Collects step handlers keyed by kind.
#[derive(Default)]
pub struct OperatorRegistryBuilder {
    operators: BTreeMap<&'static str, Arc<dyn Operator>>,
}

impl OperatorRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `operator` under its kind; a later registration replaces an earlier one.
    pub fn register<T: Operator>(&mut self, operator: T) -> &mut Self {
        let kind = operator.name();
        if self.operators.insert(kind, Arc::new(operator)).is_some() {
            tracing::warn!(kind, "operator kind registered twice, keeping the last one");
        }
        self
    }

    pub fn build(self) -> OperatorRegistry {
        OperatorRegistry {
            operators: Arc::new(self.operators),
        }
    }
}

/// Shared, read-only lookup from step kind to handler.
#[derive(Clone, Default)]
pub struct OperatorRegistry {
    operators: Arc<BTreeMap<&'static str, Arc<dyn Operator>>>,
}

impl OperatorRegistry {
    pub fn builder() -> OperatorRegistryBuilder {
        OperatorRegistryBuilder::new()
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn Operator>> {
        self.operators.get(kind).cloned()
    }

    /// Registered step kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        self.operators.keys().copied().collect()
    }
}
