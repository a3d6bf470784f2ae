#![allow(clippy::result_large_err)] // Executor returns AppError to preserve full diagnostic context; boxing would discard run-time state.

use crate::core::error::AppError;
use crate::core::pipeline::graph::ResolvedPipeline;
use crate::core::pipeline::operator::{ExecutionContext, OperatorRegistry};
use crate::core::pipeline::placeholder::{lookup_path, substitute, Reference};
use crate::core::pipeline::plan::ExecutionPlan;
use crate::core::pipeline::schema::{split_step_id, StepDescriptor};
use crate::core::types::{ErrorCategory, StepStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

/// Record describing one step run.
#[derive(Debug, Clone, Serialize)]
pub struct StepRunRecord {
    pub step_id: String,
    pub status: StepStatus,
    pub output: Value,
    pub error_code: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl StepRunRecord {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// Summary of a pipeline run.
///
/// A failed run still carries a record per planned step: the failing step is
/// `Failed`, every later one `Skipped`.
#[derive(Debug, Serialize)]
pub struct ExecutionSummary {
    pub run_id: Uuid,
    pub target: String,
    pub records: Vec<StepRunRecord>,
    #[serde(skip)]
    pub error: Option<AppError>,
}

impl ExecutionSummary {
    pub fn total_duration(&self) -> Duration {
        self.records.iter().map(StepRunRecord::duration).sum()
    }

    pub fn record(&self, step_id: &str) -> Option<&StepRunRecord> {
        self.records.iter().rev().find(|record| record.step_id == step_id)
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// Turn a failed run into its error.
    pub fn into_result(mut self) -> Result<ExecutionSummary, AppError> {
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

/// Run every step of the plan in order, stopping at the first failure.
///
/// Outputs published by a step are substituted into later steps right before
/// they run. Nothing written by earlier steps is rolled back on failure.
pub async fn execute_plan(
    pipeline: &ResolvedPipeline,
    plan: &ExecutionPlan,
    registry: &OperatorRegistry,
    project_root: &Path,
) -> ExecutionSummary {
    let run_id = Uuid::new_v4();
    let mut outputs: HashMap<String, Value> = HashMap::new();
    let mut records = Vec::with_capacity(plan.steps.len());
    let mut failure: Option<AppError> = None;

    tracing::info!(
        run_id = %run_id,
        target = %plan.target,
        steps = plan.steps.len(),
        "starting pipeline"
    );

    for (position, step_id) in plan.steps.iter().enumerate() {
        if failure.is_some() {
            let now = Utc::now();
            records.push(StepRunRecord {
                step_id: step_id.clone(),
                status: StepStatus::Skipped,
                output: Value::Null,
                error_code: None,
                started_at: now,
                completed_at: now,
                duration_ms: 0,
            });
            continue;
        }

        let span = tracing::info_span!("step", step = %step_id, position = position + 1);
        let started_at = Utc::now();
        let result = run_step(pipeline, registry, project_root, &run_id, step_id, &outputs)
            .instrument(span)
            .await;
        let completed_at = Utc::now();
        let duration_ms = completed_at
            .signed_duration_since(started_at)
            .num_milliseconds()
            .max(0) as u64;

        match result {
            Ok(output) => {
                tracing::info!(
                    step = %step_id,
                    duration = %humantime::format_duration(Duration::from_millis(duration_ms)),
                    "step finished"
                );
                if output.is_object() {
                    outputs.insert(step_id.clone(), output.clone());
                }
                records.push(StepRunRecord {
                    step_id: step_id.clone(),
                    status: StepStatus::Success,
                    output,
                    error_code: None,
                    started_at,
                    completed_at,
                    duration_ms,
                });
            }
            Err(mut err) => {
                tracing::error!(
                    step = %step_id,
                    code = %err.code,
                    remaining = plan.steps.len() - position - 1,
                    "step failed: {}",
                    err.message
                );
                records.push(StepRunRecord {
                    step_id: step_id.clone(),
                    status: StepStatus::Failed,
                    output: Value::String(err.message.clone()),
                    error_code: Some(err.code.clone()),
                    started_at,
                    completed_at,
                    duration_ms,
                });
                err.add_context("step", step_id);
                failure = Some(err);
            }
        }
    }

    let summary = ExecutionSummary {
        run_id,
        target: plan.target.clone(),
        records,
        error: failure,
    };
    if summary.succeeded() {
        tracing::info!(
            run_id = %run_id,
            duration = %humantime::format_duration(summary.total_duration()),
            "pipeline finished"
        );
    }
    summary
}

async fn run_step(
    pipeline: &ResolvedPipeline,
    registry: &OperatorRegistry,
    project_root: &Path,
    run_id: &Uuid,
    step_id: &str,
    outputs: &HashMap<String, Value>,
) -> Result<Value, AppError> {
    let descriptor = pipeline.steps.get(step_id).ok_or_else(|| {
        AppError::new(
            ErrorCategory::InternalError,
            format!("planned step {} is not declared", step_id),
        )
        .with_code("BW-EXEC-001")
    })?;
    let kind = split_step_id(step_id).map(|(kind, _)| kind).unwrap_or(step_id);
    let operator = registry.get(kind).ok_or_else(|| {
        AppError::new(
            ErrorCategory::ValidationError,
            format!("no operator registered for step kind '{}'", kind),
        )
        .with_code("BW-EXEC-002")
    })?;

    let step = resolve_runtime(descriptor, outputs)?;
    operator.validate(&step)?;

    tracing::info!("running {}", step_id);
    let ctx = ExecutionContext {
        project_root: project_root.to_path_buf(),
        run_id: run_id.to_string(),
        step_id: step_id.to_string(),
    };
    operator.execute(step, ctx).await
}

/// Substitute runtime output references; anything left unresolved is an error.
pub fn resolve_runtime(
    step: &StepDescriptor,
    outputs: &HashMap<String, Value>,
) -> Result<StepDescriptor, AppError> {
    let value = serde_json::to_value(step).map_err(|err| {
        AppError::new(
            ErrorCategory::SerializationError,
            format!("failed to serialize step: {}", err),
        )
    })?;

    let mut lookup = |reference: &Reference| -> Result<Option<Value>, AppError> {
        let found = match reference {
            Reference::StepOutput { step, key } => outputs
                .get(step)
                .and_then(|output| lookup_path(output, key))
                .cloned(),
            _ => None,
        };
        found.map(Some).ok_or_else(|| {
            AppError::new(
                ErrorCategory::ReferenceError,
                format!("placeholder <%= {} %> is unresolved at run time", reference),
            )
            .with_code("BW-REF-005")
        })
    };
    let resolved = substitute(&value, &mut lookup)?;

    serde_json::from_value(resolved).map_err(|err| {
        AppError::new(
            ErrorCategory::ValidationError,
            format!("step is malformed after substitution: {}", err),
        )
        .with_code("BW-PIPE-003")
    })
}
