#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::pipeline::graph::{ReferenceGraph, ResolvedPipeline, Slot};
use crate::core::pipeline::plan::build_plan;
use crate::core::pipeline::schema::split_step_id;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Output produced by `bundlewright explain`.
#[derive(Debug, Clone, Serialize)]
pub struct ExplainOutput {
    pub target: String,
    pub plan: Vec<String>,
    pub meta: Map<String, Value>,
    pub steps: Vec<StepExplain>,
    /// Declared steps no task ever runs.
    pub unscheduled: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepExplain {
    pub id: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub options: Value,
    pub files: Value,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub params: Value,
    /// Values read from other steps, e.g. `fingerprint.compile.outputs.dir`.
    pub reads: Vec<String>,
    /// Output placeholders still pending until the producing step runs.
    pub runtime: Vec<String>,
}

/// Build the explainability snapshot for the steps `target` would run.
pub fn build_explain_output(
    pipeline: &ResolvedPipeline,
    graph: &ReferenceGraph,
    target: &str,
) -> Result<ExplainOutput, AppError> {
    let plan = build_plan(pipeline, target)?;
    let mut steps = Vec::with_capacity(plan.steps.len());
    let mut seen = HashSet::new();

    for id in &plan.steps {
        if !seen.insert(id.clone()) {
            continue;
        }
        let Some(step) = pipeline.steps.get(id) else {
            continue;
        };
        let runtime = pipeline
            .runtime_references(id)?
            .iter()
            .map(ToString::to_string)
            .collect();
        steps.push(StepExplain {
            id: id.clone(),
            kind: split_step_id(id).map(|(kind, _)| kind).unwrap_or(id).to_string(),
            description: step.description.clone(),
            options: step.options.clone(),
            files: serde_json::to_value(&step.files).unwrap_or(Value::Null),
            params: step.params.clone(),
            reads: reads_of(graph, id),
            runtime,
        });
    }

    Ok(ExplainOutput {
        target: plan.target.clone(),
        plan: plan.steps,
        meta: pipeline.meta.clone(),
        steps,
        unscheduled: unscheduled_steps(pipeline),
    })
}

/// Slots of other steps that `step_id` (its options, files or params) reads.
fn reads_of(graph: &ReferenceGraph, step_id: &str) -> Vec<String> {
    let mut sources: Vec<Slot> = graph.dependencies_of(&Slot::Step(step_id.to_string()));
    let own_options: Vec<Slot> = sources
        .iter()
        .filter(|slot| matches!(slot, Slot::Option { step, .. } if step == step_id))
        .cloned()
        .collect();
    for option in &own_options {
        sources.extend(graph.dependencies_of(option));
    }

    let mut reads: Vec<String> = sources
        .into_iter()
        .filter(|slot| match slot {
            Slot::Option { step, .. } | Slot::Output { step, .. } => step != step_id,
            Slot::Meta(_) => true,
            Slot::Step(_) => false,
        })
        .map(|slot| slot.to_string())
        .collect();
    reads.sort();
    reads.dedup();
    reads
}

/// Ids of declared steps that no task alias reaches, in declaration order.
pub fn unscheduled_steps(pipeline: &ResolvedPipeline) -> Vec<String> {
    let mut scheduled = HashSet::new();
    for name in pipeline.tasks.keys() {
        if let Ok(plan) = build_plan(pipeline, name) {
            scheduled.extend(plan.steps);
        }
    }
    pipeline
        .steps
        .keys()
        .filter(|id| !scheduled.contains(*id))
        .cloned()
        .collect()
}
