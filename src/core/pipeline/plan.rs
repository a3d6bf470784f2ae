#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::pipeline::graph::ResolvedPipeline;
use crate::core::types::ErrorCategory;
use serde::Serialize;

/// Ordered list of steps a task expands to.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub target: String,
    pub steps: Vec<String>,
}

/// Expand a task alias (or a single step id) into the steps it runs, in order.
///
/// A step reached more than once runs only at its first position. Rejects
/// unknown names, alias cycles, and steps that read a runtime output before
/// the producing step has run.
pub fn build_plan(pipeline: &ResolvedPipeline, target: &str) -> Result<ExecutionPlan, AppError> {
    let mut steps = Vec::new();
    let mut stack = Vec::new();
    expand(pipeline, target, &mut stack, &mut steps)?;

    for (position, step_id) in steps.iter().enumerate() {
        for reference in pipeline.runtime_references(step_id)? {
            let Some(producer) = reference.step() else {
                continue;
            };
            if !steps[..position].iter().any(|earlier| earlier == producer) {
                return Err(AppError::new(
                    ErrorCategory::ValidationError,
                    format!(
                        "step {} reads <%= {} %> but {} is not scheduled before it in '{}'",
                        step_id, reference, producer, target
                    ),
                )
                .with_code("BW-PLAN-003")
                .with_suggestion(format!("run {} earlier in the same task", producer)));
            }
        }
    }

    Ok(ExecutionPlan {
        target: target.to_string(),
        steps,
    })
}

fn expand(
    pipeline: &ResolvedPipeline,
    name: &str,
    stack: &mut Vec<String>,
    out: &mut Vec<String>,
) -> Result<(), AppError> {
    if pipeline.steps.contains_key(name) {
        if out.iter().any(|planned| planned == name) {
            tracing::debug!(step = name, "step already planned; skipping repeat");
        } else {
            out.push(name.to_string());
        }
        return Ok(());
    }

    let Some(members) = pipeline.tasks.get(name) else {
        let mut known: Vec<&str> = pipeline.tasks.keys().map(String::as_str).collect();
        known.sort_unstable();
        let context = stack.last().map(String::as_str).unwrap_or("command line");
        return Err(AppError::new(
            ErrorCategory::ValidationError,
            format!(
                "unknown task or step '{}' (referenced from {}); known tasks: {}",
                name,
                context,
                known.join(", ")
            ),
        )
        .with_code("BW-PLAN-001"));
    };

    if stack.iter().any(|open| open == name) {
        let mut chain = stack.clone();
        chain.push(name.to_string());
        return Err(AppError::new(
            ErrorCategory::ValidationError,
            format!("task aliases form a cycle: {}", chain.join(" -> ")),
        )
        .with_code("BW-PLAN-002"));
    }

    stack.push(name.to_string());
    for member in members {
        expand(pipeline, member, stack, out)?;
    }
    stack.pop();
    Ok(())
}
