#![allow(clippy::result_large_err)]

use super::files::string_list;
use crate::core::error::AppError;
use crate::core::pipeline::operator::{ExecutionContext, Operator};
use crate::core::pipeline::schema::StepDescriptor;
use crate::core::types::ErrorCategory;
use crate::utils::files::{is_contained, remove_path};
use crate::utils::glob::{expand, ExpandOptions, GlobPattern};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Deletes every path matched by `params` (a pattern list relative to the project root).
pub struct CleanOperator;

impl CleanOperator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CleanOperator {
    fn default() -> Self {
        Self::new()
    }
}

fn patterns(step: &StepDescriptor) -> Vec<String> {
    string_list(Some(&step.params))
}

#[async_trait]
impl Operator for CleanOperator {
    fn name(&self) -> &'static str {
        "clean"
    }

    fn validate(&self, step: &StepDescriptor) -> Result<(), AppError> {
        let patterns = patterns(step);
        if patterns.is_empty() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "clean step needs params: a pattern or a list of patterns",
            )
            .with_code("BW-OP-001"));
        }
        for raw in &patterns {
            let pattern = GlobPattern::new(raw)?;
            if pattern.is_negated() {
                continue;
            }
            let body = pattern.body();
            if body == "." || !is_contained(Path::new(&body)) {
                return Err(AppError::new(
                    ErrorCategory::ValidationError,
                    format!("refusing to clean '{}': it is not inside the project", raw),
                )
                .with_code("BW-OP-003"));
            }
        }
        Ok(())
    }

    async fn execute(&self, step: StepDescriptor, ctx: ExecutionContext) -> Result<Value, AppError> {
        let options = ExpandOptions {
            include_dirs: true,
            ..ExpandOptions::default()
        };
        let mut matches: Vec<PathBuf> = expand(&ctx.project_root, &patterns(&step), options)?;
        matches.sort_by_key(|path| path.components().count());

        let mut removed = 0usize;
        for relative in matches {
            let target = ctx.project_root.join(&relative);
            // Already gone with a removed parent.
            if !target.exists() {
                continue;
            }
            remove_path(&target)?;
            tracing::debug!(path = %target.display(), "removed");
            removed += 1;
        }
        Ok(json!({ "removed": removed }))
    }
}
