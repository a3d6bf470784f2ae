#![allow(clippy::result_large_err)]

use super::files::{map_file_set, require_files};
use crate::core::error::AppError;
use crate::core::pipeline::operator::{ExecutionContext, Operator};
use crate::core::pipeline::schema::StepDescriptor;
use crate::core::types::ErrorCategory;
use crate::utils::files::{read_text, resolve, slash_path, write_text};
use crate::utils::glob::ExpandOptions;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Joins matched files, in `src` order, into one destination per file set.
pub struct ConcatOperator;

impl ConcatOperator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConcatOperator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Operator for ConcatOperator {
    fn name(&self) -> &'static str {
        "concat"
    }

    fn validate(&self, step: &StepDescriptor) -> Result<(), AppError> {
        require_files(self.name(), step)?;
        if step.files.iter().any(|set| set.dest.as_deref().map_or(true, str::is_empty)) {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "every concat file set needs a dest",
            )
            .with_code("BW-OP-001"));
        }
        Ok(())
    }

    async fn execute(&self, step: StepDescriptor, ctx: ExecutionContext) -> Result<Value, AppError> {
        let separator = step.option_str("separator").unwrap_or("\n");
        let options = ExpandOptions {
            keep_duplicates: true,
            require_literals: true,
            ..ExpandOptions::default()
        };

        let mut written = Vec::new();
        let mut total = 0usize;
        for set in &step.files {
            let Some(dest) = set.dest.as_deref() else {
                continue;
            };
            let mut parts = Vec::new();
            for mapping in map_file_set(&ctx.project_root, set, options)? {
                parts.push(read_text(&mapping.src)?);
            }
            let dest = resolve(&ctx.project_root, dest);
            write_text(&dest, &parts.join(separator))?;
            tracing::debug!(dest = %dest.display(), files = parts.len(), "concatenated");
            total += parts.len();
            written.push(slash_path(dest.strip_prefix(&ctx.project_root).unwrap_or(&dest)));
        }

        Ok(json!({ "files": total, "dest": written }))
    }
}
