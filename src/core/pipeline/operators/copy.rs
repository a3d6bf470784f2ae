#![allow(clippy::result_large_err)]

use super::files::{map_file_set, require_files};
use crate::core::error::AppError;
use crate::core::pipeline::operator::{ExecutionContext, Operator};
use crate::core::pipeline::schema::StepDescriptor;
use crate::utils::files::copy_file;
use crate::utils::glob::ExpandOptions;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::fs;

/// Copies matched files unchanged.
pub struct CopyOperator;

impl CopyOperator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CopyOperator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Operator for CopyOperator {
    fn name(&self) -> &'static str {
        "copy"
    }

    fn validate(&self, step: &StepDescriptor) -> Result<(), AppError> {
        require_files(self.name(), step)
    }

    async fn execute(&self, step: StepDescriptor, ctx: ExecutionContext) -> Result<Value, AppError> {
        let mut copied = 0usize;
        let mut dirs = 0usize;
        for set in &step.files {
            let options = ExpandOptions {
                include_dirs: set.expand,
                require_literals: true,
                ..ExpandOptions::default()
            };
            for mapping in map_file_set(&ctx.project_root, set, options)? {
                if mapping.is_dir {
                    fs::create_dir_all(&mapping.dest)
                        .map_err(|err| AppError::io("create directory", &mapping.dest, err))?;
                    dirs += 1;
                } else {
                    copy_file(&mapping.src, &mapping.dest)?;
                    copied += 1;
                }
            }
        }
        tracing::debug!(step = %ctx.step_id, copied, dirs, "copy finished");
        Ok(json!({ "copied": copied, "dirs": dirs }))
    }
}
