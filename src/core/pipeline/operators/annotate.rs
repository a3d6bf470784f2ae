#![allow(clippy::result_large_err)]

use super::files::{asset_error, require_files, transform_files};
use crate::core::assets::annotate;
use crate::core::error::AppError;
use crate::core::pipeline::operator::{ExecutionContext, Operator};
use crate::core::pipeline::schema::StepDescriptor;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Adds array-notation DI annotations to AngularJS registrations.
pub struct NgAnnotateOperator;

impl NgAnnotateOperator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NgAnnotateOperator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Operator for NgAnnotateOperator {
    fn name(&self) -> &'static str {
        "ngAnnotate"
    }

    fn validate(&self, step: &StepDescriptor) -> Result<(), AppError> {
        require_files(self.name(), step)
    }

    async fn execute(&self, step: StepDescriptor, ctx: ExecutionContext) -> Result<Value, AppError> {
        let mut annotations = 0usize;
        let files = transform_files(&ctx.project_root, &step, |mapping, content| {
            let result = annotate(content).map_err(|err| asset_error("BW-ASSET-001", &mapping.src, err))?;
            annotations += result.annotations;
            Ok(result.code)
        })?;
        tracing::debug!(step = %ctx.step_id, files, annotations, "annotated");
        Ok(json!({ "files": files, "annotations": annotations }))
    }
}
