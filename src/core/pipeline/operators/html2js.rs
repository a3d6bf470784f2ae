#![allow(clippy::result_large_err)]

use super::files::{map_step_files, required_str};
use crate::core::assets::template_cache_script;
use crate::core::error::AppError;
use crate::core::pipeline::operator::{ExecutionContext, Operator};
use crate::core::pipeline::schema::StepDescriptor;
use crate::core::types::ErrorCategory;
use crate::utils::files::{read_text, resolve, slash_path, write_text};
use crate::utils::glob::ExpandOptions;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::PathBuf;

/// Bundles HTML templates into a script that preloads `$templateCache`.
#[derive(Default)]
pub struct Html2JsOperator;

impl Html2JsOperator {
    /// Output file: `options.out`, else the first file set's `rename`.
    fn target(step: &StepDescriptor) -> Option<&str> {
        step.option_str("out")
            .filter(|out| !out.trim().is_empty())
            .or_else(|| step.files.iter().find_map(|set| set.rename.as_deref()))
    }
}

#[async_trait]
impl Operator for Html2JsOperator {
    fn name(&self) -> &'static str {
        "html2js"
    }

    fn validate(&self, step: &StepDescriptor) -> Result<(), AppError> {
        required_str(self.name(), step, "module")?;
        if Self::target(step).is_none() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "html2js step needs options.out or a rename target",
            )
            .with_code("BW-OP-001"));
        }
        Ok(())
    }

    async fn execute(&self, step: StepDescriptor, ctx: ExecutionContext) -> Result<Value, AppError> {
        let module = required_str(self.name(), &step, "module")?;
        let out = Self::target(&step).map(|out| resolve(&ctx.project_root, out)).ok_or_else(|| {
            AppError::new(ErrorCategory::ValidationError, "html2js step has no output file")
                .with_code("BW-OP-001")
        })?;
        let base: Option<PathBuf> = step
            .option_str("base")
            .map(|base| resolve(&ctx.project_root, base));

        let mut templates = Vec::new();
        for mapping in map_step_files(&ctx.project_root, &step, ExpandOptions::default())? {
            let key = base
                .as_ref()
                .and_then(|base| mapping.src.strip_prefix(base).ok())
                .map(slash_path)
                .unwrap_or_else(|| mapping.relative.clone());
            templates.push((key, read_text(&mapping.src)?));
        }
        templates.sort_by(|a, b| a.0.cmp(&b.0));
        templates.dedup_by(|a, b| a.0 == b.0);

        write_text(&out, &template_cache_script(module, &templates))?;
        tracing::debug!(out = %out.display(), templates = templates.len(), "template cache written");
        Ok(json!({
            "templates": templates.iter().map(|(key, _)| key.clone()).collect::<Vec<_>>(),
            "out": slash_path(out.strip_prefix(&ctx.project_root).unwrap_or(&out)),
        }))
    }
}
