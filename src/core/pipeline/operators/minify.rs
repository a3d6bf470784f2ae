#![allow(clippy::result_large_err)]

//! Minifying operators for scripts, stylesheets, JSON and HTML.

use super::files::{asset_error, banner, require_files, transform_files};
use crate::core::assets::{minify_css_with_banner, minify_html, minify_js_with_banner};
use crate::core::error::AppError;
use crate::core::pipeline::operator::{ExecutionContext, Operator};
use crate::core::pipeline::schema::StepDescriptor;
use async_trait::async_trait;
use serde_json::{json, Value};

#[derive(Default)]
pub struct UglifyOperator;

#[async_trait]
impl Operator for UglifyOperator {
    fn name(&self) -> &'static str {
        "uglify"
    }

    fn validate(&self, step: &StepDescriptor) -> Result<(), AppError> {
        require_files(self.name(), step)
    }

    async fn execute(&self, step: StepDescriptor, ctx: ExecutionContext) -> Result<Value, AppError> {
        let banner = banner(&step).to_string();
        let files = transform_files(&ctx.project_root, &step, |mapping, content| {
            minify_js_with_banner(content, &banner)
                .map_err(|err| asset_error("BW-ASSET-001", &mapping.src, err))
        })?;
        Ok(json!({ "files": files }))
    }
}

#[derive(Default)]
pub struct CssMinOperator;

#[async_trait]
impl Operator for CssMinOperator {
    fn name(&self) -> &'static str {
        "cssmin"
    }

    fn validate(&self, step: &StepDescriptor) -> Result<(), AppError> {
        require_files(self.name(), step)
    }

    async fn execute(&self, step: StepDescriptor, ctx: ExecutionContext) -> Result<Value, AppError> {
        let banner = banner(&step).to_string();
        let files = transform_files(&ctx.project_root, &step, |mapping, content| {
            minify_css_with_banner(content, &banner)
                .map_err(|err| asset_error("BW-ASSET-002", &mapping.src, err))
        })?;
        Ok(json!({ "files": files }))
    }
}

/// Re-serializes JSON compactly, keeping key order.
#[derive(Default)]
pub struct MinJsonOperator;

#[async_trait]
impl Operator for MinJsonOperator {
    fn name(&self) -> &'static str {
        "minjson"
    }

    fn validate(&self, step: &StepDescriptor) -> Result<(), AppError> {
        require_files(self.name(), step)
    }

    async fn execute(&self, step: StepDescriptor, ctx: ExecutionContext) -> Result<Value, AppError> {
        let files = transform_files(&ctx.project_root, &step, |mapping, content| {
            let parsed: Value = serde_json::from_str(content)
                .map_err(|err| asset_error("BW-ASSET-003", &mapping.src, err))?;
            serde_json::to_string(&parsed)
                .map_err(|err| asset_error("BW-ASSET-003", &mapping.src, err))
        })?;
        Ok(json!({ "files": files }))
    }
}

#[derive(Default)]
pub struct HtmlMinOperator;

#[async_trait]
impl Operator for HtmlMinOperator {
    fn name(&self) -> &'static str {
        "htmlmin"
    }

    fn validate(&self, step: &StepDescriptor) -> Result<(), AppError> {
        require_files(self.name(), step)
    }

    async fn execute(&self, step: StepDescriptor, ctx: ExecutionContext) -> Result<Value, AppError> {
        let files = transform_files(&ctx.project_root, &step, |_, content| Ok(minify_html(content)))?;
        Ok(json!({ "files": files }))
    }
}
