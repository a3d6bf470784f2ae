#![allow(clippy::result_large_err)]

use super::files::{require_files, transform_files};
use crate::core::assets::rewrite_references;
use crate::core::error::AppError;
use crate::core::pipeline::operator::{ExecutionContext, Operator};
use crate::core::pipeline::schema::StepDescriptor;
use crate::core::types::ErrorCategory;
use crate::utils::files::resolve;
use crate::utils::glob::top_level_entries;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

/// A literal text substitution.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReplacePattern {
    #[serde(rename = "match")]
    pub pattern: String,
    pub replacement: String,
}

/// Moved output directory whose top-level entries get prefixed references.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CacheBustingTarget {
    pub root: String,
    pub dir: String,
}

/// Rewrites file contents with literal patterns and cache-busted references.
#[derive(Default)]
pub struct ReplaceOperator;

fn parse_options(step: &StepDescriptor) -> Result<(Vec<ReplacePattern>, Option<CacheBustingTarget>), AppError> {
    let invalid = |key: &str, err: serde_json::Error| {
        AppError::new(
            ErrorCategory::ValidationError,
            format!("replace options.{} is malformed: {}", key, err),
        )
        .with_code("BW-OP-001")
    };
    let patterns = match step.option("patterns") {
        Some(value) if !value.is_null() => {
            serde_json::from_value(value.clone()).map_err(|err| invalid("patterns", err))?
        }
        _ => Vec::new(),
    };
    let target = match step.option("cache_busting") {
        Some(value) if !value.is_null() => {
            Some(serde_json::from_value(value.clone()).map_err(|err| invalid("cache_busting", err))?)
        }
        _ => None,
    };
    Ok((patterns, target))
}

#[async_trait]
impl Operator for ReplaceOperator {
    fn name(&self) -> &'static str {
        "replace"
    }

    fn validate(&self, step: &StepDescriptor) -> Result<(), AppError> {
        require_files(self.name(), step)?;
        let (patterns, _) = parse_options(step)?;
        if patterns.iter().any(|pattern| pattern.pattern.is_empty()) {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "replace patterns need a non-empty match",
            )
            .with_code("BW-OP-001"));
        }
        Ok(())
    }

    async fn execute(&self, step: StepDescriptor, ctx: ExecutionContext) -> Result<Value, AppError> {
        let (patterns, target) = parse_options(&step)?;
        let busting = match &target {
            Some(target) => {
                let moved = resolve(&ctx.project_root, &target.root).join(&target.dir);
                Some((top_level_entries(&moved)?, target.dir.clone()))
            }
            None => None,
        };

        let mut replacements = 0usize;
        let files = transform_files(&ctx.project_root, &step, |_, content| {
            let mut text = content.to_string();
            for pattern in &patterns {
                replacements += text.matches(pattern.pattern.as_str()).count();
                text = text.replace(&pattern.pattern, &pattern.replacement);
            }
            if let Some((entries, dir)) = &busting {
                let rewritten = rewrite_references(&text, entries, dir);
                replacements += rewritten.replacements;
                text = rewritten.text;
            }
            Ok(text)
        })?;

        tracing::debug!(step = %ctx.step_id, files, replacements, "references rewritten");
        Ok(json!({ "files": files, "replacements": replacements }))
    }
}
