#![allow(clippy::result_large_err)]

use super::files::{required_str, string_list};
use crate::core::assets::{content_fingerprint, is_fingerprint_name};
use crate::core::config::validation::is_valid_dir_name;
use crate::core::error::AppError;
use crate::core::pipeline::operator::{ExecutionContext, Operator};
use crate::core::pipeline::schema::StepDescriptor;
use crate::core::types::ErrorCategory;
use crate::utils::files::resolve;
use crate::utils::glob::{walk, GlobPattern};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::fs;

/// Publishes the cache-busting directory name as output `dir`.
///
/// A non-empty `options.name` is used as is; otherwise the name is derived from
/// the content of every file under `options.root` not matched by `options.exclude`.
#[derive(Default)]
pub struct FingerprintOperator;

/// The fingerprint directory holding every file, when there is exactly one.
fn busted_dir(relative_paths: &[String]) -> Option<String> {
    let (first, _) = relative_paths.first()?.split_once('/')?;
    if !is_fingerprint_name(first) {
        return None;
    }
    let prefix = format!("{}/", first);
    relative_paths
        .iter()
        .all(|relative| relative.starts_with(&prefix))
        .then(|| first.to_string())
}

fn fixed_name(step: &StepDescriptor) -> Option<&str> {
    step.option_str("name").map(str::trim).filter(|name| !name.is_empty())
}

#[async_trait]
impl Operator for FingerprintOperator {
    fn name(&self) -> &'static str {
        "fingerprint"
    }

    fn outputs(&self) -> &'static [&'static str] {
        &["dir"]
    }

    fn validate(&self, step: &StepDescriptor) -> Result<(), AppError> {
        required_str(self.name(), step, "root")?;
        if let Some(name) = fixed_name(step) {
            if !is_valid_dir_name(name) {
                return Err(AppError::new(
                    ErrorCategory::ValidationError,
                    format!("fingerprint name '{}' must be a single directory name", name),
                )
                .with_code("BW-OP-003"));
            }
        }
        for pattern in string_list(step.option("exclude")) {
            GlobPattern::new(&pattern)?;
        }
        Ok(())
    }

    async fn execute(&self, step: StepDescriptor, ctx: ExecutionContext) -> Result<Value, AppError> {
        if let Some(name) = fixed_name(&step) {
            tracing::info!(dir = name, "using configured cache-busting directory");
            return Ok(json!({ "dir": name, "files": 0 }));
        }

        let root = resolve(&ctx.project_root, required_str(self.name(), &step, "root")?);
        let excludes = string_list(step.option("exclude"))
            .iter()
            .map(|pattern| GlobPattern::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        let mut relative_paths = Vec::new();
        if root.is_dir() {
            walk(&root, "", false, &mut relative_paths)?;
        }
        relative_paths.retain(|relative| !excludes.iter().any(|pattern| pattern.matches(relative)));

        // References inside moved output were already rewritten, so its content no
        // longer hashes to the name it lives under.
        if let Some(previous) = busted_dir(&relative_paths) {
            tracing::info!(dir = %previous, "output already cache-busted; keeping directory");
            return Ok(json!({ "dir": previous, "files": relative_paths.len() }));
        }

        let mut files = Vec::new();
        for relative in relative_paths {
            let path = root.join(&relative);
            let content = fs::read(&path).map_err(|err| AppError::io("read", &path, err))?;
            files.push((relative, content));
        }

        let dir = content_fingerprint(&files);
        tracing::info!(dir = %dir, files = files.len(), "computed cache-busting directory");
        Ok(json!({ "dir": dir, "files": files.len() }))
    }
}
