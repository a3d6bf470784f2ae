#![allow(clippy::result_large_err)]

use super::files::{asset_error, map_step_files, required_str, string_list};
use crate::core::assets::translations_script;
use crate::core::error::AppError;
use crate::core::pipeline::operator::{ExecutionContext, Operator};
use crate::core::pipeline::schema::StepDescriptor;
use crate::utils::files::{read_text, resolve, slash_path, write_text};
use crate::utils::glob::ExpandOptions;
use async_trait::async_trait;
use serde_json::{json, Value};

const DEFAULT_REQUIRES: &[&str] = &["pascalprecht.translate"];

/// Turns translation JSON files into one script registering every language.
///
/// The language key is the file stem (`i18n/en.json` registers `en`).
#[derive(Default)]
pub struct Translations2JsOperator;

#[async_trait]
impl Operator for Translations2JsOperator {
    fn name(&self) -> &'static str {
        "translations2js"
    }

    fn validate(&self, step: &StepDescriptor) -> Result<(), AppError> {
        required_str(self.name(), step, "module")?;
        required_str(self.name(), step, "out")?;
        Ok(())
    }

    async fn execute(&self, step: StepDescriptor, ctx: ExecutionContext) -> Result<Value, AppError> {
        let module = required_str(self.name(), &step, "module")?;
        let out = resolve(&ctx.project_root, required_str(self.name(), &step, "out")?);
        let requires = match step.option("requires") {
            Some(value) => string_list(Some(value)),
            None => DEFAULT_REQUIRES.iter().map(|name| name.to_string()).collect(),
        };

        let mut tables = Vec::new();
        for mapping in map_step_files(&ctx.project_root, &step, ExpandOptions::default())? {
            let Some(lang) = mapping.src.file_stem().map(|stem| stem.to_string_lossy().to_string()) else {
                continue;
            };
            let table: Value = serde_json::from_str(&read_text(&mapping.src)?)
                .map_err(|err| asset_error("BW-ASSET-003", &mapping.src, err))?;
            tables.push((lang, table));
        }
        tables.sort_by(|a, b| a.0.cmp(&b.0));

        write_text(&out, &translations_script(module, &requires, &tables))?;
        let languages: Vec<&str> = tables.iter().map(|(lang, _)| lang.as_str()).collect();
        tracing::debug!(out = %out.display(), languages = ?languages, "translations script written");
        Ok(json!({
            "languages": languages,
            "out": slash_path(out.strip_prefix(&ctx.project_root).unwrap_or(&out)),
        }))
    }
}
