#![allow(clippy::result_large_err)]

use super::files::{map_step_files, required_str, string_list};
use crate::core::error::AppError;
use crate::core::pipeline::operator::{ExecutionContext, Operator};
use crate::core::pipeline::schema::StepDescriptor;
use crate::utils::files::{read_text, resolve, slash_path, write_text};
use crate::utils::glob::{normalize, ExpandOptions};
use async_trait::async_trait;
use regex::{Captures, Regex};
use serde_json::{json, Value};
use std::sync::OnceLock;

static INDEX_TOKEN_RE: OnceLock<Regex> = OnceLock::new();

fn index_token_regex() -> &'static Regex {
    INDEX_TOKEN_RE
        .get_or_init(|| Regex::new(r"<%=\s*([A-Za-z_][A-Za-z0-9_]*)\s*%>").expect("index token regex is valid"))
}

/// Renders the index document with tags for the compiled scripts and stylesheets.
#[derive(Default)]
pub struct IndexHtmlOperator;

#[async_trait]
impl Operator for IndexHtmlOperator {
    fn name(&self) -> &'static str {
        "indexHtml"
    }

    fn validate(&self, step: &StepDescriptor) -> Result<(), AppError> {
        required_str(self.name(), step, "template")?;
        required_str(self.name(), step, "dir")?;
        Ok(())
    }

    async fn execute(&self, step: StepDescriptor, ctx: ExecutionContext) -> Result<Value, AppError> {
        let template_path = resolve(&ctx.project_root, required_str(self.name(), &step, "template")?);
        let out = resolve(&ctx.project_root, required_str(self.name(), &step, "dir")?).join("index.html");
        let bases: Vec<String> = string_list(step.option("base"))
            .iter()
            .map(|base| normalize(base))
            .filter(|base| !base.is_empty())
            .collect();
        let module = step.option_str("angular_module").unwrap_or("");

        let options = ExpandOptions {
            require_literals: true,
            ..ExpandOptions::default()
        };
        let mut scripts = Vec::new();
        let mut styles = Vec::new();
        for mapping in map_step_files(&ctx.project_root, &step, options)? {
            let full = mapping
                .src
                .strip_prefix(&ctx.project_root)
                .map(slash_path)
                .unwrap_or_else(|_| mapping.relative.clone());
            let href = strip_base(&full, &bases);
            if href.ends_with(".js") {
                scripts.push(href);
            } else if href.ends_with(".css") {
                styles.push(href);
            } else {
                tracing::warn!(file = %href, "index source is neither a script nor a stylesheet");
            }
        }

        let template = read_text(&template_path)?;
        let rendered = render_index(&template, &scripts, &styles, module);
        write_text(&out, &rendered)?;

        Ok(json!({
            "scripts": scripts,
            "styles": styles,
            "out": slash_path(out.strip_prefix(&ctx.project_root).unwrap_or(&out)),
        }))
    }
}

/// Drop the first base directory that prefixes `path`.
fn strip_base(path: &str, bases: &[String]) -> String {
    for base in bases {
        if let Some(rest) = path.strip_prefix(base.as_str()).and_then(|rest| rest.strip_prefix('/')) {
            return rest.to_string();
        }
    }
    path.to_string()
}

/// Replace `scripts`, `styles` and `angular_module` tokens; unknown tokens are kept.
pub fn render_index(template: &str, scripts: &[String], styles: &[String], module: &str) -> String {
    index_token_regex()
        .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
            "scripts" => scripts
                .iter()
                .map(|src| format!("<script type=\"text/javascript\" src=\"{}\"></script>", src))
                .collect::<Vec<_>>()
                .join("\n"),
            "styles" => styles
                .iter()
                .map(|href| format!("<link rel=\"stylesheet\" type=\"text/css\" href=\"{}\">", href))
                .collect::<Vec<_>>()
                .join("\n"),
            "angular_module" => module.to_string(),
            other => {
                tracing::warn!(token = other, "unknown token left in index template");
                caps[0].to_string()
            }
        })
        .into_owned()
}
