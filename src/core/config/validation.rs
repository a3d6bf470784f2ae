#![allow(clippy::result_large_err)]

use super::BuildConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::utils::files::{is_contained, slash_path};
use crate::utils::glob::{normalize, GlobPattern};
use std::path::Path;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &BuildConfig) -> Result<(), AppError> {
        if config.project.name.trim().is_empty() {
            return Err(invalid("project.name cannot be empty"));
        }

        for (field, value) in [
            ("build.prepare.outdir", &config.build.prepare.outdir),
            ("build.compile.outdir", &config.build.compile.outdir),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(format!("{} cannot be empty", field)));
            }
            if !is_contained(Path::new(value)) {
                return Err(invalid(format!(
                    "{} must be a relative path inside the project",
                    field
                )));
            }
        }

        let prepare = normalize(&slash_path(Path::new(&config.build.prepare.outdir)));
        let compile = normalize(&slash_path(Path::new(&config.build.compile.outdir)));
        if prepare == compile
            || prepare.starts_with(&format!("{}/", compile))
            || compile.starts_with(&format!("{}/", prepare))
        {
            return Err(invalid(
                "build.prepare.outdir and build.compile.outdir must not overlap",
            ));
        }

        let busting = config.build.compile.cache_busting_dir.trim();
        if !busting.is_empty() && !is_valid_dir_name(busting) {
            return Err(invalid(format!(
                "build.compile.cache_busting_dir '{}' must be a single directory name",
                busting
            )));
        }

        for (field, value) in [
            ("app.angular_module.regular", &config.app.angular_module.regular),
            (
                "app.angular_module.templates",
                &config.app.angular_module.templates,
            ),
            (
                "app.angular_module.translations",
                &config.app.angular_module.translations,
            ),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(format!("{} cannot be empty", field)));
            }
        }

        let pattern_lists = [
            ("app.files.js", &config.app.files.js),
            ("app.files.templates", &config.app.files.templates),
            ("app.files.templates2js", &config.app.files.templates2js),
            ("app.files.translations", &config.app.files.translations),
            ("app.files.css", &config.app.files.css),
            ("common.files.js", &config.common.files.js),
            ("common.files.templates", &config.common.files.templates),
            ("common.files.templates2js", &config.common.files.templates2js),
            ("vendor.files.js", &config.vendor.files.js),
        ];
        for (field, patterns) in pattern_lists {
            for pattern in patterns {
                GlobPattern::new(pattern).map_err(|err| {
                    invalid(format!("{} contains an invalid pattern: {}", field, err.message))
                })?;
            }
        }

        Ok(())
    }
}

/// A directory name usable as a single path segment.
pub fn is_valid_dir_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && name != "index.html"
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::new(ErrorCategory::ValidationError, message.into()).with_code("BW-CFG-002")
}
