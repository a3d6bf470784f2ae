#![allow(clippy::result_large_err)]

use super::BuildConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "bundlewright.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from the project root (project/bundlewright.toml).
    /// Environment variables override config file values.
    /// A missing file yields defaults plus env overrides.
    pub fn load_from_workspace(project_root: &Path) -> Result<BuildConfig, AppError> {
        let config_path = project_root.join(CONFIG_FILE_NAME);
        Self::load_with_overrides(&config_path)
    }

    /// Load an explicit config file (missing file falls back to defaults) and apply env overrides.
    pub fn load_with_overrides(path: &Path) -> Result<BuildConfig, AppError> {
        let mut config = Self::load_from_file(path)?.unwrap_or_default();
        Self::apply_env_overrides(&mut config);
        Ok(config)
    }

    /// Load config from specific file path.
    /// Returns Ok(None) if file doesn't exist.
    pub fn load_from_file(path: &Path) -> Result<Option<BuildConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
        })?;

        let config: BuildConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
            .with_code("BW-CFG-001")
        })?;

        tracing::debug!(path = %path.display(), "loaded build config");
        Ok(Some(config))
    }

    /// Apply environment variable overrides to the configuration.
    /// Environment variables take precedence over config file values.
    fn apply_env_overrides(config: &mut BuildConfig) {
        if let Ok(name) = env::var("BUNDLEWRIGHT_PROJECT_NAME") {
            config.project.name = name;
        }

        if let Ok(outdir) = env::var("BUNDLEWRIGHT_PREPARE_OUTDIR") {
            config.build.prepare.outdir = outdir;
        }

        if let Ok(outdir) = env::var("BUNDLEWRIGHT_COMPILE_OUTDIR") {
            config.build.compile.outdir = outdir;
        }

        if let Ok(dir) = env::var("BUNDLEWRIGHT_CACHE_BUSTING_DIR") {
            config.build.compile.cache_busting_dir = dir;
        }

        if let Ok(banner) = env::var("BUNDLEWRIGHT_BANNER") {
            config.meta.banner = banner;
        }

        if let Ok(module) = env::var("BUNDLEWRIGHT_APP_MODULE") {
            config.app.angular_module.regular = module;
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "BUNDLEWRIGHT_PROJECT_NAME - Override project name",
            "BUNDLEWRIGHT_PREPARE_OUTDIR - Override the staging directory (default: build/prepare)",
            "BUNDLEWRIGHT_COMPILE_OUTDIR - Override the production output directory (default: build/compile)",
            "BUNDLEWRIGHT_CACHE_BUSTING_DIR - Use a fixed cache-busting directory name instead of a content hash",
            "BUNDLEWRIGHT_BANNER - Override the banner comment placed in front of main.js and main.css",
            "BUNDLEWRIGHT_APP_MODULE - Override the Angular module bootstrapped by index.html",
        ]
    }
}
