use crate::logging::layers::console::ConsoleOutput;
use crate::Result;
use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::filter::Directive;

/// Logging settings file, relative to the project root.
pub const LOGGING_CONFIG_PATH: &str = ".bundlewright/config/logging.toml";

/// `[logging]` section of the logging settings file.
///
/// Precedence: defaults, then the project file, then `BUNDLEWRIGHT_LOG_*` variables.
/// `RUST_LOG` still wins over `default_level` when the filter is built.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub log_dir: Option<PathBuf>,
    pub default_level: String,
    pub enable_file: bool,
    pub console_output: Option<ConsoleOutput>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            default_level: "info".to_string(),
            enable_file: true,
            console_output: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct LoggingFile {
    #[serde(default)]
    logging: LoggingConfig,
}

impl LoggingConfig {
    pub fn load(project_root: Option<&Path>) -> Result<Self> {
        let mut config = match project_root.map(|root| root.join(LOGGING_CONFIG_PATH)) {
            Some(path) if path.is_file() => {
                let text = fs::read_to_string(&path)
                    .with_context(|| format!("failed to read logging config {}", path.display()))?;
                toml::from_str::<LoggingFile>(&text)
                    .with_context(|| format!("failed to parse logging config {}", path.display()))?
                    .logging
            }
            _ => LoggingConfig::default(),
        };

        if let Ok(output) = env::var("BUNDLEWRIGHT_LOG_CONSOLE") {
            config.console_output = Some(ConsoleOutput::from_str(&output).map_err(|err| anyhow!(err))?);
        }
        if let Ok(enabled) = env::var("BUNDLEWRIGHT_LOG_FILE") {
            config.enable_file = !matches!(enabled.trim(), "0" | "false" | "off");
        }

        Directive::from_str(&config.default_level).map_err(|_| {
            anyhow!(
                "logging.default_level '{}' is not a valid tracing directive",
                config.default_level
            )
        })?;
        Ok(config)
    }
}
