//! Process-wide tracing setup: JSON file sink under the project plus a compact console sink.

pub mod config;
pub mod context;
pub mod layers;

pub use context::{detect_context, ExecutionContext};
pub use layers::console::ConsoleOutput;

use crate::logging::config::LoggingConfig;
use crate::logging::layers::{console, file};
use crate::{cli::Command, Result};
use anyhow::{bail, Context};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::Registry;

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Keeps the file writer flushing until the command returns.
pub struct LoggingGuard {
    _worker: Option<WorkerGuard>,
    pub context: ExecutionContext,
    pub console_output: ConsoleOutput,
    /// Log file the run appends to; nothing is written there when file logging is off.
    pub log_file: PathBuf,
}

/// Install the global subscriber for `command`. Fails when called twice in one process.
pub fn init(command: &Command) -> Result<LoggingGuard> {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        bail!("logging already initialized");
    }

    let project_root = command
        .project_path()
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok());
    let settings = LoggingConfig::load(project_root.as_deref())?;
    let context = detect_context(command);

    // RUST_LOG wins over the configured level.
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.default_level)
            .with_context(|| format!("invalid log level '{}'", settings.default_level))?,
    };

    let log_file = file::log_file_path(&settings, project_root.as_deref())?;
    let (file_layer, worker) = file::file_layer::<Registry>(&log_file, settings.enable_file)?;
    let console_output = console::select_console_output(context, settings.console_output);
    let console_layer = console::console_layer::<file::FileLayerStack<Registry>>(console_output);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .with(filter)
        .try_init()
        .context("failed to install tracing subscriber")?;

    tracing::debug!(
        ?context,
        console = %console_output,
        file = %log_file.display(),
        file_enabled = settings.enable_file,
        version = crate::VERSION,
        "logging ready"
    );

    Ok(LoggingGuard {
        _worker: worker,
        context,
        console_output,
        log_file,
    })
}
