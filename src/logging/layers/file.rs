use crate::logging::config::LoggingConfig;
use crate::Result;
use anyhow::{anyhow, Context};
use dirs_next::home_dir;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::{self as tracing_fmt, format, writer::BoxMakeWriter};
use tracing_subscriber::registry::LookupSpan;

const LOG_FILE_NAME: &str = "bundlewright.log";
const DEFAULT_LOG_DIR: &str = ".bundlewright/logs";

/// File layer: one JSON object per event, so runs can be searched by step or run id.
pub type FileFmtLayer<S> =
    tracing_fmt::Layer<S, format::JsonFields, format::Format<format::Json>, BoxMakeWriter>;

pub type FileLayerStack<S> = tracing_subscriber::layer::Layered<FileFmtLayer<S>, S>;

/// Location of the log file for a project, or under the home directory without one.
///
/// A relative `log_dir` is taken from the project root and must stay inside it.
pub fn log_file_path(config: &LoggingConfig, project_root: Option<&Path>) -> Result<PathBuf> {
    let anchor = match project_root {
        Some(project) => project.to_path_buf(),
        None => home_dir().ok_or_else(|| anyhow!("home directory unavailable"))?,
    };

    let dir = match &config.log_dir {
        Some(dir) if dir.is_absolute() => dir.clone(),
        Some(dir) => {
            let anchor = canonical(&anchor);
            let joined = canonical(&anchor.join(dir));
            if !joined.starts_with(&anchor) {
                let scope = if project_root.is_some() { "project" } else { "home directory" };
                return Err(anyhow!(
                    "logging.log_dir {} resolves outside {} {}",
                    dir.display(),
                    scope,
                    anchor.display()
                ));
            }
            joined
        }
        None => anchor.join(DEFAULT_LOG_DIR),
    };
    Ok(dir.join(LOG_FILE_NAME))
}

/// Non-blocking JSON layer appending to `log_file`; a sink when file logging is off.
pub fn file_layer<S>(
    log_file: &Path,
    enabled: bool,
) -> Result<(FileFmtLayer<S>, Option<WorkerGuard>)>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if !enabled {
        return Ok((json_layer(BoxMakeWriter::new(io::sink)), None));
    }

    if let Some(dir) = log_file.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("failed to open log file {}", log_file.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    Ok((json_layer(BoxMakeWriter::new(writer)), Some(guard)))
}

fn json_layer<S>(writer: BoxMakeWriter) -> FileFmtLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_target(false)
        .with_writer(writer)
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
