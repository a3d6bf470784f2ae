//! Structured error carried through config loading, pipeline resolution and step execution.

use crate::core::types::{ErrorCategory, ErrorSeverity};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Error with a stable code (`BW-<AREA>-<NNN>`), key/value context and optional hints.
#[derive(Debug)]
pub struct AppError {
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub code: String,
    pub message: String,
    pub context: HashMap<String, String>,
    pub recovery_suggestions: Vec<String>,
    pub occurred_at: DateTime<Utc>,
    pub source: Option<anyhow::Error>,
}

impl AppError {
    /// New error with a generated `ERR-<uuid>` code; callers normally follow with `with_code`.
    pub fn new<T: Into<String>>(category: ErrorCategory, message: T) -> Self {
        AppError {
            category,
            severity: category.default_severity(),
            code: format!("ERR-{}", uuid::Uuid::new_v4()),
            message: message.into(),
            context: HashMap::new(),
            recovery_suggestions: Vec::new(),
            occurred_at: Utc::now(),
            source: None,
        }
    }

    pub fn with_source<T, E>(category: ErrorCategory, message: T, source: E) -> Self
    where
        T: Into<String>,
        E: Into<anyhow::Error>,
    {
        let mut error = AppError::new(category, message);
        error.source = Some(source.into());
        error
    }

    /// Attach free-form context under the `context` key.
    pub fn with_context<T: Into<String>>(mut self, context: T) -> Self {
        self.context.insert("context".to_string(), context.into());
        self
    }

    pub fn with_code<T: Into<String>>(mut self, code: T) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_suggestion<T: Into<String>>(mut self, suggestion: T) -> Self {
        self.recovery_suggestions.push(suggestion.into());
        self
    }

    pub fn severity(&self) -> ErrorSeverity {
        self.severity
    }

    pub fn add_context(&mut self, key: &str, value: &str) {
        self.context.insert(key.to_string(), value.to_string());
    }

    /// I/O failure on `path`, e.g. `AppError::io("read", path, err)`.
    pub fn io(action: &str, path: &Path, err: std::io::Error) -> Self {
        let message = format!("failed to {} {}: {}", action, path.display(), err);
        AppError::with_source(ErrorCategory::IoError, message, err).with_code("BW-IO-001")
    }

    /// Context entries as `key=value`, sorted by key.
    fn rendered_context(&self) -> Vec<String> {
        let mut entries: Vec<(&String, &String)> = self.context.iter().collect();
        entries.sort();
        entries
            .into_iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.category, self.message)?;
        let context = self.rendered_context();
        if !context.is_empty() {
            write!(f, " (Context: {})", context.join(", "))?;
        }
        if let Some(source) = &self.source {
            write!(f, "\nCaused by: {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        let message = err.to_string();
        AppError::with_source(ErrorCategory::InternalError, message, err)
            .with_code("ANYHOW_ERROR")
            .with_suggestion("Run with RUST_LOG=debug for more detail")
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        let message = err.to_string();
        AppError::with_source(ErrorCategory::IoError, message, err)
            .with_code("IO_ERROR")
            .with_suggestion("Check file permissions and paths")
    }
}

/// Sink for user-facing diagnostics.
pub trait ErrorReporter {
    fn report_error(&self, error: &AppError);
    fn report_warning(&self, message: &str, context: Option<String>);
    fn report_info(&self, message: &str);
}

/// Prints diagnostics to stderr (info to stdout).
#[derive(Debug, Default)]
pub struct DefaultErrorReporter;

impl DefaultErrorReporter {
    pub fn new() -> Self {
        DefaultErrorReporter
    }
}

impl ErrorReporter for DefaultErrorReporter {
    fn report_error(&self, error: &AppError) {
        eprintln!("error[{}]: {}", error.code, error.message);
        for entry in error.rendered_context() {
            eprintln!("  {}", entry);
        }
        if let Some(source) = &error.source {
            for cause in source.chain() {
                let cause = cause.to_string();
                if cause != error.message {
                    eprintln!("  caused by: {}", cause);
                }
            }
        }
        for suggestion in &error.recovery_suggestions {
            eprintln!("  hint: {}", suggestion);
        }
    }

    fn report_warning(&self, message: &str, context: Option<String>) {
        match context {
            Some(context) => eprintln!("warning: {} ({})", message, context),
            None => eprintln!("warning: {}", message),
        }
    }

    fn report_info(&self, message: &str) {
        println!("{}", message);
    }
}
