use crate::cli::Command;
use std::env;

/// Execution contexts that influence how logging is routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionContext {
    /// Interactive use from a developer terminal.
    LocalDev,
    /// Continuous-integration runs, where stdout carries only command output.
    Ci,
}

/// Derive the active execution context from a parsed CLI command plus overrides.
pub fn detect_context(command: &Command) -> ExecutionContext {
    if ci_enabled() {
        return ExecutionContext::Ci;
    }

    match command {
        Command::Build(_)
        | Command::Validate(_)
        | Command::Graph(_)
        | Command::Explain(_)
        | Command::Init(_) => ExecutionContext::LocalDev,
    }
}

fn ci_enabled() -> bool {
    let flag = |name: &str, accepted: &[&str]| {
        env::var(name)
            .map(|value| accepted.contains(&value.trim().to_lowercase().as_str()))
            .unwrap_or(false)
    };
    flag("CI", &["true", "1"]) || flag("BUNDLEWRIGHT_CI", &["1", "true"])
}
