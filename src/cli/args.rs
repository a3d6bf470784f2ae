use clap::{Args, ValueEnum};
use std::path::PathBuf;

pub const DEFAULT_TASK: &str = "build";

/// Options shared by every command that loads a project.
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Project root all relative paths are resolved against (default: current directory)
    #[arg(long, short = 'C', value_name = "DIR", default_value = ".")]
    pub path: PathBuf,

    /// Pipeline document to use instead of the built-in one
    #[arg(long, value_name = "FILE", help_heading = "Configuration")]
    pub pipeline: Option<PathBuf>,

    /// Path to custom config file (default: {path}/bundlewright.toml)
    #[arg(long, value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Task alias or step id to run
    #[arg(value_name = "TASK", default_value = DEFAULT_TASK)]
    pub task: String,

    #[command(flatten)]
    pub project: ProjectArgs,

    /// Write the per-step run summary as JSON to this file
    #[arg(long, value_name = "FILE", help_heading = "Output Options")]
    pub summary: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Also check that this task expands to a runnable plan
    #[arg(long, value_name = "TASK", default_value = DEFAULT_TASK)]
    pub task: String,
}

#[derive(Args, Debug, Clone)]
pub struct GraphArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Write DOT output to this file instead of stdout
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExplainFormat {
    Json,
    Text,
}

#[derive(Args, Debug, Clone)]
pub struct ExplainArgs {
    /// Task alias or step id to explain
    #[arg(value_name = "TASK", default_value = DEFAULT_TASK)]
    pub task: String,

    #[command(flatten)]
    pub project: ProjectArgs,

    #[arg(long, value_enum, default_value = "json")]
    pub format: ExplainFormat,
}

#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    /// Directory to scaffold (default: current directory)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Project name written to bundlewright.toml (default: directory name)
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Overwrite existing files
    #[arg(long)]
    pub force: bool,
}
