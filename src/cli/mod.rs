pub mod args;
pub mod commands;
pub mod init;

pub use args::{BuildArgs, ExplainArgs, ExplainFormat, GraphArgs, InitArgs, ProjectArgs, ValidateArgs};
use clap::{Parser, Subcommand};
use std::path::Path;

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
PIPELINE COMMANDS:\n{subcommands}\n";

#[derive(Parser)]
#[command(name = "bundlewright")]
#[command(version = crate::VERSION)]
#[command(about = "Declarative build pipeline for single-page web apps")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: init a project, validate the pipeline, explain a task, then build."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(
        about = "Run a task of the build pipeline",
        long_about = "Build resolves the pipeline, expands the task alias into an ordered plan and runs each step, stopping at the first failure.",
        after_help = "Example:\n    bundlewright build compile --path ./webapp --summary run.json"
    )]
    Build(BuildArgs),
    #[command(
        about = "Check config and pipeline without building",
        long_about = "Validate loads the config and the pipeline document, checks step kinds, options and placeholder references, and makes sure the task expands to a plan.",
        after_help = "Example:\n    bundlewright validate --pipeline custom.yaml"
    )]
    Validate(ValidateArgs),
    #[command(
        about = "Print the placeholder reference graph",
        long_about = "Graph renders which option and output slots each step reads as Graphviz DOT.",
        after_help = "Example:\n    bundlewright graph -o pipeline.dot"
    )]
    Graph(GraphArgs),
    #[command(
        about = "Show the resolved steps a task would run",
        long_about = "Explain prints every step of a task plan with its resolved options and file sets and the values it reads from other steps.",
        after_help = "Example:\n    bundlewright explain compile --format text"
    )]
    Explain(ExplainArgs),
    #[command(
        about = "Scaffold a project skeleton",
        long_about = "Init writes a bundlewright.toml, module wrapper snippets, an index template and a starter application module.",
        after_help = "Example:\n    bundlewright init ./webapp --name storefront"
    )]
    Init(InitArgs),
}

impl Command {
    /// Project directory the command operates on, used to place log files.
    pub fn project_path(&self) -> Option<&Path> {
        match self {
            Command::Build(args) => Some(&args.project.path),
            Command::Validate(args) => Some(&args.project.path),
            Command::Graph(args) => Some(&args.project.path),
            Command::Explain(args) => Some(&args.project.path),
            Command::Init(args) => args.path.as_deref(),
        }
    }
}

pub async fn run(args: Args) -> crate::Result<()> {
    match args.command {
        Command::Build(build_args) => commands::build(build_args).await,
        Command::Validate(validate_args) => commands::validate(validate_args).await,
        Command::Graph(graph_args) => commands::graph(graph_args).await,
        Command::Explain(explain_args) => commands::explain(explain_args).await,
        Command::Init(init_args) => init::run(init_args).await,
    }
}
