#![allow(clippy::result_large_err)]

//! Declarative build pipeline: document schema, placeholder graph, planning and execution.

pub mod executor;
pub mod explain;
pub mod graph;
pub mod operator;
pub mod operators;
pub mod placeholder;
pub mod plan;
pub mod schema;

pub use executor::{execute_plan, ExecutionSummary, StepRunRecord};
pub use graph::{ReferenceGraph, ResolvedPipeline};
pub use operator::{ExecutionContext, Operator, OperatorRegistry, OperatorRegistryBuilder};
pub use plan::{build_plan, ExecutionPlan};
pub use schema::{PipelineDocument, StepDescriptor};

use crate::core::config::{BuildConfig, ConfigLoader, ConfigValidator};
use crate::core::error::AppError;
use std::path::{Path, PathBuf};

/// Where a project's configuration and pipeline come from.
#[derive(Debug, Clone)]
pub struct PipelineSource {
    pub project_root: PathBuf,
    /// Pipeline document; the built-in one when absent.
    pub pipeline_file: Option<PathBuf>,
    /// Config file; `<project_root>/bundlewright.toml` when absent.
    pub config_file: Option<PathBuf>,
}

impl PipelineSource {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            pipeline_file: None,
            config_file: None,
        }
    }
}

/// A validated pipeline with every static placeholder resolved.
pub struct LoadedPipeline {
    pub config: BuildConfig,
    pub document: PipelineDocument,
    pub graph: ReferenceGraph,
    pub resolved: ResolvedPipeline,
    pub registry: OperatorRegistry,
}

/// Load config and pipeline, validate both, and resolve the reference graph.
pub fn load_pipeline(source: &PipelineSource) -> Result<LoadedPipeline, AppError> {
    let config = match &source.config_file {
        Some(path) => ConfigLoader::load_with_overrides(&absolute(&source.project_root, path))?,
        None => ConfigLoader::load_from_workspace(&source.project_root)?,
    };
    ConfigValidator::validate(&config)?;

    let document = match &source.pipeline_file {
        Some(path) => PipelineDocument::load_from_file(&absolute(&source.project_root, path))?,
        None => PipelineDocument::builtin()?,
    };
    document.validate()?;

    let registry = operators::default_registry();
    let config_value = config.placeholder_value();
    let graph = ReferenceGraph::build(&document, &config_value, &registry)?;
    let resolved = graph.resolve(&document, &config_value)?;
    tracing::debug!(
        steps = resolved.steps.len(),
        slots = graph.node_count(),
        "pipeline resolved"
    );

    Ok(LoadedPipeline {
        config,
        document,
        graph,
        resolved,
        registry,
    })
}

fn absolute(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() || path.exists() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
