#![allow(clippy::result_large_err)]

//! Placeholder reference graph.
//!
//! Nodes are value slots (meta keys, top-level step options, runtime step
//! outputs) plus one node per step standing for its `files` and `params`. An
//! edge runs from the slot a value is read from to the slot or step reading
//! it, so a topological order resolves every slot after its dependencies.

use crate::core::error::AppError;
use crate::core::pipeline::operator::OperatorRegistry;
use crate::core::pipeline::placeholder::{
    collect_references, lookup_path, substitute, Reference,
};
use crate::core::pipeline::schema::{split_step_id, PipelineDocument, StepDescriptor};
use crate::core::types::ErrorCategory;
use indexmap::IndexMap;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Node weight of the reference graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Meta(String),
    Option { step: String, key: String },
    Step(String),
    Output { step: String, key: String },
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Meta(key) => write!(f, "meta.{}", key),
            Slot::Option { step, key } => write!(f, "{}.options.{}", step, key),
            Slot::Step(step) => write!(f, "{}", step),
            Slot::Output { step, key } => write!(f, "{}.outputs.{}", step, key),
        }
    }
}

/// Edge weight: how the target depends on the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    /// Value substituted before anything runs.
    Static,
    /// Value substituted right before the consuming step runs.
    Runtime,
    /// Option slot belongs to the step, or output is produced by it.
    Owns,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Static => write!(f, ""),
            Dependency::Runtime => write!(f, "runtime"),
            Dependency::Owns => write!(f, "owns"),
        }
    }
}

/// Explicit dependency graph over every placeholder in a pipeline document.
pub struct ReferenceGraph {
    graph: DiGraph<Slot, Dependency>,
    index: HashMap<Slot, NodeIndex>,
}

/// Pipeline with every static placeholder substituted.
#[derive(Debug, Clone)]
pub struct ResolvedPipeline {
    pub meta: Map<String, Value>,
    pub steps: IndexMap<String, StepDescriptor>,
    pub tasks: IndexMap<String, Vec<String>>,
}

impl ReferenceGraph {
    /// Build the graph and reject dangling references and cycles.
    pub fn build(
        document: &PipelineDocument,
        config: &Value,
        registry: &OperatorRegistry,
    ) -> Result<Self, AppError> {
        let mut graph = ReferenceGraph {
            graph: DiGraph::new(),
            index: HashMap::new(),
        };

        for key in document.meta.keys() {
            graph.add_node(Slot::Meta(key.clone()));
        }

        for (id, step) in &document.steps {
            let step_node = graph.add_node(Slot::Step(id.clone()));
            if let Some(options) = step.options.as_object() {
                for key in options.keys() {
                    let option = graph.add_node(Slot::Option {
                        step: id.clone(),
                        key: key.clone(),
                    });
                    graph.graph.add_edge(option, step_node, Dependency::Owns);
                }
            }

            let kind = split_step_id(id).map(|(kind, _)| kind).unwrap_or(id);
            let operator = registry.get(kind).ok_or_else(|| {
                AppError::new(
                    ErrorCategory::ValidationError,
                    format!(
                        "step {} uses unknown kind '{}' (known kinds: {})",
                        id,
                        kind,
                        registry.kinds().join(", ")
                    ),
                )
                .with_code("BW-PIPE-005")
            })?;
            for key in operator.outputs() {
                let output = graph.add_node(Slot::Output {
                    step: id.clone(),
                    key: key.to_string(),
                });
                graph.graph.add_edge(step_node, output, Dependency::Owns);
            }
        }

        for (key, value) in &document.meta {
            let target = Slot::Meta(key.clone());
            graph.link(&target, value, config)?;
        }

        for (id, step) in &document.steps {
            if let Some(options) = step.options.as_object() {
                for (key, value) in options {
                    let target = Slot::Option {
                        step: id.clone(),
                        key: key.clone(),
                    };
                    graph.link(&target, value, config)?;
                }
            }
            let target = Slot::Step(id.clone());
            let files = serde_json::to_value(&step.files).map_err(serialization_error)?;
            graph.link(&target, &files, config)?;
            graph.link(&target, &step.params, config)?;
        }

        graph.check_cycles()?;
        Ok(graph)
    }

    fn add_node(&mut self, slot: Slot) -> NodeIndex {
        if let Some(existing) = self.index.get(&slot) {
            return *existing;
        }
        let node = self.graph.add_node(slot.clone());
        self.index.insert(slot, node);
        node
    }

    fn link(&mut self, target: &Slot, value: &Value, config: &Value) -> Result<(), AppError> {
        let target_node = self.index[target];
        for reference in collect_references(value)? {
            let source = match &reference {
                Reference::Config(path) => {
                    if lookup_path(config, path).is_none() {
                        return Err(dangling(target, &reference, "no such configuration key"));
                    }
                    continue;
                }
                Reference::Meta(_) => Slot::Meta(reference.slot_key().to_string()),
                Reference::StepOption { step, .. } => {
                    if !self.index.contains_key(&Slot::Step(step.clone())) {
                        return Err(dangling(target, &reference, "no such step"));
                    }
                    Slot::Option {
                        step: step.clone(),
                        key: reference.slot_key().to_string(),
                    }
                }
                Reference::StepOutput { step, .. } => {
                    if !self.index.contains_key(&Slot::Step(step.clone())) {
                        return Err(dangling(target, &reference, "no such step"));
                    }
                    Slot::Output {
                        step: step.clone(),
                        key: reference.slot_key().to_string(),
                    }
                }
            };
            let Some(source_node) = self.index.get(&source).copied() else {
                let reason = match source {
                    Slot::Meta(_) => "no such meta key",
                    Slot::Option { .. } => "the step declares no such option",
                    _ => "the step kind publishes no such output",
                };
                return Err(dangling(target, &reference, reason));
            };
            let dependency = if reference.is_runtime() {
                Dependency::Runtime
            } else {
                Dependency::Static
            };
            self.graph.update_edge(source_node, target_node, dependency);
        }
        Ok(())
    }

    fn check_cycles(&self) -> Result<(), AppError> {
        for component in tarjan_scc(&self.graph) {
            let self_loop = component.len() == 1 && {
                let node = component[0];
                self.graph.contains_edge(node, node)
            };
            if component.len() > 1 || self_loop {
                let mut members: Vec<String> = component
                    .iter()
                    .map(|node| self.graph[*node].to_string())
                    .collect();
                members.sort();
                return Err(AppError::new(
                    ErrorCategory::ReferenceError,
                    format!("placeholder references form a cycle: {}", members.join(" -> ")),
                )
                .with_code("BW-REF-003"));
            }
        }
        Ok(())
    }

    /// Substitute every static placeholder, resolving slots in topological order.
    pub fn resolve(
        &self,
        document: &PipelineDocument,
        config: &Value,
    ) -> Result<ResolvedPipeline, AppError> {
        let order = toposort(&self.graph, None).map_err(|cycle| {
            AppError::new(
                ErrorCategory::ReferenceError,
                format!(
                    "placeholder references form a cycle at {}",
                    self.graph[cycle.node_id()]
                ),
            )
            .with_code("BW-REF-003")
        })?;

        let mut meta = Map::new();
        let mut options: HashMap<String, Map<String, Value>> = HashMap::new();

        for node in order {
            match &self.graph[node] {
                Slot::Meta(key) => {
                    let raw = &document.meta[key];
                    let value = substitute_static(raw, config, &meta, &options)?;
                    meta.insert(key.clone(), value);
                }
                Slot::Option { step, key } => {
                    let raw = &document.steps[step].options[key];
                    let value = substitute_static(raw, config, &meta, &options)?;
                    options
                        .entry(step.clone())
                        .or_default()
                        .insert(key.clone(), value);
                }
                Slot::Step(_) | Slot::Output { .. } => {}
            }
        }

        let mut steps = IndexMap::new();
        for (id, step) in &document.steps {
            let mut resolved_options = Map::new();
            if let Some(raw) = step.options.as_object() {
                let slots = options.get(id);
                for key in raw.keys() {
                    let value = slots
                        .and_then(|slots| slots.get(key))
                        .cloned()
                        .unwrap_or(Value::Null);
                    resolved_options.insert(key.clone(), value);
                }
            }

            let files = serde_json::to_value(&step.files).map_err(serialization_error)?;
            let files = substitute_static(&files, config, &meta, &options)?;
            let params = substitute_static(&step.params, config, &meta, &options)?;

            let resolved = StepDescriptor {
                options: Value::Object(resolved_options),
                files: serde_json::from_value(files).map_err(|err| {
                    AppError::new(
                        ErrorCategory::ValidationError,
                        format!("step {} files are malformed after substitution: {}", id, err),
                    )
                    .with_code("BW-PIPE-003")
                })?,
                params,
                description: step.description.clone(),
            };
            steps.insert(id.clone(), resolved);
        }

        Ok(ResolvedPipeline {
            meta,
            steps,
            tasks: document.tasks.clone(),
        })
    }

    /// Render the graph as Graphviz DOT.
    pub fn to_dot(&self) -> String {
        format!("{}", Dot::new(&self.graph))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Slots read by `slot`, sorted.
    pub fn dependencies_of(&self, slot: &Slot) -> Vec<Slot> {
        let Some(node) = self.index.get(slot) else {
            return Vec::new();
        };
        let mut deps: Vec<Slot> = self
            .graph
            .neighbors_directed(*node, petgraph::Direction::Incoming)
            .map(|source| self.graph[source].clone())
            .collect();
        deps.sort();
        deps
    }
}

fn substitute_static(
    value: &Value,
    config: &Value,
    meta: &Map<String, Value>,
    options: &HashMap<String, Map<String, Value>>,
) -> Result<Value, AppError> {
    let mut lookup = |reference: &Reference| -> Result<Option<Value>, AppError> {
        let found = match reference {
            Reference::Config(path) => lookup_path(config, path).cloned(),
            Reference::Meta(key) => lookup_map(meta, key),
            Reference::StepOption { step, key } => {
                options.get(step).and_then(|slots| lookup_map(slots, key))
            }
            Reference::StepOutput { .. } => return Ok(None),
        };
        found.map(Some).ok_or_else(|| {
            AppError::new(
                ErrorCategory::ReferenceError,
                format!("placeholder <%= {} %> did not resolve to a value", reference),
            )
            .with_code("BW-REF-004")
        })
    };
    substitute(value, &mut lookup)
}

fn lookup_map(map: &Map<String, Value>, key: &str) -> Option<Value> {
    let (head, rest) = match key.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (key, None),
    };
    let value = map.get(head)?;
    match rest {
        Some(rest) => lookup_path(value, rest).cloned(),
        None => Some(value.clone()),
    }
}

fn dangling(target: &Slot, reference: &Reference, reason: &str) -> AppError {
    let mut err = AppError::new(
        ErrorCategory::ReferenceError,
        format!(
            "{} references <%= {} %> but {}",
            target, reference, reason
        ),
    )
    .with_code("BW-REF-002");
    err.add_context("slot", &target.to_string());
    err
}

fn serialization_error(err: serde_json::Error) -> AppError {
    AppError::new(
        ErrorCategory::SerializationError,
        format!("failed to serialize step files: {}", err),
    )
}

impl ResolvedPipeline {
    /// Runtime output references a step still carries after static resolution.
    pub fn runtime_references(&self, step_id: &str) -> Result<Vec<Reference>, AppError> {
        let Some(step) = self.steps.get(step_id) else {
            return Ok(Vec::new());
        };
        let value = serde_json::to_value(step).map_err(serialization_error)?;
        let mut references: Vec<Reference> = collect_references(&value)?
            .into_iter()
            .filter(Reference::is_runtime)
            .collect();
        references.sort();
        references.dedup();
        Ok(references)
    }
}
