#![allow(clippy::result_large_err)] // Pipeline schema APIs return AppError to preserve structured validation context without boxing.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use indexmap::IndexMap;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

const SUPPORTED_VERSION: &str = "1";

/// Pipeline shipped with the binary, used when no `--pipeline` file is given.
pub const DEFAULT_PIPELINE: &str = include_str!("default_pipeline.yaml");

fn default_options_value() -> Value {
    Value::Object(Map::new())
}

/// Root document describing build steps and task aliases.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineDocument {
    pub version: String,
    /// Shared values addressable as `<%= meta.<key> %>`.
    #[serde(default)]
    pub meta: IndexMap<String, Value>,
    /// Steps keyed `kind.target`, in declaration order.
    pub steps: IndexMap<String, StepDescriptor>,
    /// Named ordered lists of step ids or other task names.
    #[serde(default)]
    pub tasks: IndexMap<String, Vec<String>>,
}

/// One configured unit of build work.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StepDescriptor {
    #[serde(default = "default_options_value")]
    pub options: Value,
    #[serde(default)]
    pub files: Vec<FileSet>,
    /// Free-form extra input, e.g. the pattern list of a `clean` step.
    #[serde(default)]
    pub params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl StepDescriptor {
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }
}

/// Input/output mapping of a step, modelled on task-runner file objects.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct FileSet {
    /// Map each match to `dest/<path relative to cwd>` instead of one target.
    #[serde(default)]
    pub expand: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(default, deserialize_with = "entries_one_or_many")]
    pub src: Vec<SourceEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,
    /// Fixed output path for every match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
    /// Drop directory components of matches when expanding.
    #[serde(default)]
    pub flatten: bool,
}

/// One `src` entry: a pattern, a nested list, or patterns sharing a working directory.
///
/// Strings are patterns, sequences are nested lists and only mappings are groups.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SourceEntry {
    Pattern(String),
    Group(SourceGroup),
    Nested(Vec<SourceEntry>),
}

impl<'de> Deserialize<'de> for SourceEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntryVisitor;

        impl<'de> Visitor<'de> for EntryVisitor {
            type Value = SourceEntry;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a pattern, a list of entries or a {cwd, patterns} mapping")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<SourceEntry, E> {
                Ok(SourceEntry::Pattern(value.to_string()))
            }

            fn visit_string<E: de::Error>(self, value: String) -> Result<SourceEntry, E> {
                Ok(SourceEntry::Pattern(value))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<SourceEntry, A::Error> {
                let mut entries = Vec::new();
                while let Some(entry) = seq.next_element::<SourceEntry>()? {
                    entries.push(entry);
                }
                Ok(SourceEntry::Nested(entries))
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<SourceEntry, A::Error> {
                SourceGroup::deserialize(de::value::MapAccessDeserializer::new(map))
                    .map(SourceEntry::Group)
            }
        }

        deserializer.deserialize_any(EntryVisitor)
    }
}

/// Patterns resolved against `cwd`; negations keep their leading `!`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SourceGroup {
    pub cwd: String,
    #[serde(deserialize_with = "strings_one_or_many")]
    pub patterns: Vec<String>,
}

fn entries_one_or_many<'de, D>(deserializer: D) -> Result<Vec<SourceEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match SourceEntry::deserialize(deserializer)? {
        SourceEntry::Nested(entries) => entries,
        other => vec![other],
    })
}

fn strings_one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(pattern) => vec![pattern],
        OneOrMany::Many(patterns) => patterns,
    })
}

impl SourceEntry {
    /// Flatten into plain patterns, joining group working directories onto their patterns.
    pub fn flatten_into(&self, out: &mut Vec<String>) {
        match self {
            SourceEntry::Pattern(pattern) => out.push(pattern.clone()),
            SourceEntry::Group(group) => out.extend(
                group
                    .patterns
                    .iter()
                    .map(|pattern| crate::utils::glob::prefix_pattern(&group.cwd, pattern)),
            ),
            SourceEntry::Nested(entries) => {
                for entry in entries {
                    entry.flatten_into(out);
                }
            }
        }
    }
}

impl FileSet {
    /// Source patterns in list order.
    pub fn patterns(&self) -> Vec<String> {
        let mut out = Vec::new();
        for entry in &self.src {
            entry.flatten_into(&mut out);
        }
        out
    }
}

/// Split a step id into `(kind, target)`.
pub fn split_step_id(id: &str) -> Option<(&str, &str)> {
    let (kind, target) = id.split_once('.')?;
    if kind.is_empty() || target.is_empty() {
        return None;
    }
    Some((kind, target))
}

impl PipelineDocument {
    /// Load and validate a pipeline document from a YAML file.
    pub fn load_from_file(path: &Path) -> Result<Self, AppError> {
        let text = fs::read_to_string(path).map_err(|err| {
            AppError::new(
                ErrorCategory::IoError,
                format!("failed to read {}: {}", path.display(), err),
            )
        })?;
        Self::parse(&text).map_err(|mut err| {
            err.add_context("file", &path.display().to_string());
            err
        })
    }

    /// The pipeline embedded in the binary.
    pub fn builtin() -> Result<Self, AppError> {
        Self::parse(DEFAULT_PIPELINE)
    }

    pub fn parse(text: &str) -> Result<Self, AppError> {
        let doc: PipelineDocument = serde_yaml::from_str(text).map_err(|err| {
            AppError::new(
                ErrorCategory::ParseError,
                format!("failed to parse pipeline document: {}", err),
            )
            .with_code("BW-PIPE-001")
        })?;
        doc.validate()?;
        Ok(doc)
    }

    /// Validate structural requirements; references are checked by the reference graph.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.version != SUPPORTED_VERSION {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                format!(
                    "unsupported pipeline version {}, expected {}",
                    self.version, SUPPORTED_VERSION
                ),
            )
            .with_code("BW-PIPE-002"));
        }

        if self.steps.is_empty() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "pipeline must define at least one step",
            )
            .with_code("BW-PIPE-002"));
        }

        let mut targets = HashSet::new();
        for (id, step) in &self.steps {
            if split_step_id(id).is_none() {
                return Err(AppError::new(
                    ErrorCategory::ValidationError,
                    format!("step id '{}' must have the form <kind>.<target>", id),
                )
                .with_code("BW-PIPE-003"));
            }
            if !step.options.is_object() {
                return Err(AppError::new(
                    ErrorCategory::ValidationError,
                    format!("step {} options must be a mapping", id),
                )
                .with_code("BW-PIPE-003"));
            }
            targets.insert(id.as_str());
        }

        for (name, members) in &self.tasks {
            if targets.contains(name.as_str()) {
                return Err(AppError::new(
                    ErrorCategory::ValidationError,
                    format!("task name '{}' shadows a step id", name),
                )
                .with_code("BW-PIPE-004"));
            }
            if members.is_empty() {
                return Err(AppError::new(
                    ErrorCategory::ValidationError,
                    format!("task '{}' lists no steps", name),
                )
                .with_code("BW-PIPE-004"));
            }
        }

        Ok(())
    }
}
