#![allow(clippy::result_large_err)]

//! `<%= path %>` placeholder tokens and their substitution.
//!
//! Paths have four roots:
//! - `config.<path>` reads the build configuration,
//! - `meta.<key>` reads the pipeline document's `meta` table,
//! - `<kind>.<target>.options.<key>` reads another step's option,
//! - `<kind>.<target>.outputs.<key>` reads a value published by a step at run time.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::OnceLock;

static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
static PATH_RE: OnceLock<Regex> = OnceLock::new();

fn token_regex() -> &'static Regex {
    TOKEN_RE.get_or_init(|| Regex::new(r"<%=(.*?)%>").expect("token regex is valid"))
}

fn path_regex() -> &'static Regex {
    PATH_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("path regex is valid"))
}

/// A parsed placeholder path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reference {
    Config(String),
    Meta(String),
    StepOption { step: String, key: String },
    StepOutput { step: String, key: String },
}

impl Reference {
    pub fn parse(path: &str) -> Result<Self, AppError> {
        let path = path.trim();
        if !path_regex().is_match(path) {
            return Err(invalid_reference(path, "contains unsupported characters"));
        }
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(invalid_reference(path, "has an empty segment"));
        }

        match segments[0] {
            "config" if segments.len() > 1 => Ok(Reference::Config(segments[1..].join("."))),
            "meta" if segments.len() > 1 => Ok(Reference::Meta(segments[1..].join("."))),
            "config" | "meta" => Err(invalid_reference(path, "names no key")),
            _ if segments.len() >= 4 => {
                let step = format!("{}.{}", segments[0], segments[1]);
                let key = segments[3..].join(".");
                match segments[2] {
                    "options" => Ok(Reference::StepOption { step, key }),
                    "outputs" => Ok(Reference::StepOutput { step, key }),
                    other => Err(invalid_reference(
                        path,
                        &format!("expected 'options' or 'outputs', found '{}'", other),
                    )),
                }
            }
            _ => Err(invalid_reference(
                path,
                "must be config.*, meta.* or <kind>.<target>.(options|outputs).<key>",
            )),
        }
    }

    /// Step id this reference points into, if any.
    pub fn step(&self) -> Option<&str> {
        match self {
            Reference::StepOption { step, .. } | Reference::StepOutput { step, .. } => Some(step),
            _ => None,
        }
    }

    /// True for references that only resolve once a step has run.
    pub fn is_runtime(&self) -> bool {
        matches!(self, Reference::StepOutput { .. })
    }

    /// First segment of the key, which names the slot holding the value.
    pub fn slot_key(&self) -> &str {
        let key = match self {
            Reference::Config(key) | Reference::Meta(key) => key,
            Reference::StepOption { key, .. } | Reference::StepOutput { key, .. } => key,
        };
        key.split('.').next().unwrap_or(key)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Config(path) => write!(f, "config.{}", path),
            Reference::Meta(key) => write!(f, "meta.{}", key),
            Reference::StepOption { step, key } => write!(f, "{}.options.{}", step, key),
            Reference::StepOutput { step, key } => write!(f, "{}.outputs.{}", step, key),
        }
    }
}

fn invalid_reference(path: &str, reason: &str) -> AppError {
    AppError::new(
        ErrorCategory::ReferenceError,
        format!("invalid placeholder '<%= {} %>': {}", path, reason),
    )
    .with_code("BW-REF-001")
}

/// All references used inside a text, in order of appearance.
pub fn references_in(text: &str) -> Result<Vec<Reference>, AppError> {
    token_regex()
        .captures_iter(text)
        .map(|caps| Reference::parse(&caps[1]))
        .collect()
}

/// All references used anywhere inside a JSON value.
pub fn collect_references(value: &Value) -> Result<Vec<Reference>, AppError> {
    let mut found = Vec::new();
    collect_into(value, &mut found)?;
    Ok(found)
}

fn collect_into(value: &Value, found: &mut Vec<Reference>) -> Result<(), AppError> {
    match value {
        Value::String(text) => found.extend(references_in(text)?),
        Value::Array(items) => {
            for item in items {
                collect_into(item, found)?;
            }
        }
        Value::Object(map) => {
            for child in map.values() {
                collect_into(child, found)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// True when the text still carries at least one token.
pub fn has_tokens(text: &str) -> bool {
    token_regex().is_match(text)
}

/// Substitute every token in `value`.
///
/// The lookup returns `Ok(None)` to leave a token in place. A string made of a
/// single token takes the referenced value as-is, so lists stay lists; inside
/// an array such a list is spliced into the surrounding items. Tokens embedded
/// in longer text are rendered: lists joined with `,`, scalars printed.
pub fn substitute<F>(value: &Value, lookup: &mut F) -> Result<Value, AppError>
where
    F: FnMut(&Reference) -> Result<Option<Value>, AppError>,
{
    match value {
        Value::String(text) => substitute_str(text, lookup),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let splice = matches!(item, Value::String(text) if whole_token(text).is_some());
                match substitute(item, lookup)? {
                    Value::Array(inner) if splice => out.extend(inner),
                    other => out.push(other),
                }
            }
            Ok(Value::Array(out))
        }
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, child) in map {
                out.insert(key.clone(), substitute(child, lookup)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_str<F>(text: &str, lookup: &mut F) -> Result<Value, AppError>
where
    F: FnMut(&Reference) -> Result<Option<Value>, AppError>,
{
    if let Some(path) = whole_token(text) {
        let reference = Reference::parse(path)?;
        return Ok(match lookup(&reference)? {
            Some(value) => value,
            None => Value::String(text.to_string()),
        });
    }

    let mut rendered = String::with_capacity(text.len());
    let mut last = 0;
    for caps in token_regex().captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        rendered.push_str(&text[last..whole.start()]);
        let reference = Reference::parse(&caps[1])?;
        match lookup(&reference)? {
            Some(value) => rendered.push_str(&render(&value)),
            None => rendered.push_str(whole.as_str()),
        }
        last = whole.end();
    }
    rendered.push_str(&text[last..]);
    Ok(Value::String(rendered))
}

fn whole_token(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    let caps = token_regex().captures(trimmed)?;
    let whole = caps.get(0)?;
    if whole.start() == 0 && whole.end() == trimmed.len() {
        caps.get(1).map(|inner| inner.as_str())
    } else {
        None
    }
}

/// Render a value for interpolation inside a longer string.
pub fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(render).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// Walk a dotted path (`a.b.0.c`) into a JSON value.
pub fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}
