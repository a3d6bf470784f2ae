#![allow(clippy::result_large_err)]

//! File-set expansion and helpers shared by the built-in operators.

use crate::core::error::AppError;
use crate::core::pipeline::schema::{FileSet, StepDescriptor};
use crate::core::types::ErrorCategory;
use crate::utils::files::{read_text, resolve, slash_path, write_text};
use crate::utils::glob::{expand, ExpandOptions};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// One matched source and where its result goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMapping {
    pub src: PathBuf,
    /// Path of the match relative to the file set's working directory, `/`-separated.
    pub relative: String,
    pub dest: PathBuf,
    pub is_dir: bool,
}

/// Expand a file set into source/destination pairs.
///
/// With `expand`, each match lands at `dest/<relative>` (or `dest/<basename>`
/// when flattened), defaulting to the working directory itself. Without it,
/// every match goes to `dest`, or stays where it is when `dest` is absent.
/// `rename` overrides the destination of every match.
pub fn map_file_set(
    root: &Path,
    set: &FileSet,
    options: ExpandOptions,
) -> Result<Vec<FileMapping>, AppError> {
    let base = match set.cwd.as_deref() {
        Some(cwd) if !cwd.trim().is_empty() => resolve(root, cwd),
        _ => root.to_path_buf(),
    };
    let patterns = set.patterns();
    if patterns.is_empty() {
        return Ok(Vec::new());
    }

    let matches = expand(&base, &patterns, options)?;
    let mut mappings = Vec::with_capacity(matches.len());
    for relative in matches {
        let src = base.join(&relative);
        let dest = if let Some(rename) = set.rename.as_deref() {
            resolve(root, rename)
        } else if set.expand {
            let dir = set
                .dest
                .as_deref()
                .map(|dest| resolve(root, dest))
                .unwrap_or_else(|| base.clone());
            if set.flatten {
                match relative.file_name() {
                    Some(name) => dir.join(name),
                    None => dir.join(&relative),
                }
            } else {
                dir.join(&relative)
            }
        } else {
            set.dest
                .as_deref()
                .map(|dest| resolve(root, dest))
                .unwrap_or_else(|| src.clone())
        };
        mappings.push(FileMapping {
            is_dir: src.is_dir(),
            relative: slash_path(&relative),
            src,
            dest,
        });
    }
    Ok(mappings)
}

/// Expand every file set of a step in declaration order.
pub fn map_step_files(
    root: &Path,
    step: &StepDescriptor,
    options: ExpandOptions,
) -> Result<Vec<FileMapping>, AppError> {
    let mut all = Vec::new();
    for set in &step.files {
        all.extend(map_file_set(root, set, options)?);
    }
    Ok(all)
}

/// Read every matched file, transform it, then write all results.
///
/// Nothing is written unless every file transformed successfully.
pub fn transform_files<F>(root: &Path, step: &StepDescriptor, mut transform: F) -> Result<usize, AppError>
where
    F: FnMut(&FileMapping, &str) -> Result<String, AppError>,
{
    let mappings = map_step_files(root, step, ExpandOptions::default())?;
    let mut results = Vec::with_capacity(mappings.len());
    for mapping in &mappings {
        let content = read_text(&mapping.src)?;
        let output = transform(mapping, &content).map_err(|mut err| {
            err.add_context("file", &mapping.src.display().to_string());
            err
        })?;
        tracing::debug!(src = %mapping.src.display(), dest = %mapping.dest.display(), "transformed");
        results.push((mapping.dest.clone(), output));
    }
    for (dest, output) in &results {
        write_text(dest, output)?;
    }
    Ok(results.len())
}

pub fn require_files(kind: &str, step: &StepDescriptor) -> Result<(), AppError> {
    if step.files.is_empty() {
        return Err(AppError::new(
            ErrorCategory::ValidationError,
            format!("{} step needs at least one file set", kind),
        )
        .with_code("BW-OP-002"));
    }
    Ok(())
}

/// A non-empty string option.
pub fn required_str<'a>(kind: &str, step: &'a StepDescriptor, key: &str) -> Result<&'a str, AppError> {
    match step.option_str(key).map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(AppError::new(
            ErrorCategory::ValidationError,
            format!("{} step requires a non-empty options.{}", kind, key),
        )
        .with_code("BW-OP-001")),
    }
}

/// An option given as a single string or a list of strings; missing means empty.
pub fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(text)) => vec![text.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Banner option, empty when unset.
pub fn banner(step: &StepDescriptor) -> &str {
    step.option_str("banner").unwrap_or("")
}

pub fn asset_error(code: &str, path: &Path, err: impl std::fmt::Display) -> AppError {
    AppError::new(
        ErrorCategory::ParseError,
        format!("{}: {}", path.display(), err),
    )
    .with_code(code)
}
