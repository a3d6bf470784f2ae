#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Read a UTF-8 file, attaching the path to any failure.
pub fn read_text(path: &Path) -> Result<String, AppError> {
    fs::read_to_string(path).map_err(|err| AppError::io("read", path, err))
}

/// Write a file, creating parent directories as needed.
pub fn write_text(path: &Path, content: &str) -> Result<(), AppError> {
    ensure_parent(path)?;
    fs::write(path, content).map_err(|err| AppError::io("write", path, err))
}

/// Copy `from` to `to`, creating parent directories. Copying a file onto itself is a no-op.
pub fn copy_file(from: &Path, to: &Path) -> Result<u64, AppError> {
    if same_file(from, to) {
        return Ok(0);
    }
    ensure_parent(to)?;
    fs::copy(from, to).map_err(|err| AppError::io("copy", from, err))
}

/// Remove a file or a directory tree.
pub fn remove_path(path: &Path) -> Result<(), AppError> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|err| AppError::io("remove", path, err))
}

pub fn ensure_parent(path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|err| AppError::io("create directory", parent, err))?;
        }
    }
    Ok(())
}

/// Render a path with `/` separators regardless of platform.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            Component::ParentDir => Some("..".to_string()),
            Component::RootDir => Some(String::new()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// True when `path` stays inside its base once `..` segments are applied.
pub fn is_contained(path: &Path) -> bool {
    if path.is_absolute() {
        return false;
    }
    let mut depth: i64 = 0;
    for component in path.components() {
        match component {
            Component::ParentDir => depth -= 1,
            Component::Normal(_) => depth += 1,
            _ => {}
        }
        if depth < 0 {
            return false;
        }
    }
    true
}

/// Resolve a configured path against the project root unless it is already absolute.
pub fn resolve(root: &Path, path: &str) -> PathBuf {
    let candidate = PathBuf::from(path);
    if candidate.is_absolute() {
        candidate
    } else {
        root.join(candidate)
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}
