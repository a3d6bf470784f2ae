#![allow(clippy::result_large_err)]

//! Glob patterns used by file sets, compiled to anchored regexes.
//!
//! Supported syntax: `*`, `**`, `?`, `[...]`, `{a,b}` and a leading `!` for
//! negation. A trailing `/**` also matches the directory itself, so
//! `!out/abc/**` protects both `out/abc` and everything below it.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const META_CHARS: &[char] = &['*', '?', '[', '{'];

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    raw: String,
    negated: bool,
    literal: bool,
    base: String,
    regex: Regex,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Result<Self, AppError> {
        let trimmed = pattern.trim();
        let (negated, body) = match trimmed.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let body = normalize(body);
        if body.is_empty() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                format!("empty glob pattern '{}'", pattern),
            )
            .with_code("BW-GLOB-001"));
        }

        let literal = !body.contains(META_CHARS);
        let base = literal_base(&body);
        let regex = Regex::new(&translate(&body)?).map_err(|err| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!("invalid glob pattern '{}': {}", pattern, err),
            )
            .with_code("BW-GLOB-002")
        })?;

        Ok(Self {
            raw: pattern.to_string(),
            negated,
            literal,
            base,
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// True when the pattern carries no wildcard and denotes one explicit path.
    pub fn is_literal(&self) -> bool {
        self.literal
    }

    /// Leading directory segments that contain no wildcard.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Match a `/`-separated path relative to the pattern's working directory.
    pub fn matches(&self, relative: &str) -> bool {
        self.regex.is_match(&normalize(relative))
    }

    /// The pattern body without negation, normalized.
    pub fn body(&self) -> String {
        normalize(self.raw.trim().trim_start_matches('!'))
    }
}

/// Controls how [`expand`] treats matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpandOptions {
    /// Keep duplicates and per-pattern order instead of building a set.
    pub keep_duplicates: bool,
    /// Report directories as well as files.
    pub include_dirs: bool,
    /// Fail when a literal (wildcard-free) pattern names a missing path.
    pub require_literals: bool,
}

/// Expand an ordered pattern list under `cwd`.
///
/// Positive patterns append their matches (sorted per pattern); negated patterns
/// drop already collected entries. Returned paths are relative to `cwd`.
pub fn expand(
    cwd: &Path,
    patterns: &[String],
    options: ExpandOptions,
) -> Result<Vec<PathBuf>, AppError> {
    let mut collected: Vec<String> = Vec::new();
    for raw in patterns {
        let pattern = GlobPattern::new(raw)?;
        if pattern.is_negated() {
            collected.retain(|path| !pattern.matches(path));
            continue;
        }

        let matches = if pattern.is_literal() {
            let body = pattern.body();
            let target = cwd.join(&body);
            let keep = if options.include_dirs {
                target.exists()
            } else {
                target.is_file()
            };
            if keep {
                vec![body]
            } else if options.require_literals {
                return Err(AppError::new(
                    ErrorCategory::IoError,
                    format!("source file not found: {}", target.display()),
                )
                .with_code("BW-GLOB-003"));
            } else {
                tracing::debug!(pattern = %raw, "literal pattern matched nothing");
                Vec::new()
            }
        } else {
            let start = cwd.join(pattern.base());
            let mut found = Vec::new();
            if start.is_dir() {
                walk(&start, pattern.base(), options.include_dirs, &mut found)?;
            }
            let mut found: Vec<String> = found
                .into_iter()
                .filter(|candidate| pattern.matches(candidate))
                .collect();
            found.sort();
            if found.is_empty() {
                tracing::debug!(pattern = %raw, cwd = %cwd.display(), "glob matched nothing");
            }
            found
        };

        for path in matches {
            if options.keep_duplicates || !collected.contains(&path) {
                collected.push(path);
            }
        }
    }
    Ok(collected.into_iter().map(PathBuf::from).collect())
}

/// Collect every entry below `dir`, recording paths relative to the walk root.
///
/// Entries come out depth-first, sorted by file name within each directory.
pub fn walk(
    dir: &Path,
    prefix: &str,
    include_dirs: bool,
    out: &mut Vec<String>,
) -> Result<(), AppError> {
    let entries = WalkDir::new(dir)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name();
    for entry in entries {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(dir).to_path_buf();
            AppError::io("read directory", &path, err.into())
        })?;
        if entry.file_type().is_dir() && !include_dirs {
            continue;
        }
        let below = relative_to(dir, entry.path());
        out.push(if prefix.is_empty() {
            below
        } else {
            format!("{}/{}", prefix, below)
        });
    }
    Ok(())
}

/// Entries directly inside `dir`, sorted by name, directories suffixed with `/`.
pub fn top_level_entries(dir: &Path) -> Result<Vec<String>, AppError> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|err| AppError::io("read directory", dir, err.into()))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if entry.file_type().is_dir() {
            names.push(format!("{}/", name));
        } else {
            names.push(name);
        }
    }
    Ok(names)
}

fn relative_to(root: &Path, path: &Path) -> String {
    let below = path.strip_prefix(root).unwrap_or(path);
    below
        .components()
        .map(|part| part.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a working directory onto a pattern, keeping a leading `!`.
pub fn prefix_pattern(cwd: &str, pattern: &str) -> String {
    let trimmed = pattern.trim();
    let (bang, body) = match trimmed.strip_prefix('!') {
        Some(rest) => ("!", rest),
        None => ("", trimmed),
    };
    let cwd = normalize(cwd);
    if cwd.is_empty() || cwd == "." {
        format!("{}{}", bang, normalize(body))
    } else {
        format!("{}{}/{}", bang, cwd, normalize(body))
    }
}

/// Normalize separators and strip `./` prefixes and trailing slashes.
pub fn normalize(path: &str) -> String {
    let mut text = path.replace('\\', "/");
    while let Some(rest) = text.strip_prefix("./") {
        text = rest.to_string();
    }
    while text.contains("//") {
        text = text.replace("//", "/");
    }
    let trimmed = text.trim_end_matches('/');
    if trimmed.is_empty() && !text.is_empty() {
        return "/".to_string();
    }
    trimmed.to_string()
}

fn literal_base(body: &str) -> String {
    let segments: Vec<&str> = body.split('/').collect();
    let mut base = Vec::new();
    for (index, segment) in segments.iter().enumerate() {
        if segment.contains(META_CHARS) || index == segments.len() - 1 {
            break;
        }
        base.push(*segment);
    }
    base.join("/")
}

fn translate(body: &str) -> Result<String, AppError> {
    let chars: Vec<char> = body.chars().collect();
    let mut out = String::from("^");
    let mut index = 0;
    let mut brace_depth = 0usize;

    while index < chars.len() {
        let ch = chars[index];
        match ch {
            '*' => {
                let double = chars.get(index + 1) == Some(&'*');
                if double {
                    let at_segment_start = index == 0 || chars[index - 1] == '/';
                    let next = chars.get(index + 2);
                    if at_segment_start && next == Some(&'/') {
                        out.push_str("(?:[^/]+/)*");
                        index += 3;
                        continue;
                    }
                    if at_segment_start && next.is_none() {
                        if out.ends_with('/') {
                            out.pop();
                            out.push_str("(?:/.*)?");
                        } else {
                            out.push_str(".*");
                        }
                        index += 2;
                        continue;
                    }
                    out.push_str("[^/]*");
                    index += 2;
                    continue;
                }
                out.push_str("[^/]*");
            }
            '?' => out.push_str("[^/]"),
            '[' => {
                let close = chars[index + 1..]
                    .iter()
                    .position(|c| *c == ']')
                    .map(|offset| index + 1 + offset);
                let Some(close) = close else {
                    return Err(AppError::new(
                        ErrorCategory::ValidationError,
                        format!("unclosed character class in glob '{}'", body),
                    )
                    .with_code("BW-GLOB-004"));
                };
                let mut class: String = chars[index + 1..close].iter().collect();
                if let Some(rest) = class.strip_prefix('!') {
                    class = format!("^{}", rest);
                }
                out.push('[');
                out.push_str(&class.replace('\\', "\\\\"));
                out.push(']');
                index = close + 1;
                continue;
            }
            '{' => {
                brace_depth += 1;
                out.push_str("(?:");
            }
            '}' if brace_depth > 0 => {
                brace_depth -= 1;
                out.push(')');
            }
            ',' if brace_depth > 0 => out.push('|'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
        index += 1;
    }

    if brace_depth > 0 {
        return Err(AppError::new(
            ErrorCategory::ValidationError,
            format!("unclosed brace group in glob '{}'", body),
        )
        .with_code("BW-GLOB-005"));
    }
    out.push('$');
    Ok(out)
}
