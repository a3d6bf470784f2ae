//! Content fingerprints and reference rewriting for cache-busted output.

use sha2::{Digest, Sha256};

/// Number of hex digits of the digest kept in a fingerprint directory name.
pub const FINGERPRINT_LEN: usize = 10;

/// Directory name derived from file contents: `v` followed by a digest prefix.
///
/// Entries are `(relative path, content)` pairs; their order does not matter.
pub fn content_fingerprint(files: &[(String, Vec<u8>)]) -> String {
    let mut sorted: Vec<&(String, Vec<u8>)> = files.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut hasher = Sha256::new();
    for (path, content) in sorted {
        hasher.update(path.as_bytes());
        hasher.update([0u8]);
        hasher.update(content);
        hasher.update([0u8]);
    }
    let digest = hex::encode(hasher.finalize());
    format!("v{}", &digest[..FINGERPRINT_LEN])
}

/// Whether `name` has the shape [`content_fingerprint`] produces.
pub fn is_fingerprint_name(name: &str) -> bool {
    name.len() == 1 + FINGERPRINT_LEN
        && name.starts_with('v')
        && name[1..]
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Result of rewriting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub text: String,
    pub replacements: usize,
}

/// Prefix every reference to a moved entry with `dir/`.
///
/// `entries` are top-level names under the busted directory; directories end
/// with `/`. A reference only counts when it starts at a boundary (start of
/// text, quote, `(`, `=`, `,`, whitespace) or right after `./`. References
/// already starting with `dir/` are left alone, and so is an entry named `dir`.
pub fn rewrite_references(text: &str, entries: &[String], dir: &str) -> Rewritten {
    let own_prefix = format!("{}/", dir);
    let mut ordered: Vec<&str> = entries
        .iter()
        .map(String::as_str)
        .filter(|entry| !entry.is_empty() && *entry != own_prefix && *entry != dir)
        .collect();
    ordered.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut replacements = 0usize;
    let mut last = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        if text.is_char_boundary(i) && at_boundary(bytes, i) {
            let rest = &text[i..];
            if rest.starts_with(&own_prefix) {
                i += own_prefix.len();
                continue;
            }
            let hit = ordered
                .iter()
                .find(|entry| rest.starts_with(**entry) && ends_cleanly(bytes, i + entry.len(), entry));
            if let Some(entry) = hit {
                out.push_str(&text[last..i]);
                out.push_str(dir);
                out.push('/');
                out.push_str(entry);
                i += entry.len();
                last = i;
                replacements += 1;
                continue;
            }
        }
        i += 1;
    }
    out.push_str(&text[last..]);

    Rewritten {
        text: out,
        replacements,
    }
}

fn at_boundary(bytes: &[u8], i: usize) -> bool {
    if i == 0 {
        return true;
    }
    match bytes[i - 1] {
        b'"' | b'\'' | b'`' | b'(' | b'=' | b',' => true,
        b if b.is_ascii_whitespace() => true,
        b'/' => i >= 2 && bytes[i - 2] == b'.' && (i == 2 || !matches!(bytes[i - 3], b'.' | b'/')),
        _ => false,
    }
}

fn ends_cleanly(bytes: &[u8], end: usize, entry: &str) -> bool {
    if entry.ends_with('/') {
        return true;
    }
    match bytes.get(end) {
        None => true,
        Some(b) => !(b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-')),
    }
}
