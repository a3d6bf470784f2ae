//! Whitespace and comment stripping for stylesheets.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CssMinifyError {
    #[error("unterminated comment starting on line {line}")]
    UnterminatedComment { line: usize },
    #[error("unterminated string starting on line {line}")]
    UnterminatedString { line: usize },
    #[error("unexpected '}}' on line {line}")]
    Unbalanced { line: usize },
    #[error("{open} block(s) left open at end of input")]
    Unclosed { open: usize },
}

/// Characters that never need whitespace on either side.
const TIGHT: &[char] = &['{', '}', ':', ';', ',', '>'];

/// Minify a stylesheet.
pub fn minify_css(src: &str) -> Result<String, CssMinifyError> {
    let chars: Vec<char> = src.chars().collect();
    let mut out = String::with_capacity(src.len());
    let mut line = 1usize;
    let mut depth = 0usize;
    let mut pending_space = false;
    let mut i = 0usize;

    while i < chars.len() {
        let ch = chars[i];

        if ch == '/' && chars.get(i + 1) == Some(&'*') {
            let start_line = line;
            let mut j = i + 2;
            loop {
                match chars.get(j) {
                    None => return Err(CssMinifyError::UnterminatedComment { line: start_line }),
                    Some('*') if chars.get(j + 1) == Some(&'/') => break,
                    Some('\n') => line += 1,
                    _ => {}
                }
                j += 1;
            }
            i = j + 2;
            pending_space = true;
            continue;
        }

        if ch.is_whitespace() {
            if ch == '\n' {
                line += 1;
            }
            pending_space = true;
            i += 1;
            continue;
        }

        if pending_space {
            pending_space = false;
            let previous = out.chars().last();
            if previous.is_some_and(|p| !TIGHT.contains(&p)) && !TIGHT.contains(&ch) {
                out.push(' ');
            }
        }

        match ch {
            '"' | '\'' => {
                let start_line = line;
                let mut j = i + 1;
                loop {
                    match chars.get(j) {
                        None | Some('\n') => {
                            return Err(CssMinifyError::UnterminatedString { line: start_line })
                        }
                        Some('\\') => j += 2,
                        Some(c) if *c == ch => break,
                        _ => j += 1,
                    }
                }
                out.extend(&chars[i..=j]);
                i = j + 1;
                continue;
            }
            '{' => depth += 1,
            '}' => {
                if depth == 0 {
                    return Err(CssMinifyError::Unbalanced { line });
                }
                depth -= 1;
                if out.ends_with(';') {
                    out.pop();
                }
            }
            _ => {}
        }
        out.push(ch);
        i += 1;
    }

    if depth > 0 {
        return Err(CssMinifyError::Unclosed { open: depth });
    }
    Ok(out)
}

/// Minify and prefix a banner; a comment banner from an earlier run is dropped first.
pub fn minify_css_with_banner(src: &str, banner: &str) -> Result<String, CssMinifyError> {
    let body = minify_css(src)?;
    Ok(format!("{}{}", banner, body))
}
