//! JavaScript minification: comment removal and whitespace collapsing.
//!
//! Identifiers are never renamed and no code is removed, so the output is
//! token-for-token identical to the input. Whitespace survives only where two
//! tokens would otherwise fuse, and a line break survives where automatic
//! semicolon insertion may depend on it.

use super::js_lexer::{is_ident_part, tokenize, JsLexError, Token, TokenKind};

/// Minify JavaScript source.
pub fn minify_js(src: &str) -> Result<String, JsLexError> {
    let tokens = tokenize(src)?;
    let mut out = String::with_capacity(src.len());
    let mut previous: Option<Token<'_>> = None;
    let mut gap = false;
    let mut gap_newline = false;

    for token in tokens {
        if token.is_trivia() {
            gap = true;
            gap_newline |= token.has_newline() || token.kind == TokenKind::LineComment;
            continue;
        }

        if let Some(prev) = previous {
            if gap {
                out.push_str(separator(&prev, &token, gap_newline));
            }
        }
        out.push_str(token.text);
        previous = Some(token);
        gap = false;
        gap_newline = false;
    }

    Ok(out)
}

/// Minify and prefix a banner. A comment banner from an earlier run is removed
/// with the other comments, so the result is stable across reruns.
pub fn minify_js_with_banner(src: &str, banner: &str) -> Result<String, JsLexError> {
    let body = minify_js(src)?;
    Ok(format!("{}{}", banner, body))
}

/// What to put between two significant tokens that had whitespace or comments between them.
fn separator(prev: &Token<'_>, next: &Token<'_>, had_newline: bool) -> &'static str {
    if had_newline && !newline_is_redundant(prev, next) {
        return "\n";
    }
    if needs_space(prev, next) {
        " "
    } else {
        ""
    }
}

fn newline_is_redundant(prev: &Token<'_>, next: &Token<'_>) -> bool {
    const CONTINUES_AFTER: &[char] = &[
        ';', ',', '{', '(', '[', ':', '=', '&', '|', '?', '!', '~', '^', '<', '>', '*', '%',
    ];
    const CONTINUES_BEFORE: &[char] = &[')', ']', '}', ',', ';', ':', '.', '?', '='];

    let prev_is_operator = prev.kind == TokenKind::Punct
        && prev.text.chars().last().is_some_and(|ch| CONTINUES_AFTER.contains(&ch));
    let next_is_operator = next.kind == TokenKind::Punct
        && next.text.chars().next().is_some_and(|ch| CONTINUES_BEFORE.contains(&ch));
    prev_is_operator || next_is_operator
}

fn needs_space(prev: &Token<'_>, next: &Token<'_>) -> bool {
    let (Some(last), Some(first)) = (prev.text.bytes().last(), next.text.bytes().next()) else {
        return false;
    };

    if is_ident_part(last) && is_ident_part(first) {
        return true;
    }
    if prev.kind == TokenKind::Number && first == b'.' {
        return true;
    }
    matches!(
        (last, first),
        (b'+', b'+') | (b'-', b'-') | (b'/', b'/') | (b'/', b'*') | (b'<', b'!')
    )
}
