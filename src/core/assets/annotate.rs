//! Explicit dependency-injection annotations for AngularJS registrations.
//!
//! `app.controller('Home', function ($scope, api) { ... })` becomes
//! `app.controller('Home', ['$scope', 'api', function ($scope, api) { ... }])`
//! so renaming parameters cannot break injector lookups. Only insertions are
//! made; everything else is copied byte for byte.

use super::js_lexer::{tokenize, JsLexError, Token, TokenKind};

/// Registration methods whose injectable is the second argument.
const NAMED_REGISTRATIONS: &[&str] = &[
    "controller",
    "service",
    "factory",
    "directive",
    "filter",
    "provider",
    "animation",
    "decorator",
    "component",
];

/// Registration methods whose injectable is the first argument.
const BLOCK_REGISTRATIONS: &[&str] = &["config", "run"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotated {
    pub code: String,
    /// Number of functions wrapped in array notation.
    pub annotations: usize,
}

/// Add array-notation annotations to every bare injectable function.
pub fn annotate(src: &str) -> Result<Annotated, JsLexError> {
    let all = tokenize(src)?;
    let tokens: Vec<Token<'_>> = all.into_iter().filter(|token| !token.is_trivia()).collect();
    let mut inserts: Vec<(usize, String)> = Vec::new();

    for index in 0..tokens.len() {
        if !(tokens[index].is_punct('.') && index + 2 < tokens.len()) {
            continue;
        }
        let method = &tokens[index + 1];
        if method.kind != TokenKind::Ident || !tokens[index + 2].is_punct('(') {
            continue;
        }
        let argument = if NAMED_REGISTRATIONS.contains(&method.text) {
            1
        } else if BLOCK_REGISTRATIONS.contains(&method.text) {
            0
        } else {
            continue;
        };

        let starts = argument_starts(&tokens, index + 2);
        let Some(&start) = starts.get(argument) else {
            continue;
        };

        if tokens[start].is_ident("function") {
            if let Some(edit) = wrap_function(&tokens, start) {
                inserts.extend(edit);
            }
        } else if method.text == "component" && tokens[start].is_punct('{') {
            if let Some(function) = component_controller(&tokens, start) {
                if let Some(edit) = wrap_function(&tokens, function) {
                    inserts.extend(edit);
                }
            }
        }
    }

    let annotations = inserts.len() / 2;
    inserts.sort_by(|a, b| b.0.cmp(&a.0));
    let mut code = src.to_string();
    for (offset, text) in inserts {
        code.insert_str(offset, &text);
    }
    Ok(Annotated { code, annotations })
}

/// Token indices where each top-level argument of the call opened at `open` begins.
fn argument_starts(tokens: &[Token<'_>], open: usize) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut depth = 0usize;
    let mut expect_argument = true;
    for (index, token) in tokens.iter().enumerate().skip(open + 1) {
        if token.kind == TokenKind::Punct {
            match token.text {
                "(" | "[" | "{" => {
                    if depth == 0 && expect_argument {
                        starts.push(index);
                        expect_argument = false;
                    }
                    depth += 1;
                    continue;
                }
                ")" | "]" | "}" => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    continue;
                }
                "," if depth == 0 => {
                    expect_argument = true;
                    continue;
                }
                _ => {}
            }
        }
        if depth == 0 && expect_argument {
            starts.push(index);
            expect_argument = false;
        }
    }
    starts
}

/// Index of the token closing the bracket opened at `open`.
fn matching_close(tokens: &[Token<'_>], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (index, token) in tokens.iter().enumerate().skip(open) {
        if token.kind != TokenKind::Punct {
            continue;
        }
        match token.text {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

/// Build the two insertions wrapping the function expression starting at `start`.
fn wrap_function(tokens: &[Token<'_>], start: usize) -> Option<[(usize, String); 2]> {
    let mut cursor = start + 1;
    if tokens.get(cursor)?.kind == TokenKind::Ident {
        cursor += 1;
    }
    if !tokens.get(cursor)?.is_punct('(') {
        return None;
    }
    let params_close = matching_close(tokens, cursor)?;

    let mut names = Vec::new();
    for token in &tokens[cursor + 1..params_close] {
        match token.kind {
            TokenKind::Ident => names.push(token.text),
            TokenKind::Punct if token.text == "," => {}
            // Defaults and destructuring cannot be annotated by name.
            _ => return None,
        }
    }
    if names.is_empty() {
        return None;
    }

    let body_open = params_close + 1;
    if !tokens.get(body_open)?.is_punct('{') {
        return None;
    }
    let body_close = matching_close(tokens, body_open)?;

    let quoted: Vec<String> = names.iter().map(|name| format!("'{}'", name)).collect();
    Some([
        (tokens[start].start, format!("[{}, ", quoted.join(", "))),
        (tokens[body_close].end(), "]".to_string()),
    ])
}

/// Find `controller: function (...)` directly inside a component definition object.
fn component_controller(tokens: &[Token<'_>], open: usize) -> Option<usize> {
    let close = matching_close(tokens, open)?;
    let mut depth = 0usize;
    for index in open + 1..close {
        let token = &tokens[index];
        if token.kind == TokenKind::Punct {
            match token.text {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                _ => {}
            }
            continue;
        }
        let is_key = token.is_ident("controller")
            || (token.kind == TokenKind::Str && token.text.len() > 2 && &token.text[1..token.text.len() - 1] == "controller");
        if depth == 0
            && is_key
            && tokens.get(index + 1).is_some_and(|t| t.is_punct(':'))
            && tokens.get(index + 2).is_some_and(|t| t.is_ident("function"))
        {
            return Some(index + 2);
        }
    }
    None
}
