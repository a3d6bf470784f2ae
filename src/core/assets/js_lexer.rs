//! Token stream over JavaScript source.
//!
//! This is not a parser: it only knows enough of the grammar to find where
//! strings, template literals, regular expressions and comments begin and end,
//! and to check that brackets are balanced. Every token borrows its text from
//! the source, so concatenating all tokens reproduces the input exactly.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JsLexError {
    #[error("unterminated string literal starting on line {line}")]
    UnterminatedString { line: usize },
    #[error("unterminated block comment starting on line {line}")]
    UnterminatedComment { line: usize },
    #[error("unterminated template literal starting on line {line}")]
    UnterminatedTemplate { line: usize },
    #[error("unterminated regular expression starting on line {line}")]
    UnterminatedRegex { line: usize },
    #[error("unexpected '{found}' on line {line}")]
    Unbalanced { found: char, line: usize },
    #[error("'{open}' opened on line {line} is never closed")]
    Unclosed { open: char, line: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Whitespace { newline: bool },
    LineComment,
    BlockComment { newline: bool },
    Ident,
    Number,
    Str,
    /// A template literal chunk: head, middle or tail around `${ }` expressions.
    Template,
    Regex,
    Punct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub start: usize,
}

impl Token<'_> {
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }

    /// Comments and whitespace.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace { .. } | TokenKind::LineComment | TokenKind::BlockComment { .. }
        )
    }

    pub fn is_punct(&self, ch: char) -> bool {
        self.kind == TokenKind::Punct && self.text.len() == 1 && self.text.starts_with(ch)
    }

    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == name
    }

    pub fn has_newline(&self) -> bool {
        match self.kind {
            TokenKind::Whitespace { newline } | TokenKind::BlockComment { newline } => newline,
            _ => false,
        }
    }
}

/// Keywords after which a `/` starts a regular expression rather than a division.
const REGEX_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "yield",
    "await",
];

/// Statements whose parenthesised header can be followed directly by a regex.
const HEADER_KEYWORDS: &[&str] = &["if", "while", "for", "with"];

pub fn is_ident_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_' || byte == b'$' || byte >= 0x80
}

pub fn is_ident_part(byte: u8) -> bool {
    is_ident_start(byte) || byte.is_ascii_digit()
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token<'a>>,
    /// Open brackets; `$` marks a template `${` expression.
    stack: Vec<(u8, usize)>,
    /// Offset of the last `)` that closed an `if`/`while`/`for`/`with` header.
    header_close: Option<usize>,
}

/// Split JavaScript source into tokens.
pub fn tokenize(src: &str) -> Result<Vec<Token<'_>>, JsLexError> {
    let mut lexer = Lexer {
        src,
        bytes: src.as_bytes(),
        pos: 0,
        tokens: Vec::new(),
        stack: Vec::new(),
        header_close: None,
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

impl<'a> Lexer<'a> {
    fn run(&mut self) -> Result<(), JsLexError> {
        while self.pos < self.bytes.len() {
            let start = self.pos;
            let byte = self.bytes[start];
            match byte {
                b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c => self.whitespace(),
                b'/' if self.peek(1) == Some(b'/') => self.line_comment(),
                b'/' if self.peek(1) == Some(b'*') => self.block_comment()?,
                b'/' if self.regex_allowed() => self.regex()?,
                b'"' | b'\'' => self.string(byte)?,
                b'`' => self.template(start)?,
                b'0'..=b'9' => self.number(),
                b'.' if self.peek(1).is_some_and(|next| next.is_ascii_digit()) => self.number(),
                _ if is_ident_start(byte) => self.ident(),
                b'(' | b'[' | b'{' => {
                    self.stack.push((byte, start));
                    self.single(TokenKind::Punct);
                }
                b')' | b']' | b'}' => self.close(byte)?,
                _ => self.single(TokenKind::Punct),
            }
        }

        if let Some((open, at)) = self.stack.last() {
            let open = if *open == b'$' { '{' } else { *open as char };
            return Err(JsLexError::Unclosed {
                open,
                line: self.line_at(*at),
            });
        }
        Ok(())
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn line_at(&self, offset: usize) -> usize {
        self.src[..offset].matches('\n').count() + 1
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            text: &self.src[start..self.pos],
            start,
        });
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.pos;
        // Bytes >= 0x80 always start identifiers, so punctuation is one ASCII byte.
        self.pos += 1;
        self.push(kind, start);
    }

    fn whitespace(&mut self) {
        let start = self.pos;
        let mut newline = false;
        while let Some(byte) = self.bytes.get(self.pos) {
            match byte {
                b'\n' | b'\r' => newline = true,
                b' ' | b'\t' | 0x0b | 0x0c => {}
                _ => break,
            }
            self.pos += 1;
        }
        self.push(TokenKind::Whitespace { newline }, start);
    }

    fn line_comment(&mut self) {
        let start = self.pos;
        while let Some(byte) = self.bytes.get(self.pos) {
            if *byte == b'\n' || *byte == b'\r' {
                break;
            }
            self.pos += 1;
        }
        self.push(TokenKind::LineComment, start);
    }

    fn block_comment(&mut self) -> Result<(), JsLexError> {
        let start = self.pos;
        let Some(offset) = self.src[start + 2..].find("*/") else {
            return Err(JsLexError::UnterminatedComment {
                line: self.line_at(start),
            });
        };
        self.pos = start + 2 + offset + 2;
        let newline = self.src[start..self.pos].contains(['\n', '\r']);
        self.push(TokenKind::BlockComment { newline }, start);
        Ok(())
    }

    fn string(&mut self, quote: u8) -> Result<(), JsLexError> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.bytes.get(self.pos) {
                None | Some(b'\n') | Some(b'\r') => {
                    return Err(JsLexError::UnterminatedString {
                        line: self.line_at(start),
                    })
                }
                Some(b'\\') => {
                    self.pos += 2;
                    // A backslash before CRLF continues the line over both bytes.
                    if self.bytes.get(self.pos - 1) == Some(&b'\r')
                        && self.bytes.get(self.pos) == Some(&b'\n')
                    {
                        self.pos += 1;
                    }
                }
                Some(byte) if *byte == quote => {
                    self.pos += 1;
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }
        self.push(TokenKind::Str, start);
        Ok(())
    }

    /// Scan template characters from `self.pos` up to the closing backtick or
    /// the next `${`, emitting one Template token that starts at `start`.
    fn template(&mut self, start: usize) -> Result<(), JsLexError> {
        self.pos += 1;
        loop {
            match self.bytes.get(self.pos) {
                None => {
                    return Err(JsLexError::UnterminatedTemplate {
                        line: self.line_at(start),
                    })
                }
                Some(b'\\') => self.pos += 2,
                Some(b'`') => {
                    self.pos += 1;
                    break;
                }
                Some(b'$') if self.peek(1) == Some(b'{') => {
                    self.pos += 2;
                    self.stack.push((b'$', start));
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }
        self.pos = self.pos.min(self.bytes.len());
        self.push(TokenKind::Template, start);
        Ok(())
    }

    fn close(&mut self, byte: u8) -> Result<(), JsLexError> {
        let expected = match byte {
            b')' => b'(',
            b']' => b'[',
            _ => b'{',
        };
        match self.stack.pop() {
            Some((b'$', _)) if byte == b'}' => {
                // Resume the template literal after its `${ }` expression.
                let start = self.pos;
                self.template(start)
            }
            Some((open, at)) if open == expected => {
                if byte == b')' && self.opens_header(at) {
                    self.header_close = Some(self.pos);
                }
                self.single(TokenKind::Punct);
                Ok(())
            }
            _ => Err(JsLexError::Unbalanced {
                found: byte as char,
                line: self.line_at(self.pos),
            }),
        }
    }

    /// Whether the `(` at offset `at` follows a statement keyword taking a header.
    fn opens_header(&self, at: usize) -> bool {
        self.tokens
            .iter()
            .rev()
            .skip_while(|token| token.start >= at)
            .find(|token| !token.is_trivia())
            .is_some_and(|token| {
                token.kind == TokenKind::Ident && HEADER_KEYWORDS.contains(&token.text)
            })
    }

    fn number(&mut self) {
        let start = self.pos;
        let hex = self.bytes[start] == b'0'
            && matches!(self.peek(1), Some(b'x') | Some(b'X'));
        while let Some(byte) = self.bytes.get(self.pos) {
            let byte = *byte;
            if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'.' {
                self.pos += 1;
                if !hex
                    && (byte == b'e' || byte == b'E')
                    && matches!(self.bytes.get(self.pos), Some(b'+') | Some(b'-'))
                {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
        self.push(TokenKind::Number, start);
    }

    fn ident(&mut self) {
        let start = self.pos;
        while self.bytes.get(self.pos).is_some_and(|byte| is_ident_part(*byte)) {
            self.pos += 1;
        }
        self.push(TokenKind::Ident, start);
    }

    fn regex_allowed(&self) -> bool {
        let previous = self.tokens.iter().rev().find(|token| !token.is_trivia());
        match previous {
            None => true,
            Some(token) => match token.kind {
                TokenKind::Punct if token.text == ")" => self.header_close == Some(token.start),
                TokenKind::Punct => token.text != "]",
                TokenKind::Ident => REGEX_KEYWORDS.contains(&token.text),
                _ => false,
            },
        }
    }

    fn regex(&mut self) -> Result<(), JsLexError> {
        let start = self.pos;
        self.pos += 1;
        let mut in_class = false;
        loop {
            match self.bytes.get(self.pos) {
                None | Some(b'\n') | Some(b'\r') => {
                    return Err(JsLexError::UnterminatedRegex {
                        line: self.line_at(start),
                    })
                }
                Some(b'\\') => self.pos += 2,
                Some(b'[') => {
                    in_class = true;
                    self.pos += 1;
                }
                Some(b']') => {
                    in_class = false;
                    self.pos += 1;
                }
                Some(b'/') if !in_class => {
                    self.pos += 1;
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }
        while self.bytes.get(self.pos).is_some_and(|byte| is_ident_part(*byte)) {
            self.pos += 1;
        }
        self.push(TokenKind::Regex, start);
        Ok(())
    }
}
