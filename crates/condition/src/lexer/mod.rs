//! Lexer for tokenizing condition expressions
//!
//! Tokenization is driven by an ordered table of `(pattern, TokenType)` pairs.
//! At every position the first pattern in table order that matches the
//! remaining input wins, even when a later pattern would match a longer
//! prefix.

use crate::core::span::Span;
use crate::core::token::{RelOp, Token, TokenKind, TokenType};
use crate::error::{ExpressionError, ExpressionResult};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use tracing::trace;

/// Default pattern table, in matching order
pub const STANDARD_PATTERNS: &[(&str, TokenType)] = &[
    (r"\s+", TokenType::Whitespace),
    (r"&&", TokenType::And),
    (r"\|\|", TokenType::Or),
    (r"==|!=|>=|<=|>|<", TokenType::RelOp),
    (r"!", TokenType::Not),
    (r"\(", TokenType::LeftParen),
    (r"\)", TokenType::RightParen),
    (r",", TokenType::Comma),
    (
        r"[+-]?(?:\d*\.\d+(?:[eE][+-]?\d+)?|\d+[eE][+-]?\d+)",
        TokenType::Float,
    ),
    (r"[+-]?\d+", TokenType::Integer),
    (r"true\b", TokenType::True),
    (r"false\b", TokenType::False),
    (r"null\b", TokenType::Null),
    (r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'"#, TokenType::String),
    (r"[A-Za-z_]\w*\s*\(", TokenType::FunctionOpen),
    (r"[A-Za-z_]\w*(?:\.[A-Za-z_]\w*)*", TokenType::Identifier),
];

static STANDARD: LazyLock<Lexer> = LazyLock::new(|| {
    Lexer::new(STANDARD_PATTERNS.iter().copied()).expect("standard token patterns are valid")
});

/// Pattern-table driven lexer
///
/// A lexer holds no per-input state; one instance can tokenize any number of
/// inputs, concurrently.
#[derive(Debug, Clone)]
pub struct Lexer {
    patterns: Vec<(Regex, TokenType)>,
}

impl Lexer {
    /// Build a lexer from an ordered pattern table
    ///
    /// Every pattern is anchored at the current position. An invalid regex
    /// is reported as a syntax error pointing at nothing.
    pub fn new<'p>(
        patterns: impl IntoIterator<Item = (&'p str, TokenType)>,
    ) -> ExpressionResult<Self> {
        let patterns = patterns
            .into_iter()
            .map(|(pattern, kind)| {
                Regex::new(&format!("^(?:{pattern})"))
                    .map(|re| (re, kind))
                    .map_err(|e| {
                        ExpressionError::syntax(
                            format!("invalid token pattern '{pattern}': {e}"),
                            Span::default(),
                        )
                    })
            })
            .collect::<ExpressionResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Shared lexer using [`STANDARD_PATTERNS`]
    pub fn standard() -> &'static Lexer {
        &STANDARD
    }

    /// Tokenize the entire input, appending an [`TokenKind::Eof`] token
    pub fn tokenize<'a>(
        &self,
        input: &'a str,
        keep_whitespace: bool,
    ) -> ExpressionResult<Vec<Token<'a>>> {
        // Estimate: typical conditions have ~1 token per 4 chars
        let mut tokens = Vec::with_capacity((input.len() / 4).max(8));
        let mut position = 0;

        while position < input.len() {
            let rest = &input[position..];
            let (len, kind) = self
                .patterns
                .iter()
                .find_map(|(re, kind)| {
                    re.find(rest)
                        .filter(|m| !m.is_empty())
                        .map(|m| (m.end(), *kind))
                })
                .ok_or_else(|| ExpressionError::lex(rest, position))?;

            let text = &rest[..len];
            let span = Span::new(position, position + len);
            position += len;

            if kind == TokenType::Whitespace && !keep_whitespace {
                continue;
            }
            tokens.push(Token::new(decode(kind, text, span)?, span));
        }

        tokens.push(Token::new(TokenKind::Eof, Span::point(input.len())));
        trace!(input, count = tokens.len(), "tokenized condition");
        Ok(tokens)
    }
}

/// Turn matched text into a token payload
fn decode(kind: TokenType, text: &str, span: Span) -> ExpressionResult<TokenKind<'_>> {
    let position = span.start as usize;
    Ok(match kind {
        TokenType::Whitespace => TokenKind::Whitespace,
        TokenType::True => TokenKind::Boolean(true),
        TokenType::False => TokenKind::Boolean(false),
        TokenType::And => TokenKind::And,
        TokenType::Or => TokenKind::Or,
        TokenType::Not => TokenKind::Not,
        TokenType::LeftParen => TokenKind::LeftParen,
        TokenType::RightParen => TokenKind::RightParen,
        TokenType::Comma => TokenKind::Comma,
        TokenType::Null => TokenKind::Null,
        TokenType::Eof => TokenKind::Eof,
        TokenType::RelOp => TokenKind::RelOp(text.parse::<RelOp>()?),
        TokenType::Integer => TokenKind::Integer(
            text.parse::<i64>()
                .map_err(|_| ExpressionError::lex(text, position))?,
        ),
        TokenType::Float => TokenKind::Float(
            text.parse::<f64>()
                .map_err(|_| ExpressionError::lex(text, position))?,
        ),
        TokenType::String => TokenKind::String(unquote(text)),
        TokenType::Identifier => TokenKind::Identifier(text),
        TokenType::FunctionOpen => {
            let name = text.trim_end_matches('(').trim_end();
            TokenKind::FunctionOpen(name)
        }
    })
}

/// Strip the surrounding quotes and resolve backslash escapes
fn unquote(text: &str) -> Cow<'_, str> {
    let inner = text.get(1..text.len().saturating_sub(1)).unwrap_or("");
    if !inner.contains('\\') {
        return Cow::Borrowed(inner);
    }

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    Cow::Owned(out)
}
