//! Token types for the condition lexer
//!
//! [`TokenType`] is the fieldless kind used in the lexer's pattern table;
//! [`TokenKind`] carries the decoded payload.

use super::span::Span;
use crate::error::ExpressionError;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// A token with position information
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    /// The token kind
    pub kind: TokenKind<'a>,
    /// Source span for this token
    pub span: Span,
}

impl<'a> Token<'a> {
    /// Create a new token with span
    pub fn new(kind: TokenKind<'a>, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Token category a lexer pattern produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    /// Run of whitespace
    Whitespace,
    /// `true`
    True,
    /// `false`
    False,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `!`
    Not,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// Integer literal
    Integer,
    /// Float literal
    Float,
    /// Quoted string literal
    String,
    /// `null`
    Null,
    /// Dotted property path or symbolic name
    Identifier,
    /// One of `== != > >= < <=`
    RelOp,
    /// `,`
    Comma,
    /// Function name followed by `(`
    FunctionOpen,
    /// End of input
    Eof,
}

/// The decoded kind of a token
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    // Literals
    /// Boolean literal
    Boolean(bool),
    /// Integer literal (e.g., 42, -10)
    Integer(i64),
    /// Float literal (e.g., 3.14, 1e3)
    Float(f64),
    /// String literal with escapes resolved
    String(Cow<'a, str>),
    /// Null literal
    Null,

    /// Dotted path (e.g., `Address.Country`, `Priority.High`)
    Identifier(&'a str),
    /// Function name; the opening parenthesis is part of the token
    FunctionOpen(&'a str),

    // Operators
    /// Logical AND (&&)
    And,
    /// Logical OR (||)
    Or,
    /// Logical NOT (!)
    Not,
    /// Relational operator
    RelOp(RelOp),

    // Delimiters
    /// Left parenthesis
    LeftParen,
    /// Right parenthesis
    RightParen,
    /// Comma
    Comma,

    /// Whitespace, only emitted when the caller keeps it
    Whitespace,
    /// End of input
    Eof,
}

impl TokenKind<'_> {
    /// The pattern category of this token
    pub fn token_type(&self) -> TokenType {
        match self {
            TokenKind::Boolean(true) => TokenType::True,
            TokenKind::Boolean(false) => TokenType::False,
            TokenKind::Integer(_) => TokenType::Integer,
            TokenKind::Float(_) => TokenType::Float,
            TokenKind::String(_) => TokenType::String,
            TokenKind::Null => TokenType::Null,
            TokenKind::Identifier(_) => TokenType::Identifier,
            TokenKind::FunctionOpen(_) => TokenType::FunctionOpen,
            TokenKind::And => TokenType::And,
            TokenKind::Or => TokenType::Or,
            TokenKind::Not => TokenType::Not,
            TokenKind::RelOp(_) => TokenType::RelOp,
            TokenKind::LeftParen => TokenType::LeftParen,
            TokenKind::RightParen => TokenType::RightParen,
            TokenKind::Comma => TokenType::Comma,
            TokenKind::Whitespace => TokenType::Whitespace,
            TokenKind::Eof => TokenType::Eof,
        }
    }
}

impl fmt::Display for TokenKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Boolean(b) => write!(f, "{b}"),
            TokenKind::Integer(i) => write!(f, "{i}"),
            TokenKind::Float(x) => write!(f, "{x}"),
            TokenKind::String(s) => write!(f, "'{s}'"),
            TokenKind::Null => f.write_str("null"),
            TokenKind::Identifier(path) => f.write_str(path),
            TokenKind::FunctionOpen(name) => write!(f, "{name}("),
            TokenKind::And => f.write_str("&&"),
            TokenKind::Or => f.write_str("||"),
            TokenKind::Not => f.write_str("!"),
            TokenKind::RelOp(op) => write!(f, "{op}"),
            TokenKind::LeftParen => f.write_str("("),
            TokenKind::RightParen => f.write_str(")"),
            TokenKind::Comma => f.write_str(","),
            TokenKind::Whitespace => f.write_str("whitespace"),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

// ============================================================================
// RELATIONAL OPERATORS
// ============================================================================

/// Relational operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
}

impl RelOp {
    /// Operator text
    pub fn as_str(self) -> &'static str {
        match self {
            RelOp::Eq => "==",
            RelOp::Ne => "!=",
            RelOp::Gt => ">",
            RelOp::Ge => ">=",
            RelOp::Lt => "<",
            RelOp::Le => "<=",
        }
    }

    /// Whether the operator requires an ordered type
    pub fn is_ordering(self) -> bool {
        !matches!(self, RelOp::Eq | RelOp::Ne)
    }
}

impl FromStr for RelOp {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(RelOp::Eq),
            "!=" => Ok(RelOp::Ne),
            ">" => Ok(RelOp::Gt),
            ">=" => Ok(RelOp::Ge),
            "<" => Ok(RelOp::Lt),
            "<=" => Ok(RelOp::Le),
            other => Err(ExpressionError::relational_operator(other)),
        }
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
