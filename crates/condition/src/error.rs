//! Error types for nebula-condition
//!
//! Every compile-time category is raised eagerly by
//! [`crate::Compiler::compile`]; only [`ExpressionError::Evaluation`] can
//! surface from a compiled predicate.

use crate::core::span::Span;
use thiserror::Error;

// ============================================================================
// Main Error Type
// ============================================================================

/// Condition compilation, evaluation and formatting errors
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    /// No token pattern matches the remaining input
    #[error("Lexical error at position {position}: unexpected input '{residual}'")]
    Lex { residual: String, position: usize },

    /// Grammar violation, unresolved member or function, arity mismatch
    #[error("Syntax error at {span}: {message}")]
    Syntax { message: String, span: Span },

    /// Relational operands of incompatible types, or a disallowed operand type
    #[error("Type consistency error at {span}: {message}")]
    TypeConsistency { message: String, span: Span },

    /// A field path and a constant path overlap at a shared dotted prefix
    #[error(
        "Naming collision between field '{field}' and constant '{constant}' at segment {segment} ('{name}')"
    )]
    NamingCollision {
        field: String,
        constant: String,
        segment: usize,
        name: String,
    },

    /// Malformed message template
    #[error("Format error: {message}")]
    Format { message: String },

    /// Unknown relational operator token
    #[error("Invalid relational operator '{operator}'")]
    RelationalOperator { operator: String },

    /// Comparison that is undefined for the operand types
    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    /// Failure raised while evaluating a compiled predicate
    #[error("Evaluation error: {message}")]
    Evaluation { message: String },

    /// Function registration conflict
    #[error("Registration error for '{name}': {message}")]
    Registration { name: String, message: String },

    /// Invalid type definition or record construction
    #[error("Schema error: {message}")]
    Schema { message: String },
}

impl ExpressionError {
    /// Get error code for categorization
    pub fn code(&self) -> &'static str {
        match self {
            Self::Lex { .. } => "COND:LEX",
            Self::Syntax { .. } => "COND:SYNTAX",
            Self::TypeConsistency { .. } => "COND:TYPE",
            Self::NamingCollision { .. } => "COND:NAMING",
            Self::Format { .. } => "COND:FORMAT",
            Self::RelationalOperator { .. } => "COND:REL_OP",
            Self::InvalidOperation { .. } => "COND:INVALID_OP",
            Self::Evaluation { .. } => "COND:EVAL",
            Self::Registration { .. } => "COND:REGISTRATION",
            Self::Schema { .. } => "COND:SCHEMA",
        }
    }

    /// Whether the error is an authoring defect detected during compilation
    pub fn is_compile_time(&self) -> bool {
        matches!(
            self,
            Self::Lex { .. }
                | Self::Syntax { .. }
                | Self::TypeConsistency { .. }
                | Self::NamingCollision { .. }
        )
    }

    /// Source span of the error, when it points into an expression
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Syntax { span, .. } | Self::TypeConsistency { span, .. } => Some(*span),
            Self::Lex { position, residual } => Some(Span::new(
                *position,
                position + residual.chars().next().map_or(0, char::len_utf8),
            )),
            _ => None,
        }
    }

    // ============================================================================
    // Convenience Constructors
    // ============================================================================

    /// Create a lexical error
    pub fn lex(residual: impl Into<String>, position: usize) -> Self {
        Self::Lex {
            residual: residual.into(),
            position,
        }
    }

    /// Create a syntax error
    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::Syntax {
            message: message.into(),
            span,
        }
    }

    /// Create a type consistency error
    pub fn type_consistency(message: impl Into<String>, span: Span) -> Self {
        Self::TypeConsistency {
            message: message.into(),
            span,
        }
    }

    /// Create a naming collision error
    pub fn naming_collision(
        field: impl Into<String>,
        constant: impl Into<String>,
        segment: usize,
        name: impl Into<String>,
    ) -> Self {
        Self::NamingCollision {
            field: field.into(),
            constant: constant.into(),
            segment,
            name: name.into(),
        }
    }

    /// Create a format error
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    /// Create an unknown relational operator error
    pub fn relational_operator(operator: impl Into<String>) -> Self {
        Self::RelationalOperator {
            operator: operator.into(),
        }
    }

    /// Create an invalid operation error
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Create an evaluation error
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation {
            message: message.into(),
        }
    }

    /// Create a registration error
    pub fn registration(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Registration {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a schema error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }
}

// ============================================================================
// Result Type
// ============================================================================

/// Result type for condition operations
pub type ExpressionResult<T> = Result<T, ExpressionError>;

// ============================================================================
// Tests
// ============================================================================
