//! Abstract Syntax Tree for condition expressions
//!
//! Every node carries its statically known type. Property references are
//! already resolved to field slots, so the tree only needs to be walked once
//! more, by the compiler.

use super::span::Span;
use super::token::RelOp;
use crate::toolchain::Function;
use crate::types::Type;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// An expression node
#[derive(Debug, Clone)]
pub enum Expr {
    /// Boolean, number, string or null literal
    Literal {
        /// Literal value
        value: Value,
        /// Source span
        span: Span,
    },
    /// Property path resolved against the context type
    Property {
        /// Path as written in the expression
        path: String,
        /// Field slot for each path segment
        slots: Vec<usize>,
        /// Type of the last segment, lifted to nullable when an intermediate
        /// segment is nullable
        ty: Type,
        /// Source span
        span: Span,
    },
    /// Symbolic constant: a type-level constant or an enum member
    Constant {
        /// Name as written in the expression
        name: String,
        /// Resolved value
        value: Value,
        /// Source span
        span: Span,
    },
    /// Call of a registered function
    Call {
        /// Function name
        name: String,
        /// Overload selected at parse time
        function: Arc<Function>,
        /// Arguments
        args: Vec<Expr>,
        /// Source span
        span: Span,
    },
    /// Logical negation
    Not {
        /// Operand
        operand: Box<Expr>,
        /// Source span
        span: Span,
    },
    /// Short-circuit conjunction
    And {
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// Short-circuit disjunction
    Or {
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// Relational comparison
    Relational {
        /// Operator
        op: RelOp,
        /// Dependent operand
        left: Box<Expr>,
        /// Target operand
        right: Box<Expr>,
        /// Common operand type after nullable lifting
        operand_ty: Type,
    },
}

impl Expr {
    /// Static type of the node
    pub fn ty(&self) -> Type {
        match self {
            Expr::Literal { value, .. } | Expr::Constant { value, .. } => value.static_type(),
            Expr::Property { ty, .. } => ty.clone(),
            Expr::Call { function, .. } => function.signature().returns().clone(),
            Expr::Not { .. } | Expr::And { .. } | Expr::Or { .. } | Expr::Relational { .. } => {
                Type::Bool
            }
        }
    }

    /// Source span covered by the node
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal { span, .. }
            | Expr::Property { span, .. }
            | Expr::Constant { span, .. }
            | Expr::Call { span, .. }
            | Expr::Not { span, .. } => *span,
            Expr::And { left, right } | Expr::Or { left, right } => left.span().merge(right.span()),
            Expr::Relational { left, right, .. } => left.span().merge(right.span()),
        }
    }

    /// Whether the node is the `null` literal
    pub fn is_null_literal(&self) -> bool {
        matches!(
            self,
            Expr::Literal {
                value: Value::Null,
                ..
            }
        )
    }

    /// String value when the node is a string literal
    pub fn as_string_literal(&self) -> Option<&str> {
        match self {
            Expr::Literal {
                value: Value::String(s),
                ..
            } => Some(s),
            _ => None,
        }
    }
}

/// Fully parenthesized rendering, used to inspect grouping
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal {
                value: Value::String(s),
                ..
            } => write!(f, "'{s}'"),
            Expr::Literal {
                value: Value::Null, ..
            } => f.write_str("null"),
            Expr::Literal { value, .. } => write!(f, "{value}"),
            Expr::Property { path, .. } => f.write_str(path),
            Expr::Constant { name, .. } => f.write_str(name),
            Expr::Call { name, args, .. } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Expr::Not { operand, .. } => write!(f, "!{operand}"),
            Expr::And { left, right } => write!(f, "({left} && {right})"),
            Expr::Or { left, right } => write!(f, "({left} || {right})"),
            Expr::Relational {
                op, left, right, ..
            } => write!(f, "({left} {op} {right})"),
        }
    }
}
