//! Compile-time consistency checks for relational operands
//!
//! Both sides of a comparison must reduce to the same underlying type, with
//! three escapes: a `null` literal, the wildcard `"*"` target, and a string
//! literal holding a date compared against a date/time operand. Ordering
//! operators are further restricted to numeric, date/time and string
//! operands.

use crate::core::ast::Expr;
use crate::core::token::RelOp;
use crate::error::{ExpressionError, ExpressionResult};
use crate::types::Type;
use crate::types::helper::{is_date_time, parse_date};

/// Target literal meaning "any non-empty value"
pub const WILDCARD: &str = "*";

/// Whether the node is the wildcard string literal
pub fn is_wildcard(expr: &Expr) -> bool {
    expr.as_string_literal() == Some(WILDCARD)
}

/// Whether the node is a string literal that parses as a date
pub fn is_date_literal(expr: &Expr) -> bool {
    expr.as_string_literal()
        .is_some_and(|s| s != WILDCARD && parse_date(s).is_some())
}

/// Validate a relational node and return the common operand type
///
/// The returned type is the dependent operand's type lifted to nullable when
/// either side may be null.
pub fn check(op: RelOp, left: &Expr, right: &Expr) -> ExpressionResult<Type> {
    let (left_ty, right_ty) = (left.ty(), right.ty());
    let span = left.span().merge(right.span());

    let left_free = left.is_null_literal();
    let right_free = right.is_null_literal() || is_wildcard(right);

    // Sides whose type must support the operator
    let mut typed: Vec<&Type> = Vec::with_capacity(2);

    if left_free || right_free {
        if !left_free {
            typed.push(&left_ty);
        }
        if !right_free {
            typed.push(&right_ty);
        }
    } else if is_date_time(&left_ty) && is_date_literal(right) {
        typed.push(&left_ty);
    } else if is_date_time(&right_ty) && is_date_literal(left) {
        typed.push(&right_ty);
    } else if left_ty.same_underlying(&right_ty) {
        typed.push(&left_ty);
    } else {
        return Err(ExpressionError::type_consistency(
            format!("cannot compare {left_ty} with {right_ty} using '{op}'"),
            span,
        ));
    }

    if op.is_ordering() {
        if let Some(ty) = typed.iter().find(|ty| !ty.coarse().supports_ordering()) {
            return Err(ExpressionError::type_consistency(
                format!(
                    "operator '{op}' is not defined for {} operands ({ty})",
                    ty.coarse()
                ),
                span,
            ));
        }
    }

    let common = match typed.first() {
        Some(ty) if is_date_time(ty) => Type::DateTime,
        Some(ty) => (*ty).clone(),
        None => Type::Null,
    };
    let nullable = left_ty.is_nullable()
        || right_ty.is_nullable()
        || (right_free && !matches!(common, Type::Null));
    Ok(if nullable {
        Type::nullable(common)
    } else {
        common
    })
}
