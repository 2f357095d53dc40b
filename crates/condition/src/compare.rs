//! Runtime relational comparison
//!
//! Equality treats null and whitespace-only strings as the same "empty"
//! value, and the wildcard target `"*"` as equal to anything non-empty.
//! Ordering is defined for numbers, dates and strings; a null operand makes
//! `>` and `<` false. `>=` and `<=` are the complements of `<` and `>`.

use crate::consistency::WILDCARD;
use crate::core::token::RelOp;
use crate::error::{ExpressionError, ExpressionResult};
use crate::value::Value;
use std::cmp::Ordering;

/// Compare using an operator given as text
pub fn compute(
    dependent: &Value,
    target: &Value,
    op: &str,
    case_sensitive: bool,
) -> ExpressionResult<bool> {
    compare(dependent, target, op.parse()?, case_sensitive)
}

/// Compare a dependent value against a target
pub fn compare(
    dependent: &Value,
    target: &Value,
    op: RelOp,
    case_sensitive: bool,
) -> ExpressionResult<bool> {
    match op {
        RelOp::Eq => Ok(equal(dependent, target, case_sensitive)),
        RelOp::Ne => Ok(!equal(dependent, target, case_sensitive)),
        RelOp::Gt => greater(dependent, target, case_sensitive),
        RelOp::Lt => less(dependent, target, case_sensitive),
        RelOp::Ge => less(dependent, target, case_sensitive).map(|lt| !lt),
        RelOp::Le => greater(dependent, target, case_sensitive).map(|gt| !gt),
    }
}

/// Null, or a string holding only whitespace
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn is_wildcard(value: &Value) -> bool {
    value.as_str() == Some(WILDCARD)
}

fn equal(dependent: &Value, target: &Value, case_sensitive: bool) -> bool {
    match (is_empty(dependent), is_empty(target)) {
        (true, true) => true,
        (false, _) if is_wildcard(target) => true,
        (true, false) | (false, true) => false,
        (false, false) => structurally_equal(dependent, target, case_sensitive),
    }
}

fn structurally_equal(a: &Value, b: &Value, case_sensitive: bool) -> bool {
    match (a, b) {
        (Value::String(a), Value::String(b)) if !case_sensitive => {
            a.to_lowercase() == b.to_lowercase()
        }
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            a.as_f64() == b.as_f64()
        }
        _ => a == b,
    }
}

fn greater(dependent: &Value, target: &Value, case_sensitive: bool) -> ExpressionResult<bool> {
    ordering(dependent, target, case_sensitive).map(|o| o == Some(Ordering::Greater))
}

fn less(dependent: &Value, target: &Value, case_sensitive: bool) -> ExpressionResult<bool> {
    ordering(dependent, target, case_sensitive).map(|o| o == Some(Ordering::Less))
}

/// `None` when either side is null or the values are incomparable (NaN)
fn ordering(
    dependent: &Value,
    target: &Value,
    case_sensitive: bool,
) -> ExpressionResult<Option<Ordering>> {
    // A wildcard target only orders against strings; otherwise it stands for
    // "no value".
    let target = if is_wildcard(target) && !matches!(dependent, Value::String(_)) {
        &Value::Null
    } else {
        target
    };

    match (dependent, target) {
        (Value::Null, _) | (_, Value::Null) => Ok(None),
        (Value::Int(a), Value::Int(b)) => Ok(Some(a.cmp(b))),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            Ok(dependent.as_f64().zip(target.as_f64()).and_then(|(a, b)| a.partial_cmp(&b)))
        }
        (Value::DateTime(a), Value::DateTime(b)) => Ok(Some(a.cmp(b))),
        (Value::String(a), Value::String(b)) if case_sensitive => Ok(Some(a.cmp(b))),
        (Value::String(a), Value::String(b)) => Ok(Some(a.to_lowercase().cmp(&b.to_lowercase()))),
        _ => Err(ExpressionError::invalid_operation(format!(
            "cannot order {} against {}",
            dependent.type_name(),
            target.type_name()
        ))),
    }
}
