//! Variadic numeric aggregates

use super::{BuiltinFunction, Signature, float_arg};
use crate::error::ExpressionResult;
use crate::types::Type;
use crate::value::Value;

pub(super) fn register(add: &mut impl FnMut(&str, Signature, BuiltinFunction)) {
    let aggregate = || Signature::variadic([Type::Float], Type::Float, Type::Float);
    add("Min", aggregate(), min);
    add("Max", aggregate(), max);
    add("Sum", aggregate(), sum);
    add("Average", aggregate(), average);
}

fn numbers<'a>(name: &'a str, args: &'a [Value]) -> impl Iterator<Item = ExpressionResult<f64>> + 'a {
    (0..args.len()).map(move |i| float_arg(name, args, i))
}

fn fold(
    name: &str,
    args: &[Value],
    step: impl Fn(f64, f64) -> f64,
) -> ExpressionResult<Value> {
    let mut values = numbers(name, args);
    let first = values.next().unwrap_or_else(|| float_arg(name, args, 0))?;
    values
        .try_fold(first, |acc, next| next.map(|n| step(acc, n)))
        .map(Value::Float)
}

/// Smallest argument
pub fn min(args: &[Value]) -> ExpressionResult<Value> {
    fold("Min", args, f64::min)
}

/// Largest argument
pub fn max(args: &[Value]) -> ExpressionResult<Value> {
    fold("Max", args, f64::max)
}

/// Sum of the arguments
pub fn sum(args: &[Value]) -> ExpressionResult<Value> {
    fold("Sum", args, |a, b| a + b)
}

/// Arithmetic mean of the arguments
pub fn average(args: &[Value]) -> ExpressionResult<Value> {
    let total = fold("Average", args, |a, b| a + b)?;
    Ok(Value::Float(total.as_f64().unwrap_or_default() / args.len() as f64))
}
