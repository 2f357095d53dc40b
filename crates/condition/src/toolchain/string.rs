//! String functions
//!
//! Every function here is null-safe: a null argument behaves like an absent
//! string instead of failing.

use super::{BuiltinFunction, Signature, int_arg, str_arg};
use crate::error::{ExpressionError, ExpressionResult};
use crate::types::Type;
use crate::value::Value;
use std::cmp::Ordering;

pub(super) fn register(add: &mut impl FnMut(&str, Signature, BuiltinFunction)) {
    let s = || Type::String;
    add("Length", Signature::new([s()], Type::Int), length);
    add("Trim", Signature::new([s()], Type::nullable(Type::String)), trim);
    add("Concat", Signature::new([s(), s()], Type::String), concat);
    add("Concat", Signature::new([s(), s(), s()], Type::String), concat);
    add("CompareOrdinal", Signature::new([s(), s()], Type::Int), compare_ordinal);
    add(
        "CompareOrdinalIgnoreCase",
        Signature::new([s(), s()], Type::Int),
        compare_ordinal_ignore_case,
    );
    add("StartsWith", Signature::new([s(), s()], Type::Bool), starts_with);
    add(
        "StartsWithIgnoreCase",
        Signature::new([s(), s()], Type::Bool),
        starts_with_ignore_case,
    );
    add("EndsWith", Signature::new([s(), s()], Type::Bool), ends_with);
    add(
        "EndsWithIgnoreCase",
        Signature::new([s(), s()], Type::Bool),
        ends_with_ignore_case,
    );
    add("Contains", Signature::new([s(), s()], Type::Bool), contains);
    add(
        "ContainsIgnoreCase",
        Signature::new([s(), s()], Type::Bool),
        contains_ignore_case,
    );
    add(
        "Substring",
        Signature::new([s(), Type::Int], Type::nullable(Type::String)),
        substring,
    );
    add(
        "Substring",
        Signature::new([s(), Type::Int, Type::Int], Type::nullable(Type::String)),
        substring,
    );
    add(
        "IsNullOrWhiteSpace",
        Signature::new([s()], Type::Bool),
        is_null_or_white_space,
    );
}

/// Number of characters; null has length 0
pub fn length(args: &[Value]) -> ExpressionResult<Value> {
    let len = str_arg("Length", args, 0)?.map_or(0, |s| s.chars().count());
    Ok(Value::Int(i64::try_from(len).unwrap_or(i64::MAX)))
}

/// Trim whitespace from both ends
pub fn trim(args: &[Value]) -> ExpressionResult<Value> {
    Ok(str_arg("Trim", args, 0)?.map_or(Value::Null, |s| Value::string(s.trim())))
}

/// Concatenate two or three strings, nulls as empty
pub fn concat(args: &[Value]) -> ExpressionResult<Value> {
    let mut out = String::new();
    for i in 0..args.len() {
        out.push_str(str_arg("Concat", args, i)?.unwrap_or(""));
    }
    Ok(Value::string(out))
}

fn ordinal(a: Option<&str>, b: Option<&str>, ignore_case: bool) -> i64 {
    let ordering = match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) if ignore_case => a.to_lowercase().cmp(&b.to_lowercase()),
        (Some(a), Some(b)) => a.cmp(b),
    };
    ordering as i64
}

/// Ordinal comparison: -1, 0 or 1; null sorts first
pub fn compare_ordinal(args: &[Value]) -> ExpressionResult<Value> {
    let (a, b) = (str_arg("CompareOrdinal", args, 0)?, str_arg("CompareOrdinal", args, 1)?);
    Ok(Value::Int(ordinal(a, b, false)))
}

/// Case-insensitive ordinal comparison
pub fn compare_ordinal_ignore_case(args: &[Value]) -> ExpressionResult<Value> {
    let name = "CompareOrdinalIgnoreCase";
    let (a, b) = (str_arg(name, args, 0)?, str_arg(name, args, 1)?);
    Ok(Value::Int(ordinal(a, b, true)))
}

/// Apply a two-string predicate; false when either side is null
fn test_pair(
    name: &str,
    args: &[Value],
    ignore_case: bool,
    test: impl Fn(&str, &str) -> bool,
) -> ExpressionResult<Value> {
    let (a, b) = (str_arg(name, args, 0)?, str_arg(name, args, 1)?);
    let result = match (a, b) {
        (Some(a), Some(b)) if ignore_case => test(&a.to_lowercase(), &b.to_lowercase()),
        (Some(a), Some(b)) => test(a, b),
        _ => false,
    };
    Ok(Value::Bool(result))
}

/// Prefix test
pub fn starts_with(args: &[Value]) -> ExpressionResult<Value> {
    test_pair("StartsWith", args, false, |a, b| a.starts_with(b))
}

/// Case-insensitive prefix test
pub fn starts_with_ignore_case(args: &[Value]) -> ExpressionResult<Value> {
    test_pair("StartsWithIgnoreCase", args, true, |a, b| a.starts_with(b))
}

/// Suffix test
pub fn ends_with(args: &[Value]) -> ExpressionResult<Value> {
    test_pair("EndsWith", args, false, |a, b| a.ends_with(b))
}

/// Case-insensitive suffix test
pub fn ends_with_ignore_case(args: &[Value]) -> ExpressionResult<Value> {
    test_pair("EndsWithIgnoreCase", args, true, |a, b| a.ends_with(b))
}

/// Substring test
pub fn contains(args: &[Value]) -> ExpressionResult<Value> {
    test_pair("Contains", args, false, |a, b| a.contains(b))
}

/// Case-insensitive substring test
pub fn contains_ignore_case(args: &[Value]) -> ExpressionResult<Value> {
    test_pair("ContainsIgnoreCase", args, true, |a, b| a.contains(b))
}

/// `Substring(s, start[, length])` over characters
pub fn substring(args: &[Value]) -> ExpressionResult<Value> {
    let Some(s) = str_arg("Substring", args, 0)? else {
        return Ok(Value::Null);
    };
    let total = s.chars().count();
    let start = int_arg("Substring", args, 1)?;
    let start = usize::try_from(start)
        .ok()
        .filter(|&start| start <= total)
        .ok_or_else(|| {
            ExpressionError::evaluation(format!(
                "Substring: start {start} is outside a string of length {total}"
            ))
        })?;
    let len = if args.len() > 2 {
        let len = int_arg("Substring", args, 2)?;
        usize::try_from(len)
            .ok()
            .filter(|&len| start + len <= total)
            .ok_or_else(|| {
                ExpressionError::evaluation(format!(
                    "Substring: length {len} from {start} exceeds a string of length {total}"
                ))
            })?
    } else {
        total - start
    };
    Ok(Value::string(s.chars().skip(start).take(len).collect::<String>()))
}

/// Whether the string is null, empty or whitespace only
pub fn is_null_or_white_space(args: &[Value]) -> ExpressionResult<Value> {
    let blank = str_arg("IsNullOrWhiteSpace", args, 0)?.is_none_or(|s| s.trim().is_empty());
    Ok(Value::Bool(blank))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn s(text: &str) -> Value {
        Value::string(text)
    }

    #[test]
    fn test_length_counts_chars() {
        assert_eq!(length(&[s("zażółć")]).unwrap(), Value::Int(6));
        assert_eq!(length(&[Value::Null]).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_trim_and_concat() {
        assert_eq!(trim(&[s("  a b ")]).unwrap(), s("a b"));
        assert_eq!(trim(&[Value::Null]).unwrap(), Value::Null);
        assert_eq!(concat(&[s("a"), Value::Null, s("c")]).unwrap(), s("ac"));
    }

    #[rstest]
    #[case("abc", "abd", false, -1)]
    #[case("ABC", "abc", false, -1)]
    #[case("ABC", "abc", true, 0)]
    #[case("b", "a", false, 1)]
    fn test_ordinal(#[case] a: &str, #[case] b: &str, #[case] ignore_case: bool, #[case] expected: i64) {
        let args = [s(a), s(b)];
        let result = if ignore_case {
            compare_ordinal_ignore_case(&args)
        } else {
            compare_ordinal(&args)
        };
        assert_eq!(result.unwrap(), Value::Int(expected));
    }

    #[test]
    fn test_ordinal_null_sorts_first() {
        assert_eq!(compare_ordinal(&[Value::Null, s("a")]).unwrap(), Value::Int(-1));
        assert_eq!(compare_ordinal(&[Value::Null, Value::Null]).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_affix_tests() {
        assert_eq!(starts_with(&[s("Hello"), s("He")]).unwrap(), Value::Bool(true));
        assert_eq!(starts_with(&[s("Hello"), s("he")]).unwrap(), Value::Bool(false));
        assert_eq!(
            starts_with_ignore_case(&[s("Hello"), s("he")]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(ends_with_ignore_case(&[s("Hello"), s("LO")]).unwrap(), Value::Bool(true));
        assert_eq!(contains(&[Value::Null, s("x")]).unwrap(), Value::Bool(false));
        assert_eq!(contains_ignore_case(&[s("aXb"), s("x")]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_substring() {
        assert_eq!(substring(&[s("abcdef"), Value::Int(2)]).unwrap(), s("cdef"));
        assert_eq!(
            substring(&[s("abcdef"), Value::Int(1), Value::Int(3)]).unwrap(),
            s("bcd")
        );
        assert_eq!(substring(&[Value::Null, Value::Int(0)]).unwrap(), Value::Null);
        assert_eq!(
            substring(&[s("abc"), Value::Int(2), Value::Int(5)])
                .unwrap_err()
                .code(),
            "COND:EVAL"
        );
    }

    #[rstest]
    #[case(Value::Null, true)]
    #[case(Value::string(""), true)]
    #[case(Value::string(" \t"), true)]
    #[case(Value::string(" x "), false)]
    fn test_is_null_or_white_space(#[case] value: Value, #[case] expected: bool) {
        assert_eq!(is_null_or_white_space(&[value]).unwrap(), Value::Bool(expected));
    }
}
