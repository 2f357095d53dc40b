//! Regex-based text classifiers

use super::{BuiltinFunction, Signature, str_arg};
use crate::error::{ExpressionError, ExpressionResult};
use crate::types::Type;
use crate::value::Value;
use moka::sync::Cache;
use regex::Regex;
use std::sync::LazyLock;

/// Maximum length for user-supplied patterns
const MAX_REGEX_PATTERN_LEN: usize = 1000;

/// Maximum number of cached user patterns
const MAX_REGEX_CACHE_SIZE: u64 = 256;

static DIGIT_CHAIN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("valid pattern"));

static NUMBER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$").expect("valid pattern")
});

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("valid pattern")
});

static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?(?:\(\d{1,4}\)|\d{1,4})?(?:[ .-]?\(?\d{1,4}\)?){2,6}$").expect("valid pattern")
});

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:https?|ftp)://[^\s/$.?#][^\s]*$").expect("valid pattern"));

static PATTERN_CACHE: LazyLock<Cache<String, Regex>> = LazyLock::new(|| {
    Cache::builder()
        .max_capacity(MAX_REGEX_CACHE_SIZE)
        .build()
});

pub(super) fn register(add: &mut impl FnMut(&str, Signature, BuiltinFunction)) {
    let unary = || Signature::new([Type::String], Type::Bool);
    add("IsDigitChain", unary(), is_digit_chain);
    add("IsNumber", unary(), is_number);
    add("IsEmail", unary(), is_email);
    add("IsPhone", unary(), is_phone);
    add("IsUrl", unary(), is_url);
    add(
        "IsRegexMatch",
        Signature::new([Type::String, Type::String], Type::Bool),
        is_regex_match,
    );
}

fn classify(name: &str, args: &[Value], regex: &Regex) -> ExpressionResult<Value> {
    Ok(Value::Bool(
        str_arg(name, args, 0)?.is_some_and(|s| regex.is_match(s)),
    ))
}

/// Only ASCII-style decimal digits
pub fn is_digit_chain(args: &[Value]) -> ExpressionResult<Value> {
    classify("IsDigitChain", args, &DIGIT_CHAIN_REGEX)
}

/// A decimal number literal, optionally signed and with an exponent
pub fn is_number(args: &[Value]) -> ExpressionResult<Value> {
    classify("IsNumber", args, &NUMBER_REGEX)
}

/// An email address
pub fn is_email(args: &[Value]) -> ExpressionResult<Value> {
    classify("IsEmail", args, &EMAIL_REGEX)
}

/// A phone number with optional country code and common separators
pub fn is_phone(args: &[Value]) -> ExpressionResult<Value> {
    classify("IsPhone", args, &PHONE_REGEX)
}

/// An absolute http(s) or ftp URL
pub fn is_url(args: &[Value]) -> ExpressionResult<Value> {
    classify("IsUrl", args, &URL_REGEX)
}

/// Match text against a user pattern; compiled patterns are cached
pub fn is_regex_match(args: &[Value]) -> ExpressionResult<Value> {
    let (Some(text), Some(pattern)) = (
        str_arg("IsRegexMatch", args, 0)?,
        str_arg("IsRegexMatch", args, 1)?,
    ) else {
        return Ok(Value::Bool(false));
    };
    Ok(Value::Bool(cached_regex(pattern)?.is_match(text)))
}

fn cached_regex(pattern: &str) -> ExpressionResult<Regex> {
    if pattern.len() > MAX_REGEX_PATTERN_LEN {
        return Err(ExpressionError::evaluation(format!(
            "IsRegexMatch: pattern exceeds {MAX_REGEX_PATTERN_LEN} bytes"
        )));
    }
    if let Some(regex) = PATTERN_CACHE.get(pattern) {
        return Ok(regex);
    }
    let regex = Regex::new(pattern)
        .map_err(|e| ExpressionError::evaluation(format!("IsRegexMatch: {e}")))?;
    PATTERN_CACHE.insert(pattern.to_string(), regex.clone());
    Ok(regex)
}
