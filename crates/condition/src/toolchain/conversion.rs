//! Conversion functions

use super::{BuiltinFunction, Signature, str_arg};
use crate::error::{ExpressionError, ExpressionResult};
use crate::types::Type;
use crate::value::Value;
use uuid::Uuid;

pub(super) fn register(add: &mut impl FnMut(&str, Signature, BuiltinFunction)) {
    add("Guid", Signature::new([Type::String], Type::nullable(Type::Guid)), guid);
}

/// Parse a GUID; null stays null, malformed text is an error
pub fn guid(args: &[Value]) -> ExpressionResult<Value> {
    let Some(text) = str_arg("Guid", args, 0)? else {
        return Ok(Value::Null);
    };
    Uuid::parse_str(text.trim())
        .map(Value::Guid)
        .map_err(|e| ExpressionError::evaluation(format!("Guid: '{text}' is not a GUID: {e}")))
}
