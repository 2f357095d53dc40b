//! Runtime values and context records
//!
//! A [`Record`] is an instance of an [`ObjectType`]. Records are type-checked
//! when built, which is what lets compiled predicates read fields by slot
//! without any runtime type checks.

use crate::error::{ExpressionError, ExpressionResult};
use crate::types::helper::parse_date;
use crate::types::{EnumType, ObjectType, Type};
use chrono::{NaiveDateTime, TimeDelta};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Display layout for date/time values
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// Text
    String(Arc<str>),
    /// Date and time
    DateTime(NaiveDateTime),
    /// Duration
    TimeSpan(TimeDelta),
    /// UUID
    Guid(Uuid),
    /// Enumeration member
    Enum(EnumValue),
    /// Nested record
    Object(Record),
}

impl Value {
    /// Create a string value
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Arc::from(s.as_ref()))
    }

    /// Create an enum value from a member name
    pub fn enum_member(ty: &Arc<EnumType>, member: &str) -> ExpressionResult<Self> {
        let value = ty.value_of(member).ok_or_else(|| {
            ExpressionError::schema(format!("enum '{}' has no member '{member}'", ty.name()))
        })?;
        Ok(Value::Enum(EnumValue {
            ty: Arc::clone(ty),
            value,
        }))
    }

    /// Whether the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow as text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view of the value, promoting integers
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Static type of a constant value
    pub fn static_type(&self) -> Type {
        match self {
            Value::Null => Type::Null,
            Value::Bool(_) => Type::Bool,
            Value::Int(_) => Type::Int,
            Value::Float(_) => Type::Float,
            Value::String(_) => Type::String,
            Value::DateTime(_) => Type::DateTime,
            Value::TimeSpan(_) => Type::TimeSpan,
            Value::Guid(_) => Type::Guid,
            Value::Enum(e) => Type::Enum(Arc::clone(&e.ty)),
            Value::Object(r) => Type::Object(Arc::clone(&r.ty)),
        }
    }

    /// Short type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::DateTime(_) => "datetime",
            Value::TimeSpan(_) => "timespan",
            Value::Guid(_) => "guid",
            Value::Enum(_) => "enum",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => f.write_str(s),
            Value::DateTime(dt) => write!(f, "{}", dt.format(DATE_TIME_FORMAT)),
            Value::TimeSpan(span) => write!(f, "{}", format_time_span(*span)),
            Value::Guid(g) => write!(f, "{g}"),
            Value::Enum(e) => write!(f, "{e}"),
            Value::Object(r) => write!(f, "{}", r.ty.name()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::String(s) => serializer.serialize_str(s),
            Value::Enum(e) => serializer.serialize_i64(e.value),
            Value::DateTime(_) | Value::TimeSpan(_) | Value::Guid(_) => {
                serializer.collect_str(self)
            }
            Value::Object(record) => {
                let fields = record.ty.fields();
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (field, value) in fields.iter().zip(record.values.iter()) {
                    map.serialize_entry(field.name(), value)?;
                }
                map.end()
            }
        }
    }
}

/// `[-]d.hh:mm:ss`, the conventional duration layout
fn format_time_span(span: TimeDelta) -> String {
    let sign = if span < TimeDelta::zero() { "-" } else { "" };
    let total = span.num_seconds().unsigned_abs();
    let (days, rem) = (total / 86_400, total % 86_400);
    let (hours, rem) = (rem / 3_600, rem % 3_600);
    let (minutes, seconds) = (rem / 60, rem % 60);
    if days > 0 {
        format!("{sign}{days}.{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{sign}{hours:02}:{minutes:02}:{seconds:02}")
    }
}

/// Parse `[-][d.]hh:mm:ss`
fn parse_time_span(text: &str) -> Option<TimeDelta> {
    let (negative, text) = match text.trim().strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.trim()),
    };
    let (days, clock) = match text.split_once('.') {
        Some((d, clock)) => (d.parse::<i64>().ok()?, clock),
        None => (0, text),
    };
    let mut parts = clock.split(':').map(str::parse::<i64>);
    let (h, m, s) = (parts.next()?.ok()?, parts.next()?.ok()?, parts.next()?.ok()?);
    if parts.next().is_some() || m >= 60 || s >= 60 {
        return None;
    }
    let span = TimeDelta::try_days(days)?
        .checked_add(&TimeDelta::try_hours(h)?)?
        .checked_add(&TimeDelta::try_minutes(m)?)?
        .checked_add(&TimeDelta::try_seconds(s)?)?;
    Some(if negative { -span } else { span })
}

// ============================================================================
// ENUM VALUES
// ============================================================================

/// A member of an [`EnumType`]
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    /// Enumeration the value belongs to
    pub ty: Arc<EnumType>,
    /// Underlying value
    pub value: i64,
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty.member_of(self.value) {
            Some(member) => f.write_str(member),
            None => write!(f, "{}", self.value),
        }
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// An instance of an [`ObjectType`], values stored in field-slot order
#[derive(Debug, Clone)]
pub struct Record {
    ty: Arc<ObjectType>,
    values: Arc<[Value]>,
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.ty.id() == other.ty.id() && self.values == other.values
    }
}

impl Record {
    /// Start building a record of the given type
    pub fn builder(ty: &Arc<ObjectType>) -> RecordBuilder {
        RecordBuilder {
            ty: Arc::clone(ty),
            values: vec![None; ty.fields().len()],
        }
    }

    /// Build a record from a JSON object
    ///
    /// Strings are parsed into date/time, timespan, guid and enum slots; nested
    /// objects become nested records. Unknown keys are rejected.
    pub fn from_json(ty: &Arc<ObjectType>, json: &serde_json::Value) -> ExpressionResult<Self> {
        let serde_json::Value::Object(map) = json else {
            return Err(ExpressionError::schema(format!(
                "expected a JSON object for type '{}'",
                ty.name()
            )));
        };
        let mut builder = Self::builder(ty);
        for (key, raw) in map {
            let (_, field) = ty.field(key).ok_or_else(|| {
                ExpressionError::schema(format!("type '{}' has no field '{key}'", ty.name()))
            })?;
            let value = value_from_json(field.ty(), raw).map_err(|e| match e {
                ExpressionError::Schema { message } => {
                    ExpressionError::schema(format!("field '{key}': {message}"))
                }
                other => other,
            })?;
            builder = builder.set(key, value)?;
        }
        builder.build()
    }

    /// The record's type
    pub fn object_type(&self) -> &Arc<ObjectType> {
        &self.ty
    }

    /// Value in a field slot
    pub fn slot(&self, slot: usize) -> &Value {
        &self.values[slot]
    }

    /// Value of a top-level field
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.ty.field(name).map(|(slot, _)| &self.values[slot])
    }

    /// Value at a dotted path; a null intermediate object yields `Null`
    pub fn resolve_path(&self, path: &str) -> Option<&Value> {
        const NULL: &Value = &Value::Null;
        let mut segments = path.split('.');
        let mut current = self.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Object(record) => record.get(segment)?,
                Value::Null => NULL,
                _ => return None,
            };
        }
        Some(current)
    }
}

/// Type-checked builder for [`Record`]
#[derive(Debug)]
pub struct RecordBuilder {
    ty: Arc<ObjectType>,
    values: Vec<Option<Value>>,
}

impl RecordBuilder {
    /// Assign a field, widening integers into float slots
    pub fn set(mut self, name: &str, value: Value) -> ExpressionResult<Self> {
        let (slot, field) = self.ty.field(name).ok_or_else(|| {
            ExpressionError::schema(format!("type '{}' has no field '{name}'", self.ty.name()))
        })?;
        let value = match (field.ty().underlying(), value) {
            (Type::Float, Value::Int(i)) => Value::Float(i as f64),
            (_, value) => value,
        };
        if !field.ty().admits(&value) {
            return Err(ExpressionError::schema(format!(
                "field '{}.{name}' of type {} cannot hold a {} value",
                self.ty.name(),
                field.ty(),
                value.type_name()
            )));
        }
        self.values[slot] = Some(value);
        Ok(self)
    }

    /// Finish the record; unset nullable fields default to `Null`
    pub fn build(self) -> ExpressionResult<Record> {
        let mut values = Vec::with_capacity(self.values.len());
        for (field, value) in self.ty.fields().iter().zip(self.values) {
            match value {
                Some(v) => values.push(v),
                None if field.ty().is_nullable() => values.push(Value::Null),
                None => {
                    return Err(ExpressionError::schema(format!(
                        "required field '{}.{}' is not set",
                        self.ty.name(),
                        field.name()
                    )));
                }
            }
        }
        Ok(Record {
            ty: self.ty,
            values: values.into(),
        })
    }
}

fn value_from_json(ty: &Type, raw: &serde_json::Value) -> ExpressionResult<Value> {
    use serde_json::Value as Json;

    let mismatch = || {
        ExpressionError::schema(format!("cannot read {} from JSON value {raw}", ty))
    };

    if raw.is_null() {
        return Ok(Value::Null);
    }

    match ty.underlying() {
        Type::Bool => raw.as_bool().map(Value::Bool).ok_or_else(mismatch),
        Type::Int => raw.as_i64().map(Value::Int).ok_or_else(mismatch),
        Type::Float => raw.as_f64().map(Value::Float).ok_or_else(mismatch),
        Type::String => raw.as_str().map(Value::string).ok_or_else(mismatch),
        Type::DateTime => raw
            .as_str()
            .and_then(parse_date)
            .map(Value::DateTime)
            .ok_or_else(mismatch),
        Type::TimeSpan => raw
            .as_str()
            .and_then(parse_time_span)
            .map(Value::TimeSpan)
            .ok_or_else(mismatch),
        Type::Guid => raw
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(Value::Guid)
            .ok_or_else(mismatch),
        Type::Enum(enum_ty) => match raw {
            Json::String(member) => Value::enum_member(enum_ty, member),
            Json::Number(n) => n
                .as_i64()
                .filter(|v| enum_ty.member_of(*v).is_some())
                .map(|value| {
                    Value::Enum(EnumValue {
                        ty: Arc::clone(enum_ty),
                        value,
                    })
                })
                .ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        Type::Object(object_ty) => Record::from_json(object_ty, raw).map(Value::Object),
        Type::Nullable(_) | Type::Null => Err(mismatch()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn model() -> Arc<ObjectType> {
        let priority = EnumType::new("Priority", [("Low", 0), ("High", 2)]).unwrap();
        let address = ObjectType::builder("Address")
            .field("City", Type::String)
            .build()
            .unwrap();
        ObjectType::builder("Model")
            .field("Age", Type::Int)
            .field("Score", Type::Float)
            .nullable_field("Due", Type::DateTime)
            .field("Level", Type::Enum(priority))
            .nullable_field("Address", Type::Object(address))
            .nullable_field("Wait", Type::TimeSpan)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_type_checks_and_widens() {
        let ty = model();
        let level = Value::enum_member(&EnumType::new("Priority", [("Low", 0), ("High", 2)]).unwrap(), "High").unwrap();
        let record = Record::builder(&ty)
            .set("Age", Value::Int(30))
            .unwrap()
            .set("Score", Value::Int(7))
            .unwrap()
            .set("Level", level)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(record.get("Score"), Some(&Value::Float(7.0)));
        assert_eq!(record.get("Due"), Some(&Value::Null));

        let err = Record::builder(&ty).set("Age", Value::string("x")).unwrap_err();
        assert_eq!(err.code(), "COND:SCHEMA");
    }

    #[test]
    fn test_missing_required_field() {
        let err = Record::builder(&model()).build().unwrap_err();
        assert!(err.to_string().contains("required field 'Model.Age'"));
    }

    #[test]
    fn test_from_json_and_path_resolution() {
        let record = Record::from_json(
            &model(),
            &json!({
                "Age": 41,
                "Score": 1.5,
                "Due": "2024-05-01",
                "Level": "Low",
                "Address": { "City": "Gdansk" },
                "Wait": "1.02:03:04"
            }),
        )
        .unwrap();

        assert_eq!(
            record.resolve_path("Address.City"),
            Some(&Value::string("Gdansk"))
        );
        assert_eq!(record.get("Level").unwrap().to_string(), "Low");
        assert_eq!(record.get("Wait").unwrap().to_string(), "1.02:03:04");
        assert_eq!(
            record.get("Due").unwrap().to_string(),
            "2024-05-01 00:00:00"
        );
    }

    #[test]
    fn test_null_intermediate_path_is_null() {
        let record = Record::from_json(&model(), &json!({"Age": 1, "Score": 0.0, "Level": 0}))
            .unwrap();
        assert_eq!(record.resolve_path("Address.City"), Some(&Value::Null));
        assert_eq!(record.resolve_path("Nope"), None);
    }

    #[test]
    fn test_from_json_reports_field() {
        let err = Record::from_json(&model(), &json!({"Age": "old"})).unwrap_err();
        assert!(err.to_string().contains("field 'Age'"));
    }

    #[test]
    fn test_serialize_enum_as_underlying() {
        let priority = EnumType::new("Priority", [("Low", 0), ("High", 2)]).unwrap();
        let high = Value::enum_member(&priority, "High").unwrap();
        assert_eq!(serde_json::to_value(&high).unwrap(), json!(2));
        assert_eq!(serde_json::to_value(Value::Null).unwrap(), json!(null));
    }

    #[test]
    fn test_time_span_round_trip_layout() {
        let span = parse_time_span("-00:01:30").unwrap();
        assert_eq!(span, -TimeDelta::seconds(90));
        assert_eq!(format_time_span(span), "-00:01:30");
        assert!(parse_time_span("00:61:00").is_none());
    }
}
