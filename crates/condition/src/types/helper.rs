//! Coarse type classification
//!
//! Consistency checks and client-side mirrors only care about a small closed
//! set of type families, not exact numeric widths or enum identity.

use super::Type;
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;

/// Closed classification of static and runtime types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoarseType {
    /// Any integral or fractional number
    Numeric,
    /// Text
    String,
    /// Boolean
    Bool,
    /// Date and time
    DateTime,
    /// UUID
    Guid,
    /// Duration
    TimeSpan,
    /// Enumeration member
    Enum,
    /// Anything else (nested objects, the null type)
    Other,
}

impl CoarseType {
    /// Classify a static type
    ///
    /// Nullable wrappers are removed first, then the checks run in a fixed
    /// order: timespan, datetime, numeric, string, bool, guid, enum, other.
    pub fn of(ty: &Type) -> Self {
        let ty = ty.underlying();
        if is_time_span(ty) {
            Self::TimeSpan
        } else if is_date_time(ty) {
            Self::DateTime
        } else if is_numeric(ty) {
            Self::Numeric
        } else if is_string(ty) {
            Self::String
        } else if is_bool(ty) {
            Self::Bool
        } else if is_guid(ty) {
            Self::Guid
        } else if matches!(ty, Type::Enum(_)) {
            Self::Enum
        } else {
            Self::Other
        }
    }

    /// Classify a runtime value; `null` has no family and maps to `Other`
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::TimeSpan(_) => Self::TimeSpan,
            Value::DateTime(_) => Self::DateTime,
            Value::Int(_) | Value::Float(_) => Self::Numeric,
            Value::String(_) => Self::String,
            Value::Bool(_) => Self::Bool,
            Value::Guid(_) => Self::Guid,
            Value::Enum(_) => Self::Enum,
            Value::Null | Value::Object(_) => Self::Other,
        }
    }

    /// Whether relational ordering (`<`, `>`, ...) is defined for the family
    pub fn supports_ordering(self) -> bool {
        matches!(self, Self::Numeric | Self::DateTime | Self::String)
    }

    /// Lowercase family name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::String => "string",
            Self::Bool => "bool",
            Self::DateTime => "datetime",
            Self::Guid => "guid",
            Self::TimeSpan => "timespan",
            Self::Enum => "enum",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for CoarseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the type is a duration
pub fn is_time_span(ty: &Type) -> bool {
    matches!(ty.underlying(), Type::TimeSpan)
}

/// Whether the type is a date/time
pub fn is_date_time(ty: &Type) -> bool {
    matches!(ty.underlying(), Type::DateTime)
}

/// Whether the type is numeric
pub fn is_numeric(ty: &Type) -> bool {
    matches!(ty.underlying(), Type::Int | Type::Float)
}

/// Whether the type is text
pub fn is_string(ty: &Type) -> bool {
    matches!(ty.underlying(), Type::String)
}

/// Whether the type is boolean
pub fn is_bool(ty: &Type) -> bool {
    matches!(ty.underlying(), Type::Bool)
}

/// Whether the type is a UUID
pub fn is_guid(ty: &Type) -> bool {
    matches!(ty.underlying(), Type::Guid)
}

/// Parse a date/time written as text
///
/// Accepts RFC 3339 (offset dropped after conversion to UTC) and the common
/// `YYYY-MM-DD[ HH:MM:SS]`, `YYYY/MM/DD[ HH:MM:SS]`, `DD.MM.YYYY[ HH:MM:SS]`
/// layouts, with `T` allowed as the date/time separator.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }

    const DATE_TIME_FORMATS: [&str; 5] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%d.%m.%Y %H:%M:%S",
    ];
    const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];

    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
