//! Date and time functions

use super::{BuiltinFunction, Signature, int_arg, str_arg};
use crate::error::{ExpressionError, ExpressionResult};
use crate::types::Type;
use crate::types::helper::parse_date;
use crate::value::Value;
use chrono::{Local, NaiveDate, TimeDelta};

pub(super) fn register(add: &mut impl FnMut(&str, Signature, BuiltinFunction)) {
    add("Now", Signature::new(Vec::new(), Type::DateTime), now);
    add("Today", Signature::new(Vec::new(), Type::DateTime), today);
    add("Date", Signature::new(vec![Type::Int; 3], Type::DateTime), date);
    add("Date", Signature::new(vec![Type::Int; 6], Type::DateTime), date);
    add(
        "ToDate",
        Signature::new([Type::String], Type::nullable(Type::DateTime)),
        to_date,
    );
    add("TimeSpan", Signature::new(vec![Type::Int; 4], Type::TimeSpan), time_span);
}

/// Current local date and time
pub fn now(_args: &[Value]) -> ExpressionResult<Value> {
    Ok(Value::DateTime(Local::now().naive_local()))
}

/// Current local date at midnight
pub fn today(_args: &[Value]) -> ExpressionResult<Value> {
    Local::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(Value::DateTime)
        .ok_or_else(|| ExpressionError::evaluation("Today: midnight is not representable"))
}

/// `Date(year, month, day[, hour, minute, second])`
pub fn date(args: &[Value]) -> ExpressionResult<Value> {
    let part = |i: usize| -> ExpressionResult<u32> {
        let value = int_arg("Date", args, i)?;
        u32::try_from(value)
            .map_err(|_| ExpressionError::evaluation(format!("Date: {value} is out of range")))
    };
    let year = int_arg("Date", args, 0)?;
    let year = i32::try_from(year)
        .map_err(|_| ExpressionError::evaluation(format!("Date: year {year} is out of range")))?;
    let (month, day) = (part(1)?, part(2)?);
    let (hour, minute, second) = if args.len() == 6 {
        (part(3)?, part(4)?, part(5)?)
    } else {
        (0, 0, 0)
    };

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .map(Value::DateTime)
        .ok_or_else(|| {
            ExpressionError::evaluation(format!(
                "Date: {year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02} is not a valid date"
            ))
        })
}

/// Parse text into a date; null when the text is null or not a date
pub fn to_date(args: &[Value]) -> ExpressionResult<Value> {
    Ok(str_arg("ToDate", args, 0)?
        .and_then(parse_date)
        .map_or(Value::Null, Value::DateTime))
}

/// `TimeSpan(days, hours, minutes, seconds)`
pub fn time_span(args: &[Value]) -> ExpressionResult<Value> {
    let overflow = || ExpressionError::evaluation("TimeSpan: duration out of range");
    let days = TimeDelta::try_days(int_arg("TimeSpan", args, 0)?).ok_or_else(overflow)?;
    let hours = TimeDelta::try_hours(int_arg("TimeSpan", args, 1)?).ok_or_else(overflow)?;
    let minutes = TimeDelta::try_minutes(int_arg("TimeSpan", args, 2)?).ok_or_else(overflow)?;
    let seconds = TimeDelta::try_seconds(int_arg("TimeSpan", args, 3)?).ok_or_else(overflow)?;
    days.checked_add(&hours)
        .and_then(|t| t.checked_add(&minutes))
        .and_then(|t| t.checked_add(&seconds))
        .map(Value::TimeSpan)
        .ok_or_else(overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn dt(text: &str) -> Value {
        Value::DateTime(NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").unwrap())
    }

    #[test]
    fn test_date_construction() {
        let args = [Value::Int(2024), Value::Int(2), Value::Int(29)];
        assert_eq!(date(&args).unwrap(), dt("2024-02-29 00:00:00"));

        let args = [2024, 1, 2, 3, 4, 5].map(Value::Int);
        assert_eq!(date(&args).unwrap(), dt("2024-01-02 03:04:05"));
    }

    #[test]
    fn test_invalid_date_is_evaluation_error() {
        let args = [Value::Int(2023), Value::Int(2), Value::Int(29)];
        assert_eq!(date(&args).unwrap_err().code(), "COND:EVAL");
    }

    #[test]
    fn test_to_date_is_null_safe() {
        assert_eq!(to_date(&[Value::Null]).unwrap(), Value::Null);
        assert_eq!(to_date(&[Value::string("nope")]).unwrap(), Value::Null);
        assert_eq!(
            to_date(&[Value::string("2024-05-01")]).unwrap(),
            dt("2024-05-01 00:00:00")
        );
    }

    #[test]
    fn test_time_span() {
        let args = [1, 2, 3, 4].map(Value::Int);
        let expected = TimeDelta::seconds(86_400 + 2 * 3_600 + 3 * 60 + 4);
        assert_eq!(time_span(&args).unwrap(), Value::TimeSpan(expected));
    }

    #[test]
    fn test_today_is_midnight() {
        let Value::DateTime(today) = today(&[]).unwrap() else {
            panic!("expected a date");
        };
        assert_eq!(today.time(), chrono::NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    }
}
