//! Scalar type coercion
//!
//! `Strict` accepts only the JSON shape that naturally encodes each type,
//! with int widening to float. `Lax` also accepts common string and numeric
//! spellings (`"42"` for an int, `1` for `true`, unix seconds for a datetime).
//!
//! Lists and nested objects are handled by the validator, which owns path
//! bookkeeping.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::record::FieldValue;
use super::types::FieldType;

/// How far the validator goes to fit input to the declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoercionMode {
    #[default]
    Lax,
    Strict,
}

/// Why a value did not coerce: the expected and actual type descriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Mismatch {
    pub expected: String,
    pub actual: String,
}

impl Mismatch {
    fn new(expected: impl Into<String>, value: &Value) -> Self {
        Self {
            expected: expected.into(),
            actual: describe(value),
        }
    }
}

/// Coerces a non-null value to a scalar field type.
///
/// `List` and `Nested` are not scalar; passing them is a bug in the caller.
pub(crate) fn coerce_scalar(
    value: &Value,
    field_type: &FieldType,
    mode: CoercionMode,
) -> Result<FieldValue, Mismatch> {
    let lax = mode == CoercionMode::Lax;
    match field_type {
        FieldType::Str => match value {
            Value::String(s) => Ok(FieldValue::Str(s.clone())),
            _ => Err(Mismatch::new("str", value)),
        },
        FieldType::Int => coerce_int(value, lax).ok_or_else(|| Mismatch::new("int", value)),
        FieldType::Float => coerce_float(value, lax).ok_or_else(|| Mismatch::new("float", value)),
        FieldType::Bool => coerce_bool(value, lax).ok_or_else(|| Mismatch::new("bool", value)),
        FieldType::DateTime => {
            coerce_datetime(value, lax).ok_or_else(|| Mismatch::new("datetime", value))
        }
        FieldType::Date => value
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
            .map(FieldValue::Date)
            .ok_or_else(|| Mismatch::new("date (YYYY-MM-DD)", value)),
        FieldType::Uuid => value
            .as_str()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .map(FieldValue::Uuid)
            .ok_or_else(|| Mismatch::new("uuid", value)),
        FieldType::Email => match value {
            Value::String(s) if email_shape().is_match(s) => Ok(FieldValue::Str(s.clone())),
            _ => Err(Mismatch::new("email", value)),
        },
        FieldType::Enum(variants) => match value {
            Value::String(s) if variants.iter().any(|v| v == s) => Ok(FieldValue::Enum(s.clone())),
            _ => Err(Mismatch::new(format!("one of [{}]", variants.join(", ")), value)),
        },
        FieldType::List(_) | FieldType::Nested(_) => {
            Err(Mismatch::new(field_type.type_name(), value))
        }
    }
}

fn coerce_int(value: &Value, lax: bool) -> Option<FieldValue> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(FieldValue::Int(i));
            }
            if !lax {
                return None;
            }
            let f = n.as_f64()?;
            integral_f64(f).map(FieldValue::Int)
        }
        Value::String(s) if lax => s.trim().parse::<i64>().ok().map(FieldValue::Int),
        _ => None,
    }
}

fn integral_f64(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn coerce_float(value: &Value, lax: bool) -> Option<FieldValue> {
    match value {
        Value::Number(n) => n.as_f64().map(FieldValue::Float),
        Value::String(s) if lax => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(FieldValue::Float),
        _ => None,
    }
}

fn coerce_bool(value: &Value, lax: bool) -> Option<FieldValue> {
    match value {
        Value::Bool(b) => Some(FieldValue::Bool(*b)),
        Value::Number(n) if lax => match n.as_i64() {
            Some(0) => Some(FieldValue::Bool(false)),
            Some(1) => Some(FieldValue::Bool(true)),
            _ => None,
        },
        Value::String(s) if lax => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(FieldValue::Bool(true)),
            "false" | "no" | "off" | "0" => Some(FieldValue::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_datetime(value: &Value, lax: bool) -> Option<FieldValue> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(FieldValue::DateTime(dt.with_timezone(&Utc)));
            }
            if !lax {
                return None;
            }
            // Naive timestamps are taken as UTC.
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| FieldValue::DateTime(naive.and_utc()))
        }
        Value::Number(n) if lax => n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(FieldValue::DateTime),
        _ => None,
    }
}

fn email_shape() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("email pattern is valid")
    })
}

/// Short description of a JSON value for mismatch messages.
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("bool {}", b),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                format!("int {}", n)
            } else {
                format!("float {}", n)
            }
        }
        Value::String(s) => {
            if s.chars().count() > 32 {
                let head: String = s.chars().take(32).collect();
                format!("string '{}...'", head)
            } else {
                format!("string '{}'", s)
            }
        }
        Value::Array(_) => "list".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}
