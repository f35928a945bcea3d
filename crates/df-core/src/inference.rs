//! Value type inference for decoded strings
//!
//! Attribute values travel as strings; lookups report which primitive type
//! the string most likely holds.

use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive type inferred from a string value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Null,
    Bool,
    Int,
    Float,
    Date,
    Time,
    DateTime,
    String,
}

impl ValueType {
    /// Classify a string, checking the narrowest types first
    pub fn infer(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            return ValueType::Null;
        }
        if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
            return ValueType::Bool;
        }
        if value.parse::<i64>().is_ok() {
            return ValueType::Int;
        }
        if is_float(value) {
            return ValueType::Float;
        }
        if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
            return ValueType::Date;
        }
        if NaiveTime::parse_from_str(value, "%H:%M:%S").is_ok() {
            return ValueType::Time;
        }
        if DateTime::parse_from_rfc3339(value).is_ok() {
            return ValueType::DateTime;
        }
        ValueType::String
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Null => "null",
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Date => "date",
            ValueType::Time => "time",
            ValueType::DateTime => "datetime",
            ValueType::String => "string",
        }
    }
}

// Rejects "inf", "NaN" and friends, which f64 parsing accepts
fn is_float(value: &str) -> bool {
    value.parse::<f64>().map_or(false, |f| f.is_finite())
        && value.chars().any(|c| c.is_ascii_digit())
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
