//! Field kinds and the per-kind value checks.

mod builtin_types;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use builtin_types::{is_date, is_datetime, is_email, is_integer, is_uuid};

/// The eleven column kinds a table schema can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Email,
    Text,
    Int,
    Float,
    Boolean,
    Array,
    Json,
    Date,
    Datetime,
    Uuid,
    Password,
}

impl FieldType {
    /// Returns true if `value` (never `null`) conforms to this kind.
    pub fn check(self, value: &Value) -> bool {
        match self {
            FieldType::Int => is_integer(value),
            FieldType::Float => value.as_f64().is_some_and(f64::is_finite),
            FieldType::Text => value.is_string(),
            FieldType::Password => value.as_str().is_some_and(|s| !s.is_empty()),
            FieldType::Email => value.as_str().is_some_and(is_email),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Json => value.is_object() || value.is_array(),
            FieldType::Date => value.as_str().is_some_and(is_date),
            FieldType::Datetime => value.as_str().is_some_and(is_datetime),
            FieldType::Uuid => value.as_str().is_some_and(is_uuid),
        }
    }

    /// Schema document spelling of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Email => "EMAIL",
            FieldType::Text => "TEXT",
            FieldType::Int => "INT",
            FieldType::Float => "FLOAT",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Array => "ARRAY",
            FieldType::Json => "JSON",
            FieldType::Date => "DATE",
            FieldType::Datetime => "DATETIME",
            FieldType::Uuid => "UUID",
            FieldType::Password => "PASSWORD",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
