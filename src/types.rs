use std::fmt;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Values that can be bound to a statement or read back from a result row.
///
/// The same enum is used for both stores so row data can be built once and
/// handed to either backend:
/// ```rust
/// use store_middleware::prelude::*;
///
/// let params = vec![
///     RowValues::Int(2),
///     RowValues::Text("mohamed".into()),
///     RowValues::Int(28),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit); narrowed to the column width when bound
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S.%3f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(value: NaiveDateTime) -> Self {
        RowValues::Timestamp(value)
    }
}

impl From<JsonValue> for RowValues {
    fn from(value: JsonValue) -> Self {
        RowValues::JSON(value)
    }
}

impl From<Vec<u8>> for RowValues {
    fn from(value: Vec<u8>) -> Self {
        RowValues::Blob(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// The backing stores supported by this middleware
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Cassandra / ScyllaDB wide-column store, spoken to in CQL
    Cassandra,
    /// `PostgreSQL` relational store
    Postgres,
}

/// Bound-parameter marker syntax of a store's query language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// Positional `?` markers (CQL).
    Question,
    /// Numbered `$1`, `$2`, ... markers (`PostgreSQL`).
    Numbered,
}

impl PlaceholderStyle {
    /// Render the marker for the 1-based parameter `index`.
    #[must_use]
    pub fn render(self, index: usize) -> String {
        match self {
            PlaceholderStyle::Question => "?".to_string(),
            PlaceholderStyle::Numbered => format!("${index}"),
        }
    }
}

impl StoreKind {
    #[must_use]
    pub fn placeholder_style(self) -> PlaceholderStyle {
        match self {
            StoreKind::Cassandra => PlaceholderStyle::Question,
            StoreKind::Postgres => PlaceholderStyle::Numbered,
        }
    }

    #[must_use]
    pub fn default_port(self) -> u16 {
        match self {
            StoreKind::Cassandra => 9042,
            StoreKind::Postgres => 5432,
        }
    }

    /// Prefix of the configuration variables read by `ConnectionConfig::from_source`.
    #[must_use]
    pub fn config_prefix(self) -> &'static str {
        match self {
            StoreKind::Cassandra => "CASSANDRA_",
            StoreKind::Postgres => "POSTGRES_",
        }
    }

    /// Name of the variable holding the target namespace (keyspace or database).
    #[must_use]
    pub fn namespace_key(self) -> &'static str {
        match self {
            StoreKind::Cassandra => "KEYSPACE",
            StoreKind::Postgres => "DATABASE",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Cassandra => f.write_str("cassandra"),
            StoreKind::Postgres => f.write_str("postgres"),
        }
    }
}
