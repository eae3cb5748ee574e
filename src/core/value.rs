//! Database value types
//!
//! This module defines the values exchanged with the database, the row shape returned by
//! queries, and the parameter bundles bound to prepared statements.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Database value that can hold different types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DatabaseValue {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 32-bit floating point
    Float(f32),
    /// 64-bit floating point
    Double(f64),
    /// String value
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
}

impl DatabaseValue {
    /// Get the value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DatabaseValue::Bool(v) => Some(*v),
            DatabaseValue::Int(v) => Some(*v != 0),
            DatabaseValue::Long(v) => Some(*v != 0),
            DatabaseValue::String(s) => match s.to_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Get the value as an i64
    ///
    /// Strings are parsed as decimal integers; floats are truncated.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            DatabaseValue::Long(v) => Some(*v),
            DatabaseValue::Int(v) => Some(*v as i64),
            DatabaseValue::Float(v) => Some(*v as i64),
            DatabaseValue::Double(v) => Some(*v as i64),
            DatabaseValue::String(s) => s.trim().parse().ok(),
            DatabaseValue::Bool(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Get the value as an f64
    pub fn as_double(&self) -> Option<f64> {
        match self {
            DatabaseValue::Double(v) => Some(*v),
            DatabaseValue::Float(v) => Some(*v as f64),
            DatabaseValue::Int(v) => Some(*v as f64),
            DatabaseValue::Long(v) => Some(*v as f64),
            DatabaseValue::String(s) => s.trim().parse().ok(),
            DatabaseValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Get the value as a string (zero-copy for String values)
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DatabaseValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Render the value as text, the way it would appear in a text column
    ///
    /// Returns `None` for NULL and for bytes that are not valid UTF-8.
    pub fn to_text(&self) -> Option<String> {
        match self {
            DatabaseValue::Null => None,
            DatabaseValue::Bool(v) => Some(if *v { "1" } else { "0" }.to_string()),
            DatabaseValue::Int(v) => Some(v.to_string()),
            DatabaseValue::Long(v) => Some(v.to_string()),
            DatabaseValue::Float(v) => Some(v.to_string()),
            DatabaseValue::Double(v) => Some(v.to_string()),
            DatabaseValue::String(s) => Some(s.clone()),
            DatabaseValue::Bytes(b) => String::from_utf8(b.clone()).ok(),
        }
    }

    /// Get the value as bytes (zero-copy)
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            DatabaseValue::Bytes(b) => Some(b),
            DatabaseValue::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            DatabaseValue::Null => "null",
            DatabaseValue::Bool(_) => "bool",
            DatabaseValue::Int(_) => "int",
            DatabaseValue::Long(_) => "long",
            DatabaseValue::Float(_) => "float",
            DatabaseValue::Double(_) => "double",
            DatabaseValue::String(_) => "string",
            DatabaseValue::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Display for DatabaseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseValue::Null => f.write_str("NULL"),
            DatabaseValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            other => f.write_str(&other.to_text().unwrap_or_default()),
        }
    }
}

impl From<bool> for DatabaseValue {
    fn from(v: bool) -> Self {
        DatabaseValue::Bool(v)
    }
}

impl From<i32> for DatabaseValue {
    fn from(v: i32) -> Self {
        DatabaseValue::Int(v)
    }
}

impl From<i64> for DatabaseValue {
    fn from(v: i64) -> Self {
        DatabaseValue::Long(v)
    }
}

impl From<f32> for DatabaseValue {
    fn from(v: f32) -> Self {
        DatabaseValue::Float(v)
    }
}

impl From<f64> for DatabaseValue {
    fn from(v: f64) -> Self {
        DatabaseValue::Double(v)
    }
}

impl From<String> for DatabaseValue {
    fn from(v: String) -> Self {
        DatabaseValue::String(v)
    }
}

impl From<&str> for DatabaseValue {
    fn from(v: &str) -> Self {
        DatabaseValue::String(v.to_string())
    }
}

impl From<Vec<u8>> for DatabaseValue {
    fn from(v: Vec<u8>) -> Self {
        DatabaseValue::Bytes(v)
    }
}

impl<T: Into<DatabaseValue>> From<Option<T>> for DatabaseValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => DatabaseValue::Null,
        }
    }
}

/// A row of database results (column name -> value mapping)
pub type DatabaseRow = HashMap<String, DatabaseValue>;

/// Multiple rows returned from a query
pub type DatabaseResult = Vec<DatabaseRow>;

/// Values bound to a prepared statement
///
/// Positional values fill `?` placeholders in order. Named values fill `:name`
/// placeholders; names are stored with their leading colon.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum QueryParams {
    /// No parameters
    #[default]
    None,
    /// Values for `?` placeholders, in order
    Positional(Vec<DatabaseValue>),
    /// Values for `:name` placeholders
    Named(Vec<(String, DatabaseValue)>),
}

impl QueryParams {
    /// Build a named parameter set, adding the leading `:` to keys that lack it
    pub fn named<K, V, I>(entries: I) -> Self
    where
        K: AsRef<str>,
        V: Into<DatabaseValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        QueryParams::Named(
            entries
                .into_iter()
                .map(|(k, v)| (placeholder_name(k.as_ref()), v.into()))
                .collect(),
        )
    }

    /// Build a positional parameter set
    pub fn positional<V, I>(values: I) -> Self
    where
        V: Into<DatabaseValue>,
        I: IntoIterator<Item = V>,
    {
        QueryParams::Positional(values.into_iter().map(Into::into).collect())
    }

    /// Number of bound values
    pub fn len(&self) -> usize {
        match self {
            QueryParams::None => 0,
            QueryParams::Positional(v) => v.len(),
            QueryParams::Named(v) => v.len(),
        }
    }

    /// True when nothing is bound
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a named value; the key may be given with or without its colon
    pub fn get_named(&self, key: &str) -> Option<&DatabaseValue> {
        let key = placeholder_name(key);
        match self {
            QueryParams::Named(entries) => entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl From<Vec<DatabaseValue>> for QueryParams {
    fn from(values: Vec<DatabaseValue>) -> Self {
        if values.is_empty() {
            QueryParams::None
        } else {
            QueryParams::Positional(values)
        }
    }
}

impl From<()> for QueryParams {
    fn from(_: ()) -> Self {
        QueryParams::None
    }
}

impl From<DatabaseRow> for QueryParams {
    fn from(row: DatabaseRow) -> Self {
        if row.is_empty() {
            QueryParams::None
        } else {
            QueryParams::named(row)
        }
    }
}

/// Named placeholder for a column or key: `name` and `:name` both become `:name`
pub fn placeholder_name(key: &str) -> String {
    if key.starts_with(':') {
        key.to_string()
    } else {
        format!(":{}", key)
    }
}

/// Key of a record inside a [`RecordSet`](crate::core::RecordSet)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKey {
    /// Integer primary key
    Int(i64),
    /// Primary key carried as text (unsigned or wide integers, decimals, strings)
    Text(String),
    /// Position of a row that carried no primary-key value
    Row(usize),
}

impl RecordKey {
    /// Key for a primary-key value, or `None` if the value is NULL or not representable
    pub fn from_value(value: &DatabaseValue) -> Option<Self> {
        match value {
            DatabaseValue::Null => None,
            DatabaseValue::Int(v) => Some(RecordKey::Int(*v as i64)),
            DatabaseValue::Long(v) => Some(RecordKey::Int(*v)),
            DatabaseValue::Bool(v) => Some(RecordKey::Int(*v as i64)),
            other => other.to_text().map(RecordKey::Text),
        }
    }
}

impl From<i64> for RecordKey {
    fn from(v: i64) -> Self {
        RecordKey::Int(v)
    }
}

impl From<&str> for RecordKey {
    fn from(v: &str) -> Self {
        RecordKey::Text(v.to_string())
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Int(v) => write!(f, "{}", v),
            RecordKey::Text(v) => f.write_str(v),
            RecordKey::Row(i) => write!(f, "#{}", i),
        }
    }
}
