//! Column type classification
//!
//! Maps a raw column type as reported by the database (`int(11) unsigned`, `varchar(255)`)
//! onto the small set of semantic types records carry their values as.

use super::value::DatabaseValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type of a column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemanticType {
    /// Fits in a signed 64-bit integer
    Int,
    /// Floating point
    Float,
    /// Carried as text; includes integers too wide to hold safely and exact decimals
    String,
    /// Bit fields
    Binary,
    /// Unrecognized base type, kept verbatim
    Other(String),
}

impl SemanticType {
    /// Name of the type as used in diagnostics
    pub fn as_str(&self) -> &str {
        match self {
            SemanticType::Int => "int",
            SemanticType::Float => "float",
            SemanticType::String => "string",
            SemanticType::Binary => "binary",
            SemanticType::Other(raw) => raw.as_str(),
        }
    }

    /// True for `int` and `float`
    pub fn is_numeric(&self) -> bool {
        matches!(self, SemanticType::Int | SemanticType::Float)
    }

    /// Zero value used when a non-nullable column declares no default
    pub fn zero_value(&self) -> DatabaseValue {
        match self {
            SemanticType::Int => DatabaseValue::Long(0),
            SemanticType::Float => DatabaseValue::Double(0.0),
            _ => DatabaseValue::String(String::new()),
        }
    }

    /// Convert a value into this type's representation
    ///
    /// NULL stays NULL. A value that cannot be represented (non-numeric text in an `int`
    /// column, say) is returned unchanged so that the database gets to decide.
    pub fn coerce(&self, value: DatabaseValue) -> DatabaseValue {
        if value.is_null() {
            return value;
        }
        let converted = match self {
            SemanticType::Int => match &value {
                DatabaseValue::Double(_) | DatabaseValue::Float(_) => None,
                other => other.as_long().map(DatabaseValue::Long),
            },
            SemanticType::Float => value.as_double().map(DatabaseValue::Double),
            SemanticType::String => match &value {
                DatabaseValue::String(_) => None,
                other => other.to_text().map(DatabaseValue::String),
            },
            SemanticType::Binary => match &value {
                DatabaseValue::Bytes(_) => None,
                DatabaseValue::String(s) => Some(DatabaseValue::Bytes(s.clone().into_bytes())),
                other => other
                    .as_long()
                    .map(|v| DatabaseValue::Bytes(bit_bytes(v as u64))),
            },
            SemanticType::Other(_) => None,
        };
        converted.unwrap_or(value)
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Big-endian bytes of a bit value with leading zero bytes removed
fn bit_bytes(v: u64) -> Vec<u8> {
    let bytes = v.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    bytes[first..].to_vec()
}

/// Result of classifying a raw column type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeClassification {
    /// Semantic type
    pub semantic_type: SemanticType,
    /// `unsigned` modifier present
    pub is_unsigned: bool,
    /// `zerofill` modifier present
    pub has_zerofill: bool,
}

const SMALL_INT_PREFIXES: &[&str] = &["tinyint", "smallint", "mediumint", "bool"];
const WIDE_NUMERIC_PREFIXES: &[&str] = &["bigint", "serial", "dec", "numeric", "fixed"];
const FLOAT_PREFIXES: &[&str] = &["float", "double"];
const STRING_PREFIXES: &[&str] = &[
    "char",
    "text",
    "varchar",
    "binary",
    "varbinary",
    "blob",
    "enum",
    "set",
];
const STRING_EXACT: &[&str] = &[
    "tinyblob",
    "tinytext",
    "mediumblob",
    "mediumtext",
    "longblob",
    "longtext",
];

fn has_prefix(base: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| base.starts_with(p))
}

/// Classify a raw column type string
///
/// The first whitespace-separated token is the base type; `unsigned` and `zerofill` are
/// detected among the remaining tokens. Classification is by prefix of the lowercased base
/// token and ignores precision or length.
///
/// # Example
///
/// ```
/// use rust_record_mapper::core::classifier::{classify, SemanticType};
///
/// let class = classify("int(10) unsigned zerofill");
/// assert_eq!(class.semantic_type, SemanticType::String);
/// assert!(class.is_unsigned && class.has_zerofill);
/// ```
pub fn classify(raw_type: &str) -> TypeClassification {
    let lowered = raw_type.trim().to_lowercase();
    let mut tokens = lowered.split_whitespace();
    let base = tokens.next().unwrap_or("");
    let modifiers: Vec<&str> = tokens.collect();
    let is_unsigned = modifiers.contains(&"unsigned");
    let has_zerofill = modifiers.contains(&"zerofill");

    let semantic_type = if has_prefix(base, SMALL_INT_PREFIXES) {
        SemanticType::Int
    } else if base.starts_with("int") {
        // Unsigned 32-bit values can overflow what callers expect of an int column
        if is_unsigned {
            SemanticType::String
        } else {
            SemanticType::Int
        }
    } else if has_prefix(base, WIDE_NUMERIC_PREFIXES) {
        SemanticType::String
    } else if has_prefix(base, FLOAT_PREFIXES) {
        SemanticType::Float
    } else if base.starts_with("bit") {
        SemanticType::Binary
    } else if has_prefix(base, STRING_PREFIXES) || STRING_EXACT.contains(&base) {
        SemanticType::String
    } else {
        SemanticType::Other(base.to_string())
    };

    TypeClassification {
        semantic_type,
        is_unsigned,
        has_zerofill,
    }
}
