//! Raw column definitions as reported by schema introspection
//!
//! Backends answer `describe` with one [`ColumnDefinition`] per column, in the shape of a
//! MySQL `DESCRIBE` result: Field, Type, Null, Key, Default, Extra.

use super::error::{DatabaseError, Result};
use super::value::{DatabaseResult, DatabaseRow, DatabaseValue};
use serde::{Deserialize, Serialize};

/// Key indicator reported for a primary-key column
pub const PRIMARY_KEY_MARKER: &str = "PRI";

/// Extra flag marking an auto-increment column
pub const AUTO_INCREMENT_FLAG: &str = "auto_increment";

/// One row of a table description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name (`Field`)
    pub field: String,
    /// Raw column type, e.g. `int(11) unsigned` (`Type`)
    pub column_type: String,
    /// `YES` or `NO` (`Null`)
    pub null: String,
    /// `PRI`, another index marker, or empty (`Key`)
    pub key: String,
    /// Declared default as text, `None` when there is none (`Default`)
    pub default: Option<String>,
    /// Space-separated flags such as `auto_increment` (`Extra`)
    pub extra: String,
}

impl ColumnDefinition {
    /// Create a definition for a nullable column with no key, default or flags
    pub fn new(field: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            column_type: column_type.into(),
            null: "YES".to_string(),
            key: String::new(),
            default: None,
            extra: String::new(),
        }
    }

    /// Mark the column `NOT NULL`
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.null = "NO".to_string();
        self
    }

    /// Mark the column as the primary key
    #[must_use]
    pub fn primary(mut self) -> Self {
        self.key = PRIMARY_KEY_MARKER.to_string();
        self
    }

    /// Set the key indicator
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Set the declared default
    #[must_use]
    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Set the extra flags
    #[must_use]
    pub fn extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = extra.into();
        self
    }

    /// True unless `Null` is `NO`
    pub fn is_nullable(&self) -> bool {
        !self.null.eq_ignore_ascii_case("NO")
    }

    /// True if `Extra` lists `flag`
    pub fn has_flag(&self, flag: &str) -> bool {
        self.extra
            .split_whitespace()
            .any(|f| f.eq_ignore_ascii_case(flag))
    }

    /// Parse one row of a `DESCRIBE` / `SHOW COLUMNS` result
    ///
    /// Column lookup is case-insensitive so `INFORMATION_SCHEMA` aliases work too.
    pub fn from_describe_row(row: &DatabaseRow) -> Result<Self> {
        let text = |name: &str| -> Option<String> {
            row.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .and_then(|(_, v)| v.to_text())
        };
        let field = text("Field").ok_or_else(|| {
            DatabaseError::unexpected("table description row has no `Field` column")
        })?;
        let column_type = text("Type").unwrap_or_default();
        Ok(Self {
            field,
            column_type,
            null: text("Null").unwrap_or_else(|| "YES".to_string()),
            key: text("Key").unwrap_or_default(),
            default: text("Default"),
            extra: text("Extra").unwrap_or_default(),
        })
    }

    /// Render back into a `DESCRIBE`-shaped row
    pub fn to_describe_row(&self) -> DatabaseRow {
        let mut row = DatabaseRow::new();
        row.insert("Field".into(), self.field.clone().into());
        row.insert("Type".into(), self.column_type.clone().into());
        row.insert("Null".into(), self.null.clone().into());
        row.insert("Key".into(), self.key.clone().into());
        row.insert(
            "Default".into(),
            self.default
                .clone()
                .map(DatabaseValue::String)
                .unwrap_or(DatabaseValue::Null),
        );
        row.insert("Extra".into(), self.extra.clone().into());
        row
    }
}

/// Parse a whole `DESCRIBE` result
pub fn parse_description(rows: &DatabaseResult) -> Result<Vec<ColumnDefinition>> {
    rows.iter().map(ColumnDefinition::from_describe_row).collect()
}
