//! Attribute descriptors
//!
//! Combines a table description with type classification into one descriptor per column.

use super::classifier::{classify, SemanticType};
use super::error::{DatabaseError, Result};
use super::schema::{ColumnDefinition, AUTO_INCREMENT_FLAG, PRIMARY_KEY_MARKER};
use super::value::DatabaseValue;
use serde::{Deserialize, Serialize};

/// Key role of a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyRole {
    /// Not part of any key
    None,
    /// The table's primary key
    Primary,
    /// Another key indicator, passed through as reported (`UNI`, `MUL`, ...)
    Other(String),
}

impl KeyRole {
    /// Interpret a `Key` indicator from a table description
    pub fn from_indicator(indicator: &str) -> Self {
        let indicator = indicator.trim();
        if indicator == PRIMARY_KEY_MARKER {
            KeyRole::Primary
        } else if indicator.is_empty() {
            KeyRole::None
        } else {
            KeyRole::Other(indicator.to_string())
        }
    }
}

/// Per-column metadata derived from introspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    pub name: String,
    pub semantic_type: SemanticType,
    /// Column type exactly as the database reported it
    pub raw_column_type: String,
    pub is_unsigned: bool,
    pub has_zerofill: bool,
    pub nullable: bool,
    pub key_role: KeyRole,
    /// Never NULL for a non-nullable column
    pub default_value: DatabaseValue,
    pub has_auto_increment: bool,
}

impl AttributeDescriptor {
    /// Build the descriptor for one described column
    pub fn from_column(column: &ColumnDefinition) -> Self {
        let class = classify(&column.column_type);
        let nullable = column.is_nullable();

        let default_value = match &column.default {
            None if !nullable => class.semantic_type.zero_value(),
            None => DatabaseValue::Null,
            Some(raw) => class
                .semantic_type
                .coerce(DatabaseValue::String(raw.clone())),
        };

        Self {
            name: column.field.clone(),
            raw_column_type: column.column_type.clone(),
            is_unsigned: class.is_unsigned,
            has_zerofill: class.has_zerofill,
            nullable,
            key_role: KeyRole::from_indicator(&column.key),
            default_value,
            has_auto_increment: column.has_flag(AUTO_INCREMENT_FLAG),
            semantic_type: class.semantic_type,
        }
    }

    /// True if this column is the primary key
    pub fn is_primary(&self) -> bool {
        self.key_role == KeyRole::Primary
    }

    /// Convert a value into this column's semantic type
    pub fn coerce(&self, value: DatabaseValue) -> DatabaseValue {
        self.semantic_type.coerce(value)
    }
}

/// The descriptors of one table, in column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSet {
    table: String,
    descriptors: Vec<AttributeDescriptor>,
}

impl AttributeSet {
    /// Build descriptors for a table from its description
    ///
    /// # Errors
    ///
    /// - `SchemaRetrievalFailure` if the description has no columns
    /// - `UnexpectedError` if more than one column claims the primary key
    pub fn build(table: &str, columns: &[ColumnDefinition]) -> Result<Self> {
        if columns.is_empty() {
            return Err(DatabaseError::schema_retrieval(table));
        }

        let descriptors: Vec<AttributeDescriptor> =
            columns.iter().map(AttributeDescriptor::from_column).collect();

        let primaries = descriptors.iter().filter(|d| d.is_primary()).count();
        if primaries > 1 {
            return Err(DatabaseError::unexpected(format!(
                "table `{}` declares a composite primary key ({} columns), which is not supported",
                table, primaries
            )));
        }

        Ok(Self {
            table: table.to_string(),
            descriptors,
        })
    }

    /// Table these descriptors belong to
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Look up a descriptor by column name
    pub fn get(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// True if the table has a column with this name
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The primary-key descriptor, if the table has one
    pub fn primary(&self) -> Option<&AttributeDescriptor> {
        self.descriptors.iter().find(|d| d.is_primary())
    }

    /// Descriptors in column order
    pub fn iter(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.descriptors.iter()
    }

    /// Column names in column order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|d| d.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl<'a> IntoIterator for &'a AttributeSet {
    type Item = &'a AttributeDescriptor;
    type IntoIter = std::slice::Iter<'a, AttributeDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "int(11)")
                .not_null()
                .primary()
                .extra("auto_increment"),
            ColumnDefinition::new("name", "varchar(100)").not_null(),
            ColumnDefinition::new("age", "int(11)").default_value("0"),
            ColumnDefinition::new("score", "double").not_null(),
            ColumnDefinition::new("email", "varchar(255)").key("UNI"),
            ColumnDefinition::new("balance", "decimal(10,2)").not_null(),
        ]
    }

    #[test]
    fn test_build_users() {
        let set = AttributeSet::build("users", &users()).unwrap();
        assert_eq!(set.len(), 6);
        assert_eq!(set.table(), "users");

        let id = set.primary().unwrap();
        assert_eq!(id.name, "id");
        assert!(id.has_auto_increment);
        assert_eq!(id.semantic_type, SemanticType::Int);

        let email = set.get("email").unwrap();
        assert_eq!(email.key_role, KeyRole::Other("UNI".into()));
        assert!(!email.has_auto_increment);
    }

    #[test]
    fn test_default_synthesis() {
        let set = AttributeSet::build("users", &users()).unwrap();

        // non-nullable without default: zero or empty string
        assert_eq!(set.get("name").unwrap().default_value, DatabaseValue::String(String::new()));
        assert_eq!(set.get("score").unwrap().default_value, DatabaseValue::Double(0.0));
        assert_eq!(set.get("balance").unwrap().default_value, DatabaseValue::String(String::new()));
        assert_eq!(set.get("id").unwrap().default_value, DatabaseValue::Long(0));

        // declared default is typed by the column
        assert_eq!(set.get("age").unwrap().default_value, DatabaseValue::Long(0));

        // nullable without default stays NULL
        assert_eq!(set.get("email").unwrap().default_value, DatabaseValue::Null);
    }

    #[test]
    fn test_key_role_from_indicator() {
        assert_eq!(KeyRole::from_indicator("PRI"), KeyRole::Primary);
        assert_eq!(KeyRole::from_indicator(""), KeyRole::None);
        assert_eq!(KeyRole::from_indicator("MUL"), KeyRole::Other("MUL".into()));
    }

    #[test]
    fn test_empty_description_fails() {
        let err = AttributeSet::build("ghosts", &[]).unwrap_err();
        assert!(matches!(err, DatabaseError::SchemaRetrievalFailure { ref table } if table == "ghosts"));
    }

    #[test]
    fn test_composite_primary_key_rejected() {
        let columns = vec![
            ColumnDefinition::new("a", "int").not_null().primary(),
            ColumnDefinition::new("b", "int").not_null().primary(),
        ];
        let err = AttributeSet::build("pairs", &columns).unwrap_err();
        assert!(matches!(err, DatabaseError::UnexpectedError(_)));
    }

    #[test]
    fn test_no_primary_key_is_allowed() {
        let columns = vec![ColumnDefinition::new("line", "text")];
        let set = AttributeSet::build("log", &columns).unwrap();
        assert!(set.primary().is_none());
    }
}
