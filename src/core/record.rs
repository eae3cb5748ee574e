//! Records and the record types bound to tables
//!
//! A [`Record`] holds one row's worth of values keyed by attribute name, bound to the
//! [`AttributeSet`] of its table. Record types wrap a `Record` and declare their table
//! through [`Table`]; the [`table_record!`](crate::table_record) macro writes that wrapper.

use super::attribute::AttributeSet;
use super::error::{DatabaseError, Result};
use super::value::{DatabaseRow, DatabaseValue, RecordKey};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Static table binding of a record type
pub trait Table {
    /// Table name
    fn table_name() -> &'static str;

    /// Primary-key column name
    fn primary_key_name() -> &'static str {
        "id"
    }
}

/// A record type the mapper can construct and persist
pub trait Model: Table + Sized {
    /// Wrap a record fetched or instantiated for this table
    fn from_record(record: Record) -> Self;

    fn record(&self) -> &Record;

    fn record_mut(&mut self) -> &mut Record;

    /// Unwrap into the underlying record
    fn into_record(self) -> Record;
}

/// In-memory values for one row of a table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    #[serde(skip)]
    attributes: Arc<AttributeSet>,
    #[serde(skip)]
    primary_key: String,
    #[serde(flatten)]
    values: HashMap<String, DatabaseValue>,
}

impl Record {
    fn empty(attributes: Arc<AttributeSet>, primary_key: &str) -> Self {
        Self {
            attributes,
            primary_key: primary_key.to_string(),
            values: HashMap::new(),
        }
    }

    /// Populate from a fetched row plus descriptor defaults
    ///
    /// Every column present in `row` is assigned. A column missing from `row` gets its
    /// descriptor default, except the primary key, which stays unset.
    pub fn hydrate(attributes: Arc<AttributeSet>, primary_key: &str, row: DatabaseRow) -> Self {
        let mut record = Self::empty(attributes, primary_key);
        record.fill(row);
        record
    }

    /// Create a fresh record from caller-supplied seed values plus descriptor defaults
    ///
    /// # Errors
    ///
    /// `SchemaRetrievalFailure` if the table has no attributes
    pub fn instantiate(
        attributes: Arc<AttributeSet>,
        primary_key: &str,
        seed: DatabaseRow,
    ) -> Result<Self> {
        if attributes.is_empty() {
            return Err(DatabaseError::schema_retrieval(attributes.table()));
        }
        let mut record = Self::empty(attributes, primary_key);
        record.fill(seed);
        Ok(record)
    }

    fn fill(&mut self, mut source: DatabaseRow) {
        let attributes = Arc::clone(&self.attributes);
        for descriptor in attributes.iter() {
            match source.remove(&descriptor.name) {
                Some(value) => {
                    self.values
                        .insert(descriptor.name.clone(), descriptor.coerce(value));
                }
                None if descriptor.name != self.primary_key => {
                    self.values
                        .insert(descriptor.name.clone(), descriptor.default_value.clone());
                }
                None => {}
            }
        }
    }

    /// Value of an attribute, if set
    pub fn get(&self, name: &str) -> Option<&DatabaseValue> {
        self.values.get(name)
    }

    /// Assign an attribute, coerced to its column type
    ///
    /// # Errors
    ///
    /// `UnexpectedError` if the table has no such column
    pub fn set(&mut self, name: &str, value: impl Into<DatabaseValue>) -> Result<()> {
        let descriptor = self.attributes.get(name).ok_or_else(|| {
            DatabaseError::unexpected(format!(
                "table `{}` has no attribute `{}`",
                self.attributes.table(),
                name
            ))
        })?;
        let value = descriptor.coerce(value.into());
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Remove an attribute's value so it is left out of INSERT and UPDATE
    pub fn unset(&mut self, name: &str) -> Option<DatabaseValue> {
        self.values.remove(name)
    }

    /// True if the attribute has a value (NULL counts as a value)
    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Name of the primary-key column
    pub fn primary_key_name(&self) -> &str {
        &self.primary_key
    }

    /// Primary-key value, if set
    pub fn primary_key_value(&self) -> Option<&DatabaseValue> {
        self.values.get(&self.primary_key)
    }

    /// True when the primary key is set to something greater than zero
    ///
    /// This alone decides whether `save` updates or inserts.
    pub fn is_persisted(&self) -> bool {
        self.primary_key_value()
            .and_then(DatabaseValue::as_long)
            .map(|id| id > 0)
            .unwrap_or(false)
    }

    /// Assign the primary key, coerced to its column type when the column is known
    pub fn set_primary_key(&mut self, value: impl Into<DatabaseValue>) {
        let value = value.into();
        let value = match self.attributes.get(&self.primary_key) {
            Some(descriptor) => descriptor.coerce(value),
            None => value,
        };
        self.values.insert(self.primary_key.clone(), value);
    }

    /// Key for this record in a [`RecordSet`]
    pub fn key(&self) -> Option<RecordKey> {
        self.primary_key_value().and_then(RecordKey::from_value)
    }

    /// Attribute set this record is bound to
    pub fn attributes(&self) -> &Arc<AttributeSet> {
        &self.attributes
    }

    /// Set values in column order, primary key included
    pub fn values(&self) -> impl Iterator<Item = (&str, &DatabaseValue)> {
        self.attributes
            .names()
            .filter_map(|name| self.values.get_key_value(name))
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Set values in column order, primary key excluded
    pub fn non_key_values(&self) -> impl Iterator<Item = (&str, &DatabaseValue)> {
        let primary_key = self.primary_key.as_str();
        self.values().filter(move |(name, _)| *name != primary_key)
    }

    /// Serialize the set values as a JSON object
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| DatabaseError::unexpected(e.to_string()))
    }
}

/// Records returned by `find_all`, in fetch order and addressable by primary key
#[derive(Debug, Clone)]
pub struct RecordSet<M> {
    entries: Vec<(RecordKey, M)>,
    index: HashMap<RecordKey, usize>,
}

impl<M> RecordSet<M> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Insert under `key`; a record already stored under the same key is replaced in place
    pub fn insert(&mut self, key: RecordKey, record: M) {
        match self.index.get(&key) {
            Some(&pos) => self.entries[pos].1 = record,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, record));
            }
        }
    }

    pub fn get(&self, key: &RecordKey) -> Option<&M> {
        self.index.get(key).map(|&pos| &self.entries[pos].1)
    }

    pub fn get_mut(&mut self, key: &RecordKey) -> Option<&mut M> {
        match self.index.get(key) {
            Some(&pos) => Some(&mut self.entries[pos].1),
            None => None,
        }
    }

    pub fn contains_key(&self, key: &RecordKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &RecordKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordKey, &M)> {
        self.entries.iter().map(|(k, m)| (k, m))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<M> Default for RecordSet<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> IntoIterator for RecordSet<M> {
    type Item = (RecordKey, M);
    type IntoIter = std::vec::IntoIter<(RecordKey, M)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Declare a record type bound to a table
///
/// ```
/// use rust_record_mapper::table_record;
///
/// table_record! {
///     /// A row of `users`
///     pub struct User => "users";
/// }
///
/// table_record! {
///     pub struct Order => "orders", primary_key = "order_id";
/// }
///
/// use rust_record_mapper::core::Table;
/// assert_eq!(User::primary_key_name(), "id");
/// assert_eq!(Order::primary_key_name(), "order_id");
/// ```
#[macro_export]
macro_rules! table_record {
    ($(#[$meta:meta])* $vis:vis struct $name:ident => $table:literal $(, primary_key = $pk:literal)? ;) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis struct $name($crate::core::Record);

        impl $crate::core::Table for $name {
            fn table_name() -> &'static str {
                $table
            }

            $(
                fn primary_key_name() -> &'static str {
                    $pk
                }
            )?
        }

        impl $crate::core::Model for $name {
            fn from_record(record: $crate::core::Record) -> Self {
                Self(record)
            }

            fn record(&self) -> &$crate::core::Record {
                &self.0
            }

            fn record_mut(&mut self) -> &mut $crate::core::Record {
                &mut self.0
            }

            fn into_record(self) -> $crate::core::Record {
                self.0
            }
        }

        impl ::std::ops::Deref for $name {
            type Target = $crate::core::Record;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl ::std::ops::DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::ColumnDefinition;

    fn users() -> Arc<AttributeSet> {
        let columns = vec![
            ColumnDefinition::new("id", "int(11)")
                .not_null()
                .primary()
                .extra("auto_increment"),
            ColumnDefinition::new("name", "varchar(100)").not_null(),
            ColumnDefinition::new("age", "int(11)").default_value("0"),
        ];
        Arc::new(AttributeSet::build("users", &columns).unwrap())
    }

    fn row(entries: &[(&str, DatabaseValue)]) -> DatabaseRow {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_instantiate_with_seed() {
        let record =
            Record::instantiate(users(), "id", row(&[("name", "Ann".into())])).unwrap();
        assert_eq!(record.get("name"), Some(&DatabaseValue::String("Ann".into())));
        assert_eq!(record.get("age"), Some(&DatabaseValue::Long(0)));
        assert_eq!(record.primary_key_value(), None);
        assert!(!record.is_persisted());
    }

    #[test]
    fn test_instantiate_without_seed_uses_defaults() {
        let record = Record::instantiate(users(), "id", DatabaseRow::new()).unwrap();
        assert_eq!(record.get("name"), Some(&DatabaseValue::String(String::new())));
        assert_eq!(record.get("age"), Some(&DatabaseValue::Long(0)));
        assert!(!record.is_set("id"));
    }

    #[test]
    fn test_instantiate_empty_attributes_fails() {
        // `build` refuses empty descriptions; a deserialized set can still be empty
        let empty: AttributeSet =
            serde_json::from_str(r#"{"table": "ghosts", "descriptors": []}"#).unwrap();
        let err = Record::instantiate(Arc::new(empty), "id", DatabaseRow::new()).unwrap_err();
        assert!(matches!(err, DatabaseError::SchemaRetrievalFailure { ref table } if table == "ghosts"));
    }

    #[test]
    fn test_hydrate_coerces_and_keeps_key() {
        let record = Record::hydrate(
            users(),
            "id",
            row(&[
                ("id", DatabaseValue::String("5".into())),
                ("name", "Bob".into()),
                ("age", DatabaseValue::Null),
                ("ignored", "x".into()),
            ]),
        );
        assert_eq!(record.primary_key_value(), Some(&DatabaseValue::Long(5)));
        assert_eq!(record.get("age"), Some(&DatabaseValue::Null));
        assert!(record.get("ignored").is_none());
        assert_eq!(record.key(), Some(RecordKey::Int(5)));
        assert!(record.is_persisted());
    }

    #[test]
    fn test_hydrate_missing_columns_get_defaults() {
        let record = Record::hydrate(users(), "id", row(&[("name", "Cy".into())]));
        assert_eq!(record.get("age"), Some(&DatabaseValue::Long(0)));
        assert!(record.primary_key_value().is_none());
        assert_eq!(record.key(), None);
    }

    #[test]
    fn test_set_rejects_unknown_attribute() {
        let mut record = Record::instantiate(users(), "id", DatabaseRow::new()).unwrap();
        assert!(record.set("age", "41").is_ok());
        assert_eq!(record.get("age"), Some(&DatabaseValue::Long(41)));
        assert!(matches!(
            record.set("nope", 1),
            Err(DatabaseError::UnexpectedError(_))
        ));
    }

    #[test]
    fn test_values_in_column_order() {
        let mut record =
            Record::instantiate(users(), "id", row(&[("name", "Ann".into())])).unwrap();
        record.set_primary_key(3i64);
        let names: Vec<&str> = record.values().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["id", "name", "age"]);
        let names: Vec<&str> = record.non_key_values().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["name", "age"]);
    }

    #[test]
    fn test_non_positive_key_is_not_persisted() {
        let mut record = Record::instantiate(users(), "id", DatabaseRow::new()).unwrap();
        record.set_primary_key(0i64);
        assert!(!record.is_persisted());
        record.set_primary_key(-4i64);
        assert!(!record.is_persisted());
    }

    #[test]
    fn test_to_json() {
        let record =
            Record::instantiate(users(), "id", row(&[("name", "Ann".into())])).unwrap();
        let json: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(json["name"]["String"], "Ann");
    }

    #[test]
    fn test_record_set_keeps_fetch_order() {
        let mut set = RecordSet::new();
        set.insert(RecordKey::Int(9), "nine");
        set.insert(RecordKey::Int(2), "two");
        set.insert(RecordKey::Int(9), "NINE");
        assert_eq!(set.len(), 2);
        let keys: Vec<_> = set.keys().cloned().collect();
        assert_eq!(keys, vec![RecordKey::Int(9), RecordKey::Int(2)]);
        assert_eq!(set.get(&RecordKey::Int(9)), Some(&"NINE"));
    }
}
