//! Generic CRUD over introspected tables
//!
//! [`Mapper`] builds and runs SELECT/COUNT/INSERT/UPDATE/DELETE statements for any
//! [`Model`], using attribute descriptors introspected from the live schema. Every error it
//! raises is recorded to its [`DiagnosticSink`] before being returned.

use super::attribute::AttributeSet;
use super::condition::{normalize, ConditionInput};
use super::database::Database;
use super::diagnostics::{DiagnosticRecord, DiagnosticSink, LogSink};
use super::error::{DatabaseError, Result};
use super::record::{Model, Record, RecordSet};
use super::schema::ColumnDefinition;
use super::statement::{
    select_by_primary_key, CountBuilder, DeleteBuilder, InsertBuilder, SelectBuilder,
    UpdateBuilder,
};
use super::value::{DatabaseRow, DatabaseValue, QueryParams, RecordKey};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Mapper behaviour switches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Keep descriptor sets per table for the mapper's lifetime
    ///
    /// Cached descriptors go stale if the schema changes; call [`Mapper::invalidate`].
    pub cache_attributes: bool,
}

impl MapperConfig {
    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| DatabaseError::unexpected(format!("invalid mapper config: {}", e)))
    }
}

/// Which path `save` took
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// UPDATE by primary key; `true` if a row was affected
    Updated(bool),
    /// INSERT; carries the identifier now held by the record
    Inserted(DatabaseValue),
}

/// CRUD executor bound to one connection provider
pub struct Mapper<D: Database + ?Sized> {
    db: Arc<D>,
    config: MapperConfig,
    cache: RwLock<HashMap<String, Arc<AttributeSet>>>,
    sink: Arc<dyn DiagnosticSink>,
}

impl<D: Database + ?Sized> Mapper<D> {
    /// Create a mapper with the default configuration, reporting errors to the log
    pub fn new(db: Arc<D>) -> Self {
        Self::with_config(db, MapperConfig::default())
    }

    /// Create a mapper with a custom configuration
    pub fn with_config(db: Arc<D>, config: MapperConfig) -> Self {
        Self {
            db,
            config,
            cache: RwLock::new(HashMap::new()),
            sink: Arc::new(LogSink),
        }
    }

    /// Replace the diagnostic sink
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Connection provider
    pub fn database(&self) -> &Arc<D> {
        &self.db
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Drop the cached descriptors of one table
    pub fn invalidate(&self, table: &str) {
        if self.cache.write().remove(table).is_some() {
            log::debug!("invalidated cached attributes of `{}`", table);
        }
    }

    /// Drop every cached descriptor set
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    /// Record `err` to the sink; the captured location is the mapper operation's raise site
    #[track_caller]
    fn raise(&self, err: DatabaseError, operation: &'static str, table: &str) -> DatabaseError {
        self.sink
            .record(&DiagnosticRecord::capture(&err, operation, table));
        err
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.db.is_connected() {
            Ok(())
        } else {
            Err(DatabaseError::connection("not connected to database"))
        }
    }

    /// Raw column definitions of a table
    pub async fn describe(&self, table: &str) -> Result<Vec<ColumnDefinition>> {
        self.describe_inner(table)
            .await
            .map_err(|e| self.raise(e, "describe", table))
    }

    async fn describe_inner(&self, table: &str) -> Result<Vec<ColumnDefinition>> {
        self.ensure_connected()?;
        log::debug!("describe: {}", self.db.database_type().describe_statement(table));
        self.db.describe(table).await
    }

    /// Attribute descriptors of a table
    ///
    /// # Errors
    ///
    /// `SchemaRetrievalFailure` if the table reports no columns
    pub async fn get_attributes(&self, table: &str) -> Result<Arc<AttributeSet>> {
        self.attributes_inner(table)
            .await
            .map_err(|e| self.raise(e, "get_attributes", table))
    }

    async fn attributes_inner(&self, table: &str) -> Result<Arc<AttributeSet>> {
        if self.config.cache_attributes {
            let cached = self.cache.read().get(table).cloned();
            if let Some(cached) = cached {
                log::trace!("attributes of `{}` served from cache", table);
                return Ok(cached);
            }
        }

        let columns = self.describe_inner(table).await?;
        let attributes = Arc::new(AttributeSet::build(table, &columns)?);

        if self.config.cache_attributes {
            self.cache
                .write()
                .insert(table.to_string(), Arc::clone(&attributes));
        }
        Ok(attributes)
    }

    /// Create an unsaved record, applying descriptor defaults to attributes absent from `seed`
    pub async fn instantiate<M: Model>(&self, seed: DatabaseRow) -> Result<M> {
        let table = M::table_name();
        async {
            let attributes = self.attributes_inner(table).await?;
            Record::instantiate(attributes, M::primary_key_name(), seed).map(M::from_record)
        }
        .await
        .map_err(|e| self.raise(e, "instantiate", table))
    }

    /// Fetch one record by primary key; `Ok(None)` if there is no such row
    pub async fn find_by_primary_key<M: Model>(&self, id: i64) -> Result<Option<M>> {
        let table = M::table_name();
        async {
            let attributes = self.attributes_inner(table).await?;
            let sql = select_by_primary_key(table, M::primary_key_name());
            log::debug!("find_by_primary_key: {} [{}]", sql, id);

            let rows = self
                .db
                .query_with_params(&sql, &QueryParams::Positional(vec![DatabaseValue::Long(id)]))
                .await?;

            Ok::<_, DatabaseError>(rows.into_iter().next().map(|row| {
                M::from_record(Record::hydrate(attributes, M::primary_key_name(), row))
            }))
        }
        .await
        .map_err(|e| self.raise(e, "find_by_primary_key", table))
    }

    /// Fetch every record matching a condition, keyed by primary key
    ///
    /// Records keep the order the rows arrived in. Rows without a primary-key value (a
    /// custom select list, say) are keyed by position.
    pub async fn find_all<M: Model>(
        &self,
        condition: impl Into<ConditionInput>,
        params: impl Into<QueryParams>,
    ) -> Result<RecordSet<M>> {
        let table = M::table_name();
        let condition = normalize(condition);
        let params = params.into();
        async {
            let attributes = self.attributes_inner(table).await?;
            let sql = SelectBuilder::from_condition(table, &condition).build();
            log::debug!("find_all: {} ({} params)", sql, params.len());

            let rows = self.db.query_with_params(&sql, &params).await?;

            let mut records = RecordSet::new();
            for (position, row) in rows.into_iter().enumerate() {
                let record = Record::hydrate(Arc::clone(&attributes), M::primary_key_name(), row);
                let key = record.key().unwrap_or(RecordKey::Row(position));
                records.insert(key, M::from_record(record));
            }
            Ok::<_, DatabaseError>(records)
        }
        .await
        .map_err(|e| self.raise(e, "find_all", table))
    }

    /// Count the rows matching a condition; ORDER and LIMIT are ignored
    pub async fn count<M: Model>(
        &self,
        condition: impl Into<ConditionInput>,
        params: impl Into<QueryParams>,
    ) -> Result<i64> {
        let table = M::table_name();
        let condition = normalize(condition);
        let params = params.into();
        async {
            self.ensure_connected()?;
            let sql = CountBuilder::from_condition(table, &condition).build();
            log::debug!("count: {} ({} params)", sql, params.len());

            let rows = self.db.query_with_params(&sql, &params).await?;
            rows.first()
                .and_then(|row| row.values().next())
                .and_then(DatabaseValue::as_long)
                .ok_or_else(|| DatabaseError::unexpected("count returned no integer value"))
        }
        .await
        .map_err(|e| self.raise(e, "count", table))
    }

    /// Persist a record
    ///
    /// A primary key set to a value greater than zero selects the UPDATE path; anything
    /// else inserts. Each insert runs atomically with the read of its generated identifier,
    /// in its own transaction or under a savepoint of one already open on the connection.
    /// The identifier is written back onto the record only when the primary key was left
    /// unset and its column is auto-increment; an explicitly set key is kept.
    pub async fn save<M: Model>(&self, model: &mut M) -> Result<SaveOutcome> {
        let table = M::table_name();
        let record = model.record_mut();
        let result = if record.is_persisted() {
            self.update(table, record).await
        } else {
            self.insert(table, record).await
        };
        result.map_err(|e| self.raise(e, "save", table))
    }

    async fn update(&self, table: &str, record: &Record) -> Result<SaveOutcome> {
        self.ensure_connected()?;
        let key_value = record
            .primary_key_value()
            .cloned()
            .unwrap_or(DatabaseValue::Null);

        let builder = record
            .non_key_values()
            .fold(
                UpdateBuilder::new(table, record.primary_key_name(), key_value),
                |builder, (name, value)| builder.set(name, value.clone()),
            );
        if builder.is_empty() {
            return Ok(SaveOutcome::Updated(false));
        }

        let sql = builder.build();
        log::debug!("save (update): {}", sql);
        let affected = self.db.execute_with_params(&sql, &builder.params()).await?;
        Ok(SaveOutcome::Updated(affected > 0))
    }

    async fn insert(&self, table: &str, record: &mut Record) -> Result<SaveOutcome> {
        self.ensure_connected()?;
        let builder = record
            .values()
            .fold(InsertBuilder::new(table), |builder, (name, value)| {
                builder.value(name, value.clone())
            });
        if builder.is_empty() {
            return Err(DatabaseError::unexpected(format!(
                "record for `{}` has no attribute values to insert",
                table
            )));
        }

        let sql = builder.build();
        log::debug!("save (insert): {}", sql);

        let (_, generated) = self.db.insert_with_params(&sql, &builder.params()).await?;

        let key_name = record.primary_key_name();
        let key_generated = !record.is_set(key_name)
            && record
                .attributes()
                .get(key_name)
                .map(|descriptor| descriptor.has_auto_increment)
                .unwrap_or(false);
        if key_generated {
            record.set_primary_key(DatabaseValue::Long(generated));
        }
        let id = record
            .primary_key_value()
            .cloned()
            .unwrap_or(DatabaseValue::Null);
        Ok(SaveOutcome::Inserted(id))
    }

    /// Delete the record's row by primary key
    ///
    /// Does nothing and returns `false` when the primary key is unset. The in-memory
    /// record is left untouched.
    pub async fn delete<M: Model>(&self, model: &M) -> Result<bool> {
        let table = M::table_name();
        let record = model.record();
        let key_value = match record.primary_key_value() {
            Some(value) if !value.is_null() => value.clone(),
            _ => return Ok(false),
        };
        async {
            self.ensure_connected()?;
            let builder = DeleteBuilder::new(table, M::primary_key_name(), key_value);
            let sql = builder.build();
            log::debug!("delete: {}", sql);
            let affected = self.db.execute_with_params(&sql, &builder.params()).await?;
            Ok::<_, DatabaseError>(affected > 0)
        }
        .await
        .map_err(|e| self.raise(e, "delete", table))
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::backends::SqliteDatabase;
    use crate::core::diagnostics::MemorySink;
    use crate::core::error::ErrorKind;
    use crate::table_record;

    table_record! {
        struct Note => "notes";
    }

    async fn mapper(config: MapperConfig) -> Mapper<SqliteDatabase> {
        let db = SqliteDatabase::new();
        db.connect(":memory:").await.unwrap();
        db.execute("CREATE TABLE notes (id INTEGER PRIMARY KEY, body varchar(200) NOT NULL)")
            .await
            .unwrap();
        Mapper::with_config(Arc::new(db), config)
    }

    #[tokio::test]
    async fn test_attribute_cache_and_invalidate() {
        let mapper = mapper(MapperConfig {
            cache_attributes: true,
        })
        .await;

        let first = mapper.get_attributes("notes").await.unwrap();
        mapper
            .database()
            .execute("ALTER TABLE notes ADD COLUMN pinned tinyint(1) NOT NULL DEFAULT 0")
            .await
            .unwrap();

        let cached = mapper.get_attributes("notes").await.unwrap();
        assert!(Arc::ptr_eq(&first, &cached));
        assert!(!cached.contains("pinned"));

        mapper.invalidate("notes");
        let fresh = mapper.get_attributes("notes").await.unwrap();
        assert!(fresh.contains("pinned"));
    }

    #[tokio::test]
    async fn test_without_cache_attributes_are_recomputed() {
        let mapper = mapper(MapperConfig::default()).await;
        let first = mapper.get_attributes("notes").await.unwrap();
        let second = mapper.get_attributes("notes").await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_errors_reach_the_sink() {
        let sink = Arc::new(MemorySink::new());
        let mapper = mapper(MapperConfig::default())
            .await
            .with_sink(sink.clone());

        let err = mapper.get_attributes("ghosts").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaRetrieval);

        let err = mapper
            .find_all::<Note>("no_such_column = 1", ())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QueryExecution);

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].operation, "get_attributes");
        assert_eq!(records[0].table, "ghosts");
        assert_eq!(records[1].operation, "find_all");
        assert_eq!(records[1].code, 10001);
        assert!(records.iter().all(|r| r.location.file().ends_with("mapper.rs")));
    }

    #[tokio::test]
    async fn test_disconnected_provider_is_connection_failure() {
        let mapper = mapper(MapperConfig::default()).await;
        mapper.database().disconnect().await.unwrap();
        let err = mapper.count::<Note>((), ()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }
}
