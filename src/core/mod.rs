//! Core mapper types and traits
//!
//! This module provides the building blocks of the mapper: the connection provider trait,
//! schema introspection and type classification, records, condition normalization,
//! statement building and error reporting.

pub mod attribute;
pub mod classifier;
pub mod condition;
pub mod database;
pub mod database_types;
pub mod diagnostics;
pub mod error;
pub mod mapper;
pub mod record;
pub mod schema;
pub mod statement;
pub mod value;

// Re-export commonly used types
pub use attribute::{AttributeDescriptor, AttributeSet, KeyRole};
pub use classifier::{classify, SemanticType, TypeClassification};
pub use condition::{normalize, ConditionInput, ConditionSpec, StructuredCondition};
pub use database::{ConnectionConfig, Database, DEFAULT_OPERATION_TIMEOUT};
pub use database_types::DatabaseType;
pub use diagnostics::{DiagnosticRecord, DiagnosticSink, LogSink, MemorySink};
pub use error::{DatabaseError, ErrorKind, Result};
pub use mapper::{Mapper, MapperConfig, SaveOutcome};
pub use record::{Model, Record, RecordSet, Table};
pub use schema::{parse_description, ColumnDefinition};
pub use statement::{CountBuilder, DeleteBuilder, InsertBuilder, SelectBuilder, UpdateBuilder};
pub use value::{DatabaseResult, DatabaseRow, DatabaseValue, QueryParams, RecordKey};
