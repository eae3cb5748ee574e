//! # Rust Record Mapper
//!
//! A schema-introspecting record mapper: point it at an existing relational table and it
//! discovers the columns, classifies their types, synthesizes defaults and performs
//! create/read/update/delete through parameterized statements.
//!
//! ## Features
//!
//! - **Schema Introspection**: Columns, key roles and defaults read from the live table
//! - **Type Classification**: Raw column types mapped to `int`, `float`, `string` or `binary`
//! - **Generic CRUD**: Find by primary key, find all, count, save (insert or update), delete
//! - **Async Support**: Async/await support with Tokio
//! - **Error Reporting**: Four error kinds with stable codes, recorded to a pluggable sink
//!
//! ## Supported Databases
//!
//! | Database | Feature | Introspection |
//! |----------|---------|---------------|
//! | SQLite | `sqlite` (default) | `PRAGMA table_info` |
//! | MySQL | `mysql` | `DESCRIBE` |
//!
//! ## Quick Start
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! rust_record_mapper = { version = "0.1", features = ["sqlite"] }
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! ### Basic Usage
//!
//! ```rust,no_run
//! use rust_record_mapper::prelude::*;
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! table_record! {
//!     pub struct User => "users";
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let db = SqliteDatabase::new();
//!     db.connect(":memory:").await?;
//!     db.execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name varchar(64), age int(11) NOT NULL)")
//!         .await?;
//!
//!     let mapper = Mapper::new(Arc::new(db));
//!
//!     let mut seed = HashMap::new();
//!     seed.insert("name".to_string(), DatabaseValue::from("Ann"));
//!     let mut user: User = mapper.instantiate(seed).await?;
//!     mapper.save(&mut user).await?;
//!
//!     let adults = mapper
//!         .find_all::<User>(
//!             StructuredCondition::new().condition("age > 18").order("name ASC"),
//!             (),
//!         )
//!         .await?;
//!     for (key, user) in adults.iter() {
//!         println!("{}: {:?}", key, user.get("name"));
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Project Structure
//!
//! ```text
//! rust_record_mapper/
//! ├── src/
//! │   ├── core/              # Core types and traits
//! │   │   ├── attribute.rs   # Attribute descriptors
//! │   │   ├── classifier.rs  # Column type classification
//! │   │   ├── condition.rs   # Condition normalization
//! │   │   ├── database.rs    # Connection provider trait
//! │   │   ├── mapper.rs      # CRUD operations
//! │   │   ├── record.rs      # Records and record sets
//! │   │   ├── statement.rs   # SQL statement builders
//! │   │   └── ...
//! │   ├── backends/          # Connection provider implementations
//! │   │   ├── sqlite.rs
//! │   │   └── mysql.rs
//! │   └── lib.rs
//! ├── tests/                 # Integration and property tests
//! ├── benches/               # Criterion benchmarks
//! └── Cargo.toml
//! ```

/// Core mapper types and traits
pub mod core;

/// Database backend implementations
pub mod backends;

/// Prelude for convenient imports
///
/// ```rust
/// use rust_record_mapper::prelude::*;
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let db = SqliteDatabase::new();
///     db.connect(":memory:").await?;
///     Ok(())
/// }
/// ```
pub mod prelude {
    pub use crate::core::{
        ConditionInput, ConnectionConfig, Database, DatabaseError, DatabaseResult, DatabaseRow,
        DatabaseType, DatabaseValue, ErrorKind, Mapper, MapperConfig, Model, QueryParams,
        Record, RecordKey, RecordSet, Result, SaveOutcome, StructuredCondition, Table,
    };
    pub use crate::table_record;

    #[cfg(feature = "sqlite")]
    pub use crate::backends::SqliteDatabase;

    #[cfg(feature = "mysql")]
    pub use crate::backends::MysqlDatabase;
}

// Re-export at root level for convenience
pub use core::{
    ConnectionConfig, Database, DatabaseError, DatabaseResult, DatabaseRow, DatabaseType,
    DatabaseValue, ErrorKind, Mapper, MapperConfig, Model, QueryParams, Record, RecordSet,
    Result, SaveOutcome, Table,
};

#[cfg(feature = "sqlite")]
pub use backends::SqliteDatabase;

#[cfg(feature = "mysql")]
pub use backends::MysqlDatabase;
