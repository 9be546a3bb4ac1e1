//! Relational backend abstraction layer for the Strata object mapper.
//!
//! One mapping engine ([`Mapper`]) runs over several SQL engines by talking
//! to a [`Backend`]: a stateless strategy object that knows the engine's
//! placeholder syntax, column types, value representations and insert
//! semantics. Built-in backends cover SQLite, MySQL, PostgreSQL and DuckDB.
//!
//! # Usage
//!
//! ```rust,ignore
//! use strata_db::{BackendRegistry, DbConfig, Field, FieldType, HostValue, Mapper, Model, Tag};
//!
//! let registry = BackendRegistry::with_builtin();
//! let config = DbConfig::from_url("sqlite::memory:")?;
//! let mapper = Mapper::new(&registry, config.backend_name())?;
//! let conn = config.open()?;
//!
//! let users = Model::new("users")
//!     .with_field(Field::new("id", FieldType::I64).with_tag(Tag::parse("primary_key")?))
//!     .with_field(Field::new("name", FieldType::String));
//! mapper.create_table(conn.as_ref(), &users)?;
//! let result = mapper.insert(conn.as_ref(), &users, &[HostValue::from("ada")])?;
//! assert_eq!(result.last_insert_id, Some(1));
//! ```

pub mod backend;
pub mod config;
pub mod connection;
pub mod error;
pub mod mapper;
pub mod model;
pub mod registry;
pub mod tag;
pub mod value;

pub use backend::{
    Backend, ColumnSpec, DuckDbBackend, MySqlBackend, NamingPolicy, PlaceholderPolicy,
    PostgresBackend, RowScanner, SqliteBackend, StatementExecutor, TransformSet, TypeResolver,
    WriteResult,
};
pub use config::{DbConfig, DbLocation};
pub use connection::Connection;
#[cfg(feature = "duckdb")]
pub use connection::DuckDbConnection;
#[cfg(feature = "sqlite")]
pub use connection::SqliteConnection;
pub use error::{BackendError, ConnectionError, Result, ScanError};
pub use mapper::{Mapper, Record};
pub use model::{Field, FieldType, HostKind, Model};
pub use registry::BackendRegistry;
pub use tag::{PrimaryKey, Tag, TagParseError};
pub use value::{DbRow, DbTimestamp, DbValue, FromDbValue, HostValue};
