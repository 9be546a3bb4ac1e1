//! Error types for the backend layer.

use thiserror::Error;

use crate::tag::TagParseError;

/// Backend operation result type.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Errors surfaced by backends, the registry and the mapper.
///
/// Every variant names the backend (and field or statement where one exists)
/// so callers can diagnose a failure without re-deriving state.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The field's declared type has no column mapping in this backend.
    #[error("{backend}: field '{field}' has unsupported type '{ty}'")]
    UnsupportedType {
        backend: &'static str,
        field: String,
        ty: String,
    },

    /// A recognized tag is invalid for the field it is attached to.
    #[error("{backend}: invalid tag '{key}' on field '{field}': {reason}")]
    InvalidTag {
        backend: &'static str,
        field: String,
        key: String,
        reason: String,
    },

    /// A raw value could not be converted into the declared host type.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// No backend is registered under this name.
    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    /// A backend with this name is already registered.
    #[error("Backend already registered: {0}")]
    DuplicateBackend(String),

    /// The engine rejected or failed a statement.
    #[error("{backend}: statement failed: {source} [sql: {sql}]")]
    Statement {
        backend: &'static str,
        sql: String,
        #[source]
        source: ConnectionError,
    },

    /// A host value cannot be represented by the engine.
    #[error("{backend}: cannot bind value for field '{field}': {reason}")]
    Transform {
        backend: &'static str,
        field: String,
        reason: String,
    },

    /// The number of supplied values does not match the bound fields.
    #[error("Table '{table}': expected {expected} values, got {actual}")]
    Arity {
        table: String,
        expected: usize,
        actual: usize,
    },

    /// A single row binds more parameters than the engine allows.
    #[error("{backend}: table '{table}' has {columns} columns, more than the {max_params} parameters one statement may bind")]
    TooManyColumns {
        backend: &'static str,
        table: String,
        columns: usize,
        max_params: usize,
    },

    /// The operation needs a primary key and the model declares none.
    #[error("Table '{0}' has no primary key")]
    MissingPrimaryKey(String),

    /// An update was requested on a model whose only column is its key.
    #[error("Table '{0}' has no columns to update besides its primary key")]
    NothingToUpdate(String),

    /// Malformed tag declaration.
    #[error("Invalid tag declaration: {0}")]
    TagSyntax(#[from] TagParseError),

    /// Unsupported URL or driver not compiled in.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Opening a connection failed.
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
}

impl BackendError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap a driver failure with the backend and statement that caused it.
    pub fn statement(backend: &'static str, sql: &str, source: ConnectionError) -> Self {
        Self::Statement {
            backend,
            sql: sql.to_string(),
            source,
        }
    }

    pub(crate) fn unsupported_type(
        backend: &'static str,
        field: &str,
        ty: impl ToString,
    ) -> Self {
        Self::UnsupportedType {
            backend,
            field: field.to_string(),
            ty: ty.to_string(),
        }
    }

    pub(crate) fn invalid_tag(
        backend: &'static str,
        field: &str,
        key: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidTag {
            backend,
            field: field.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn transform(backend: &'static str, field: &str, reason: impl Into<String>) -> Self {
        Self::Transform {
            backend,
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// A raw column value did not have the shape the declared host type expects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{backend}: cannot scan {found} into field '{field}' ({expected})")]
pub struct ScanError {
    pub backend: &'static str,
    pub field: String,
    pub expected: String,
    pub found: String,
}

impl ScanError {
    pub fn new(
        backend: &'static str,
        field: &str,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            field: field.to_string(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Errors raised by a driver connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "duckdb")]
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Type conversion error: {0}")]
    TypeConversion(String),

    /// Error reported by an externally supplied driver.
    #[error("Driver error: {0}")]
    Driver(String),
}

impl ConnectionError {
    /// Create a driver error.
    pub fn driver(msg: impl Into<String>) -> Self {
        Self::Driver(msg.into())
    }
}
