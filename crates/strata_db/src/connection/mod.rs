//! Driver boundary.
//!
//! Backends never talk to a database crate directly; they go through the
//! `Connection` trait. Built-in adapters exist for SQLite (rusqlite) and
//! DuckDB; PostgreSQL and MySQL callers supply their own implementation.
//!
//! A connection is not assumed safe for concurrent use. Callers serialize
//! access to a single connection or use one connection per caller.

#[cfg(feature = "duckdb")]
mod duckdb;
#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "duckdb")]
pub use self::duckdb::DuckDbConnection;
#[cfg(feature = "sqlite")]
pub use self::sqlite::SqliteConnection;

use std::path::Path;
use std::time::Instant;

use tracing::{debug_span, Span};

use crate::error::ConnectionError;
use crate::value::{DbRow, DbValue};

/// An open database connection able to run parameterized statements.
pub trait Connection {
    /// Execute a statement, returning the number of affected rows.
    fn execute(&self, sql: &str, params: &[DbValue]) -> Result<u64, ConnectionError>;

    /// Run a query and return all rows.
    fn query(&self, sql: &str, params: &[DbValue]) -> Result<Vec<DbRow>, ConnectionError>;

    /// Identifier generated by the most recent insert, if the driver reports one.
    fn last_insert_id(&self) -> Option<i64>;

    /// Execute several statements separated by `;`.
    fn execute_batch(&self, sql: &str) -> Result<(), ConnectionError> {
        self.execute(sql, &[]).map(|_| ())
    }
}

/// Tracing span around one statement; records `duration_ms` on completion.
pub(crate) struct StatementSpan {
    span: Span,
    start: Instant,
}

impl StatementSpan {
    pub(crate) fn exec(sql: &str) -> Self {
        Self::start(debug_span!(
            "db.exec",
            op = sql_op_name(sql),
            sql_hash = %hash_sql(sql),
            duration_ms = tracing::field::Empty
        ))
    }

    pub(crate) fn query(sql: &str) -> Self {
        Self::start(debug_span!(
            "db.query",
            op = sql_op_name(sql),
            sql_hash = %hash_sql(sql),
            duration_ms = tracing::field::Empty
        ))
    }

    pub(crate) fn batch(sql: &str) -> Self {
        Self::start(debug_span!(
            "db.exec_batch",
            op = "BATCH",
            sql_hash = %hash_sql(sql),
            duration_ms = tracing::field::Empty
        ))
    }

    fn start(span: Span) -> Self {
        Self {
            span,
            start: Instant::now(),
        }
    }

    pub(crate) fn run<T>(
        self,
        f: impl FnOnce() -> Result<T, ConnectionError>,
    ) -> Result<T, ConnectionError> {
        let out = self.span.in_scope(f);
        self.span
            .record("duration_ms", self.start.elapsed().as_millis() as u64);
        out
    }
}

/// Text column bytes. Invalid UTF-8 is handed on as a blob so that string
/// fields fail to scan instead of reading replacement characters.
pub(crate) fn text_column(bytes: &[u8]) -> DbValue {
    match std::str::from_utf8(bytes) {
        Ok(text) => DbValue::Text(text.to_string()),
        Err(_) => DbValue::Blob(bytes.to_vec()),
    }
}

/// Create the parent directory of a database file if it is missing.
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<(), ConnectionError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent)?;
            Ok(())
        }
        _ => Ok(()),
    }
}

pub(crate) fn sql_op_name(sql: &str) -> &str {
    sql.split_whitespace().next().unwrap_or("unknown")
}

pub(crate) fn hash_sql(sql: &str) -> String {
    // FNV-1a 64-bit hash for low-cardinality, stable identification.
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in sql.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    format!("{:016x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_name_is_first_word() {
        assert_eq!(sql_op_name("  INSERT INTO t VALUES (1)"), "INSERT");
        assert_eq!(sql_op_name(""), "unknown");
    }

    #[test]
    fn sql_hash_is_stable() {
        assert_eq!(hash_sql(""), "cbf29ce484222325");
        assert_eq!(hash_sql("SELECT 1"), hash_sql("SELECT 1"));
        assert_ne!(hash_sql("SELECT 1"), hash_sql("SELECT 2"));
    }
}
