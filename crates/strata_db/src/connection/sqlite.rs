//! SQLite connection adapter over rusqlite.

use std::path::Path;

use rusqlite::types::{Value, ValueRef};
use tracing::info;

use super::{ensure_parent_dir, text_column, Connection, StatementSpan};
use crate::error::ConnectionError;
use crate::value::{DbRow, DbValue};

/// Synchronous SQLite connection.
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl SqliteConnection {
    /// Open or create a database file, creating its parent directory.
    pub fn open(path: &Path) -> Result<Self, ConnectionError> {
        ensure_parent_dir(path)?;
        let conn = rusqlite::Connection::open(path)?;
        info!("Opened SQLite database: {}", path.display());
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, ConnectionError> {
        let conn = rusqlite::Connection::open_in_memory()?;
        info!("Opened in-memory SQLite database");
        Ok(Self { conn })
    }

    /// Escape hatch to the underlying rusqlite connection.
    pub fn inner(&self) -> &rusqlite::Connection {
        &self.conn
    }
}

/// SQLite has no boolean or timestamp storage class; the backend's
/// transforms normally run first, these arms cover raw callers.
fn bind(params: &[DbValue]) -> impl Iterator<Item = Value> + '_ {
    params.iter().map(|param| match param {
        DbValue::Null => Value::Null,
        DbValue::Integer(v) => Value::Integer(*v),
        DbValue::Real(v) => Value::Real(*v),
        DbValue::Text(v) => Value::Text(v.clone()),
        DbValue::Blob(v) => Value::Blob(v.clone()),
        DbValue::Boolean(v) => Value::Integer(i64::from(*v)),
        DbValue::Timestamp(v) => Value::Text(v.to_rfc3339()),
    })
}

fn read_column(value: ValueRef<'_>) -> DbValue {
    match value {
        ValueRef::Null => DbValue::Null,
        ValueRef::Integer(v) => DbValue::Integer(v),
        ValueRef::Real(v) => DbValue::Real(v),
        ValueRef::Text(bytes) => text_column(bytes),
        ValueRef::Blob(bytes) => DbValue::Blob(bytes.to_vec()),
    }
}

impl Connection for SqliteConnection {
    fn execute(&self, sql: &str, params: &[DbValue]) -> Result<u64, ConnectionError> {
        StatementSpan::exec(sql).run(|| {
            let mut stmt = self.conn.prepare_cached(sql)?;
            let affected = stmt.execute(rusqlite::params_from_iter(bind(params)))?;
            Ok(affected as u64)
        })
    }

    fn query(&self, sql: &str, params: &[DbValue]) -> Result<Vec<DbRow>, ConnectionError> {
        StatementSpan::query(sql).run(|| {
            let mut stmt = self.conn.prepare_cached(sql)?;
            let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

            let mut rows = stmt.query(rusqlite::params_from_iter(bind(params)))?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let values = (0..columns.len())
                    .map(|i| row.get_ref(i).map(read_column))
                    .collect::<Result<Vec<_>, _>>()?;
                out.push(DbRow::new(columns.clone(), values));
            }
            Ok(out)
        })
    }

    /// SQLite reports rowid 0 when nothing has been inserted yet.
    fn last_insert_id(&self) -> Option<i64> {
        match self.conn.last_insert_rowid() {
            0 => None,
            id => Some(id),
        }
    }

    fn execute_batch(&self, sql: &str) -> Result<(), ConnectionError> {
        StatementSpan::batch(sql).run(|| Ok(self.conn.execute_batch(sql)?))
    }
}
