//! DuckDB connection adapter.
//!
//! DuckDB reports no generated keys, so `last_insert_id` is always `None`.
//! Integer types wider than `i64` come back as decimal text.

use std::path::Path;

use duckdb::types::{TimeUnit, Value, ValueRef};
use tracing::{info, warn};

use super::{ensure_parent_dir, text_column, Connection, StatementSpan};
use crate::error::ConnectionError;
use crate::value::{DbRow, DbTimestamp, DbValue};

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_CE_DAYS: i32 = 719_163;

/// Synchronous DuckDB connection.
pub struct DuckDbConnection {
    conn: duckdb::Connection,
}

impl std::fmt::Debug for DuckDbConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbConnection").finish_non_exhaustive()
    }
}

impl DuckDbConnection {
    /// Open or create a database file, creating its parent directory.
    pub fn open(path: &Path) -> Result<Self, ConnectionError> {
        ensure_parent_dir(path)?;
        let conn = duckdb::Connection::open(path)?;
        info!("Opened DuckDB database: {}", path.display());
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, ConnectionError> {
        let conn = duckdb::Connection::open_in_memory()?;
        info!("Opened in-memory DuckDB database");
        Ok(Self { conn })
    }
}

fn bind(params: &[DbValue]) -> Vec<Value> {
    params
        .iter()
        .map(|param| match param {
            DbValue::Null => Value::Null,
            DbValue::Integer(v) => Value::BigInt(*v),
            DbValue::Real(v) => Value::Double(*v),
            DbValue::Text(v) => Value::Text(v.clone()),
            DbValue::Blob(v) => Value::Blob(v.clone()),
            DbValue::Boolean(v) => Value::Boolean(*v),
            DbValue::Timestamp(v) => Value::Timestamp(TimeUnit::Microsecond, v.unix_micros()),
        })
        .collect()
}

fn as_sql(values: &[Value]) -> Vec<&dyn duckdb::ToSql> {
    values.iter().map(|v| v as &dyn duckdb::ToSql).collect()
}

/// Narrow to `Integer` when the value fits, else keep the digits.
fn wide_integer<T>(v: T) -> DbValue
where
    T: TryInto<i64> + ToString + Copy,
{
    v.try_into()
        .map(DbValue::Integer)
        .unwrap_or_else(|_| DbValue::Text(v.to_string()))
}

fn micros(unit: TimeUnit, v: i64) -> i64 {
    match unit {
        TimeUnit::Second => v.saturating_mul(1_000_000),
        TimeUnit::Millisecond => v.saturating_mul(1_000),
        TimeUnit::Microsecond => v,
        TimeUnit::Nanosecond => v / 1_000,
    }
}

fn read_column(row: &duckdb::Row<'_>, index: usize) -> Result<DbValue, duckdb::Error> {
    let value = match row.get_ref(index)? {
        ValueRef::Null => DbValue::Null,
        ValueRef::Boolean(v) => DbValue::Boolean(v),
        ValueRef::TinyInt(v) => DbValue::Integer(i64::from(v)),
        ValueRef::SmallInt(v) => DbValue::Integer(i64::from(v)),
        ValueRef::Int(v) => DbValue::Integer(i64::from(v)),
        ValueRef::BigInt(v) => DbValue::Integer(v),
        ValueRef::UTinyInt(v) => DbValue::Integer(i64::from(v)),
        ValueRef::USmallInt(v) => DbValue::Integer(i64::from(v)),
        ValueRef::UInt(v) => DbValue::Integer(i64::from(v)),
        ValueRef::UBigInt(v) => wide_integer(v),
        ValueRef::HugeInt(v) => wide_integer(v),
        ValueRef::Float(v) => DbValue::Real(f64::from(v)),
        ValueRef::Double(v) => DbValue::Real(v),
        ValueRef::Text(bytes) => text_column(bytes),
        ValueRef::Blob(bytes) => DbValue::Blob(bytes.to_vec()),
        ValueRef::Timestamp(unit, v) => {
            let us = micros(unit, v);
            DbTimestamp::from_unix_micros(us)
                .map(DbValue::Timestamp)
                .unwrap_or(DbValue::Integer(us))
        }
        ValueRef::Date32(days) => {
            match chrono::NaiveDate::from_num_days_from_ce_opt(UNIX_EPOCH_CE_DAYS + days) {
                Some(date) => DbValue::Text(date.format("%Y-%m-%d").to_string()),
                None => DbValue::Integer(i64::from(days)),
            }
        }
        other => {
            let text = format!("{:?}", other);
            warn!(column = index, value = %text, "unmapped DuckDB type read as text");
            DbValue::Text(text)
        }
    };
    Ok(value)
}

impl Connection for DuckDbConnection {
    fn execute(&self, sql: &str, params: &[DbValue]) -> Result<u64, ConnectionError> {
        StatementSpan::exec(sql).run(|| {
            let values = bind(params);
            let affected = self.conn.prepare(sql)?.execute(as_sql(&values).as_slice())?;
            Ok(affected as u64)
        })
    }

    fn query(&self, sql: &str, params: &[DbValue]) -> Result<Vec<DbRow>, ConnectionError> {
        StatementSpan::query(sql).run(|| {
            let values = bind(params);
            let mut stmt = self.conn.prepare(sql)?;
            let mut rows = stmt.query(as_sql(&values).as_slice())?;

            // Column metadata is only available once the statement has run.
            let columns = match rows.as_ref() {
                Some(executed) => executed.column_names(),
                None => return Ok(Vec::new()),
            };

            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let values = (0..columns.len())
                    .map(|i| read_column(row, i))
                    .collect::<Result<Vec<_>, _>>()?;
                out.push(DbRow::new(columns.clone(), values));
            }
            Ok(out)
        })
    }

    fn last_insert_id(&self) -> Option<i64> {
        None
    }

    fn execute_batch(&self, sql: &str) -> Result<(), ConnectionError> {
        StatementSpan::batch(sql).run(|| Ok(self.conn.execute_batch(sql)?))
    }
}
