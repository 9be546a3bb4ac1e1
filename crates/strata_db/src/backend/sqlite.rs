//! SQLite backend.
//!
//! SQLite has no boolean or timestamp storage class, so both are
//! transformed: booleans are stored as INTEGER 0/1 and timestamps as
//! INTEGER Unix milliseconds. Inbound booleans are strict; any integer other
//! than 0 or 1 is a scan error. Timestamps with sub-millisecond precision
//! are rejected at bind time rather than truncated.
//!
//! INTEGER columns hold at most `i64::MAX`; larger integer text is coerced to
//! REAL by the column affinity. `u64` fields therefore live in TEXT columns as
//! 20-digit zero-padded decimals, which keeps their text order numeric.
//! Auto-increment `u64` keys stay INTEGER and are limited to `i64::MAX`.

use super::{
    column_options, host_unsigned, native_in, native_out, raw_unsigned, AutoIncrement,
    Constraints, NamingPolicy, PlaceholderPolicy, RowScanner, StatementExecutor, TransformSet,
    TypeResolver,
};
use crate::error::{BackendError, Result, ScanError};
use crate::model::{Field, FieldType, HostKind};
use crate::value::{DbTimestamp, DbValue, HostValue};

const NAME: &str = "sqlite";

/// SQLite's default `SQLITE_MAX_VARIABLE_NUMBER` before 3.32.
const SQLITE_MAX_PARAMS: usize = 999;

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteBackend;

impl NamingPolicy for SqliteBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn max_params(&self) -> usize {
        SQLITE_MAX_PARAMS
    }
}

impl PlaceholderPolicy for SqliteBackend {
    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }
}

impl TypeResolver for SqliteBackend {
    fn field_type(&self, field: &Field) -> Result<String> {
        let sql_type = match field.ty() {
            FieldType::Bool
            | FieldType::I8
            | FieldType::I16
            | FieldType::I32
            | FieldType::I64
            | FieldType::U8
            | FieldType::U16
            | FieldType::U32
            | FieldType::Timestamp => "INTEGER",
            FieldType::U64 => {
                if Constraints::from_field(NAME, field)?.auto_increment {
                    "INTEGER"
                } else {
                    "TEXT"
                }
            }
            FieldType::F32 | FieldType::F64 => "REAL",
            FieldType::String => "TEXT",
            FieldType::Bytes => "BLOB",
            FieldType::Custom(name) => return self.custom_column_type(field, name),
        };
        Ok(sql_type.to_string())
    }

    fn field_options(&self, field: &Field) -> Result<Vec<String>> {
        column_options(NAME, field, AutoIncrement::Keywords(&["AUTOINCREMENT"]))
    }

    fn custom_types(&self) -> &'static [(&'static str, &'static str)] {
        &[("json", "TEXT"), ("uuid", "TEXT"), ("decimal", "TEXT")]
    }
}

impl TransformSet for SqliteBackend {
    fn transforms(&self) -> &'static [HostKind] {
        &[HostKind::Boolean, HostKind::Unsigned, HostKind::Timestamp]
    }

    fn transform_out(&self, field: &Field, value: &HostValue) -> Result<DbValue> {
        match (field.ty().kind(), value) {
            (HostKind::Boolean, HostValue::Bool(b)) => Ok(DbValue::Integer(i64::from(*b))),
            (HostKind::Timestamp, HostValue::Timestamp(ts)) => {
                if ts.has_sub_millis() {
                    return Err(BackendError::transform(
                        NAME,
                        field.name(),
                        format!("{} is finer than millisecond precision", ts),
                    ));
                }
                Ok(DbValue::Integer(ts.unix_millis()))
            }
            (HostKind::Unsigned, _) => {
                let v = host_unsigned(NAME, field, value)?;
                if !matches!(field.ty(), FieldType::U64) {
                    return native_out(NAME, field, value);
                }
                if Constraints::from_field(NAME, field)?.auto_increment {
                    return i64::try_from(v).map(DbValue::Integer).map_err(|_| {
                        BackendError::transform(
                            NAME,
                            field.name(),
                            format!("{} exceeds the INTEGER key range", v),
                        )
                    });
                }
                Ok(DbValue::Text(format!("{:020}", v)))
            }
            (HostKind::Boolean | HostKind::Timestamp, other) => Err(BackendError::transform(
                NAME,
                field.name(),
                format!("expected {} value, got {}", field.ty(), other.kind_name()),
            )),
            _ => native_out(NAME, field, value),
        }
    }

    fn transform_in(
        &self,
        field: &Field,
        raw: &DbValue,
        slot: &mut HostValue,
    ) -> std::result::Result<(), ScanError> {
        let scan_err = || ScanError::new(NAME, field.name(), field.ty().to_string(), raw.describe());
        *slot = match (field.ty().kind(), raw) {
            (HostKind::Boolean, DbValue::Integer(0)) => HostValue::Bool(false),
            (HostKind::Boolean, DbValue::Integer(1)) => HostValue::Bool(true),
            (HostKind::Boolean, DbValue::Boolean(b)) => HostValue::Bool(*b),
            (HostKind::Boolean, _) => {
                return Err(ScanError::new(
                    NAME,
                    field.name(),
                    "integer 0 or 1",
                    raw.describe(),
                ))
            }
            (HostKind::Timestamp, DbValue::Integer(ms)) => DbTimestamp::from_unix_millis(*ms)
                .map(HostValue::Timestamp)
                .map_err(|_| scan_err())?,
            // Rows written by SQL (CURRENT_TIMESTAMP) or other tools.
            (HostKind::Timestamp, DbValue::Text(s)) => DbTimestamp::from_rfc3339(s)
                .or_else(|_| DbTimestamp::from_sql_datetime(s))
                .map(HostValue::Timestamp)
                .map_err(|_| scan_err())?,
            (HostKind::Timestamp, DbValue::Timestamp(ts)) => HostValue::Timestamp(ts.clone()),
            (HostKind::Timestamp, _) => return Err(scan_err()),
            (HostKind::Unsigned, _) => raw_unsigned(field.ty(), raw)
                .map(HostValue::UInt)
                .ok_or_else(scan_err)?,
            _ => native_in(NAME, field, raw)?,
        };
        Ok(())
    }
}

impl RowScanner for SqliteBackend {}

impl StatementExecutor for SqliteBackend {}
