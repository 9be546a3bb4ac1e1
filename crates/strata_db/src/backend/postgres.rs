//! PostgreSQL backend.
//!
//! PostgreSQL has no unsigned integers. Unsigned fields are stored as
//! NUMERIC(20) and bound as decimal text so the full `u64` range survives.
//! It also has no last-insert-id: inserts into a table with an auto key get
//! a `RETURNING` clause and the id is read from the returned row.

use tracing::debug;

use super::{
    column_options, host_unsigned, native_out, raw_unsigned, run_exec, run_query,
    AutoIncrement, Constraints, NamingPolicy, PlaceholderPolicy, RowScanner, StatementExecutor,
    TransformSet, TypeResolver, WriteResult,
};
use crate::connection::Connection;
use crate::error::{BackendError, Result, ScanError};
use crate::model::{Field, FieldType, HostKind, Model};
use crate::tag::keys;
use crate::value::{DbTimestamp, DbValue, HostValue};

const NAME: &str = "postgres";

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresBackend;

impl NamingPolicy for PostgresBackend {
    fn name(&self) -> &'static str {
        NAME
    }
}

impl PlaceholderPolicy for PostgresBackend {
    fn placeholder(&self, position: usize) -> String {
        format!("${}", position)
    }
}

impl TypeResolver for PostgresBackend {
    fn field_type(&self, field: &Field) -> Result<String> {
        let constraints = Constraints::from_field(NAME, field)?;
        if constraints.auto_increment {
            return match field.ty() {
                FieldType::I8 | FieldType::I16 | FieldType::I32 => Ok("SERIAL".to_string()),
                FieldType::I64 => Ok("BIGSERIAL".to_string()),
                other => Err(BackendError::invalid_tag(
                    NAME,
                    field.name(),
                    keys::PRIMARY_KEY,
                    format!("serial keys must be signed integers, found {}", other),
                )),
            };
        }

        let sql_type = match field.ty() {
            FieldType::Bool => "BOOLEAN",
            FieldType::I8 | FieldType::I16 => "SMALLINT",
            FieldType::I32 => "INTEGER",
            FieldType::I64 => "BIGINT",
            FieldType::U8 | FieldType::U16 | FieldType::U32 | FieldType::U64 => "NUMERIC(20)",
            FieldType::F32 => "REAL",
            FieldType::F64 => "DOUBLE PRECISION",
            FieldType::String => {
                return Ok(match constraints.max_length {
                    Some(n) => format!("VARCHAR({})", n),
                    None => "TEXT".to_string(),
                })
            }
            FieldType::Bytes => "BYTEA",
            FieldType::Timestamp => "TIMESTAMPTZ",
            FieldType::Custom(name) => return self.custom_column_type(field, name),
        };
        Ok(sql_type.to_string())
    }

    fn field_options(&self, field: &Field) -> Result<Vec<String>> {
        column_options(NAME, field, AutoIncrement::SerialType)
    }

    fn custom_types(&self) -> &'static [(&'static str, &'static str)] {
        &[("json", "JSONB"), ("uuid", "UUID"), ("decimal", "NUMERIC")]
    }
}

impl TransformSet for PostgresBackend {
    fn transforms(&self) -> &'static [HostKind] {
        &[HostKind::Unsigned]
    }

    fn transform_out(&self, field: &Field, value: &HostValue) -> Result<DbValue> {
        match field.ty().kind() {
            HostKind::Unsigned => {
                host_unsigned(NAME, field, value).map(|v| DbValue::Text(v.to_string()))
            }
            _ => native_out(NAME, field, value),
        }
    }

    fn transform_in(
        &self,
        field: &Field,
        raw: &DbValue,
        slot: &mut HostValue,
    ) -> std::result::Result<(), ScanError> {
        let v = raw_unsigned(field.ty(), raw).ok_or_else(|| {
            ScanError::new(
                NAME,
                field.name(),
                format!("{} as NUMERIC", field.ty()),
                raw.describe(),
            )
        })?;
        *slot = HostValue::UInt(v);
        Ok(())
    }
}

impl RowScanner for PostgresBackend {
    /// Text-protocol drivers return booleans as `t`/`f`.
    fn scan_bool(
        &self,
        field: &Field,
        raw: &DbValue,
        slot: &mut HostValue,
    ) -> std::result::Result<(), ScanError> {
        if let DbValue::Text(s) = raw {
            *slot = match s.as_str() {
                "t" | "true" => HostValue::Bool(true),
                "f" | "false" => HostValue::Bool(false),
                _ => {
                    return Err(ScanError::new(
                        NAME,
                        field.name(),
                        "boolean",
                        raw.describe(),
                    ))
                }
            };
            return Ok(());
        }
        self.to_host_value(field, raw, slot)
    }

    /// Text-protocol TIMESTAMPTZ looks like `2021-01-01 00:00:00+00`.
    fn scan_timestamp(
        &self,
        field: &Field,
        raw: &DbValue,
        slot: &mut HostValue,
    ) -> std::result::Result<(), ScanError> {
        if let DbValue::Text(s) = raw {
            let parsed = chrono::DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z")
                .map(|dt| DbTimestamp::from(dt.with_timezone(&chrono::Utc)))
                .or_else(|_| DbTimestamp::from_rfc3339(s));
            return match parsed {
                Ok(ts) => {
                    *slot = HostValue::Timestamp(ts);
                    Ok(())
                }
                Err(_) => Err(ScanError::new(
                    NAME,
                    field.name(),
                    "TIMESTAMPTZ text",
                    raw.describe(),
                )),
            };
        }
        self.to_host_value(field, raw, slot)
    }
}

impl StatementExecutor for PostgresBackend {
    fn insert(
        &self,
        conn: &dyn Connection,
        model: &Model,
        sql: &str,
        args: &[DbValue],
    ) -> Result<WriteResult> {
        let Some(key) = model.auto_key() else {
            let rows_affected = run_exec(NAME, conn, sql, args)?;
            return Ok(WriteResult {
                last_insert_id: None,
                rows_affected,
            });
        };

        let returning = format!("{} RETURNING {}", sql, self.quote_ident(key.column_name()));
        debug!(table = model.table(), "reading generated key via RETURNING");
        let rows = run_query(NAME, conn, &returning, args)?;
        let last_insert_id = match rows.last() {
            Some(row) => row.get::<Option<i64>>(0).map_err(|_| {
                let found = row
                    .get_raw(0)
                    .map_or_else(|| "no column".to_string(), DbValue::describe);
                ScanError::new(NAME, key.name(), "integer key", found)
            })?,
            None => None,
        };
        Ok(WriteResult {
            last_insert_id,
            rows_affected: rows.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::Tag;

    fn tagged(name: &str, ty: FieldType, tag: &str) -> Field {
        Field::new(name, ty).with_tag(Tag::parse(tag).unwrap())
    }

    #[test]
    fn numbered_placeholders() {
        assert_eq!(PostgresBackend.placeholders(3), "$1, $2, $3");
        assert_eq!(PostgresBackend.placeholder(12), "$12");
        assert_eq!(PostgresBackend.placeholders(0), "");
    }

    #[test]
    fn serial_keys() {
        let id = tagged("id", FieldType::I64, "primary_key");
        assert_eq!(PostgresBackend.field_type(&id).unwrap(), "BIGSERIAL");
        assert_eq!(PostgresBackend.field_options(&id).unwrap(), vec!["PRIMARY KEY"]);

        let small = tagged("id", FieldType::I32, "primary_key");
        assert_eq!(PostgresBackend.field_type(&small).unwrap(), "SERIAL");

        let unsigned = tagged("id", FieldType::U64, "primary_key");
        assert!(matches!(
            PostgresBackend.field_type(&unsigned),
            Err(BackendError::InvalidTag { .. })
        ));

        let natural = tagged("id", FieldType::I64, "primary_key=natural");
        assert_eq!(PostgresBackend.field_type(&natural).unwrap(), "BIGINT");
    }

    #[test]
    fn unsigned_travels_as_numeric_text() {
        let field = Field::new("n", FieldType::U64);
        assert_eq!(
            PostgresBackend
                .to_db_value(&field, &HostValue::UInt(u64::MAX))
                .unwrap(),
            DbValue::Text("18446744073709551615".into())
        );

        let mut slot = HostValue::Null;
        PostgresBackend
            .scan_field(&field, &DbValue::Text("18446744073709551615".into()), &mut slot)
            .unwrap();
        assert_eq!(slot, HostValue::UInt(u64::MAX));

        let narrow = Field::new("n", FieldType::U8);
        assert!(PostgresBackend
            .scan_field(&narrow, &DbValue::Text("256".into()), &mut slot)
            .is_err());
        assert!(PostgresBackend
            .to_db_value(&narrow, &HostValue::UInt(256))
            .is_err());
    }

    #[test]
    fn text_protocol_booleans_and_timestamps() {
        let flag = Field::new("flag", FieldType::Bool);
        let mut slot = HostValue::Null;
        PostgresBackend
            .scan_field(&flag, &DbValue::Text("t".into()), &mut slot)
            .unwrap();
        assert_eq!(slot, HostValue::Bool(true));
        PostgresBackend
            .scan_field(&flag, &DbValue::Boolean(false), &mut slot)
            .unwrap();
        assert_eq!(slot, HostValue::Bool(false));

        let at = Field::new("at", FieldType::Timestamp);
        PostgresBackend
            .scan_field(&at, &DbValue::Text("2021-01-01 01:00:00+01".into()), &mut slot)
            .unwrap();
        assert_eq!(
            slot,
            HostValue::Timestamp(DbTimestamp::from_unix_millis(1_609_459_200_000).unwrap())
        );
    }
}
