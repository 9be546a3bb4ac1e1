//! MySQL backend.
//!
//! Booleans are TINYINT(1) and read back leniently: any nonzero integer is
//! `true`, matching MySQL's own truthiness. Timestamps are DATETIME(6) in
//! UTC; drivers commonly return them as `YYYY-MM-DD HH:MM:SS[.ffffff]` text.

use super::{
    column_options, native_out, AutoIncrement, Constraints, NamingPolicy, PlaceholderPolicy,
    RowScanner, StatementExecutor, TransformSet, TypeResolver,
};
use crate::error::{BackendError, Result, ScanError};
use crate::model::{Field, FieldType, HostKind};
use crate::value::{DbTimestamp, DbValue, HostValue};

const NAME: &str = "mysql";

/// Length used for indexed strings without a declared `max_length`.
const INDEXED_VARCHAR_LEN: usize = 255;

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlBackend;

impl NamingPolicy for MySqlBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }
}

impl PlaceholderPolicy for MySqlBackend {
    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }
}

impl TypeResolver for MySqlBackend {
    fn field_type(&self, field: &Field) -> Result<String> {
        let sql_type = match field.ty() {
            FieldType::Bool => "TINYINT(1)",
            FieldType::I8 => "TINYINT",
            FieldType::I16 => "SMALLINT",
            FieldType::I32 => "INT",
            FieldType::I64 => "BIGINT",
            FieldType::U8 => "TINYINT UNSIGNED",
            FieldType::U16 => "SMALLINT UNSIGNED",
            FieldType::U32 => "INT UNSIGNED",
            FieldType::U64 => "BIGINT UNSIGNED",
            FieldType::F32 => "FLOAT",
            FieldType::F64 => "DOUBLE",
            FieldType::String => {
                // TEXT columns cannot be keys without a prefix length.
                let constraints = Constraints::from_field(NAME, field)?;
                return Ok(match constraints.max_length {
                    Some(n) => format!("VARCHAR({})", n),
                    None if constraints.is_indexed() => {
                        format!("VARCHAR({})", INDEXED_VARCHAR_LEN)
                    }
                    None => "TEXT".to_string(),
                });
            }
            FieldType::Bytes => {
                let constraints = Constraints::from_field(NAME, field)?;
                if constraints.is_indexed() {
                    return Ok(format!("VARBINARY({})", INDEXED_VARCHAR_LEN));
                }
                "BLOB"
            }
            FieldType::Timestamp => "DATETIME(6)",
            FieldType::Custom(name) => return self.custom_column_type(field, name),
        };
        Ok(sql_type.to_string())
    }

    fn field_options(&self, field: &Field) -> Result<Vec<String>> {
        column_options(NAME, field, AutoIncrement::Keywords(&["AUTO_INCREMENT"]))
    }

    fn custom_types(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("json", "JSON"),
            ("uuid", "CHAR(36)"),
            ("decimal", "DECIMAL(38,10)"),
        ]
    }
}

impl TransformSet for MySqlBackend {
    fn transforms(&self) -> &'static [HostKind] {
        &[HostKind::Boolean]
    }

    fn transform_out(&self, field: &Field, value: &HostValue) -> Result<DbValue> {
        match (field.ty().kind(), value) {
            (HostKind::Boolean, HostValue::Bool(b)) => Ok(DbValue::Integer(i64::from(*b))),
            (HostKind::Boolean, other) => Err(BackendError::transform(
                NAME,
                field.name(),
                format!("expected bool value, got {}", other.kind_name()),
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
        let truth = match raw {
            DbValue::Integer(v) => *v != 0,
            DbValue::Boolean(b) => *b,
            DbValue::Text(s) => match s.trim().parse::<i64>() {
                Ok(v) => v != 0,
                Err(_) => {
                    return Err(ScanError::new(NAME, field.name(), "integer", raw.describe()))
                }
            },
            _ => return Err(ScanError::new(NAME, field.name(), "integer", raw.describe())),
        };
        *slot = HostValue::Bool(truth);
        Ok(())
    }
}

/// Parse a text-protocol column, or report it as a scan error.
fn parse_text<T: std::str::FromStr>(
    field: &Field,
    raw: &DbValue,
    text: &str,
) -> std::result::Result<T, ScanError> {
    text.trim()
        .parse()
        .map_err(|_| ScanError::new(NAME, field.name(), field.ty().to_string(), raw.describe()))
}

impl RowScanner for MySqlBackend {
    /// Width is checked after parsing, as for binary-protocol integers.
    fn scan_int(
        &self,
        field: &Field,
        raw: &DbValue,
        slot: &mut HostValue,
    ) -> std::result::Result<(), ScanError> {
        if let DbValue::Text(s) = raw {
            let v: i64 = parse_text(field, raw, s)?;
            return self.to_host_value(field, &DbValue::Integer(v), slot);
        }
        self.to_host_value(field, raw, slot)
    }

    fn scan_float(
        &self,
        field: &Field,
        raw: &DbValue,
        slot: &mut HostValue,
    ) -> std::result::Result<(), ScanError> {
        if let DbValue::Text(s) = raw {
            let v: f64 = parse_text(field, raw, s)?;
            return self.to_host_value(field, &DbValue::Real(v), slot);
        }
        self.to_host_value(field, raw, slot)
    }

    fn scan_timestamp(
        &self,
        field: &Field,
        raw: &DbValue,
        slot: &mut HostValue,
    ) -> std::result::Result<(), ScanError> {
        if let DbValue::Text(s) = raw {
            let ts = DbTimestamp::from_sql_datetime(s)
                .or_else(|_| DbTimestamp::from_rfc3339(s))
                .map_err(|_| {
                    ScanError::new(NAME, field.name(), "DATETIME text", raw.describe())
                })?;
            *slot = HostValue::Timestamp(ts);
            return Ok(());
        }
        self.to_host_value(field, raw, slot)
    }
}

impl StatementExecutor for MySqlBackend {
    fn empty_insert_sql(&self) -> &'static str {
        "() VALUES ()"
    }
}
