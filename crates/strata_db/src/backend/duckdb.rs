//! DuckDB backend.
//!
//! Every host type has a native DuckDB column type, including unsigned
//! integers, so the transform set is empty. DuckDB has no auto-increment
//! columns; keys must be declared `primary_key=natural`.

use super::{
    column_options, native_in, native_out, AutoIncrement, Constraints, NamingPolicy,
    PlaceholderPolicy, RowScanner, StatementExecutor, TransformSet, TypeResolver, WriteResult,
};
use crate::connection::Connection;
use crate::error::{Result, ScanError};
use crate::model::{Field, FieldType, HostKind, Model};
use crate::value::{DbValue, HostValue};

const NAME: &str = "duckdb";

#[derive(Debug, Clone, Copy, Default)]
pub struct DuckDbBackend;

impl NamingPolicy for DuckDbBackend {
    fn name(&self) -> &'static str {
        NAME
    }
}

impl PlaceholderPolicy for DuckDbBackend {
    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }
}

impl TypeResolver for DuckDbBackend {
    fn field_type(&self, field: &Field) -> Result<String> {
        let sql_type = match field.ty() {
            FieldType::Bool => "BOOLEAN",
            FieldType::I8 => "TINYINT",
            FieldType::I16 => "SMALLINT",
            FieldType::I32 => "INTEGER",
            FieldType::I64 => "BIGINT",
            FieldType::U8 => "UTINYINT",
            FieldType::U16 => "USMALLINT",
            FieldType::U32 => "UINTEGER",
            FieldType::U64 => "UBIGINT",
            FieldType::F32 => "FLOAT",
            FieldType::F64 => "DOUBLE",
            FieldType::String => {
                // Lengths are accepted but not enforced by DuckDB.
                Constraints::from_field(NAME, field)?;
                "VARCHAR"
            }
            FieldType::Bytes => "BLOB",
            FieldType::Timestamp => "TIMESTAMP",
            FieldType::Custom(name) => return self.custom_column_type(field, name),
        };
        Ok(sql_type.to_string())
    }

    fn field_options(&self, field: &Field) -> Result<Vec<String>> {
        column_options(NAME, field, AutoIncrement::Unsupported)
    }

    fn custom_types(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("json", "JSON"),
            ("uuid", "UUID"),
            ("decimal", "DECIMAL(38,10)"),
        ]
    }
}

impl TransformSet for DuckDbBackend {
    fn transforms(&self) -> &'static [HostKind] {
        &[]
    }

    fn transform_out(&self, field: &Field, value: &HostValue) -> Result<DbValue> {
        native_out(NAME, field, value)
    }

    fn transform_in(
        &self,
        field: &Field,
        raw: &DbValue,
        slot: &mut HostValue,
    ) -> std::result::Result<(), ScanError> {
        *slot = native_in(NAME, field, raw)?;
        Ok(())
    }
}

impl RowScanner for DuckDbBackend {}

impl StatementExecutor for DuckDbBackend {
    /// DuckDB reports no generated ids.
    fn insert(
        &self,
        conn: &dyn Connection,
        model: &Model,
        sql: &str,
        args: &[DbValue],
    ) -> Result<WriteResult> {
        self.execute(conn, model, sql, args)
    }
}
