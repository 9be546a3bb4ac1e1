//! Mapping engine.
//!
//! `Mapper` is the higher-level engine the backend contract exists for:
//! it resolves one backend from a registry at construction and then drives
//! DDL, inserts, updates, deletes and scans through the capability traits
//! only, never through engine-specific code.

use std::sync::Arc;

use tracing::{debug, info};

use crate::backend::{
    run_query, Backend, NamingPolicy, PlaceholderPolicy, RowScanner, StatementExecutor,
    TransformSet, TypeResolver, WriteResult,
};
use crate::connection::Connection;
use crate::error::{BackendError, Result};
use crate::model::{Field, Model};
use crate::registry::BackendRegistry;
use crate::value::{DbRow, DbValue, HostValue};

/// One row of host values, in model field order.
pub type Record = Vec<HostValue>;

#[derive(Clone)]
pub struct Mapper {
    backend: Arc<dyn Backend>,
}

impl std::fmt::Debug for Mapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapper")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl Mapper {
    /// Resolve `backend_name` in `registry`.
    pub fn new(registry: &BackendRegistry, backend_name: &str) -> Result<Self> {
        let backend = registry.lookup(backend_name)?;
        info!(backend = backend.name(), "mapper ready");
        Ok(Self { backend })
    }

    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    fn table(&self, model: &Model) -> String {
        self.backend.quote_ident(model.table())
    }

    fn column_list(&self, fields: &[&Field]) -> String {
        fields
            .iter()
            .map(|f| self.backend.quote_ident(f.column_name()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for `model`.
    pub fn create_table_sql(&self, model: &Model) -> Result<String> {
        let mut columns = Vec::with_capacity(model.fields().len());
        for field in model.fields() {
            let spec = self.backend.resolve(field)?;
            let mut column = format!("{} {}", self.backend.quote_ident(&spec.name), spec.sql_type);
            for option in &spec.options {
                column.push(' ');
                column.push_str(option);
            }
            columns.push(column);
        }
        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.table(model),
            columns.join(",\n    ")
        ))
    }

    pub fn create_table(&self, conn: &dyn Connection, model: &Model) -> Result<()> {
        let sql = self.create_table_sql(model)?;
        conn.execute_batch(&sql)
            .map_err(|source| BackendError::statement(self.backend.name(), &sql, source))?;
        info!(backend = self.backend.name(), table = model.table(), "created table");
        Ok(())
    }

    /// Single-row INSERT over the model's insertable fields.
    pub fn insert_sql(&self, model: &Model) -> String {
        let fields = model.insertable_fields();
        if fields.is_empty() {
            return format!(
                "INSERT INTO {} {}",
                self.table(model),
                self.backend.empty_insert_sql()
            );
        }
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table(model),
            self.column_list(&fields),
            self.backend.placeholders(fields.len())
        )
    }

    /// Insert one record. `values` follow `model.insertable_fields()`.
    pub fn insert(
        &self,
        conn: &dyn Connection,
        model: &Model,
        values: &[HostValue],
    ) -> Result<WriteResult> {
        let fields = model.insertable_fields();
        let args = self.bind(model, &fields, values)?;
        let sql = self.insert_sql(model);
        self.backend.insert(conn, model, &sql, &args)
    }

    /// Insert many records with multi-row INSERTs, each statement binding at
    /// most `max_params()` values.
    ///
    /// The returned id is the one reported for the final statement.
    pub fn insert_many(
        &self,
        conn: &dyn Connection,
        model: &Model,
        rows: &[Record],
    ) -> Result<WriteResult> {
        let fields = model.insertable_fields();
        let mut total = WriteResult::default();
        if fields.is_empty() {
            for _ in rows {
                let result = self.insert(conn, model, &[])?;
                total.rows_affected += result.rows_affected;
                total.last_insert_id = result.last_insert_id.or(total.last_insert_id);
            }
            return Ok(total);
        }

        let width = fields.len();
        let max_params = self.backend.max_params();
        if width > max_params {
            return Err(BackendError::TooManyColumns {
                backend: self.backend.name(),
                table: model.table().to_string(),
                columns: width,
                max_params,
            });
        }
        let rows_per_chunk = max_params / width;
        let head = format!(
            "INSERT INTO {} ({}) VALUES ",
            self.table(model),
            self.column_list(&fields)
        );

        for chunk in rows.chunks(rows_per_chunk) {
            let mut args = Vec::with_capacity(chunk.len() * width);
            let mut tuples = Vec::with_capacity(chunk.len());
            for row in chunk {
                let first = args.len();
                args.extend(self.bind(model, &fields, row)?);
                let markers = (first + 1..=first + width)
                    .map(|position| self.backend.placeholder(position))
                    .collect::<Vec<_>>()
                    .join(", ");
                tuples.push(format!("({})", markers));
            }
            let sql = format!("{}{}", head, tuples.join(", "));
            debug!(table = model.table(), rows = chunk.len(), "insert chunk");
            let result = self.backend.insert(conn, model, &sql, &args)?;
            total.rows_affected += result.rows_affected;
            total.last_insert_id = result.last_insert_id.or(total.last_insert_id);
        }
        Ok(total)
    }

    /// Update every non-key field of the row whose primary key is `key`.
    /// `values` follow the model's field order with the key left out.
    pub fn update_by_pk(
        &self,
        conn: &dyn Connection,
        model: &Model,
        key: &HostValue,
        values: &[HostValue],
    ) -> Result<WriteResult> {
        let pk = self.require_pk(model)?;
        let fields: Vec<&Field> = model
            .fields()
            .iter()
            .filter(|f| f.name() != pk.name())
            .collect();
        if fields.is_empty() {
            return Err(BackendError::NothingToUpdate(model.table().to_string()));
        }
        let mut args = self.bind(model, &fields, values)?;
        args.push(self.backend.to_db_value(pk, key)?);

        let assignments = fields
            .iter()
            .enumerate()
            .map(|(i, f)| {
                format!(
                    "{} = {}",
                    self.backend.quote_ident(f.column_name()),
                    self.backend.placeholder(i + 1)
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = {}",
            self.table(model),
            assignments,
            self.backend.quote_ident(pk.column_name()),
            self.backend.placeholder(fields.len() + 1)
        );
        self.backend.execute(conn, model, &sql, &args)
    }

    pub fn delete_by_pk(
        &self,
        conn: &dyn Connection,
        model: &Model,
        key: &HostValue,
    ) -> Result<WriteResult> {
        let pk = self.require_pk(model)?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = {}",
            self.table(model),
            self.backend.quote_ident(pk.column_name()),
            self.backend.placeholder(1)
        );
        let args = [self.backend.to_db_value(pk, key)?];
        self.backend.execute(conn, model, &sql, &args)
    }

    /// SELECT of every field, in model order.
    pub fn select_sql(&self, model: &Model) -> String {
        let fields: Vec<&Field> = model.fields().iter().collect();
        format!(
            "SELECT {} FROM {}",
            self.column_list(&fields),
            self.table(model)
        )
    }

    pub fn select_all(&self, conn: &dyn Connection, model: &Model) -> Result<Vec<Record>> {
        let sql = self.select_sql(model);
        let rows = run_query(self.backend.name(), conn, &sql, &[])?;
        rows.iter().map(|row| self.scan_row(model, row)).collect()
    }

    pub fn find_by_pk(
        &self,
        conn: &dyn Connection,
        model: &Model,
        key: &HostValue,
    ) -> Result<Option<Record>> {
        let pk = self.require_pk(model)?;
        let sql = format!(
            "{} WHERE {} = {}",
            self.select_sql(model),
            self.backend.quote_ident(pk.column_name()),
            self.backend.placeholder(1)
        );
        let args = [self.backend.to_db_value(pk, key)?];
        let rows = run_query(self.backend.name(), conn, &sql, &args)?;
        rows.first().map(|row| self.scan_row(model, row)).transpose()
    }

    /// Scan a row selected with [`select_sql`](Self::select_sql).
    pub fn scan_row(&self, model: &Model, row: &DbRow) -> Result<Record> {
        if row.len() != model.fields().len() {
            return Err(BackendError::Arity {
                table: model.table().to_string(),
                expected: model.fields().len(),
                actual: row.len(),
            });
        }
        let mut record = Vec::with_capacity(row.len());
        for (field, raw) in model.fields().iter().zip(row.values()) {
            let mut slot = HostValue::Null;
            self.backend.scan_field(field, raw, &mut slot)?;
            record.push(slot);
        }
        Ok(record)
    }

    /// Convert host values for `fields` into bind parameters.
    pub fn bind(
        &self,
        model: &Model,
        fields: &[&Field],
        values: &[HostValue],
    ) -> Result<Vec<DbValue>> {
        if fields.len() != values.len() {
            return Err(BackendError::Arity {
                table: model.table().to_string(),
                expected: fields.len(),
                actual: values.len(),
            });
        }
        fields
            .iter()
            .zip(values)
            .map(|(field, value)| self.backend.to_db_value(field, value))
            .collect()
    }

    fn require_pk<'m>(&self, model: &'m Model) -> Result<&'m Field> {
        model
            .primary_key()
            .ok_or_else(|| BackendError::MissingPrimaryKey(model.table().to_string()))
    }
}
