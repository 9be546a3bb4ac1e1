//! The backend contract.
//!
//! A backend is a stateless strategy object for one SQL engine. It is split
//! into capability traits, one per concern:
//!
//! - [`NamingPolicy`]: engine name, identifier quoting, parameter limits
//! - [`PlaceholderPolicy`]: `?` or `$n` parameter markers
//! - [`TypeResolver`]: host field type + tag -> column type and options
//! - [`TransformSet`]: host kinds stored non-natively, with both conversions
//! - [`RowScanner`]: raw driver values -> host values
//! - [`StatementExecutor`]: INSERT/UPDATE/DELETE returning a [`WriteResult`]
//!
//! Anything implementing all of them (and `Send + Sync`) is a [`Backend`]
//! through a blanket impl, so a new engine is one type with a handful of
//! trait impls.

mod duckdb;
mod mysql;
mod postgres;
mod sqlite;

pub use self::duckdb::DuckDbBackend;
pub use self::mysql::MySqlBackend;
pub use self::postgres::PostgresBackend;
pub use self::sqlite::SqliteBackend;

use crate::connection::Connection;
use crate::error::{BackendError, Result, ScanError};
use crate::model::{Field, FieldType, HostKind, Model};
use crate::tag::{keys, InvalidTagValue, PrimaryKey};
use crate::value::{DbRow, DbTimestamp, DbValue, HostValue};

/// Default maximum number of bound parameters per statement.
pub const DEFAULT_MAX_PARAMS: usize = 65_535;

/// Outcome of a write statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteResult {
    /// Identifier generated by the statement, if the engine reports one.
    pub last_insert_id: Option<i64>,
    pub rows_affected: u64,
}

/// Resolved column definition for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub sql_type: String,
    pub options: Vec<String>,
}

/// Engine identity and SQL lexical rules.
pub trait NamingPolicy {
    /// Registry key, e.g. `sqlite`.
    fn name(&self) -> &'static str;

    /// Quote an identifier (table or column name).
    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Largest number of parameters one statement may bind.
    fn max_params(&self) -> usize {
        DEFAULT_MAX_PARAMS
    }
}

/// Parameter marker syntax.
pub trait PlaceholderPolicy {
    /// Marker for the 1-indexed parameter `position`.
    fn placeholder(&self, position: usize) -> String;

    /// Markers for `count` parameters joined with `", "`.
    fn placeholders(&self, count: usize) -> String {
        (1..=count)
            .map(|position| self.placeholder(position))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Maps host field types and tags to engine column definitions.
pub trait TypeResolver: NamingPolicy {
    /// Column type name, e.g. `INTEGER` or `VARCHAR(64)`.
    fn field_type(&self, field: &Field) -> Result<String>;

    /// Ordered column option keywords, e.g. `["PRIMARY KEY", "AUTOINCREMENT"]`.
    fn field_options(&self, field: &Field) -> Result<Vec<String>>;

    /// Custom host types this engine stores, as `(type name, column type)`.
    fn custom_types(&self) -> &'static [(&'static str, &'static str)] {
        &[]
    }

    /// Column type of a custom field, or `UnsupportedType`.
    fn custom_column_type(&self, field: &Field, type_name: &str) -> Result<String> {
        self.custom_types()
            .iter()
            .find(|(name, _)| *name == type_name)
            .map(|(_, sql_type)| sql_type.to_string())
            .ok_or_else(|| BackendError::unsupported_type(self.name(), field.name(), type_name))
    }

    fn resolve(&self, field: &Field) -> Result<ColumnSpec> {
        Ok(ColumnSpec {
            name: field.column_name().to_string(),
            sql_type: self.field_type(field)?,
            options: self.field_options(field)?,
        })
    }
}

/// Host type kinds an engine cannot store natively, with their conversions.
///
/// Every kind listed by [`transforms`](TransformSet::transforms) must be
/// handled by both `transform_out` and `transform_in`, and
/// `transform_in(transform_out(v)) == v` for every value the engine can
/// represent.
pub trait TransformSet: NamingPolicy {
    fn transforms(&self) -> &'static [HostKind];

    fn needs_transform(&self, kind: HostKind) -> bool {
        self.transforms().contains(&kind)
    }

    /// Convert a non-null host value of a transformed kind to its stored form.
    fn transform_out(&self, field: &Field, value: &HostValue) -> Result<DbValue>;

    /// Convert a stored value of a transformed kind back into `slot`.
    fn transform_in(
        &self,
        field: &Field,
        raw: &DbValue,
        slot: &mut HostValue,
    ) -> std::result::Result<(), ScanError>;

    /// Bind a host value for `field`, applying the transform if needed.
    ///
    /// NULL binds as NULL for nullable fields and is rejected otherwise.
    fn to_db_value(&self, field: &Field, value: &HostValue) -> Result<DbValue> {
        if value.is_null() {
            if field.is_nullable() {
                return Ok(DbValue::Null);
            }
            return Err(BackendError::transform(
                self.name(),
                field.name(),
                "NULL for a non-nullable field",
            ));
        }
        if self.needs_transform(field.ty().kind()) {
            self.transform_out(field, value)
        } else {
            native_out(self.name(), field, value)
        }
    }

    /// Convert a non-null raw value for `field`, applying the inverse
    /// transform if needed.
    fn to_host_value(
        &self,
        field: &Field,
        raw: &DbValue,
        slot: &mut HostValue,
    ) -> std::result::Result<(), ScanError> {
        if self.needs_transform(field.ty().kind()) {
            self.transform_in(field, raw, slot)
        } else {
            *slot = native_in(self.name(), field, raw)?;
            Ok(())
        }
    }
}

/// Converts raw driver values into host values.
///
/// Each `scan_*` entry point defaults to [`TransformSet::to_host_value`];
/// engines override the ones where their drivers return unusual shapes.
pub trait RowScanner: TransformSet {
    /// Scan one column into `slot`, dispatching on the declared type.
    ///
    /// NULL never reaches a conversion: nullable fields become
    /// `HostValue::Null` and non-nullable fields their type's zero value.
    fn scan_field(
        &self,
        field: &Field,
        raw: &DbValue,
        slot: &mut HostValue,
    ) -> std::result::Result<(), ScanError> {
        if raw.is_null() {
            *slot = if field.is_nullable() {
                HostValue::Null
            } else {
                field.ty().zero_value()
            };
            return Ok(());
        }
        match field.ty().kind() {
            HostKind::Boolean => self.scan_bool(field, raw, slot),
            HostKind::Integer => self.scan_int(field, raw, slot),
            HostKind::Unsigned => self.scan_uint(field, raw, slot),
            HostKind::Float => self.scan_float(field, raw, slot),
            HostKind::String => self.scan_string(field, raw, slot),
            HostKind::Bytes => self.scan_bytes(field, raw, slot),
            HostKind::Timestamp => self.scan_timestamp(field, raw, slot),
            HostKind::Custom => self.scan_custom(field, raw, slot),
        }
    }

    fn scan_int(
        &self,
        field: &Field,
        raw: &DbValue,
        slot: &mut HostValue,
    ) -> std::result::Result<(), ScanError> {
        self.to_host_value(field, raw, slot)
    }

    fn scan_uint(
        &self,
        field: &Field,
        raw: &DbValue,
        slot: &mut HostValue,
    ) -> std::result::Result<(), ScanError> {
        self.to_host_value(field, raw, slot)
    }

    fn scan_float(
        &self,
        field: &Field,
        raw: &DbValue,
        slot: &mut HostValue,
    ) -> std::result::Result<(), ScanError> {
        self.to_host_value(field, raw, slot)
    }

    fn scan_bool(
        &self,
        field: &Field,
        raw: &DbValue,
        slot: &mut HostValue,
    ) -> std::result::Result<(), ScanError> {
        self.to_host_value(field, raw, slot)
    }

    fn scan_bytes(
        &self,
        field: &Field,
        raw: &DbValue,
        slot: &mut HostValue,
    ) -> std::result::Result<(), ScanError> {
        self.to_host_value(field, raw, slot)
    }

    fn scan_string(
        &self,
        field: &Field,
        raw: &DbValue,
        slot: &mut HostValue,
    ) -> std::result::Result<(), ScanError> {
        self.to_host_value(field, raw, slot)
    }

    fn scan_timestamp(
        &self,
        field: &Field,
        raw: &DbValue,
        slot: &mut HostValue,
    ) -> std::result::Result<(), ScanError> {
        self.to_host_value(field, raw, slot)
    }

    fn scan_custom(
        &self,
        field: &Field,
        raw: &DbValue,
        slot: &mut HostValue,
    ) -> std::result::Result<(), ScanError> {
        self.to_host_value(field, raw, slot)
    }
}

/// Runs write statements and normalizes their outcome.
pub trait StatementExecutor: NamingPolicy {
    /// Run an INSERT. The default executes it and asks the driver for the
    /// last inserted id.
    fn insert(
        &self,
        conn: &dyn Connection,
        _model: &Model,
        sql: &str,
        args: &[DbValue],
    ) -> Result<WriteResult> {
        let rows_affected = run_exec(self.name(), conn, sql, args)?;
        Ok(WriteResult {
            last_insert_id: conn.last_insert_id(),
            rows_affected,
        })
    }

    /// Run an UPDATE or DELETE.
    fn execute(
        &self,
        conn: &dyn Connection,
        _model: &Model,
        sql: &str,
        args: &[DbValue],
    ) -> Result<WriteResult> {
        let rows_affected = run_exec(self.name(), conn, sql, args)?;
        Ok(WriteResult {
            last_insert_id: None,
            rows_affected,
        })
    }

    /// Tail of an INSERT that binds no columns.
    fn empty_insert_sql(&self) -> &'static str {
        "DEFAULT VALUES"
    }
}

/// A complete engine strategy.
pub trait Backend:
    TypeResolver + PlaceholderPolicy + RowScanner + StatementExecutor + Send + Sync
{
}

impl<T> Backend for T where
    T: TypeResolver + PlaceholderPolicy + RowScanner + StatementExecutor + Send + Sync
{
}

impl std::fmt::Debug for dyn Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").field("name", &self.name()).finish()
    }
}

pub(crate) fn run_exec(
    backend: &'static str,
    conn: &dyn Connection,
    sql: &str,
    args: &[DbValue],
) -> Result<u64> {
    conn.execute(sql, args)
        .map_err(|source| BackendError::statement(backend, sql, source))
}

pub(crate) fn run_query(
    backend: &'static str,
    conn: &dyn Connection,
    sql: &str,
    args: &[DbValue],
) -> Result<Vec<DbRow>> {
    conn.query(sql, args)
        .map_err(|source| BackendError::statement(backend, sql, source))
}

// ---------------------------------------------------------------------------
// Native conversions shared by all engines
// ---------------------------------------------------------------------------

fn mismatch(backend: &'static str, field: &Field, value: &HostValue) -> BackendError {
    BackendError::transform(
        backend,
        field.name(),
        format!("expected {} value, got {}", field.ty(), value.kind_name()),
    )
}

/// Bind a non-null host value in its natural database shape.
///
/// Integers are range checked against the declared width. Unsigned values
/// above `i64::MAX` bind as decimal text.
pub fn native_out(backend: &'static str, field: &Field, value: &HostValue) -> Result<DbValue> {
    let ty = field.ty();
    match ty.kind() {
        HostKind::Boolean => match value {
            HostValue::Bool(b) => Ok(DbValue::Boolean(*b)),
            other => Err(mismatch(backend, field, other)),
        },
        HostKind::Integer => {
            let v = match value {
                HostValue::Int(v) => *v,
                HostValue::UInt(v) => i64::try_from(*v)
                    .map_err(|_| out_of_range(backend, field, v))?,
                other => return Err(mismatch(backend, field, other)),
            };
            match ty.signed_range() {
                Some((min, max)) if v < min || v > max => Err(out_of_range(backend, field, &v)),
                _ => Ok(DbValue::Integer(v)),
            }
        }
        HostKind::Unsigned => {
            let v = host_unsigned(backend, field, value)?;
            match i64::try_from(v) {
                Ok(small) => Ok(DbValue::Integer(small)),
                Err(_) => Ok(DbValue::Text(v.to_string())),
            }
        }
        HostKind::Float => match value {
            HostValue::Float(v) => Ok(DbValue::Real(*v)),
            HostValue::Int(v) => Ok(DbValue::Real(*v as f64)),
            other => Err(mismatch(backend, field, other)),
        },
        HostKind::String => match value {
            HostValue::String(s) => {
                check_max_length(backend, field, s)?;
                Ok(DbValue::Text(s.clone()))
            }
            other => Err(mismatch(backend, field, other)),
        },
        HostKind::Bytes => match value {
            HostValue::Bytes(b) => Ok(DbValue::Blob(b.clone())),
            other => Err(mismatch(backend, field, other)),
        },
        HostKind::Timestamp => match value {
            HostValue::Timestamp(ts) => Ok(DbValue::Timestamp(ts.clone())),
            other => Err(mismatch(backend, field, other)),
        },
        HostKind::Custom => custom_text(backend, field, value).map(DbValue::Text),
    }
}

/// Convert a non-null raw value in its natural shape into a host value.
pub fn native_in(
    backend: &'static str,
    field: &Field,
    raw: &DbValue,
) -> std::result::Result<HostValue, ScanError> {
    let ty = field.ty();
    let scan_err = || ScanError::new(backend, field.name(), ty.to_string(), raw.describe());
    match (ty.kind(), raw) {
        (HostKind::Boolean, DbValue::Boolean(b)) => Ok(HostValue::Bool(*b)),
        (HostKind::Boolean, DbValue::Integer(0)) => Ok(HostValue::Bool(false)),
        (HostKind::Boolean, DbValue::Integer(1)) => Ok(HostValue::Bool(true)),

        (HostKind::Integer, DbValue::Integer(v)) => match ty.signed_range() {
            Some((min, max)) if *v < min || *v > max => Err(scan_err()),
            _ => Ok(HostValue::Int(*v)),
        },

        (HostKind::Unsigned, _) => raw_unsigned(ty, raw).map(HostValue::UInt).ok_or_else(scan_err),

        (HostKind::Float, DbValue::Real(v)) => Ok(HostValue::Float(*v)),
        (HostKind::Float, DbValue::Integer(v)) => Ok(HostValue::Float(*v as f64)),

        (HostKind::String, DbValue::Text(s)) => Ok(HostValue::String(s.clone())),
        (HostKind::String, DbValue::Blob(b)) => String::from_utf8(b.clone())
            .map(HostValue::String)
            .map_err(|_| scan_err()),

        (HostKind::Bytes, DbValue::Blob(b)) => Ok(HostValue::Bytes(b.clone())),
        (HostKind::Bytes, DbValue::Text(s)) => Ok(HostValue::Bytes(s.clone().into_bytes())),

        (HostKind::Timestamp, DbValue::Timestamp(ts)) => Ok(HostValue::Timestamp(ts.clone())),
        (HostKind::Timestamp, DbValue::Text(s)) => DbTimestamp::from_rfc3339(s)
            .map(HostValue::Timestamp)
            .map_err(|_| scan_err()),

        (HostKind::Custom, DbValue::Text(s)) => Ok(HostValue::custom(ty.as_str(), s.clone())),
        (HostKind::Custom, DbValue::Blob(b)) => String::from_utf8(b.clone())
            .map(|text| HostValue::custom(ty.as_str(), text))
            .map_err(|_| scan_err()),

        _ => Err(scan_err()),
    }
}

fn out_of_range(backend: &'static str, field: &Field, value: &dyn std::fmt::Display) -> BackendError {
    BackendError::transform(
        backend,
        field.name(),
        format!("{} is out of range for {}", value, field.ty()),
    )
}

/// Host value of an unsigned field, range checked against its width.
pub(crate) fn host_unsigned(backend: &'static str, field: &Field, value: &HostValue) -> Result<u64> {
    let v = match value {
        HostValue::UInt(v) => *v,
        HostValue::Int(v) => u64::try_from(*v).map_err(|_| out_of_range(backend, field, v))?,
        other => return Err(mismatch(backend, field, other)),
    };
    match field.ty().unsigned_max() {
        Some(max) if v > max => Err(out_of_range(backend, field, &v)),
        _ => Ok(v),
    }
}

/// Raw integer or decimal text as an unsigned value within the type's width.
pub(crate) fn raw_unsigned(ty: &FieldType, raw: &DbValue) -> Option<u64> {
    let v = match raw {
        DbValue::Integer(v) => u64::try_from(*v).ok()?,
        DbValue::Text(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    match ty.unsigned_max() {
        Some(max) if v > max => None,
        _ => Some(v),
    }
}

fn custom_text(backend: &'static str, field: &Field, value: &HostValue) -> Result<String> {
    match value {
        HostValue::Custom { type_name, text } if type_name == field.ty().as_str() => {
            Ok(text.clone())
        }
        HostValue::String(text) => Ok(text.clone()),
        other => Err(mismatch(backend, field, other)),
    }
}

fn check_max_length(backend: &'static str, field: &Field, s: &str) -> Result<()> {
    if let Ok(Some(max)) = field.tag().max_length() {
        let len = s.chars().count();
        if len > max {
            return Err(BackendError::transform(
                backend,
                field.name(),
                format!("{} characters exceed max_length {}", len, max),
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Column options shared by all engines
// ---------------------------------------------------------------------------

/// How an engine spells an auto-increment primary key.
#[derive(Debug, Clone, Copy)]
pub(crate) enum AutoIncrement {
    /// Keywords appended after `PRIMARY KEY`.
    Keywords(&'static [&'static str]),
    /// The column type itself carries the sequence (`SERIAL`).
    SerialType,
    /// No auto-increment columns.
    Unsupported,
}

/// Validated tag constraints of one field.
#[derive(Debug, Clone, Default)]
pub(crate) struct Constraints {
    pub primary_key: Option<PrimaryKey>,
    pub auto_increment: bool,
    pub not_null: bool,
    pub unique: bool,
    pub max_length: Option<usize>,
    pub default: Option<String>,
}

impl Constraints {
    pub fn from_field(backend: &'static str, field: &Field) -> Result<Self> {
        let tag = field.tag();
        let invalid = |e: InvalidTagValue| {
            BackendError::invalid_tag(backend, field.name(), e.key, e.to_string())
        };

        let primary_key = tag.primary_key().map_err(invalid)?;
        let explicit_auto = tag.flag(keys::AUTO_INCREMENT).map_err(invalid)?;
        let not_null = tag.flag(keys::NOT_NULL).map_err(invalid)?;
        let unique = tag.flag(keys::UNIQUE).map_err(invalid)?;
        let max_length = tag.max_length().map_err(invalid)?;

        match (explicit_auto, primary_key) {
            (true, None) => {
                return Err(BackendError::invalid_tag(
                    backend,
                    field.name(),
                    keys::AUTO_INCREMENT,
                    "requires primary_key",
                ))
            }
            (true, Some(PrimaryKey::Natural)) => {
                return Err(BackendError::invalid_tag(
                    backend,
                    field.name(),
                    keys::AUTO_INCREMENT,
                    "conflicts with primary_key=natural",
                ))
            }
            _ => {}
        }

        let auto_increment = explicit_auto || primary_key == Some(PrimaryKey::Auto);
        if auto_increment && !field.ty().is_integer() {
            let key = if explicit_auto {
                keys::AUTO_INCREMENT
            } else {
                keys::PRIMARY_KEY
            };
            return Err(BackendError::invalid_tag(
                backend,
                field.name(),
                key,
                format!(
                    "auto-increment needs an integer field, found {} (use primary_key=natural)",
                    field.ty()
                ),
            ));
        }

        if max_length.is_some() && field.ty().kind() != HostKind::String {
            return Err(BackendError::invalid_tag(
                backend,
                field.name(),
                keys::MAX_LENGTH,
                format!("only valid on string fields, found {}", field.ty()),
            ));
        }

        let default = if tag.has(keys::DEFAULT) {
            match tag.value(keys::DEFAULT) {
                Some(literal) if !literal.is_empty() => Some(literal.to_string()),
                _ => {
                    return Err(BackendError::invalid_tag(
                        backend,
                        field.name(),
                        keys::DEFAULT,
                        "requires a SQL literal value",
                    ))
                }
            }
        } else {
            None
        };

        Ok(Self {
            primary_key,
            auto_increment,
            not_null,
            unique,
            max_length,
            default,
        })
    }

    /// Column is a key or otherwise indexed, so sized types are required on
    /// engines that cannot index unbounded text.
    pub fn is_indexed(&self) -> bool {
        self.primary_key.is_some() || self.unique
    }
}

/// Ordered column option keywords for `field`.
pub(crate) fn column_options(
    backend: &'static str,
    field: &Field,
    auto: AutoIncrement,
) -> Result<Vec<String>> {
    let constraints = Constraints::from_field(backend, field)?;
    let mut options = Vec::new();

    if constraints.primary_key.is_some() {
        options.push("PRIMARY KEY".to_string());
        if constraints.auto_increment {
            match auto {
                AutoIncrement::Keywords(words) => {
                    options.extend(words.iter().map(|w| w.to_string()))
                }
                AutoIncrement::SerialType => {}
                AutoIncrement::Unsupported => {
                    return Err(BackendError::invalid_tag(
                        backend,
                        field.name(),
                        keys::PRIMARY_KEY,
                        "engine has no auto-increment columns (use primary_key=natural)",
                    ))
                }
            }
        }
    } else {
        if constraints.not_null || !field.is_nullable() {
            options.push("NOT NULL".to_string());
        }
        if constraints.unique {
            options.push("UNIQUE".to_string());
        }
    }

    if let Some(literal) = constraints.default {
        options.push(format!("DEFAULT {}", literal));
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::Tag;

    fn field(name: &str, ty: FieldType, tag: &str) -> Field {
        Field::new(name, ty).with_tag(Tag::parse(tag).unwrap())
    }

    #[test]
    fn options_for_plain_and_nullable_fields() {
        let opts = column_options("test", &field("a", FieldType::I32, ""), AutoIncrement::Unsupported)
            .unwrap();
        assert_eq!(opts, vec!["NOT NULL"]);

        let nullable = Field::new("b", FieldType::String).nullable();
        let opts = column_options("test", &nullable, AutoIncrement::Unsupported).unwrap();
        assert!(opts.is_empty());
    }

    #[test]
    fn options_order_unique_then_default() {
        let f = field("c", FieldType::String, "unique,default='x'");
        let opts = column_options("test", &f, AutoIncrement::Unsupported).unwrap();
        assert_eq!(opts, vec!["NOT NULL", "UNIQUE", "DEFAULT 'x'"]);
    }

    #[test]
    fn auto_increment_requires_primary_key() {
        let f = field("id", FieldType::I64, "auto_increment");
        let err = Constraints::from_field("test", &f).unwrap_err();
        assert!(matches!(err, BackendError::InvalidTag { ref key, .. } if key == "auto_increment"));
    }

    #[test]
    fn natural_key_on_text_is_allowed() {
        let f = field("code", FieldType::String, "primary_key=natural");
        let opts = column_options("test", &f, AutoIncrement::Keywords(&["AUTOINCREMENT"])).unwrap();
        assert_eq!(opts, vec!["PRIMARY KEY"]);
    }

    #[test]
    fn default_needs_a_value() {
        let f = field("n", FieldType::I32, "default");
        assert!(Constraints::from_field("test", &f).is_err());
    }

    #[test]
    fn native_out_checks_integer_width() {
        let f = Field::new("small", FieldType::I8);
        assert_eq!(
            native_out("test", &f, &HostValue::Int(127)).unwrap(),
            DbValue::Integer(127)
        );
        assert!(native_out("test", &f, &HostValue::Int(128)).is_err());
        assert!(native_out("test", &f, &HostValue::String("1".into())).is_err());
    }

    #[test]
    fn native_out_large_unsigned_as_text() {
        let f = Field::new("big", FieldType::U64);
        assert_eq!(
            native_out("test", &f, &HostValue::UInt(u64::MAX)).unwrap(),
            DbValue::Text(u64::MAX.to_string())
        );
        assert_eq!(
            native_in("test", &f, &DbValue::Text(u64::MAX.to_string())).unwrap(),
            HostValue::UInt(u64::MAX)
        );
    }

    #[test]
    fn native_out_enforces_max_length() {
        let f = field("name", FieldType::String, "max_length=3");
        assert!(native_out("test", &f, &HostValue::from("abc")).is_ok());
        assert!(native_out("test", &f, &HostValue::from("abcd")).is_err());
    }

    #[test]
    fn native_in_rejects_wrong_shapes() {
        let f = Field::new("n", FieldType::U8);
        let err = native_in("test", &f, &DbValue::Integer(256)).unwrap_err();
        assert_eq!(err.field, "n");
        assert_eq!(err.expected, "u8");
        assert!(native_in("test", &f, &DbValue::Integer(-1)).is_err());
        assert!(native_in("test", &Field::new("s", FieldType::String), &DbValue::Integer(1)).is_err());
    }

    #[test]
    fn native_in_custom_keeps_type_name() {
        let f = Field::new("doc", FieldType::Custom("json".into()));
        assert_eq!(
            native_in("test", &f, &DbValue::Text("{}".into())).unwrap(),
            HostValue::custom("json", "{}")
        );
    }
}
