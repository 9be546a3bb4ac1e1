//! Value types on both sides of the backend boundary.
//!
//! `DbValue` is what a driver binds and returns (the database primitives).
//! `HostValue` is what a mapped field holds on the application side.

use crate::error::ConnectionError;

/// Timestamp wrapper for database values.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DbTimestamp {
    inner: chrono::DateTime<chrono::Utc>,
}

/// Errors that can occur when parsing or constructing timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbTimestampError {
    message: String,
}

impl DbTimestampError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for DbTimestampError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DbTimestampError {}

impl DbTimestamp {
    /// The Unix epoch, the zero value of timestamp fields.
    pub fn epoch() -> Self {
        Self {
            inner: chrono::DateTime::UNIX_EPOCH,
        }
    }

    /// Parse an RFC3339 timestamp string.
    pub fn from_rfc3339(value: &str) -> Result<Self, DbTimestampError> {
        chrono::DateTime::parse_from_rfc3339(value)
            .map(|dt| Self {
                inner: dt.with_timezone(&chrono::Utc),
            })
            .map_err(|e| DbTimestampError::new(format!("Invalid timestamp: {}", e)))
    }

    /// Parse a `YYYY-MM-DD HH:MM:SS[.fff]` string, interpreted as UTC.
    ///
    /// This is the text form SQLite's `CURRENT_TIMESTAMP` and MySQL's
    /// `DATETIME` produce.
    pub fn from_sql_datetime(value: &str) -> Result<Self, DbTimestampError> {
        chrono::NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%d %H:%M:%S%.f")
            .map(|naive| Self {
                inner: naive.and_utc(),
            })
            .map_err(|e| DbTimestampError::new(format!("Invalid datetime: {}", e)))
    }

    /// Construct from Unix milliseconds.
    pub fn from_unix_millis(ms: i64) -> Result<Self, DbTimestampError> {
        chrono::DateTime::from_timestamp_millis(ms)
            .map(|dt| Self { inner: dt })
            .ok_or_else(|| DbTimestampError::new("Invalid Unix milliseconds"))
    }

    /// Construct from Unix microseconds.
    pub fn from_unix_micros(us: i64) -> Result<Self, DbTimestampError> {
        chrono::DateTime::from_timestamp_micros(us)
            .map(|dt| Self { inner: dt })
            .ok_or_else(|| DbTimestampError::new("Invalid Unix microseconds"))
    }

    /// RFC3339 string representation.
    pub fn to_rfc3339(&self) -> String {
        self.inner.to_rfc3339()
    }

    /// Unix milliseconds since epoch.
    pub fn unix_millis(&self) -> i64 {
        self.inner.timestamp_millis()
    }

    /// Unix microseconds since epoch.
    pub fn unix_micros(&self) -> i64 {
        self.inner.timestamp_micros()
    }

    /// True when the instant carries precision finer than a millisecond.
    pub fn has_sub_millis(&self) -> bool {
        self.inner.timestamp_subsec_nanos() % 1_000_000 != 0
    }
}

impl From<chrono::DateTime<chrono::Utc>> for DbTimestamp {
    fn from(value: chrono::DateTime<chrono::Utc>) -> Self {
        Self { inner: value }
    }
}

impl std::fmt::Display for DbTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

/// Database primitive: the value shapes a driver binds and returns.
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
    Timestamp(DbTimestamp),
}

impl DbValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DbValue::Null)
    }

    /// Short shape name used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            DbValue::Null => "NULL",
            DbValue::Integer(_) => "integer",
            DbValue::Real(_) => "real",
            DbValue::Text(_) => "text",
            DbValue::Blob(_) => "blob",
            DbValue::Boolean(_) => "boolean",
            DbValue::Timestamp(_) => "timestamp",
        }
    }

    /// Shape name plus the value itself, for scan error messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            DbValue::Null => "NULL".to_string(),
            DbValue::Integer(v) => format!("integer {}", v),
            DbValue::Real(v) => format!("real {}", v),
            DbValue::Text(v) => format!("text {:?}", v),
            DbValue::Blob(v) => format!("blob ({} bytes)", v.len()),
            DbValue::Boolean(v) => format!("boolean {}", v),
            DbValue::Timestamp(v) => format!("timestamp {}", v),
        }
    }
}

impl From<i32> for DbValue {
    fn from(v: i32) -> Self {
        DbValue::Integer(v as i64)
    }
}

impl From<i64> for DbValue {
    fn from(v: i64) -> Self {
        DbValue::Integer(v)
    }
}

impl From<f64> for DbValue {
    fn from(v: f64) -> Self {
        DbValue::Real(v)
    }
}

impl From<String> for DbValue {
    fn from(v: String) -> Self {
        DbValue::Text(v)
    }
}

impl From<&str> for DbValue {
    fn from(v: &str) -> Self {
        DbValue::Text(v.to_string())
    }
}

impl From<bool> for DbValue {
    fn from(v: bool) -> Self {
        DbValue::Boolean(v)
    }
}

impl From<DbTimestamp> for DbValue {
    fn from(v: DbTimestamp) -> Self {
        DbValue::Timestamp(v)
    }
}

impl From<Vec<u8>> for DbValue {
    fn from(v: Vec<u8>) -> Self {
        DbValue::Blob(v)
    }
}

impl<T: Into<DbValue>> From<Option<T>> for DbValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => DbValue::Null,
        }
    }
}

/// Row data from a query result.
#[derive(Debug, Clone)]
pub struct DbRow {
    columns: Vec<String>,
    values: Vec<DbValue>,
}

impl DbRow {
    /// Create a new row with column names and values.
    pub fn new(columns: Vec<String>, values: Vec<DbValue>) -> Self {
        Self { columns, values }
    }

    /// Get a value by column index.
    pub fn get<T: FromDbValue>(&self, index: usize) -> Result<T, ConnectionError> {
        self.values
            .get(index)
            .ok_or_else(|| {
                ConnectionError::TypeConversion(format!("Column index {} out of bounds", index))
            })
            .and_then(|v| T::from_db_value(v))
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the column names.
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Get the raw DbValue at an index.
    pub fn get_raw(&self, index: usize) -> Option<&DbValue> {
        self.values.get(index)
    }

    /// All raw values in column order.
    pub fn values(&self) -> &[DbValue] {
        &self.values
    }
}

/// Trait for converting from DbValue.
pub trait FromDbValue: Sized {
    fn from_db_value(value: &DbValue) -> Result<Self, ConnectionError>;
}

impl FromDbValue for i64 {
    /// Text-protocol drivers hand integers back as decimal text.
    fn from_db_value(value: &DbValue) -> Result<Self, ConnectionError> {
        match value {
            DbValue::Integer(v) => Ok(*v),
            DbValue::Text(s) => s.trim().parse().map_err(|_| {
                ConnectionError::TypeConversion(format!("Expected integer, got text {:?}", s))
            }),
            DbValue::Null => Err(ConnectionError::TypeConversion(
                "i64 field is NULL - use Option<i64> for nullable columns".to_string(),
            )),
            _ => Err(ConnectionError::TypeConversion(
                "Expected integer".to_string(),
            )),
        }
    }
}

impl<T: FromDbValue> FromDbValue for Option<T> {
    fn from_db_value(value: &DbValue) -> Result<Self, ConnectionError> {
        match value {
            DbValue::Null => Ok(None),
            _ => T::from_db_value(value).map(Some),
        }
    }
}

/// Host-side value of a mapped field.
///
/// One variant per host type family; `Custom` carries backend-declared
/// custom types (json, uuid, decimal, ...) in their canonical text form.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Timestamp(DbTimestamp),
    Custom { type_name: String, text: String },
}

impl HostValue {
    pub fn custom(type_name: impl Into<String>, text: impl Into<String>) -> Self {
        HostValue::Custom {
            type_name: type_name.into(),
            text: text.into(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            HostValue::Null => "null",
            HostValue::Bool(_) => "bool",
            HostValue::Int(_) => "signed integer",
            HostValue::UInt(_) => "unsigned integer",
            HostValue::Float(_) => "float",
            HostValue::String(_) => "string",
            HostValue::Bytes(_) => "bytes",
            HostValue::Timestamp(_) => "timestamp",
            HostValue::Custom { .. } => "custom",
        }
    }
}

impl From<bool> for HostValue {
    fn from(v: bool) -> Self {
        HostValue::Bool(v)
    }
}

impl From<i32> for HostValue {
    fn from(v: i32) -> Self {
        HostValue::Int(v as i64)
    }
}

impl From<i64> for HostValue {
    fn from(v: i64) -> Self {
        HostValue::Int(v)
    }
}

impl From<u32> for HostValue {
    fn from(v: u32) -> Self {
        HostValue::UInt(v as u64)
    }
}

impl From<u64> for HostValue {
    fn from(v: u64) -> Self {
        HostValue::UInt(v)
    }
}

impl From<f64> for HostValue {
    fn from(v: f64) -> Self {
        HostValue::Float(v)
    }
}

impl From<String> for HostValue {
    fn from(v: String) -> Self {
        HostValue::String(v)
    }
}

impl From<&str> for HostValue {
    fn from(v: &str) -> Self {
        HostValue::String(v.to_string())
    }
}

impl From<Vec<u8>> for HostValue {
    fn from(v: Vec<u8>) -> Self {
        HostValue::Bytes(v)
    }
}

impl From<DbTimestamp> for HostValue {
    fn from(v: DbTimestamp) -> Self {
        HostValue::Timestamp(v)
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => HostValue::Null,
        }
    }
}
