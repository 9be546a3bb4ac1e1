//! Database URL configuration.
//!
//! Supported URL forms:
//! - `sqlite:path`, `sqlite://path`, `sqlite::memory:`
//! - `duckdb:path`, `duckdb::memory:`
//! - `postgres://...`, `postgresql://...`
//! - `mysql://...`

use std::path::{Path, PathBuf};

use tracing::info;

use crate::connection::Connection;
use crate::error::{BackendError, Result};

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    Memory,
    File(PathBuf),
    /// Network server, addressed by the full URL.
    Server(String),
}

/// Parsed database URL: backend name plus location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    backend: &'static str,
    location: DbLocation,
}

impl DbConfig {
    /// SQLite database file.
    pub fn sqlite(path: impl AsRef<Path>) -> Self {
        Self {
            backend: "sqlite",
            location: DbLocation::File(path.as_ref().to_path_buf()),
        }
    }

    /// In-memory SQLite database (for testing).
    pub fn sqlite_memory() -> Self {
        Self {
            backend: "sqlite",
            location: DbLocation::Memory,
        }
    }

    /// Create configuration from a URL, detecting the backend from its scheme.
    pub fn from_url(url: &str) -> Result<Self> {
        let url = url.trim();
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            return Ok(Self {
                backend: "postgres",
                location: DbLocation::Server(url.to_string()),
            });
        }
        if url.starts_with("mysql://") {
            return Ok(Self {
                backend: "mysql",
                location: DbLocation::Server(url.to_string()),
            });
        }
        for backend in ["sqlite", "duckdb"] {
            let prefix = format!("{}:", backend);
            if let Some(rest) = url.strip_prefix(prefix.as_str()) {
                return Ok(Self {
                    backend,
                    location: file_location(url, rest)?,
                });
            }
        }
        Err(BackendError::config(format!(
            "Unsupported database URL: {}",
            url
        )))
    }

    /// Registry name of the backend this URL selects.
    pub fn backend_name(&self) -> &'static str {
        self.backend
    }

    pub fn location(&self) -> &DbLocation {
        &self.location
    }

    /// Open a connection through a built-in adapter.
    ///
    /// SQLite and DuckDB have adapters (behind the `sqlite` and `duckdb`
    /// features). PostgreSQL and MySQL callers bring their own `Connection`.
    pub fn open(&self) -> Result<Box<dyn Connection>> {
        info!(backend = self.backend, location = ?self.location, "opening database");
        match self.backend {
            "sqlite" => self.open_sqlite(),
            "duckdb" => self.open_duckdb(),
            other => Err(BackendError::config(format!(
                "No built-in driver for '{}'; supply a Connection implementation",
                other
            ))),
        }
    }

    #[cfg(feature = "sqlite")]
    fn open_sqlite(&self) -> Result<Box<dyn Connection>> {
        use crate::connection::SqliteConnection;
        let conn = match &self.location {
            DbLocation::File(path) => SqliteConnection::open(path)?,
            _ => SqliteConnection::open_in_memory()?,
        };
        Ok(Box::new(conn))
    }

    #[cfg(not(feature = "sqlite"))]
    fn open_sqlite(&self) -> Result<Box<dyn Connection>> {
        Err(not_compiled("sqlite"))
    }

    #[cfg(feature = "duckdb")]
    fn open_duckdb(&self) -> Result<Box<dyn Connection>> {
        use crate::connection::DuckDbConnection;
        let conn = match &self.location {
            DbLocation::File(path) => DuckDbConnection::open(path)?,
            _ => DuckDbConnection::open_in_memory()?,
        };
        Ok(Box::new(conn))
    }

    #[cfg(not(feature = "duckdb"))]
    fn open_duckdb(&self) -> Result<Box<dyn Connection>> {
        Err(not_compiled("duckdb"))
    }
}

#[cfg(any(not(feature = "sqlite"), not(feature = "duckdb")))]
fn not_compiled(feature: &str) -> BackendError {
    BackendError::config(format!(
        "{} support not compiled in (rebuild with the '{}' feature)",
        feature, feature
    ))
}

fn file_location(url: &str, rest: &str) -> Result<DbLocation> {
    if rest == ":memory:" || rest == "//:memory:" {
        return Ok(DbLocation::Memory);
    }
    let path = rest.strip_prefix("//").unwrap_or(rest);
    // Query options such as `?mode=rwc` are not file name parts.
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() {
        return Err(BackendError::config(format!(
            "Database URL has no path: {}",
            url
        )));
    }
    Ok(DbLocation::File(PathBuf::from(path)))
}
