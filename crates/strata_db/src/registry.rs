//! Backend registry: engine name -> backend strategy.
//!
//! The registry is an explicit value, built at start-up and handed to the
//! mapper read-only. There is no process-wide table.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::backend::{Backend, DuckDbBackend, MySqlBackend, PostgresBackend, SqliteBackend};
use crate::error::{BackendError, Result};

#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: BTreeMap<&'static str, Arc<dyn Backend>>,
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.names())
            .finish()
    }
}

impl BackendRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the SQLite, MySQL, PostgreSQL and DuckDB backends.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        let builtin: [Arc<dyn Backend>; 4] = [
            Arc::new(SqliteBackend),
            Arc::new(MySqlBackend),
            Arc::new(PostgresBackend),
            Arc::new(DuckDbBackend),
        ];
        for backend in builtin {
            registry.backends.insert(backend.name(), backend);
        }
        registry
    }

    /// Register a backend under its name.
    ///
    /// Fails with `DuplicateBackend` if the name is taken; use
    /// [`register_or_replace`](Self::register_or_replace) to override.
    pub fn register<B: Backend + 'static>(&mut self, backend: B) -> Result<()> {
        let name = backend.name();
        if self.backends.contains_key(name) {
            return Err(BackendError::DuplicateBackend(name.to_string()));
        }
        self.backends.insert(name, Arc::new(backend));
        info!(backend = name, "registered backend");
        Ok(())
    }

    /// Register a backend, replacing any backend with the same name.
    ///
    /// Returns the replaced backend.
    pub fn register_or_replace<B: Backend + 'static>(
        &mut self,
        backend: B,
    ) -> Option<Arc<dyn Backend>> {
        let name = backend.name();
        let previous = self.backends.insert(name, Arc::new(backend));
        if previous.is_some() {
            info!(backend = name, "replaced backend");
        } else {
            info!(backend = name, "registered backend");
        }
        previous
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Backend>> {
        let backend = self
            .backends
            .get(name)
            .cloned()
            .ok_or_else(|| BackendError::UnknownBackend(name.to_string()))?;
        debug!(backend = name, "backend lookup");
        Ok(backend)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&'static str> {
        self.backends.keys().copied().collect()
    }

    /// Registered backends in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Backend>> {
        self.backends.values()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
