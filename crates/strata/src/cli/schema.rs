//! `ddl` and `apply` commands: JSON model files to CREATE TABLE.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use strata_db::{BackendRegistry, DbConfig, Mapper, Model, NamingPolicy};
use tracing::info;

#[derive(Debug, Serialize)]
pub struct DdlOutput {
    pub backend: String,
    pub table: String,
    pub sql: String,
}

pub fn load_model(path: &Path) -> Result<Model> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read model file: {}", path.display()))?;
    let model: Model = serde_json::from_str(&text)
        .with_context(|| format!("Invalid model file: {}", path.display()))?;
    if model.fields().is_empty() {
        anyhow::bail!("Model '{}' declares no fields", model.table());
    }
    Ok(model)
}

pub fn render_ddl(backend: &str, model: &Model) -> Result<DdlOutput> {
    let mapper = Mapper::new(&BackendRegistry::with_builtin(), backend)?;
    render_with(&mapper, model)
}

fn render_with(mapper: &Mapper, model: &Model) -> Result<DdlOutput> {
    let backend = mapper.backend().name();
    let sql = mapper
        .create_table_sql(model)
        .with_context(|| format!("Cannot map table '{}' to {}", model.table(), backend))?;
    Ok(DdlOutput {
        backend: backend.to_string(),
        table: model.table().to_string(),
        sql,
    })
}

pub fn ddl(backend: &str, model_path: &Path, json: bool) -> Result<()> {
    let model = load_model(model_path)?;
    let output = render_ddl(backend, &model)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{};", output.sql);
    }
    Ok(())
}

pub fn apply(url: &str, model_path: &Path, json: bool) -> Result<()> {
    let model = load_model(model_path)?;
    let config = DbConfig::from_url(url)?;
    let mapper = Mapper::new(&BackendRegistry::with_builtin(), config.backend_name())?;
    let output = render_with(&mapper, &model)?;

    let conn = config.open()?;
    mapper
        .create_table(conn.as_ref(), &model)
        .with_context(|| format!("Failed to create table '{}'", model.table()))?;
    info!(backend = config.backend_name(), table = model.table(), "applied model");

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Created table {} ({})", output.table, output.backend);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const USERS: &str = r#"{
        "table": "users",
        "fields": [
            {"name": "id", "type": "i64", "tag": "primary_key"},
            {"name": "email", "type": "string", "tag": "unique,max_length=128"},
            {"name": "bio", "type": "string", "nullable": true}
        ]
    }"#;

    fn write_model(dir: &TempDir, text: &str) -> std::path::PathBuf {
        let path = dir.path().join("model.json");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn renders_mysql_ddl() {
        let tmp = TempDir::new().unwrap();
        let model = load_model(&write_model(&tmp, USERS)).unwrap();
        let output = render_ddl("mysql", &model).unwrap();
        assert!(output.sql.contains("`id` BIGINT PRIMARY KEY AUTO_INCREMENT"));
        assert!(output.sql.contains("`email` VARCHAR(128) NOT NULL UNIQUE"));
        assert!(output.sql.contains("`bio` TEXT"));
    }

    #[test]
    fn rejects_empty_and_malformed_models() {
        let tmp = TempDir::new().unwrap();
        let empty = write_model(&tmp, r#"{"table": "t", "fields": []}"#);
        assert!(load_model(&empty).is_err());

        let bad_tag = write_model(
            &tmp,
            r#"{"table": "t", "fields": [{"name": "a", "type": "i64", "tag": "=x"}]}"#,
        );
        let err = load_model(&bad_tag).unwrap_err();
        assert!(err.to_string().starts_with("Invalid model file"));
    }

    #[test]
    fn unknown_backend_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let model = load_model(&write_model(&tmp, USERS)).unwrap();
        let err = render_ddl("oracle", &model).unwrap_err();
        assert!(err.to_string().contains("oracle"));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn apply_creates_sqlite_table() {
        let tmp = TempDir::new().unwrap();
        let model_path = write_model(&tmp, USERS);
        let db_path = tmp.path().join("app.sqlite3");
        let url = format!("sqlite:{}", db_path.display());

        apply(&url, &model_path, false).unwrap();
        // CREATE TABLE IF NOT EXISTS: a second run is a no-op.
        apply(&url, &model_path, true).unwrap();
        assert!(db_path.exists());
    }
}
