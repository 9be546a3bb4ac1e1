use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const EVENTS_MODEL: &str = r#"{
    "table": "events",
    "fields": [
        {"name": "id", "type": "i64", "tag": "primary_key"},
        {"name": "name", "type": "string", "tag": "unique,max_length=64"},
        {"name": "active", "type": "bool"},
        {"name": "at", "type": "timestamp"},
        {"name": "payload", "type": "json", "nullable": true}
    ]
}"#;

fn strata_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_strata"))
}

fn run_cli(args: &[&str], home: &Path) -> Output {
    Command::new(strata_bin())
        .args(args)
        .env("STRATA_HOME", home)
        .env("RUST_LOG", "error")
        .env_remove("STRATA_DATABASE_URL")
        .output()
        .expect("failed to execute strata CLI")
}

fn run_ok(args: &[&str], home: &Path) -> String {
    let output = run_cli(args, home);
    assert!(
        output.status.success(),
        "command failed: {}\nstdout:\n{}\nstderr:\n{}",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn run_cli_json<T: DeserializeOwned>(args: &[&str], home: &Path) -> T {
    let stdout = run_ok(args, home);
    serde_json::from_str(&stdout).unwrap_or_else(|err| {
        panic!("failed to parse JSON output: {}\nstdout:\n{}", err, stdout)
    })
}

fn write_model(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("events.json");
    std::fs::write(&path, EVENTS_MODEL).expect("write model");
    path
}

#[derive(Debug, Deserialize)]
struct BackendSummary {
    name: String,
    placeholders: String,
    max_params: usize,
    transforms: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DdlOutput {
    backend: String,
    table: String,
    sql: String,
}

#[derive(Debug, Deserialize)]
struct JsonError {
    error: String,
}

#[test]
fn backends_json_lists_builtin_engines() {
    let home = TempDir::new().unwrap();
    let backends: Vec<BackendSummary> = run_cli_json(&["backends", "--json"], home.path());

    let names: Vec<_> = backends.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, ["duckdb", "mysql", "postgres", "sqlite"]);

    let sqlite = backends.iter().find(|b| b.name == "sqlite").unwrap();
    assert_eq!(sqlite.placeholders, "?, ?, ?");
    assert_eq!(sqlite.max_params, 999);
    assert_eq!(sqlite.transforms, ["boolean", "unsigned", "timestamp"]);

    let postgres = backends.iter().find(|b| b.name == "postgres").unwrap();
    assert_eq!(postgres.transforms, ["unsigned"]);
}

#[test]
fn backends_table_output() {
    let home = TempDir::new().unwrap();
    let stdout = run_ok(&["backends"], home.path());
    assert!(stdout.starts_with("BACKEND"));
    assert!(stdout.lines().any(|l| l.starts_with("postgres") && l.contains("$1, $2, $3")));
}

#[test]
fn placeholders_per_backend() {
    let home = TempDir::new().unwrap();
    assert_eq!(
        run_ok(&["placeholders", "--backend", "sqlite", "3"], home.path()).trim_end(),
        "?, ?, ?"
    );
    assert_eq!(
        run_ok(&["placeholders", "--backend", "postgres", "4"], home.path()).trim_end(),
        "$1, $2, $3, $4"
    );
    assert_eq!(
        run_ok(&["placeholders", "--backend", "mysql", "0"], home.path()).trim_end(),
        ""
    );
}

#[test]
fn unknown_backend_fails() {
    let home = TempDir::new().unwrap();
    let output = run_cli(&["placeholders", "--backend", "oracle", "1"], home.path());
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown backend: oracle"));
}

#[test]
fn ddl_for_each_engine() {
    let home = TempDir::new().unwrap();
    let model = write_model(&home);
    let model = model.to_str().unwrap();

    let sqlite: DdlOutput = run_cli_json(
        &["ddl", "--backend", "sqlite", "--model", model, "--json"],
        home.path(),
    );
    assert_eq!(sqlite.backend, "sqlite");
    assert_eq!(sqlite.table, "events");
    assert_eq!(
        sqlite.sql,
        "CREATE TABLE IF NOT EXISTS \"events\" (\n    \
         \"id\" INTEGER PRIMARY KEY AUTOINCREMENT,\n    \
         \"name\" TEXT NOT NULL UNIQUE,\n    \
         \"active\" INTEGER NOT NULL,\n    \
         \"at\" INTEGER NOT NULL,\n    \
         \"payload\" TEXT\n)"
    );

    let postgres = run_ok(&["ddl", "--backend", "postgres", "--model", model], home.path());
    assert!(postgres.contains("\"id\" BIGSERIAL PRIMARY KEY"));
    assert!(postgres.contains("\"payload\" JSONB"));
    assert!(postgres.trim_end().ends_with(");"));

    let mysql = run_ok(&["ddl", "--backend", "mysql", "--model", model], home.path());
    assert!(mysql.contains("`name` VARCHAR(64) NOT NULL UNIQUE"));
}

#[test]
fn ddl_reports_invalid_tags_as_json() {
    let home = TempDir::new().unwrap();
    let model = home.path().join("bad.json");
    std::fs::write(
        &model,
        r#"{"table": "t", "fields": [{"name": "code", "type": "string", "tag": "primary_key"}]}"#,
    )
    .unwrap();

    let output = run_cli(
        &["ddl", "--backend", "sqlite", "--model", model.to_str().unwrap(), "--json"],
        home.path(),
    );
    assert!(!output.status.success());
    let err: JsonError = serde_json::from_slice(&output.stdout).unwrap();
    assert!(err.error.contains("Cannot map table 't' to sqlite"));
}

#[cfg(feature = "sqlite")]
#[test]
fn apply_creates_table_from_env_url() {
    let home = TempDir::new().unwrap();
    let model = write_model(&home);
    let db_path = home.path().join("data").join("app.sqlite3");
    let url = format!("sqlite:{}", db_path.display());

    let output = Command::new(strata_bin())
        .args(["apply", "--model", model.to_str().unwrap()])
        .env("STRATA_HOME", home.path())
        .env("STRATA_DATABASE_URL", &url)
        .env("RUST_LOG", "error")
        .output()
        .expect("failed to execute strata CLI");
    assert!(
        output.status.success(),
        "stderr:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("Created table events (sqlite)"));
    assert!(db_path.exists());
    // Logs land under STRATA_HOME.
    assert!(home.path().join("logs").join("strata.log").exists());
}

#[test]
fn apply_rejects_server_urls_without_adapter() {
    let home = TempDir::new().unwrap();
    let model = write_model(&home);
    let output = run_cli(
        &[
            "apply",
            "--url",
            "postgres://localhost/app",
            "--model",
            model.to_str().unwrap(),
        ],
        home.path(),
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No built-in driver for 'postgres'"));
}
