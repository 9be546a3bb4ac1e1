//! Tracing setup for Strata binaries.
//!
//! Events go to two sinks: a size-capped log file under `$STRATA_HOME/logs`
//! and stderr. `RUST_LOG` overrides the default filter for both.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const DEFAULT_LOG_FILTER: &str = "strata=info,strata_db=info";
const HOME_ENV: &str = "STRATA_HOME";
const MAX_LOG_FILES: usize = 5;
const MAX_LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Logging options chosen by the binary.
#[derive(Debug, Clone, Copy)]
pub struct LogConfig<'a> {
    /// Base name of the log file.
    pub app_name: &'a str,
    /// Mirror the file filter on stderr (and lift it to debug for strata crates).
    pub verbose: bool,
    /// Only warnings and errors on stderr.
    pub quiet: bool,
}

impl<'a> LogConfig<'a> {
    pub fn new(app_name: &'a str) -> Self {
        Self {
            app_name,
            verbose: false,
            quiet: false,
        }
    }
}

/// Install the global subscriber. Fails if one is already set.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let log_dir = ensure_logs_dir().context("Failed to ensure log directory")?;
    let file_writer = SharedRollingWriter::open(&log_dir, config.app_name)
        .context("Failed to initialize rolling log writer")?;

    let base = base_directives(config.verbose);
    let file_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&base));
    let console_filter = EnvFilter::new(console_directives(&config, &base));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_filter(console_filter),
        )
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    tracing::debug!(dir = %log_dir.display(), "logging initialized");
    Ok(())
}

fn base_directives(verbose: bool) -> String {
    if verbose {
        "strata=debug,strata_db=debug".to_string()
    } else {
        DEFAULT_LOG_FILTER.to_string()
    }
}

fn console_directives(config: &LogConfig<'_>, base: &str) -> String {
    if config.quiet {
        return "warn".to_string();
    }
    match std::env::var("RUST_LOG") {
        Ok(directives) if !config.verbose && !directives.trim().is_empty() => directives,
        _ => base.to_string(),
    }
}

/// Strata home directory: `$STRATA_HOME`, else `~/.strata`.
///
/// Without a resolvable home directory the current directory is used.
pub fn strata_home() -> PathBuf {
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".strata")
}

pub fn logs_dir() -> PathBuf {
    strata_home().join("logs")
}

pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir();
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

/// `<name>.log` plus up to `keep - 1` rotated siblings `<name>.log.N`.
struct LogFiles {
    dir: PathBuf,
    stem: String,
    keep: usize,
}

impl LogFiles {
    fn active(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.stem))
    }

    fn rotated(&self, generation: usize) -> PathBuf {
        self.dir.join(format!("{}.log.{}", self.stem, generation))
    }

    /// Shift every generation up by one and drop the oldest.
    fn shift(&self) -> io::Result<()> {
        let oldest = self.keep.saturating_sub(1);
        if oldest == 0 {
            // Single-file mode: start over.
            return match fs::remove_file(self.active()) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            };
        }
        let last = self.rotated(oldest);
        if last.exists() {
            fs::remove_file(&last)?;
        }
        for generation in (1..oldest).rev() {
            let from = self.rotated(generation);
            if from.exists() {
                fs::rename(&from, self.rotated(generation + 1))?;
            }
        }
        let active = self.active();
        if active.exists() {
            fs::rename(active, self.rotated(1))?;
        }
        Ok(())
    }
}

struct RollingLog {
    files: LogFiles,
    max_size: u64,
    file: Option<File>,
    written: u64,
}

impl RollingLog {
    fn open(dir: &Path, app_name: &str, keep: usize, max_size: u64) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let mut log = Self {
            files: LogFiles {
                dir: dir.to_path_buf(),
                stem: file_stem(app_name),
                keep: keep.max(1),
            },
            max_size,
            file: None,
            written: 0,
        };
        log.reopen()?;
        if log.written > log.max_size {
            log.roll()?;
        }
        Ok(log)
    }

    fn reopen(&mut self) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.files.active())?;
        self.written = file.metadata()?.len();
        self.file = Some(file);
        Ok(())
    }

    fn roll(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush();
        }
        self.files.shift()?;
        self.reopen()
    }
}

impl Write for RollingLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_size {
            self.roll()?;
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "log file unavailable"))?;
        let n = file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Cloneable handle handed to `tracing_subscriber::fmt`.
#[derive(Clone)]
struct SharedRollingWriter {
    log: Arc<Mutex<RollingLog>>,
}

impl SharedRollingWriter {
    fn open(dir: &Path, app_name: &str) -> Result<Self> {
        let log = RollingLog::open(dir, app_name, MAX_LOG_FILES, MAX_LOG_FILE_SIZE)
            .with_context(|| format!("Failed to open log file for {}", app_name))?;
        Ok(Self {
            log: Arc::new(Mutex::new(log)),
        })
    }

    fn with_log<T>(&self, f: impl FnOnce(&mut RollingLog) -> io::Result<T>) -> io::Result<T> {
        let mut log = self
            .log
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?;
        f(&mut log)
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedRollingWriter {
    type Writer = SharedRollingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl Write for SharedRollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_log(|log| log.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_log(|log| log.flush())
    }
}

fn file_stem(app_name: &str) -> String {
    let stem: String = app_name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "strata".to_string()
    } else {
        stem
    }
}
