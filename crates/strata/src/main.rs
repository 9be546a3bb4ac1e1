//! Strata command-line front end
//!
//! Inspect the built-in backends and turn JSON model files into DDL:
//! - `backends`: registered engines and their conventions
//! - `placeholders`: parameter markers for a statement
//! - `ddl`: print CREATE TABLE for a model
//! - `apply`: create the table on a database

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use strata_logging::{init_logging, LogConfig};

mod cli;

#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "Relational backend toolkit for Strata")]
struct Cli {
    /// Enable verbose logging (debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List registered backends
    Backends {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the parameter markers for COUNT parameters
    Placeholders {
        /// Backend name (e.g. sqlite, postgres)
        #[arg(short, long)]
        backend: String,

        /// Number of parameters
        count: usize,
    },

    /// Print CREATE TABLE for a model file
    Ddl {
        /// Backend name (e.g. sqlite, postgres)
        #[arg(short, long)]
        backend: String,

        /// Model description (JSON)
        #[arg(short, long)]
        model: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create the table described by a model file
    Apply {
        /// Database URL (sqlite:path, duckdb:path, ...)
        #[arg(long, env = "STRATA_DATABASE_URL")]
        url: String,

        /// Model description (JSON)
        #[arg(short, long)]
        model: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn command_wants_json(command: &Commands) -> bool {
    match command {
        Commands::Backends { json } => *json,
        Commands::Ddl { json, .. } => *json,
        Commands::Apply { json, .. } => *json,
        Commands::Placeholders { .. } => false,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json_mode = command_wants_json(&cli.command);

    let log_config = LogConfig {
        verbose: cli.verbose,
        quiet: json_mode,
        ..LogConfig::new("strata")
    };
    if let Err(err) = init_logging(log_config) {
        eprintln!("Warning: failed to initialize logging: {:#}", err);
    }

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if json_mode {
                cli::error::print_json_error(&err);
            } else {
                eprintln!("Error: {:#}", err);
            }
            ExitCode::from(1)
        }
    }
}

fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Backends { json } => cli::backends::run(json),
        Commands::Placeholders { backend, count } => cli::backends::placeholders(&backend, count),
        Commands::Ddl {
            backend,
            model,
            json,
        } => cli::schema::ddl(&backend, &model, json),
        Commands::Apply { url, model, json } => cli::schema::apply(&url, &model, json),
    }
}
