//! Error reporting for `--json` runs.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct JsonError {
    pub error: String,
    /// Underlying causes, outermost first.
    pub causes: Vec<String>,
}

impl JsonError {
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        Self {
            error: err.to_string(),
            causes: err.chain().skip(1).map(|cause| cause.to_string()).collect(),
        }
    }
}

/// Print the error as JSON on stdout so scripted callers can parse it.
pub fn print_json_error(err: &anyhow::Error) {
    let payload = JsonError::from_anyhow(err);
    match serde_json::to_string_pretty(&payload) {
        Ok(text) => println!("{}", text),
        Err(_) => eprintln!("Error: {:#}", err),
    }
}
