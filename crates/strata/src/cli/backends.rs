//! `backends` and `placeholders` commands.

use anyhow::Result;
use serde::Serialize;
use strata_db::{Backend, BackendRegistry, NamingPolicy, PlaceholderPolicy, TransformSet, TypeResolver};

#[derive(Debug, Serialize)]
pub struct BackendSummary {
    pub name: &'static str,
    /// Markers for three parameters, e.g. `?, ?, ?`.
    pub placeholders: String,
    pub max_params: usize,
    pub transforms: Vec<&'static str>,
    pub custom_types: Vec<CustomType>,
}

#[derive(Debug, Serialize)]
pub struct CustomType {
    pub name: &'static str,
    pub column_type: &'static str,
}

impl BackendSummary {
    pub fn describe(backend: &dyn Backend) -> Self {
        Self {
            name: backend.name(),
            placeholders: backend.placeholders(3),
            max_params: backend.max_params(),
            transforms: backend.transforms().iter().map(|k| k.as_str()).collect(),
            custom_types: backend
                .custom_types()
                .iter()
                .map(|&(name, column_type)| CustomType { name, column_type })
                .collect(),
        }
    }
}

pub fn summaries(registry: &BackendRegistry) -> Vec<BackendSummary> {
    registry
        .iter()
        .map(|backend| BackendSummary::describe(backend.as_ref()))
        .collect()
}

pub fn run(json: bool) -> Result<()> {
    let registry = BackendRegistry::with_builtin();
    let summaries = summaries(&registry);

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    println!(
        "{:<10} {:<14} {:>10}  {}",
        "BACKEND", "PLACEHOLDERS", "MAX PARAMS", "TRANSFORMS"
    );
    for summary in &summaries {
        let transforms = if summary.transforms.is_empty() {
            "-".to_string()
        } else {
            summary.transforms.join(", ")
        };
        println!(
            "{:<10} {:<14} {:>10}  {}",
            summary.name, summary.placeholders, summary.max_params, transforms
        );
    }
    Ok(())
}

pub fn placeholders(backend: &str, count: usize) -> Result<()> {
    let registry = BackendRegistry::with_builtin();
    let backend = registry.lookup(backend)?;
    println!("{}", backend.placeholders(count));
    Ok(())
}
