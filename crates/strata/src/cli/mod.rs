//! Command implementations for the `strata` binary.

pub mod backends;
pub mod error;
pub mod schema;
