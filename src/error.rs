//! Errors for the outer surfaces: schema resolution, run parameters and
//! dataset loading.
//!
//! Bad coordinate data is never an error; it ends up in a
//! [`ValidationReport`](crate::ValidationReport).

use thiserror::Error;

/// The input table does not have the columns the pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("missing expected column \"{name}\" (available: {available})")]
    MissingColumn { name: String, available: String },

    #[error("column {role} expects index {index}, but the table has only {width} columns")]
    TooFewColumns {
        role: &'static str,
        index: usize,
        width: usize,
    },

    #[error("the table has no header row")]
    EmptyHeader,
}

/// Run parameters that no evaluation can use.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("distance threshold must be a positive number of meters, got {0}")]
    InvalidThreshold(f64),

    #[error("max lag must be at least 1")]
    ZeroMaxLag,
}

/// Failure while reading a dataset from CSV.
#[cfg(feature = "csv")]
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parse error at line {line}: {source}")]
    Csv {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("input is not valid UTF-8 (try --encoding latin1)")]
    Encoding,

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
