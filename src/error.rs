//! Error types for the catalog pipeline.

use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

/// A declared source table could not be turned into a relation.
///
/// Always fatal: the run aborts before any analytics execute.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read table '{table}' from {}: {source}", path.display())]
    Unreadable {
        table: String,
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("table '{table}' at {} has an unsupported format (expected .csv or .parquet)", path.display())]
    UnsupportedFormat { table: String, path: PathBuf },

    #[error("table '{table}' is missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("table '{table}': {source}")]
    Polars {
        table: String,
        #[source]
        source: PolarsError,
    },
}

/// A score string that does not have the `number/denominator` shape.
///
/// Recovered locally: the row only drops out of the aggregate that needed the score.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RatingError {
    #[error("empty rating")]
    Empty,

    #[error("rating '{0}' has no '/' delimiter")]
    MissingDelimiter(String),

    #[error("rating '{0}' does not start with a number")]
    InvalidNumber(String),
}

/// Configuration could not be loaded or failed validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Figment(Box::new(err))
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("polars: {0}")]
    Polars(#[from] PolarsError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
