//! Error type shared by every stage of the pipeline.
//!
//! Structural problems (absent columns, index gaps, bad modes, values that
//! cannot be coerced) are surfaced as [`Error`] and propagated unchanged.
//! Data-quality problems such as nulls or unparsable timestamps are not
//! errors; they are resolved by the missing-value policy.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Column '{0}' not found")]
    MissingColumn(String),

    /// Input that is neither a well-formed grid nor a table.
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("One or more variables are not in the dataset: {0:?}")]
    MissingVariables(Vec<String>),

    #[error("Cannot convert column '{column}' to {target}")]
    TypeCoercion { column: String, target: String },

    #[error("Missing time indices detected in '{column}': {missing:?}")]
    MissingIndex { column: String, missing: Vec<i64> },

    #[error("Group {group:?} has missing timesteps: {missing:?}")]
    MissingTimesteps {
        group: Vec<String>,
        missing: Vec<i64>,
    },

    #[error("Unsupported mode: {0}. Choose either 'train' or 'eval'.")]
    InvalidMode(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No holiday calendar registered for country '{0}'")]
    UnknownCountry(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}
