use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading the static branch dataset.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse dataset: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Dataset contains no branches")]
    Empty,

    #[error("Duplicate branch code: {0}")]
    DuplicateCode(String),

    #[error("Branch {code}: invalid {field} value {value:?}")]
    InvalidField {
        code: String,
        field: &'static str,
        value: String,
    },
}

/// Errors raised while loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
