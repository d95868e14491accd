use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("Cannot load {}: {reason}", path.display())]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("Length mismatch in {source_name}: expected {expected} rows, found {found}")]
    LengthMismatch {
        source_name: String,
        expected: usize,
        found: usize,
    },

    #[error("Shape error: {0}")]
    Shape(String),

    #[error("Missing metadata for column: {0}")]
    MissingMetadata(String),

    #[error("Invalid divisor {divisor} for {}", path.display())]
    InvalidDivisor { path: PathBuf, divisor: f64 },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AssemblyError {
    pub(crate) fn config_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        AssemblyError::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn length_mismatch(source_name: impl Into<String>, expected: usize, found: usize) -> Self {
        AssemblyError::LengthMismatch {
            source_name: source_name.into(),
            expected,
            found,
        }
    }
}
