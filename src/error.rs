//! Crate-wide error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Failure converting a reported source value into the group's native unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("invalid numeric state \"{0}\"")]
    InvalidNumber(String),
    #[error("unsupported unit of measurement \"{0}\"")]
    UnsupportedUnit(String),
    #[error("value {0} out of range after unit conversion")]
    OutOfRange(String),
}

/// Errors surfaced by the configuration, replay and export layers.
///
/// The aggregation core itself never fails and absorbs every
/// [`ConversionError`]; see [`crate::group`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("{0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
