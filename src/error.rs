//! Crate-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    /// A configuration source could not be read or parsed.
    #[error("config load error: {0}")]
    ConfigLoad(String),

    /// A canonical logging configuration was rejected by the facility.
    #[error("config apply error: {0}")]
    ConfigApply(String),

    /// A log directory could not be created.
    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
