//! Common error types for the chapter playback workspace

use thiserror::Error;

/// Common result type for shared operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by every crate in the workspace
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error while reading a configuration file
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON (de)serialization error, e.g. a catalog file
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Playback rate outside the supported set
    #[error("Unsupported playback rate: {0}")]
    InvalidRate(f32),

    /// Invalid input (malformed parcel, bad parameter)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
