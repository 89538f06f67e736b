//! # Error Types
//!
//! Custom error types for Fleet Beacon using `thiserror`.

use thiserror::Error;

/// Main error type for Fleet Beacon
#[derive(Debug, Error)]
pub enum FleetBeaconError {
    /// Location source errors (subscription failure, device read errors)
    #[error("location source error: {0}")]
    Location(String),

    /// GPS receiver not found on any candidate serial path
    #[error("no GPS receiver found (tried: {0})")]
    GpsNotFound(String),

    /// HTTP delivery errors (connect, write, timeout, bad response)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Report server URL could not be parsed
    #[error("invalid server URL: {0}")]
    InvalidUrl(String),

    /// Tracker lifecycle misuse: `start()` called more than once
    #[error("position tracker already started")]
    AlreadyStarted,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Fleet Beacon
pub type Result<T> = std::result::Result<T, FleetBeaconError>;
