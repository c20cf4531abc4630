//! # Error Types
//!
//! Custom error types for TIC Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for TIC Bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Teleinformation framing or checksum errors
    #[error("TIC protocol error: {0}")]
    Tic(String),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for TIC Bridge
pub type Result<T> = std::result::Result<T, BridgeError>;
