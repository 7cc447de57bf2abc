//! Error types for artwalk-engine
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. Transient failures (QR decode, submission check, share) are
//! handled at their call sites and never reach this type; what remains here
//! is contract violations and infrastructure errors.

use thiserror::Error;

/// Main error type for the experience engine
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Operation invoked from a state that does not expose it
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Strict-mode dispatch of an unsupported (state, event) pair
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// QR code text with no catalog mapping
    #[error("Unknown code: {0}")]
    UnknownCode(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using engine Error
pub type Result<T> = std::result::Result<T, Error>;
