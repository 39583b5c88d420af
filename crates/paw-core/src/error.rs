//! # AppError
//!
//! Centralized error handling for the PawRescue ports.
//! Every plugin maps its backend failures onto one of these variants.

use thiserror::Error;

/// The primary error type crossing every port boundary.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., user, report)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., report without an animal type)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Credential or API key rejected
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Resource already exists (e.g., duplicate email)
    #[error("conflict: {0}")]
    Conflict(String),

    /// The remote report service answered with a non-2xx status.
    #[error("remote returned HTTP {status}: {body}")]
    Remote { status: u16, body: String },

    /// Infrastructure failure (e.g., database locked, connection refused)
    #[error("internal service error: {0}")]
    Internal(String),

    /// Missing or malformed configuration value
    #[error("configuration error: {0}")]
    Config(String),
}

/// A specialized Result type for PawRescue logic.
pub type Result<T> = std::result::Result<T, AppError>;
