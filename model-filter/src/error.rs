//! Error types for model filtering
//!
//! Filter resolution problems are reported as configuration errors; anything
//! raised inside a user-written handler is carried through untouched.

use thiserror::Error;

/// The main error type for model-filter operations
#[derive(Debug, Error)]
pub enum Error {
    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    #[error("No filter definition bound to model '{model}'")]
    NoFilterBound { model: &'static str },

    #[error("Filter has no handler named '{name}'")]
    UnknownHandler { name: String },

    // ==========================================================================
    // Handler Errors
    // ==========================================================================
    /// Raised by a filter handler or setup hook, passed through as-is.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),

    // ==========================================================================
    // Input Errors
    // ==========================================================================
    #[error("Invalid filter input for '{key}': {reason}")]
    InvalidInput { key: String, reason: String },

    // ==========================================================================
    // Database Errors
    // ==========================================================================
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type alias for model-filter operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Returns true if the error comes from how filters are wired up rather
    /// than from the input or the database
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::NoFilterBound { .. } | Error::UnknownHandler { .. }
        )
    }
}
