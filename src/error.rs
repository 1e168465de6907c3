//! Error types for the allocation service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Error taxonomy for allocation and polling failures
///
/// Every variant is terminal for the current call. Nothing here crosses the
/// `allocate`/`poll` boundary: adapters fold these into `Error` responses and
/// log the underlying cause server-side.
#[derive(Debug, thiserror::Error)]
pub enum AllocatorError {
    /// Missing or invalid secret/credential material
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Network or backend-call failure (timeout, 5xx, connection reset)
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Backend responded successfully but with a malformed/incomplete payload
    #[error("Validation error for field '{field}': {message}")]
    Validation { field: String, message: String },

    /// Backend explicitly reports a failed/cancelled/timed-out allocation
    #[error("Provider reported terminal failure: {message}")]
    ProviderTerminal { message: String },

    /// Backend returned a status value outside the known vocabulary
    #[error("Unknown backend status: {raw}")]
    UnknownStatus { raw: String },

    /// Internal service error (serialization, wiring)
    #[error("Internal service error: {message}")]
    Internal { message: String },
}

impl AllocatorError {
    /// Shorthand for a transport failure wrapping another error
    pub fn transport(err: impl std::fmt::Display) -> Self {
        AllocatorError::Transport {
            message: err.to_string(),
        }
    }

    /// Shorthand for a validation failure naming the malformed field
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AllocatorError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
