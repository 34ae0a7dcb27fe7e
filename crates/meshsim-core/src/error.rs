use thiserror::Error;

/// Canonical error type for simulation operations.
///
/// The engine treats defective units inside an otherwise valid run (a
/// missing base-data row, an unresolved dependency target) as skippable and
/// logs them instead of failing; errors here surface only misconfiguration
/// that makes a run meaningless.
#[derive(Debug, Error)]
pub enum SimError {
    /// Settings or input data violate a documented bound.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Human-readable description of the violated bound.
        message: String,
    },

    /// Unexpected internal error occurred.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable details for debugging purposes.
        message: String,
    },
}

impl SimError {
    /// Creates an `InvalidConfig` variant.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an `Internal` variant.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Convenient result alias for simulation operations.
pub type SimResult<T> = Result<T, SimError>;
