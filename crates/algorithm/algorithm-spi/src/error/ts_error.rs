//! Time series error types
//!
//! Defines the standardized error type for all algorithm operations.

use thiserror::Error;

/// Result type alias for algorithm operations
pub type Result<T> = std::result::Result<T, TsError>;

/// Errors that can occur during time series operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TsError {
    /// Insufficient data points for the operation
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Model has not been fitted yet
    #[error("Model must be fitted before prediction")]
    NotFitted,

    /// Numerical computation error (singular systems, overflow)
    #[error("Numerical error: {0}")]
    NumericalError(String),

    /// Invalid input data (NaN, infinite values, etc.)
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl TsError {
    /// Shorthand for an [`TsError::InvalidParameter`]
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
