//! Error types for the buy-point engine.

use thiserror::Error;

/// Result type alias using the engine error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the scoring and signal-detection engine.
#[derive(Error, Debug)]
pub enum Error {
    /// Fewer bars than a computation needs
    #[error("Insufficient data: need at least {required} bars, got {available}")]
    InsufficientData { required: usize, available: usize },

    /// Invalid input (non-positive price, PE, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A required field could not be resolved
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Threshold tables that fail validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build an `InsufficientData` error.
    pub const fn insufficient(required: usize, available: usize) -> Self {
        Self::InsufficientData {
            required,
            available,
        }
    }

    /// Check if this is an insufficient-data error.
    pub const fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }

    /// Check if this is an invalid-input error.
    pub const fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_message() {
        let err = Error::insufficient(5, 3);
        assert!(err.is_insufficient_data());
        assert_eq!(
            err.to_string(),
            "Insufficient data: need at least 5 bars, got 3"
        );
    }

    #[test]
    fn test_error_predicates() {
        assert!(Error::InvalidInput("pe".into()).is_invalid_input());
        assert!(!Error::MissingField("ma120").is_invalid_input());
        assert!(!Error::Config("fib_ratios".into()).is_insufficient_data());
    }
}
