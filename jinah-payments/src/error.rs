//! Error types for payment orchestration

use thiserror::Error;

/// Payment error types
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Provider not configured or missing credentials
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Bad amount, currency or missing required field
    #[error("Validation error: {0}")]
    Validation(String),

    /// Connection failure, timeout, rate limit or server error
    #[error("Transport error: {0}")]
    Transport(String),

    /// No adapter exists for the requested driver
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Provider returned something the adapter could not use
    #[error("Provider error: {0}")]
    Provider(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Key-value store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Payment content could not be rendered
    #[error("Render error: {0}")]
    Render(String),
}

impl PaymentError {
    /// Shorthand for a missing required field
    pub fn missing_field(field: &str) -> Self {
        PaymentError::Validation(format!("Missing required field: {}", field))
    }

    /// Whether the error happened before any network I/O
    pub fn is_boundary_error(&self) -> bool {
        matches!(
            self,
            PaymentError::Configuration(_)
                | PaymentError::Validation(_)
                | PaymentError::UnknownProvider(_)
        )
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        PaymentError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for PaymentError {
    fn from(err: serde_json::Error) -> Self {
        PaymentError::Serialization(err.to_string())
    }
}

/// Result type for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message() {
        let err = PaymentError::missing_field("transaction_id");
        assert_eq!(
            err.to_string(),
            "Validation error: Missing required field: transaction_id"
        );
    }

    #[test]
    fn test_boundary_errors() {
        assert!(PaymentError::Configuration("x".into()).is_boundary_error());
        assert!(PaymentError::Validation("x".into()).is_boundary_error());
        assert!(!PaymentError::Transport("x".into()).is_boundary_error());
    }

    #[test]
    fn test_from_serde_error() {
        let err: PaymentError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, PaymentError::Serialization(_)));
    }
}
