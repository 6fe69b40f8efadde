//! Error types for webhook operations

use jinah_payments::PaymentError;
use thiserror::Error;

/// Errors that can occur while receiving a webhook
#[derive(Error, Debug)]
pub enum WebhookError {
    /// Client IP is outside the allow-list
    #[error("IP address not allowed: {ip}")]
    IpNotAllowed { ip: String },

    /// Signature missing from request
    #[error("Signature missing from request")]
    SignatureMissing,

    /// Signature verification failed
    #[error("Signature verification failed: {0}")]
    SignatureInvalid(String),

    /// Timestamp validation failed
    #[error("Timestamp validation failed: {0}")]
    TimestampInvalid(String),

    /// No secret configured for a scheme that needs one
    #[error("Webhook secret not configured for {0}")]
    SecretMissing(String),

    /// Payload could not be read
    #[error("Payload error: {0}")]
    PayloadError(String),

    #[error(transparent)]
    Payment(#[from] PaymentError),
}

impl WebhookError {
    /// Whether the request was rejected by verification (HTTP 401)
    pub fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            WebhookError::IpNotAllowed { .. }
                | WebhookError::SignatureMissing
                | WebhookError::SignatureInvalid(_)
                | WebhookError::TimestampInvalid(_)
                | WebhookError::SecretMissing(_)
        )
    }
}

impl From<serde_json::Error> for WebhookError {
    fn from(err: serde_json::Error) -> Self {
        WebhookError::PayloadError(err.to_string())
    }
}

/// Result type for webhook operations
pub type Result<T> = std::result::Result<T, WebhookError>;
