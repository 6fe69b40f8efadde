//! Error types for the Jinah CLI.

use jinah_payments::PaymentError;
use jinah_webhooks::WebhookError;
use thiserror::Error;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Webhook(#[from] WebhookError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
