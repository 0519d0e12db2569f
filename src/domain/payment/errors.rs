//! Transport-level rejection taxonomy for webhook handling.
//!
//! These are the only errors that surface as non-success HTTP status to
//! the processor; business failures downstream are logged and acknowledged
//! so the processor's retry machinery is not triggered by permanent
//! conditions.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that occur before a webhook event reaches business logic.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// No webhook signing secret is configured for this deployment.
    #[error("Webhook signing secret not configured")]
    MissingSecret,

    /// Signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Event timestamp is older than the freshness window (5 minutes).
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Event timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Failed to parse the signature header or the JSON payload.
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl WebhookError {
    /// Maps the rejection to the HTTP status returned to the processor.
    ///
    /// Malformed input is a client error (400); a signature that parses
    /// but fails authentication, or a replayed timestamp, is refused
    /// outright (403). Nothing here returns 5xx: transport rejections
    /// must not look like transient server failures to the retrier.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingSecret
            | WebhookError::ParseError(_)
            | WebhookError::InvalidTimestamp => StatusCode::BAD_REQUEST,

            WebhookError::InvalidSignature | WebhookError::TimestampOutOfRange => {
                StatusCode::FORBIDDEN
            }
        }
    }
}
