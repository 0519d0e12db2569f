//! Request/response DTOs for the gateway endpoints.

use serde::{Deserialize, Serialize};

use crate::application::handlers::payment::WebhookOutcome;

/// Query parameters of the return endpoint.
#[derive(Debug, Deserialize)]
pub struct ReturnParams {
    /// Must be `return`; anything else is a bad request.
    pub action: Option<String>,

    /// Invoice id being paid.
    pub invoice: Option<i64>,

    /// Checkout session id appended by the processor's redirect.
    pub session_id: Option<String>,
}

/// Body of the checkout-creation endpoint.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub invoice_id: i64,
    /// Amount due in minor units.
    pub amount_minor: i64,
    /// ISO currency code.
    pub currency: String,
    pub customer_email: Option<String>,
}

/// Response of the checkout-creation endpoint.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    /// Hosted page the caller should redirect the payer to.
    pub url: String,
}

/// Acknowledgment body returned for signature-valid webhook events.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub result: &'static str,
}

impl From<&WebhookOutcome> for WebhookAck {
    fn from(outcome: &WebhookOutcome) -> Self {
        let result = match outcome {
            WebhookOutcome::Recorded { .. } => "recorded",
            WebhookOutcome::AlreadyRecorded { .. } => "already_recorded",
            WebhookOutcome::Acknowledged { .. } => "acknowledged",
            WebhookOutcome::Ignored { .. } => "ignored",
        };
        WebhookAck {
            received: true,
            result,
        }
    }
}

/// Error body for non-redirect failures.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
