//! Webhook event envelope.
//!
//! Defines the structures for parsing processor webhook payloads. Only
//! fields relevant to payment confirmation are captured; everything else
//! in the processor's full event schema is ignored.

use serde::{Deserialize, Serialize};

/// Webhook event envelope (simplified).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    pub created: i64,

    /// Object containing event-specific data.
    pub data: StripeEventData,

    /// Whether this is a live mode event (vs test mode).
    #[serde(default)]
    pub livemode: bool,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object that triggered the event (polymorphic based on event type).
    pub object: serde_json::Value,
}

impl StripeEvent {
    /// Parse the event type into a known dispatch variant.
    pub fn kind(&self) -> EventKind {
        EventKind::from_str(&self.event_type)
    }

    /// Attempts to deserialize the data object as the specified type.
    pub fn deserialize_object<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }
}

/// Event types this gateway acts on.
///
/// Everything else is acknowledged without action; unknown event types
/// must never cause errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Hosted checkout session completed.
    CheckoutSessionCompleted,
    /// Payment intent reached the succeeded state (fallback confirmation).
    PaymentIntentSucceeded,
    /// Unknown or unhandled event type.
    Unknown,
}

impl EventKind {
    /// Parse an event-type string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "payment_intent.succeeded" => Self::PaymentIntentSucceeded,
            _ => Self::Unknown,
        }
    }

    /// Convert to the processor's event type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::PaymentIntentSucceeded => "payment_intent.succeeded",
            Self::Unknown => "unknown",
        }
    }
}
