//! Processor API client port.
//!
//! Defines the contract for talking to the payment processor (Stripe) and
//! the wire-shaped value types the gateway consumes. Field names follow
//! the processor's JSON so the same types deserialize both API responses
//! and webhook payload objects.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A reference the processor may deliver either as a bare id or as a
/// fully expanded object, depending on `expand[]` parameters and event
/// payload shape.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    Object(Box<T>),
    Id(String),
}

impl<T> Expandable<T> {
    /// The expanded object, when present.
    pub fn as_object(&self) -> Option<&T> {
        match self {
            Expandable::Object(obj) => Some(obj),
            Expandable::Id(_) => None,
        }
    }

    /// The bare reference id, when not expanded.
    pub fn as_id(&self) -> Option<&str> {
        match self {
            Expandable::Object(_) => None,
            Expandable::Id(id) => Some(id),
        }
    }
}

/// Hosted checkout session.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CheckoutSession {
    /// Session identifier (cs_xxx).
    pub id: String,

    /// Payment state of the session: "paid", "unpaid" or "no_payment_required".
    #[serde(default)]
    pub payment_status: String,

    /// Payment intent created for this session, if any.
    #[serde(default)]
    pub payment_intent: Option<String>,

    /// Total amount in minor units.
    #[serde(default)]
    pub amount_total: Option<i64>,

    /// ISO currency code, lowercase.
    #[serde(default)]
    pub currency: Option<String>,

    /// Caller-supplied metadata; carries the invoice id.
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Hosted page URL (present on freshly created sessions).
    #[serde(default)]
    pub url: Option<String>,
}

impl CheckoutSession {
    /// True once the payer has completed payment.
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }

    /// Invoice id carried in session metadata, if present and numeric.
    pub fn invoice_id(&self) -> Option<i64> {
        metadata_invoice_id(&self.metadata)
    }
}

/// The processor's record of a single attempted charge.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PaymentIntent {
    /// Intent identifier (pi_xxx); doubles as the ledger transaction id.
    pub id: String,

    /// Lifecycle status; "succeeded" is the only state the gateway records.
    #[serde(default)]
    pub status: String,

    /// Requested amount in minor units.
    #[serde(default)]
    pub amount: i64,

    /// Amount actually received in minor units, once settled.
    #[serde(default)]
    pub amount_received: Option<i64>,

    /// ISO currency code, lowercase.
    #[serde(default)]
    pub currency: String,

    /// Caller-supplied metadata; carries the invoice id on direct intents.
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Most recent charge, expanded when the client requests it.
    #[serde(default)]
    pub latest_charge: Option<Expandable<Charge>>,
}

impl PaymentIntent {
    /// True once the charge has succeeded.
    pub fn has_succeeded(&self) -> bool {
        self.status == "succeeded"
    }

    /// Settled amount in minor units, falling back to the requested
    /// amount when the received amount is not reported.
    pub fn settled_amount_minor(&self) -> i64 {
        self.amount_received.unwrap_or(self.amount)
    }

    /// Invoice id carried in intent metadata, if present and numeric.
    pub fn invoice_id(&self) -> Option<i64> {
        metadata_invoice_id(&self.metadata)
    }

    /// The expanded latest charge, when the payload carried one.
    pub fn charge(&self) -> Option<&Charge> {
        self.latest_charge.as_ref().and_then(Expandable::as_object)
    }
}

/// A settled (or settling) charge under a payment intent.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Charge {
    /// Charge identifier (ch_xxx).
    pub id: String,

    /// Requested amount in minor units.
    #[serde(default)]
    pub amount: i64,

    /// Captured amount in minor units.
    #[serde(default)]
    pub amount_captured: i64,

    /// Platform/application fee in minor units, when one was set.
    #[serde(default)]
    pub application_fee_amount: Option<i64>,

    /// Settlement record reference, populated once the charge settles.
    #[serde(default)]
    pub balance_transaction: Option<Expandable<BalanceTransaction>>,
}

/// The processor's settlement record for a charge.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BalanceTransaction {
    /// Balance transaction identifier (txn_xxx).
    pub id: String,

    /// Gross amount in minor units.
    #[serde(default)]
    pub amount: i64,

    /// Fee withheld by the processor, minor units.
    #[serde(default)]
    pub fee: i64,

    /// Net amount after fees, minor units.
    #[serde(default)]
    pub net: i64,

    /// Settlement status: "available" once funds have settled.
    #[serde(default)]
    pub status: String,
}

impl BalanceTransaction {
    /// True once the settlement has completed.
    pub fn is_settled(&self) -> bool {
        self.status == "available"
    }
}

/// Request to create a hosted checkout session for an invoice.
#[derive(Debug, Clone)]
pub struct CreateCheckoutSessionRequest {
    /// Invoice being paid; stored in session metadata.
    pub invoice_id: i64,

    /// Amount due in minor units.
    pub amount_minor: i64,

    /// ISO currency code.
    pub currency: String,

    /// Line-item description shown on the hosted page.
    pub description: String,

    /// Payer email for pre-fill, when known.
    pub customer_email: Option<String>,

    /// URL the processor redirects to after payment.
    pub success_url: String,

    /// URL the processor redirects to on cancel.
    pub cancel_url: String,
}

/// Errors from processor API operations.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// Network-level failure reaching the processor.
    #[error("Network error: {0}")]
    Network(String),

    /// The processor answered with a non-success status.
    #[error("Processor API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The processor's response could not be decoded.
    #[error("Invalid processor response: {0}")]
    InvalidResponse(String),
}

impl ProcessorError {
    pub fn network(message: impl Into<String>) -> Self {
        ProcessorError::Network(message.into())
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        ProcessorError::Api {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        ProcessorError::InvalidResponse(message.into())
    }
}

/// Port for the payment processor's API.
///
/// Calls are unary request/response with a network timeout; there is no
/// in-request retry. The caller (payer's browser or the processor's
/// webhook retrier) is the retry mechanism.
#[async_trait]
pub trait ProcessorClient: Send + Sync {
    /// Retrieve a checkout session by id.
    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, ProcessorError>;

    /// Retrieve a payment intent by id, with its latest charge expanded.
    async fn retrieve_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<PaymentIntent, ProcessorError>;

    /// Retrieve a balance (settlement) transaction by id.
    async fn retrieve_balance_transaction(
        &self,
        balance_transaction_id: &str,
    ) -> Result<BalanceTransaction, ProcessorError>;

    /// Create a hosted checkout session for an invoice.
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession, ProcessorError>;
}

/// Parse the `invoice_id` metadata entry shared by sessions and intents.
fn metadata_invoice_id(metadata: &HashMap<String, String>) -> Option<i64> {
    metadata
        .get("invoice_id")
        .and_then(|raw| raw.parse::<i64>().ok())
        .filter(|id| *id > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // Trait object safety check
    #[test]
    fn processor_client_is_object_safe() {
        fn _accepts_dyn(_client: &dyn ProcessorClient) {}
    }

    #[test]
    fn expandable_parses_bare_id() {
        let value: Expandable<Charge> = serde_json::from_value(json!("ch_123")).unwrap();
        assert_eq!(value.as_id(), Some("ch_123"));
        assert!(value.as_object().is_none());
    }

    #[test]
    fn expandable_parses_object() {
        let value: Expandable<Charge> =
            serde_json::from_value(json!({"id": "ch_123", "amount": 500})).unwrap();
        let charge = value.as_object().unwrap();
        assert_eq!(charge.id, "ch_123");
        assert_eq!(charge.amount, 500);
    }

    #[test]
    fn session_parses_processor_json() {
        let session: CheckoutSession = serde_json::from_value(json!({
            "id": "cs_test_a1",
            "object": "checkout.session",
            "payment_status": "paid",
            "payment_intent": "pi_42",
            "amount_total": 1999,
            "currency": "usd",
            "metadata": {"invoice_id": "100", "client_id": "7"}
        }))
        .unwrap();

        assert!(session.is_paid());
        assert_eq!(session.payment_intent.as_deref(), Some("pi_42"));
        assert_eq!(session.invoice_id(), Some(100));
    }

    #[test]
    fn session_invoice_id_requires_positive_integer() {
        let mut session = CheckoutSession::default();
        session.metadata.insert("invoice_id".to_string(), "abc".to_string());
        assert_eq!(session.invoice_id(), None);

        session.metadata.insert("invoice_id".to_string(), "0".to_string());
        assert_eq!(session.invoice_id(), None);

        session.metadata.insert("invoice_id".to_string(), "-3".to_string());
        assert_eq!(session.invoice_id(), None);
    }

    #[test]
    fn intent_settled_amount_prefers_amount_received() {
        let intent = PaymentIntent {
            id: "pi_1".to_string(),
            amount: 2000,
            amount_received: Some(1999),
            ..Default::default()
        };
        assert_eq!(intent.settled_amount_minor(), 1999);

        let intent = PaymentIntent {
            id: "pi_2".to_string(),
            amount: 2000,
            amount_received: None,
            ..Default::default()
        };
        assert_eq!(intent.settled_amount_minor(), 2000);
    }

    #[test]
    fn intent_parses_expanded_latest_charge() {
        let intent: PaymentIntent = serde_json::from_value(json!({
            "id": "pi_9",
            "status": "succeeded",
            "amount": 1000,
            "amount_received": 1000,
            "currency": "usd",
            "latest_charge": {
                "id": "ch_9",
                "amount": 1000,
                "amount_captured": 1000,
                "balance_transaction": "txn_9"
            }
        }))
        .unwrap();

        assert!(intent.has_succeeded());
        let charge = intent.charge().unwrap();
        assert_eq!(charge.id, "ch_9");
        assert_eq!(
            charge.balance_transaction.as_ref().unwrap().as_id(),
            Some("txn_9")
        );
    }

    #[test]
    fn intent_parses_unexpanded_latest_charge() {
        let intent: PaymentIntent = serde_json::from_value(json!({
            "id": "pi_10",
            "status": "succeeded",
            "amount": 500,
            "latest_charge": "ch_10"
        }))
        .unwrap();

        assert!(intent.charge().is_none());
        assert_eq!(
            intent.latest_charge.as_ref().unwrap().as_id(),
            Some("ch_10")
        );
    }

    #[test]
    fn balance_transaction_settlement_check() {
        let txn = BalanceTransaction {
            id: "txn_1".to_string(),
            status: "available".to_string(),
            ..Default::default()
        };
        assert!(txn.is_settled());

        let pending = BalanceTransaction {
            id: "txn_2".to_string(),
            status: "pending".to_string(),
            ..Default::default()
        };
        assert!(!pending.is_settled());
    }

    #[test]
    fn processor_error_display() {
        let err = ProcessorError::api(502, "bad gateway");
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("bad gateway"));
    }
}
