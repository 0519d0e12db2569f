//! HandleReturnHandler - synchronous confirmation when the payer's
//! browser returns from hosted checkout.
//!
//! The redirect URL is attacker-controlled input, so nothing in it is
//! trusted: the session and its payment intent are re-retrieved from the
//! processor before anything touches the ledger.

use std::sync::Arc;

use crate::domain::payment::minor_to_major;
use crate::ports::{InvoiceLedger, ProcessorClient, SessionStore};

use super::record_payment::{PaymentRecorder, RecordOutcome};
use super::resolve_fee::FeeResolver;

/// Longest session id accepted before rejecting outright.
const MAX_SESSION_ID_LEN: usize = 255;

/// Command carrying the return-endpoint query parameters.
#[derive(Debug, Clone)]
pub struct HandleReturnCommand {
    /// Invoice id from the `invoice` query parameter.
    pub invoice_id: i64,
    /// Session id from the `session_id` query parameter.
    pub session_id: String,
}

/// Why a return was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnRejection {
    /// Invoice id or session id failed shape validation; no processor
    /// call was made.
    InvalidParams,
    /// Session exists but its payment is not completed.
    SessionNotPaid,
    /// Paid session carries no payment intent reference.
    MissingPaymentIntent,
    /// Payment intent exists but did not succeed.
    IntentNotSucceeded,
    /// Processor API call failed.
    ApiError,
    /// Ledger access failed.
    LedgerError,
}

impl ReturnRejection {
    /// Stable reason token used in logs and reconciliation.
    pub fn reason(&self) -> &'static str {
        match self {
            ReturnRejection::InvalidParams => "malformed_input",
            ReturnRejection::SessionNotPaid => "payment_not_completed",
            ReturnRejection::MissingPaymentIntent => "missing_payment_intent",
            ReturnRejection::IntentNotSucceeded => "payment_not_succeeded",
            ReturnRejection::ApiError => "api_error",
            ReturnRejection::LedgerError => "ledger_error",
        }
    }
}

/// Outcome of the return flow; exactly one redirect per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    /// Payment verified and recorded; redirect to the invoice with the
    /// success flag.
    PaymentRecorded { invoice_id: i64 },
    /// Invoice already settled (repeated refresh or lost race); redirect
    /// to the invoice without re-recording.
    AlreadyPaid { invoice_id: i64 },
    /// Terminal rejection; redirect to the cart with the error flag.
    Rejected(ReturnRejection),
}

/// Handler for the browser-return confirmation flow.
pub struct HandleReturnHandler {
    ledger: Arc<dyn InvoiceLedger>,
    processor: Arc<dyn ProcessorClient>,
    sessions: Arc<dyn SessionStore>,
    recorder: PaymentRecorder,
    fee_resolver: FeeResolver,
    gateway_name: String,
}

impl HandleReturnHandler {
    pub fn new(
        ledger: Arc<dyn InvoiceLedger>,
        processor: Arc<dyn ProcessorClient>,
        sessions: Arc<dyn SessionStore>,
        gateway_name: impl Into<String>,
    ) -> Self {
        Self {
            recorder: PaymentRecorder::new(ledger.clone()),
            fee_resolver: FeeResolver::new(processor.clone()),
            ledger,
            processor,
            sessions,
            gateway_name: gateway_name.into(),
        }
    }

    /// Verify the returning session and record its payment.
    ///
    /// Never fails: every failure mode maps to a redirect outcome. The
    /// payer's browser re-requesting the URL is the only retry mechanism.
    pub async fn handle(&self, cmd: HandleReturnCommand) -> RedirectOutcome {
        if cmd.invoice_id <= 0 || !is_valid_session_id(&cmd.session_id) {
            tracing::warn!(
                invoice_id = cmd.invoice_id,
                reason = ReturnRejection::InvalidParams.reason(),
                "return rejected before verification"
            );
            return RedirectOutcome::Rejected(ReturnRejection::InvalidParams);
        }

        // Idempotence against repeated browser refresh: a settled invoice
        // short-circuits without any processor call.
        match self.ledger.invoice_status(cmd.invoice_id).await {
            Ok(status) if status.is_paid() => {
                tracing::info!(invoice_id = cmd.invoice_id, "invoice already paid");
                return RedirectOutcome::AlreadyPaid {
                    invoice_id: cmd.invoice_id,
                };
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(invoice_id = cmd.invoice_id, error = %err, "invoice status lookup failed");
                return RedirectOutcome::Rejected(ReturnRejection::LedgerError);
            }
        }

        self.check_session_mapping(cmd.invoice_id, &cmd.session_id).await;

        let session = match self.processor.retrieve_session(&cmd.session_id).await {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(
                    invoice_id = cmd.invoice_id,
                    session_id = %cmd.session_id,
                    error = %err,
                    "session retrieval failed"
                );
                return RedirectOutcome::Rejected(ReturnRejection::ApiError);
            }
        };

        if !session.is_paid() {
            tracing::warn!(
                invoice_id = cmd.invoice_id,
                session_id = %session.id,
                payment_status = %session.payment_status,
                reason = ReturnRejection::SessionNotPaid.reason(),
                "session not paid"
            );
            return RedirectOutcome::Rejected(ReturnRejection::SessionNotPaid);
        }

        let payment_intent_id = match session.payment_intent.as_deref() {
            Some(id) => id,
            None => {
                tracing::warn!(
                    invoice_id = cmd.invoice_id,
                    session_id = %session.id,
                    "paid session without payment intent"
                );
                return RedirectOutcome::Rejected(ReturnRejection::MissingPaymentIntent);
            }
        };

        let intent = match self.processor.retrieve_payment_intent(payment_intent_id).await {
            Ok(intent) => intent,
            Err(err) => {
                tracing::warn!(
                    invoice_id = cmd.invoice_id,
                    transaction_id = %payment_intent_id,
                    error = %err,
                    "payment intent retrieval failed"
                );
                return RedirectOutcome::Rejected(ReturnRejection::ApiError);
            }
        };

        if !intent.has_succeeded() {
            tracing::warn!(
                invoice_id = cmd.invoice_id,
                transaction_id = %intent.id,
                status = %intent.status,
                reason = ReturnRejection::IntentNotSucceeded.reason(),
                "payment intent not succeeded"
            );
            return RedirectOutcome::Rejected(ReturnRejection::IntentNotSucceeded);
        }

        let amount = minor_to_major(intent.settled_amount_minor());
        let fee = match intent.charge() {
            Some(charge) => minor_to_major(self.fee_resolver.resolve(charge).await.fee_minor),
            None => 0.0,
        };

        match self
            .recorder
            .record(cmd.invoice_id, &intent.id, amount, fee, &self.gateway_name)
            .await
        {
            Ok(RecordOutcome::Recorded) => RedirectOutcome::PaymentRecorded {
                invoice_id: cmd.invoice_id,
            },
            Ok(RecordOutcome::AlreadyRecorded) => RedirectOutcome::AlreadyPaid {
                invoice_id: cmd.invoice_id,
            },
            Err(err) => {
                tracing::warn!(
                    invoice_id = cmd.invoice_id,
                    transaction_id = %intent.id,
                    error = %err,
                    "ledger write failed"
                );
                RedirectOutcome::Rejected(ReturnRejection::LedgerError)
            }
        }
    }

    /// Advisory reconciliation check against the stored session mapping.
    /// Log-only; never a correctness decision.
    async fn check_session_mapping(&self, invoice_id: i64, session_id: &str) {
        match self.sessions.find_by_invoice(invoice_id).await {
            Ok(Some(record)) if record.session_id != session_id => {
                tracing::warn!(
                    invoice_id,
                    issued_session = %record.session_id,
                    returned_session = %session_id,
                    "returning session differs from issued session"
                );
            }
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(invoice_id, error = %err, "session mapping lookup failed");
            }
        }
    }
}

/// Allow-listed session id shape: alphanumeric plus `_` and `-`.
fn is_valid_session_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && session_id.len() <= MAX_SESSION_ID_LEN
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryInvoiceLedger, InMemorySessionStore};
    use crate::adapters::stripe::MockProcessorClient;
    use crate::ports::{
        BalanceTransaction, Charge, CheckoutSession, Expandable, InvoiceStatus, PaymentIntent,
        ProcessorError,
    };

    struct Fixture {
        ledger: Arc<InMemoryInvoiceLedger>,
        processor: Arc<MockProcessorClient>,
        sessions: Arc<InMemorySessionStore>,
        handler: HandleReturnHandler,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(InMemoryInvoiceLedger::new());
        let processor = Arc::new(MockProcessorClient::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        let handler = HandleReturnHandler::new(
            ledger.clone(),
            processor.clone(),
            sessions.clone(),
            "stripe",
        );
        Fixture {
            ledger,
            processor,
            sessions,
            handler,
        }
    }

    fn paid_session(session_id: &str, payment_intent: &str) -> CheckoutSession {
        CheckoutSession {
            id: session_id.to_string(),
            payment_status: "paid".to_string(),
            payment_intent: Some(payment_intent.to_string()),
            amount_total: Some(1999),
            currency: Some("usd".to_string()),
            ..Default::default()
        }
    }

    fn succeeded_intent(id: &str, amount_received: i64) -> PaymentIntent {
        PaymentIntent {
            id: id.to_string(),
            status: "succeeded".to_string(),
            amount: amount_received,
            amount_received: Some(amount_received),
            currency: "usd".to_string(),
            ..Default::default()
        }
    }

    fn cmd(invoice_id: i64, session_id: &str) -> HandleReturnCommand {
        HandleReturnCommand {
            invoice_id,
            session_id: session_id.to_string(),
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Parameter Validation
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn zero_invoice_id_rejected_without_processor_call() {
        let f = fixture();

        let outcome = f.handler.handle(cmd(0, "cs_test_abc")).await;

        assert_eq!(
            outcome,
            RedirectOutcome::Rejected(ReturnRejection::InvalidParams)
        );
        assert!(f.processor.calls().is_empty());
    }

    #[tokio::test]
    async fn hostile_session_id_rejected_without_processor_call() {
        let f = fixture();

        for bad in ["", "cs_test/../../etc", "cs test", "cs_<script>", "cs;drop"] {
            let outcome = f.handler.handle(cmd(42, bad)).await;
            assert_eq!(
                outcome,
                RedirectOutcome::Rejected(ReturnRejection::InvalidParams),
                "session id {:?} should be rejected",
                bad
            );
        }
        assert!(f.processor.calls().is_empty());
    }

    #[test]
    fn session_id_charset_allows_expected_shapes() {
        assert!(is_valid_session_id("cs_test_a1B2-c3_d4"));
        assert!(!is_valid_session_id(&"x".repeat(MAX_SESSION_ID_LEN + 1)));
    }

    // ══════════════════════════════════════════════════════════════
    // Already-Paid Short Circuit
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn paid_invoice_short_circuits_before_processor() {
        let f = fixture();
        f.ledger.set_status(42, InvoiceStatus::Paid);

        let outcome = f.handler.handle(cmd(42, "cs_test_abc")).await;

        assert_eq!(outcome, RedirectOutcome::AlreadyPaid { invoice_id: 42 });
        assert!(f.processor.calls().is_empty());
    }

    // ══════════════════════════════════════════════════════════════
    // Session / Intent Verification
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unpaid_session_rejected() {
        let f = fixture();
        let mut session = paid_session("cs_1", "pi_1");
        session.payment_status = "unpaid".to_string();
        f.processor.set_session(session);

        let outcome = f.handler.handle(cmd(42, "cs_1")).await;

        assert_eq!(
            outcome,
            RedirectOutcome::Rejected(ReturnRejection::SessionNotPaid)
        );
        assert!(f.ledger.entries().is_empty());
    }

    #[tokio::test]
    async fn paid_session_without_intent_rejected() {
        let f = fixture();
        let mut session = paid_session("cs_1", "pi_1");
        session.payment_intent = None;
        f.processor.set_session(session);

        let outcome = f.handler.handle(cmd(42, "cs_1")).await;

        assert_eq!(
            outcome,
            RedirectOutcome::Rejected(ReturnRejection::MissingPaymentIntent)
        );
    }

    #[tokio::test]
    async fn intent_not_succeeded_rejected() {
        let f = fixture();
        f.processor.set_session(paid_session("cs_1", "pi_1"));
        let mut intent = succeeded_intent("pi_1", 1999);
        intent.status = "processing".to_string();
        f.processor.set_intent(intent);

        let outcome = f.handler.handle(cmd(42, "cs_1")).await;

        assert_eq!(
            outcome,
            RedirectOutcome::Rejected(ReturnRejection::IntentNotSucceeded)
        );
        assert!(f.ledger.entries().is_empty());
    }

    #[tokio::test]
    async fn processor_failure_rejects_with_api_error() {
        let f = fixture();
        f.processor.set_error(ProcessorError::network("timeout"));

        let outcome = f.handler.handle(cmd(42, "cs_1")).await;

        assert_eq!(outcome, RedirectOutcome::Rejected(ReturnRejection::ApiError));
    }

    // ══════════════════════════════════════════════════════════════
    // Recording
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn end_to_end_records_amount_and_fee() {
        let f = fixture();
        f.processor.set_session(paid_session("cs_1", "pi_1"));

        let mut intent = succeeded_intent("pi_1", 1999);
        intent.latest_charge = Some(Expandable::Object(Box::new(Charge {
            id: "ch_1".to_string(),
            amount: 1999,
            amount_captured: 1999,
            application_fee_amount: None,
            balance_transaction: Some(Expandable::Object(Box::new(BalanceTransaction {
                id: "txn_1".to_string(),
                amount: 1999,
                fee: 88,
                net: 1911,
                status: "available".to_string(),
            }))),
        })));
        f.processor.set_intent(intent);

        let outcome = f.handler.handle(cmd(100, "cs_1")).await;

        assert_eq!(outcome, RedirectOutcome::PaymentRecorded { invoice_id: 100 });
        let entries = f.ledger.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].invoice_id, 100);
        assert_eq!(entries[0].transaction_id, "pi_1");
        assert_eq!(entries[0].amount, 19.99);
        assert_eq!(entries[0].fee, 0.88);
        assert_eq!(entries[0].gateway, "stripe");
    }

    #[tokio::test]
    async fn duplicate_transaction_maps_to_already_paid() {
        let f = fixture();
        f.processor.set_session(paid_session("cs_1", "pi_1"));
        f.processor.set_intent(succeeded_intent("pi_1", 1999));

        let first = f.handler.handle(cmd(42, "cs_1")).await;
        // The ledger marks the invoice paid, so the refresh short-circuits.
        let second = f.handler.handle(cmd(42, "cs_1")).await;

        assert_eq!(first, RedirectOutcome::PaymentRecorded { invoice_id: 42 });
        assert_eq!(second, RedirectOutcome::AlreadyPaid { invoice_id: 42 });
        assert_eq!(f.ledger.entries().len(), 1);
    }

    #[tokio::test]
    async fn intent_without_charge_records_zero_fee() {
        let f = fixture();
        f.processor.set_session(paid_session("cs_1", "pi_1"));
        f.processor.set_intent(succeeded_intent("pi_1", 500));

        let outcome = f.handler.handle(cmd(7, "cs_1")).await;

        assert_eq!(outcome, RedirectOutcome::PaymentRecorded { invoice_id: 7 });
        assert_eq!(f.ledger.entries()[0].fee, 0.0);
    }

    #[tokio::test]
    async fn mismatched_session_mapping_is_advisory_only() {
        let f = fixture();
        f.sessions
            .seed(42, "cs_issued", 1999, "usd")
            .await;
        f.processor.set_session(paid_session("cs_other", "pi_1"));
        f.processor.set_intent(succeeded_intent("pi_1", 1999));

        // Mapping mismatch is logged but must not block recording.
        let outcome = f.handler.handle(cmd(42, "cs_other")).await;

        assert_eq!(outcome, RedirectOutcome::PaymentRecorded { invoice_id: 42 });
    }
}
