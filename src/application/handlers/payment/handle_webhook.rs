//! HandleWebhookHandler - asynchronous confirmation pushed by the
//! processor.
//!
//! Transport-level rejections (missing secret, bad signature, stale
//! timestamp, malformed payload) surface as errors and map to non-200
//! status. Everything after a valid signature is acknowledged with 200:
//! the processor's retry policy keys off HTTP status, and a permanent
//! business failure must not trigger a redelivery storm.

use std::sync::Arc;

use crate::domain::payment::{minor_to_major, EventKind, StripeEvent, WebhookError, WebhookVerifier};
use crate::ports::{CheckoutSession, InvoiceLedger, PaymentIntent, ProcessorClient};

use super::record_payment::{PaymentRecorder, RecordOutcome};
use super::resolve_fee::FeeResolver;

/// Command carrying the raw webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleWebhookCommand {
    /// Raw request body, exactly as received (the signature covers it).
    pub payload: Vec<u8>,
    /// `Stripe-Signature` header value.
    pub signature: String,
}

/// Result of processing a signature-valid webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// A new ledger entry was written.
    Recorded {
        invoice_id: i64,
        transaction_id: String,
    },
    /// The payment was already on the ledger; no-op.
    AlreadyRecorded {
        invoice_id: i64,
        transaction_id: String,
    },
    /// Recognized event that could not be acted on; logged and
    /// acknowledged so the processor does not redeliver.
    Acknowledged { reason: &'static str },
    /// Event type this gateway does not act on.
    Ignored { event_type: String },
}

/// Handler for processor-pushed webhook events.
pub struct HandleWebhookHandler {
    verifier: Option<WebhookVerifier>,
    processor: Arc<dyn ProcessorClient>,
    recorder: PaymentRecorder,
    fee_resolver: FeeResolver,
    gateway_name: String,
}

impl HandleWebhookHandler {
    /// `webhook_secret` may be `None` (or empty) when the deployment has
    /// not configured one; deliveries are then rejected with
    /// [`WebhookError::MissingSecret`].
    pub fn new(
        ledger: Arc<dyn InvoiceLedger>,
        processor: Arc<dyn ProcessorClient>,
        webhook_secret: Option<String>,
        gateway_name: impl Into<String>,
    ) -> Self {
        let verifier = webhook_secret
            .filter(|secret| !secret.is_empty())
            .map(WebhookVerifier::new);

        Self {
            verifier,
            recorder: PaymentRecorder::new(ledger),
            fee_resolver: FeeResolver::new(processor.clone()),
            processor,
            gateway_name: gateway_name.into(),
        }
    }

    /// Verify and dispatch one webhook delivery.
    ///
    /// # Errors
    ///
    /// Only transport-level rejections; see [`WebhookError::status_code`]
    /// for the HTTP mapping.
    pub async fn handle(&self, cmd: HandleWebhookCommand) -> Result<WebhookOutcome, WebhookError> {
        let verifier = self.verifier.as_ref().ok_or_else(|| {
            tracing::warn!("webhook delivery rejected: no signing secret configured");
            WebhookError::MissingSecret
        })?;

        let event = verifier
            .verify_and_parse(&cmd.payload, &cmd.signature)
            .map_err(|err| {
                tracing::warn!(error = %err, "webhook signature verification failed");
                err
            })?;

        tracing::debug!(event_id = %event.id, event_type = %event.event_type, "webhook verified");

        match event.kind() {
            EventKind::CheckoutSessionCompleted => self.on_checkout_completed(&event).await,
            EventKind::PaymentIntentSucceeded => self.on_payment_intent_succeeded(&event).await,
            EventKind::Unknown => {
                tracing::debug!(event_type = %event.event_type, "ignoring unhandled event type");
                Ok(WebhookOutcome::Ignored {
                    event_type: event.event_type.clone(),
                })
            }
        }
    }

    /// Primary confirmation path: the hosted session completed.
    ///
    /// The session payload's amount is never trusted alone; the payment
    /// intent is re-retrieved from the processor to confirm it succeeded
    /// and to read the settled amount.
    async fn on_checkout_completed(
        &self,
        event: &StripeEvent,
    ) -> Result<WebhookOutcome, WebhookError> {
        let session: CheckoutSession = match event.deserialize_object() {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(event_id = %event.id, error = %err, "undecodable session object");
                return Ok(WebhookOutcome::Acknowledged {
                    reason: "undecodable_session",
                });
            }
        };

        let invoice_id = match session.invoice_id() {
            Some(id) => id,
            None => {
                tracing::warn!(
                    event_id = %event.id,
                    session_id = %session.id,
                    "session carries no invoice metadata"
                );
                return Ok(WebhookOutcome::Acknowledged {
                    reason: "missing_invoice_metadata",
                });
            }
        };

        let payment_intent_id = match session.payment_intent.as_deref() {
            Some(id) => id,
            None => {
                tracing::warn!(
                    event_id = %event.id,
                    invoice_id,
                    session_id = %session.id,
                    "completed session without payment intent"
                );
                return Ok(WebhookOutcome::Acknowledged {
                    reason: "missing_payment_intent",
                });
            }
        };

        let intent = match self.processor.retrieve_payment_intent(payment_intent_id).await {
            Ok(intent) => intent,
            Err(err) => {
                tracing::warn!(
                    event_id = %event.id,
                    invoice_id,
                    transaction_id = %payment_intent_id,
                    error = %err,
                    "payment intent retrieval failed"
                );
                return Ok(WebhookOutcome::Acknowledged { reason: "api_error" });
            }
        };

        if !intent.has_succeeded() {
            tracing::warn!(
                event_id = %event.id,
                invoice_id,
                transaction_id = %intent.id,
                status = %intent.status,
                "payment intent not succeeded"
            );
            return Ok(WebhookOutcome::Acknowledged {
                reason: "intent_not_succeeded",
            });
        }

        Ok(self.record_confirmed(invoice_id, &intent).await)
    }

    /// Fallback confirmation path, in case the session-completed event
    /// was missed. Uses the intent object from the payload directly.
    async fn on_payment_intent_succeeded(
        &self,
        event: &StripeEvent,
    ) -> Result<WebhookOutcome, WebhookError> {
        let intent: PaymentIntent = match event.deserialize_object() {
            Ok(intent) => intent,
            Err(err) => {
                tracing::warn!(event_id = %event.id, error = %err, "undecodable intent object");
                return Ok(WebhookOutcome::Acknowledged {
                    reason: "undecodable_intent",
                });
            }
        };

        let invoice_id = match intent.invoice_id() {
            Some(id) => id,
            None => {
                // Intents created outside this gateway carry no invoice
                // metadata; nothing to record.
                tracing::debug!(
                    event_id = %event.id,
                    transaction_id = %intent.id,
                    "intent carries no invoice metadata"
                );
                return Ok(WebhookOutcome::Acknowledged {
                    reason: "missing_invoice_metadata",
                });
            }
        };

        if !intent.has_succeeded() {
            tracing::warn!(
                event_id = %event.id,
                invoice_id,
                transaction_id = %intent.id,
                status = %intent.status,
                "intent event without succeeded status"
            );
            return Ok(WebhookOutcome::Acknowledged {
                reason: "intent_not_succeeded",
            });
        }

        Ok(self.record_confirmed(invoice_id, &intent).await)
    }

    /// Shared tail of both paths: resolve the fee and write the ledger
    /// entry, folding every failure into an acknowledged outcome.
    async fn record_confirmed(&self, invoice_id: i64, intent: &PaymentIntent) -> WebhookOutcome {
        let amount = minor_to_major(intent.settled_amount_minor());
        let fee = match intent.charge() {
            Some(charge) => minor_to_major(self.fee_resolver.resolve(charge).await.fee_minor),
            None => 0.0,
        };

        match self
            .recorder
            .record(invoice_id, &intent.id, amount, fee, &self.gateway_name)
            .await
        {
            Ok(RecordOutcome::Recorded) => WebhookOutcome::Recorded {
                invoice_id,
                transaction_id: intent.id.clone(),
            },
            Ok(RecordOutcome::AlreadyRecorded) => WebhookOutcome::AlreadyRecorded {
                invoice_id,
                transaction_id: intent.id.clone(),
            },
            Err(err) => {
                tracing::warn!(
                    invoice_id,
                    transaction_id = %intent.id,
                    error = %err,
                    "ledger write failed; acknowledging to avoid redelivery storm"
                );
                WebhookOutcome::Acknowledged {
                    reason: "recording_failed",
                }
            }
        }
    }
}
