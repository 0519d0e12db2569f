//! PaymentRecorder - idempotent ledger writes.
//!
//! Turns a verified payment fact into exactly one ledger entry per
//! `(invoice_id, transaction_id)` pair, whichever flow gets there first.

use std::sync::Arc;

use crate::ports::{InvoiceLedger, LedgerError, PaymentRecord};

/// Result of a recording attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A new ledger entry was written.
    Recorded,
    /// An entry for this pair already existed; nothing was written.
    AlreadyRecorded,
}

/// Idempotent recorder for confirmed payments.
///
/// The pre-check keeps the common redelivery case cheap; the ledger's
/// uniqueness constraint is what actually closes the race window, so a
/// duplicate-insert rejection from the write is folded into
/// [`RecordOutcome::AlreadyRecorded`].
pub struct PaymentRecorder {
    ledger: Arc<dyn InvoiceLedger>,
}

impl PaymentRecorder {
    pub fn new(ledger: Arc<dyn InvoiceLedger>) -> Self {
        Self { ledger }
    }

    /// Record a payment against an invoice.
    ///
    /// Amounts are major currency units.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` only for storage failures; a duplicate entry
    /// is an expected outcome, never an error.
    pub async fn record(
        &self,
        invoice_id: i64,
        transaction_id: &str,
        amount: f64,
        fee: f64,
        gateway: &str,
    ) -> Result<RecordOutcome, LedgerError> {
        if self
            .ledger
            .payment_already_recorded(invoice_id, transaction_id)
            .await?
        {
            tracing::info!(invoice_id, transaction_id, "payment already recorded, skipping");
            return Ok(RecordOutcome::AlreadyRecorded);
        }

        let record = PaymentRecord {
            invoice_id,
            transaction_id: transaction_id.to_string(),
            amount,
            fee,
            gateway: gateway.to_string(),
        };

        match self.ledger.record_payment(&record).await {
            Ok(()) => {
                tracing::info!(invoice_id, transaction_id, amount, fee, "payment recorded");
                Ok(RecordOutcome::Recorded)
            }
            Err(err) if err.is_duplicate() => {
                // Lost a race with a concurrent delivery of the same payment.
                tracing::info!(invoice_id, transaction_id, "concurrent recording detected");
                Ok(RecordOutcome::AlreadyRecorded)
            }
            Err(err) => {
                tracing::warn!(invoice_id, transaction_id, error = %err, "recording failed");
                Err(err)
            }
        }
    }
}
