//! In-memory invoice ledger.
//!
//! Mirrors the real ledger's contract: the duplicate check and insert
//! happen under one lock, so a concurrent second insert for the same
//! `(invoice_id, transaction_id)` pair fails with `DuplicateEntry`
//! exactly like a unique constraint would. Supports error injection for
//! failure-path tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ports::{InvoiceLedger, InvoiceStatus, LedgerError, PaymentRecord};

#[derive(Default)]
struct LedgerState {
    statuses: HashMap<i64, InvoiceStatus>,
    entries: Vec<PaymentRecord>,
    next_record_error: Option<LedgerError>,
    record_calls: usize,
}

/// In-memory implementation of [`InvoiceLedger`].
#[derive(Default)]
pub struct InMemoryInvoiceLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryInvoiceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an invoice's status ahead of a test.
    pub fn set_status(&self, invoice_id: i64, status: InvoiceStatus) {
        self.state.lock().unwrap().statuses.insert(invoice_id, status);
    }

    /// Make the next `record_payment` call fail with the given error.
    pub fn fail_next_record(&self, error: LedgerError) {
        self.state.lock().unwrap().next_record_error = Some(error);
    }

    /// Snapshot of all recorded entries.
    pub fn entries(&self) -> Vec<PaymentRecord> {
        self.state.lock().unwrap().entries.clone()
    }

    /// How many times `record_payment` was invoked.
    pub fn record_calls(&self) -> usize {
        self.state.lock().unwrap().record_calls
    }
}

#[async_trait]
impl InvoiceLedger for InMemoryInvoiceLedger {
    async fn record_payment(&self, payment: &PaymentRecord) -> Result<(), LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.record_calls += 1;

        if let Some(error) = state.next_record_error.take() {
            return Err(error);
        }

        let duplicate = state.entries.iter().any(|entry| {
            entry.invoice_id == payment.invoice_id
                && entry.transaction_id == payment.transaction_id
        });
        if duplicate {
            return Err(LedgerError::DuplicateEntry);
        }

        state.entries.push(payment.clone());
        // Applying a payment settles the invoice, as the billing system does.
        state.statuses.insert(payment.invoice_id, InvoiceStatus::Paid);
        Ok(())
    }

    async fn invoice_status(&self, invoice_id: i64) -> Result<InvoiceStatus, LedgerError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .statuses
            .get(&invoice_id)
            .copied()
            .unwrap_or(InvoiceStatus::Unpaid))
    }

    async fn payment_already_recorded(
        &self,
        invoice_id: i64,
        transaction_id: &str,
    ) -> Result<bool, LedgerError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .entries
            .iter()
            .any(|entry| entry.invoice_id == invoice_id && entry.transaction_id == transaction_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(invoice_id: i64, transaction_id: &str) -> PaymentRecord {
        PaymentRecord {
            invoice_id,
            transaction_id: transaction_id.to_string(),
            amount: 10.0,
            fee: 0.3,
            gateway: "stripe".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_then_duplicate_is_rejected() {
        let ledger = InMemoryInvoiceLedger::new();

        ledger.record_payment(&record(1, "pi_a")).await.unwrap();
        let second = ledger.record_payment(&record(1, "pi_a")).await;

        assert!(matches!(second, Err(LedgerError::DuplicateEntry)));
        assert_eq!(ledger.entries().len(), 1);
    }

    #[tokio::test]
    async fn recording_settles_the_invoice() {
        let ledger = InMemoryInvoiceLedger::new();
        assert_eq!(
            ledger.invoice_status(1).await.unwrap(),
            InvoiceStatus::Unpaid
        );

        ledger.record_payment(&record(1, "pi_a")).await.unwrap();

        assert_eq!(ledger.invoice_status(1).await.unwrap(), InvoiceStatus::Paid);
        assert!(ledger.payment_already_recorded(1, "pi_a").await.unwrap());
        assert!(!ledger.payment_already_recorded(1, "pi_b").await.unwrap());
    }
}
