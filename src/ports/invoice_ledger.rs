//! Invoice ledger port.
//!
//! The ledger is owned by the surrounding billing system; this port is the
//! only way the gateway touches it. The ledger enforces the core
//! consistency invariant: at most one payment entry per
//! `(invoice_id, transaction_id)` pair. The gateway cannot assume
//! exclusive access, so a duplicate-insert rejection is an expected
//! outcome, not a failure.

use async_trait::async_trait;
use thiserror::Error;

/// A payment fact ready to be applied against an invoice.
///
/// Amounts are major currency units (the ledger's decimal contract);
/// conversion from integer minor units happens before this struct is
/// built.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRecord {
    /// Billing system's invoice identifier.
    pub invoice_id: i64,

    /// Processor transaction identifier (payment-intent id).
    pub transaction_id: String,

    /// Amount paid, major units.
    pub amount: f64,

    /// Processor fee withheld, major units.
    pub fee: f64,

    /// Gateway name recorded on the entry.
    pub gateway: String,
}

/// Invoice status as reported by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceStatus {
    /// Outstanding balance remains.
    Unpaid,

    /// Fully paid.
    Paid,

    /// Cancelled; payments should not be applied.
    Cancelled,

    /// Status value this gateway does not recognize.
    Unknown,
}

impl InvoiceStatus {
    /// True when no further payment should be collected.
    pub fn is_paid(&self) -> bool {
        matches!(self, InvoiceStatus::Paid)
    }
}

/// Errors from ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// An entry for this (invoice, transaction) pair already exists.
    ///
    /// Raised by the storage layer's uniqueness constraint when two
    /// flows race; callers treat it as success-no-op.
    #[error("Payment entry already exists")]
    DuplicateEntry,

    /// Referenced invoice does not exist.
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(i64),

    /// Underlying storage failed.
    #[error("Ledger storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// True for the expected lost-race outcome.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, LedgerError::DuplicateEntry)
    }
}

/// Port for the billing system's invoice payment ledger.
#[async_trait]
pub trait InvoiceLedger: Send + Sync {
    /// Apply a payment against an invoice.
    ///
    /// Implementations must enforce uniqueness of
    /// `(invoice_id, transaction_id)` atomically (unique constraint or
    /// equivalent transactional check-then-insert) and report a lost
    /// race as [`LedgerError::DuplicateEntry`].
    async fn record_payment(&self, payment: &PaymentRecord) -> Result<(), LedgerError>;

    /// Current status of an invoice.
    async fn invoice_status(&self, invoice_id: i64) -> Result<InvoiceStatus, LedgerError>;

    /// Whether a settled payment entry already exists for the pair.
    async fn payment_already_recorded(
        &self,
        invoice_id: i64,
        transaction_id: &str,
    ) -> Result<bool, LedgerError>;
}
