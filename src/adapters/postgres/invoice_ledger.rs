//! PostgreSQL implementation of the invoice ledger port.
//!
//! Writes payment entries into the billing database. The
//! `(invoice_id, transaction_id)` unique index on `gateway_payments` is
//! the source of truth for duplicate suppression: a violation surfaces
//! as [`LedgerError::DuplicateEntry`], which callers treat as the
//! expected lost-race outcome.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::ports::{InvoiceLedger, InvoiceStatus, LedgerError, PaymentRecord};

/// PostgreSQL unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL implementation of the [`InvoiceLedger`] port.
pub struct PostgresInvoiceLedger {
    pool: PgPool,
}

impl PostgresInvoiceLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvoiceLedger for PostgresInvoiceLedger {
    async fn record_payment(&self, payment: &PaymentRecord) -> Result<(), LedgerError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        sqlx::query(
            "INSERT INTO gateway_payments \
             (invoice_id, transaction_id, amount_in, fee, amount_out, gateway) \
             VALUES ($1, $2, $3, $4, 0, $5)",
        )
        .bind(payment.invoice_id)
        .bind(&payment.transaction_id)
        .bind(payment.amount)
        .bind(payment.fee)
        .bind(&payment.gateway)
        .execute(&mut *tx)
        .await
        .map_err(map_insert_error)?;

        // Applying a payment settles the invoice.
        sqlx::query("UPDATE invoices SET status = 'paid' WHERE id = $1")
            .bind(payment.invoice_id)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)
    }

    async fn invoice_status(&self, invoice_id: i64) -> Result<InvoiceStatus, LedgerError> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM invoices WHERE id = $1")
                .bind(invoice_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_error)?;

        match status {
            Some(value) => Ok(parse_invoice_status(&value)),
            None => Err(LedgerError::InvoiceNotFound(invoice_id)),
        }
    }

    async fn payment_already_recorded(
        &self,
        invoice_id: i64,
        transaction_id: &str,
    ) -> Result<bool, LedgerError> {
        sqlx::query_scalar(
            "SELECT EXISTS( \
               SELECT 1 FROM gateway_payments \
               WHERE invoice_id = $1 AND transaction_id = $2 AND amount_out = 0)",
        )
        .bind(invoice_id)
        .bind(transaction_id)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)
    }
}

fn storage_error(err: sqlx::Error) -> LedgerError {
    LedgerError::Storage(err.to_string())
}

fn map_insert_error(err: sqlx::Error) -> LedgerError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return LedgerError::DuplicateEntry;
        }
    }
    storage_error(err)
}

fn parse_invoice_status(value: &str) -> InvoiceStatus {
    match value.to_lowercase().as_str() {
        "paid" => InvoiceStatus::Paid,
        "unpaid" | "open" | "draft" => InvoiceStatus::Unpaid,
        "cancelled" | "canceled" => InvoiceStatus::Cancelled,
        _ => InvoiceStatus::Unknown,
    }
}
