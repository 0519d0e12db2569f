//! Advisory checkout-session mapping port.
//!
//! Records which checkout session was issued for which invoice, for
//! reconciliation and diagnostics. Verification always re-queries the
//! processor as the source of truth; nothing here is consulted for
//! correctness decisions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Mapping from an invoice to the checkout session created for it.
///
/// Written once at session-creation time, read-only afterward.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    /// Billing system's invoice identifier.
    pub invoice_id: i64,

    /// Processor session identifier (cs_xxx).
    pub session_id: String,

    /// Amount due at creation time, minor units.
    pub amount_minor: i64,

    /// ISO currency code.
    pub currency: String,

    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

/// Errors from the session store.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("Session store error: {0}")]
    Storage(String),
}

/// Port for the advisory session-mapping table.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a session record. A later session for the same invoice
    /// replaces the earlier one (the payer may restart checkout).
    async fn save(&self, record: &SessionRecord) -> Result<(), SessionStoreError>;

    /// Most recent session recorded for an invoice.
    async fn find_by_invoice(
        &self,
        invoice_id: i64,
    ) -> Result<Option<SessionRecord>, SessionStoreError>;
}
