//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the confirmation flows and the outside world. Adapters implement them.
//!
//! - `InvoiceLedger` - the billing system's payment ledger (duplicate
//!   suppression lives behind its uniqueness constraint)
//! - `ProcessorClient` - the payment processor's API (sessions, intents,
//!   balance transactions)
//! - `SessionStore` - advisory checkout-session mapping, diagnostics only

mod invoice_ledger;
mod processor_client;
mod session_store;

pub use invoice_ledger::{InvoiceLedger, InvoiceStatus, LedgerError, PaymentRecord};
pub use processor_client::{
    BalanceTransaction, Charge, CheckoutSession, CreateCheckoutSessionRequest, Expandable,
    PaymentIntent, ProcessorClient, ProcessorError,
};
pub use session_store::{SessionRecord, SessionStore, SessionStoreError};
