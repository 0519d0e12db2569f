//! In-memory port implementations.
//!
//! Used throughout the test suite; the ledger enforces the same
//! `(invoice_id, transaction_id)` uniqueness contract as the real
//! storage layer so race behavior can be exercised without a database.

mod invoice_ledger;
mod session_store;

pub use invoice_ledger::InMemoryInvoiceLedger;
pub use session_store::InMemorySessionStore;
