//! PostgreSQL adapters for the billing database.

mod invoice_ledger;
mod session_store;

pub use invoice_ledger::PostgresInvoiceLedger;
pub use session_store::PostgresSessionStore;
