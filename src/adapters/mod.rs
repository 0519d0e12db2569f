//! Adapters - implementations of the ports.
//!
//! - `stripe` - processor API client (plus a configurable mock)
//! - `postgres` - billing-database ledger and session-store adapters
//! - `memory` - in-memory adapters used by tests
//! - `http` - axum endpoints for the return, webhook and checkout flows

pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
