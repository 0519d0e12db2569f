//! Paybridge - Stripe Checkout payment confirmation bridge
//!
//! Verifies hosted-checkout payments (synchronous browser return and
//! asynchronous webhooks) and records them against an invoice ledger
//! exactly once, even under concurrent or repeated delivery.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
