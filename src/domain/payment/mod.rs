//! Payment domain module.
//!
//! Pure verification logic for processor-pushed events and the shared
//! vocabulary of the two confirmation flows.
//!
//! # Module Structure
//!
//! - `signature` - Webhook signature verification (HMAC-SHA256)
//! - `event` - Webhook event envelope and type dispatch
//! - `errors` - Transport-level rejection taxonomy

mod errors;
mod event;
mod signature;

pub use errors::WebhookError;
pub use event::{EventKind, StripeEvent, StripeEventData};
pub use signature::{SignatureHeader, WebhookVerifier};

#[cfg(test)]
pub use signature::compute_test_signature;

/// Convert an integer minor-unit amount (cents) to the major-unit decimal
/// the ledger records.
pub fn minor_to_major(minor: i64) -> f64 {
    minor as f64 / 100.0
}
