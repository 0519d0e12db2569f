//! Stripe processor adapter.
//!
//! Implements the `ProcessorClient` port against the Stripe REST API:
//! checkout sessions, payment intents and balance transactions.
//!
//! # Security
//!
//! - The secret API key is handled via `secrecy::SecretString`
//! - Webhook signature verification lives in the domain layer; this
//!   adapter only performs authenticated API calls

mod client;
mod mock_processor;

pub use client::StripeProcessorClient;
pub use mock_processor::{MethodCall, MockProcessorClient};
