//! Gateway HTTP endpoints.
//!
//! - `GET  /gateway/return` - browser return from hosted checkout
//! - `POST /gateway/webhook` - processor-pushed events (signature verified)
//! - `POST /gateway/checkout` - create a hosted checkout session

mod dto;
mod handlers;
mod routes;

pub use dto::{CheckoutRequest, CheckoutResponse, ErrorResponse, WebhookAck};
pub use handlers::GatewayAppState;
pub use routes::{gateway_router, gateway_routes};
