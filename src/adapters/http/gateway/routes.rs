//! Axum router configuration for the gateway endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{create_checkout, handle_return, handle_webhook, GatewayAppState};

/// Gateway route set, to be nested under `/gateway`.
///
/// # Routes
///
/// - `GET /return` - browser return from hosted checkout (redirects)
/// - `POST /webhook` - processor webhooks (no auth, signature verified)
/// - `POST /checkout` - create a hosted checkout session
pub fn gateway_routes() -> Router<GatewayAppState> {
    Router::new()
        .route("/return", get(handle_return))
        .route("/webhook", post(handle_webhook))
        .route("/checkout", post(create_checkout))
}

/// Complete gateway router with state applied.
pub fn gateway_router(state: GatewayAppState) -> Router {
    Router::new()
        .nest("/gateway", gateway_routes())
        .with_state(state)
}
