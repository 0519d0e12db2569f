//! HTTP handlers for the gateway endpoints.
//!
//! These handlers bundle the request into an immutable command, invoke
//! the corresponding application handler and translate its outcome into
//! an HTTP response. No business decisions are made here.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use secrecy::ExposeSecret;

use crate::application::handlers::payment::{
    CheckoutError, CreateCheckoutCommand, CreateCheckoutHandler, HandleReturnCommand,
    HandleReturnHandler, HandleWebhookCommand, HandleWebhookHandler, RedirectOutcome,
};
use crate::config::GatewayConfig;
use crate::ports::{InvoiceLedger, ProcessorClient, SessionStore};

use super::dto::{CheckoutRequest, CheckoutResponse, ErrorResponse, ReturnParams, WebhookAck};

/// Header carrying the processor's webhook signature.
const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Shared application state containing all gateway dependencies.
///
/// Cloned per request; dependencies are Arc-wrapped for cheap sharing.
#[derive(Clone)]
pub struct GatewayAppState {
    pub ledger: Arc<dyn InvoiceLedger>,
    pub processor: Arc<dyn ProcessorClient>,
    pub sessions: Arc<dyn SessionStore>,
    pub config: GatewayConfig,
}

impl GatewayAppState {
    /// Create handlers on demand from the shared state.
    pub fn return_handler(&self) -> HandleReturnHandler {
        HandleReturnHandler::new(
            self.ledger.clone(),
            self.processor.clone(),
            self.sessions.clone(),
            self.config.gateway_name.clone(),
        )
    }

    pub fn webhook_handler(&self) -> HandleWebhookHandler {
        let secret = self
            .config
            .has_webhook_secret()
            .then(|| self.config.webhook_secret.expose_secret().to_string());
        HandleWebhookHandler::new(
            self.ledger.clone(),
            self.processor.clone(),
            secret,
            self.config.gateway_name.clone(),
        )
    }

    pub fn checkout_handler(&self) -> CreateCheckoutHandler {
        CreateCheckoutHandler::new(
            self.processor.clone(),
            self.sessions.clone(),
            self.config.clone(),
        )
    }
}

/// `GET /gateway/return` - the payer's browser returning from checkout.
///
/// Always answers with a redirect once the action parameter matches;
/// verification failures redirect to the cart with the error flag.
pub async fn handle_return(
    State(state): State<GatewayAppState>,
    Query(params): Query<ReturnParams>,
) -> Response {
    if params.action.as_deref() != Some("return") {
        return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
    }

    let cmd = HandleReturnCommand {
        invoice_id: params.invoice.unwrap_or(0),
        session_id: params.session_id.unwrap_or_default(),
    };

    let outcome = state.return_handler().handle(cmd).await;
    let target = match outcome {
        RedirectOutcome::PaymentRecorded { invoice_id } => {
            state.config.invoice_success_url(invoice_id)
        }
        RedirectOutcome::AlreadyPaid { invoice_id } => state.config.invoice_view_url(invoice_id),
        RedirectOutcome::Rejected(_) => state.config.cart_url(true),
    };

    Redirect::to(&target).into_response()
}

/// `POST /gateway/webhook` - processor-pushed events.
///
/// 200 with an acknowledgment body for every signature-valid event;
/// 400/403 for transport-level rejections.
pub async fn handle_webhook(
    State(state): State<GatewayAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let cmd = HandleWebhookCommand {
        payload: body.to_vec(),
        signature,
    };

    match state.webhook_handler().handle(cmd).await {
        Ok(outcome) => (StatusCode::OK, Json(WebhookAck::from(&outcome))).into_response(),
        Err(err) => (
            err.status_code(),
            Json(ErrorResponse::new("webhook_rejected", err.to_string())),
        )
            .into_response(),
    }
}

/// `POST /gateway/checkout` - create a hosted checkout session.
pub async fn create_checkout(
    State(state): State<GatewayAppState>,
    Json(request): Json<CheckoutRequest>,
) -> Response {
    let cmd = CreateCheckoutCommand {
        invoice_id: request.invoice_id,
        amount_minor: request.amount_minor,
        currency: request.currency,
        customer_email: request.customer_email,
    };

    match state.checkout_handler().handle(cmd).await {
        Ok(created) => (
            StatusCode::OK,
            Json(CheckoutResponse {
                session_id: created.session_id,
                url: created.url,
            }),
        )
            .into_response(),
        Err(CheckoutError::InvalidRequest(reason)) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("invalid_request", reason)),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "checkout session creation failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse::new("checkout_failed", err.to_string())),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryInvoiceLedger, InMemorySessionStore};
    use crate::adapters::stripe::MockProcessorClient;
    use crate::domain::payment::compute_test_signature;
    use axum::body::Body;
    use axum::http::{header, Request};
    use secrecy::SecretString;
    use tower::util::ServiceExt;

    const SECRET: &str = "whsec_http_test";

    fn test_state() -> GatewayAppState {
        GatewayAppState {
            ledger: Arc::new(InMemoryInvoiceLedger::new()),
            processor: Arc::new(MockProcessorClient::new()),
            sessions: Arc::new(InMemorySessionStore::new()),
            config: GatewayConfig {
                test_secret_key: SecretString::new("sk_test_x".to_string()),
                webhook_secret: SecretString::new(SECRET.to_string()),
                base_url: "https://billing.example.com".to_string(),
                ..Default::default()
            },
        }
    }

    fn app() -> axum::Router {
        super::super::routes::gateway_router(test_state())
    }

    async fn send(request: Request<Body>) -> axum::response::Response {
        app().oneshot(request).await.unwrap()
    }

    fn location(response: &axum::response::Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn return_without_action_is_bad_request() {
        let response = send(
            Request::builder()
                .uri("/gateway/return?invoice=42&session_id=cs_1")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn return_with_invalid_params_redirects_to_cart_error() {
        let response = send(
            Request::builder()
                .uri("/gateway/return?action=return&invoice=0&session_id=cs_1")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            location(&response),
            "https://billing.example.com/cart?payment=error"
        );
    }

    #[tokio::test]
    async fn return_with_verified_payment_redirects_to_invoice_success() {
        use crate::ports::{CheckoutSession, PaymentIntent};

        let state = test_state();
        let processor = Arc::new(MockProcessorClient::new());
        processor.set_session(CheckoutSession {
            id: "cs_1".to_string(),
            payment_status: "paid".to_string(),
            payment_intent: Some("pi_1".to_string()),
            ..Default::default()
        });
        processor.set_intent(PaymentIntent {
            id: "pi_1".to_string(),
            status: "succeeded".to_string(),
            amount: 1999,
            amount_received: Some(1999),
            currency: "usd".to_string(),
            ..Default::default()
        });
        let state = GatewayAppState {
            processor,
            ..state
        };

        let response = super::super::routes::gateway_router(state)
            .oneshot(
                Request::builder()
                    .uri("/gateway/return?action=return&invoice=100&session_id=cs_1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            location(&response),
            "https://billing.example.com/invoices/100?payment=success"
        );
    }

    #[tokio::test]
    async fn webhook_without_signature_header_is_bad_request() {
        let response = send(
            Request::builder()
                .method("POST")
                .uri("/gateway/webhook")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn webhook_with_bad_signature_is_forbidden() {
        let timestamp = chrono::Utc::now().timestamp();
        let response = send(
            Request::builder()
                .method("POST")
                .uri("/gateway/webhook")
                .header(SIGNATURE_HEADER, format!("t={},v1={}", timestamp, "a".repeat(64)))
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn webhook_with_unknown_event_acknowledges_200() {
        let payload = serde_json::json!({
            "id": "evt_u",
            "type": "customer.updated",
            "created": chrono::Utc::now().timestamp(),
            "data": {"object": {}},
            "livemode": false
        })
        .to_string();
        let timestamp = chrono::Utc::now().timestamp();
        let signature = format!(
            "t={},v1={}",
            timestamp,
            compute_test_signature(SECRET, timestamp, &payload)
        );

        let response = send(
            Request::builder()
                .method("POST")
                .uri("/gateway/webhook")
                .header(SIGNATURE_HEADER, signature)
                .body(Body::from(payload))
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn checkout_returns_session_url() {
        let response = send(
            Request::builder()
                .method("POST")
                .uri("/gateway/checkout")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "invoice_id": 42,
                        "amount_minor": 1999,
                        "currency": "usd"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
    }
}
