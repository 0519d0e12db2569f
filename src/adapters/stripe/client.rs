//! Stripe API client.
//!
//! Talks HTTP to the Stripe API: form-encoded request bodies, basic auth
//! with the secret key, JSON responses decoded into the port types.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::config::GatewayConfig;
use crate::ports::{
    BalanceTransaction, CheckoutSession, CreateCheckoutSessionRequest, PaymentIntent,
    ProcessorClient, ProcessorError,
};

/// Per-request network timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Stripe implementation of the [`ProcessorClient`] port.
pub struct StripeProcessorClient {
    api_key: SecretString,
    api_base_url: String,
    http_client: reqwest::Client,
}

impl StripeProcessorClient {
    /// Create a client with the given secret API key.
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: "https://api.stripe.com".to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Create a client from gateway configuration (mode-selected key).
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.active_secret_key().clone())
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProcessorError> {
        let url = format!("{}{}", self.api_base_url, path);

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.api_key.expose_secret(), Option::<&str>::None)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| ProcessorError::network(e.to_string()))?;

        decode_response(response).await
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ProcessorError> {
        let url = format!("{}{}", self.api_base_url, path);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.api_key.expose_secret(), Option::<&str>::None)
            .timeout(REQUEST_TIMEOUT)
            .form(params)
            .send()
            .await
            .map_err(|e| ProcessorError::network(e.to_string()))?;

        decode_response(response).await
    }
}

async fn decode_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProcessorError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), body = %body, "processor API call failed");
        return Err(ProcessorError::api(status.as_u16(), body));
    }

    response
        .json()
        .await
        .map_err(|e| ProcessorError::invalid_response(e.to_string()))
}

/// Form parameters for the checkout-session creation call.
fn build_checkout_form(request: &CreateCheckoutSessionRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("mode", "payment".to_string()),
        ("payment_method_types[]", "card".to_string()),
        ("success_url", request.success_url.clone()),
        ("cancel_url", request.cancel_url.clone()),
        (
            "line_items[0][price_data][currency]",
            request.currency.clone(),
        ),
        (
            "line_items[0][price_data][unit_amount]",
            request.amount_minor.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]",
            request.description.clone(),
        ),
        ("line_items[0][quantity]", "1".to_string()),
        ("metadata[invoice_id]", request.invoice_id.to_string()),
    ];

    if let Some(email) = &request.customer_email {
        params.push(("customer_email", email.clone()));
    }

    params
}

#[async_trait]
impl ProcessorClient for StripeProcessorClient {
    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, ProcessorError> {
        self.get_json(&format!("/v1/checkout/sessions/{}", session_id))
            .await
    }

    async fn retrieve_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<PaymentIntent, ProcessorError> {
        // Expanding the latest charge gives the fee resolver its
        // settlement reference without a second round trip.
        self.get_json(&format!(
            "/v1/payment_intents/{}?expand[]=latest_charge",
            payment_intent_id
        ))
        .await
    }

    async fn retrieve_balance_transaction(
        &self,
        balance_transaction_id: &str,
    ) -> Result<BalanceTransaction, ProcessorError> {
        self.get_json(&format!(
            "/v1/balance_transactions/{}",
            balance_transaction_id
        ))
        .await
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession, ProcessorError> {
        let params = build_checkout_form(&request);
        self.post_form("/v1/checkout/sessions", &params).await
    }
}
