//! Payment gateway configuration (Stripe)

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Operating mode for the gateway.
///
/// Selects which secret key is used for processor API calls.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    #[default]
    Test,
    Live,
}

impl GatewayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayMode::Test => "test",
            GatewayMode::Live => "live",
        }
    }
}

/// Gateway configuration (Stripe Checkout + webhooks)
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Operating mode: selects the test or live secret key
    #[serde(default)]
    pub mode: GatewayMode,

    /// Stripe secret key for test mode (sk_test_...)
    #[serde(default = "empty_secret")]
    pub test_secret_key: SecretString,

    /// Stripe secret key for live mode (sk_live_...)
    #[serde(default = "empty_secret")]
    pub live_secret_key: SecretString,

    /// Webhook signing secret (whsec_...)
    ///
    /// May be left unset; webhook deliveries are then rejected with 400
    /// until it is configured.
    #[serde(default = "empty_secret")]
    pub webhook_secret: SecretString,

    /// Base URL of the billing system, used to build redirect targets
    pub base_url: String,

    /// Gateway name recorded on ledger entries
    #[serde(default = "default_gateway_name")]
    pub gateway_name: String,
}

impl GatewayConfig {
    /// Secret key for the active mode.
    pub fn active_secret_key(&self) -> &SecretString {
        match self.mode {
            GatewayMode::Test => &self.test_secret_key,
            GatewayMode::Live => &self.live_secret_key,
        }
    }

    /// True when a webhook signing secret has been configured.
    pub fn has_webhook_secret(&self) -> bool {
        !self.webhook_secret.expose_secret().is_empty()
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Invoice view page for a given invoice.
    pub fn invoice_view_url(&self, invoice_id: i64) -> String {
        format!("{}/invoices/{}", self.base(), invoice_id)
    }

    /// Invoice view page carrying the payment-success flag.
    pub fn invoice_success_url(&self, invoice_id: i64) -> String {
        format!("{}/invoices/{}?payment=success", self.base(), invoice_id)
    }

    /// Cart page, optionally carrying the payment-error flag.
    pub fn cart_url(&self, payment_error: bool) -> String {
        if payment_error {
            format!("{}/cart?payment=error", self.base())
        } else {
            format!("{}/cart", self.base())
        }
    }

    /// Return endpoint the processor redirects back to after checkout.
    ///
    /// The `{CHECKOUT_SESSION_ID}` placeholder is substituted by the
    /// processor when redirecting.
    pub fn checkout_return_url(&self, invoice_id: i64) -> String {
        format!(
            "{}/gateway/return?action=return&invoice={}&session_id={{CHECKOUT_SESSION_ID}}",
            self.base(),
            invoice_id
        )
    }

    /// Validate gateway configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let key = self.active_secret_key().expose_secret();
        if key.is_empty() {
            return Err(ValidationError::MissingRequired("gateway secret key"));
        }
        let expected_prefix = match self.mode {
            GatewayMode::Test => "sk_test_",
            GatewayMode::Live => "sk_live_",
        };
        if !key.starts_with(expected_prefix) {
            return Err(ValidationError::InvalidSecretKey(self.mode.as_str()));
        }

        let webhook = self.webhook_secret.expose_secret();
        if !webhook.is_empty() && !webhook.starts_with("whsec_") {
            return Err(ValidationError::InvalidWebhookSecret);
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidBaseUrl);
        }

        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            mode: GatewayMode::Test,
            test_secret_key: empty_secret(),
            live_secret_key: empty_secret(),
            webhook_secret: empty_secret(),
            base_url: String::new(),
            gateway_name: default_gateway_name(),
        }
    }
}

fn empty_secret() -> SecretString {
    SecretString::new(String::new())
}

fn default_gateway_name() -> String {
    "stripe".to_string()
}
