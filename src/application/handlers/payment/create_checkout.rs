//! CreateCheckoutHandler - builds a hosted checkout session for an
//! invoice.
//!
//! Thin glue around the processor's session-creation call; the
//! verification core never depends on anything stored here.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::config::GatewayConfig;
use crate::ports::{
    CreateCheckoutSessionRequest, ProcessorClient, ProcessorError, SessionRecord, SessionStore,
};

/// Command to start checkout for an invoice.
#[derive(Debug, Clone)]
pub struct CreateCheckoutCommand {
    pub invoice_id: i64,
    /// Amount due in minor units.
    pub amount_minor: i64,
    /// ISO currency code.
    pub currency: String,
    /// Payer email for pre-fill, when known.
    pub customer_email: Option<String>,
}

/// A created session ready for redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutCreated {
    pub session_id: String,
    pub url: String,
}

/// Errors creating a checkout session.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Invalid checkout request: {0}")]
    InvalidRequest(&'static str),

    #[error(transparent)]
    Processor(#[from] ProcessorError),

    #[error("Processor returned a session without a redirect URL")]
    MissingUrl,
}

/// Handler for checkout-session creation.
pub struct CreateCheckoutHandler {
    processor: Arc<dyn ProcessorClient>,
    sessions: Arc<dyn SessionStore>,
    config: GatewayConfig,
}

impl CreateCheckoutHandler {
    pub fn new(
        processor: Arc<dyn ProcessorClient>,
        sessions: Arc<dyn SessionStore>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            processor,
            sessions,
            config,
        }
    }

    pub async fn handle(&self, cmd: CreateCheckoutCommand) -> Result<CheckoutCreated, CheckoutError> {
        if cmd.invoice_id <= 0 {
            return Err(CheckoutError::InvalidRequest("invoice_id must be positive"));
        }
        if cmd.amount_minor <= 0 {
            return Err(CheckoutError::InvalidRequest("amount must be positive"));
        }
        if cmd.currency.len() != 3 || !cmd.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CheckoutError::InvalidRequest("currency must be an ISO code"));
        }

        let request = CreateCheckoutSessionRequest {
            invoice_id: cmd.invoice_id,
            amount_minor: cmd.amount_minor,
            currency: cmd.currency.to_lowercase(),
            description: format!("Invoice #{}", cmd.invoice_id),
            customer_email: cmd.customer_email,
            success_url: self.config.checkout_return_url(cmd.invoice_id),
            cancel_url: self.config.cart_url(false),
        };

        let session = self.processor.create_checkout_session(request).await?;
        let url = session.url.clone().ok_or(CheckoutError::MissingUrl)?;

        let record = SessionRecord {
            invoice_id: cmd.invoice_id,
            session_id: session.id.clone(),
            amount_minor: cmd.amount_minor,
            currency: cmd.currency.to_lowercase(),
            created_at: Utc::now(),
        };
        // Advisory mapping only; checkout proceeds even if the save fails.
        if let Err(err) = self.sessions.save(&record).await {
            tracing::warn!(
                invoice_id = cmd.invoice_id,
                session_id = %session.id,
                error = %err,
                "failed to store session mapping"
            );
        }

        tracing::info!(
            invoice_id = cmd.invoice_id,
            session_id = %session.id,
            "checkout session created"
        );

        Ok(CheckoutCreated {
            session_id: session.id,
            url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySessionStore;
    use crate::adapters::stripe::MockProcessorClient;
    use crate::config::GatewayConfig;
    use crate::ports::CheckoutSession;
    use secrecy::SecretString;

    fn gateway_config() -> GatewayConfig {
        GatewayConfig {
            test_secret_key: SecretString::new("sk_test_x".to_string()),
            base_url: "https://billing.example.com".to_string(),
            ..Default::default()
        }
    }

    fn fixture() -> (
        Arc<MockProcessorClient>,
        Arc<InMemorySessionStore>,
        CreateCheckoutHandler,
    ) {
        let processor = Arc::new(MockProcessorClient::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        let handler =
            CreateCheckoutHandler::new(processor.clone(), sessions.clone(), gateway_config());
        (processor, sessions, handler)
    }

    fn cmd(invoice_id: i64) -> CreateCheckoutCommand {
        CreateCheckoutCommand {
            invoice_id,
            amount_minor: 1999,
            currency: "USD".to_string(),
            customer_email: Some("payer@example.com".to_string()),
        }
    }

    #[tokio::test]
    async fn creates_session_and_stores_mapping() {
        let (processor, sessions, handler) = fixture();
        processor.set_next_created_session(CheckoutSession {
            id: "cs_new".to_string(),
            url: Some("https://checkout.example.com/cs_new".to_string()),
            ..Default::default()
        });

        let created = handler.handle(cmd(42)).await.unwrap();

        assert_eq!(created.session_id, "cs_new");
        assert_eq!(created.url, "https://checkout.example.com/cs_new");

        let record = sessions.find(42).await.unwrap();
        assert_eq!(record.session_id, "cs_new");
        assert_eq!(record.amount_minor, 1999);
        assert_eq!(record.currency, "usd");
    }

    #[tokio::test]
    async fn rejects_invalid_parameters_without_processor_call() {
        let (processor, _, handler) = fixture();

        assert!(matches!(
            handler.handle(CreateCheckoutCommand { invoice_id: 0, ..cmd(0) }).await,
            Err(CheckoutError::InvalidRequest(_))
        ));
        assert!(matches!(
            handler
                .handle(CreateCheckoutCommand { amount_minor: -5, ..cmd(1) })
                .await,
            Err(CheckoutError::InvalidRequest(_))
        ));
        assert!(matches!(
            handler
                .handle(CreateCheckoutCommand { currency: "dollars".to_string(), ..cmd(1) })
                .await,
            Err(CheckoutError::InvalidRequest(_))
        ));
        assert!(processor.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_url_is_an_error() {
        let (processor, _, handler) = fixture();
        processor.set_next_created_session(CheckoutSession {
            id: "cs_no_url".to_string(),
            url: None,
            ..Default::default()
        });

        let result = handler.handle(cmd(42)).await;

        assert!(matches!(result, Err(CheckoutError::MissingUrl)));
    }

    #[tokio::test]
    async fn processor_failure_propagates() {
        let (processor, _, handler) = fixture();
        processor.set_error(ProcessorError::api(500, "boom"));

        let result = handler.handle(cmd(42)).await;

        assert!(matches!(result, Err(CheckoutError::Processor(_))));
    }
}
