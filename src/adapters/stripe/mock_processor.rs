//! Mock processor client for testing.
//!
//! Configurable implementation of `ProcessorClient` supporting
//! pre-configured responses, error injection and call tracking.
//!
//! # Example
//!
//! ```ignore
//! let mock = MockProcessorClient::new();
//! mock.set_session(session);
//! mock.set_error(ProcessorError::network("timeout"));
//!
//! let result = mock.retrieve_session("cs_1").await;
//! assert_eq!(mock.call_count("retrieve_session"), 1);
//! ```

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ports::{
    BalanceTransaction, CheckoutSession, CreateCheckoutSessionRequest, PaymentIntent,
    ProcessorClient, ProcessorError,
};

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

#[derive(Default)]
struct MockState {
    sessions: HashMap<String, CheckoutSession>,
    intents: HashMap<String, PaymentIntent>,
    balance_transactions: HashMap<String, BalanceTransaction>,

    /// Session returned by the next create call.
    next_created_session: Option<CheckoutSession>,

    /// Error returned by the next call, whichever method it hits.
    next_error: Option<ProcessorError>,

    call_log: Vec<MethodCall>,
}

/// Mock processor client for testing.
#[derive(Default)]
pub struct MockProcessorClient {
    state: Mutex<MockState>,
}

impl MockProcessorClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session retrievable by its id.
    pub fn set_session(&self, session: CheckoutSession) {
        let mut state = self.state.lock().unwrap();
        state.sessions.insert(session.id.clone(), session);
    }

    /// Register a payment intent retrievable by its id.
    pub fn set_intent(&self, intent: PaymentIntent) {
        let mut state = self.state.lock().unwrap();
        state.intents.insert(intent.id.clone(), intent);
    }

    /// Register a balance transaction retrievable by its id.
    pub fn set_balance_transaction(&self, txn: BalanceTransaction) {
        let mut state = self.state.lock().unwrap();
        state.balance_transactions.insert(txn.id.clone(), txn);
    }

    /// Session to return from the next `create_checkout_session` call.
    pub fn set_next_created_session(&self, session: CheckoutSession) {
        self.state.lock().unwrap().next_created_session = Some(session);
    }

    /// Error to return from the next call, whichever method it hits.
    pub fn set_error(&self, error: ProcessorError) {
        self.state.lock().unwrap().next_error = Some(error);
    }

    /// All calls made so far.
    pub fn calls(&self) -> Vec<MethodCall> {
        self.state.lock().unwrap().call_log.clone()
    }

    /// Number of calls to a specific method.
    pub fn call_count(&self, method: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .call_log
            .iter()
            .filter(|call| call.method == method)
            .count()
    }

    fn track(&self, method: &str, args: &[&str]) -> Option<ProcessorError> {
        let mut state = self.state.lock().unwrap();
        state.call_log.push(MethodCall {
            method: method.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        });
        state.next_error.take()
    }
}

#[async_trait]
impl ProcessorClient for MockProcessorClient {
    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, ProcessorError> {
        if let Some(error) = self.track("retrieve_session", &[session_id]) {
            return Err(error);
        }
        self.state
            .lock()
            .unwrap()
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| ProcessorError::api(404, format!("No such session: {}", session_id)))
    }

    async fn retrieve_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<PaymentIntent, ProcessorError> {
        if let Some(error) = self.track("retrieve_payment_intent", &[payment_intent_id]) {
            return Err(error);
        }
        self.state
            .lock()
            .unwrap()
            .intents
            .get(payment_intent_id)
            .cloned()
            .ok_or_else(|| {
                ProcessorError::api(404, format!("No such payment_intent: {}", payment_intent_id))
            })
    }

    async fn retrieve_balance_transaction(
        &self,
        balance_transaction_id: &str,
    ) -> Result<BalanceTransaction, ProcessorError> {
        if let Some(error) = self.track("retrieve_balance_transaction", &[balance_transaction_id]) {
            return Err(error);
        }
        self.state
            .lock()
            .unwrap()
            .balance_transactions
            .get(balance_transaction_id)
            .cloned()
            .ok_or_else(|| {
                ProcessorError::api(
                    404,
                    format!("No such balance_transaction: {}", balance_transaction_id),
                )
            })
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession, ProcessorError> {
        let invoice_arg = request.invoice_id.to_string();
        if let Some(error) = self.track("create_checkout_session", &[invoice_arg.as_str()]) {
            return Err(error);
        }

        let mut state = self.state.lock().unwrap();
        if let Some(session) = state.next_created_session.take() {
            return Ok(session);
        }

        // Synthesize a plausible unpaid session when none was configured.
        let mut metadata = HashMap::new();
        metadata.insert("invoice_id".to_string(), request.invoice_id.to_string());
        Ok(CheckoutSession {
            id: format!("cs_mock_{}", request.invoice_id),
            payment_status: "unpaid".to_string(),
            payment_intent: None,
            amount_total: Some(request.amount_minor),
            currency: Some(request.currency),
            metadata,
            url: Some(format!(
                "https://checkout.mock/cs_mock_{}",
                request.invoice_id
            )),
        })
    }
}
