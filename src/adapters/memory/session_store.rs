//! In-memory session store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::ports::{SessionRecord, SessionStore, SessionStoreError};

/// In-memory implementation of [`SessionStore`].
#[derive(Default)]
pub struct InMemorySessionStore {
    records: Mutex<HashMap<i64, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a mapping ahead of a test.
    pub async fn seed(&self, invoice_id: i64, session_id: &str, amount_minor: i64, currency: &str) {
        let record = SessionRecord {
            invoice_id,
            session_id: session_id.to_string(),
            amount_minor,
            currency: currency.to_string(),
            created_at: Utc::now(),
        };
        self.save(&record).await.expect("in-memory save");
    }

    /// Lookup convenience for assertions.
    pub async fn find(&self, invoice_id: i64) -> Option<SessionRecord> {
        self.find_by_invoice(invoice_id).await.expect("in-memory find")
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, record: &SessionRecord) -> Result<(), SessionStoreError> {
        self.records
            .lock()
            .unwrap()
            .insert(record.invoice_id, record.clone());
        Ok(())
    }

    async fn find_by_invoice(
        &self,
        invoice_id: i64,
    ) -> Result<Option<SessionRecord>, SessionStoreError> {
        Ok(self.records.lock().unwrap().get(&invoice_id).cloned())
    }
}
