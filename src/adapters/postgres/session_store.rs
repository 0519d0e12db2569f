//! PostgreSQL implementation of the advisory session store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::ports::{SessionRecord, SessionStore, SessionStoreError};

/// PostgreSQL implementation of the [`SessionStore`] port.
pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    invoice_id: i64,
    session_id: String,
    amount_minor: i64,
    currency: String,
    created_at: DateTime<Utc>,
}

impl From<SessionRow> for SessionRecord {
    fn from(row: SessionRow) -> Self {
        SessionRecord {
            invoice_id: row.invoice_id,
            session_id: row.session_id,
            amount_minor: row.amount_minor,
            currency: row.currency,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn save(&self, record: &SessionRecord) -> Result<(), SessionStoreError> {
        sqlx::query(
            "INSERT INTO checkout_sessions \
             (invoice_id, session_id, amount_minor, currency, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (invoice_id) DO UPDATE SET \
               session_id = EXCLUDED.session_id, \
               amount_minor = EXCLUDED.amount_minor, \
               currency = EXCLUDED.currency, \
               created_at = EXCLUDED.created_at",
        )
        .bind(record.invoice_id)
        .bind(&record.session_id)
        .bind(record.amount_minor)
        .bind(&record.currency)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(|e| SessionStoreError::Storage(e.to_string()))
    }

    async fn find_by_invoice(
        &self,
        invoice_id: i64,
    ) -> Result<Option<SessionRecord>, SessionStoreError> {
        sqlx::query_as::<_, SessionRow>(
            "SELECT invoice_id, session_id, amount_minor, currency, created_at \
             FROM checkout_sessions WHERE invoice_id = $1",
        )
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map(|row| row.map(SessionRecord::from))
        .map_err(|e| SessionStoreError::Storage(e.to_string()))
    }
}
