//! FeeResolver - processor fee extraction with fallback strategies.

use std::sync::Arc;

use crate::ports::{Charge, Expandable, ProcessorClient};

/// Which strategy produced the resolved fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeMethod {
    /// Fee read from the settled balance transaction.
    BalanceTransaction,
    /// Explicit platform/application fee on the charge.
    ApplicationFee,
    /// Difference between requested and captured amount.
    CaptureDelta,
    /// No strategy applied; fee defaults to zero.
    Default,
}

impl FeeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeMethod::BalanceTransaction => "balance_transaction",
            FeeMethod::ApplicationFee => "application_fee",
            FeeMethod::CaptureDelta => "capture_delta",
            FeeMethod::Default => "default",
        }
    }
}

/// Resolved fee in minor units, with the strategy that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedFee {
    pub fee_minor: i64,
    pub method: FeeMethod,
}

/// Resolves the processor fee for a settled charge.
///
/// Ordered fallback chain, first success wins:
/// 1. the charge's settled balance transaction (embedded or fetched);
/// 2. the charge's explicit application fee amount;
/// 3. `amount - amount_captured`, when positive.
///
/// Defaults to zero. A failed balance-transaction fetch falls through to
/// the next strategy rather than failing the caller; fee extraction must
/// never block payment recording.
pub struct FeeResolver {
    processor: Arc<dyn ProcessorClient>,
}

impl FeeResolver {
    pub fn new(processor: Arc<dyn ProcessorClient>) -> Self {
        Self { processor }
    }

    /// Resolve the fee for a charge. Infallible; always minor units.
    pub async fn resolve(&self, charge: &Charge) -> ResolvedFee {
        if let Some(fee) = self.from_balance_transaction(charge).await {
            tracing::debug!(charge_id = %charge.id, fee, method = "balance_transaction", "fee resolved");
            return ResolvedFee {
                fee_minor: fee,
                method: FeeMethod::BalanceTransaction,
            };
        }

        if let Some(fee) = charge.application_fee_amount {
            tracing::debug!(charge_id = %charge.id, fee, method = "application_fee", "fee resolved");
            return ResolvedFee {
                fee_minor: fee,
                method: FeeMethod::ApplicationFee,
            };
        }

        let delta = charge.amount - charge.amount_captured;
        if delta > 0 {
            tracing::debug!(charge_id = %charge.id, fee = delta, method = "capture_delta", "fee resolved");
            return ResolvedFee {
                fee_minor: delta,
                method: FeeMethod::CaptureDelta,
            };
        }

        tracing::debug!(charge_id = %charge.id, "no fee information on charge, defaulting to 0");
        ResolvedFee {
            fee_minor: 0,
            method: FeeMethod::Default,
        }
    }

    /// Fee from the charge's settlement record, when settled.
    async fn from_balance_transaction(&self, charge: &Charge) -> Option<i64> {
        let reference = charge.balance_transaction.as_ref()?;

        match reference {
            Expandable::Object(txn) => {
                if txn.is_settled() {
                    Some(txn.fee)
                } else {
                    tracing::debug!(
                        charge_id = %charge.id,
                        txn_id = %txn.id,
                        status = %txn.status,
                        "balance transaction not settled yet"
                    );
                    None
                }
            }
            Expandable::Id(id) => match self.processor.retrieve_balance_transaction(id).await {
                Ok(txn) if txn.is_settled() => Some(txn.fee),
                Ok(txn) => {
                    tracing::debug!(
                        charge_id = %charge.id,
                        txn_id = %txn.id,
                        status = %txn.status,
                        "balance transaction not settled yet"
                    );
                    None
                }
                Err(err) => {
                    tracing::warn!(
                        charge_id = %charge.id,
                        txn_id = %id,
                        error = %err,
                        "balance transaction fetch failed, falling back"
                    );
                    None
                }
            },
        }
    }
}
