use {
    crate::domain::{
        error::EngineError,
        event::{NormalizedUpdate, SliceHint},
        gateway::PaymentGateway,
        money::Money,
        region::RegionContext,
    },
    std::sync::Arc,
};

const REFUND_LOOKBACK: u8 = 2;
const BALANCE_TRANSACTION_LIMIT: u8 = 10;

/// Whether the PSP account may split captures and refunds into several slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiOperations {
    Disabled,
    Enabled,
}

impl From<bool> for MultiOperations {
    fn from(enabled: bool) -> Self {
        if enabled { Self::Enabled } else { Self::Disabled }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceOutcome {
    /// The update now describes exactly one PSP operation.
    Keep,
    /// Nothing to apply. Expected under eventual consistency, logged as a warning.
    Drop { reason: String },
}

/// Rewrites multi-part updates so they describe the one slice the event
/// refers to. Never touches the ledger.
pub struct Disambiguator {
    gateway: Arc<dyn PaymentGateway>,
    multi_operations: MultiOperations,
}

impl Disambiguator {
    pub fn new(gateway: Arc<dyn PaymentGateway>, multi_operations: MultiOperations) -> Self {
        Self {
            gateway,
            multi_operations,
        }
    }

    pub fn multi_operations(&self) -> MultiOperations {
        self.multi_operations
    }

    pub async fn resolve(
        &self,
        ctx: &RegionContext,
        normalized: &mut NormalizedUpdate,
    ) -> Result<SliceOutcome, EngineError> {
        let hint = normalized.hint.clone();
        match (self.multi_operations, hint) {
            (_, SliceHint::Whole) => Ok(SliceOutcome::Keep),

            // Without multi-operations a charge holds one refund and one capture,
            // so the event's own totals are the slice.
            (MultiOperations::Disabled, SliceHint::Refund { .. })
            | (MultiOperations::Disabled, SliceHint::SplitCapture { .. }) => Ok(SliceOutcome::Keep),
            (MultiOperations::Disabled, SliceHint::Capture { .. }) => Ok(SliceOutcome::Drop {
                reason: "multi-operations disabled, capture updates are not tracked".into(),
            }),

            (
                MultiOperations::Enabled,
                SliceHint::Refund {
                    charge_id,
                    charge_created,
                },
            ) => {
                self.resolve_refund(ctx, normalized, &charge_id, charge_created)
                    .await
            }
            (
                MultiOperations::Enabled,
                SliceHint::Capture {
                    charge_id,
                    captured,
                    amount_captured,
                    previous_amount_captured,
                    balance_transaction,
                    currency,
                },
            ) => resolve_capture(
                normalized,
                &charge_id,
                captured,
                amount_captured,
                previous_amount_captured,
                balance_transaction,
                &currency,
            ),
            (MultiOperations::Enabled, SliceHint::SplitCapture { latest_charge }) => {
                self.resolve_split_capture(ctx, normalized, &latest_charge)
                    .await
            }
        }
    }

    async fn resolve_refund(
        &self,
        ctx: &RegionContext,
        normalized: &mut NormalizedUpdate,
        charge_id: &str,
        charge_created: i64,
    ) -> Result<SliceOutcome, EngineError> {
        let refunds = self
            .gateway
            .list_refunds(ctx, charge_id, charge_created, REFUND_LOOKBACK)
            .await?;

        let Some(refund) = refunds.first() else {
            return Ok(SliceOutcome::Drop {
                reason: format!("no refund found for charge {charge_id}"),
            });
        };

        let amount = Money::from_psp(refund.amount, &refund.currency)?;
        rewrite(normalized, &refund.id, amount);
        Ok(SliceOutcome::Keep)
    }

    async fn resolve_split_capture(
        &self,
        ctx: &RegionContext,
        normalized: &mut NormalizedUpdate,
        latest_charge: &str,
    ) -> Result<SliceOutcome, EngineError> {
        let balance_transactions = self
            .gateway
            .list_balance_transactions(ctx, latest_charge, BALANCE_TRANSACTION_LIMIT)
            .await?;

        // A single balance transaction means the capture was not split.
        if balance_transactions.len() > 1 {
            let newest = &balance_transactions[0];
            let amount = Money::from_psp(newest.amount, &newest.currency)?;
            for tx in &mut normalized.update.transactions {
                tx.interaction_id = Some(newest.id.clone());
                tx.amount = amount.clone();
            }
        }
        Ok(SliceOutcome::Keep)
    }
}

fn resolve_capture(
    normalized: &mut NormalizedUpdate,
    charge_id: &str,
    captured: bool,
    amount_captured: i64,
    previous_amount_captured: Option<i64>,
    balance_transaction: Option<String>,
    currency: &str,
) -> Result<SliceOutcome, EngineError> {
    if captured {
        return Ok(SliceOutcome::Drop {
            reason: format!("charge {charge_id} is already captured"),
        });
    }

    let Some(previous) = previous_amount_captured.filter(|&p| amount_captured > p) else {
        return Ok(SliceOutcome::Drop {
            reason: format!("amount captured did not increase on charge {charge_id}"),
        });
    };

    let Some(balance_transaction) = balance_transaction else {
        return Ok(SliceOutcome::Drop {
            reason: format!("charge {charge_id} has no balance transaction"),
        });
    };

    let amount = Money::from_psp(amount_captured - previous, currency)?;
    rewrite(normalized, &balance_transaction, amount);
    Ok(SliceOutcome::Keep)
}

/// Point the update and each of its transactions at one PSP-side record.
fn rewrite(normalized: &mut NormalizedUpdate, reference: &str, amount: Money) {
    normalized.update.psp_reference = Some(reference.to_string());
    for tx in &mut normalized.update.transactions {
        tx.interaction_id = Some(reference.to_string());
        tx.amount = amount.clone();
    }
}
