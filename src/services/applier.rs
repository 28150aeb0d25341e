use {
    crate::domain::{
        commerce::CommercePlatform,
        error::EngineError,
        event::TransactionUpdate,
        ledger::{LedgerPayment, PaymentAction, TransactionPlan, TransactionState},
    },
    std::sync::Arc,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Actions were written; `version` is the payment version after the write.
    Applied { version: i64, actions: usize },
    /// Every transaction in the update is already recorded.
    Duplicate,
    /// Nothing applicable; the ledger holds the operation in a terminal state.
    Anomaly { current: TransactionState },
}

/// Writes normalized updates onto ledger payments.
///
/// Each call reads the payment, plans actions against that snapshot, and
/// writes them with the snapshot's version. A version conflict triggers one
/// re-read and re-plan; a second conflict surfaces as `LedgerConflict`.
pub struct LedgerApplier {
    ledger: Arc<dyn CommercePlatform>,
}

impl LedgerApplier {
    pub fn new(ledger: Arc<dyn CommercePlatform>) -> Self {
        Self { ledger }
    }

    #[tracing::instrument(
        name = "apply",
        skip_all,
        fields(payment_id = %update.payment_id, transactions = update.transactions.len())
    )]
    pub async fn apply(&self, update: &TransactionUpdate) -> Result<ApplyOutcome, EngineError> {
        match self.apply_once(update).await {
            Err(EngineError::LedgerConflict(reason)) => {
                tracing::info!(%reason, "ledger version conflict, re-reading payment");
                self.apply_once(update).await
            }
            other => other,
        }
    }

    async fn apply_once(&self, update: &TransactionUpdate) -> Result<ApplyOutcome, EngineError> {
        let payment = self.ledger.get_payment(&update.payment_id).await?;

        let actions = match plan_update(&payment, update) {
            Planned::Actions(actions) => actions,
            Planned::Duplicate => {
                tracing::debug!(version = payment.version, "update already recorded");
                return Ok(ApplyOutcome::Duplicate);
            }
            Planned::Anomaly(current) => {
                tracing::warn!(
                    version = payment.version,
                    current = %current,
                    "ledger holds operation in a terminal state, update not applied"
                );
                return Ok(ApplyOutcome::Anomaly { current });
            }
        };

        let updated = self
            .ledger
            .update_payment(&payment.id, payment.version, &actions)
            .await?;

        tracing::info!(
            from_version = payment.version,
            to_version = updated.version,
            actions = actions.len(),
            "ledger payment updated"
        );

        Ok(ApplyOutcome::Applied {
            version: updated.version,
            actions: actions.len(),
        })
    }
}

enum Planned {
    Actions(Vec<PaymentAction>),
    Duplicate,
    Anomaly(TransactionState),
}

/// Fold the per-transaction plans into one batch of actions for a single write.
fn plan_update(payment: &LedgerPayment, update: &TransactionUpdate) -> Planned {
    let mut actions = Vec::new();
    let mut anomaly = None;

    for draft in &update.transactions {
        match payment.plan_transaction(None, draft) {
            TransactionPlan::AlreadyApplied => {}
            TransactionPlan::Anomaly { current } => {
                tracing::warn!(
                    kind = %draft.kind,
                    current = %current,
                    incoming = %draft.state,
                    "invalid transaction state transition"
                );
                anomaly.get_or_insert(current);
            }
            TransactionPlan::Apply(mut planned) => actions.append(&mut planned),
        }
    }

    if actions.is_empty() {
        return match anomaly {
            Some(current) => Planned::Anomaly(current),
            None => Planned::Duplicate,
        };
    }

    if let (None, Some(reference)) = (&payment.interface_id, &update.psp_reference) {
        actions.insert(0, PaymentAction::SetInterfaceId(reference.clone()));
    }

    Planned::Actions(actions)
}
