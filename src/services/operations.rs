use {
    super::disambiguator::MultiOperations,
    crate::domain::{
        commerce::CommercePlatform,
        error::EngineError,
        gateway::{CaptureRequest, PaymentGateway},
        id::{IdempotencyKey, IntentId, PaymentId},
        ledger::{LedgerPayment, TransactionState, TransactionType},
        money::Money,
        region::RegionContext,
    },
    serde::{Deserialize, Serialize},
    std::sync::Arc,
};

/// One merchant-initiated change to a payment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PaymentOperation {
    CapturePayment {
        amount: Money,
    },
    CancelPayment {
        #[serde(default)]
        amount: Option<Money>,
    },
    RefundPayment {
        amount: Money,
    },
    ReversePayment {
        #[serde(default)]
        amount: Option<Money>,
    },
}

impl PaymentOperation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CapturePayment { .. } => "capturePayment",
            Self::CancelPayment { .. } => "cancelPayment",
            Self::RefundPayment { .. } => "refundPayment",
            Self::ReversePayment { .. } => "reversePayment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Approved,
    /// Accepted by the PSP; the final state arrives by webhook.
    Received,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub outcome: Outcome,
    pub psp_reference: String,
}

impl OperationResult {
    fn new(outcome: Outcome, psp_reference: impl Into<String>) -> Self {
        Self {
            outcome,
            psp_reference: psp_reference.into(),
        }
    }
}

/// Capture, cancel, refund and reverse against the intent bound to a ledger
/// payment. Only the PSP is mutated here; the ledger follows from webhooks.
pub struct PaymentOperations {
    gateway: Arc<dyn PaymentGateway>,
    ledger: Arc<dyn CommercePlatform>,
    multi_operations: MultiOperations,
}

impl PaymentOperations {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        ledger: Arc<dyn CommercePlatform>,
        multi_operations: MultiOperations,
    ) -> Self {
        Self {
            gateway,
            ledger,
            multi_operations,
        }
    }

    /// Run `operations` in order, stopping at the first rejection.
    #[tracing::instrument(
        name = "modify_payment",
        skip_all,
        fields(payment_id = %payment_id, region = %ctx.region())
    )]
    pub async fn modify(
        &self,
        ctx: &RegionContext,
        payment_id: &PaymentId,
        operations: &[PaymentOperation],
    ) -> Result<OperationResult, EngineError> {
        if operations.is_empty() {
            return Err(EngineError::Validation("no payment operation given".into()));
        }

        let payment = self.ledger.get_payment(payment_id).await?;
        let intent_id = bound_intent(&payment)?;

        let mut last = OperationResult::new(Outcome::Rejected, intent_id.as_str());
        for operation in operations {
            last = self.run(ctx, &payment, &intent_id, operation).await?;
            tracing::info!(
                action = operation.name(),
                outcome = ?last.outcome,
                psp_reference = %last.psp_reference,
                "payment modification completed"
            );
            if last.outcome == Outcome::Rejected {
                break;
            }
        }
        Ok(last)
    }

    async fn run(
        &self,
        ctx: &RegionContext,
        payment: &LedgerPayment,
        intent_id: &IntentId,
        operation: &PaymentOperation,
    ) -> Result<OperationResult, EngineError> {
        match operation {
            PaymentOperation::CapturePayment { amount } => {
                same_currency(payment, amount)?;
                self.capture(ctx, payment, intent_id, amount).await
            }
            PaymentOperation::CancelPayment { .. } => Ok(self.cancel(ctx, intent_id).await),
            PaymentOperation::RefundPayment { amount } => {
                same_currency(payment, amount)?;
                Ok(self.refund(ctx, payment, intent_id, amount).await)
            }
            PaymentOperation::ReversePayment { .. } => self.reverse(ctx, payment, intent_id).await,
        }
    }

    async fn capture(
        &self,
        ctx: &RegionContext,
        payment: &LedgerPayment,
        intent_id: &IntentId,
        amount: &Money,
    ) -> Result<OperationResult, EngineError> {
        let planned = payment.amount_planned.amount().minor_units();
        if planned == 0 {
            return Err(EngineError::Validation(format!(
                "payment {} has no planned amount",
                payment.id
            )));
        }

        let intent = match self.gateway.retrieve_intent(ctx, intent_id).await {
            Ok(intent) => intent,
            Err(e) => return Ok(rejected(intent_id, "capture", &e)),
        };

        let to_capture = amount.amount().minor_units();
        let capturable = planned.saturating_sub(intent.amount_received);
        let total = intent
            .amount_received
            .checked_add(to_capture)
            .filter(|_| to_capture <= capturable)
            .ok_or_else(|| {
                EngineError::Validation(format!(
                    "cannot capture {to_capture}: only {capturable} of {planned} left on payment {}",
                    payment.id
                ))
            })?;
        let partial = total < planned;
        if partial && self.multi_operations == MultiOperations::Disabled {
            tracing::warn!(
                amount_received = intent.amount_received,
                to_capture,
                planned,
                "partial capture requested with multi-operations disabled"
            );
            return Ok(OperationResult::new(Outcome::Rejected, intent_id.as_str()));
        }

        let request = CaptureRequest {
            amount_to_capture: to_capture,
            final_capture: partial.then_some(false),
        };
        let key = IdempotencyKey::generate("capture");
        match self.gateway.capture_intent(ctx, intent_id, request, &key).await {
            Ok(intent) => Ok(OperationResult::new(Outcome::Approved, intent.id.to_string())),
            Err(e) => Ok(rejected(intent_id, "capture", &e)),
        }
    }

    async fn cancel(&self, ctx: &RegionContext, intent_id: &IntentId) -> OperationResult {
        let key = IdempotencyKey::generate("cancel");
        match self.gateway.cancel_intent(ctx, intent_id, &key).await {
            Ok(intent) => OperationResult::new(Outcome::Approved, intent.id.to_string()),
            Err(e) => rejected(intent_id, "cancel", &e),
        }
    }

    async fn refund(
        &self,
        ctx: &RegionContext,
        payment: &LedgerPayment,
        intent_id: &IntentId,
        amount: &Money,
    ) -> OperationResult {
        if self.multi_operations == MultiOperations::Disabled
            && payment.has_transaction_in_state(TransactionType::Refund, &[TransactionState::Success])
        {
            tracing::warn!(
                payment_id = %payment.id,
                "payment already refunded and multi-operations are disabled, refunding anyway"
            );
        }

        let key = IdempotencyKey::generate("refund");
        match self
            .gateway
            .create_refund(ctx, intent_id, amount.amount().minor_units(), &key)
            .await
        {
            Ok(refund) => OperationResult::new(Outcome::Received, refund.id),
            Err(e) => rejected(intent_id, "refund", &e),
        }
    }

    /// Refund a charged payment, or cancel a merely authorized one.
    async fn reverse(
        &self,
        ctx: &RegionContext,
        payment: &LedgerPayment,
        intent_id: &IntentId,
    ) -> Result<OperationResult, EngineError> {
        let open = [TransactionState::Success, TransactionState::Pending];
        let reverted = payment.has_transaction_in_state(TransactionType::Refund, &open)
            || payment.has_transaction_in_state(TransactionType::CancelAuthorization, &open);

        if reverted {
            return Err(EngineError::Validation(format!(
                "payment {} was already reversed",
                payment.id
            )));
        }

        if payment.has_transaction_in_state(TransactionType::Charge, &[TransactionState::Success]) {
            return Ok(self
                .refund(ctx, payment, intent_id, &payment.amount_planned)
                .await);
        }

        if payment.has_transaction_in_state(
            TransactionType::Authorization,
            &[TransactionState::Success],
        ) {
            return Ok(self.cancel(ctx, intent_id).await);
        }

        Err(EngineError::Validation(
            "there is no successful payment transaction to reverse".into(),
        ))
    }
}

fn bound_intent(payment: &LedgerPayment) -> Result<IntentId, EngineError> {
    let id = payment.interface_id.as_deref().ok_or_else(|| {
        EngineError::Validation(format!("payment {} is not bound to an intent", payment.id))
    })?;
    IntentId::new(id)
}

fn same_currency(payment: &LedgerPayment, amount: &Money) -> Result<(), EngineError> {
    if payment.amount_planned.currency() != amount.currency() {
        return Err(EngineError::Validation(format!(
            "amount in {} does not match payment currency {}",
            amount.currency(),
            payment.amount_planned.currency()
        )));
    }
    Ok(())
}

/// PSP failures become a rejected outcome rather than an error response.
fn rejected(intent_id: &IntentId, action: &str, err: &EngineError) -> OperationResult {
    tracing::error!(intent_id = %intent_id, action, error = %err, "payment modification rejected by psp");
    OperationResult::new(Outcome::Rejected, intent_id.as_str())
}
