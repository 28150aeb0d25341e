use crate::domain::{
    error::EngineError,
    event::{
        ChargeObject, ChargePrevious, EventKind, IntentObject, NormalizedEvent, NormalizedUpdate,
        SliceHint, TransactionUpdate, WebhookEvent,
    },
    gateway::META_PAYMENT_ID,
    id::PaymentId,
    ledger::{TransactionDraft, TransactionState, TransactionType},
    money::Money,
};

/// Convert a verified PSP event into the update the ledger understands.
///
/// Unsupported kinds and objects that carry no ledger correlation key come
/// back as `NormalizedEvent::Ignored`. A supported kind whose object cannot be
/// read is a `Validation` error.
pub fn normalize(event: &WebhookEvent) -> Result<NormalizedEvent, EngineError> {
    let kind = event.kind;
    match kind {
        EventKind::Unsupported => Ok(NormalizedEvent::Ignored {
            kind,
            reason: "event kind not handled".into(),
        }),
        EventKind::PaymentIntentSucceeded
        | EventKind::PaymentIntentCanceled
        | EventKind::PaymentIntentRequiresAction
        | EventKind::PaymentIntentPaymentFailed => {
            let pi: IntentObject = read_object(kind, &event.data.object)?;
            normalize_intent(kind, &pi)
        }
        EventKind::ChargeSucceeded | EventKind::ChargeRefunded | EventKind::ChargeUpdated => {
            let charge: ChargeObject = read_object(kind, &event.data.object)?;
            let previous = match &event.data.previous_attributes {
                Some(v) => read_object(kind, v)?,
                None => ChargePrevious::default(),
            };
            normalize_charge(kind, &charge, &previous)
        }
    }
}

fn read_object<T: serde::de::DeserializeOwned>(
    kind: EventKind,
    value: &serde_json::Value,
) -> Result<T, EngineError> {
    serde_json::from_value(value.clone())
        .map_err(|e| EngineError::Validation(format!("malformed {kind} object: {e}")))
}

fn correlation_key(
    kind: EventKind,
    metadata: &std::collections::HashMap<String, String>,
) -> Result<PaymentId, NormalizedEvent> {
    metadata
        .get(META_PAYMENT_ID)
        .and_then(|id| PaymentId::new(id.as_str()).ok())
        .ok_or_else(|| NormalizedEvent::Ignored {
            kind,
            reason: format!("object carries no {META_PAYMENT_ID} metadata"),
        })
}

fn draft(
    kind: TransactionType,
    state: TransactionState,
    amount: Money,
    interaction_id: &str,
) -> TransactionDraft {
    TransactionDraft {
        kind,
        state,
        amount,
        interaction_id: Some(interaction_id.to_string()),
    }
}

fn normalize_intent(kind: EventKind, pi: &IntentObject) -> Result<NormalizedEvent, EngineError> {
    let payment_id = match correlation_key(kind, &pi.metadata) {
        Ok(id) => id,
        Err(ignored) => return Ok(ignored),
    };

    let amount = Money::from_psp(pi.amount, &pi.currency)?;
    let mut hint = SliceHint::Whole;

    let transactions = match kind {
        EventKind::PaymentIntentSucceeded => {
            if pi.is_multicapture_eligible() {
                if let Some(charge) = &pi.latest_charge {
                    hint = SliceHint::SplitCapture {
                        latest_charge: charge.id().to_string(),
                    };
                }
            }
            let received = Money::from_psp(pi.amount_received, &pi.currency)?;
            vec![draft(
                TransactionType::Charge,
                TransactionState::Success,
                received,
                &pi.id,
            )]
        }
        EventKind::PaymentIntentCanceled => vec![
            draft(
                TransactionType::Authorization,
                TransactionState::Failure,
                amount.clone(),
                &pi.id,
            ),
            draft(
                TransactionType::CancelAuthorization,
                TransactionState::Success,
                amount,
                &pi.id,
            ),
        ],
        EventKind::PaymentIntentRequiresAction => vec![draft(
            TransactionType::Authorization,
            TransactionState::Pending,
            amount,
            &pi.id,
        )],
        EventKind::PaymentIntentPaymentFailed => vec![draft(
            TransactionType::Authorization,
            TransactionState::Failure,
            amount,
            &pi.id,
        )],
        other => {
            return Err(EngineError::Validation(format!(
                "{other} is not a payment intent event"
            )));
        }
    };

    Ok(NormalizedEvent::Update(NormalizedUpdate {
        kind,
        update: TransactionUpdate {
            payment_id,
            psp_reference: Some(pi.id.clone()),
            transactions,
        },
        hint,
    }))
}

fn normalize_charge(
    kind: EventKind,
    charge: &ChargeObject,
    previous: &ChargePrevious,
) -> Result<NormalizedEvent, EngineError> {
    let payment_id = match correlation_key(kind, &charge.metadata) {
        Ok(id) => id,
        Err(ignored) => return Ok(ignored),
    };

    let intent_id = charge
        .payment_intent
        .as_ref()
        .map(|e| e.id().to_string())
        .unwrap_or_else(|| charge.id.clone());

    let (psp_reference, transactions, hint) = match kind {
        EventKind::ChargeSucceeded => (
            intent_id.clone(),
            vec![draft(
                TransactionType::Authorization,
                TransactionState::Success,
                Money::from_psp(charge.amount, &charge.currency)?,
                &intent_id,
            )],
            SliceHint::Whole,
        ),
        EventKind::ChargeRefunded => (
            intent_id.clone(),
            vec![draft(
                TransactionType::Refund,
                TransactionState::Success,
                Money::from_psp(charge.amount_refunded, &charge.currency)?,
                &intent_id,
            )],
            SliceHint::Refund {
                charge_id: charge.id.clone(),
                charge_created: charge.created,
            },
        ),
        EventKind::ChargeUpdated => {
            let balance_transaction = charge
                .balance_transaction
                .as_ref()
                .map(|e| e.id().to_string());
            let reference = balance_transaction.clone().unwrap_or_else(|| intent_id.clone());
            (
                reference.clone(),
                vec![draft(
                    TransactionType::Charge,
                    TransactionState::Success,
                    Money::from_psp(charge.amount_captured, &charge.currency)?,
                    &reference,
                )],
                SliceHint::Capture {
                    charge_id: charge.id.clone(),
                    captured: charge.captured,
                    amount_captured: charge.amount_captured,
                    previous_amount_captured: previous.amount_captured,
                    balance_transaction,
                    currency: charge.currency.clone(),
                },
            )
        }
        other => {
            return Err(EngineError::Validation(format!(
                "{other} is not a charge event"
            )));
        }
    };

    Ok(NormalizedEvent::Update(NormalizedUpdate {
        kind,
        update: TransactionUpdate {
            payment_id,
            psp_reference: Some(psp_reference),
            transactions,
        },
        hint,
    }))
}
