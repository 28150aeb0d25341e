use {
    super::id::PaymentId,
    super::ledger::TransactionDraft,
    serde::Deserialize,
    std::{collections::HashMap, fmt},
};

/// Envelope of a PSP webhook delivery. `data.object` is typed later by kind.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub created: i64,
    #[serde(default)]
    pub livemode: bool,
    pub data: WebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
    #[serde(default)]
    pub previous_attributes: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum EventKind {
    #[serde(rename = "payment_intent.succeeded")]
    PaymentIntentSucceeded,

    #[serde(rename = "payment_intent.canceled")]
    PaymentIntentCanceled,

    #[serde(rename = "payment_intent.requires_action")]
    PaymentIntentRequiresAction,

    #[serde(rename = "payment_intent.payment_failed")]
    PaymentIntentPaymentFailed,

    #[serde(rename = "charge.succeeded")]
    ChargeSucceeded,

    #[serde(rename = "charge.refunded")]
    ChargeRefunded,

    #[serde(rename = "charge.updated")]
    ChargeUpdated,

    #[serde(other)]
    Unsupported,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentIntentSucceeded => "payment_intent.succeeded",
            Self::PaymentIntentCanceled => "payment_intent.canceled",
            Self::PaymentIntentRequiresAction => "payment_intent.requires_action",
            Self::PaymentIntentPaymentFailed => "payment_intent.payment_failed",
            Self::ChargeSucceeded => "charge.succeeded",
            Self::ChargeRefunded => "charge.refunded",
            Self::ChargeUpdated => "charge.updated",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference the PSP may send either as a bare id or as the expanded object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Object { id } => id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntentObject {
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub amount_received: i64,
    pub currency: String,
    pub status: String,
    pub capture_method: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub latest_charge: Option<Expandable>,
    pub payment_method_options: Option<IntentPaymentMethodOptions>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntentPaymentMethodOptions {
    pub card: Option<CardOptions>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardOptions {
    pub request_multicapture: Option<String>,
}

impl IntentObject {
    /// Manual capture with card multicapture requested: the PSP may split the
    /// capture into several balance transactions.
    pub fn is_multicapture_eligible(&self) -> bool {
        let multicapture = self
            .payment_method_options
            .as_ref()
            .and_then(|o| o.card.as_ref())
            .and_then(|c| c.request_multicapture.as_deref());

        self.capture_method.as_deref() == Some("manual")
            && multicapture == Some("if_available")
            && self.latest_charge.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChargeObject {
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub amount_captured: i64,
    #[serde(default)]
    pub amount_refunded: i64,
    #[serde(default)]
    pub captured: bool,
    pub currency: String,
    pub created: i64,
    pub payment_intent: Option<Expandable>,
    pub balance_transaction: Option<Expandable>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// The subset of `previous_attributes` the capture slice needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChargePrevious {
    pub amount_captured: Option<i64>,
}

/// The update the ledger understands, independent of PSP payload shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionUpdate {
    pub payment_id: PaymentId,
    pub psp_reference: Option<String>,
    pub transactions: Vec<TransactionDraft>,
}

/// What the Disambiguator needs to find the slice a multi-part event refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceHint {
    /// The event describes exactly one operation.
    Whole,
    /// One refund among possibly several on the charge.
    Refund { charge_id: String, charge_created: i64 },
    /// One capture among possibly several on the charge.
    Capture {
        charge_id: String,
        captured: bool,
        amount_captured: i64,
        previous_amount_captured: Option<i64>,
        balance_transaction: Option<String>,
        currency: String,
    },
    /// A succeeded multicapture intent whose latest charge may be split.
    SplitCapture { latest_charge: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUpdate {
    pub kind: EventKind,
    pub update: TransactionUpdate,
    pub hint: SliceHint,
}

impl NormalizedUpdate {
    pub fn may_be_multi_part(&self) -> bool {
        !matches!(self.hint, SliceHint::Whole)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedEvent {
    Update(NormalizedUpdate),
    /// Accepted but nothing to apply. Logged, never an error.
    Ignored { kind: EventKind, reason: String },
}
