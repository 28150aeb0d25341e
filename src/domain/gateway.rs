use {
    super::EngineFuture,
    super::error::EngineError,
    super::id::{IdempotencyKey, IntentId},
    super::money::Money,
    super::region::RegionContext,
    serde::{Deserialize, Serialize},
    std::{collections::BTreeMap, fmt, str::FromStr},
};

/// Metadata key binding a PSP object back to the ledger payment.
pub const META_PAYMENT_ID: &str = "ct_payment_id";
pub const META_CART_ID: &str = "cart_id";
pub const META_PROJECT_KEY: &str = "ct_project_key";
pub const META_CUSTOMER_ID: &str = "ct_customer_id";

/// Free-form PSP feature flags, e.g. `{"payment_method_save": "enabled"}`.
pub type FeatureMap = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMethod {
    Automatic,
    AutomaticAsync,
    Manual,
}

impl CaptureMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::AutomaticAsync => "automatic_async",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for CaptureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaptureMethod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "automatic" => Ok(Self::Automatic),
            "automatic_async" => Ok(Self::AutomaticAsync),
            "manual" => Ok(Self::Manual),
            other => Err(EngineError::Configuration(format!(
                "unknown capture method: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostalAddress {
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub postal_code: String,
    pub state: String,
    pub country: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShippingDetails {
    pub name: String,
    pub phone: String,
    pub address: PostalAddress,
}

#[derive(Debug, Clone)]
pub struct IntentRequest {
    pub amount: Money,
    pub capture_method: CaptureMethod,
    pub customer: Option<String>,
    pub setup_future_usage: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub shipping: Option<ShippingDetails>,
    pub request_multicapture: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PspIntent {
    pub id: IntentId,
    pub amount: i64,
    pub amount_received: i64,
    pub currency: String,
    pub status: String,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PspRefund {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub created: i64,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PspBalanceTransaction {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PspCustomer {
    pub id: String,
    pub deleted: bool,
    /// Ledger customer this PSP customer was created for, from its metadata.
    pub ct_customer_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CustomerRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<PostalAddress>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    pub amount_to_capture: i64,
    /// `Some(false)` keeps the authorization open for further captures.
    pub final_capture: Option<bool>,
}

/// Narrow view of the PSP. Every call names its region explicitly; mutating
/// calls carry an idempotency key the implementation reuses across retries.
pub trait PaymentGateway: Send + Sync {
    fn create_intent<'a>(
        &'a self,
        ctx: &'a RegionContext,
        request: &'a IntentRequest,
        key: &'a IdempotencyKey,
    ) -> EngineFuture<'a, PspIntent>;

    fn retrieve_intent<'a>(
        &'a self,
        ctx: &'a RegionContext,
        id: &'a IntentId,
    ) -> EngineFuture<'a, PspIntent>;

    fn update_intent_metadata<'a>(
        &'a self,
        ctx: &'a RegionContext,
        id: &'a IntentId,
        metadata: &'a BTreeMap<String, String>,
        key: &'a IdempotencyKey,
    ) -> EngineFuture<'a, PspIntent>;

    fn capture_intent<'a>(
        &'a self,
        ctx: &'a RegionContext,
        id: &'a IntentId,
        capture: CaptureRequest,
        key: &'a IdempotencyKey,
    ) -> EngineFuture<'a, PspIntent>;

    fn cancel_intent<'a>(
        &'a self,
        ctx: &'a RegionContext,
        id: &'a IntentId,
        key: &'a IdempotencyKey,
    ) -> EngineFuture<'a, PspIntent>;

    fn create_refund<'a>(
        &'a self,
        ctx: &'a RegionContext,
        id: &'a IntentId,
        amount: i64,
        key: &'a IdempotencyKey,
    ) -> EngineFuture<'a, PspRefund>;

    /// Refunds against `charge_id` created at or after `created_gte`, newest first.
    fn list_refunds<'a>(
        &'a self,
        ctx: &'a RegionContext,
        charge_id: &'a str,
        created_gte: i64,
        limit: u8,
    ) -> EngineFuture<'a, Vec<PspRefund>>;

    /// Balance transactions sourced from `source` (a charge id), newest first.
    fn list_balance_transactions<'a>(
        &'a self,
        ctx: &'a RegionContext,
        source: &'a str,
        limit: u8,
    ) -> EngineFuture<'a, Vec<PspBalanceTransaction>>;

    fn retrieve_customer<'a>(
        &'a self,
        ctx: &'a RegionContext,
        id: &'a str,
    ) -> EngineFuture<'a, PspCustomer>;

    /// First PSP customer whose metadata names `ct_customer_id`, if any.
    fn search_customer<'a>(
        &'a self,
        ctx: &'a RegionContext,
        ct_customer_id: &'a str,
    ) -> EngineFuture<'a, Option<PspCustomer>>;

    fn create_customer<'a>(
        &'a self,
        ctx: &'a RegionContext,
        request: &'a CustomerRequest,
        key: &'a IdempotencyKey,
    ) -> EngineFuture<'a, PspCustomer>;

    /// Short-lived secret letting the browser act for `customer_id`.
    fn create_ephemeral_key<'a>(
        &'a self,
        ctx: &'a RegionContext,
        customer_id: &'a str,
        key: &'a IdempotencyKey,
    ) -> EngineFuture<'a, String>;

    /// Customer session for the payment element; returns its client secret.
    fn create_customer_session<'a>(
        &'a self,
        ctx: &'a RegionContext,
        customer_id: &'a str,
        features: &'a FeatureMap,
        key: &'a IdempotencyKey,
    ) -> EngineFuture<'a, String>;

    /// Cheapest authenticated call, used by the status endpoint.
    fn check_health<'a>(&'a self, ctx: &'a RegionContext) -> EngineFuture<'a, ()>;
}
