use {
    super::EngineFuture,
    super::id::{CartId, PaymentId},
    super::ledger::{LedgerPayment, PaymentAction, PaymentDraft},
    super::money::Money,
    serde::{Deserialize, Serialize},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub street_name: Option<String>,
    pub street_number: Option<String>,
    pub additional_street_info: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    pub version: i64,
    pub customer_id: Option<String>,
    pub anonymous_id: Option<String>,
    pub customer_email: Option<String>,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub total_price: Money,
    pub taxed_total_gross: Option<Money>,
    #[serde(default)]
    pub payment_ids: Vec<PaymentId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub version: i64,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    /// PSP-side customer previously linked to this buyer.
    pub psp_customer_id: Option<String>,
    /// Custom type currently assigned to the customer, if any.
    pub custom_type_id: Option<String>,
}

/// Narrow view of the commerce platform. Every mutation carries the version
/// the caller last saw; a mismatch comes back as `EngineError::LedgerConflict`.
pub trait CommercePlatform: Send + Sync {
    fn get_cart<'a>(&'a self, id: &'a CartId) -> EngineFuture<'a, Cart>;

    fn get_payment_amount<'a>(&'a self, cart: &'a Cart) -> EngineFuture<'a, Money>;

    fn create_payment<'a>(&'a self, draft: &'a PaymentDraft) -> EngineFuture<'a, LedgerPayment>;

    fn get_payment<'a>(&'a self, id: &'a PaymentId) -> EngineFuture<'a, LedgerPayment>;

    fn update_payment<'a>(
        &'a self,
        id: &'a PaymentId,
        version: i64,
        actions: &'a [PaymentAction],
    ) -> EngineFuture<'a, LedgerPayment>;

    fn add_payment_to_cart<'a>(
        &'a self,
        cart_id: &'a CartId,
        cart_version: i64,
        payment_id: &'a PaymentId,
    ) -> EngineFuture<'a, Cart>;

    /// `None` when the customer does not exist.
    fn get_customer<'a>(&'a self, id: &'a str) -> EngineFuture<'a, Option<Customer>>;

    /// Remember `psp_customer_id` on the customer, written against `customer.version`.
    fn set_psp_customer_id<'a>(
        &'a self,
        customer: &'a Customer,
        psp_customer_id: &'a str,
    ) -> EngineFuture<'a, Customer>;

    fn check_health<'a>(&'a self) -> EngineFuture<'a, ()>;
}
