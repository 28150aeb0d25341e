//! JSON shapes of the commerce platform's HTTP API.

use {
    crate::domain::{
        commerce::{Address, Cart, Customer},
        id::{CartId, PaymentId},
        ledger::{PaymentAction, PaymentDraft, TransactionDraft, TransactionState},
        money::Money,
    },
    serde::{Deserialize, Serialize},
    std::collections::HashMap,
};

/// Custom field on the customer type that remembers the PSP customer id.
pub const PSP_CUSTOMER_FIELD: &str = "stripeConnector_stripeCustomerId";

/// Customer type assigned when a customer carries no custom type yet.
pub const PSP_CUSTOMER_TYPE_KEY: &str = "payment-connector-stripe-customer-id";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub type_id: String,
    pub id: String,
}

impl Reference {
    pub fn new(type_id: &str, id: &str) -> Self {
        Self {
            type_id: type_id.to_string(),
            id: id.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxedPriceWire {
    pub total_gross: Money,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentInfoWire {
    #[serde(default)]
    pub payments: Vec<Reference>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartWire {
    pub id: CartId,
    pub version: i64,
    pub customer_id: Option<String>,
    pub anonymous_id: Option<String>,
    pub customer_email: Option<String>,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub total_price: Money,
    pub taxed_price: Option<TaxedPriceWire>,
    #[serde(default)]
    pub payment_info: Option<PaymentInfoWire>,
}

impl TryFrom<CartWire> for Cart {
    type Error = crate::domain::error::EngineError;

    fn try_from(w: CartWire) -> Result<Self, Self::Error> {
        let payment_ids = w
            .payment_info
            .unwrap_or_default()
            .payments
            .into_iter()
            .map(|r| PaymentId::new(r.id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: w.id,
            version: w.version,
            customer_id: w.customer_id,
            anonymous_id: w.anonymous_id,
            customer_email: w.customer_email,
            shipping_address: w.shipping_address,
            billing_address: w.billing_address,
            total_price: w.total_price,
            taxed_total_gross: w.taxed_price.map(|t| t.total_gross),
            payment_ids,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CustomFieldsWire {
    #[serde(rename = "type")]
    pub type_ref: Option<Reference>,
    #[serde(default)]
    pub fields: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerWire {
    pub id: String,
    pub version: i64,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    pub custom: Option<CustomFieldsWire>,
}

impl From<CustomerWire> for Customer {
    fn from(w: CustomerWire) -> Self {
        let custom = w.custom.unwrap_or_default();
        let psp_customer_id = custom
            .fields
            .get(PSP_CUSTOMER_FIELD)
            .and_then(|v| v.as_str())
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        Self {
            id: w.id,
            version: w.version,
            email: w.email,
            first_name: w.first_name,
            last_name: w.last_name,
            addresses: w.addresses,
            psp_customer_id,
            custom_type_id: custom.type_ref.map(|t| t.id),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodInfoWire {
    pub payment_interface: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDraftWire<'a> {
    pub amount_planned: &'a Money,
    pub payment_method_info: PaymentMethodInfoWire,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anonymous_id: Option<&'a str>,
    pub transactions: &'a [TransactionDraft],
}

impl<'a> From<&'a PaymentDraft> for PaymentDraftWire<'a> {
    fn from(d: &'a PaymentDraft) -> Self {
        Self {
            amount_planned: &d.amount_planned,
            payment_method_info: PaymentMethodInfoWire {
                payment_interface: d.payment_interface.clone(),
            },
            interface_id: d.interface_id.as_deref(),
            customer: d
                .customer_id
                .as_deref()
                .map(|id| Reference::new("customer", id)),
            anonymous_id: d.anonymous_id.as_deref(),
            transactions: &d.transactions,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PaymentActionWire<'a> {
    #[serde(rename_all = "camelCase")]
    SetInterfaceId { interface_id: &'a str },
    AddTransaction { transaction: &'a TransactionDraft },
    #[serde(rename_all = "camelCase")]
    ChangeTransactionState {
        transaction_id: &'a str,
        state: TransactionState,
    },
}

impl<'a> From<&'a PaymentAction> for PaymentActionWire<'a> {
    fn from(a: &'a PaymentAction) -> Self {
        match a {
            PaymentAction::SetInterfaceId(id) => Self::SetInterfaceId { interface_id: id },
            PaymentAction::AddTransaction(tx) => Self::AddTransaction { transaction: tx },
            PaymentAction::ChangeTransactionState {
                transaction_id,
                state,
            } => Self::ChangeTransactionState {
                transaction_id,
                state: *state,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum CartActionWire {
    AddPayment { payment: Reference },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeKeyWire {
    pub key: &'static str,
    pub type_id: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum CustomerActionWire<'a> {
    SetCustomField {
        name: &'static str,
        value: &'a str,
    },
    SetCustomType {
        #[serde(rename = "type")]
        type_key: TypeKeyWire,
        fields: HashMap<&'static str, &'a str>,
    },
}

impl<'a> CustomerActionWire<'a> {
    /// Set the PSP customer field in place when the customer already has a
    /// custom type; otherwise assign the connector's type carrying it.
    pub fn psp_customer_id(customer: &Customer, psp_customer_id: &'a str) -> Self {
        if customer.custom_type_id.is_some() {
            return Self::SetCustomField {
                name: PSP_CUSTOMER_FIELD,
                value: psp_customer_id,
            };
        }
        Self::SetCustomType {
            type_key: TypeKeyWire {
                key: PSP_CUSTOMER_TYPE_KEY,
                type_id: "type",
            },
            fields: HashMap::from([(PSP_CUSTOMER_FIELD, psp_customer_id)]),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UpdateWire<A> {
    pub version: i64,
    pub actions: Vec<A>,
}

#[derive(Debug, Deserialize)]
pub struct TokenWire {
    pub access_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorBodyWire {
    #[serde(default)]
    pub message: String,
}
