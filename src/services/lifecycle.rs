use {
    super::applier::{ApplyOutcome, LedgerApplier},
    crate::domain::{
        commerce::{Address, Cart, CommercePlatform, Customer},
        error::EngineError,
        event::TransactionUpdate,
        gateway::{
            CaptureMethod, FeatureMap, IntentRequest, META_CART_ID, META_CUSTOMER_ID,
            META_PAYMENT_ID, META_PROJECT_KEY, PaymentGateway, PostalAddress, ShippingDetails,
        },
        id::{CartId, IdempotencyKey, IntentId, PaymentId},
        ledger::{PaymentDraft, TransactionDraft, TransactionState, TransactionType},
        region::RegionContext,
    },
    serde::Serialize,
    std::{collections::BTreeMap, sync::Arc},
};

/// Checkout-facing settings, fixed at startup.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub project_key: String,
    pub capture_method: CaptureMethod,
    pub payment_interface: String,
    pub merchant_return_url: String,
    pub setup_future_usage: Option<String>,
    /// When false the checkout widget collects the billing address itself.
    pub send_billing_address: bool,
    /// Raw `collectBillingAddress` option handed to the payment element.
    pub collect_billing_address: String,
    pub appearance: Option<String>,
    pub layout: String,
    /// Customer-session features, e.g. whether buyers may save payment methods.
    pub saved_payment_methods: FeatureMap,
    pub apple_pay_well_known: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartInfo {
    pub amount: i64,
    pub currency: String,
}

/// Payment element configuration for one cart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementConfig {
    pub cart_info: CartInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appearance: Option<String>,
    pub capture_method: CaptureMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup_future_usage: Option<serde_json::Value>,
    pub layout: String,
    pub collect_billing_address: String,
}

/// What the checkout widget needs to confirm the intent client-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentCreated {
    pub s_client_secret: String,
    pub payment_reference: PaymentId,
    pub merchant_return_url: String,
    pub cart_id: CartId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<String>,
}

/// Creates PSP intents backed by ledger payments and confirms them once the
/// buyer has authenticated.
pub struct LifecycleManager {
    gateway: Arc<dyn PaymentGateway>,
    ledger: Arc<dyn CommercePlatform>,
    applier: Arc<LedgerApplier>,
    settings: CheckoutSettings,
}

impl LifecycleManager {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        ledger: Arc<dyn CommercePlatform>,
        applier: Arc<LedgerApplier>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            gateway,
            ledger,
            applier,
            settings,
        }
    }

    #[tracing::instrument(
        name = "create_intent",
        skip_all,
        fields(cart_id = %cart_id, region = %ctx.region())
    )]
    pub async fn create_intent(
        &self,
        ctx: &RegionContext,
        cart_id: &CartId,
    ) -> Result<IntentCreated, EngineError> {
        let cart = self.ledger.get_cart(cart_id).await?;
        let amount = self.ledger.get_payment_amount(&cart).await?;
        if amount.amount().is_zero() {
            return Err(EngineError::Validation(format!(
                "cart {cart_id} has nothing to pay"
            )));
        }

        let customer = match &cart.customer_id {
            Some(id) => self.ledger.get_customer(id).await?,
            None => None,
        };

        let mut metadata = BTreeMap::new();
        metadata.insert(META_CART_ID.to_string(), cart.id.to_string());
        metadata.insert(
            META_PROJECT_KEY.to_string(),
            self.settings.project_key.clone(),
        );
        if let Some(customer_id) = &cart.customer_id {
            metadata.insert(META_CUSTOMER_ID.to_string(), customer_id.clone());
        }

        let psp_customer = customer.as_ref().and_then(|c| c.psp_customer_id.clone());
        let request = IntentRequest {
            amount: amount.clone(),
            capture_method: self.settings.capture_method,
            setup_future_usage: psp_customer
                .as_ref()
                .and(self.settings.setup_future_usage.clone()),
            customer: psp_customer,
            metadata,
            shipping: shipping_details(&cart, customer.as_ref()),
            request_multicapture: true,
        };

        let intent = self
            .gateway
            .create_intent(ctx, &request, &IdempotencyKey::generate("create_intent"))
            .await?;
        tracing::info!(intent_id = %intent.id, amount = %amount, "payment intent created");

        let draft = PaymentDraft {
            amount_planned: amount.clone(),
            payment_interface: self.settings.payment_interface.clone(),
            interface_id: Some(intent.id.to_string()),
            customer_id: cart.customer_id.clone(),
            anonymous_id: cart
                .customer_id
                .is_none()
                .then(|| cart.anonymous_id.clone())
                .flatten(),
            transactions: vec![TransactionDraft {
                kind: TransactionType::Authorization,
                state: TransactionState::Initial,
                amount,
                interaction_id: Some(intent.id.to_string()),
            }],
        };

        let payment = self.ledger.create_payment(&draft).await?;
        self.ledger
            .add_payment_to_cart(&cart.id, cart.version, &payment.id)
            .await?;
        tracing::info!(payment_id = %payment.id, intent_id = %intent.id, "ledger payment created and linked to cart");

        // The payment is persisted from here on. A failure below is surfaced,
        // never rolled back.
        let mut link = BTreeMap::new();
        link.insert(META_PAYMENT_ID.to_string(), payment.id.to_string());
        self.gateway
            .update_intent_metadata(
                ctx,
                &intent.id,
                &link,
                &IdempotencyKey::generate("update_intent_metadata"),
            )
            .await
            .inspect_err(|e| {
                tracing::error!(
                    payment_id = %payment.id,
                    intent_id = %intent.id,
                    error = %e,
                    "ledger payment created but intent metadata not updated"
                );
            })?;

        let billing_address = if self.settings.send_billing_address {
            billing_address(&cart)?
        } else {
            None
        };

        Ok(IntentCreated {
            s_client_secret: intent.client_secret.unwrap_or_default(),
            payment_reference: payment.id,
            merchant_return_url: self.settings.merchant_return_url.clone(),
            cart_id: cart.id.clone(),
            billing_address,
        })
    }

    pub async fn element_config(
        &self,
        cart_id: &CartId,
        component: &str,
    ) -> Result<ElementConfig, EngineError> {
        let cart = self.ledger.get_cart(cart_id).await?;
        let amount = self.ledger.get_payment_amount(&cart).await?;

        let config = ElementConfig {
            cart_info: CartInfo {
                amount: amount.amount().minor_units(),
                currency: amount.currency().as_str().to_string(),
            },
            appearance: self.settings.appearance.clone(),
            capture_method: self.settings.capture_method,
            setup_future_usage: self
                .settings
                .saved_payment_methods
                .get("payment_method_save_usage")
                .cloned(),
            layout: self.settings.layout.clone(),
            collect_billing_address: self.settings.collect_billing_address.clone(),
        };
        tracing::info!(
            %cart_id,
            component,
            amount = config.cart_info.amount,
            currency = %config.cart_info.currency,
            "payment element config retrieved"
        );
        Ok(config)
    }

    /// Apple Pay domain association file, when one is configured.
    pub fn apple_pay_well_known(&self) -> Option<&str> {
        self.settings.apple_pay_well_known.as_deref()
    }

    /// Move the payment's Initial authorization to Success. Repeated
    /// confirmations are no-ops.
    #[tracing::instrument(
        name = "confirm_intent",
        skip_all,
        fields(intent_id = %intent_id, payment_id = %payment_id)
    )]
    pub async fn confirm_intent(
        &self,
        intent_id: &IntentId,
        payment_id: &PaymentId,
    ) -> Result<(), EngineError> {
        let payment = self.ledger.get_payment(payment_id).await?;

        if let Some(bound) = &payment.interface_id {
            if bound != intent_id.as_str() {
                return Err(EngineError::Validation(format!(
                    "payment {payment_id} belongs to intent {bound}, not {intent_id}"
                )));
            }
        }

        let update = TransactionUpdate {
            payment_id: payment.id.clone(),
            psp_reference: Some(intent_id.to_string()),
            transactions: vec![TransactionDraft {
                kind: TransactionType::Authorization,
                state: TransactionState::Success,
                amount: payment.amount_planned.clone(),
                interaction_id: Some(intent_id.to_string()),
            }],
        };

        match self.applier.apply(&update).await? {
            ApplyOutcome::Applied { .. } => {
                tracing::info!("authorization confirmed");
                Ok(())
            }
            ApplyOutcome::Duplicate => {
                tracing::info!("authorization already confirmed");
                Ok(())
            }
            ApplyOutcome::Anomaly { current } => Err(EngineError::Validation(format!(
                "authorization is already {current}"
            ))),
        }
    }
}

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

fn postal_address(address: &Address) -> PostalAddress {
    PostalAddress {
        line1: format!("{} {}", field(&address.street_number), field(&address.street_name))
            .trim()
            .to_string(),
        line2: field(&address.additional_street_info).to_string(),
        city: field(&address.city).to_string(),
        postal_code: field(&address.postal_code).to_string(),
        state: field(&address.state).to_string(),
        country: field(&address.country).to_string(),
    }
}

fn contact_name(address: &Address) -> String {
    format!("{} {}", field(&address.first_name), field(&address.last_name))
        .trim()
        .to_string()
}

fn contact_phone(address: &Address) -> String {
    address
        .phone
        .as_deref()
        .filter(|p| !p.is_empty())
        .or(address.mobile.as_deref())
        .unwrap_or_default()
        .to_string()
}

/// Field-by-field merge: every field unset on `prioritized` is taken from `fallback`.
pub fn merge_addresses(prioritized: Option<&Address>, fallback: Option<&Address>) -> Option<Address> {
    let (p, f) = match (prioritized, fallback) {
        (None, None) => return None,
        (Some(only), None) | (None, Some(only)) => return Some(only.clone()),
        (Some(p), Some(f)) => (p, f),
    };
    let pick = |a: &Option<String>, b: &Option<String>| a.clone().or_else(|| b.clone());

    Some(Address {
        first_name: pick(&p.first_name, &f.first_name),
        last_name: pick(&p.last_name, &f.last_name),
        street_name: pick(&p.street_name, &f.street_name),
        street_number: pick(&p.street_number, &f.street_number),
        additional_street_info: pick(&p.additional_street_info, &f.additional_street_info),
        postal_code: pick(&p.postal_code, &f.postal_code),
        city: pick(&p.city, &f.city),
        state: pick(&p.state, &f.state),
        country: pick(&p.country, &f.country),
        phone: pick(&p.phone, &f.phone),
        mobile: pick(&p.mobile, &f.mobile),
        email: pick(&p.email, &f.email),
    })
}

/// Name, phone and postal address from `prioritized`, filled in from `fallback`.
pub fn contact_details(
    prioritized: Option<&Address>,
    fallback: Option<&Address>,
) -> Option<ShippingDetails> {
    let address = merge_addresses(prioritized, fallback)?;
    Some(ShippingDetails {
        name: contact_name(&address),
        phone: contact_phone(&address),
        address: postal_address(&address),
    })
}

/// Cart shipping address, completed from the customer's first saved address.
pub fn shipping_details(cart: &Cart, customer: Option<&Customer>) -> Option<ShippingDetails> {
    contact_details(
        cart.shipping_address.as_ref(),
        customer.and_then(|c| c.addresses.first()),
    )
}

#[derive(Serialize)]
struct BillingDetails<'a> {
    name: String,
    phone: String,
    email: &'a str,
    address: PostalAddress,
}

/// Billing address serialized for the checkout widget: the cart's billing
/// address, completed from its shipping address.
pub fn billing_address(cart: &Cart) -> Result<Option<String>, EngineError> {
    let Some(address) =
        merge_addresses(cart.billing_address.as_ref(), cart.shipping_address.as_ref())
    else {
        return Ok(None);
    };

    let details = BillingDetails {
        name: contact_name(&address),
        phone: contact_phone(&address),
        email: field(&cart.customer_email),
        address: postal_address(&address),
    };
    Ok(Some(serde_json::to_string(&details)?))
}
