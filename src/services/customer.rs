use {
    super::lifecycle::contact_details,
    crate::domain::{
        commerce::{Cart, CommercePlatform, Customer},
        error::EngineError,
        gateway::{CustomerRequest, FeatureMap, META_CUSTOMER_ID, PaymentGateway, PspCustomer},
        id::{CartId, IdempotencyKey},
        region::RegionContext,
    },
    serde::Serialize,
    std::{collections::BTreeMap, sync::Arc},
};

/// What the payment element needs to show a returning buyer's saved methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSessionCreated {
    pub stripe_customer_id: String,
    pub ephemeral_key: String,
    pub session_id: String,
}

/// Links ledger customers to PSP customers and opens customer sessions.
///
/// The link lives in a custom field on the ledger customer. A saved id is
/// trusted only if the PSP still has that customer and its metadata points
/// back at the same ledger customer.
pub struct CustomerSessions {
    gateway: Arc<dyn PaymentGateway>,
    ledger: Arc<dyn CommercePlatform>,
    features: FeatureMap,
}

impl CustomerSessions {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        ledger: Arc<dyn CommercePlatform>,
        features: FeatureMap,
    ) -> Self {
        Self {
            gateway,
            ledger,
            features,
        }
    }

    /// `None` when the cart is anonymous or its customer no longer exists.
    #[tracing::instrument(
        name = "customer_session",
        skip_all,
        fields(cart_id = %cart_id, region = %ctx.region())
    )]
    pub async fn create_session(
        &self,
        ctx: &RegionContext,
        cart_id: &CartId,
    ) -> Result<Option<CustomerSessionCreated>, EngineError> {
        let cart = self.ledger.get_cart(cart_id).await?;
        let Some(customer_id) = &cart.customer_id else {
            tracing::warn!("cart has no customer, skipping customer session");
            return Ok(None);
        };
        let Some(customer) = self.ledger.get_customer(customer_id).await? else {
            tracing::info!(%customer_id, "customer not found, skipping customer session");
            return Ok(None);
        };

        let psp_customer_id = self.retrieve_or_create(ctx, &cart, &customer).await?;

        let ephemeral_key = self
            .gateway
            .create_ephemeral_key(
                ctx,
                &psp_customer_id,
                &IdempotencyKey::generate("create_ephemeral_key"),
            )
            .await?;
        let session_id = self
            .gateway
            .create_customer_session(
                ctx,
                &psp_customer_id,
                &self.features,
                &IdempotencyKey::generate("create_customer_session"),
            )
            .await?;

        Ok(Some(CustomerSessionCreated {
            stripe_customer_id: psp_customer_id,
            ephemeral_key,
            session_id,
        }))
    }

    /// The PSP customer for `customer`: the saved one if still valid, else one
    /// found by metadata, else a new one. Found and new ids are written back.
    pub async fn retrieve_or_create(
        &self,
        ctx: &RegionContext,
        cart: &Cart,
        customer: &Customer,
    ) -> Result<String, EngineError> {
        if let Some(saved) = &customer.psp_customer_id {
            if self.is_valid(ctx, saved, &customer.id).await? {
                tracing::info!(psp_customer_id = %saved, "saved psp customer is valid");
                return Ok(saved.clone());
            }
        }

        let psp_customer = match self.find(ctx, &customer.id).await? {
            Some(found) => found,
            None => {
                let created = self
                    .gateway
                    .create_customer(
                        ctx,
                        &customer_request(cart, customer),
                        &IdempotencyKey::generate("create_customer"),
                    )
                    .await?;
                tracing::info!(psp_customer_id = %created.id, "psp customer created");
                created
            }
        };

        self.ledger
            .set_psp_customer_id(customer, &psp_customer.id)
            .await?;
        Ok(psp_customer.id)
    }

    /// Rejections count as invalid; outages propagate.
    async fn is_valid(
        &self,
        ctx: &RegionContext,
        psp_customer_id: &str,
        customer_id: &str,
    ) -> Result<bool, EngineError> {
        match self.gateway.retrieve_customer(ctx, psp_customer_id).await {
            Ok(found) => Ok(belongs_to(&found, customer_id)),
            Err(e) if e.is_retryable() => Err(e),
            Err(e) => {
                tracing::warn!(%psp_customer_id, error = %e, "saved psp customer not usable");
                Ok(false)
            }
        }
    }

    async fn find(
        &self,
        ctx: &RegionContext,
        customer_id: &str,
    ) -> Result<Option<PspCustomer>, EngineError> {
        // The id is spliced into a search query; only platform-issued ids go in.
        if uuid::Uuid::parse_str(customer_id).is_err() {
            tracing::warn!(%customer_id, "customer id is not a uuid, skipping psp search");
            return Ok(None);
        }
        let found = self.gateway.search_customer(ctx, customer_id).await?;
        Ok(found.filter(|c| belongs_to(c, customer_id)))
    }
}

fn belongs_to(psp_customer: &PspCustomer, customer_id: &str) -> bool {
    !psp_customer.deleted && psp_customer.ct_customer_id.as_deref() == Some(customer_id)
}

/// New PSP customer for a ledger customer. The customer's saved address wins
/// over the cart's shipping address, field by field.
pub fn customer_request(cart: &Cart, customer: &Customer) -> CustomerRequest {
    let contact = contact_details(customer.addresses.first(), cart.shipping_address.as_ref());

    let email = cart
        .customer_email
        .clone()
        .or_else(|| customer.email.clone())
        .or_else(|| cart.shipping_address.as_ref().and_then(|a| a.email.clone()));

    let full_name = format!(
        "{} {}",
        customer.first_name.as_deref().unwrap_or_default(),
        customer.last_name.as_deref().unwrap_or_default()
    )
    .trim()
    .to_string();
    let name = Some(full_name)
        .filter(|n| !n.is_empty())
        .or_else(|| contact.as_ref().map(|c| c.name.clone()))
        .filter(|n| !n.is_empty());

    let mut metadata = BTreeMap::new();
    metadata.insert(META_CUSTOMER_ID.to_string(), customer.id.clone());

    CustomerRequest {
        email,
        name,
        phone: contact
            .as_ref()
            .map(|c| c.phone.clone())
            .filter(|p| !p.is_empty()),
        address: contact.map(|c| c.address),
        metadata,
    }
}
