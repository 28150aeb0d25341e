use {
    crate::{
        config::StripeSettings,
        domain::{
            EngineFuture,
            error::EngineError,
            gateway::{
                CaptureRequest, CustomerRequest, FeatureMap, IntentRequest, META_CUSTOMER_ID,
                PaymentGateway, PostalAddress, PspBalanceTransaction, PspCustomer, PspIntent,
                PspRefund, ShippingDetails,
            },
            id::{IdempotencyKey, IntentId},
            region::{Region, RegionContext, RegionRegistry},
        },
    },
    serde::{Deserialize, Serialize, de::DeserializeOwned},
    std::{collections::{BTreeMap, HashMap}, future::Future, time::Duration},
};

const BACKOFF_BASE: Duration = Duration::from_millis(250);

/// `PaymentGateway` over the Stripe REST API, one client per configured region.
pub struct StripeGateway {
    clients: HashMap<Region, stripe::Client>,
    settings: StripeSettings,
}

impl StripeGateway {
    pub fn new(regions: &RegionRegistry, settings: StripeSettings) -> Self {
        let clients = regions
            .regions()
            .filter_map(|region| {
                regions
                    .get(region)
                    .map(|ctx| (region, stripe::Client::new(ctx.secret_key())))
            })
            .collect();
        Self { clients, settings }
    }

    fn client(&self, ctx: &RegionContext) -> Result<&stripe::Client, EngineError> {
        self.clients.get(&ctx.region()).ok_or_else(|| {
            EngineError::Configuration(format!("no Stripe client for region {}", ctx.region()))
        })
    }

    /// Client that sends `key` with every attempt, so a retried mutation
    /// collapses into one PSP-side object.
    fn idempotent_client(
        &self,
        ctx: &RegionContext,
        key: &IdempotencyKey,
    ) -> Result<stripe::Client, EngineError> {
        Ok(self
            .client(ctx)?
            .clone()
            .with_strategy(stripe::RequestStrategy::Idempotent(key.as_str().to_string())))
    }

    /// Timeout each attempt; retry rate limits, 5xx and network failures.
    async fn with_retry<T, F, Fut>(
        &self,
        ctx: &RegionContext,
        operation: &'static str,
        call: F,
    ) -> Result<T, EngineError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, stripe::StripeError>>,
    {
        let mut attempt = 0;
        loop {
            let err = match tokio::time::timeout(self.settings.request_timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => map_stripe_error(e),
                Err(_) => EngineError::PspTransient(format!(
                    "request timed out after {:?}",
                    self.settings.request_timeout
                )),
            };

            if !err.is_retryable() || attempt >= self.settings.max_retries {
                tracing::error!(
                    region = %ctx.region(),
                    operation,
                    attempts = attempt + 1,
                    error = %err,
                    "stripe call failed"
                );
                return Err(err);
            }

            tracing::warn!(
                region = %ctx.region(),
                operation,
                attempt = attempt + 1,
                error = %err,
                "retrying stripe call after transient error"
            );
            tokio::time::sleep(BACKOFF_BASE * 2u32.saturating_pow(attempt)).await;
            attempt += 1;
        }
    }

    async fn post<T, F>(
        &self,
        ctx: &RegionContext,
        operation: &'static str,
        path: &str,
        form: &F,
        key: &IdempotencyKey,
    ) -> Result<T, EngineError>
    where
        T: DeserializeOwned + Send + 'static,
        F: Serialize,
    {
        let client = self.idempotent_client(ctx, key)?;
        self.with_retry(ctx, operation, || client.post_form::<T, _>(path, form))
            .await
    }

    async fn get<T, P>(
        &self,
        ctx: &RegionContext,
        operation: &'static str,
        path: &str,
        params: &P,
    ) -> Result<T, EngineError>
    where
        T: DeserializeOwned + Send + 'static,
        P: Serialize,
    {
        let client = self.client(ctx)?;
        self.with_retry(ctx, operation, || client.get_query::<T, _>(path, params))
            .await
    }
}

fn map_stripe_error(err: stripe::StripeError) -> EngineError {
    match err {
        stripe::StripeError::Stripe(e) => {
            let status = e.http_status;
            let message = e.message.clone().unwrap_or_else(|| "unknown error".into());
            if status == 429 || (500..600).contains(&status) {
                EngineError::PspTransient(format!("{status}: {message}"))
            } else {
                EngineError::PspPermanent(format!("{status}: {message}"))
            }
        }
        stripe::StripeError::Timeout => EngineError::PspTransient("request timed out".into()),
        stripe::StripeError::ClientError(msg) => EngineError::PspTransient(msg),
        other => EngineError::PspPermanent(other.to_string()),
    }
}

// ── Wire shapes ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct AutomaticPaymentMethods {
    enabled: bool,
}

#[derive(Serialize)]
struct CardOptionsForm {
    request_multicapture: &'static str,
}

#[derive(Serialize)]
struct PaymentMethodOptionsForm {
    card: CardOptionsForm,
}

#[derive(Serialize)]
struct CreateIntentForm<'a> {
    amount: i64,
    currency: String,
    capture_method: &'static str,
    automatic_payment_methods: AutomaticPaymentMethods,
    metadata: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    customer: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    setup_future_usage: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shipping: Option<&'a ShippingDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_method_options: Option<PaymentMethodOptionsForm>,
}

#[derive(Serialize)]
struct MetadataForm<'a> {
    metadata: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct CaptureForm {
    amount_to_capture: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    final_capture: Option<bool>,
}

#[derive(Serialize)]
struct RefundForm<'a> {
    payment_intent: &'a str,
    amount: i64,
}

#[derive(Serialize)]
struct NoParams {}

#[derive(Serialize)]
struct CreatedFilter {
    gte: i64,
}

#[derive(Serialize)]
struct ListRefundsQuery<'a> {
    charge: &'a str,
    created: CreatedFilter,
    limit: u8,
}

#[derive(Serialize)]
struct ListBalanceTransactionsQuery<'a> {
    source: &'a str,
    limit: u8,
}

#[derive(Serialize)]
struct CustomerForm<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<&'a PostalAddress>,
    metadata: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct SearchQuery {
    query: String,
    limit: u8,
}

#[derive(Serialize)]
struct EphemeralKeyForm<'a> {
    customer: &'a str,
}

#[derive(Serialize)]
struct PaymentElementForm<'a> {
    enabled: bool,
    features: &'a FeatureMap,
}

#[derive(Serialize)]
struct SessionComponentsForm<'a> {
    payment_element: PaymentElementForm<'a>,
}

#[derive(Serialize)]
struct CustomerSessionForm<'a> {
    customer: &'a str,
    components: SessionComponentsForm<'a>,
}

#[derive(Serialize)]
struct LimitQuery {
    limit: u8,
}

#[derive(Deserialize)]
struct CustomerWire {
    id: String,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

impl From<CustomerWire> for PspCustomer {
    fn from(mut w: CustomerWire) -> Self {
        Self {
            ct_customer_id: w.metadata.remove(META_CUSTOMER_ID),
            id: w.id,
            deleted: w.deleted,
        }
    }
}

#[derive(Deserialize)]
struct SecretWire {
    secret: String,
}

#[derive(Deserialize)]
struct ClientSecretWire {
    client_secret: String,
}

#[derive(Deserialize)]
struct IntentWire {
    id: String,
    amount: i64,
    #[serde(default)]
    amount_received: i64,
    currency: String,
    status: String,
    client_secret: Option<String>,
}

impl TryFrom<IntentWire> for PspIntent {
    type Error = EngineError;

    fn try_from(w: IntentWire) -> Result<Self, Self::Error> {
        Ok(Self {
            id: IntentId::new(w.id)?,
            amount: w.amount,
            amount_received: w.amount_received,
            currency: w.currency,
            status: w.status,
            client_secret: w.client_secret,
        })
    }
}

#[derive(Deserialize)]
struct RefundWire {
    id: String,
    amount: i64,
    currency: String,
    created: i64,
    status: Option<String>,
}

impl From<RefundWire> for PspRefund {
    fn from(w: RefundWire) -> Self {
        Self {
            id: w.id,
            amount: w.amount,
            currency: w.currency,
            created: w.created,
            status: w.status,
        }
    }
}

#[derive(Deserialize)]
struct BalanceTransactionWire {
    id: String,
    amount: i64,
    currency: String,
}

#[derive(Deserialize)]
struct ListWire<T> {
    data: Vec<T>,
}

impl PaymentGateway for StripeGateway {
    fn create_intent<'a>(
        &'a self,
        ctx: &'a RegionContext,
        request: &'a IntentRequest,
        key: &'a IdempotencyKey,
    ) -> EngineFuture<'a, PspIntent> {
        Box::pin(async move {
            let form = CreateIntentForm {
                amount: request.amount.amount().minor_units(),
                currency: request.amount.currency().to_psp(),
                capture_method: request.capture_method.as_str(),
                automatic_payment_methods: AutomaticPaymentMethods { enabled: true },
                metadata: &request.metadata,
                customer: request.customer.as_deref(),
                setup_future_usage: request.setup_future_usage.as_deref(),
                shipping: request.shipping.as_ref(),
                payment_method_options: request.request_multicapture.then_some(
                    PaymentMethodOptionsForm {
                        card: CardOptionsForm {
                            request_multicapture: "if_available",
                        },
                    },
                ),
            };
            let wire: IntentWire = self
                .post(ctx, "create_intent", "/payment_intents", &form, key)
                .await?;
            wire.try_into()
        })
    }

    fn retrieve_intent<'a>(
        &'a self,
        ctx: &'a RegionContext,
        id: &'a IntentId,
    ) -> EngineFuture<'a, PspIntent> {
        Box::pin(async move {
            let path = format!("/payment_intents/{id}");
            let wire: IntentWire = self.get(ctx, "retrieve_intent", &path, &NoParams {}).await?;
            wire.try_into()
        })
    }

    fn update_intent_metadata<'a>(
        &'a self,
        ctx: &'a RegionContext,
        id: &'a IntentId,
        metadata: &'a BTreeMap<String, String>,
        key: &'a IdempotencyKey,
    ) -> EngineFuture<'a, PspIntent> {
        Box::pin(async move {
            let path = format!("/payment_intents/{id}");
            let wire: IntentWire = self
                .post(ctx, "update_intent_metadata", &path, &MetadataForm { metadata }, key)
                .await?;
            wire.try_into()
        })
    }

    fn capture_intent<'a>(
        &'a self,
        ctx: &'a RegionContext,
        id: &'a IntentId,
        capture: CaptureRequest,
        key: &'a IdempotencyKey,
    ) -> EngineFuture<'a, PspIntent> {
        Box::pin(async move {
            let path = format!("/payment_intents/{id}/capture");
            let form = CaptureForm {
                amount_to_capture: capture.amount_to_capture,
                final_capture: capture.final_capture,
            };
            let wire: IntentWire = self.post(ctx, "capture_intent", &path, &form, key).await?;
            wire.try_into()
        })
    }

    fn cancel_intent<'a>(
        &'a self,
        ctx: &'a RegionContext,
        id: &'a IntentId,
        key: &'a IdempotencyKey,
    ) -> EngineFuture<'a, PspIntent> {
        Box::pin(async move {
            let path = format!("/payment_intents/{id}/cancel");
            let wire: IntentWire = self
                .post(ctx, "cancel_intent", &path, &NoParams {}, key)
                .await?;
            wire.try_into()
        })
    }

    fn create_refund<'a>(
        &'a self,
        ctx: &'a RegionContext,
        id: &'a IntentId,
        amount: i64,
        key: &'a IdempotencyKey,
    ) -> EngineFuture<'a, PspRefund> {
        Box::pin(async move {
            let form = RefundForm {
                payment_intent: id.as_str(),
                amount,
            };
            let wire: RefundWire = self.post(ctx, "create_refund", "/refunds", &form, key).await?;
            Ok(wire.into())
        })
    }

    fn list_refunds<'a>(
        &'a self,
        ctx: &'a RegionContext,
        charge_id: &'a str,
        created_gte: i64,
        limit: u8,
    ) -> EngineFuture<'a, Vec<PspRefund>> {
        Box::pin(async move {
            let query = ListRefundsQuery {
                charge: charge_id,
                created: CreatedFilter { gte: created_gte },
                limit,
            };
            let list: ListWire<RefundWire> =
                self.get(ctx, "list_refunds", "/refunds", &query).await?;
            Ok(list.data.into_iter().map(PspRefund::from).collect())
        })
    }

    fn list_balance_transactions<'a>(
        &'a self,
        ctx: &'a RegionContext,
        source: &'a str,
        limit: u8,
    ) -> EngineFuture<'a, Vec<PspBalanceTransaction>> {
        Box::pin(async move {
            let query = ListBalanceTransactionsQuery { source, limit };
            let list: ListWire<BalanceTransactionWire> = self
                .get(ctx, "list_balance_transactions", "/balance_transactions", &query)
                .await?;
            Ok(list
                .data
                .into_iter()
                .map(|w| PspBalanceTransaction {
                    id: w.id,
                    amount: w.amount,
                    currency: w.currency,
                })
                .collect())
        })
    }

    fn retrieve_customer<'a>(
        &'a self,
        ctx: &'a RegionContext,
        id: &'a str,
    ) -> EngineFuture<'a, PspCustomer> {
        Box::pin(async move {
            let path = format!("/customers/{id}");
            let wire: CustomerWire = self
                .get(ctx, "retrieve_customer", &path, &NoParams {})
                .await?;
            Ok(wire.into())
        })
    }

    fn search_customer<'a>(
        &'a self,
        ctx: &'a RegionContext,
        ct_customer_id: &'a str,
    ) -> EngineFuture<'a, Option<PspCustomer>> {
        Box::pin(async move {
            let query = SearchQuery {
                query: format!("metadata['{META_CUSTOMER_ID}']:'{ct_customer_id}'"),
                limit: 1,
            };
            let list: ListWire<CustomerWire> = self
                .get(ctx, "search_customer", "/customers/search", &query)
                .await?;
            Ok(list.data.into_iter().next().map(PspCustomer::from))
        })
    }

    fn create_customer<'a>(
        &'a self,
        ctx: &'a RegionContext,
        request: &'a CustomerRequest,
        key: &'a IdempotencyKey,
    ) -> EngineFuture<'a, PspCustomer> {
        Box::pin(async move {
            let form = CustomerForm {
                email: request.email.as_deref(),
                name: request.name.as_deref(),
                phone: request.phone.as_deref(),
                address: request.address.as_ref(),
                metadata: &request.metadata,
            };
            let wire: CustomerWire = self
                .post(ctx, "create_customer", "/customers", &form, key)
                .await?;
            Ok(wire.into())
        })
    }

    fn create_ephemeral_key<'a>(
        &'a self,
        ctx: &'a RegionContext,
        customer_id: &'a str,
        key: &'a IdempotencyKey,
    ) -> EngineFuture<'a, String> {
        Box::pin(async move {
            let form = EphemeralKeyForm {
                customer: customer_id,
            };
            let wire: SecretWire = self
                .post(ctx, "create_ephemeral_key", "/ephemeral_keys", &form, key)
                .await?;
            Ok(wire.secret)
        })
    }

    fn create_customer_session<'a>(
        &'a self,
        ctx: &'a RegionContext,
        customer_id: &'a str,
        features: &'a FeatureMap,
        key: &'a IdempotencyKey,
    ) -> EngineFuture<'a, String> {
        Box::pin(async move {
            let form = CustomerSessionForm {
                customer: customer_id,
                components: SessionComponentsForm {
                    payment_element: PaymentElementForm {
                        enabled: true,
                        features,
                    },
                },
            };
            let wire: ClientSecretWire = self
                .post(ctx, "create_customer_session", "/customer_sessions", &form, key)
                .await?;
            Ok(wire.client_secret)
        })
    }

    fn check_health<'a>(&'a self, ctx: &'a RegionContext) -> EngineFuture<'a, ()> {
        Box::pin(async move {
            self.get::<serde_json::Value, _>(
                ctx,
                "check_health",
                "/payment_methods",
                &LimitQuery { limit: 3 },
            )
            .await
            .map(|_| ())
        })
    }
}
