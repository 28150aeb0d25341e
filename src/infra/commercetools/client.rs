use {
    super::wire::{
        CartActionWire, CartWire, CustomerActionWire, CustomerWire, ErrorBodyWire,
        PaymentActionWire, PaymentDraftWire, Reference, TokenWire, UpdateWire,
    },
    crate::{
        config::CommerceSettings,
        domain::{
            EngineFuture,
            commerce::{Cart, CommercePlatform, Customer},
            error::EngineError,
            id::{CartId, PaymentId},
            ledger::{LedgerPayment, PaymentAction, PaymentDraft},
            money::Money,
        },
    },
    reqwest::{Method, RequestBuilder, StatusCode},
    serde::{Serialize, de::DeserializeOwned},
    std::time::{Duration, Instant},
    tokio::sync::Mutex,
};

/// Tokens are refreshed this long before the platform says they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// `CommercePlatform` over the commercetools HTTP API.
pub struct CommercetoolsClient {
    http: reqwest::Client,
    settings: CommerceSettings,
    token: Mutex<Option<CachedToken>>,
}

impl CommercetoolsClient {
    pub fn new(settings: CommerceSettings, timeout: Duration) -> Result<Self, EngineError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            http,
            settings,
            token: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.settings.api_url.trim_end_matches('/'),
            self.settings.project_key,
            path
        )
    }

    /// Client-credentials token, cached until shortly before expiry.
    async fn access_token(&self) -> Result<String, EngineError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| Instant::now() < t.refresh_at) {
            return Ok(token.value.clone());
        }

        let url = format!(
            "{}/oauth/token",
            self.settings.auth_url.trim_end_matches('/')
        );
        let scope = format!("manage_project:{}", self.settings.project_key);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.settings.client_id, Some(&self.settings.client_secret))
            .query(&[("grant_type", "client_credentials"), ("scope", scope.as_str())])
            .send()
            .await
            .map_err(|e| EngineError::LedgerPermanent(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(EngineError::Configuration(format!(
                "commerce platform rejected credentials: HTTP {status}"
            )));
        }

        let token: TokenWire = response
            .json()
            .await
            .map_err(|e| EngineError::LedgerPermanent(format!("token response: {e}")))?;

        tracing::debug!(expires_in = token.expires_in, "commerce platform token refreshed");
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, EngineError> {
        let token = self.access_token().await?;
        Ok(self.http.request(method, self.url(path)).bearer_auth(token))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        what: &str,
        request: RequestBuilder,
    ) -> Result<T, EngineError> {
        let response = request
            .send()
            .await
            .map_err(|e| EngineError::LedgerPermanent(format!("{what}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body: ErrorBodyWire = response.json().await.unwrap_or_default();
            return Err(map_status(what, status, &body.message));
        }

        response
            .json()
            .await
            .map_err(|e| EngineError::LedgerPermanent(format!("{what}: unreadable response: {e}")))
    }

    async fn get<T: DeserializeOwned>(&self, what: &str, path: &str) -> Result<T, EngineError> {
        let request = self.request(Method::GET, path).await?;
        self.send(what, request).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        what: &str,
        path: &str,
        body: &B,
    ) -> Result<T, EngineError> {
        let request = self.request(Method::POST, path).await?.json(body);
        self.send(what, request).await
    }
}

/// 409 is an optimistic-concurrency miss; 404 an unknown resource.
pub fn map_status(what: &str, status: StatusCode, message: &str) -> EngineError {
    match status {
        StatusCode::CONFLICT => EngineError::LedgerConflict(format!("{what}: {message}")),
        StatusCode::NOT_FOUND => EngineError::NotFound(format!("{what}: {message}")),
        other => EngineError::LedgerPermanent(format!("{what}: HTTP {other}: {message}")),
    }
}

/// What the buyer still has to pay: the taxed gross when taxes are computed,
/// otherwise the cart total.
pub fn payment_amount(cart: &Cart) -> Money {
    cart.taxed_total_gross
        .clone()
        .unwrap_or_else(|| cart.total_price.clone())
}

impl CommercePlatform for CommercetoolsClient {
    fn get_cart<'a>(&'a self, id: &'a CartId) -> EngineFuture<'a, Cart> {
        Box::pin(async move {
            let wire: CartWire = self.get("get cart", &format!("carts/{id}")).await?;
            wire.try_into()
        })
    }

    fn get_payment_amount<'a>(&'a self, cart: &'a Cart) -> EngineFuture<'a, Money> {
        Box::pin(async move { Ok(payment_amount(cart)) })
    }

    fn create_payment<'a>(&'a self, draft: &'a PaymentDraft) -> EngineFuture<'a, LedgerPayment> {
        Box::pin(async move {
            let body = PaymentDraftWire::from(draft);
            self.post("create payment", "payments", &body).await
        })
    }

    fn get_payment<'a>(&'a self, id: &'a PaymentId) -> EngineFuture<'a, LedgerPayment> {
        Box::pin(async move { self.get("get payment", &format!("payments/{id}")).await })
    }

    fn update_payment<'a>(
        &'a self,
        id: &'a PaymentId,
        version: i64,
        actions: &'a [PaymentAction],
    ) -> EngineFuture<'a, LedgerPayment> {
        Box::pin(async move {
            let body = UpdateWire {
                version,
                actions: actions.iter().map(PaymentActionWire::from).collect(),
            };
            self.post("update payment", &format!("payments/{id}"), &body)
                .await
        })
    }

    fn add_payment_to_cart<'a>(
        &'a self,
        cart_id: &'a CartId,
        cart_version: i64,
        payment_id: &'a PaymentId,
    ) -> EngineFuture<'a, Cart> {
        Box::pin(async move {
            let body = UpdateWire {
                version: cart_version,
                actions: vec![CartActionWire::AddPayment {
                    payment: Reference::new("payment", payment_id.as_str()),
                }],
            };
            let wire: CartWire = self
                .post("add payment to cart", &format!("carts/{cart_id}"), &body)
                .await?;
            wire.try_into()
        })
    }

    fn get_customer<'a>(&'a self, id: &'a str) -> EngineFuture<'a, Option<Customer>> {
        Box::pin(async move {
            match self
                .get::<CustomerWire>("get customer", &format!("customers/{id}"))
                .await
            {
                Ok(wire) => Ok(Some(wire.into())),
                Err(EngineError::NotFound(_)) => Ok(None),
                Err(e) => Err(e),
            }
        })
    }

    fn set_psp_customer_id<'a>(
        &'a self,
        customer: &'a Customer,
        psp_customer_id: &'a str,
    ) -> EngineFuture<'a, Customer> {
        Box::pin(async move {
            let body = UpdateWire {
                version: customer.version,
                actions: vec![CustomerActionWire::psp_customer_id(customer, psp_customer_id)],
            };
            let wire: CustomerWire = self
                .post(
                    "set psp customer id",
                    &format!("customers/{}", customer.id),
                    &body,
                )
                .await?;
            tracing::info!(
                customer_id = %customer.id,
                %psp_customer_id,
                "psp customer id saved on customer"
            );
            Ok(wire.into())
        })
    }

    fn check_health<'a>(&'a self) -> EngineFuture<'a, ()> {
        Box::pin(async move {
            self.get::<serde_json::Value>("health check", "payments?limit=1")
                .await
                .map(|_| ())
        })
    }
}
