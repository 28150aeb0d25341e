pub mod adapters;
pub mod config;
pub mod domain;
pub mod infra;
pub mod services;

use {
    adapters::{auth::BearerToken, checkout, stripe::webhook},
    axum::{
        Router,
        extract::DefaultBodyLimit,
        routing::{get, post},
    },
    config::AppConfig,
    domain::{commerce::CommercePlatform, gateway::PaymentGateway, region::RegionRegistry},
    services::{
        applier::LedgerApplier, customer::CustomerSessions, disambiguator::Disambiguator,
        lifecycle::LifecycleManager, operations::PaymentOperations, status::StatusReporter,
        webhook_pipeline::WebhookPipeline,
    },
    std::{sync::Arc, time::Duration},
    tower_http::{
        timeout::TimeoutLayer, trace::TraceLayer, validate_request::ValidateRequestHeaderLayer,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub regions: Arc<RegionRegistry>,
    pub webhooks: Arc<WebhookPipeline>,
    pub lifecycle: Arc<LifecycleManager>,
    pub operations: Arc<PaymentOperations>,
    pub customers: Arc<CustomerSessions>,
    pub status: Arc<StatusReporter>,
    pub webhook_tolerance: Duration,
    /// Bearer token for `/operations/*`. Unset means those routes refuse everything.
    pub operations_token: Option<Arc<str>>,
}

impl AppState {
    /// Wire the engine around whichever PSP and ledger implementations are given.
    pub fn new(
        config: &AppConfig,
        gateway: Arc<dyn PaymentGateway>,
        ledger: Arc<dyn CommercePlatform>,
    ) -> Self {
        let applier = Arc::new(LedgerApplier::new(Arc::clone(&ledger)));
        let disambiguator = Disambiguator::new(Arc::clone(&gateway), config.multi_operations);
        let regions = Arc::new(config.regions.clone());

        Self {
            customers: Arc::new(CustomerSessions::new(
                Arc::clone(&gateway),
                Arc::clone(&ledger),
                config.checkout.saved_payment_methods.clone(),
            )),
            status: Arc::new(StatusReporter::new(
                Arc::clone(&gateway),
                Arc::clone(&ledger),
                Arc::clone(&regions),
                config.health_check_timeout,
            )),
            regions,
            webhooks: Arc::new(WebhookPipeline::new(disambiguator, Arc::clone(&applier))),
            lifecycle: Arc::new(LifecycleManager::new(
                Arc::clone(&gateway),
                Arc::clone(&ledger),
                applier,
                config.checkout.clone(),
            )),
            operations: Arc::new(PaymentOperations::new(
                gateway,
                ledger,
                config.multi_operations,
            )),
            webhook_tolerance: config.stripe.webhook_tolerance,
            operations_token: config.operations_token.as_deref().map(Arc::from),
        }
    }
}

pub fn app(state: AppState, request_timeout: Duration) -> Router {
    let operations = Router::new()
        .route(
            "/payment-intents/{payment_id}",
            post(checkout::modify_payment_handler),
        )
        .route("/status", get(checkout::status_handler))
        .layer(ValidateRequestHeaderLayer::custom(BearerToken::new(
            state.operations_token.clone(),
        )));

    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/stripe/webhooks", post(webhook::webhook_handler))
        .route(
            "/stripe/webhooks/{region}",
            post(webhook::regional_webhook_handler),
        )
        .route("/payments", get(checkout::create_payment_handler))
        .route(
            "/confirmPayments/{id}",
            post(checkout::confirm_payment_handler),
        )
        .route("/customer/session", get(checkout::customer_session_handler))
        .route(
            "/config-element/{payment_component}",
            get(checkout::element_config_handler),
        )
        .route("/applePayConfig", get(checkout::apple_pay_handler))
        .nest("/operations", operations)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}
