use {
    crate::{
        AppState,
        adapters::api_errors::ApiError,
        domain::{
            error::EngineError,
            id::{CartId, IntentId, PaymentId},
        },
        services::{
            lifecycle::{ElementConfig, IntentCreated},
            operations::{OperationResult, PaymentOperation},
            status::Health,
        },
    },
    axum::{
        Json,
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
    },
    serde::Deserialize,
};

pub const CART_ID_HEADER: &str = "X-Cart-Id";
pub const REGION_HEADER: &str = "X-Stripe-Region";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn cart_id(headers: &HeaderMap) -> Result<CartId, EngineError> {
    header(headers, CART_ID_HEADER)
        .ok_or_else(|| EngineError::Validation(format!("missing {CART_ID_HEADER} header")))
        .and_then(CartId::new)
}

/// `GET /payments`: create the intent and ledger payment for the session's cart.
pub async fn create_payment_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<IntentCreated>, ApiError> {
    let cart_id = cart_id(&headers)?;
    let ctx = state
        .regions
        .resolve_checkout(header(&headers, REGION_HEADER))?;

    let created = state.lifecycle.create_intent(&ctx, &cart_id).await?;
    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmBody {
    pub payment_intent: String,
}

/// `POST /confirmPayments/{id}`: the buyer finished authentication client-side.
pub async fn confirm_payment_handler(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    Json(body): Json<ConfirmBody>,
) -> Response {
    let result = async {
        let payment_id = PaymentId::new(payment_id)?;
        let intent_id = IntentId::new(body.payment_intent)?;
        state.lifecycle.confirm_intent(&intent_id, &payment_id).await
    }
    .await;

    match result {
        Ok(()) => Json(serde_json::json!({ "outcome": "approved" })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, error_code = e.code(), "payment confirmation failed");
            let error_code = e.code();
            let status = ApiError(e).status();
            (
                status,
                Json(serde_json::json!({ "outcome": "rejected", "error_code": error_code })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OperationsBody {
    pub actions: Vec<PaymentOperation>,
}

/// `POST /operations/payment-intents/{paymentId}`: merchant-side capture,
/// cancel, refund and reverse.
pub async fn modify_payment_handler(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<OperationsBody>,
) -> Result<Json<OperationResult>, ApiError> {
    let payment_id = PaymentId::new(payment_id)?;
    let ctx = state
        .regions
        .resolve_checkout(header(&headers, REGION_HEADER))?;

    let result = state
        .operations
        .modify(&ctx, &payment_id, &body.actions)
        .await?;
    Ok(Json(result))
}

/// `GET /customer/session`: 204 when the cart has no known customer.
pub async fn customer_session_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let cart_id = cart_id(&headers)?;
    let ctx = state
        .regions
        .resolve_checkout(header(&headers, REGION_HEADER))?;

    Ok(match state.customers.create_session(&ctx, &cart_id).await? {
        Some(session) => Json(session).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// `GET /config-element/{paymentComponent}`
pub async fn element_config_handler(
    State(state): State<AppState>,
    Path(component): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ElementConfig>, ApiError> {
    let cart_id = cart_id(&headers)?;
    let config = state.lifecycle.element_config(&cart_id, &component).await?;
    Ok(Json(config))
}

/// `GET /applePayConfig`: the domain association file, served as-is.
pub async fn apple_pay_handler(State(state): State<AppState>) -> Result<String, ApiError> {
    state
        .lifecycle
        .apple_pay_well_known()
        .map(str::to_string)
        .ok_or_else(|| {
            ApiError(EngineError::NotFound(
                "no Apple Pay domain association configured".into(),
            ))
        })
}

/// `GET /operations/status`
pub async fn status_handler(State(state): State<AppState>) -> Response {
    let report = state.status.report().await;
    let code = match report.status {
        Health::Up => StatusCode::OK,
        Health::Down => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(report)).into_response()
}
