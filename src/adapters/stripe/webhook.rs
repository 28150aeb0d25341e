use {
    super::signature::{SIGNATURE_HEADER, SignatureHeader},
    crate::{
        AppState,
        adapters::api_errors::ApiError,
        domain::{error::EngineError, event::WebhookEvent, region::Region},
        services::webhook_pipeline::ProcessResult,
    },
    axum::{
        Json,
        body::Bytes,
        extract::{Path, State},
        http::HeaderMap,
    },
    tracing::field::{Empty, display},
};

/// `POST /stripe/webhooks/{region}`: the verifying secret must belong to `region`.
pub async fn regional_webhook_handler(
    State(state): State<AppState>,
    Path(region): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let region = region
        .parse::<Region>()
        .map_err(|_| EngineError::NotFound(format!("unknown webhook region: {region}")))?;
    handle_webhook(state, Some(region), headers, body).await
}

/// `POST /stripe/webhooks`: the region is whichever secret verifies the payload.
pub async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    handle_webhook(state, None, headers, body).await
}

#[tracing::instrument(
    name = "webhook",
    skip_all,
    fields(event_id = Empty, event_type = Empty, region = Empty)
)]
async fn handle_webhook(
    state: AppState,
    expected: Option<Region>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let raw = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            EngineError::WebhookSignature(format!("missing {SIGNATURE_HEADER} header"))
        })?;

    let signature = SignatureHeader::parse(raw)?;
    signature.check_freshness(chrono::Utc::now().timestamp(), state.webhook_tolerance)?;

    let ctx = state
        .regions
        .resolve_webhook(expected, |c| signature.verifies(c.webhook_secret(), &body))?;

    tracing::Span::current().record("region", display(ctx.region()));

    // Authenticated from here on: every outcome is acknowledged with a 200.
    let result = match serde_json::from_slice::<WebhookEvent>(&body) {
        Ok(event) => {
            tracing::Span::current()
                .record("event_id", display(&event.id))
                .record("event_type", display(event.kind));
            state.webhooks.process(&ctx, &event).await
        }
        Err(e) => {
            let err = EngineError::Validation(format!("malformed event payload: {e}"));
            tracing::error!(error = %err, "signed webhook payload could not be read");
            ProcessResult::Failed {
                error_code: err.code(),
            }
        }
    };
    tracing::info!(status = result.as_str(), "webhook processed");

    let mut ack = serde_json::json!({ "status": result.as_str() });
    if let Some(code) = result.error_code() {
        ack["error_code"] = code.into();
    }
    Ok(Json(ack))
}
