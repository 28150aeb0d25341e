use crate::domain::error::EngineError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// HTTP face of `EngineError`. Internal details go to the log, not the body.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::WebhookSignature(_) => StatusCode::BAD_REQUEST,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            EngineError::PspPermanent(_) => StatusCode::BAD_GATEWAY,
            EngineError::PspTransient(_) | EngineError::LedgerConflict(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            EngineError::Configuration(_)
            | EngineError::LedgerPermanent(_)
            | EngineError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            EngineError::Validation(msg) | EngineError::NotFound(msg) => msg.clone(),
            EngineError::WebhookSignature(reason) => {
                tracing::warn!(%reason, "webhook rejected");
                "invalid webhook signature".to_string()
            }
            EngineError::Unauthorized(reason) => {
                tracing::warn!(%reason, "request rejected");
                "missing or invalid credentials".to_string()
            }
            other if status.is_server_error() => {
                tracing::error!(error = %other, "request failed");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "error_code": self.0.code(),
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}
