use {
    super::api_errors::ApiError,
    crate::domain::error::EngineError,
    axum::{
        http::{Request, header::AUTHORIZATION},
        response::{IntoResponse, Response},
    },
    sha2::{Digest, Sha256},
    std::sync::Arc,
    tower_http::validate_request::ValidateRequest,
};

/// Guards the merchant operations routes with a static bearer token.
///
/// With no token configured every request is refused.
#[derive(Clone)]
pub struct BearerToken {
    expected: Option<Arc<str>>,
}

impl BearerToken {
    pub fn new(expected: Option<Arc<str>>) -> Self {
        Self { expected }
    }

    fn check(&self, header: Option<&str>) -> Result<(), EngineError> {
        let expected = self.expected.as_deref().ok_or_else(|| {
            EngineError::Unauthorized("operations API token is not configured".into())
        })?;
        let presented = header
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or_else(|| EngineError::Unauthorized("missing bearer token".into()))?;

        // Compare digests so the comparison time does not depend on a shared prefix.
        if Sha256::digest(presented.trim().as_bytes()) != Sha256::digest(expected.as_bytes()) {
            return Err(EngineError::Unauthorized("bearer token does not match".into()));
        }
        Ok(())
    }
}

impl<B> ValidateRequest<B> for BearerToken {
    type ResponseBody = axum::body::Body;

    fn validate(&mut self, request: &mut Request<B>) -> Result<(), Response> {
        let header = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        self.check(header)
            .map_err(|e| ApiError(e).into_response())
    }
}
