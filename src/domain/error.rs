use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Operator error: missing keys, unresolvable region. Never retried.
    #[error("configuration: {0}")]
    Configuration(String),

    /// Rate limit, network failure, timeout or 5xx from the PSP.
    #[error("psp transient: {0}")]
    PspTransient(String),

    /// Invalid request or decline. Retrying would give the same answer.
    #[error("psp permanent: {0}")]
    PspPermanent(String),

    /// Optimistic-concurrency version mismatch on the ledger.
    #[error("ledger conflict: {0}")]
    LedgerConflict(String),

    #[error("ledger permanent: {0}")]
    LedgerPermanent(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("webhook signature: {0}")]
    WebhookSignature(String),

    /// Caller did not present valid credentials for a protected route.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
}

impl EngineError {
    /// Whether a later attempt of the same logical operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PspTransient(_) | Self::LedgerConflict(_))
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::PspTransient(_) => "psp_unavailable",
            Self::PspPermanent(_) => "psp_rejected",
            Self::LedgerConflict(_) => "ledger_conflict",
            Self::LedgerPermanent(_) => "ledger_error",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation_error",
            Self::Serialization(_) => "internal_error",
            Self::WebhookSignature(_) => "webhook_error",
            Self::Unauthorized(_) => "unauthorized",
        }
    }
}
