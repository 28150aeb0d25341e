use {
    super::{
        applier::{ApplyOutcome, LedgerApplier},
        disambiguator::{Disambiguator, MultiOperations, SliceOutcome},
        normalizer::normalize,
    },
    crate::domain::{
        error::EngineError,
        event::{EventKind, NormalizedEvent, WebhookEvent},
        region::RegionContext,
    },
    std::sync::Arc,
};

/// What happened to one webhook delivery. Every variant is acknowledged
/// to the PSP with a 200.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessResult {
    Applied { version: i64 },
    Duplicate,
    Anomaly,
    /// Unsupported kind, or nothing to correlate it with.
    Ignored,
    /// Multi-part event with no matching PSP-side slice.
    Dropped,
    /// The ledger or PSP permanently refused the update; redelivery would not help.
    Failed { error_code: &'static str },
    /// A transient failure or misconfiguration stopped processing. The PSP is
    /// still acknowledged; the event stays recoverable from the PSP's event log.
    RetryLater { error_code: &'static str },
}

impl ProcessResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied { .. } => "applied",
            Self::Duplicate => "duplicate",
            Self::Anomaly => "anomaly",
            Self::Ignored => "ignored",
            Self::Dropped => "dropped",
            Self::Failed { .. } => "failed",
            Self::RetryLater { .. } => "retry_later",
        }
    }

    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Failed { error_code } | Self::RetryLater { error_code } => Some(*error_code),
            _ => None,
        }
    }
}

/// Normalize, disambiguate, apply.
pub struct WebhookPipeline {
    disambiguator: Disambiguator,
    applier: Arc<LedgerApplier>,
}

impl WebhookPipeline {
    pub fn new(disambiguator: Disambiguator, applier: Arc<LedgerApplier>) -> Self {
        Self {
            disambiguator,
            applier,
        }
    }

    /// Never fails: once a delivery is authenticated it is acknowledged, and
    /// processing errors are logged and folded into the result.
    pub async fn process(&self, ctx: &RegionContext, event: &WebhookEvent) -> ProcessResult {
        match self.run(ctx, event).await {
            Ok(result) => result,
            Err(e) if e.is_retryable() || matches!(e, EngineError::Configuration(_)) => {
                tracing::error!(
                    error = %e,
                    error_code = e.code(),
                    "event not applied, needs a replay once the cause clears"
                );
                ProcessResult::RetryLater {
                    error_code: e.code(),
                }
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    error_code = e.code(),
                    "event permanently rejected"
                );
                ProcessResult::Failed {
                    error_code: e.code(),
                }
            }
        }
    }

    async fn run(
        &self,
        ctx: &RegionContext,
        event: &WebhookEvent,
    ) -> Result<ProcessResult, EngineError> {
        if event.kind == EventKind::ChargeUpdated
            && self.disambiguator.multi_operations() == MultiOperations::Disabled
        {
            tracing::info!("charge.updated ignored, multi-operations disabled");
            return Ok(ProcessResult::Ignored);
        }

        let mut normalized = match normalize(event)? {
            NormalizedEvent::Update(update) => update,
            NormalizedEvent::Ignored {
                kind: EventKind::Unsupported,
                reason,
            } => {
                tracing::info!(%reason, "event ignored");
                return Ok(ProcessResult::Ignored);
            }
            NormalizedEvent::Ignored { kind, reason } => {
                tracing::warn!(event_type = %kind, %reason, "event ignored");
                return Ok(ProcessResult::Ignored);
            }
        };

        if normalized.may_be_multi_part() {
            if let SliceOutcome::Drop { reason } =
                self.disambiguator.resolve(ctx, &mut normalized).await?
            {
                tracing::warn!(
                    payment_id = %normalized.update.payment_id,
                    %reason,
                    "multi-part event dropped"
                );
                return Ok(ProcessResult::Dropped);
            }
        }

        let result = match self.applier.apply(&normalized.update).await? {
            ApplyOutcome::Applied { version, .. } => ProcessResult::Applied { version },
            ApplyOutcome::Duplicate => ProcessResult::Duplicate,
            ApplyOutcome::Anomaly { .. } => ProcessResult::Anomaly,
        };
        Ok(result)
    }
}
