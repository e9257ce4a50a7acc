use jalon_api::error::codes;
use jalon_api::ApiError;
use jalon_core::error::CoreError;

/// Error type for governance operations.
///
/// Wraps [`CoreError`] for rules resolved client-side and [`ApiError`] for
/// backend verdicts. [`GovernanceError::kind`] collapses both sides into
/// one taxonomy so callers can branch without caring where a rejection
/// originated.
#[derive(Debug, thiserror::Error)]
pub enum GovernanceError {
    /// A domain-level error from `jalon_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An error from the backend API layer.
    #[error(transparent)]
    Backend(#[from] ApiError),
}

/// Flat classification of every failure a governance operation can
/// produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    InvalidStateTransition,
    PermissionDenied,
    BudgetExceeded,
    BelowMinimumBudget,
    NotFound,
    Conflict,
    Transport,
    Internal,
}

impl GovernanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GovernanceError::Core(core) => match core {
                CoreError::Validation(_) => ErrorKind::Validation,
                CoreError::InvalidStateTransition { .. } => ErrorKind::InvalidStateTransition,
                CoreError::PermissionDenied(_) => ErrorKind::PermissionDenied,
                CoreError::BudgetExceeded { .. } => ErrorKind::BudgetExceeded,
                CoreError::BelowMinimumBudget { .. } => ErrorKind::BelowMinimumBudget,
                CoreError::NotFound { .. } => ErrorKind::NotFound,
                CoreError::Conflict(_) => ErrorKind::Conflict,
            },
            GovernanceError::Backend(api) => classify_api_error(api),
        }
    }

    /// Only transport failures may be retried. Backend business verdicts
    /// (`InvalidStateTransition`, `Conflict`, …) are authoritative.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }
}

/// Classify a backend error by envelope code first, HTTP status second.
///
/// The status fallbacks mirror the statuses the backend uses for
/// invitation operations: 403 permission, 404 missing, 409/410
/// already-responded/withdrawn.
fn classify_api_error(error: &ApiError) -> ErrorKind {
    let ApiError::Api { status, code, .. } = error else {
        return ErrorKind::Transport;
    };
    match code.as_str() {
        codes::VALIDATION_ERROR => ErrorKind::Validation,
        codes::INVALID_STATE_TRANSITION => ErrorKind::InvalidStateTransition,
        codes::PERMISSION_DENIED => ErrorKind::PermissionDenied,
        codes::BUDGET_EXCEEDED => ErrorKind::BudgetExceeded,
        codes::NOT_FOUND => ErrorKind::NotFound,
        codes::CONFLICT => ErrorKind::Conflict,
        _ => match status {
            400 => ErrorKind::Validation,
            401 | 403 => ErrorKind::PermissionDenied,
            404 => ErrorKind::NotFound,
            409 | 410 => ErrorKind::Conflict,
            _ => ErrorKind::Internal,
        },
    }
}
