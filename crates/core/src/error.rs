use crate::invitation::InvitationStatus;

/// Domain-level error for the governance core.
///
/// `Validation`, `PermissionDenied`, and the two budget variants are always
/// resolved client-side and never reach the backend collaborator.
/// `InvalidStateTransition` and `Conflict` may also arrive *from* the
/// backend, in which case they are authoritative and must not be retried.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Cannot {trigger} an invitation in status {status}")]
    InvalidStateTransition {
        status: InvitationStatus,
        trigger: &'static str,
    },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Budget exceeded: proposed {proposed} is over the remaining {remaining}")]
    BudgetExceeded { proposed: i64, remaining: i64 },

    #[error("Below minimum budget: proposed {proposed} is under the minimum {minimum}")]
    BelowMinimumBudget { proposed: i64, minimum: i64 },

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl CoreError {
    /// Build a `NotFound` for an entity addressed by any displayable id.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
