//! Budget allocation ledger.
//!
//! Pure arithmetic over a parent's total allocation and its existing
//! children, applied identically at every hierarchy boundary
//! (Project→Milestone, Milestone→Task, Task→Subtask). Allocations are
//! whole non-negative units (hours, or currency when used loosely as
//! cost); proposed values are rounded to the nearest integer before any
//! check runs.
//!
//! This ledger is advisory pre-validation on the client side. The backend
//! performs the same containment check authoritatively; two concurrent
//! writers can still transiently violate containment between validation
//! and write.

use crate::error::CoreError;
use crate::types::DbId;

/// Default minimum allocation when a caller imposes none.
pub const DEFAULT_MINIMUM: i64 = 0;

/// One sibling's allocation at a given hierarchy level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub id: DbId,
    pub amount: i64,
}

impl Allocation {
    pub fn new(id: DbId, amount: i64) -> Self {
        Self { id, amount }
    }
}

/// Parent total minus the sum of sibling allocations, optionally leaving
/// out `exclude` (the entity being edited, so its current allocation is
/// added back before validating the replacement value).
pub fn compute_remaining(parent_total: i64, siblings: &[Allocation], exclude: Option<DbId>) -> i64 {
    let allocated: i64 = siblings
        .iter()
        .filter(|s| exclude != Some(s.id))
        .map(|s| s.amount)
        .sum();
    parent_total - allocated
}

/// Round a raw proposed value to the nearest whole allocation unit.
pub fn round_amount(raw: f64) -> i64 {
    raw.round() as i64
}

/// Validate a proposed allocation against the remaining budget and a
/// minimum. Both checks run; `BudgetExceeded` takes precedence when both
/// fail. Returns the rounded amount on success.
pub fn validate_proposed(proposed: f64, remaining: i64, minimum: i64) -> Result<i64, CoreError> {
    let amount = round_amount(proposed);
    if amount > remaining {
        return Err(CoreError::BudgetExceeded {
            proposed: amount,
            remaining,
        });
    }
    if amount < minimum {
        return Err(CoreError::BelowMinimumBudget {
            proposed: amount,
            minimum,
        });
    }
    Ok(amount)
}

/// Share of the parent total, as a percentage clamped to `[0, 100]`.
///
/// Display-only: the clamp never feeds back into validation.
pub fn percent_of_total(amount: i64, parent_total: i64) -> f64 {
    if parent_total <= 0 {
        return 0.0;
    }
    (amount as f64 / parent_total as f64 * 100.0).clamp(0.0, 100.0)
}
