//! Invitation state machine and transition payload rules.
//!
//! Staffing a milestone happens through asynchronous, token-based
//! invitations: a single leader slot and any number of member slots. The
//! *authoritative* compare-and-swap on invitation status happens in the
//! backend; what lives here is the rule set — which transitions are legal
//! from which status, for which invitation kind, and what data each
//! transition requires. Rejections coming back from the backend
//! (`INVALID_STATE_TRANSITION`, `CONFLICT`) are truth, never retried.

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::types::{DbId, PublicId, Timestamp};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Invitation lifecycle status, serialized as the backend's wire strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvitationStatus {
    /// Initial status of every invitation.
    PendingInvitation,
    /// The invitee accepted; the corresponding staffing record exists.
    InvitationAccepted,
    InvitationRejected,
    InvitationExpired,
    InvitationCanceled,
    /// An accepted invitee was removed from the milestone by an owner.
    Removed,
    /// A leader invitation whose terms were finalized by the project owner.
    InvitationApproved,
}

impl InvitationStatus {
    pub const ALL: [InvitationStatus; 7] = [
        InvitationStatus::PendingInvitation,
        InvitationStatus::InvitationAccepted,
        InvitationStatus::InvitationRejected,
        InvitationStatus::InvitationExpired,
        InvitationStatus::InvitationCanceled,
        InvitationStatus::Removed,
        InvitationStatus::InvitationApproved,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InvitationStatus::PendingInvitation => "PENDING_INVITATION",
            InvitationStatus::InvitationAccepted => "INVITATION_ACCEPTED",
            InvitationStatus::InvitationRejected => "INVITATION_REJECTED",
            InvitationStatus::InvitationExpired => "INVITATION_EXPIRED",
            InvitationStatus::InvitationCanceled => "INVITATION_CANCELED",
            InvitationStatus::Removed => "REMOVED",
            InvitationStatus::InvitationApproved => "INVITATION_APPROVED",
        }
    }

    /// A terminal status admits no further transition. Everything but
    /// `PENDING_INVITATION` is terminal, except `INVITATION_ACCEPTED`,
    /// which may still move to `REMOVED`.
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            InvitationStatus::PendingInvitation | InvitationStatus::InvitationAccepted
        )
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Kind and triggers
// ---------------------------------------------------------------------------

/// Which slot an invitation offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationKind {
    Leader,
    Member,
}

impl InvitationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InvitationKind::Leader => "leader",
            InvitationKind::Member => "member",
        }
    }
}

/// The actions that may be applied to an existing invitation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationTrigger {
    /// Invitee accepts, holding the public id.
    Accept,
    /// Invitee rejects with a mandatory reason.
    Reject,
    /// Backend-driven clock expiry; no actor action.
    Expire,
    /// Owner cancels a pending member invitation.
    Cancel,
    /// Project owner finalizes a pending leader invitation's rate.
    Approve,
    /// Owner removes an accepted invitee from the milestone.
    Remove,
}

impl InvitationTrigger {
    pub const ALL: [InvitationTrigger; 6] = [
        InvitationTrigger::Accept,
        InvitationTrigger::Reject,
        InvitationTrigger::Expire,
        InvitationTrigger::Cancel,
        InvitationTrigger::Approve,
        InvitationTrigger::Remove,
    ];

    pub fn name(self) -> &'static str {
        match self {
            InvitationTrigger::Accept => "accept",
            InvitationTrigger::Reject => "reject",
            InvitationTrigger::Expire => "expire",
            InvitationTrigger::Cancel => "cancel",
            InvitationTrigger::Approve => "approve",
            InvitationTrigger::Remove => "remove",
        }
    }
}

/// The transition table. Returns the successor status, or
/// `InvalidStateTransition` for every (kind, status, trigger) combination
/// the table does not list. Cancel exists only for member invitations and
/// approve only for leader invitations.
pub fn next_status(
    kind: InvitationKind,
    status: InvitationStatus,
    trigger: InvitationTrigger,
) -> Result<InvitationStatus, CoreError> {
    use InvitationKind::{Leader, Member};
    use InvitationStatus::*;
    use InvitationTrigger::*;

    match (kind, status, trigger) {
        (_, PendingInvitation, Accept) => Ok(InvitationAccepted),
        (_, PendingInvitation, Reject) => Ok(InvitationRejected),
        (_, PendingInvitation, Expire) => Ok(InvitationExpired),
        (Member, PendingInvitation, Cancel) => Ok(InvitationCanceled),
        (Leader, PendingInvitation, Approve) => Ok(InvitationApproved),
        (_, InvitationAccepted, Remove) => Ok(Removed),
        _ => Err(CoreError::InvalidStateTransition {
            status,
            trigger: trigger.name(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Who a member invitation is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InviteeType {
    Freelancer,
    CompanyUser,
    ServiceCompany,
}

/// Variant payload of a leader invitation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LeaderInvitationPayload {
    pub leader_id: DbId,
    /// Offered rate; finalized by the project owner on approval.
    #[validate(range(min = 1, message = "leaderRate must be positive"))]
    pub leader_rate: Option<i64>,
    pub nda_template_id: Option<DbId>,
    pub message: Option<String>,
}

impl LeaderInvitationPayload {
    /// Boundary validation before any transition logic runs.
    pub fn validate_payload(&self) -> Result<(), CoreError> {
        self.validate().map_err(flatten_validation_errors)?;
        if self.leader_rate.is_none() {
            return Err(CoreError::Validation(
                "leaderRate is required for a leader invitation".to_string(),
            ));
        }
        Ok(())
    }
}

/// Variant payload of a member invitation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MemberInvitationPayload {
    pub user_id: DbId,
    #[validate(range(min = 1, message = "hourlyRate must be positive"))]
    pub hourly_rate: Option<i64>,
    #[serde(rename = "roleId")]
    pub role_type_id: Option<DbId>,
    pub invitee_type: InviteeType,
    pub freelancer_id: Option<DbId>,
    pub company_id: Option<DbId>,
    pub company_user_id: Option<DbId>,
    pub remark: Option<String>,
}

impl MemberInvitationPayload {
    /// Boundary validation: rate and role must be present, and the
    /// invitee reference matching `invitee_type` must be set.
    pub fn validate_payload(&self) -> Result<(), CoreError> {
        self.validate().map_err(flatten_validation_errors)?;
        if self.hourly_rate.is_none() {
            return Err(CoreError::Validation(
                "hourlyRate is required for a member invitation".to_string(),
            ));
        }
        if self.role_type_id.is_none() {
            return Err(CoreError::Validation(
                "roleId is required for a member invitation".to_string(),
            ));
        }
        match self.invitee_type {
            InviteeType::Freelancer if self.freelancer_id.is_none() => Err(CoreError::Validation(
                "freelancerId is required for a FREELANCER invitee".to_string(),
            )),
            InviteeType::CompanyUser if self.company_user_id.is_none() => {
                Err(CoreError::Validation(
                    "companyUserId is required for a COMPANY_USER invitee".to_string(),
                ))
            }
            InviteeType::ServiceCompany if self.company_id.is_none() => Err(CoreError::Validation(
                "companyId is required for a SERVICE_COMPANY invitee".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Tagged variant payload, discriminated by `kind` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InvitationPayload {
    Leader(LeaderInvitationPayload),
    Member(MemberInvitationPayload),
}

impl InvitationPayload {
    pub fn kind(&self) -> InvitationKind {
        match self {
            InvitationPayload::Leader(_) => InvitationKind::Leader,
            InvitationPayload::Member(_) => InvitationKind::Member,
        }
    }

    pub fn validate_payload(&self) -> Result<(), CoreError> {
        match self {
            InvitationPayload::Leader(p) => p.validate_payload(),
            InvitationPayload::Member(p) => p.validate_payload(),
        }
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Where an invitation points: enough of the milestone/project ancestry to
/// invalidate the right projection after a transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneRef {
    pub id: DbId,
    pub public_id: PublicId,
    pub project_id: DbId,
    pub project_public_id: PublicId,
}

/// One invitation, as held by the system of record.
///
/// The `public_id` is immutable once issued and is the only identifier an
/// unauthenticated invitee can use. Records are never deleted; terminal
/// records remain as history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationRecord {
    pub id: DbId,
    pub public_id: PublicId,
    pub milestone: MilestoneRef,
    pub status: InvitationStatus,
    pub invited_at: Timestamp,
    pub accepted_at: Option<Timestamp>,
    pub expired_at: Option<Timestamp>,
    pub removed_at: Option<Timestamp>,
    #[serde(flatten)]
    pub payload: InvitationPayload,
}

impl InvitationRecord {
    pub fn kind(&self) -> InvitationKind {
        self.payload.kind()
    }

    /// Check that `trigger` is legal for this record's kind and current
    /// status, returning the successor status without applying it.
    pub fn ensure_transition(&self, trigger: InvitationTrigger) -> Result<InvitationStatus, CoreError> {
        next_status(self.kind(), self.status, trigger)
    }
}

fn flatten_validation_errors(errors: validator::ValidationErrors) -> CoreError {
    let detail = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => format!("{field}: {msg}"),
                None => format!("{field}: {}", e.code),
            })
        })
        .collect::<Vec<_>>()
        .join("; ");
    CoreError::Validation(detail)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
