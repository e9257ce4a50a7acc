//! Wire request/response types for the backend endpoints.
//!
//! Invitation payloads reuse the tagged variants from `jalon_core` so that
//! the same validation runs on both sides of the boundary; everything is
//! camelCase on the wire.

use serde::{Deserialize, Serialize};

use jalon_core::hierarchy::{EntityStatus, Priority};
use jalon_core::invitation::{InvitationStatus, LeaderInvitationPayload, MemberInvitationPayload};
use jalon_core::types::DbId;

// ---------------------------------------------------------------------------
// Invitations
// ---------------------------------------------------------------------------

/// `POST /leader-invitations`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeaderInvitationRequest {
    pub milestone_id: DbId,
    #[serde(flatten)]
    pub payload: LeaderInvitationPayload,
}

/// `POST /member-invitations`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberInvitationRequest {
    pub milestone_id: DbId,
    #[serde(flatten)]
    pub payload: MemberInvitationPayload,
}

/// Body of `POST /{kind}-invitations/{publicId}/reject`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectInvitationBody {
    pub remark: String,
}

/// `PUT /member-invitations/{publicId}` — rate/role edits, and
/// cancellation via `status: INVITATION_CANCELED` (the backend treats a
/// status patch as a transition request).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberInvitationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<InvitationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly_rate: Option<i64>,
    #[serde(rename = "roleId", skip_serializing_if = "Option::is_none")]
    pub role_type_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
}

/// `PUT /leader-invitations/{milestoneId}/{invitationId}/approve`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveLeaderInvitationRequest {
    pub leader_id: DbId,
    /// The finalized leader rate.
    pub leader_rate: i64,
}

// ---------------------------------------------------------------------------
// Hierarchy mutations
// ---------------------------------------------------------------------------

/// `POST /milestones`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMilestoneRequest {
    pub project_id: DbId,
    pub name: String,
    pub assignee_id: DbId,
    pub budgeted_hours: i64,
    pub status: EntityStatus,
    pub priority: Priority,
}

/// `PUT /milestones/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMilestoneRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budgeted_hours: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EntityStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

/// `POST /tasks`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub milestone_id: DbId,
    pub name: String,
    /// Must resolve to an accepted membership of the milestone.
    pub assignee_user_id: DbId,
    pub budgeted_hours: i64,
}

/// `PUT /tasks/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_user_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budgeted_hours: Option<i64>,
}

/// `POST /subtasks`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubtaskRequest {
    pub task_id: DbId,
    pub name: String,
    pub assignee_user_id: DbId,
    pub budgeted_hours: i64,
}

/// `PUT /subtasks/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubtaskRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_user_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budgeted_hours: Option<i64>,
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// `GET /projects/{publicId}/available-budget` — also served per
/// milestone under `GET /milestones/{id}/available-budget`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableBudgetResponse {
    pub total_budget: i64,
    pub allocated_budget: i64,
    pub available_budget: i64,
}

/// Response of delete endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionResponse {
    pub success: bool,
    pub message: String,
}
