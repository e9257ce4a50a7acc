//! The backend collaborator contract.
//!
//! Everything the governance layer needs from the system of record, as one
//! async trait: invitation lifecycle endpoints (invitee-facing operations
//! keyed by public id, owner-facing ones by numeric ids), hierarchy reads,
//! and membership management. [`crate::ApiClient`] implements it over
//! HTTP; tests implement it in memory.

use async_trait::async_trait;

use jalon_core::hierarchy::{MembershipRecord, Milestone, Project, Subtask, Task};
use jalon_core::invitation::{InvitationKind, InvitationRecord};
use jalon_core::types::{DbId, PublicId};

use crate::dto::{
    ApproveLeaderInvitationRequest, AvailableBudgetResponse, CreateLeaderInvitationRequest,
    CreateMemberInvitationRequest, CreateMilestoneRequest, CreateSubtaskRequest,
    CreateTaskRequest, UpdateMemberInvitationRequest, UpdateMilestoneRequest,
    UpdateSubtaskRequest, UpdateTaskRequest,
};
use crate::error::ApiError;

#[async_trait]
pub trait Backend: Send + Sync {
    // -- Hierarchy reads ---------------------------------------------------

    /// Fetch a project with its nested milestones, tasks, and subtasks.
    async fn project(&self, public_id: &PublicId) -> Result<Project, ApiError>;

    async fn available_budget(
        &self,
        project_public_id: &PublicId,
    ) -> Result<AvailableBudgetResponse, ApiError>;

    // -- Invitations -------------------------------------------------------

    async fn invitation(
        &self,
        kind: InvitationKind,
        public_id: &PublicId,
    ) -> Result<InvitationRecord, ApiError>;

    async fn milestone_invitations(
        &self,
        kind: InvitationKind,
        milestone_public_id: &PublicId,
    ) -> Result<Vec<InvitationRecord>, ApiError>;

    async fn create_leader_invitation(
        &self,
        request: &CreateLeaderInvitationRequest,
    ) -> Result<InvitationRecord, ApiError>;

    async fn create_member_invitation(
        &self,
        request: &CreateMemberInvitationRequest,
    ) -> Result<InvitationRecord, ApiError>;

    async fn accept_invitation(
        &self,
        kind: InvitationKind,
        public_id: &PublicId,
    ) -> Result<InvitationRecord, ApiError>;

    async fn reject_invitation(
        &self,
        kind: InvitationKind,
        public_id: &PublicId,
        remark: &str,
    ) -> Result<InvitationRecord, ApiError>;

    /// Rate/role edits for a pending member invitation; cancellation is a
    /// status patch through the same endpoint.
    async fn update_member_invitation(
        &self,
        public_id: &PublicId,
        request: &UpdateMemberInvitationRequest,
    ) -> Result<InvitationRecord, ApiError>;

    /// Re-notify the invitee. Changes neither public id nor status.
    async fn resend_member_invitation(
        &self,
        public_id: &PublicId,
    ) -> Result<InvitationRecord, ApiError>;

    async fn approve_leader_invitation(
        &self,
        milestone_id: DbId,
        invitation_id: DbId,
        request: &ApproveLeaderInvitationRequest,
    ) -> Result<InvitationRecord, ApiError>;

    // -- Membership --------------------------------------------------------

    async fn milestone_members(
        &self,
        milestone_id: DbId,
    ) -> Result<Vec<MembershipRecord>, ApiError>;

    /// Clear the milestone's leader slot, transitioning the accepted
    /// leader invitation to `REMOVED`.
    async fn remove_leader(
        &self,
        project_public_id: &PublicId,
        milestone_public_id: &PublicId,
    ) -> Result<(), ApiError>;

    /// Remove an accepted member, transitioning their invitation to
    /// `REMOVED`. Existing task/subtask assignments are left untouched.
    async fn remove_member(&self, milestone_id: DbId, user_id: DbId) -> Result<(), ApiError>;

    // -- Hierarchy mutations ----------------------------------------------

    async fn create_milestone(
        &self,
        request: &CreateMilestoneRequest,
    ) -> Result<Milestone, ApiError>;

    async fn update_milestone(
        &self,
        milestone_id: DbId,
        request: &UpdateMilestoneRequest,
    ) -> Result<Milestone, ApiError>;

    async fn delete_milestone(&self, milestone_id: DbId) -> Result<(), ApiError>;

    async fn create_task(&self, request: &CreateTaskRequest) -> Result<Task, ApiError>;

    async fn update_task(
        &self,
        task_id: DbId,
        request: &UpdateTaskRequest,
    ) -> Result<Task, ApiError>;

    async fn delete_task(&self, task_id: DbId) -> Result<(), ApiError>;

    async fn create_subtask(&self, request: &CreateSubtaskRequest) -> Result<Subtask, ApiError>;

    async fn update_subtask(
        &self,
        subtask_id: DbId,
        request: &UpdateSubtaskRequest,
    ) -> Result<Subtask, ApiError>;

    async fn delete_subtask(&self, subtask_id: DbId) -> Result<(), ApiError>;
}
