//! Invitation lifecycle orchestration.
//!
//! Enforces the state machine and the data requirements of each
//! transition, for both invitation kinds, in a fixed order: payload
//! validation first, then the permission gate — neither ever reaches the
//! backend — then the backend call, whose verdict is authoritative and is
//! never retried here, then projection invalidation and event fan-out.

use std::sync::Arc;

use jalon_api::dto::{
    ApproveLeaderInvitationRequest, CreateLeaderInvitationRequest, CreateMemberInvitationRequest,
    UpdateMemberInvitationRequest,
};
use jalon_api::Backend;
use jalon_core::error::CoreError;
use jalon_core::invitation::{
    InvitationKind, InvitationPayload, InvitationRecord, InvitationStatus, InvitationTrigger,
    LeaderInvitationPayload, MemberInvitationPayload,
};
use jalon_core::permission::PermissionResolver;
use jalon_core::types::{DbId, PublicId};

use crate::error::GovernanceError;
use crate::events::{EventBus, GovernanceEvent};
use crate::store::HierarchyStore;

/// Rate/role edits applicable to a pending member invitation.
///
/// Status is deliberately absent: transitions go through their own
/// operations, never through a patch.
#[derive(Debug, Clone, Default)]
pub struct MemberInvitationPatch {
    pub hourly_rate: Option<i64>,
    pub role_type_id: Option<DbId>,
    pub remark: Option<String>,
}

pub struct InvitationRegistry {
    backend: Arc<dyn Backend>,
    store: Arc<HierarchyStore>,
    events: EventBus,
}

impl InvitationRegistry {
    pub fn new(backend: Arc<dyn Backend>, store: Arc<HierarchyStore>, events: EventBus) -> Self {
        Self {
            backend,
            store,
            events,
        }
    }

    // -- Creation ----------------------------------------------------------

    /// Stage a leader invitation for a milestone.
    pub async fn create_leader_invitation(
        &self,
        actor_id: DbId,
        project_public_id: &PublicId,
        milestone_id: DbId,
        payload: LeaderInvitationPayload,
    ) -> Result<InvitationRecord, GovernanceError> {
        payload.validate_payload()?;

        let project = self.store.project(project_public_id).await?;
        if project.milestone(milestone_id).is_none() {
            return Err(CoreError::not_found("milestone", milestone_id).into());
        }
        if !PermissionResolver::new(&project).can_staff_milestone(milestone_id, actor_id) {
            return Err(CoreError::PermissionDenied(format!(
                "user {actor_id} cannot stage milestone {milestone_id}"
            ))
            .into());
        }

        let record = self
            .backend
            .create_leader_invitation(&CreateLeaderInvitationRequest {
                milestone_id,
                payload,
            })
            .await?;

        self.store.invalidate(project_public_id).await;
        self.publish("invitation.created", actor_id, &record);
        Ok(record)
    }

    /// Stage a member invitation for a milestone.
    pub async fn create_member_invitation(
        &self,
        actor_id: DbId,
        project_public_id: &PublicId,
        milestone_id: DbId,
        payload: MemberInvitationPayload,
    ) -> Result<InvitationRecord, GovernanceError> {
        payload.validate_payload()?;

        let project = self.store.project(project_public_id).await?;
        let Some(milestone) = project.milestone(milestone_id) else {
            return Err(CoreError::not_found("milestone", milestone_id).into());
        };
        if !PermissionResolver::new(&project).can_staff_milestone(milestone_id, actor_id) {
            return Err(CoreError::PermissionDenied(format!(
                "user {actor_id} cannot stage milestone {milestone_id}"
            ))
            .into());
        }

        // No uniqueness constraint on active invitations per invitee --
        // re-inviting is legal. Surface duplicates to the log only.
        if let Ok(existing) = self
            .backend
            .milestone_invitations(InvitationKind::Member, &milestone.public_id)
            .await
        {
            let duplicate = existing.iter().any(|record| {
                !record.status.is_terminal()
                    && matches!(
                        &record.payload,
                        InvitationPayload::Member(p) if p.user_id == payload.user_id
                    )
            });
            if duplicate {
                tracing::debug!(
                    user = payload.user_id,
                    milestone = milestone_id,
                    "creating a member invitation while another is still open"
                );
            }
        }

        let record = self
            .backend
            .create_member_invitation(&CreateMemberInvitationRequest {
                milestone_id,
                payload,
            })
            .await?;

        self.store.invalidate(project_public_id).await;
        self.publish("invitation.created", actor_id, &record);
        Ok(record)
    }

    // -- Invitee-facing transitions ---------------------------------------

    /// Accept an invitation on behalf of the holder of its public id.
    ///
    /// Idempotent: re-accepting an already-accepted record is a no-op
    /// success that leaves `accepted_at` untouched. Accepting any other
    /// terminal record fails with `InvalidStateTransition`.
    pub async fn accept_invitation(
        &self,
        kind: InvitationKind,
        public_id: &PublicId,
    ) -> Result<InvitationRecord, GovernanceError> {
        let record = self.backend.invitation(kind, public_id).await?;
        if record.status == InvitationStatus::InvitationAccepted {
            tracing::debug!(invitation = %public_id, "already accepted; no-op");
            return Ok(record);
        }
        record.ensure_transition(InvitationTrigger::Accept)?;

        let updated = self.backend.accept_invitation(kind, public_id).await?;

        self.store
            .invalidate(&updated.milestone.project_public_id)
            .await;
        self.events.publish(
            GovernanceEvent::new("invitation.accepted").with_source("invitation", updated.id),
        );
        Ok(updated)
    }

    /// Reject an invitation. The reason is mandatory whatever the current
    /// status, and is checked before anything else.
    pub async fn reject_invitation(
        &self,
        kind: InvitationKind,
        public_id: &PublicId,
        reason: &str,
    ) -> Result<InvitationRecord, GovernanceError> {
        if reason.trim().is_empty() {
            return Err(
                CoreError::Validation("a rejection reason is required".to_string()).into(),
            );
        }

        let record = self.backend.invitation(kind, public_id).await?;
        record.ensure_transition(InvitationTrigger::Reject)?;

        let updated = self
            .backend
            .reject_invitation(kind, public_id, reason)
            .await?;

        // No staffing side effect, but milestone views show the status.
        self.store
            .invalidate(&updated.milestone.project_public_id)
            .await;
        self.events.publish(
            GovernanceEvent::new("invitation.rejected").with_source("invitation", updated.id),
        );
        Ok(updated)
    }

    // -- Owner-facing member operations -----------------------------------

    /// Cancel a pending member invitation. Member invitations only; the
    /// analogous owner step for leader invitations is
    /// [`approve_leader_invitation`](Self::approve_leader_invitation).
    pub async fn cancel_member_invitation(
        &self,
        actor_id: DbId,
        public_id: &PublicId,
    ) -> Result<InvitationRecord, GovernanceError> {
        let record = self
            .backend
            .invitation(InvitationKind::Member, public_id)
            .await?;
        self.ensure_staffing_permission(actor_id, &record).await?;
        record.ensure_transition(InvitationTrigger::Cancel)?;

        // The backend models cancellation as a status patch.
        let updated = self
            .backend
            .update_member_invitation(
                public_id,
                &UpdateMemberInvitationRequest {
                    status: Some(InvitationStatus::InvitationCanceled),
                    ..Default::default()
                },
            )
            .await?;

        self.store
            .invalidate(&updated.milestone.project_public_id)
            .await;
        self.publish("invitation.canceled", actor_id, &updated);
        Ok(updated)
    }

    /// Re-notify the invitee of a pending member invitation. Neither the
    /// public id nor the status changes.
    pub async fn resend_member_invitation(
        &self,
        actor_id: DbId,
        public_id: &PublicId,
    ) -> Result<InvitationRecord, GovernanceError> {
        let record = self
            .backend
            .invitation(InvitationKind::Member, public_id)
            .await?;
        self.ensure_staffing_permission(actor_id, &record).await?;
        if record.status != InvitationStatus::PendingInvitation {
            return Err(CoreError::InvalidStateTransition {
                status: record.status,
                trigger: "resend",
            }
            .into());
        }

        let updated = self.backend.resend_member_invitation(public_id).await?;
        self.publish("invitation.resent", actor_id, &updated);
        Ok(updated)
    }

    /// Edit the rate/role of a pending member invitation.
    pub async fn update_member_invitation(
        &self,
        actor_id: DbId,
        public_id: &PublicId,
        patch: MemberInvitationPatch,
    ) -> Result<InvitationRecord, GovernanceError> {
        if let Some(rate) = patch.hourly_rate {
            if rate <= 0 {
                return Err(
                    CoreError::Validation("hourlyRate must be positive".to_string()).into(),
                );
            }
        }

        let record = self
            .backend
            .invitation(InvitationKind::Member, public_id)
            .await?;
        self.ensure_staffing_permission(actor_id, &record).await?;
        if record.status != InvitationStatus::PendingInvitation {
            return Err(CoreError::InvalidStateTransition {
                status: record.status,
                trigger: "update",
            }
            .into());
        }

        let updated = self
            .backend
            .update_member_invitation(
                public_id,
                &UpdateMemberInvitationRequest {
                    status: None,
                    hourly_rate: patch.hourly_rate,
                    role_type_id: patch.role_type_id,
                    remark: patch.remark,
                },
            )
            .await?;

        self.store
            .invalidate(&updated.milestone.project_public_id)
            .await;
        self.publish("invitation.updated", actor_id, &updated);
        Ok(updated)
    }

    // -- Owner-facing leader operations -----------------------------------

    /// Finalize a pending leader invitation's rate. Leader invitations
    /// only, and project-owner only.
    pub async fn approve_leader_invitation(
        &self,
        actor_id: DbId,
        public_id: &PublicId,
        final_rate: i64,
    ) -> Result<InvitationRecord, GovernanceError> {
        if final_rate <= 0 {
            return Err(CoreError::Validation("leaderRate must be positive".to_string()).into());
        }

        let record = self
            .backend
            .invitation(InvitationKind::Leader, public_id)
            .await?;
        let project = self
            .store
            .project(&record.milestone.project_public_id)
            .await?;
        if !PermissionResolver::new(&project).can_edit_project(actor_id) {
            return Err(CoreError::PermissionDenied(format!(
                "user {actor_id} is not an owner of project {}",
                project.id
            ))
            .into());
        }
        record.ensure_transition(InvitationTrigger::Approve)?;

        let InvitationPayload::Leader(leader) = &record.payload else {
            // The leader endpoint only returns leader records; defended
            // against a misbehaving backend all the same.
            return Err(CoreError::Validation(
                "approve applies to leader invitations only".to_string(),
            )
            .into());
        };

        let updated = self
            .backend
            .approve_leader_invitation(
                record.milestone.id,
                record.id,
                &ApproveLeaderInvitationRequest {
                    leader_id: leader.leader_id,
                    leader_rate: final_rate,
                },
            )
            .await?;

        self.store
            .invalidate(&updated.milestone.project_public_id)
            .await;
        self.publish("invitation.approved", actor_id, &updated);
        Ok(updated)
    }

    // -- Removal -----------------------------------------------------------

    /// Remove an accepted leader, clearing the milestone's leader slot.
    ///
    /// Existing task/subtask assignments are untouched; they only fail
    /// validation when a *new* assignment is attempted.
    pub async fn remove_leader(
        &self,
        actor_id: DbId,
        project_public_id: &PublicId,
        milestone_public_id: &PublicId,
    ) -> Result<(), GovernanceError> {
        let project = self.store.project(project_public_id).await?;
        let Some(milestone) = project.milestone_by_public_id(milestone_public_id) else {
            return Err(CoreError::not_found("milestone", milestone_public_id).into());
        };
        if !PermissionResolver::new(&project).can_staff_milestone(milestone.id, actor_id) {
            return Err(CoreError::PermissionDenied(format!(
                "user {actor_id} cannot manage staffing of milestone {}",
                milestone.id
            ))
            .into());
        }
        let Some(leader) = &milestone.leader else {
            return Err(CoreError::not_found("milestone leader", milestone_public_id).into());
        };
        jalon_core::invitation::next_status(
            InvitationKind::Leader,
            leader.status,
            InvitationTrigger::Remove,
        )?;

        self.backend
            .remove_leader(project_public_id, milestone_public_id)
            .await?;

        self.store.invalidate(project_public_id).await;
        self.events.publish(
            GovernanceEvent::new("leader.removed")
                .with_source("milestone", milestone.id)
                .with_actor(actor_id),
        );
        Ok(())
    }

    /// Remove an accepted member from a milestone's staffing.
    pub async fn remove_member(
        &self,
        actor_id: DbId,
        project_public_id: &PublicId,
        milestone_id: DbId,
        user_id: DbId,
    ) -> Result<(), GovernanceError> {
        let project = self.store.project(project_public_id).await?;
        let Some(milestone) = project.milestone(milestone_id) else {
            return Err(CoreError::not_found("milestone", milestone_id).into());
        };
        if !PermissionResolver::new(&project).can_staff_milestone(milestone_id, actor_id) {
            return Err(CoreError::PermissionDenied(format!(
                "user {actor_id} cannot manage staffing of milestone {milestone_id}"
            ))
            .into());
        }
        let Some(member) = milestone.member(user_id) else {
            return Err(CoreError::not_found("milestone member", user_id).into());
        };
        jalon_core::invitation::next_status(
            InvitationKind::Member,
            member.status,
            InvitationTrigger::Remove,
        )?;

        self.backend.remove_member(milestone_id, user_id).await?;

        self.store.invalidate(project_public_id).await;
        self.events.publish(
            GovernanceEvent::new("member.removed")
                .with_source("milestone", milestone_id)
                .with_actor(actor_id)
                .with_payload(serde_json::json!({ "userId": user_id })),
        );
        Ok(())
    }

    // -- Helpers -----------------------------------------------------------

    /// Owner gate for the milestone an invitation points at.
    async fn ensure_staffing_permission(
        &self,
        actor_id: DbId,
        record: &InvitationRecord,
    ) -> Result<(), GovernanceError> {
        let project = self
            .store
            .project(&record.milestone.project_public_id)
            .await?;
        if !PermissionResolver::new(&project).can_staff_milestone(record.milestone.id, actor_id) {
            return Err(CoreError::PermissionDenied(format!(
                "user {actor_id} cannot manage staffing of milestone {}",
                record.milestone.id
            ))
            .into());
        }
        Ok(())
    }

    fn publish(&self, event_type: &str, actor_id: DbId, record: &InvitationRecord) {
        self.events.publish(
            GovernanceEvent::new(event_type)
                .with_source("invitation", record.id)
                .with_actor(actor_id)
                .with_payload(serde_json::json!({
                    "publicId": record.public_id,
                    "kind": record.kind().as_str(),
                    "status": record.status,
                })),
        );
    }
}
