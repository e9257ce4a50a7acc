//! Read model of a project and its nested milestones, tasks, and subtasks.
//!
//! These types mirror the backend's JSON projection (camelCase on the
//! wire). They are immutable snapshots: every mutation goes through the
//! backend collaborator and is observed here only after a refetch.

use serde::{Deserialize, Serialize};

use crate::invitation::InvitationStatus;
use crate::types::{DbId, PublicId};

/// Lifecycle status shared by projects, milestones, and tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityStatus {
    Preparation,
    Waiting,
    InProgress,
    Pending,
    Completed,
    Closed,
    Canceled,
    PendingExecution,
    PendingClosure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

/// The user an entity is assigned to (distinct from its creator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    pub id: DbId,
    pub name: String,
}

/// Staffing record created when a member invitation is accepted.
///
/// The only valid assignee target for tasks and subtasks. `status` mirrors
/// the originating invitation; a record whose status is no longer
/// `INVITATION_ACCEPTED` is kept for history but is not assignable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipRecord {
    pub user_id: DbId,
    pub user_name: String,
    pub hourly_rate: i64,
    #[serde(rename = "roleId")]
    pub role_type_id: DbId,
    pub status: InvitationStatus,
    pub invitation_public_id: PublicId,
}

/// The single leader slot of a milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneLeader {
    pub user_id: DbId,
    pub name: String,
    pub leader_rate: i64,
    pub status: InvitationStatus,
}

/// Budget leaf. No further children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: DbId,
    pub task_id: DbId,
    pub name: String,
    pub creator_id: DbId,
    pub assignee: MembershipRecord,
    pub budgeted_hours: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: DbId,
    pub milestone_id: DbId,
    pub name: String,
    pub creator_id: DbId,
    pub assignee: MembershipRecord,
    pub budgeted_hours: i64,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

impl Task {
    pub fn subtask(&self, id: DbId) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: DbId,
    pub public_id: PublicId,
    pub project_id: DbId,
    pub name: String,
    pub creator_id: DbId,
    pub assignee: Assignee,
    pub budgeted_hours: i64,
    #[serde(default)]
    pub hours_spent: i64,
    pub status: EntityStatus,
    pub priority: Priority,
    pub leader: Option<MilestoneLeader>,
    #[serde(default)]
    pub members: Vec<MembershipRecord>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Milestone {
    pub fn task(&self, id: DbId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// The membership record for `user_id`, regardless of its status.
    pub fn member(&self, user_id: DbId) -> Option<&MembershipRecord> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    /// The membership record for `user_id` if it is currently assignable,
    /// i.e. its invitation is still `INVITATION_ACCEPTED`.
    pub fn active_member(&self, user_id: DbId) -> Option<&MembershipRecord> {
        self.members
            .iter()
            .find(|m| m.user_id == user_id && m.status == InvitationStatus::InvitationAccepted)
    }

    /// A milestone is staffed once its leader slot holds an accepted
    /// leader. Staffing and budget are independent axes.
    pub fn is_staffed(&self) -> bool {
        self.leader
            .as_ref()
            .is_some_and(|l| l.status == InvitationStatus::InvitationAccepted)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: DbId,
    pub public_id: PublicId,
    pub name: String,
    pub creator_id: DbId,
    pub assignee: Assignee,
    pub budgeted_hours: i64,
    #[serde(default)]
    pub hours_spent: i64,
    pub status: EntityStatus,
    pub priority: Priority,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
}

impl Project {
    pub fn milestone(&self, id: DbId) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == id)
    }

    pub fn milestone_by_public_id(&self, public_id: &PublicId) -> Option<&Milestone> {
        self.milestones.iter().find(|m| &m.public_id == public_id)
    }

    /// Walk milestone → task in one step.
    pub fn task(&self, milestone_id: DbId, task_id: DbId) -> Option<&Task> {
        self.milestone(milestone_id)?.task(task_id)
    }

    /// Walk milestone → task → subtask in one step.
    pub fn subtask(&self, milestone_id: DbId, task_id: DbId, subtask_id: DbId) -> Option<&Subtask> {
        self.task(milestone_id, task_id)?.subtask(subtask_id)
    }
}
