//! Capability resolver over a loaded hierarchy slice.
//!
//! Capabilities derive from the ownership chain walked root→leaf, with
//! short-circuiting: project owner, then milestone owner, then task /
//! subtask owner. Accepted milestone membership grants *creation* rights
//! one level down, never edit/delete — an asymmetry kept deliberately.
//!
//! Pure reads over an immutable snapshot; safe to call on every keystroke.

use crate::hierarchy::{Milestone, Project, Subtask, Task};
use crate::invitation::InvitationStatus;
use crate::types::DbId;

fn is_project_owner(project: &Project, actor_id: DbId) -> bool {
    project.creator_id == actor_id || project.assignee.id == actor_id
}

fn is_milestone_owner(milestone: &Milestone, actor_id: DbId) -> bool {
    milestone.creator_id == actor_id || milestone.assignee.id == actor_id
}

fn is_milestone_member(milestone: &Milestone, actor_id: DbId) -> bool {
    milestone
        .members
        .iter()
        .any(|m| m.user_id == actor_id && m.status == InvitationStatus::InvitationAccepted)
}

fn is_task_owner(task: &Task, actor_id: DbId) -> bool {
    task.creator_id == actor_id || task.assignee.user_id == actor_id
}

fn is_subtask_owner(subtask: &Subtask, actor_id: DbId) -> bool {
    subtask.creator_id == actor_id || subtask.assignee.user_id == actor_id
}

/// Answers boolean capability queries for one project snapshot.
///
/// Missing entities resolve to `false` rather than an error; callers that
/// need a distinction look the entity up first.
pub struct PermissionResolver<'a> {
    project: &'a Project,
}

impl<'a> PermissionResolver<'a> {
    pub fn new(project: &'a Project) -> Self {
        Self { project }
    }

    pub fn can_edit_project(&self, actor_id: DbId) -> bool {
        is_project_owner(self.project, actor_id)
    }

    pub fn can_delete_project(&self, actor_id: DbId) -> bool {
        is_project_owner(self.project, actor_id)
    }

    /// Milestone creation and management are project-owner-gated only.
    pub fn can_create_milestone(&self, actor_id: DbId) -> bool {
        is_project_owner(self.project, actor_id)
    }

    pub fn can_edit_milestone(&self, actor_id: DbId) -> bool {
        is_project_owner(self.project, actor_id)
    }

    pub fn can_delete_milestone(&self, actor_id: DbId) -> bool {
        is_project_owner(self.project, actor_id)
    }

    /// Staffing management — inviting, cancelling, updating, and removing
    /// leaders/members — is open to the project owner and the milestone
    /// owner.
    pub fn can_staff_milestone(&self, milestone_id: DbId, actor_id: DbId) -> bool {
        let Some(milestone) = self.project.milestone(milestone_id) else {
            return false;
        };
        is_project_owner(self.project, actor_id) || is_milestone_owner(milestone, actor_id)
    }

    pub fn can_create_task(&self, milestone_id: DbId, actor_id: DbId) -> bool {
        let Some(milestone) = self.project.milestone(milestone_id) else {
            return false;
        };
        is_project_owner(self.project, actor_id)
            || is_milestone_owner(milestone, actor_id)
            || is_milestone_member(milestone, actor_id)
    }

    pub fn can_edit_task(&self, milestone_id: DbId, task_id: DbId, actor_id: DbId) -> bool {
        let Some(milestone) = self.project.milestone(milestone_id) else {
            return false;
        };
        let Some(task) = milestone.task(task_id) else {
            return false;
        };
        is_project_owner(self.project, actor_id)
            || is_milestone_owner(milestone, actor_id)
            || is_task_owner(task, actor_id)
    }

    pub fn can_delete_task(&self, milestone_id: DbId, task_id: DbId, actor_id: DbId) -> bool {
        self.can_edit_task(milestone_id, task_id, actor_id)
    }

    pub fn can_create_subtask(&self, milestone_id: DbId, task_id: DbId, actor_id: DbId) -> bool {
        let Some(milestone) = self.project.milestone(milestone_id) else {
            return false;
        };
        let Some(task) = milestone.task(task_id) else {
            return false;
        };
        is_project_owner(self.project, actor_id)
            || is_milestone_owner(milestone, actor_id)
            || is_milestone_member(milestone, actor_id)
            || is_task_owner(task, actor_id)
    }

    pub fn can_edit_subtask(
        &self,
        milestone_id: DbId,
        task_id: DbId,
        subtask_id: DbId,
        actor_id: DbId,
    ) -> bool {
        let Some(milestone) = self.project.milestone(milestone_id) else {
            return false;
        };
        let Some(task) = milestone.task(task_id) else {
            return false;
        };
        let Some(subtask) = task.subtask(subtask_id) else {
            return false;
        };
        is_project_owner(self.project, actor_id)
            || is_milestone_owner(milestone, actor_id)
            || is_task_owner(task, actor_id)
            || is_subtask_owner(subtask, actor_id)
    }

    pub fn can_delete_subtask(
        &self,
        milestone_id: DbId,
        task_id: DbId,
        subtask_id: DbId,
        actor_id: DbId,
    ) -> bool {
        self.can_edit_subtask(milestone_id, task_id, subtask_id, actor_id)
    }
}
