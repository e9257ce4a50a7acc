//! Permission- and budget-gated hierarchy mutations.
//!
//! Every create/edit runs the same gauntlet: entity lookups against the
//! cached projection, the permission resolver, assignee activity checks
//! (tasks and subtasks can only be assigned to an accepted milestone
//! member), and the budget ledger against the relevant parent — editing
//! adds the entity's own current allocation back before validating the
//! replacement value. Only then does the mutation reach the backend.

use std::sync::Arc;

use jalon_api::dto::{
    CreateMilestoneRequest, CreateSubtaskRequest, CreateTaskRequest, UpdateMilestoneRequest,
    UpdateSubtaskRequest, UpdateTaskRequest,
};
use jalon_api::Backend;
use jalon_core::budget::{self, Allocation};
use jalon_core::error::CoreError;
use jalon_core::hierarchy::{EntityStatus, Milestone, Priority, Subtask, Task};
use jalon_core::permission::PermissionResolver;
use jalon_core::types::{DbId, PublicId};

use crate::error::GovernanceError;
use crate::events::{EventBus, GovernanceEvent};
use crate::store::HierarchyStore;

/// Input for creating a milestone. The budget arrives raw (whole units
/// are enforced by the ledger's rounding).
#[derive(Debug, Clone)]
pub struct MilestoneDraft {
    pub name: String,
    pub assignee_id: DbId,
    pub budgeted_hours: f64,
    pub status: EntityStatus,
    pub priority: Priority,
}

#[derive(Debug, Clone, Default)]
pub struct MilestonePatch {
    pub name: Option<String>,
    pub assignee_id: Option<DbId>,
    pub budgeted_hours: Option<f64>,
    pub status: Option<EntityStatus>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub name: String,
    pub assignee_user_id: DbId,
    pub budgeted_hours: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub assignee_user_id: Option<DbId>,
    pub budgeted_hours: Option<f64>,
}

pub struct HierarchyOps {
    backend: Arc<dyn Backend>,
    store: Arc<HierarchyStore>,
    events: EventBus,
}

impl HierarchyOps {
    pub fn new(backend: Arc<dyn Backend>, store: Arc<HierarchyStore>, events: EventBus) -> Self {
        Self {
            backend,
            store,
            events,
        }
    }

    // -- Milestones --------------------------------------------------------

    pub async fn create_milestone(
        &self,
        actor_id: DbId,
        project_public_id: &PublicId,
        draft: MilestoneDraft,
    ) -> Result<Milestone, GovernanceError> {
        let project = self.store.project(project_public_id).await?;
        if !PermissionResolver::new(&project).can_create_milestone(actor_id) {
            return Err(CoreError::PermissionDenied(format!(
                "user {actor_id} cannot create milestones in project {}",
                project.id
            ))
            .into());
        }

        let siblings: Vec<Allocation> = project
            .milestones
            .iter()
            .map(|m| Allocation::new(m.id, m.budgeted_hours))
            .collect();
        let remaining = budget::compute_remaining(project.budgeted_hours, &siblings, None);
        let amount = budget::validate_proposed(draft.budgeted_hours, remaining, budget::DEFAULT_MINIMUM)?;

        let milestone = self
            .backend
            .create_milestone(&CreateMilestoneRequest {
                project_id: project.id,
                name: draft.name,
                assignee_id: draft.assignee_id,
                budgeted_hours: amount,
                status: draft.status,
                priority: draft.priority,
            })
            .await?;

        self.store.invalidate(project_public_id).await;
        self.publish("milestone.created", "milestone", milestone.id, actor_id);
        Ok(milestone)
    }

    pub async fn update_milestone(
        &self,
        actor_id: DbId,
        project_public_id: &PublicId,
        milestone_id: DbId,
        patch: MilestonePatch,
    ) -> Result<Milestone, GovernanceError> {
        let project = self.store.project(project_public_id).await?;
        if project.milestone(milestone_id).is_none() {
            return Err(CoreError::not_found("milestone", milestone_id).into());
        }
        if !PermissionResolver::new(&project).can_edit_milestone(actor_id) {
            return Err(CoreError::PermissionDenied(format!(
                "user {actor_id} cannot edit milestone {milestone_id}"
            ))
            .into());
        }

        let budgeted_hours = match patch.budgeted_hours {
            Some(proposed) => {
                let siblings: Vec<Allocation> = project
                    .milestones
                    .iter()
                    .map(|m| Allocation::new(m.id, m.budgeted_hours))
                    .collect();
                let remaining = budget::compute_remaining(
                    project.budgeted_hours,
                    &siblings,
                    Some(milestone_id),
                );
                Some(budget::validate_proposed(proposed, remaining, budget::DEFAULT_MINIMUM)?)
            }
            None => None,
        };

        let milestone = self
            .backend
            .update_milestone(
                milestone_id,
                &UpdateMilestoneRequest {
                    name: patch.name,
                    assignee_id: patch.assignee_id,
                    budgeted_hours,
                    status: patch.status,
                    priority: patch.priority,
                },
            )
            .await?;

        self.store.invalidate(project_public_id).await;
        self.publish("milestone.updated", "milestone", milestone_id, actor_id);
        Ok(milestone)
    }

    pub async fn delete_milestone(
        &self,
        actor_id: DbId,
        project_public_id: &PublicId,
        milestone_id: DbId,
    ) -> Result<(), GovernanceError> {
        let project = self.store.project(project_public_id).await?;
        if project.milestone(milestone_id).is_none() {
            return Err(CoreError::not_found("milestone", milestone_id).into());
        }
        if !PermissionResolver::new(&project).can_delete_milestone(actor_id) {
            return Err(CoreError::PermissionDenied(format!(
                "user {actor_id} cannot delete milestone {milestone_id}"
            ))
            .into());
        }

        self.backend.delete_milestone(milestone_id).await?;
        self.store.invalidate(project_public_id).await;
        self.publish("milestone.deleted", "milestone", milestone_id, actor_id);
        Ok(())
    }

    // -- Tasks -------------------------------------------------------------

    pub async fn create_task(
        &self,
        actor_id: DbId,
        project_public_id: &PublicId,
        milestone_id: DbId,
        draft: TaskDraft,
    ) -> Result<Task, GovernanceError> {
        let project = self.store.project(project_public_id).await?;
        let Some(milestone) = project.milestone(milestone_id) else {
            return Err(CoreError::not_found("milestone", milestone_id).into());
        };
        if !PermissionResolver::new(&project).can_create_task(milestone_id, actor_id) {
            return Err(CoreError::PermissionDenied(format!(
                "user {actor_id} cannot create tasks in milestone {milestone_id}"
            ))
            .into());
        }
        ensure_active_member(milestone, draft.assignee_user_id)?;

        let siblings: Vec<Allocation> = milestone
            .tasks
            .iter()
            .map(|t| Allocation::new(t.id, t.budgeted_hours))
            .collect();
        let remaining = budget::compute_remaining(milestone.budgeted_hours, &siblings, None);
        let amount = budget::validate_proposed(draft.budgeted_hours, remaining, budget::DEFAULT_MINIMUM)?;

        let task = self
            .backend
            .create_task(&CreateTaskRequest {
                milestone_id,
                name: draft.name,
                assignee_user_id: draft.assignee_user_id,
                budgeted_hours: amount,
            })
            .await?;

        self.store.invalidate(project_public_id).await;
        self.publish("task.created", "task", task.id, actor_id);
        Ok(task)
    }

    pub async fn update_task(
        &self,
        actor_id: DbId,
        project_public_id: &PublicId,
        milestone_id: DbId,
        task_id: DbId,
        patch: TaskPatch,
    ) -> Result<Task, GovernanceError> {
        let project = self.store.project(project_public_id).await?;
        let Some(milestone) = project.milestone(milestone_id) else {
            return Err(CoreError::not_found("milestone", milestone_id).into());
        };
        if milestone.task(task_id).is_none() {
            return Err(CoreError::not_found("task", task_id).into());
        }
        if !PermissionResolver::new(&project).can_edit_task(milestone_id, task_id, actor_id) {
            return Err(CoreError::PermissionDenied(format!(
                "user {actor_id} cannot edit task {task_id}"
            ))
            .into());
        }
        if let Some(assignee) = patch.assignee_user_id {
            ensure_active_member(milestone, assignee)?;
        }

        let budgeted_hours = match patch.budgeted_hours {
            Some(proposed) => {
                let siblings: Vec<Allocation> = milestone
                    .tasks
                    .iter()
                    .map(|t| Allocation::new(t.id, t.budgeted_hours))
                    .collect();
                let remaining =
                    budget::compute_remaining(milestone.budgeted_hours, &siblings, Some(task_id));
                Some(budget::validate_proposed(proposed, remaining, budget::DEFAULT_MINIMUM)?)
            }
            None => None,
        };

        let task = self
            .backend
            .update_task(
                task_id,
                &UpdateTaskRequest {
                    name: patch.name,
                    assignee_user_id: patch.assignee_user_id,
                    budgeted_hours,
                },
            )
            .await?;

        self.store.invalidate(project_public_id).await;
        self.publish("task.updated", "task", task_id, actor_id);
        Ok(task)
    }

    pub async fn delete_task(
        &self,
        actor_id: DbId,
        project_public_id: &PublicId,
        milestone_id: DbId,
        task_id: DbId,
    ) -> Result<(), GovernanceError> {
        let project = self.store.project(project_public_id).await?;
        let Some(milestone) = project.milestone(milestone_id) else {
            return Err(CoreError::not_found("milestone", milestone_id).into());
        };
        if milestone.task(task_id).is_none() {
            return Err(CoreError::not_found("task", task_id).into());
        }
        if !PermissionResolver::new(&project).can_delete_task(milestone_id, task_id, actor_id) {
            return Err(CoreError::PermissionDenied(format!(
                "user {actor_id} cannot delete task {task_id}"
            ))
            .into());
        }

        self.backend.delete_task(task_id).await?;
        self.store.invalidate(project_public_id).await;
        self.publish("task.deleted", "task", task_id, actor_id);
        Ok(())
    }

    // -- Subtasks ----------------------------------------------------------

    pub async fn create_subtask(
        &self,
        actor_id: DbId,
        project_public_id: &PublicId,
        milestone_id: DbId,
        task_id: DbId,
        draft: TaskDraft,
    ) -> Result<Subtask, GovernanceError> {
        let project = self.store.project(project_public_id).await?;
        let Some(milestone) = project.milestone(milestone_id) else {
            return Err(CoreError::not_found("milestone", milestone_id).into());
        };
        let Some(task) = milestone.task(task_id) else {
            return Err(CoreError::not_found("task", task_id).into());
        };
        if !PermissionResolver::new(&project).can_create_subtask(milestone_id, task_id, actor_id) {
            return Err(CoreError::PermissionDenied(format!(
                "user {actor_id} cannot create subtasks in task {task_id}"
            ))
            .into());
        }
        ensure_active_member(milestone, draft.assignee_user_id)?;

        let siblings: Vec<Allocation> = task
            .subtasks
            .iter()
            .map(|s| Allocation::new(s.id, s.budgeted_hours))
            .collect();
        let remaining = budget::compute_remaining(task.budgeted_hours, &siblings, None);
        let amount = budget::validate_proposed(draft.budgeted_hours, remaining, budget::DEFAULT_MINIMUM)?;

        let subtask = self
            .backend
            .create_subtask(&CreateSubtaskRequest {
                task_id,
                name: draft.name,
                assignee_user_id: draft.assignee_user_id,
                budgeted_hours: amount,
            })
            .await?;

        self.store.invalidate(project_public_id).await;
        self.publish("subtask.created", "subtask", subtask.id, actor_id);
        Ok(subtask)
    }

    pub async fn update_subtask(
        &self,
        actor_id: DbId,
        project_public_id: &PublicId,
        milestone_id: DbId,
        task_id: DbId,
        subtask_id: DbId,
        patch: TaskPatch,
    ) -> Result<Subtask, GovernanceError> {
        let project = self.store.project(project_public_id).await?;
        let Some(milestone) = project.milestone(milestone_id) else {
            return Err(CoreError::not_found("milestone", milestone_id).into());
        };
        let Some(task) = milestone.task(task_id) else {
            return Err(CoreError::not_found("task", task_id).into());
        };
        if task.subtask(subtask_id).is_none() {
            return Err(CoreError::not_found("subtask", subtask_id).into());
        }
        let resolver = PermissionResolver::new(&project);
        if !resolver.can_edit_subtask(milestone_id, task_id, subtask_id, actor_id) {
            return Err(CoreError::PermissionDenied(format!(
                "user {actor_id} cannot edit subtask {subtask_id}"
            ))
            .into());
        }
        if let Some(assignee) = patch.assignee_user_id {
            ensure_active_member(milestone, assignee)?;
        }

        let budgeted_hours = match patch.budgeted_hours {
            Some(proposed) => {
                let siblings: Vec<Allocation> = task
                    .subtasks
                    .iter()
                    .map(|s| Allocation::new(s.id, s.budgeted_hours))
                    .collect();
                let remaining =
                    budget::compute_remaining(task.budgeted_hours, &siblings, Some(subtask_id));
                Some(budget::validate_proposed(proposed, remaining, budget::DEFAULT_MINIMUM)?)
            }
            None => None,
        };

        let subtask = self
            .backend
            .update_subtask(
                subtask_id,
                &UpdateSubtaskRequest {
                    name: patch.name,
                    assignee_user_id: patch.assignee_user_id,
                    budgeted_hours,
                },
            )
            .await?;

        self.store.invalidate(project_public_id).await;
        self.publish("subtask.updated", "subtask", subtask_id, actor_id);
        Ok(subtask)
    }

    pub async fn delete_subtask(
        &self,
        actor_id: DbId,
        project_public_id: &PublicId,
        milestone_id: DbId,
        task_id: DbId,
        subtask_id: DbId,
    ) -> Result<(), GovernanceError> {
        let project = self.store.project(project_public_id).await?;
        let Some(milestone) = project.milestone(milestone_id) else {
            return Err(CoreError::not_found("milestone", milestone_id).into());
        };
        let Some(task) = milestone.task(task_id) else {
            return Err(CoreError::not_found("task", task_id).into());
        };
        if task.subtask(subtask_id).is_none() {
            return Err(CoreError::not_found("subtask", subtask_id).into());
        }
        let resolver = PermissionResolver::new(&project);
        if !resolver.can_delete_subtask(milestone_id, task_id, subtask_id, actor_id) {
            return Err(CoreError::PermissionDenied(format!(
                "user {actor_id} cannot delete subtask {subtask_id}"
            ))
            .into());
        }

        self.backend.delete_subtask(subtask_id).await?;
        self.store.invalidate(project_public_id).await;
        self.publish("subtask.deleted", "subtask", subtask_id, actor_id);
        Ok(())
    }

    fn publish(&self, event_type: &str, entity_type: &str, entity_id: DbId, actor_id: DbId) {
        self.events.publish(
            GovernanceEvent::new(event_type)
                .with_source(entity_type, entity_id)
                .with_actor(actor_id),
        );
    }
}

/// Tasks and subtasks may only be assigned to a member whose invitation is
/// still accepted. Removed memberships keep their historical assignments
/// but reject new ones.
fn ensure_active_member(milestone: &Milestone, user_id: DbId) -> Result<(), CoreError> {
    if milestone.active_member(user_id).is_none() {
        return Err(CoreError::Validation(format!(
            "user {user_id} is not an active member of milestone {}",
            milestone.id
        )));
    }
    Ok(())
}
