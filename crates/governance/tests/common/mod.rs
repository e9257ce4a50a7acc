//! In-memory implementation of the backend collaborator for integration
//! tests.
//!
//! Plays the system of record faithfully: invitation status changes are a
//! compare-and-swap (a stale transition gets a 409
//! `INVALID_STATE_TRANSITION` envelope), budget containment is re-checked
//! authoritatively on every mutation, and accepting an invitation creates
//! the corresponding staffing record. Call counters let tests assert that
//! client-side gates fire before any backend traffic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use jalon_api::dto::{
    ApproveLeaderInvitationRequest, AvailableBudgetResponse, CreateLeaderInvitationRequest,
    CreateMemberInvitationRequest, CreateMilestoneRequest, CreateSubtaskRequest,
    CreateTaskRequest, UpdateMemberInvitationRequest, UpdateMilestoneRequest,
    UpdateSubtaskRequest, UpdateTaskRequest,
};
use jalon_api::error::codes;
use jalon_api::{ApiError, Backend};
use jalon_core::hierarchy::{
    Assignee, EntityStatus, MembershipRecord, Milestone, MilestoneLeader, Priority, Project,
    Subtask, Task,
};
use jalon_core::invitation::{
    InvitationKind, InvitationPayload, InvitationRecord, InvitationStatus, MilestoneRef,
};
use jalon_core::types::{DbId, PublicId};

pub const PROJECT_OWNER: DbId = 1;
pub const PROJECT_PUBLIC_ID: &str = "pr-platform";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jalon_governance=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Everything a test needs, wired the way an application would wire it.
pub struct Harness {
    pub backend: std::sync::Arc<InMemoryBackend>,
    pub store: std::sync::Arc<jalon_governance::HierarchyStore>,
    pub registry: jalon_governance::InvitationRegistry,
    pub ops: jalon_governance::HierarchyOps,
    pub events: jalon_governance::EventBus,
}

pub fn harness(project_budget: i64) -> Harness {
    init_tracing();
    let backend = std::sync::Arc::new(InMemoryBackend::with_project_budget(project_budget));
    let store = std::sync::Arc::new(jalon_governance::HierarchyStore::new(
        backend.clone() as std::sync::Arc<dyn Backend>
    ));
    let events = jalon_governance::EventBus::new();
    let registry = jalon_governance::InvitationRegistry::new(
        backend.clone() as std::sync::Arc<dyn Backend>,
        store.clone(),
        events.clone(),
    );
    let ops = jalon_governance::HierarchyOps::new(
        backend.clone() as std::sync::Arc<dyn Backend>,
        store.clone(),
        events.clone(),
    );
    Harness {
        backend,
        store,
        registry,
        ops,
        events,
    }
}

/// A valid freelancer member invitation payload for `user_id`.
pub fn member_payload(user_id: DbId) -> jalon_core::invitation::MemberInvitationPayload {
    jalon_core::invitation::MemberInvitationPayload {
        user_id,
        hourly_rate: Some(60),
        role_type_id: Some(2),
        invitee_type: jalon_core::invitation::InviteeType::Freelancer,
        freelancer_id: Some(user_id),
        company_id: None,
        company_user_id: None,
        remark: None,
    }
}

/// A valid leader invitation payload for `leader_id`.
pub fn leader_payload(leader_id: DbId) -> jalon_core::invitation::LeaderInvitationPayload {
    jalon_core::invitation::LeaderInvitationPayload {
        leader_id,
        leader_rate: Some(90),
        nda_template_id: None,
        message: None,
    }
}

/// A milestone draft with the given budget, assigned to the project owner.
pub fn milestone_draft(budgeted_hours: f64) -> jalon_governance::ops::MilestoneDraft {
    jalon_governance::ops::MilestoneDraft {
        name: "Design".to_string(),
        assignee_id: PROJECT_OWNER,
        budgeted_hours,
        status: EntityStatus::Preparation,
        priority: Priority::Medium,
    }
}

fn api_error(status: u16, code: &str, message: impl Into<String>) -> ApiError {
    ApiError::Api {
        status,
        code: code.to_string(),
        message: message.into(),
    }
}

fn stale_transition() -> ApiError {
    api_error(
        409,
        codes::INVALID_STATE_TRANSITION,
        "this invitation has already been responded to",
    )
}

struct State {
    project: Project,
    invitations: HashMap<PublicId, InvitationRecord>,
    next_id: DbId,
}

impl State {
    fn allocate_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn milestone_mut(&mut self, id: DbId) -> Result<&mut Milestone, ApiError> {
        self.project
            .milestones
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| api_error(404, codes::NOT_FOUND, format!("milestone {id} not found")))
    }
}

/// Backend double holding one project and its invitations.
pub struct InMemoryBackend {
    state: Mutex<State>,
    pub project_fetches: AtomicUsize,
    pub invitation_creates: AtomicUsize,
    pub accepts: AtomicUsize,
    pub rejects: AtomicUsize,
    pub task_creates: AtomicUsize,
}

impl InMemoryBackend {
    /// A project owned (created and assigned) by [`PROJECT_OWNER`], with
    /// the given total budget and no milestones yet.
    pub fn with_project_budget(budgeted_hours: i64) -> Self {
        let project = Project {
            id: 1,
            public_id: PublicId::new(PROJECT_PUBLIC_ID),
            name: "Platform rebuild".to_string(),
            creator_id: PROJECT_OWNER,
            assignee: Assignee {
                id: PROJECT_OWNER,
                name: "Avery".to_string(),
            },
            budgeted_hours,
            hours_spent: 0,
            status: EntityStatus::InProgress,
            priority: Priority::High,
            milestones: vec![],
        };
        Self {
            state: Mutex::new(State {
                project,
                invitations: HashMap::new(),
                next_id: 100,
            }),
            project_fetches: AtomicUsize::new(0),
            invitation_creates: AtomicUsize::new(0),
            accepts: AtomicUsize::new(0),
            rejects: AtomicUsize::new(0),
            task_creates: AtomicUsize::new(0),
        }
    }

    pub fn project_public_id() -> PublicId {
        PublicId::new(PROJECT_PUBLIC_ID)
    }

    /// Snapshot of the current project state, bypassing the counters.
    pub fn project_snapshot(&self) -> Project {
        self.state.lock().unwrap().project.clone()
    }

    fn milestone_ref(milestone: &Milestone) -> MilestoneRef {
        MilestoneRef {
            id: milestone.id,
            public_id: milestone.public_id.clone(),
            project_id: milestone.project_id,
            project_public_id: PublicId::new(PROJECT_PUBLIC_ID),
        }
    }

    fn new_invitation(
        state: &mut State,
        milestone_id: DbId,
        payload: InvitationPayload,
    ) -> Result<InvitationRecord, ApiError> {
        let milestone = state.milestone_mut(milestone_id)?;
        let milestone_ref = Self::milestone_ref(milestone);
        let id = state.allocate_id();
        let record = InvitationRecord {
            id,
            public_id: PublicId::new(uuid::Uuid::new_v4().to_string()),
            milestone: milestone_ref,
            status: InvitationStatus::PendingInvitation,
            invited_at: Utc::now(),
            accepted_at: None,
            expired_at: None,
            removed_at: None,
            payload,
        };
        state
            .invitations
            .insert(record.public_id.clone(), record.clone());
        Ok(record)
    }

    fn find_invitation(
        state: &State,
        kind: InvitationKind,
        public_id: &PublicId,
    ) -> Result<InvitationRecord, ApiError> {
        state
            .invitations
            .get(public_id)
            .filter(|record| record.kind() == kind)
            .cloned()
            .ok_or_else(|| {
                api_error(404, codes::NOT_FOUND, format!("invitation {public_id} not found"))
            })
    }

    /// Authoritative containment check, mirroring what the real backend
    /// must enforce to close the concurrent-edit gap.
    fn check_containment(
        parent_total: i64,
        siblings: impl Iterator<Item = (DbId, i64)>,
        exclude: Option<DbId>,
        proposed: i64,
    ) -> Result<(), ApiError> {
        let allocated: i64 = siblings
            .filter(|(id, _)| exclude != Some(*id))
            .map(|(_, amount)| amount)
            .sum();
        if allocated + proposed > parent_total {
            return Err(api_error(
                400,
                codes::BUDGET_EXCEEDED,
                format!("allocation {proposed} exceeds the remaining {}", parent_total - allocated),
            ));
        }
        Ok(())
    }

    fn membership_from_member_payload(
        record: &InvitationRecord,
    ) -> Result<MembershipRecord, ApiError> {
        let InvitationPayload::Member(payload) = &record.payload else {
            return Err(api_error(500, codes::INTERNAL_ERROR, "not a member invitation"));
        };
        Ok(MembershipRecord {
            user_id: payload.user_id,
            user_name: format!("user-{}", payload.user_id),
            hourly_rate: payload.hourly_rate.unwrap_or(0),
            role_type_id: payload.role_type_id.unwrap_or(0),
            status: InvitationStatus::InvitationAccepted,
            invitation_public_id: record.public_id.clone(),
        })
    }

    fn active_member(milestone: &Milestone, user_id: DbId) -> Result<MembershipRecord, ApiError> {
        milestone
            .members
            .iter()
            .find(|m| m.user_id == user_id && m.status == InvitationStatus::InvitationAccepted)
            .cloned()
            .ok_or_else(|| {
                api_error(
                    400,
                    codes::VALIDATION_ERROR,
                    format!("user {user_id} is not an active member"),
                )
            })
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn project(&self, public_id: &PublicId) -> Result<Project, ApiError> {
        self.project_fetches.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if &state.project.public_id != public_id {
            return Err(api_error(404, codes::NOT_FOUND, format!("project {public_id} not found")));
        }
        Ok(state.project.clone())
    }

    async fn available_budget(
        &self,
        project_public_id: &PublicId,
    ) -> Result<AvailableBudgetResponse, ApiError> {
        let state = self.state.lock().unwrap();
        if &state.project.public_id != project_public_id {
            return Err(api_error(404, codes::NOT_FOUND, "project not found"));
        }
        let allocated: i64 = state.project.milestones.iter().map(|m| m.budgeted_hours).sum();
        Ok(AvailableBudgetResponse {
            total_budget: state.project.budgeted_hours,
            allocated_budget: allocated,
            available_budget: state.project.budgeted_hours - allocated,
        })
    }

    async fn invitation(
        &self,
        kind: InvitationKind,
        public_id: &PublicId,
    ) -> Result<InvitationRecord, ApiError> {
        let state = self.state.lock().unwrap();
        Self::find_invitation(&state, kind, public_id)
    }

    async fn milestone_invitations(
        &self,
        kind: InvitationKind,
        milestone_public_id: &PublicId,
    ) -> Result<Vec<InvitationRecord>, ApiError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .invitations
            .values()
            .filter(|r| r.kind() == kind && &r.milestone.public_id == milestone_public_id)
            .cloned()
            .collect())
    }

    async fn create_leader_invitation(
        &self,
        request: &CreateLeaderInvitationRequest,
    ) -> Result<InvitationRecord, ApiError> {
        self.invitation_creates.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        Self::new_invitation(
            &mut state,
            request.milestone_id,
            InvitationPayload::Leader(request.payload.clone()),
        )
    }

    async fn create_member_invitation(
        &self,
        request: &CreateMemberInvitationRequest,
    ) -> Result<InvitationRecord, ApiError> {
        self.invitation_creates.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        Self::new_invitation(
            &mut state,
            request.milestone_id,
            InvitationPayload::Member(request.payload.clone()),
        )
    }

    async fn accept_invitation(
        &self,
        kind: InvitationKind,
        public_id: &PublicId,
    ) -> Result<InvitationRecord, ApiError> {
        self.accepts.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let record = Self::find_invitation(&state, kind, public_id)?;
        if record.status != InvitationStatus::PendingInvitation {
            return Err(stale_transition());
        }

        let mut updated = record;
        updated.status = InvitationStatus::InvitationAccepted;
        updated.accepted_at = Some(Utc::now());

        // Side effect: staffing record / leader slot.
        match &updated.payload {
            InvitationPayload::Member(_) => {
                let membership = Self::membership_from_member_payload(&updated)?;
                let milestone_id = updated.milestone.id;
                state.milestone_mut(milestone_id)?.members.push(membership);
            }
            InvitationPayload::Leader(payload) => {
                let leader = MilestoneLeader {
                    user_id: payload.leader_id,
                    name: format!("user-{}", payload.leader_id),
                    leader_rate: payload.leader_rate.unwrap_or(0),
                    status: InvitationStatus::InvitationAccepted,
                };
                let milestone_id = updated.milestone.id;
                state.milestone_mut(milestone_id)?.leader = Some(leader);
            }
        }

        state
            .invitations
            .insert(updated.public_id.clone(), updated.clone());
        Ok(updated)
    }

    async fn reject_invitation(
        &self,
        kind: InvitationKind,
        public_id: &PublicId,
        _remark: &str,
    ) -> Result<InvitationRecord, ApiError> {
        self.rejects.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let record = Self::find_invitation(&state, kind, public_id)?;
        if record.status != InvitationStatus::PendingInvitation {
            return Err(stale_transition());
        }

        let mut updated = record;
        updated.status = InvitationStatus::InvitationRejected;
        state
            .invitations
            .insert(updated.public_id.clone(), updated.clone());
        Ok(updated)
    }

    async fn update_member_invitation(
        &self,
        public_id: &PublicId,
        request: &UpdateMemberInvitationRequest,
    ) -> Result<InvitationRecord, ApiError> {
        let mut state = self.state.lock().unwrap();
        let record = Self::find_invitation(&state, InvitationKind::Member, public_id)?;
        if record.status != InvitationStatus::PendingInvitation {
            return Err(stale_transition());
        }

        let mut updated = record;
        if let Some(status) = request.status {
            // Only cancellation arrives as a status patch.
            if status != InvitationStatus::InvitationCanceled {
                return Err(api_error(400, codes::VALIDATION_ERROR, "unsupported status patch"));
            }
            updated.status = status;
        }
        if let InvitationPayload::Member(payload) = &mut updated.payload {
            if let Some(rate) = request.hourly_rate {
                payload.hourly_rate = Some(rate);
            }
            if let Some(role) = request.role_type_id {
                payload.role_type_id = Some(role);
            }
            if let Some(remark) = &request.remark {
                payload.remark = Some(remark.clone());
            }
        }
        state
            .invitations
            .insert(updated.public_id.clone(), updated.clone());
        Ok(updated)
    }

    async fn resend_member_invitation(
        &self,
        public_id: &PublicId,
    ) -> Result<InvitationRecord, ApiError> {
        let state = self.state.lock().unwrap();
        Self::find_invitation(&state, InvitationKind::Member, public_id)
    }

    async fn approve_leader_invitation(
        &self,
        milestone_id: DbId,
        invitation_id: DbId,
        request: &ApproveLeaderInvitationRequest,
    ) -> Result<InvitationRecord, ApiError> {
        let mut state = self.state.lock().unwrap();
        let record = state
            .invitations
            .values()
            .find(|r| r.id == invitation_id && r.milestone.id == milestone_id)
            .cloned()
            .ok_or_else(|| api_error(404, codes::NOT_FOUND, "invitation not found"))?;
        if record.status != InvitationStatus::PendingInvitation {
            return Err(stale_transition());
        }

        let mut updated = record;
        updated.status = InvitationStatus::InvitationApproved;
        if let InvitationPayload::Leader(payload) = &mut updated.payload {
            payload.leader_rate = Some(request.leader_rate);
        }
        state
            .invitations
            .insert(updated.public_id.clone(), updated.clone());
        Ok(updated)
    }

    async fn milestone_members(
        &self,
        milestone_id: DbId,
    ) -> Result<Vec<MembershipRecord>, ApiError> {
        let mut state = self.state.lock().unwrap();
        Ok(state.milestone_mut(milestone_id)?.members.clone())
    }

    async fn remove_leader(
        &self,
        project_public_id: &PublicId,
        milestone_public_id: &PublicId,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        if &state.project.public_id != project_public_id {
            return Err(api_error(404, codes::NOT_FOUND, "project not found"));
        }
        let milestone = state
            .project
            .milestones
            .iter_mut()
            .find(|m| &m.public_id == milestone_public_id)
            .ok_or_else(|| api_error(404, codes::NOT_FOUND, "milestone not found"))?;
        if milestone.leader.take().is_none() {
            return Err(api_error(404, codes::NOT_FOUND, "milestone has no leader"));
        }
        let milestone_id = milestone.id;
        for record in state.invitations.values_mut() {
            if record.milestone.id == milestone_id
                && record.kind() == InvitationKind::Leader
                && record.status == InvitationStatus::InvitationAccepted
            {
                record.status = InvitationStatus::Removed;
                record.removed_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn remove_member(&self, milestone_id: DbId, user_id: DbId) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        let milestone = state.milestone_mut(milestone_id)?;
        let member = milestone
            .members
            .iter_mut()
            .find(|m| m.user_id == user_id && m.status == InvitationStatus::InvitationAccepted)
            .ok_or_else(|| api_error(404, codes::NOT_FOUND, "member not found"))?;
        member.status = InvitationStatus::Removed;
        let invitation_public_id = member.invitation_public_id.clone();
        if let Some(record) = state.invitations.get_mut(&invitation_public_id) {
            record.status = InvitationStatus::Removed;
            record.removed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn create_milestone(
        &self,
        request: &CreateMilestoneRequest,
    ) -> Result<Milestone, ApiError> {
        let mut state = self.state.lock().unwrap();
        Self::check_containment(
            state.project.budgeted_hours,
            state.project.milestones.iter().map(|m| (m.id, m.budgeted_hours)),
            None,
            request.budgeted_hours,
        )?;
        let id = state.allocate_id();
        let milestone = Milestone {
            id,
            public_id: PublicId::new(format!("ms-{id}")),
            project_id: state.project.id,
            name: request.name.clone(),
            creator_id: PROJECT_OWNER,
            assignee: Assignee {
                id: request.assignee_id,
                name: format!("user-{}", request.assignee_id),
            },
            budgeted_hours: request.budgeted_hours,
            hours_spent: 0,
            status: request.status,
            priority: request.priority,
            leader: None,
            members: vec![],
            tasks: vec![],
        };
        state.project.milestones.push(milestone.clone());
        Ok(milestone)
    }

    async fn update_milestone(
        &self,
        milestone_id: DbId,
        request: &UpdateMilestoneRequest,
    ) -> Result<Milestone, ApiError> {
        let mut state = self.state.lock().unwrap();
        if let Some(proposed) = request.budgeted_hours {
            Self::check_containment(
                state.project.budgeted_hours,
                state.project.milestones.iter().map(|m| (m.id, m.budgeted_hours)),
                Some(milestone_id),
                proposed,
            )?;
        }
        let milestone = state.milestone_mut(milestone_id)?;
        if let Some(name) = &request.name {
            milestone.name = name.clone();
        }
        if let Some(assignee_id) = request.assignee_id {
            milestone.assignee = Assignee {
                id: assignee_id,
                name: format!("user-{assignee_id}"),
            };
        }
        if let Some(hours) = request.budgeted_hours {
            milestone.budgeted_hours = hours;
        }
        if let Some(status) = request.status {
            milestone.status = status;
        }
        if let Some(priority) = request.priority {
            milestone.priority = priority;
        }
        Ok(milestone.clone())
    }

    async fn delete_milestone(&self, milestone_id: DbId) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        let before = state.project.milestones.len();
        state.project.milestones.retain(|m| m.id != milestone_id);
        if state.project.milestones.len() == before {
            return Err(api_error(404, codes::NOT_FOUND, "milestone not found"));
        }
        Ok(())
    }

    async fn create_task(&self, request: &CreateTaskRequest) -> Result<Task, ApiError> {
        self.task_creates.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let milestone = state
            .project
            .milestones
            .iter()
            .find(|m| m.id == request.milestone_id)
            .ok_or_else(|| api_error(404, codes::NOT_FOUND, "milestone not found"))?;
        Self::check_containment(
            milestone.budgeted_hours,
            milestone.tasks.iter().map(|t| (t.id, t.budgeted_hours)),
            None,
            request.budgeted_hours,
        )?;
        let assignee = Self::active_member(milestone, request.assignee_user_id)?;

        let id = state.allocate_id();
        let task = Task {
            id,
            milestone_id: request.milestone_id,
            name: request.name.clone(),
            creator_id: PROJECT_OWNER,
            assignee,
            budgeted_hours: request.budgeted_hours,
            subtasks: vec![],
        };
        state
            .milestone_mut(request.milestone_id)?
            .tasks
            .push(task.clone());
        Ok(task)
    }

    async fn update_task(
        &self,
        task_id: DbId,
        request: &UpdateTaskRequest,
    ) -> Result<Task, ApiError> {
        let mut state = self.state.lock().unwrap();
        let milestone = state
            .project
            .milestones
            .iter()
            .find(|m| m.tasks.iter().any(|t| t.id == task_id))
            .ok_or_else(|| api_error(404, codes::NOT_FOUND, "task not found"))?;
        if let Some(proposed) = request.budgeted_hours {
            Self::check_containment(
                milestone.budgeted_hours,
                milestone.tasks.iter().map(|t| (t.id, t.budgeted_hours)),
                Some(task_id),
                proposed,
            )?;
        }
        let assignee = match request.assignee_user_id {
            Some(user_id) => Some(Self::active_member(milestone, user_id)?),
            None => None,
        };

        let milestone_id = milestone.id;
        let milestone = state.milestone_mut(milestone_id)?;
        let task = milestone
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| api_error(404, codes::NOT_FOUND, "task not found"))?;
        if let Some(name) = &request.name {
            task.name = name.clone();
        }
        if let Some(hours) = request.budgeted_hours {
            task.budgeted_hours = hours;
        }
        if let Some(assignee) = assignee {
            task.assignee = assignee;
        }
        Ok(task.clone())
    }

    async fn delete_task(&self, task_id: DbId) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        for milestone in &mut state.project.milestones {
            let before = milestone.tasks.len();
            milestone.tasks.retain(|t| t.id != task_id);
            if milestone.tasks.len() != before {
                return Ok(());
            }
        }
        Err(api_error(404, codes::NOT_FOUND, "task not found"))
    }

    async fn create_subtask(&self, request: &CreateSubtaskRequest) -> Result<Subtask, ApiError> {
        let mut state = self.state.lock().unwrap();
        let (milestone_id, task) = state
            .project
            .milestones
            .iter()
            .flat_map(|m| m.tasks.iter().map(move |t| (m.id, t)))
            .find(|(_, t)| t.id == request.task_id)
            .ok_or_else(|| api_error(404, codes::NOT_FOUND, "task not found"))?;
        Self::check_containment(
            task.budgeted_hours,
            task.subtasks.iter().map(|s| (s.id, s.budgeted_hours)),
            None,
            request.budgeted_hours,
        )?;
        let milestone = state
            .project
            .milestones
            .iter()
            .find(|m| m.id == milestone_id)
            .unwrap();
        let assignee = Self::active_member(milestone, request.assignee_user_id)?;

        let id = state.allocate_id();
        let subtask = Subtask {
            id,
            task_id: request.task_id,
            name: request.name.clone(),
            creator_id: PROJECT_OWNER,
            assignee,
            budgeted_hours: request.budgeted_hours,
        };
        let milestone = state.milestone_mut(milestone_id)?;
        let task = milestone
            .tasks
            .iter_mut()
            .find(|t| t.id == request.task_id)
            .unwrap();
        task.subtasks.push(subtask.clone());
        Ok(subtask)
    }

    async fn update_subtask(
        &self,
        subtask_id: DbId,
        request: &UpdateSubtaskRequest,
    ) -> Result<Subtask, ApiError> {
        let mut state = self.state.lock().unwrap();
        for milestone in &mut state.project.milestones {
            for task in &mut milestone.tasks {
                if let Some(subtask) = task.subtasks.iter_mut().find(|s| s.id == subtask_id) {
                    if let Some(name) = &request.name {
                        subtask.name = name.clone();
                    }
                    if let Some(hours) = request.budgeted_hours {
                        subtask.budgeted_hours = hours;
                    }
                    return Ok(subtask.clone());
                }
            }
        }
        Err(api_error(404, codes::NOT_FOUND, "subtask not found"))
    }

    async fn delete_subtask(&self, subtask_id: DbId) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        for milestone in &mut state.project.milestones {
            for task in &mut milestone.tasks {
                let before = task.subtasks.len();
                task.subtasks.retain(|s| s.id != subtask_id);
                if task.subtasks.len() != before {
                    return Ok(());
                }
            }
        }
        Err(api_error(404, codes::NOT_FOUND, "subtask not found"))
    }
}
