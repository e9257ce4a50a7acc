//! `reqwest` implementation of the [`Backend`] trait.
//!
//! Endpoint paths follow the backend's REST layout: invitee-facing
//! invitation actions are keyed by public id
//! (`/{kind}-invitations/{publicId}/accept`), owner-facing ones by numeric
//! ids (`/leader-invitations/{milestoneId}/{invitationId}/approve`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use jalon_core::hierarchy::{MembershipRecord, Milestone, Project, Subtask, Task};
use jalon_core::invitation::{InvitationKind, InvitationRecord};
use jalon_core::types::{DbId, PublicId};

use crate::backend::Backend;
use crate::config::ApiConfig;
use crate::dto::{
    ApproveLeaderInvitationRequest, AvailableBudgetResponse, CreateLeaderInvitationRequest,
    CreateMemberInvitationRequest, CreateMilestoneRequest, CreateSubtaskRequest,
    CreateTaskRequest, RejectInvitationBody, UpdateMemberInvitationRequest,
    UpdateMilestoneRequest, UpdateSubtaskRequest, UpdateTaskRequest,
};
use crate::error::ApiError;

/// HTTP client for the Jalon backend.
pub struct ApiClient {
    client: reqwest::Client,
    config: ApiConfig,
}

impl ApiClient {
    /// Build a client from configuration. The request timeout applies to
    /// every call; an abandoned call has no client-side side effects.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Build a client reusing an existing [`reqwest::Client`] (useful for
    /// connection pooling across components).
    pub fn with_client(client: reqwest::Client, config: ApiConfig) -> Self {
        Self { client, config }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        let mut builder = self.client.request(method, url);
        if let Some(token) = &self.config.access_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        Err(Self::error_from(status, response).await)
    }

    async fn check_status(response: Response) -> Result<(), ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(Self::error_from(status, response).await)
    }

    async fn error_from(status: StatusCode, response: Response) -> ApiError {
        let body = response.text().await.unwrap_or_default();
        let error = ApiError::from_envelope(status.as_u16(), &body);
        tracing::warn!(status = status.as_u16(), %error, "backend request rejected");
        error
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.request(Method::GET, path).send().await?;
        Self::parse_response(response).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, ApiError> {
        let response = self.request(method, path).json(body).send().await?;
        Self::parse_response(response).await
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.request(Method::POST, path).send().await?;
        Self::parse_response(response).await
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn project(&self, public_id: &PublicId) -> Result<Project, ApiError> {
        self.get_json(&format!("projects/{public_id}")).await
    }

    async fn available_budget(
        &self,
        project_public_id: &PublicId,
    ) -> Result<AvailableBudgetResponse, ApiError> {
        self.get_json(&format!("projects/{project_public_id}/available-budget"))
            .await
    }

    async fn invitation(
        &self,
        kind: InvitationKind,
        public_id: &PublicId,
    ) -> Result<InvitationRecord, ApiError> {
        self.get_json(&format!("{}-invitations/{public_id}", kind.as_str()))
            .await
    }

    async fn milestone_invitations(
        &self,
        kind: InvitationKind,
        milestone_public_id: &PublicId,
    ) -> Result<Vec<InvitationRecord>, ApiError> {
        self.get_json(&format!(
            "{}-invitations/by-milestone/{milestone_public_id}",
            kind.as_str()
        ))
        .await
    }

    async fn create_leader_invitation(
        &self,
        request: &CreateLeaderInvitationRequest,
    ) -> Result<InvitationRecord, ApiError> {
        self.send_json(Method::POST, "leader-invitations", request)
            .await
    }

    async fn create_member_invitation(
        &self,
        request: &CreateMemberInvitationRequest,
    ) -> Result<InvitationRecord, ApiError> {
        self.send_json(Method::POST, "member-invitations", request)
            .await
    }

    async fn accept_invitation(
        &self,
        kind: InvitationKind,
        public_id: &PublicId,
    ) -> Result<InvitationRecord, ApiError> {
        self.post_json(&format!("{}-invitations/{public_id}/accept", kind.as_str()))
            .await
    }

    async fn reject_invitation(
        &self,
        kind: InvitationKind,
        public_id: &PublicId,
        remark: &str,
    ) -> Result<InvitationRecord, ApiError> {
        let body = RejectInvitationBody {
            remark: remark.to_string(),
        };
        self.send_json(
            Method::POST,
            &format!("{}-invitations/{public_id}/reject", kind.as_str()),
            &body,
        )
        .await
    }

    async fn update_member_invitation(
        &self,
        public_id: &PublicId,
        request: &UpdateMemberInvitationRequest,
    ) -> Result<InvitationRecord, ApiError> {
        self.send_json(
            Method::PUT,
            &format!("member-invitations/{public_id}"),
            request,
        )
        .await
    }

    async fn resend_member_invitation(
        &self,
        public_id: &PublicId,
    ) -> Result<InvitationRecord, ApiError> {
        self.post_json(&format!("member-invitations/{public_id}/resend"))
            .await
    }

    async fn approve_leader_invitation(
        &self,
        milestone_id: DbId,
        invitation_id: DbId,
        request: &ApproveLeaderInvitationRequest,
    ) -> Result<InvitationRecord, ApiError> {
        self.send_json(
            Method::PUT,
            &format!("leader-invitations/{milestone_id}/{invitation_id}/approve"),
            request,
        )
        .await
    }

    async fn milestone_members(
        &self,
        milestone_id: DbId,
    ) -> Result<Vec<MembershipRecord>, ApiError> {
        self.get_json(&format!("milestones/{milestone_id}/members"))
            .await
    }

    async fn remove_leader(
        &self,
        project_public_id: &PublicId,
        milestone_public_id: &PublicId,
    ) -> Result<(), ApiError> {
        let response = self
            .request(
                Method::PUT,
                &format!("projects/{project_public_id}/milestones/{milestone_public_id}/leader"),
            )
            .send()
            .await?;
        Self::check_status(response).await
    }

    async fn remove_member(&self, milestone_id: DbId, user_id: DbId) -> Result<(), ApiError> {
        let response = self
            .request(
                Method::DELETE,
                &format!("milestones/{milestone_id}/members/{user_id}"),
            )
            .send()
            .await?;
        Self::check_status(response).await
    }

    async fn create_milestone(
        &self,
        request: &CreateMilestoneRequest,
    ) -> Result<Milestone, ApiError> {
        self.send_json(Method::POST, "milestones", request).await
    }

    async fn update_milestone(
        &self,
        milestone_id: DbId,
        request: &UpdateMilestoneRequest,
    ) -> Result<Milestone, ApiError> {
        self.send_json(Method::PUT, &format!("milestones/{milestone_id}"), request)
            .await
    }

    async fn delete_milestone(&self, milestone_id: DbId) -> Result<(), ApiError> {
        let response = self
            .request(Method::DELETE, &format!("milestones/{milestone_id}"))
            .send()
            .await?;
        Self::check_status(response).await
    }

    async fn create_task(&self, request: &CreateTaskRequest) -> Result<Task, ApiError> {
        self.send_json(Method::POST, "tasks", request).await
    }

    async fn update_task(
        &self,
        task_id: DbId,
        request: &UpdateTaskRequest,
    ) -> Result<Task, ApiError> {
        self.send_json(Method::PUT, &format!("tasks/{task_id}"), request)
            .await
    }

    async fn delete_task(&self, task_id: DbId) -> Result<(), ApiError> {
        let response = self
            .request(Method::DELETE, &format!("tasks/{task_id}"))
            .send()
            .await?;
        Self::check_status(response).await
    }

    async fn create_subtask(&self, request: &CreateSubtaskRequest) -> Result<Subtask, ApiError> {
        self.send_json(Method::POST, "subtasks", request).await
    }

    async fn update_subtask(
        &self,
        subtask_id: DbId,
        request: &UpdateSubtaskRequest,
    ) -> Result<Subtask, ApiError> {
        self.send_json(Method::PUT, &format!("subtasks/{subtask_id}"), request)
            .await
    }

    async fn delete_subtask(&self, subtask_id: DbId) -> Result<(), ApiError> {
        let response = self
            .request(Method::DELETE, &format!("subtasks/{subtask_id}"))
            .send()
            .await?;
        Self::check_status(response).await
    }
}
