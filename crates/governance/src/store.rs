//! Read-through cache of project hierarchy projections.
//!
//! The backend is the system of record; this store only memoizes the last
//! fetched snapshot per project so that permission and budget checks can
//! run repeatedly (e.g. on every keystroke of a budget input) without a
//! network round-trip. Any successful staffing or budget mutation must
//! call [`HierarchyStore::invalidate`] so the next read observes fresh
//! membership and allocations.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use jalon_api::Backend;
use jalon_core::hierarchy::Project;
use jalon_core::types::PublicId;

use crate::error::GovernanceError;

pub struct HierarchyStore {
    backend: Arc<dyn Backend>,
    projects: RwLock<HashMap<PublicId, Arc<Project>>>,
}

impl HierarchyStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            projects: RwLock::new(HashMap::new()),
        }
    }

    /// The cached projection for a project, fetching it on a miss.
    pub async fn project(&self, public_id: &PublicId) -> Result<Arc<Project>, GovernanceError> {
        if let Some(project) = self.projects.read().await.get(public_id) {
            return Ok(Arc::clone(project));
        }
        self.refresh(public_id).await
    }

    /// Fetch a fresh projection from the backend and cache it.
    pub async fn refresh(&self, public_id: &PublicId) -> Result<Arc<Project>, GovernanceError> {
        let project = Arc::new(self.backend.project(public_id).await?);
        self.projects
            .write()
            .await
            .insert(public_id.clone(), Arc::clone(&project));
        tracing::debug!(project = %public_id, "hierarchy projection refreshed");
        Ok(project)
    }

    /// Drop the cached projection for one project.
    pub async fn invalidate(&self, public_id: &PublicId) {
        self.projects.write().await.remove(public_id);
        tracing::debug!(project = %public_id, "hierarchy projection invalidated");
    }

    /// Drop every cached projection.
    pub async fn invalidate_all(&self) {
        self.projects.write().await.clear();
    }

    /// Peek at the cache without fetching.
    pub async fn cached(&self, public_id: &PublicId) -> Option<Arc<Project>> {
        self.projects.read().await.get(public_id).map(Arc::clone)
    }
}
