//! Deployment API client

use platform_models::{Deployment, DeploymentCreate, DeploymentUpdate, Environment};

use crate::cache::key::CacheKey;
use crate::errors::ConsoleError;
use crate::http::client::Dispatcher;

impl Dispatcher {
    pub async fn list_deployments(
        &self,
        project_id: Option<i64>,
        environment: Option<Environment>,
    ) -> Result<Vec<Deployment>, ConsoleError> {
        self.get_key(&CacheKey::deployments(project_id, environment))
            .await
    }

    pub async fn get_deployment(&self, id: i64) -> Result<Deployment, ConsoleError> {
        self.get_key(&CacheKey::deployment(id)).await
    }

    pub async fn create_deployment(&self, payload: &DeploymentCreate) -> Result<Deployment, ConsoleError> {
        self.post("/deployments", payload).await
    }

    pub async fn update_deployment(
        &self,
        id: i64,
        payload: &DeploymentUpdate,
    ) -> Result<Deployment, ConsoleError> {
        self.put(&format!("/deployments/{}", id), payload).await
    }

    /// Roll back to a deployment; the platform answers with the new
    /// deployment that references it
    pub async fn rollback_deployment(&self, id: i64) -> Result<Deployment, ConsoleError> {
        self.post_empty(&format!("/deployments/{}/rollback", id)).await
    }
}
