//! Project API client

use platform_models::{Project, ProjectCreate, ProjectUpdate};

use crate::cache::key::CacheKey;
use crate::errors::ConsoleError;
use crate::http::client::Dispatcher;

impl Dispatcher {
    pub async fn list_projects(&self, organization_id: Option<i64>) -> Result<Vec<Project>, ConsoleError> {
        self.get_key(&CacheKey::projects(organization_id)).await
    }

    pub async fn get_project(&self, id: i64) -> Result<Project, ConsoleError> {
        self.get_key(&CacheKey::project(id)).await
    }

    pub async fn create_project(&self, payload: &ProjectCreate) -> Result<Project, ConsoleError> {
        self.post("/projects", payload).await
    }

    pub async fn update_project(&self, id: i64, payload: &ProjectUpdate) -> Result<Project, ConsoleError> {
        self.put(&format!("/projects/{}", id), payload).await
    }

    pub async fn delete_project(&self, id: i64) -> Result<(), ConsoleError> {
        self.delete(&format!("/projects/{}", id)).await?;
        Ok(())
    }
}
