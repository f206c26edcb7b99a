//! Organization API client

use platform_models::{
    Organization, OrganizationCreate, OrganizationMember, OrganizationMemberCreate,
    OrganizationUpdate,
};

use crate::cache::key::CacheKey;
use crate::errors::ConsoleError;
use crate::http::client::Dispatcher;

impl Dispatcher {
    pub async fn list_organizations(&self) -> Result<Vec<Organization>, ConsoleError> {
        self.get_key(&CacheKey::organizations()).await
    }

    pub async fn get_organization(&self, id: i64) -> Result<Organization, ConsoleError> {
        self.get_key(&CacheKey::organization(id)).await
    }

    pub async fn create_organization(
        &self,
        payload: &OrganizationCreate,
    ) -> Result<Organization, ConsoleError> {
        self.post("/organizations", payload).await
    }

    pub async fn update_organization(
        &self,
        id: i64,
        payload: &OrganizationUpdate,
    ) -> Result<Organization, ConsoleError> {
        self.put(&format!("/organizations/{}", id), payload).await
    }

    pub async fn list_members(&self, organization_id: i64) -> Result<Vec<OrganizationMember>, ConsoleError> {
        self.get_key(&CacheKey::members(organization_id)).await
    }

    pub async fn add_member(
        &self,
        organization_id: i64,
        payload: &OrganizationMemberCreate,
    ) -> Result<OrganizationMember, ConsoleError> {
        self.post(&format!("/organizations/{}/members", organization_id), payload)
            .await
    }
}
