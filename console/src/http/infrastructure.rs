//! Infrastructure API client

use platform_models::{Cluster, ClusterCreate, Server, ServerCreate, ServerUpdate};

use crate::cache::key::CacheKey;
use crate::errors::ConsoleError;
use crate::http::client::Dispatcher;

impl Dispatcher {
    pub async fn list_servers(&self, organization_id: Option<i64>) -> Result<Vec<Server>, ConsoleError> {
        self.get_key(&CacheKey::servers(organization_id)).await
    }

    pub async fn get_server(&self, id: i64) -> Result<Server, ConsoleError> {
        self.get_key(&CacheKey::server(id)).await
    }

    pub async fn create_server(&self, payload: &ServerCreate) -> Result<Server, ConsoleError> {
        self.post("/infrastructure/servers", payload).await
    }

    pub async fn update_server(&self, id: i64, payload: &ServerUpdate) -> Result<Server, ConsoleError> {
        self.put(&format!("/infrastructure/servers/{}", id), payload)
            .await
    }

    pub async fn list_clusters(&self, organization_id: Option<i64>) -> Result<Vec<Cluster>, ConsoleError> {
        self.get_key(&CacheKey::clusters(organization_id)).await
    }

    pub async fn get_cluster(&self, id: i64) -> Result<Cluster, ConsoleError> {
        self.get_key(&CacheKey::cluster(id)).await
    }

    pub async fn create_cluster(&self, payload: &ClusterCreate) -> Result<Cluster, ConsoleError> {
        self.post("/infrastructure/clusters", payload).await
    }
}
