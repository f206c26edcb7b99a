//! Cache key to endpoint mapping

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cache::key::{CacheKey, Collection};
use crate::cache::query::Fetcher;
use crate::errors::ConsoleError;
use crate::http::client::Dispatcher;

/// Endpoint path and query string serving `key`
pub fn endpoint_for(key: &CacheKey) -> Result<(String, Vec<(String, String)>), ConsoleError> {
    let id = |name: &str| {
        key.param_i64(name).ok_or_else(|| {
            ConsoleError::Internal(format!("Cache key {} is missing `{}`", key, name))
        })
    };
    let filters = || {
        key.params()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<Vec<_>>()
    };

    let endpoint = match key.collection() {
        Collection::CurrentUser => ("/users/me".to_string(), vec![]),
        Collection::Organizations => ("/organizations".to_string(), filters()),
        Collection::Organization => (format!("/organizations/{}", id("id")?), vec![]),
        Collection::Members => (
            format!("/organizations/{}/members", id("organization_id")?),
            vec![],
        ),
        Collection::Projects => ("/projects".to_string(), filters()),
        Collection::Project => (format!("/projects/{}", id("id")?), vec![]),
        Collection::Pipelines => ("/pipelines".to_string(), filters()),
        Collection::Pipeline => (format!("/pipelines/{}", id("id")?), vec![]),
        Collection::PipelineRuns => (
            format!("/pipelines/{}/runs", id("pipeline_id")?),
            vec![],
        ),
        Collection::PipelineRun => (format!("/pipelines/runs/{}", id("id")?), vec![]),
        Collection::Deployments => ("/deployments".to_string(), filters()),
        Collection::Deployment => (format!("/deployments/{}", id("id")?), vec![]),
        Collection::Servers => ("/infrastructure/servers".to_string(), filters()),
        Collection::Server => (format!("/infrastructure/servers/{}", id("id")?), vec![]),
        Collection::Clusters => ("/infrastructure/clusters".to_string(), filters()),
        Collection::Cluster => (format!("/infrastructure/clusters/{}", id("id")?), vec![]),
        Collection::Metrics => ("/monitoring/metrics".to_string(), filters()),
        Collection::Alerts => ("/monitoring/alerts".to_string(), filters()),
        Collection::Alert => (format!("/monitoring/alerts/{}", id("id")?), vec![]),
    };
    Ok(endpoint)
}

impl Dispatcher {
    /// Fetch the data behind a cache key, bypassing the cache
    pub async fn get_key<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<T, ConsoleError> {
        let (path, query) = endpoint_for(key)?;
        self.get(&path, &query).await
    }
}

#[async_trait]
impl Fetcher for Dispatcher {
    async fn fetch(&self, key: &CacheKey) -> Result<Value, ConsoleError> {
        let (path, query) = endpoint_for(key)?;
        self.get_value(&path, &query).await
    }
}
