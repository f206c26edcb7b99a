//! Cache keys and invalidation patterns

use std::collections::BTreeMap;
use std::fmt;

use platform_models::{AlertSeverity, AlertStatus, Environment, MetricType};
use serde::Serialize;

/// Entity collection a cache entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    CurrentUser,
    Organizations,
    Organization,
    Members,
    Projects,
    Project,
    Pipelines,
    Pipeline,
    PipelineRuns,
    PipelineRun,
    Deployments,
    Deployment,
    Servers,
    Server,
    Clusters,
    Cluster,
    Metrics,
    Alerts,
    Alert,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::CurrentUser => "current_user",
            Collection::Organizations => "organizations",
            Collection::Organization => "organization",
            Collection::Members => "members",
            Collection::Projects => "projects",
            Collection::Project => "project",
            Collection::Pipelines => "pipelines",
            Collection::Pipeline => "pipeline",
            Collection::PipelineRuns => "pipeline_runs",
            Collection::PipelineRun => "pipeline_run",
            Collection::Deployments => "deployments",
            Collection::Deployment => "deployment",
            Collection::Servers => "servers",
            Collection::Server => "server",
            Collection::Clusters => "clusters",
            Collection::Cluster => "cluster",
            Collection::Metrics => "metrics",
            Collection::Alerts => "alerts",
            Collection::Alert => "alert",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one cache entry: a collection plus normalized filters.
///
/// Filters are kept sorted and absent or empty values are dropped, so two
/// views asking for the same data always build equal keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    collection: Collection,
    params: BTreeMap<String, String>,
}

impl CacheKey {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            params: BTreeMap::new(),
        }
    }

    /// Add a filter; empty values are ignored
    pub fn with(mut self, name: &str, value: impl ToString) -> Self {
        let value = value.to_string();
        if !value.is_empty() {
            self.params.insert(name.to_string(), value);
        }
        self
    }

    /// Add a filter when present
    pub fn with_opt<V: ToString>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with(name, value),
            None => self,
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Integer value of a filter
    pub fn param_i64(&self, name: &str) -> Option<i64> {
        self.param(name).and_then(|v| v.parse().ok())
    }

    // Constructors for the keys views declare

    pub fn current_user() -> Self {
        Self::new(Collection::CurrentUser)
    }

    pub fn organizations() -> Self {
        Self::new(Collection::Organizations)
    }

    pub fn organization(id: i64) -> Self {
        Self::new(Collection::Organization).with("id", id)
    }

    pub fn members(organization_id: i64) -> Self {
        Self::new(Collection::Members).with("organization_id", organization_id)
    }

    pub fn projects(organization_id: Option<i64>) -> Self {
        Self::new(Collection::Projects).with_opt("organization_id", organization_id)
    }

    pub fn project(id: i64) -> Self {
        Self::new(Collection::Project).with("id", id)
    }

    pub fn pipelines(project_id: Option<i64>) -> Self {
        Self::new(Collection::Pipelines).with_opt("project_id", project_id)
    }

    pub fn pipeline(id: i64) -> Self {
        Self::new(Collection::Pipeline).with("id", id)
    }

    pub fn pipeline_runs(pipeline_id: i64) -> Self {
        Self::new(Collection::PipelineRuns).with("pipeline_id", pipeline_id)
    }

    pub fn pipeline_run(id: i64) -> Self {
        Self::new(Collection::PipelineRun).with("id", id)
    }

    pub fn deployments(project_id: Option<i64>, environment: Option<Environment>) -> Self {
        Self::new(Collection::Deployments)
            .with_opt("project_id", project_id)
            .with_opt("environment", environment)
    }

    pub fn deployment(id: i64) -> Self {
        Self::new(Collection::Deployment).with("id", id)
    }

    pub fn servers(organization_id: Option<i64>) -> Self {
        Self::new(Collection::Servers).with_opt("organization_id", organization_id)
    }

    pub fn server(id: i64) -> Self {
        Self::new(Collection::Server).with("id", id)
    }

    pub fn clusters(organization_id: Option<i64>) -> Self {
        Self::new(Collection::Clusters).with_opt("organization_id", organization_id)
    }

    pub fn cluster(id: i64) -> Self {
        Self::new(Collection::Cluster).with("id", id)
    }

    pub fn metrics(server_id: Option<i64>, metric_type: Option<MetricType>) -> Self {
        Self::new(Collection::Metrics)
            .with_opt("server_id", server_id)
            .with_opt("metric_type", metric_type.map(wire_name))
    }

    pub fn alerts(
        organization_id: Option<i64>,
        status: Option<AlertStatus>,
        severity: Option<AlertSeverity>,
    ) -> Self {
        Self::new(Collection::Alerts)
            .with_opt("organization_id", organization_id)
            .with_opt("status", status.map(wire_name))
            .with_opt("severity", severity.map(wire_name))
    }

    pub fn alert(id: i64) -> Self {
        Self::new(Collection::Alert).with("id", id)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection.as_str())?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, name, value)?;
        }
        Ok(())
    }
}

/// The string an enum serializes to on the wire
fn wire_name<T: Serialize>(value: T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}

/// Selects the cache entries a mutation may have made stale
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPattern {
    /// One specific entry
    Exact(CacheKey),

    /// Every entry of a collection, whatever its filters
    Collection(Collection),

    /// Entries whose result could contain a record with `param == value`:
    /// those filtered on that value and those not filtered on `param` at all
    Covering {
        collection: Collection,
        param: &'static str,
        value: String,
    },
}

impl KeyPattern {
    pub fn covering(collection: Collection, param: &'static str, value: impl ToString) -> Self {
        KeyPattern::Covering {
            collection,
            param,
            value: value.to_string(),
        }
    }

    pub fn matches(&self, key: &CacheKey) -> bool {
        match self {
            KeyPattern::Exact(exact) => exact == key,
            KeyPattern::Collection(collection) => key.collection == *collection,
            KeyPattern::Covering {
                collection,
                param,
                value,
            } => {
                key.collection == *collection
                    && key.param(param).map(|v| v == value).unwrap_or(true)
            }
        }
    }
}

impl From<CacheKey> for KeyPattern {
    fn from(key: CacheKey) -> Self {
        KeyPattern::Exact(key)
    }
}

impl From<Collection> for KeyPattern {
    fn from(collection: Collection) -> Self {
        KeyPattern::Collection(collection)
    }
}
