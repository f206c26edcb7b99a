//! Data each console view observes
//!
//! A view declares its cache keys up front and holds a subscription per key
//! while it is open. Closing the view releases them.

use platform_models::{AlertStatus, Environment};
use serde_json::{Map, Value};

use crate::cache::key::{CacheKey, Collection};
use crate::cache::query::{FetchResult, QueryCache, Snapshot, Subscription};
use crate::guard::route::Route;

/// Cache keys a route renders
pub fn keys_for(route: &Route) -> Vec<CacheKey> {
    match route {
        Route::Login | Route::Register | Route::NotFound(_) => vec![],
        Route::Dashboard => vec![
            CacheKey::projects(None),
            CacheKey::pipelines(None),
            CacheKey::deployments(None, None),
            CacheKey::alerts(None, Some(AlertStatus::Active), None),
        ],
        Route::Organizations => vec![CacheKey::organizations()],
        Route::Projects => vec![CacheKey::projects(None), CacheKey::organizations()],
        Route::ProjectDetail(id) => vec![
            CacheKey::project(*id),
            CacheKey::pipelines(Some(*id)),
            CacheKey::deployments(Some(*id), None),
        ],
        Route::Pipelines => vec![CacheKey::pipelines(None), CacheKey::projects(None)],
        Route::PipelineDetail(id) => vec![CacheKey::pipeline(*id), CacheKey::pipeline_runs(*id)],
        Route::Deployments => vec![CacheKey::deployments(None, None), CacheKey::projects(None)],
        Route::Infrastructure => vec![
            CacheKey::servers(None),
            CacheKey::clusters(None),
            CacheKey::organizations(),
        ],
        Route::Monitoring => vec![
            CacheKey::alerts(None, None, None),
            CacheKey::metrics(None, None),
            CacheKey::servers(None),
        ],
    }
}

/// An open view and its subscriptions
pub struct View {
    route: Route,
    subscriptions: Vec<Subscription>,
}

impl View {
    pub fn open(cache: &QueryCache, route: Route) -> Self {
        let subscriptions = keys_for(&route)
            .into_iter()
            .map(|key| cache.subscribe(key))
            .collect();
        Self {
            route,
            subscriptions,
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn keys(&self) -> Vec<CacheKey> {
        self.subscriptions.iter().map(|s| s.key().clone()).collect()
    }

    /// Current snapshot of every key
    pub fn read(&self) -> Vec<(CacheKey, Snapshot)> {
        self.subscriptions
            .iter()
            .map(|s| (s.key().clone(), s.read()))
            .collect()
    }

    /// Wait until every key has a current value or error
    pub async fn load(&self) -> Vec<(CacheKey, FetchResult)> {
        let results = futures::future::join_all(self.subscriptions.iter().map(|s| s.load())).await;
        self.keys().into_iter().zip(results).collect()
    }

    /// Narrow the deployments list to one environment (`None` shows all)
    pub fn filter_environment(&mut self, environment: Option<Environment>) {
        for subscription in &mut self.subscriptions {
            let key = subscription.key();
            if key.collection() != Collection::Deployments {
                continue;
            }
            let project_id = key.param_i64("project_id");
            subscription.rekey(CacheKey::deployments(project_id, environment));
        }
    }

    /// Load everything and lay it out as one JSON object keyed by cache key
    pub async fn render(&self) -> Value {
        let mut rendered = Map::new();
        for (key, result) in self.load().await {
            let value = match result {
                Ok(value) => Value::clone(&value),
                Err(e) => serde_json::json!({ "error": e.user_message() }),
            };
            rendered.insert(key.to_string(), value);
        }
        Value::Object(rendered)
    }
}
