//! Mutation coordinator
//!
//! Every create, update, delete or action goes through here: the request is
//! dispatched, the cache keys the change may have affected are invalidated,
//! and the user is told how it went. Cached data is never written directly.

use std::future::Future;
use std::sync::Arc;

use platform_models::{
    Alert, AlertCreate, AlertUpdate, Cluster, ClusterCreate, Deployment, DeploymentCreate,
    DeploymentUpdate, Metric, MetricCreate, Organization, OrganizationCreate, OrganizationMember,
    OrganizationMemberCreate, OrganizationUpdate, Pipeline, PipelineCreate, PipelineRun,
    PipelineRunCreate, PipelineUpdate, Project, ProjectCreate, ProjectUpdate, RegisterRequest,
    Server, ServerCreate, ServerUpdate, User,
};
use tracing::{debug, info, warn};

use crate::cache::key::{CacheKey, Collection, KeyPattern};
use crate::cache::query::QueryCache;
use crate::errors::ConsoleError;
use crate::http::client::Dispatcher;
use crate::mutation::form::FormState;
use crate::notify::{Notification, Notifier};

/// Feedback for one named mutation
#[derive(Debug, Clone, Copy)]
struct Action {
    name: &'static str,
    success: &'static str,
    failure: &'static str,
}

impl Action {
    const fn new(name: &'static str, success: &'static str, failure: &'static str) -> Self {
        Self {
            name,
            success,
            failure,
        }
    }
}

const REGISTER: Action = Action::new("register", "Account created! Please sign in.", "Registration failed");
const CREATE_ORGANIZATION: Action = Action::new(
    "create_organization",
    "Organization created successfully",
    "Failed to create organization",
);
const UPDATE_ORGANIZATION: Action = Action::new(
    "update_organization",
    "Organization updated successfully",
    "Failed to update organization",
);
const ADD_MEMBER: Action = Action::new("add_member", "Member added successfully", "Failed to add member");
const CREATE_PROJECT: Action = Action::new(
    "create_project",
    "Project created successfully",
    "Failed to create project",
);
const UPDATE_PROJECT: Action = Action::new(
    "update_project",
    "Project updated successfully",
    "Failed to update project",
);
const DELETE_PROJECT: Action = Action::new("delete_project", "Project deleted", "Failed to delete project");
const CREATE_PIPELINE: Action = Action::new(
    "create_pipeline",
    "Pipeline created successfully",
    "Failed to create pipeline",
);
const UPDATE_PIPELINE: Action = Action::new(
    "update_pipeline",
    "Pipeline updated successfully",
    "Failed to update pipeline",
);
const RUN_PIPELINE: Action = Action::new("run_pipeline", "Pipeline run started", "Failed to start pipeline run");
const CREATE_DEPLOYMENT: Action = Action::new(
    "create_deployment",
    "Deployment created successfully",
    "Failed to create deployment",
);
const UPDATE_DEPLOYMENT: Action = Action::new(
    "update_deployment",
    "Deployment updated successfully",
    "Failed to update deployment",
);
const ROLLBACK_DEPLOYMENT: Action =
    Action::new("rollback_deployment", "Rollback initiated", "Failed to rollback deployment");
const CREATE_SERVER: Action = Action::new("create_server", "Server added successfully", "Failed to add server");
const UPDATE_SERVER: Action = Action::new(
    "update_server",
    "Server updated successfully",
    "Failed to update server",
);
const CREATE_CLUSTER: Action = Action::new("create_cluster", "Cluster added successfully", "Failed to add cluster");
const CREATE_METRIC: Action = Action::new("create_metric", "Metric recorded", "Failed to record metric");
const CREATE_ALERT: Action = Action::new("create_alert", "Alert created", "Failed to create alert");
const UPDATE_ALERT: Action = Action::new("update_alert", "Alert updated", "Failed to update alert");
const ACKNOWLEDGE_ALERT: Action =
    Action::new("acknowledge_alert", "Alert acknowledged", "Failed to acknowledge alert");
const RESOLVE_ALERT: Action = Action::new("resolve_alert", "Alert resolved", "Failed to resolve alert");

/// Runs mutations and keeps the cache honest afterwards
pub struct MutationCoordinator {
    dispatcher: Arc<Dispatcher>,
    cache: QueryCache,
    notifier: Arc<dyn Notifier>,
}

impl MutationCoordinator {
    pub fn new(dispatcher: Arc<Dispatcher>, cache: QueryCache, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            dispatcher,
            cache,
            notifier,
        }
    }

    /// Submit a dialog form through `op`.
    ///
    /// A second submission while one is in flight is refused. On success a
    /// creation form resets to its defaults and closes while an edit form keeps
    /// its fields; on failure either stays open with the platform's message.
    pub async fn submit<P, T, F, Fut>(&self, form: &mut FormState<P>, op: F) -> Result<T, ConsoleError>
    where
        P: Default + Clone,
        F: FnOnce(P) -> Fut,
        Fut: Future<Output = Result<T, ConsoleError>>,
    {
        let payload = form.begin_submit()?;
        match op(payload).await {
            Ok(value) => {
                form.succeed()?;
                Ok(value)
            }
            Err(e) => {
                form.fail(e.user_message())?;
                Err(e)
            }
        }
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<User, ConsoleError> {
        self.run(REGISTER, self.dispatcher.register(request), |_| vec![])
            .await
    }

    pub async fn create_organization(&self, payload: &OrganizationCreate) -> Result<Organization, ConsoleError> {
        self.run(
            CREATE_ORGANIZATION,
            self.dispatcher.create_organization(payload),
            |_| vec![Collection::Organizations.into()],
        )
        .await
    }

    pub async fn update_organization(
        &self,
        id: i64,
        payload: &OrganizationUpdate,
    ) -> Result<Organization, ConsoleError> {
        self.run(
            UPDATE_ORGANIZATION,
            self.dispatcher.update_organization(id, payload),
            |_| {
                vec![
                    Collection::Organizations.into(),
                    CacheKey::organization(id).into(),
                ]
            },
        )
        .await
    }

    pub async fn add_member(
        &self,
        organization_id: i64,
        payload: &OrganizationMemberCreate,
    ) -> Result<OrganizationMember, ConsoleError> {
        self.run(
            ADD_MEMBER,
            self.dispatcher.add_member(organization_id, payload),
            |_| vec![CacheKey::members(organization_id).into()],
        )
        .await
    }

    pub async fn create_project(&self, payload: &ProjectCreate) -> Result<Project, ConsoleError> {
        self.run(
            CREATE_PROJECT,
            self.dispatcher.create_project(payload),
            |project| {
                vec![KeyPattern::covering(
                    Collection::Projects,
                    "organization_id",
                    project.organization_id,
                )]
            },
        )
        .await
    }

    pub async fn update_project(&self, id: i64, payload: &ProjectUpdate) -> Result<Project, ConsoleError> {
        self.run(
            UPDATE_PROJECT,
            self.dispatcher.update_project(id, payload),
            |_| vec![Collection::Projects.into(), CacheKey::project(id).into()],
        )
        .await
    }

    /// Delete a project; its pipelines and deployments go with it
    pub async fn delete_project(&self, id: i64) -> Result<(), ConsoleError> {
        self.run(DELETE_PROJECT, self.dispatcher.delete_project(id), |_| {
            vec![
                Collection::Projects.into(),
                CacheKey::project(id).into(),
                KeyPattern::covering(Collection::Pipelines, "project_id", id),
                KeyPattern::covering(Collection::Deployments, "project_id", id),
            ]
        })
        .await
    }

    pub async fn create_pipeline(&self, payload: &PipelineCreate) -> Result<Pipeline, ConsoleError> {
        self.run(
            CREATE_PIPELINE,
            self.dispatcher.create_pipeline(payload),
            |pipeline| {
                vec![
                    KeyPattern::covering(Collection::Pipelines, "project_id", pipeline.project_id),
                    CacheKey::project(pipeline.project_id).into(),
                ]
            },
        )
        .await
    }

    pub async fn update_pipeline(&self, id: i64, payload: &PipelineUpdate) -> Result<Pipeline, ConsoleError> {
        self.run(
            UPDATE_PIPELINE,
            self.dispatcher.update_pipeline(id, payload),
            |_| vec![Collection::Pipelines.into(), CacheKey::pipeline(id).into()],
        )
        .await
    }

    /// Start a manual run of a pipeline
    pub async fn run_pipeline(&self, pipeline_id: i64, branch: Option<String>) -> Result<PipelineRun, ConsoleError> {
        let payload = PipelineRunCreate {
            branch,
            ..PipelineRunCreate::manual(pipeline_id)
        };
        self.run(
            RUN_PIPELINE,
            self.dispatcher.create_pipeline_run(&payload),
            |_| {
                vec![
                    CacheKey::pipeline_runs(pipeline_id).into(),
                    CacheKey::pipeline(pipeline_id).into(),
                ]
            },
        )
        .await
    }

    /// Create a deployment.
    ///
    /// Invalidates every deployments list that could show it (those filtered
    /// on its project and those not filtered on a project) and the project's
    /// detail.
    pub async fn create_deployment(&self, payload: &DeploymentCreate) -> Result<Deployment, ConsoleError> {
        let project_id = payload.project_id;
        self.run(
            CREATE_DEPLOYMENT,
            self.dispatcher.create_deployment(payload),
            |_| {
                vec![
                    KeyPattern::covering(Collection::Deployments, "project_id", project_id),
                    CacheKey::project(project_id).into(),
                ]
            },
        )
        .await
    }

    pub async fn update_deployment(
        &self,
        id: i64,
        payload: &DeploymentUpdate,
    ) -> Result<Deployment, ConsoleError> {
        self.run(
            UPDATE_DEPLOYMENT,
            self.dispatcher.update_deployment(id, payload),
            |_| vec![Collection::Deployments.into(), CacheKey::deployment(id).into()],
        )
        .await
    }

    /// Roll back to deployment `id`
    pub async fn rollback_deployment(&self, id: i64) -> Result<Deployment, ConsoleError> {
        self.run(
            ROLLBACK_DEPLOYMENT,
            self.dispatcher.rollback_deployment(id),
            |deployment| {
                vec![
                    KeyPattern::covering(Collection::Deployments, "project_id", deployment.project_id),
                    CacheKey::deployment(id).into(),
                    CacheKey::project(deployment.project_id).into(),
                ]
            },
        )
        .await
    }

    pub async fn create_server(&self, payload: &ServerCreate) -> Result<Server, ConsoleError> {
        let organization_id = payload.organization_id;
        self.run(CREATE_SERVER, self.dispatcher.create_server(payload), |_| {
            vec![KeyPattern::covering(
                Collection::Servers,
                "organization_id",
                organization_id,
            )]
        })
        .await
    }

    pub async fn update_server(&self, id: i64, payload: &ServerUpdate) -> Result<Server, ConsoleError> {
        self.run(
            UPDATE_SERVER,
            self.dispatcher.update_server(id, payload),
            |_| vec![Collection::Servers.into(), CacheKey::server(id).into()],
        )
        .await
    }

    pub async fn create_cluster(&self, payload: &ClusterCreate) -> Result<Cluster, ConsoleError> {
        let organization_id = payload.organization_id;
        self.run(CREATE_CLUSTER, self.dispatcher.create_cluster(payload), |_| {
            vec![KeyPattern::covering(
                Collection::Clusters,
                "organization_id",
                organization_id,
            )]
        })
        .await
    }

    pub async fn create_metric(&self, payload: &MetricCreate) -> Result<Metric, ConsoleError> {
        let invalidates = match payload.server_id {
            Some(server_id) => KeyPattern::covering(Collection::Metrics, "server_id", server_id),
            None => Collection::Metrics.into(),
        };
        self.run(CREATE_METRIC, self.dispatcher.create_metric(payload), |_| {
            vec![invalidates]
        })
        .await
    }

    pub async fn create_alert(&self, payload: &AlertCreate) -> Result<Alert, ConsoleError> {
        self.run(CREATE_ALERT, self.dispatcher.create_alert(payload), |_| {
            vec![Collection::Alerts.into()]
        })
        .await
    }

    pub async fn update_alert(&self, id: i64, payload: &AlertUpdate) -> Result<Alert, ConsoleError> {
        self.run(
            UPDATE_ALERT,
            self.dispatcher.update_alert(id, payload),
            |_| alert_keys(id),
        )
        .await
    }

    pub async fn acknowledge_alert(&self, id: i64) -> Result<Alert, ConsoleError> {
        self.run(
            ACKNOWLEDGE_ALERT,
            self.dispatcher.acknowledge_alert(id),
            |_| alert_keys(id),
        )
        .await
    }

    pub async fn resolve_alert(&self, id: i64) -> Result<Alert, ConsoleError> {
        self.run(
            RESOLVE_ALERT,
            self.dispatcher.update_alert(id, &AlertUpdate::resolved()),
            |_| alert_keys(id),
        )
        .await
    }

    async fn run<T, Fut>(
        &self,
        action: Action,
        call: Fut,
        invalidates: impl FnOnce(&T) -> Vec<KeyPattern>,
    ) -> Result<T, ConsoleError>
    where
        Fut: Future<Output = Result<T, ConsoleError>>,
    {
        debug!("Running mutation {}", action.name);

        match call.await {
            Ok(value) => {
                let patterns = invalidates(&value);
                let marked: usize = patterns
                    .iter()
                    .map(|pattern| self.cache.invalidate(pattern))
                    .sum();
                info!(
                    "Mutation {} succeeded, {} cache entries invalidated",
                    action.name, marked
                );
                self.notifier
                    .notify(Notification::success(action.success))
                    .await;
                Ok(value)
            }
            Err(e) => {
                warn!("Mutation {} failed: {}", action.name, e);
                let message = e.detail().unwrap_or(action.failure).to_string();
                self.notifier.notify(Notification::error(message)).await;
                Err(e)
            }
        }
    }
}

fn alert_keys(id: i64) -> Vec<KeyPattern> {
    vec![Collection::Alerts.into(), CacheKey::alert(id).into()]
}
