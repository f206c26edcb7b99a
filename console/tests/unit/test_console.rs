//! End-to-end tests of the console core against the mock platform

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use opsconsole::app::console::Console;
use opsconsole::app::options::ConsoleOptions;
use opsconsole::cache::key::CacheKey;
use opsconsole::errors::ConsoleError;
use opsconsole::guard::route::{AuthState, Navigation, Route, RouteGuard};
use opsconsole::http::client::Dispatcher;
use opsconsole::mutation::form::FormState;
use opsconsole::notify::RecordingNotifier;
use opsconsole::session::backend::{MemorySessionBackend, PersistedSession, SessionBackend};
use opsconsole::session::store::SessionStore;
use opsconsole::storage::layout::StorageLayout;
use platform_models::{
    AlertStatus, Deployment, DeploymentCreate, DeploymentStatus, DeploymentUpdate, Environment,
    ProjectCreate, RegisterRequest,
};

use crate::mock_platform::{self, MockPlatform, TOKEN};

/// Memory backend that counts how often the session is removed
#[derive(Default)]
struct CountingBackend {
    inner: MemorySessionBackend,
    removals: AtomicUsize,
}

impl CountingBackend {
    fn removals(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionBackend for CountingBackend {
    async fn load(&self) -> Result<Option<PersistedSession>, ConsoleError> {
        self.inner.load().await
    }

    async fn save(&self, session: &PersistedSession) -> Result<(), ConsoleError> {
        self.inner.save(session).await
    }

    async fn remove(&self) -> Result<(), ConsoleError> {
        self.removals.fetch_add(1, Ordering::SeqCst);
        self.inner.remove().await
    }
}

struct Harness {
    platform: MockPlatform,
    console: Console,
    notifier: Arc<RecordingNotifier>,
    backend: Arc<CountingBackend>,
}

fn options_for(platform: &MockPlatform, layout: StorageLayout) -> ConsoleOptions {
    ConsoleOptions {
        backend_base_url: platform.base_url.clone(),
        request_timeout: Some(Duration::from_secs(5)),
        cache_idle_capacity: 64,
        layout,
    }
}

fn temp_layout() -> StorageLayout {
    StorageLayout::new(std::env::temp_dir().join(format!("opsconsole-test-{}", uuid::Uuid::new_v4())))
}

async fn harness() -> Harness {
    let platform = mock_platform::start().await;
    let notifier = Arc::new(RecordingNotifier::new());
    let backend = Arc::new(CountingBackend::default());
    let console = Console::init(
        &options_for(&platform, temp_layout()),
        backend.clone(),
        notifier.clone(),
    )
    .await
    .unwrap();

    Harness {
        platform,
        console,
        notifier,
        backend,
    }
}

async fn signed_in() -> Harness {
    let h = harness().await;
    h.console.login("alice", "correct").await.unwrap();
    h
}

#[tokio::test]
async fn test_login_establishes_session_and_authenticates_requests() {
    let h = harness().await;
    assert_eq!(h.console.guard().state(), AuthState::Unauthenticated);

    let session = h.console.login("alice", "correct").await.unwrap();
    assert_eq!(session.user.username, "alice");
    assert_eq!(session.credential.expose(), TOKEN);
    assert_eq!(h.console.guard().state(), AuthState::Authenticated);
    assert_eq!(h.console.guard().location(), Route::Dashboard);
    assert_eq!(h.notifier.last().unwrap().message, "Login successful!");

    // Identity fetched with the new token before the session existed
    assert_eq!(
        h.platform.state.last_auth_header("GET /users/me").as_deref(),
        Some("Bearer tok-alice")
    );

    let projects = h.console.dispatcher().list_projects(None).await.unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(
        h.platform.state.last_auth_header("GET /projects").as_deref(),
        Some("Bearer tok-alice")
    );
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let h = harness().await;

    let err = h.console.login("alice", "wrong").await.unwrap_err();
    assert!(matches!(err, ConsoleError::Validation { status: 401, .. }));
    assert!(h.console.whoami().is_none());
    assert_eq!(h.backend.removals(), 0);

    let notification = h.notifier.last().unwrap();
    assert!(!notification.is_success());
    assert_eq!(notification.message, "Invalid credentials");
}

#[tokio::test]
async fn test_deployment_creation_invalidates_and_resets_form() {
    let h = signed_in().await;
    let cache = h.console.cache();

    let (_, project_view) = h.console.open_view("/projects/7");
    let (_, deployments_view) = h.console.open_view("/deployments");
    project_view.load().await;
    deployments_view.load().await;

    let other_project = CacheKey::deployments(Some(8), None);
    cache.load(&other_project).await.unwrap();
    let list_hits = h.platform.state.hits("GET /deployments");

    let mut form: FormState<DeploymentCreate> = FormState::new("Deploy", "Deploying...");
    form.open();
    form.edit(|p| {
        p.project_id = 7;
        p.environment = Environment::Production;
        p.version = "v2.1.0".to_string();
    })
    .unwrap();

    let mutations = h.console.mutations();
    let created = mutations
        .submit(&mut form, |payload| async move { mutations.create_deployment(&payload).await })
        .await
        .unwrap();
    assert_eq!(created.version, "v2.1.0");

    // Form back to defaults and closed
    assert!(!form.is_open());
    assert_eq!(form.payload(), &DeploymentCreate::default());
    assert_eq!(form.submit_label(), "Deploy");

    let notification = h.notifier.last().unwrap();
    assert!(notification.is_success());
    assert_eq!(notification.message, "Deployment created successfully");

    // Both observed lists refetched and show the new deployment
    let project_deployments: Vec<Deployment> = cache
        .load(&CacheKey::deployments(Some(7), None))
        .await
        .map(|v| serde_json::from_value((*v).clone()).unwrap())
        .unwrap();
    assert!(project_deployments.iter().any(|d| d.version == "v2.1.0"));

    let all_deployments: Vec<Deployment> = cache
        .load(&CacheKey::deployments(None, None))
        .await
        .map(|v| serde_json::from_value((*v).clone()).unwrap())
        .unwrap();
    assert_eq!(all_deployments.len(), 2);
    assert!(h.platform.state.hits("GET /deployments") >= list_hits + 2);

    // The project detail was invalidated, other projects' lists were not
    assert!(cache.peek(&CacheKey::project(7)).is_some());
    assert!(!cache.peek(&other_project).unwrap().stale);
}

#[tokio::test]
async fn test_edit_form_keeps_fields_after_update() {
    let h = signed_in().await;

    let current = DeploymentUpdate {
        status: Some(DeploymentStatus::Success),
        notes: Some("verified".to_string()),
    };
    let mut form = FormState::for_update("Save", "Saving...", current.clone());
    form.open();
    form.edit(|p| p.status = Some(DeploymentStatus::RolledBack)).unwrap();

    let mutations = h.console.mutations();
    let updated = mutations
        .submit(&mut form, |payload| async move { mutations.update_deployment(1, &payload).await })
        .await
        .unwrap();
    assert_eq!(updated.status, DeploymentStatus::RolledBack);

    assert!(form.is_open());
    assert_eq!(form.payload().status, Some(DeploymentStatus::RolledBack));
    assert_eq!(form.payload().notes.as_deref(), Some("verified"));
    assert_eq!(h.notifier.last().unwrap().message, "Deployment updated successfully");
}

#[tokio::test]
async fn test_failed_mutation_keeps_form_and_cache() {
    let h = signed_in().await;
    let cache = h.console.cache();

    let _projects = cache.subscribe(CacheKey::projects(None));
    cache.load(&CacheKey::projects(None)).await.unwrap();
    let list_hits = h.platform.state.hits("GET /projects");

    let mut form: FormState<ProjectCreate> = FormState::new("Create", "Creating...");
    form.open();
    form.edit(|p| p.organization_id = 1).unwrap();

    let mutations = h.console.mutations();
    let err = mutations
        .submit(&mut form, |payload| async move { mutations.create_project(&payload).await })
        .await
        .unwrap_err();

    assert_eq!(err.detail(), Some("name is required"));
    assert!(form.is_open());
    assert_eq!(form.error(), Some("name is required"));
    assert_eq!(form.payload().organization_id, 1);

    let notification = h.notifier.last().unwrap();
    assert!(!notification.is_success());
    assert_eq!(notification.message, "name is required");

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!cache.peek(&CacheKey::projects(None)).unwrap().stale);
    assert_eq!(h.platform.state.hits("GET /projects"), list_hits);
}

#[tokio::test]
async fn test_unauthorized_mid_session_tears_down_once() {
    let h = signed_in().await;
    let (_, dashboard) = h.console.open_view("/");
    dashboard.load().await;

    h.platform.state.revoke(Duration::from_millis(50));
    h.console.cache().invalidate(&opsconsole::cache::key::KeyPattern::from(
        opsconsole::cache::key::Collection::Projects,
    ));

    // Several requests of the same session rejected concurrently
    let dispatcher = h.console.dispatcher();
    let (projects, alerts, deployments) = tokio::join!(
        dispatcher.list_projects(None),
        dispatcher.list_alerts(None, None, None),
        dispatcher.list_deployments(None, None),
    );
    assert!(projects.unwrap_err().is_authorization());
    assert!(alerts.unwrap_err().is_authorization());
    assert!(deployments.unwrap_err().is_authorization());

    assert_eq!(h.backend.removals(), 1);
    assert!(h.console.whoami().is_none());
    assert_eq!(h.console.guard().state(), AuthState::Unauthenticated);
    assert_eq!(h.console.guard().location(), Route::Login);

    let navigation = h.console.navigate("/projects");
    assert_eq!(
        navigation,
        Navigation::Redirect {
            from: Route::Projects,
            to: Route::Login
        }
    );
}

#[tokio::test]
async fn test_acknowledge_alert_refreshes_alerts() {
    let h = signed_in().await;
    let (_, monitoring) = h.console.open_view("/monitoring");
    let alerts_key = CacheKey::alerts(None, None, None);
    h.console.cache().load(&alerts_key).await.unwrap();

    let alert = h.console.mutations().acknowledge_alert(3).await.unwrap();
    assert_eq!(alert.status, AlertStatus::Acknowledged);
    assert_eq!(h.notifier.last().unwrap().message, "Alert acknowledged");

    let alerts = h.console.cache().load(&alerts_key).await.unwrap();
    assert_eq!(alerts[0]["status"], "acknowledged");
    drop(monitoring);
}

#[tokio::test]
async fn test_register_reports_platform_detail() {
    let h = harness().await;

    let request = RegisterRequest {
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        password: "secret".to_string(),
        full_name: None,
    };
    assert!(h.console.register(&request).await.is_err());
    assert_eq!(h.notifier.last().unwrap().message, "Username already registered");

    let request = RegisterRequest {
        username: "bob".to_string(),
        email: "bob@example.com".to_string(),
        ..request
    };
    let user = h.console.register(&request).await.unwrap();
    assert_eq!(user.username, "bob");
    assert_eq!(h.notifier.last().unwrap().message, "Account created! Please sign in.");
    assert_eq!(h.console.guard().location(), Route::Login);
}

#[tokio::test]
async fn test_logout_clears_session_and_cache() {
    let h = signed_in().await;
    h.console.cache().load(&CacheKey::projects(None)).await.unwrap();

    assert!(h.console.logout().await.unwrap());
    assert!(h.console.whoami().is_none());
    assert!(h.console.cache().is_empty());
    assert_eq!(h.console.guard().location(), Route::Login);
    assert!(!h.console.logout().await.unwrap());
}

#[tokio::test]
async fn test_session_survives_restart() {
    let platform = mock_platform::start().await;
    let options = options_for(&platform, temp_layout());

    let first = Console::open(&options, Arc::new(RecordingNotifier::new()))
        .await
        .unwrap();
    first.login("alice", "correct").await.unwrap();
    drop(first);

    let second = Console::open(&options, Arc::new(RecordingNotifier::new()))
        .await
        .unwrap();
    let session = second.whoami().unwrap();
    assert_eq!(session.user.username, "alice");
    assert_eq!(second.guard().state(), AuthState::Authenticated);

    let projects = second.dispatcher().list_projects(None).await.unwrap();
    assert_eq!(projects[0].name, "web");

    second.logout().await.unwrap();
    assert!(!options.layout.session_file().exists().await);
}

#[tokio::test]
async fn test_authenticated_request_requires_hydration() {
    let platform = mock_platform::start().await;
    let session = Arc::new(SessionStore::in_memory());
    let guard = Arc::new(RouteGuard::new(session.clone()));
    let dispatcher = Dispatcher::new(&platform.base_url, session.clone(), guard, None).unwrap();

    let err = dispatcher.list_projects(None).await.unwrap_err();
    assert!(matches!(err, ConsoleError::Internal(_)));
    assert_eq!(platform.state.hits("GET /projects"), 0);

    session.hydrate().await.unwrap();
    let err = dispatcher.list_projects(None).await.unwrap_err();
    assert!(err.is_authorization());
}
