//! Console core wiring
//!
//! Builds the session store, route guard, dispatcher, query cache and
//! mutation coordinator, and owns the flows that span several of them
//! (login, logout, registration, opening a view).

use std::sync::Arc;

use platform_models::{RegisterRequest, User};
use tracing::{info, warn};

use crate::app::options::ConsoleOptions;
use crate::app::views::View;
use crate::cache::query::{Fetcher, QueryCache};
use crate::errors::ConsoleError;
use crate::guard::route::{Navigation, Route, RouteGuard};
use crate::http::client::Dispatcher;
use crate::mutation::coordinator::MutationCoordinator;
use crate::notify::{Notification, Notifier};
use crate::session::backend::{FileSessionBackend, SessionBackend};
use crate::session::store::{Session, SessionStore};

const LOGIN_SUCCEEDED: &str = "Login successful!";
const LOGIN_FAILED: &str = "Invalid credentials";

/// The assembled console core
pub struct Console {
    session: Arc<SessionStore>,
    guard: Arc<RouteGuard>,
    dispatcher: Arc<Dispatcher>,
    cache: QueryCache,
    coordinator: MutationCoordinator,
    notifier: Arc<dyn Notifier>,
}

impl Console {
    /// Open the console with the session persisted under the storage layout
    pub async fn open(options: &ConsoleOptions, notifier: Arc<dyn Notifier>) -> Result<Self, ConsoleError> {
        options.layout.setup().await?;
        let backend = Arc::new(FileSessionBackend::new(options.layout.session_file()));
        Self::init(options, backend, notifier).await
    }

    /// Build the core over `backend`.
    ///
    /// The session is hydrated before anything can issue an authenticated
    /// request.
    pub async fn init(
        options: &ConsoleOptions,
        backend: Arc<dyn SessionBackend>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ConsoleError> {
        let session = Arc::new(SessionStore::new(backend));
        if let Some(restored) = session.hydrate().await? {
            if restored.credential.is_expired() {
                warn!(
                    "Restored credential for {} has expired; the next request will end the session",
                    restored.user.username
                );
            }
        }

        let guard = Arc::new(RouteGuard::new(session.clone()));
        let dispatcher = Arc::new(Dispatcher::new(
            &options.backend_base_url,
            session.clone(),
            guard.clone(),
            options.request_timeout,
        )?);
        let fetcher: Arc<dyn Fetcher> = dispatcher.clone();
        let cache = QueryCache::new(fetcher, options.cache_idle_capacity);
        let coordinator = MutationCoordinator::new(dispatcher.clone(), cache.clone(), notifier.clone());

        info!("Console ready against {}", dispatcher.base_url());
        Ok(Self {
            session,
            guard,
            dispatcher,
            cache,
            coordinator,
            notifier,
        })
    }

    /// Sign in.
    ///
    /// The identity is fetched with the new token before the session is
    /// established, so the session never holds a token without its user.
    pub async fn login(&self, username: &str, password: &str) -> Result<Arc<Session>, ConsoleError> {
        match self.establish(username, password).await {
            Ok(session) => {
                self.guard.navigate(&Route::Dashboard.path());
                self.notifier.notify(Notification::success(LOGIN_SUCCEEDED)).await;
                Ok(session)
            }
            Err(e) => {
                warn!("Login for {} failed: {}", username, e);
                self.notifier.notify(Notification::error(LOGIN_FAILED)).await;
                Err(e)
            }
        }
    }

    async fn establish(&self, username: &str, password: &str) -> Result<Arc<Session>, ConsoleError> {
        let token = self.dispatcher.login(username, password).await?;
        let user = self
            .dispatcher
            .fetch_current_user_with(&token.access_token)
            .await?;

        // Nothing cached for a previous identity may leak into this one
        self.cache.clear();
        self.session.set_credential(token.access_token, user).await
    }

    /// Create an account and send the user to the login page
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, ConsoleError> {
        let user = self.coordinator.register(request).await?;
        self.guard.navigate(&Route::Login.path());
        Ok(user)
    }

    /// Sign out; returns whether a session was present
    pub async fn logout(&self) -> Result<bool, ConsoleError> {
        let cleared = self.session.clear().await?;
        self.cache.clear();
        self.guard.navigate(&Route::Login.path());
        Ok(cleared)
    }

    /// The signed-in user, if any
    pub fn whoami(&self) -> Option<Arc<Session>> {
        self.session.current()
    }

    pub fn navigate(&self, path: &str) -> Navigation {
        self.guard.navigate(path)
    }

    /// Navigate to `path` and subscribe to what the destination renders
    pub fn open_view(&self, path: &str) -> (Navigation, View) {
        let navigation = self.guard.navigate(path);
        let view = View::open(&self.cache, navigation.destination().clone());
        (navigation, view)
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn guard(&self) -> &Arc<RouteGuard> {
        &self.guard
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn mutations(&self) -> &MutationCoordinator {
        &self.coordinator
    }
}
