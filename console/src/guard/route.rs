//! Route guard
//!
//! Two states, derived from the session store on every evaluation:
//! unauthenticated users may only reach the login and registration surfaces,
//! authenticated users may reach everything except those two.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::session::store::SessionStore;

/// A navigable surface of the console
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    Dashboard,
    Organizations,
    Projects,
    ProjectDetail(i64),
    Pipelines,
    PipelineDetail(i64),
    Deployments,
    Infrastructure,
    Monitoring,
    NotFound(String),
}

impl Route {
    /// Parse a path such as `/projects/7` or `/deployments?env=staging`
    pub fn parse(path: &str) -> Route {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Route::Dashboard,
            ["login"] => Route::Login,
            ["register"] => Route::Register,
            ["organizations"] => Route::Organizations,
            ["projects"] => Route::Projects,
            ["projects", id] => id
                .parse()
                .map(Route::ProjectDetail)
                .unwrap_or_else(|_| Route::NotFound(path.to_string())),
            ["pipelines"] => Route::Pipelines,
            ["pipelines", id] => id
                .parse()
                .map(Route::PipelineDetail)
                .unwrap_or_else(|_| Route::NotFound(path.to_string())),
            ["deployments"] => Route::Deployments,
            ["infrastructure"] => Route::Infrastructure,
            ["monitoring"] => Route::Monitoring,
            _ => Route::NotFound(path.to_string()),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Dashboard => "/".to_string(),
            Route::Organizations => "/organizations".to_string(),
            Route::Projects => "/projects".to_string(),
            Route::ProjectDetail(id) => format!("/projects/{}", id),
            Route::Pipelines => "/pipelines".to_string(),
            Route::PipelineDetail(id) => format!("/pipelines/{}", id),
            Route::Deployments => "/deployments".to_string(),
            Route::Infrastructure => "/infrastructure".to_string(),
            Route::Monitoring => "/monitoring".to_string(),
            Route::NotFound(path) => path.clone(),
        }
    }

    /// Login and registration, the only surfaces reachable without a session
    pub fn is_public(&self) -> bool {
        matches!(self, Route::Login | Route::Register)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Access state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated,
}

/// Result of evaluating a navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Allow(Route),
    Redirect { from: Route, to: Route },
}

impl Navigation {
    /// Where the user ends up
    pub fn destination(&self) -> &Route {
        match self {
            Navigation::Allow(route) => route,
            Navigation::Redirect { to, .. } => to,
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Navigation::Redirect { .. })
    }
}

/// Gatekeeper for navigation
pub struct RouteGuard {
    session: Arc<SessionStore>,
    location: watch::Sender<Route>,
}

impl RouteGuard {
    pub fn new(session: Arc<SessionStore>) -> Self {
        let (location, _) = watch::channel(Route::Login);
        Self { session, location }
    }

    /// Current access state, read from the session store
    pub fn state(&self) -> AuthState {
        if self.session.is_authenticated() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        }
    }

    /// Decide where a navigation to `path` leads, without moving
    pub fn evaluate(&self, path: &str) -> Navigation {
        let route = Route::parse(path);
        match (self.state(), route.is_public()) {
            (AuthState::Unauthenticated, false) => Navigation::Redirect {
                from: route,
                to: Route::Login,
            },
            (AuthState::Authenticated, true) => Navigation::Redirect {
                from: route,
                to: Route::Dashboard,
            },
            _ => Navigation::Allow(route),
        }
    }

    /// Navigate to `path`, recording the resulting location
    pub fn navigate(&self, path: &str) -> Navigation {
        let navigation = self.evaluate(path);
        if let Navigation::Redirect { from, to } = &navigation {
            debug!("Navigation to {} redirected to {}", from, to);
        }
        self.location.send_replace(navigation.destination().clone());
        navigation
    }

    /// Session teardown: move to the login surface immediately
    pub fn force_unauthenticated(&self) {
        let previous = self.location.send_replace(Route::Login);
        if previous != Route::Login {
            info!("Session ended, leaving {} for the login page", previous);
        }
    }

    /// Current location
    pub fn location(&self) -> Route {
        self.location.borrow().clone()
    }

    /// Observe location changes
    pub fn watch(&self) -> watch::Receiver<Route> {
        self.location.subscribe()
    }
}
