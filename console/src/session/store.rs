//! Session store
//!
//! Holds the current credential and user identity. A session is either fully
//! present (credential and user) or absent; readers receive an immutable
//! `Arc<Session>` snapshot that later changes never touch.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use platform_models::User;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::authn::credential::Credential;
use crate::errors::ConsoleError;
use crate::session::backend::{MemorySessionBackend, PersistedSession, SessionBackend};

/// An established session
#[derive(Debug)]
pub struct Session {
    /// Distinguishes this session from any earlier or later one
    pub generation: u64,
    pub credential: Credential,
    pub user: User,
    pub established_at: DateTime<Utc>,
}

/// Process-wide holder of the current session
pub struct SessionStore {
    state: watch::Sender<Option<Arc<Session>>>,
    generation: AtomicU64,
    hydrated: AtomicBool,
    backend: Arc<dyn SessionBackend>,
    // Held across every backend write and the publish that goes with it
    persist: Mutex<()>,
}

impl SessionStore {
    /// Create an empty store over a durable backend.
    ///
    /// Call [`SessionStore::hydrate`] before issuing authenticated requests.
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            state,
            generation: AtomicU64::new(0),
            hydrated: AtomicBool::new(false),
            backend,
            persist: Mutex::new(()),
        }
    }

    /// A store that forgets everything when the process exits
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionBackend::new()))
    }

    /// Load the persisted session, if any.
    ///
    /// Half-populated records are discarded and removed from storage.
    pub async fn hydrate(&self) -> Result<Option<Arc<Session>>, ConsoleError> {
        let _persist = self.persist.lock().await;
        let restored = match self.backend.load().await? {
            Some(persisted) => match persisted.into_parts() {
                Some((token, user)) => {
                    info!("Restored session for {}", user.username);
                    Some(self.establish(token, user))
                }
                None => {
                    warn!("Persisted session is incomplete, discarding it");
                    self.backend.remove().await?;
                    None
                }
            },
            None => None,
        };

        self.state.send_replace(restored.clone());
        self.hydrated.store(true, Ordering::SeqCst);
        Ok(restored)
    }

    /// Whether [`SessionStore::hydrate`] has completed
    pub fn is_hydrated(&self) -> bool {
        self.hydrated.load(Ordering::SeqCst)
    }

    /// Establish a session with both credential and user.
    ///
    /// The session is persisted before it becomes visible, so a storage
    /// failure leaves the previous state untouched. A concurrent clear runs
    /// entirely before or entirely after this.
    pub async fn set_credential(&self, token: String, user: User) -> Result<Arc<Session>, ConsoleError> {
        let _persist = self.persist.lock().await;
        self.backend
            .save(&PersistedSession::new(token.clone(), user.clone()))
            .await?;

        let session = self.establish(token, user);
        self.state.send_replace(Some(session.clone()));
        self.hydrated.store(true, Ordering::SeqCst);

        info!(
            "Session established for {} (generation {})",
            session.user.username, session.generation
        );
        Ok(session)
    }

    /// Remove the session.
    ///
    /// Returns whether a session was present.
    pub async fn clear(&self) -> Result<bool, ConsoleError> {
        let _persist = self.persist.lock().await;
        let previous = self.state.send_replace(None);
        self.backend.remove().await?;

        if let Some(previous) = &previous {
            info!("Session cleared for {}", previous.user.username);
        }
        Ok(previous.is_some())
    }

    /// Remove the session only if it is still the given generation.
    ///
    /// Several requests failing with 401 for the same session all call this;
    /// only the first one clears.
    pub async fn clear_if(&self, generation: u64) -> Result<bool, ConsoleError> {
        let _persist = self.persist.lock().await;
        let cleared = self.state.send_if_modified(|current| match current {
            Some(session) if session.generation == generation => {
                *current = None;
                true
            }
            _ => false,
        });

        if cleared {
            self.backend.remove().await?;
            info!("Session generation {} torn down", generation);
        } else {
            debug!("Session generation {} already gone, nothing to clear", generation);
        }
        Ok(cleared)
    }

    /// Snapshot of the current session
    pub fn current(&self) -> Option<Arc<Session>> {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Observe session changes
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Session>>> {
        self.state.subscribe()
    }

    fn establish(&self, token: String, user: User) -> Arc<Session> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Arc::new(Session {
            generation,
            credential: Credential::from_raw(token),
            user,
            established_at: Utc::now(),
        })
    }
}
