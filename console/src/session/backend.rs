//! Durable session persistence

use std::sync::Mutex;

use async_trait::async_trait;
use platform_models::User;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::ConsoleError;
use crate::filesys::file::File;

/// On-disk form of a session.
///
/// Both fields are optional so that a half-written or hand-edited file is
/// detected and discarded instead of failing to parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedSession {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

impl PersistedSession {
    pub fn new(token: String, user: User) -> Self {
        Self {
            token: Some(token),
            user: Some(user),
        }
    }

    /// Both halves, or nothing
    pub fn into_parts(self) -> Option<(String, User)> {
        match (self.token, self.user) {
            (Some(token), Some(user)) if !token.is_empty() => Some((token, user)),
            _ => None,
        }
    }
}

/// Storage that survives a process restart
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn load(&self) -> Result<Option<PersistedSession>, ConsoleError>;

    async fn save(&self, session: &PersistedSession) -> Result<(), ConsoleError>;

    async fn remove(&self) -> Result<(), ConsoleError>;
}

/// Session persisted as a JSON file readable only by its owner
pub struct FileSessionBackend {
    file: File,
}

impl FileSessionBackend {
    pub fn new(file: File) -> Self {
        Self { file }
    }
}

#[async_trait]
impl SessionBackend for FileSessionBackend {
    async fn load(&self) -> Result<Option<PersistedSession>, ConsoleError> {
        if !self.file.exists().await {
            debug!("No persisted session at {}", self.file.path().display());
            return Ok(None);
        }

        match self.file.read_json::<PersistedSession>().await {
            Ok(session) => Ok(Some(session)),
            Err(ConsoleError::JsonError(e)) => {
                warn!("Discarding unreadable session file: {}", e);
                Ok(None)
            }
            Err(e) => Err(ConsoleError::StorageError(format!(
                "Failed to read session file: {}",
                e
            ))),
        }
    }

    async fn save(&self, session: &PersistedSession) -> Result<(), ConsoleError> {
        self.file.write_json(session).await?;
        self.file.set_permissions_600().await
    }

    async fn remove(&self) -> Result<(), ConsoleError> {
        self.file.delete().await
    }
}

/// In-process backend, for tests and ephemeral sessions
#[derive(Default)]
pub struct MemorySessionBackend {
    slot: Mutex<Option<PersistedSession>>,
}

impl MemorySessionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a session already persisted
    pub fn with_session(session: PersistedSession) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
        }
    }
}

#[async_trait]
impl SessionBackend for MemorySessionBackend {
    async fn load(&self) -> Result<Option<PersistedSession>, ConsoleError> {
        Ok(self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn save(&self, session: &PersistedSession) -> Result<(), ConsoleError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(session.clone());
        Ok(())
    }

    async fn remove(&self) -> Result<(), ConsoleError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}
