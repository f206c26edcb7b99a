//! Storage layout configuration

use std::path::PathBuf;

use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Environment variable overriding the default storage directory
pub const HOME_ENV: &str = "OPSCONSOLE_HOME";

/// On-disk layout of the console's durable state
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for all storage
    pub base_dir: PathBuf,
}

impl StorageLayout {
    /// Create a new storage layout
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Persisted session (credential and user identity)
    pub fn session_file(&self) -> File {
        File::new(self.base_dir.join("session.json"))
    }

    /// Get the settings file path
    pub fn settings_file(&self) -> File {
        File::new(self.base_dir.join("settings.json"))
    }

    /// Get the logs directory
    pub fn logs_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("logs"))
    }

    /// Setup the storage layout (create directories)
    pub async fn setup(&self) -> Result<(), crate::errors::ConsoleError> {
        Dir::new(&self.base_dir).create().await?;
        self.logs_dir().create().await?;
        Ok(())
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        if let Some(dir) = std::env::var_os(HOME_ENV) {
            return Self::new(PathBuf::from(dir));
        }

        let base_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".opsconsole");

        Self::new(base_dir)
    }
}

mod dirs {
    use std::path::PathBuf;

    pub fn home_dir() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
    }
}
