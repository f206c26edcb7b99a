//! Settings file management

use serde::{Deserialize, Serialize};

use crate::logs::LogLevel;

/// Console settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub json_logs: bool,

    /// Also write logs to daily files under the storage `logs/` directory
    #[serde(default)]
    pub log_to_file: bool,

    /// Platform API configuration
    #[serde(default)]
    pub backend: BackendSettings,

    /// Query cache configuration
    #[serde(default)]
    pub cache: CacheSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            json_logs: false,
            log_to_file: false,
            backend: BackendSettings::default(),
            cache: CacheSettings::default(),
        }
    }
}

/// Platform API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Base URL of the platform; `/api/v1` is appended by the dispatcher
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Per-request timeout. Absent means requests never time out.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            request_timeout_secs: None,
        }
    }
}

/// Query cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Entries kept once no view observes them
    #[serde(default = "default_idle_capacity")]
    pub idle_capacity: usize,
}

fn default_idle_capacity() -> usize {
    64
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            idle_capacity: default_idle_capacity(),
        }
    }
}
