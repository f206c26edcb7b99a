//! Console configuration options

use std::time::Duration;

use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;

/// Options the console core is built from
#[derive(Debug, Clone)]
pub struct ConsoleOptions {
    /// Platform base URL (without `/api/v1`)
    pub backend_base_url: String,

    /// Per-request timeout; `None` waits indefinitely
    pub request_timeout: Option<Duration>,

    /// Unobserved cache entries kept before eviction
    pub cache_idle_capacity: usize,

    /// Where the session and settings live
    pub layout: StorageLayout,
}

impl ConsoleOptions {
    /// Build options from a settings file's contents
    pub fn from_settings(settings: &Settings, layout: StorageLayout) -> Self {
        Self {
            backend_base_url: settings.backend.base_url.clone(),
            request_timeout: settings.backend.request_timeout_secs.map(Duration::from_secs),
            cache_idle_capacity: settings.cache.idle_capacity,
            layout,
        }
    }
}

impl Default for ConsoleOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default(), StorageLayout::default())
    }
}
