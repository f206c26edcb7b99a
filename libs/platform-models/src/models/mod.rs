//! API models

mod auth;
mod deployment;
mod infrastructure;
mod monitoring;
mod organization;
mod pipeline;
mod project;
mod status;

pub use auth::*;
pub use deployment::*;
pub use infrastructure::*;
pub use monitoring::*;
pub use organization::*;
pub use pipeline::*;
pub use project::*;
pub use status::*;

use serde::{Deserialize, Serialize};

/// Error body returned by the platform on failed requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: serde_json::Value,
}

impl ErrorResponse {
    /// Human readable detail.
    ///
    /// The platform returns either a plain string or, for request validation
    /// failures, a list of `{loc, msg, type}` objects. For the latter the
    /// first message is used.
    pub fn message(&self) -> Option<String> {
        match &self.detail {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Array(items) => items
                .iter()
                .find_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .map(str::to_string),
            _ => None,
        }
    }
}
