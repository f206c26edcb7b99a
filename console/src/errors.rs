//! Error types for the platform console

use thiserror::Error;

/// Message shown when the platform gives no detail of its own
pub const GENERIC_FAILURE: &str = "Something went wrong, please try again";

/// Main error type for the platform console
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// 4xx other than 401/404, with the platform's detail message
    #[error("Validation error ({status}): {detail}")]
    Validation { status: u16, detail: String },

    /// 401 on an authenticated call; the session has been torn down
    #[error("Authorization error: session is no longer valid")]
    Authorization,

    /// Transport failure or 5xx
    #[error("Network or server error: {0}")]
    NetworkOrServer(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Form error: {0}")]
    FormError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConsoleError {
    /// Text to surface to the user.
    ///
    /// Validation failures carry the platform's own wording; everything else
    /// maps to a fixed message.
    pub fn user_message(&self) -> String {
        match self {
            ConsoleError::Validation { detail, .. } => detail.clone(),
            ConsoleError::Authorization => "Your session has expired, please sign in again".to_string(),
            ConsoleError::NotFound(_) => "Not found".to_string(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }

    /// The platform's detail message, if it sent one
    pub fn detail(&self) -> Option<&str> {
        match self {
            ConsoleError::Validation { detail, .. } => Some(detail),
            _ => None,
        }
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, ConsoleError::Authorization)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ConsoleError::NotFound(_))
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ConsoleError::Internal(format!("Malformed response body: {}", err));
        }
        ConsoleError::NetworkOrServer(err.to_string())
    }
}

impl From<anyhow::Error> for ConsoleError {
    fn from(err: anyhow::Error) -> Self {
        ConsoleError::Internal(err.to_string())
    }
}
