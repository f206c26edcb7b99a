//! Deployment models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DeploymentStatus, Environment};

/// Deployment record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: i64,
    pub project_id: i64,
    pub environment: Environment,
    pub version: String,
    #[serde(default)]
    pub commit_sha: Option<String>,
    #[serde(default)]
    pub image_tag: Option<String>,
    #[serde(default)]
    pub config: Option<serde_json::Value>,
    #[serde(default)]
    pub status: DeploymentStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub deployed_by: Option<i64>,
    /// Set on deployments created by a rollback
    #[serde(default)]
    pub rollback_to_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Deployment {
    /// Abbreviated commit for list rows
    pub fn short_sha(&self) -> Option<&str> {
        self.commit_sha
            .as_deref()
            .map(|sha| sha.get(..8).unwrap_or(sha))
    }
}

/// Deployment creation payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentCreate {
    pub project_id: i64,
    pub environment: Environment,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Deployment update payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DeploymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
