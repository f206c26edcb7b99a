//! Infrastructure models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ServerStatus;

/// Server record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub id: i64,
    pub name: String,
    pub hostname: String,
    pub ip_address: String,
    #[serde(default)]
    pub cpu_cores: Option<i64>,
    #[serde(default)]
    pub memory_gb: Option<i64>,
    #[serde(default)]
    pub disk_gb: Option<i64>,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub tags: Option<serde_json::Value>,
    #[serde(default)]
    pub status: ServerStatus,
    pub organization_id: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Server creation payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerCreate {
    pub name: String,
    pub hostname: String,
    pub ip_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_gb: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_gb: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    pub organization_id: i64,
}

/// Server update payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ServerStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<serde_json::Value>,
}

/// Cluster record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub cluster_type: String,
    pub endpoint: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub node_count: Option<i64>,
    #[serde(default)]
    pub status: ServerStatus,
    pub organization_id: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Cluster creation payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterCreate {
    pub name: String,
    #[serde(rename = "type")]
    pub cluster_type: String,
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_count: Option<i64>,
    pub organization_id: i64,
}
