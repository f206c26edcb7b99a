//! Monitoring models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AlertSeverity, AlertStatus, MetricType};

/// Metric sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    pub id: i64,
    pub metric_type: MetricType,
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub server_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Metric creation payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricCreate {
    pub metric_type: MetricType,
    pub name: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<i64>,
}

/// Alert record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub severity: AlertSeverity,
    #[serde(default)]
    pub status: AlertStatus,
    #[serde(default)]
    pub source: Option<String>,
    /// Id of the originating entity, usually a server
    #[serde(default)]
    pub source_id: Option<i64>,
    pub organization_id: i64,
    #[serde(default)]
    pub acknowledged_by: Option<i64>,
    #[serde(default)]
    pub resolved_by: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Alert creation payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertCreate {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub severity: AlertSeverity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<i64>,
    pub organization_id: i64,
}

/// Alert update payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AlertStatus>,
}

impl AlertUpdate {
    pub fn resolved() -> Self {
        Self {
            status: Some(AlertStatus::Resolved),
        }
    }
}
