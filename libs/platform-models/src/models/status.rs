//! Closed status enumerations
//!
//! Every enumeration carries an `Unknown` variant: values the platform adds
//! later still deserialize and render with the neutral treatment.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Visual treatment for a status badge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Warning,
    Danger,
    Info,
    Neutral,
}

/// Deployment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    #[default]
    Pending,
    InProgress,
    Success,
    Failed,
    RolledBack,
    #[serde(other)]
    Unknown,
}

impl DeploymentStatus {
    pub fn tone(&self) -> Tone {
        match self {
            DeploymentStatus::Success => Tone::Success,
            DeploymentStatus::Failed => Tone::Danger,
            DeploymentStatus::InProgress => Tone::Info,
            DeploymentStatus::Pending | DeploymentStatus::RolledBack => Tone::Warning,
            DeploymentStatus::Unknown => Tone::Neutral,
        }
    }
}

/// Pipeline run (and stage) status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    #[default]
    Pending,
    Running,
    Success,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl PipelineStatus {
    pub fn tone(&self) -> Tone {
        match self {
            PipelineStatus::Success => Tone::Success,
            PipelineStatus::Failed => Tone::Danger,
            PipelineStatus::Running => Tone::Info,
            PipelineStatus::Pending => Tone::Warning,
            PipelineStatus::Cancelled | PipelineStatus::Unknown => Tone::Neutral,
        }
    }

    /// Whether the run has reached a final state
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            PipelineStatus::Success | PipelineStatus::Failed | PipelineStatus::Cancelled
        )
    }
}

/// Server and cluster status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerStatus {
    #[default]
    Online,
    Offline,
    Degraded,
    Maintenance,
    #[serde(other)]
    Unknown,
}

impl ServerStatus {
    pub fn tone(&self) -> Tone {
        match self {
            ServerStatus::Online => Tone::Success,
            ServerStatus::Offline => Tone::Danger,
            ServerStatus::Degraded => Tone::Warning,
            ServerStatus::Maintenance => Tone::Info,
            ServerStatus::Unknown => Tone::Neutral,
        }
    }
}

/// Alert lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    #[default]
    Active,
    Acknowledged,
    Resolved,
    #[serde(other)]
    Unknown,
}

impl AlertStatus {
    pub fn tone(&self) -> Tone {
        match self {
            AlertStatus::Active => Tone::Danger,
            AlertStatus::Acknowledged => Tone::Warning,
            AlertStatus::Resolved => Tone::Success,
            AlertStatus::Unknown => Tone::Neutral,
        }
    }
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    #[default]
    Info,
    Warning,
    Error,
    Critical,
    #[serde(other)]
    Unknown,
}

impl AlertSeverity {
    pub fn tone(&self) -> Tone {
        match self {
            AlertSeverity::Critical | AlertSeverity::Error => Tone::Danger,
            AlertSeverity::Warning => Tone::Warning,
            AlertSeverity::Info => Tone::Info,
            AlertSeverity::Unknown => Tone::Neutral,
        }
    }
}

/// Metric kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Cpu,
    Memory,
    Disk,
    Network,
    #[default]
    Custom,
    #[serde(other)]
    Unknown,
}

/// Deployment target environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
    #[serde(other)]
    Unknown,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
            Environment::Unknown => "unknown",
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            Environment::Production => Tone::Danger,
            Environment::Staging => Tone::Warning,
            Environment::Development => Tone::Info,
            Environment::Unknown => Tone::Neutral,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Organization membership role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Owner,
    Admin,
    #[default]
    Member,
    Viewer,
    #[serde(other)]
    Unknown,
}
