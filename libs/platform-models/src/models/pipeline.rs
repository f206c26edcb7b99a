//! Pipeline models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PipelineStatus;

/// A single stage of a pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<serde_json::Value>,
}

/// Structured pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub stages: Vec<StageConfig>,
    /// Keys the console does not interpret are carried through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Pipeline record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub config: PipelineConfig,
    pub project_id: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Pipeline creation payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineCreate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub project_id: i64,
    pub config: PipelineConfig,
}

/// Pipeline update payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<PipelineConfig>,
}

/// Pipeline run record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: i64,
    pub pipeline_id: i64,
    pub run_number: i64,
    #[serde(default)]
    pub status: PipelineStatus,
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub commit_sha: Option<String>,
    #[serde(default)]
    pub commit_message: Option<String>,
    /// Duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub logs_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Pipeline run creation payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRunCreate {
    pub pipeline_id: i64,
    pub trigger: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
}

impl PipelineRunCreate {
    /// A run started by hand from the console
    pub fn manual(pipeline_id: i64) -> Self {
        Self {
            pipeline_id,
            trigger: "manual".to_string(),
            branch: None,
            commit_sha: None,
            commit_message: None,
        }
    }
}
