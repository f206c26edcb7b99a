//! Pipeline API client

use platform_models::{Pipeline, PipelineCreate, PipelineRun, PipelineRunCreate, PipelineUpdate};

use crate::cache::key::CacheKey;
use crate::errors::ConsoleError;
use crate::http::client::Dispatcher;

impl Dispatcher {
    pub async fn list_pipelines(&self, project_id: Option<i64>) -> Result<Vec<Pipeline>, ConsoleError> {
        self.get_key(&CacheKey::pipelines(project_id)).await
    }

    pub async fn get_pipeline(&self, id: i64) -> Result<Pipeline, ConsoleError> {
        self.get_key(&CacheKey::pipeline(id)).await
    }

    pub async fn create_pipeline(&self, payload: &PipelineCreate) -> Result<Pipeline, ConsoleError> {
        self.post("/pipelines", payload).await
    }

    pub async fn update_pipeline(&self, id: i64, payload: &PipelineUpdate) -> Result<Pipeline, ConsoleError> {
        self.put(&format!("/pipelines/{}", id), payload).await
    }

    pub async fn list_pipeline_runs(&self, pipeline_id: i64) -> Result<Vec<PipelineRun>, ConsoleError> {
        self.get_key(&CacheKey::pipeline_runs(pipeline_id)).await
    }

    /// Start a run of a pipeline
    pub async fn create_pipeline_run(&self, payload: &PipelineRunCreate) -> Result<PipelineRun, ConsoleError> {
        self.post(&format!("/pipelines/{}/runs", payload.pipeline_id), payload)
            .await
    }

    pub async fn get_pipeline_run(&self, run_id: i64) -> Result<PipelineRun, ConsoleError> {
        self.get_key(&CacheKey::pipeline_run(run_id)).await
    }
}
