//! Monitoring API client

use platform_models::{
    Alert, AlertCreate, AlertSeverity, AlertStatus, AlertUpdate, Metric, MetricCreate, MetricType,
};

use crate::cache::key::CacheKey;
use crate::errors::ConsoleError;
use crate::http::client::Dispatcher;

impl Dispatcher {
    pub async fn list_metrics(
        &self,
        server_id: Option<i64>,
        metric_type: Option<MetricType>,
    ) -> Result<Vec<Metric>, ConsoleError> {
        self.get_key(&CacheKey::metrics(server_id, metric_type)).await
    }

    pub async fn create_metric(&self, payload: &MetricCreate) -> Result<Metric, ConsoleError> {
        self.post("/monitoring/metrics", payload).await
    }

    pub async fn list_alerts(
        &self,
        organization_id: Option<i64>,
        status: Option<AlertStatus>,
        severity: Option<AlertSeverity>,
    ) -> Result<Vec<Alert>, ConsoleError> {
        self.get_key(&CacheKey::alerts(organization_id, status, severity))
            .await
    }

    pub async fn get_alert(&self, id: i64) -> Result<Alert, ConsoleError> {
        self.get_key(&CacheKey::alert(id)).await
    }

    pub async fn create_alert(&self, payload: &AlertCreate) -> Result<Alert, ConsoleError> {
        self.post("/monitoring/alerts", payload).await
    }

    pub async fn update_alert(&self, id: i64, payload: &AlertUpdate) -> Result<Alert, ConsoleError> {
        self.put(&format!("/monitoring/alerts/{}", id), payload).await
    }

    pub async fn acknowledge_alert(&self, id: i64) -> Result<Alert, ConsoleError> {
        self.post_empty(&format!("/monitoring/alerts/{}/acknowledge", id))
            .await
    }
}
