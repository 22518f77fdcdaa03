// Analysis API repository implementation
use crate::application::trajectory_repository::{TaskBackend, TrajectoryRepository};
use crate::domain::deviation::{AggregateMetric, DeviationMetric, DeviationRecord};
use crate::domain::error::{AnalysisError, AnalysisResult};
use crate::domain::signal::{SignalSeries, StreamKind};
use crate::domain::task::{CalculationResponse, MetadataRequest, TaskStatusReport};
use crate::domain::trajectory::TrajectoryTimes;
use crate::infrastructure::config::{EndpointTemplates, expand_template};
use crate::infrastructure::json_mapper;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ApiRepository {
    base_url: String,
    endpoints: EndpointTemplates,
    client: reqwest::Client,
}

impl ApiRepository {
    pub fn new(base_url: String, endpoints: EndpointTemplates, timeout: Duration) -> AnalysisResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            endpoints,
            client,
        })
    }

    /// Fill a path template with URL-encoded values
    fn build_url(&self, template: &str, vars: &[(&'static str, &str)]) -> String {
        let encoded: HashMap<&str, String> = vars
            .iter()
            .map(|(k, v)| (*k, urlencoding::encode(v).into_owned()))
            .collect();
        format!("{}{}", self.base_url, expand_template(template, &encoded))
    }

    async fn read_body<T: DeserializeOwned>(url: &str, response: reqwest::Response) -> AnalysisResult<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Network(format!(
                "{} returned status {}: {}",
                url, status, body
            )));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> AnalysisResult<T> {
        tracing::debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;
        Self::read_body(url, response).await
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(&self, url: &str, body: &B) -> AnalysisResult<T> {
        tracing::debug!(url, "POST");
        let response = self.client.post(url).json(body).send().await?;
        Self::read_body(url, response).await
    }
}

#[async_trait]
impl TrajectoryRepository for ApiRepository {
    async fn deviation_records(
        &self,
        bahn_id: &str,
        metric: DeviationMetric,
    ) -> AnalysisResult<Vec<DeviationRecord>> {
        let url = self.build_url(
            &self.endpoints.deviations,
            &[("metric", metric.prefix()), ("bahn_id", bahn_id)],
        );
        let body: Value = self.get_json(&url).await?;
        let records = json_mapper::deviation_records(&body, metric);
        tracing::debug!(bahn_id, %metric, count = records.len(), "Fetched deviation rows");
        Ok(records)
    }

    async fn aggregate_metrics(
        &self,
        bahn_id: &str,
        metric: DeviationMetric,
    ) -> AnalysisResult<Vec<AggregateMetric>> {
        let url = self.build_url(
            &self.endpoints.aggregates,
            &[("metric", metric.prefix()), ("bahn_id", bahn_id)],
        );
        let body: Value = self.get_json(&url).await?;
        Ok(json_mapper::aggregate_metrics(&body, metric))
    }

    async fn trajectory_times(&self, bahn_id: &str) -> AnalysisResult<TrajectoryTimes> {
        let url = self.build_url(&self.endpoints.trajectory_info, &[("bahn_id", bahn_id)]);
        self.get_json(&url).await
    }

    async fn signal_series(&self, bahn_id: &str, stream: StreamKind) -> AnalysisResult<SignalSeries> {
        let url = self.build_url(
            &self.endpoints.signal,
            &[("stream", stream.as_str()), ("bahn_id", bahn_id)],
        );
        let body: Value = self.get_json(&url).await?;
        Ok(json_mapper::signal_series(&body, stream))
    }
}

#[async_trait]
impl TaskBackend for ApiRepository {
    async fn calculate_metadata(&self, request: &MetadataRequest) -> AnalysisResult<CalculationResponse> {
        let url = self.build_url(&self.endpoints.calculate_metadata, &[]);
        self.post_json(&url, request).await
    }

    async fn task_status(&self, task_id: &str) -> AnalysisResult<TaskStatusReport> {
        let url = self.build_url(&self.endpoints.task_status, &[("task_id", task_id)]);
        self.get_json(&url).await
    }
}
