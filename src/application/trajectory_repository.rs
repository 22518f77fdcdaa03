// Repository traits for trajectory data and backend computations
use crate::domain::deviation::{AggregateMetric, DeviationMetric, DeviationRecord};
use crate::domain::error::AnalysisResult;
use crate::domain::signal::{SignalSeries, StreamKind};
use crate::domain::task::{CalculationResponse, MetadataRequest, TaskStatusReport};
use crate::domain::trajectory::TrajectoryTimes;
use async_trait::async_trait;

#[async_trait]
pub trait TrajectoryRepository: Send + Sync {
    /// Per-point rows of one deviation metric for a trajectory
    async fn deviation_records(
        &self,
        bahn_id: &str,
        metric: DeviationMetric,
    ) -> AnalysisResult<Vec<DeviationRecord>>;

    /// Per-trajectory and per-segment summaries of one metric
    async fn aggregate_metrics(
        &self,
        bahn_id: &str,
        metric: DeviationMetric,
    ) -> AnalysisResult<Vec<AggregateMetric>>;

    /// Recording start/end of a trajectory
    async fn trajectory_times(&self, bahn_id: &str) -> AnalysisResult<TrajectoryTimes>;

    /// One sampled stream of a trajectory, in arrival order
    async fn signal_series(&self, bahn_id: &str, stream: StreamKind) -> AnalysisResult<SignalSeries>;
}

/// Backend endpoints for long-running calculations
#[async_trait]
pub trait TaskBackend: Send + Sync {
    async fn calculate_metadata(&self, request: &MetadataRequest) -> AnalysisResult<CalculationResponse>;

    async fn task_status(&self, task_id: &str) -> AnalysisResult<TaskStatusReport>;
}
