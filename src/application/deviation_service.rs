// Deviation service - Use case for building one metric's deviation plot
use crate::application::deviation_assembler::{AssembledDeviation, assemble_plot};
use crate::application::segment_resolver::{available_segments, select_aggregate};
use crate::application::trajectory_repository::TrajectoryRepository;
use crate::domain::deviation::{AggregateMetric, DeviationMetric, DeviationRecord};
use crate::domain::error::AnalysisResult;
use crate::domain::trajectory::TrajectoryTimes;
use crate::infrastructure::response_cache::ResponseCache;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Plot-ready deviation data for one metric and selector
#[derive(Debug, Clone, Serialize)]
pub struct DeviationPlot {
    pub bahn_id: String,
    pub metric: DeviationMetric,
    pub selector: String,
    #[serde(flatten)]
    pub assembled: AssembledDeviation,
    pub aggregate: Option<AggregateMetric>,
    /// Sub-segment numbers available for this trajectory
    pub segments: Vec<u32>,
}

/// Everything fetched for one (trajectory, metric) pair
#[derive(Debug)]
struct MetricData {
    records: Vec<DeviationRecord>,
    aggregates: Vec<AggregateMetric>,
    times: Option<TrajectoryTimes>,
}

#[derive(Clone)]
pub struct DeviationService {
    repository: Arc<dyn TrajectoryRepository>,
    cache: ResponseCache<(String, DeviationMetric), Arc<MetricData>>,
}

impl DeviationService {
    pub fn new(repository: Arc<dyn TrajectoryRepository>, cache_ttl: Duration) -> Self {
        Self {
            repository,
            cache: ResponseCache::new(cache_ttl),
        }
    }

    pub async fn deviation_plot(
        &self,
        bahn_id: &str,
        metric: DeviationMetric,
        selector: &str,
    ) -> AnalysisResult<DeviationPlot> {
        let data = self.load_metric(bahn_id, metric).await?;

        let assembled = assemble_plot(&data.records, selector, data.times.as_ref());
        if assembled.series.is_empty() {
            tracing::debug!(bahn_id, %metric, selector, "Nothing to plot");
        }

        Ok(DeviationPlot {
            bahn_id: bahn_id.to_string(),
            metric,
            selector: selector.to_string(),
            assembled,
            aggregate: select_aggregate(&data.aggregates, selector),
            segments: available_segments(&data.records),
        })
    }

    /// Drop cached data for a trajectory, e.g. after its metadata was recalculated
    pub fn invalidate(&self, bahn_id: &str) {
        for metric in DeviationMetric::ALL {
            self.cache.invalidate(&(bahn_id.to_string(), metric));
        }
    }

    async fn load_metric(&self, bahn_id: &str, metric: DeviationMetric) -> AnalysisResult<Arc<MetricData>> {
        let key = (bahn_id.to_string(), metric);
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(bahn_id, %metric, "Deviation cache hit");
            return Ok(cached);
        }

        let (records, aggregates, times) = tokio::join!(
            self.repository.deviation_records(bahn_id, metric),
            self.repository.aggregate_metrics(bahn_id, metric),
            self.repository.trajectory_times(bahn_id),
        );

        let records = records?;

        // Summaries and timing only decorate the plot; degrade instead of failing
        let aggregates = aggregates.unwrap_or_else(|e| {
            tracing::warn!(bahn_id, %metric, error = %e, "Error fetching aggregate metrics");
            Vec::new()
        });
        let times = match times {
            Ok(times) => Some(times),
            Err(e) => {
                tracing::warn!(bahn_id, error = %e, "Error fetching trajectory times");
                None
            }
        };

        let data = Arc::new(MetricData {
            records,
            aggregates,
            times,
        });
        self.cache.purge_expired();
        self.cache.insert(key, data.clone());
        Ok(data)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::deviation::{OrientationDeviation, PositionDeviation};
    use crate::domain::error::AnalysisError;
    use crate::domain::signal::{Quaternion, SignalSeries, StreamKind};
    use crate::domain::trajectory::parse_iso_datetime;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory repository for service tests
    #[derive(Default)]
    pub(crate) struct FakeRepository {
        pub records: HashMap<DeviationMetric, Vec<DeviationRecord>>,
        pub aggregates: Vec<AggregateMetric>,
        pub times: Option<TrajectoryTimes>,
        pub streams: Mutex<HashMap<StreamKind, SignalSeries>>,
        pub failing: Vec<DeviationMetric>,
        pub record_fetches: AtomicUsize,
    }

    #[async_trait]
    impl TrajectoryRepository for FakeRepository {
        async fn deviation_records(
            &self,
            _bahn_id: &str,
            metric: DeviationMetric,
        ) -> AnalysisResult<Vec<DeviationRecord>> {
            self.record_fetches.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(&metric) {
                return Err(AnalysisError::Network(format!("{} endpoint returned 500", metric)));
            }
            Ok(self.records.get(&metric).cloned().unwrap_or_default())
        }

        async fn aggregate_metrics(
            &self,
            _bahn_id: &str,
            _metric: DeviationMetric,
        ) -> AnalysisResult<Vec<AggregateMetric>> {
            Ok(self.aggregates.clone())
        }

        async fn trajectory_times(&self, _bahn_id: &str) -> AnalysisResult<TrajectoryTimes> {
            self.times
                .clone()
                .ok_or_else(|| AnalysisError::Network("bahn_info unavailable".to_string()))
        }

        async fn signal_series(&self, _bahn_id: &str, stream: StreamKind) -> AnalysisResult<SignalSeries> {
            Ok(self
                .streams
                .lock()
                .unwrap()
                .get(&stream)
                .cloned()
                .unwrap_or_else(|| SignalSeries::new(stream, Vec::new())))
        }
    }

    pub(crate) fn position_row(segment: &str, order: i64, distance: f64) -> PositionDeviation {
        PositionDeviation {
            bahn_id: "B1".to_string(),
            segment_id: segment.to_string(),
            points_order: order,
            distance,
            soll: [0.0; 3],
            ist: [distance, 0.0, 0.0],
        }
    }

    pub(crate) fn sample_repository() -> FakeRepository {
        let mut records = HashMap::new();
        records.insert(
            DeviationMetric::Ea,
            vec![
                DeviationRecord::Ea(position_row("B1_2", 2, 0.4)),
                DeviationRecord::Ea(position_row("B1_1", 0, 0.1)),
                DeviationRecord::Ea(position_row("B1_1", 1, 0.2)),
            ],
        );
        records.insert(
            DeviationMetric::Qad,
            vec![DeviationRecord::Qad(OrientationDeviation {
                bahn_id: "B1".to_string(),
                segment_id: "B1".to_string(),
                points_order: 0,
                distance: 1.5,
                soll: Quaternion::new(0.0, 0.0, 0.0, 1.0),
                ist: Quaternion::new(0.0, 0.0, 0.0, 1.0),
            })],
        );

        FakeRepository {
            records,
            aggregates: vec![AggregateMetric {
                bahn_id: "B1".to_string(),
                segment_id: "B1_1".to_string(),
                min_distance: 0.1,
                max_distance: 0.2,
                avg_distance: 0.15,
                std_distance: 0.05,
                evaluation: Some("good".to_string()),
            }],
            times: Some(TrajectoryTimes::new(
                parse_iso_datetime("2024-03-01T10:00:00Z"),
                parse_iso_datetime("2024-03-01T10:00:04Z"),
            )),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_whole_trajectory_plot() {
        let service = DeviationService::new(Arc::new(sample_repository()), Duration::from_secs(60));
        let plot = service.deviation_plot("B1", DeviationMetric::Ea, "total").await.unwrap();

        assert_eq!(plot.assembled.series.value, vec![0.1, 0.2, 0.4]);
        assert_eq!(plot.assembled.series.time, vec![0.0, 2.0, 4.0]);
        assert_eq!(plot.assembled.transitions, vec![4.0]);
        assert_eq!(plot.segments, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_segment_plot_with_aggregate() {
        let service = DeviationService::new(Arc::new(sample_repository()), Duration::from_secs(60));
        let plot = service
            .deviation_plot("B1", DeviationMetric::Ea, "segment_1")
            .await
            .unwrap();

        assert_eq!(plot.assembled.series.value, vec![0.1, 0.2]);
        assert_eq!(plot.aggregate.map(|a| a.evaluation), Some(Some("good".to_string())));
    }

    #[tokio::test]
    async fn test_missing_times_degrade_to_index_axis() {
        let repo = FakeRepository {
            times: None,
            ..sample_repository()
        };
        let service = DeviationService::new(Arc::new(repo), Duration::from_secs(60));
        let plot = service.deviation_plot("B1", DeviationMetric::Ea, "total").await.unwrap();
        assert_eq!(plot.assembled.series.time, vec![0.0, 1.0, 2.0]);
    }

    #[tokio::test]
    async fn test_repeated_requests_hit_cache() {
        let repo = Arc::new(sample_repository());
        let service = DeviationService::new(repo.clone(), Duration::from_secs(60));

        service.deviation_plot("B1", DeviationMetric::Ea, "total").await.unwrap();
        service.deviation_plot("B1", DeviationMetric::Ea, "segment_2").await.unwrap();
        assert_eq!(repo.record_fetches.load(Ordering::SeqCst), 1);

        service.invalidate("B1");
        service.deviation_plot("B1", DeviationMetric::Ea, "total").await.unwrap();
        assert_eq!(repo.record_fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_record_failure_propagates() {
        let repo = FakeRepository {
            failing: vec![DeviationMetric::Dfd],
            ..sample_repository()
        };
        let service = DeviationService::new(Arc::new(repo), Duration::from_secs(60));
        let err = service
            .deviation_plot("B1", DeviationMetric::Dfd, "total")
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Network(_)));
    }

    #[tokio::test]
    async fn test_plot_serialises_flat() {
        let service = DeviationService::new(Arc::new(sample_repository()), Duration::from_secs(60));
        let plot = service.deviation_plot("B1", DeviationMetric::Qad, "total").await.unwrap();
        let json = serde_json::to_value(&plot).unwrap();
        assert_eq!(json["metric"], "qad");
        assert_eq!(json["series"]["value"][0], 1.5);
        assert_eq!(json["pairs"][0]["kind"], "orientation");
    }
}
