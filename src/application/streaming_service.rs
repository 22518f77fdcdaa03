// Streaming deviation service - Progressive loading of several metrics at once
use crate::application::deviation_service::{DeviationPlot, DeviationService};
use crate::application::load_state::{LoadState, LoadStateStore};
use crate::domain::deviation::DeviationMetric;
use serde::Serialize;
use std::time::Instant;
use tokio::sync::mpsc;

const CHANNEL_CAPACITY: usize = 100;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    Skeleton {
        bahn_id: String,
        selector: String,
        metrics: Vec<DeviationMetric>,
    },
    LoadState {
        metric: DeviationMetric,
        #[serde(flatten)]
        state: LoadState,
    },
    MetricLoaded {
        plot: DeviationPlot,
    },
    MetricFailed {
        metric: DeviationMetric,
        error: String,
    },
    Complete {
        total_metrics: usize,
        loaded: usize,
        failed: usize,
        duration_ms: i64,
    },
}

#[derive(Clone)]
pub struct StreamingDeviationService {
    deviation_service: DeviationService,
}

impl StreamingDeviationService {
    pub fn new(deviation_service: DeviationService) -> Self {
        Self { deviation_service }
    }

    /// Load every requested metric concurrently. Messages arrive in completion
    /// order; `Complete` is always last.
    pub fn stream_deviations(
        &self,
        bahn_id: &str,
        metrics: Vec<DeviationMetric>,
        selector: &str,
    ) -> mpsc::Receiver<StreamMessage> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let start_time = Instant::now();

        let mut metrics = metrics;
        metrics.sort();
        metrics.dedup();

        // 1. Skeleton first so the client can lay out empty plots
        let skeleton = StreamMessage::Skeleton {
            bahn_id: bahn_id.to_string(),
            selector: selector.to_string(),
            metrics: metrics.clone(),
        };
        if tx.try_send(skeleton).is_err() {
            tracing::warn!(bahn_id, "Client went away before skeleton was sent");
            return rx;
        }

        // 2. Forward load-state changes to the client
        let store = LoadStateStore::new();
        let state_tx = tx.clone();
        let subscription = store.subscribe(move |metric, state| {
            let msg = StreamMessage::LoadState {
                metric,
                state: state.clone(),
            };
            if state_tx.try_send(msg).is_err() {
                tracing::debug!(%metric, "Dropped load-state update");
            }
        });

        // 3. One task per metric
        let mut handles = Vec::with_capacity(metrics.len());
        for metric in metrics.iter().copied() {
            store.set(metric, LoadState::Loading);

            let tx = tx.clone();
            let store = store.clone();
            let service = self.deviation_service.clone();
            let bahn_id = bahn_id.to_string();
            let selector = selector.to_string();

            handles.push(tokio::spawn(async move {
                match service.deviation_plot(&bahn_id, metric, &selector).await {
                    Ok(plot) => {
                        let _ = tx.send(StreamMessage::MetricLoaded { plot }).await;
                        store.set(metric, LoadState::Loaded);
                        true
                    }
                    Err(e) => {
                        tracing::warn!(bahn_id = %bahn_id, %metric, error = %e, "Error fetching deviation metric");
                        let error = e.to_string();
                        let _ = tx
                            .send(StreamMessage::MetricFailed {
                                metric,
                                error: error.clone(),
                            })
                            .await;
                        store.set(metric, LoadState::Failed { error });
                        false
                    }
                }
            }));
        }

        // 4. Completion once every metric task has finished
        let total_metrics = metrics.len();
        tokio::spawn(async move {
            let results = futures::future::join_all(handles).await;
            drop(subscription);

            let loaded = results.iter().filter(|r| matches!(r, Ok(true))).count();
            let failed = total_metrics - loaded;
            let duration_ms = start_time.elapsed().as_millis() as i64;

            tracing::debug!(total_metrics, loaded, failed, duration_ms, "Deviation stream complete");
            let _ = tx
                .send(StreamMessage::Complete {
                    total_metrics,
                    loaded,
                    failed,
                    duration_ms,
                })
                .await;
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::deviation_service::tests::sample_repository;
    use crate::application::deviation_service::tests::FakeRepository;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_stream::StreamExt;
    use tokio_stream::wrappers::ReceiverStream;

    fn service(repo: FakeRepository) -> StreamingDeviationService {
        StreamingDeviationService::new(DeviationService::new(Arc::new(repo), Duration::from_secs(60)))
    }

    async fn collect(rx: mpsc::Receiver<StreamMessage>) -> Vec<StreamMessage> {
        ReceiverStream::new(rx).collect().await
    }

    #[tokio::test]
    async fn test_stream_order_and_completion() {
        let rx = service(sample_repository()).stream_deviations(
            "B1",
            vec![DeviationMetric::Qad, DeviationMetric::Ea, DeviationMetric::Ea],
            "total",
        );
        let messages = collect(rx).await;

        match messages.first() {
            Some(StreamMessage::Skeleton { metrics, .. }) => {
                assert_eq!(metrics, &vec![DeviationMetric::Ea, DeviationMetric::Qad]);
            }
            other => panic!("expected skeleton, got {:?}", other),
        }
        match messages.last() {
            Some(StreamMessage::Complete {
                total_metrics,
                loaded,
                failed,
                ..
            }) => {
                assert_eq!((*total_metrics, *loaded, *failed), (2, 2, 0));
            }
            other => panic!("expected completion, got {:?}", other),
        }

        let loaded = messages
            .iter()
            .filter(|m| matches!(m, StreamMessage::MetricLoaded { .. }))
            .count();
        assert_eq!(loaded, 2);
    }

    #[tokio::test]
    async fn test_failed_metric_is_not_left_loading() {
        let repo = FakeRepository {
            failing: vec![DeviationMetric::Dfd],
            ..sample_repository()
        };
        let messages = collect(service(repo).stream_deviations(
            "B1",
            vec![DeviationMetric::Ea, DeviationMetric::Dfd],
            "total",
        ))
        .await;

        assert!(messages.iter().any(|m| matches!(
            m,
            StreamMessage::MetricFailed { metric: DeviationMetric::Dfd, .. }
        )));
        assert!(messages.iter().any(|m| matches!(
            m,
            StreamMessage::LoadState {
                metric: DeviationMetric::Dfd,
                state: LoadState::Failed { .. }
            }
        )));
        assert!(matches!(
            messages.last(),
            Some(StreamMessage::Complete { loaded: 1, failed: 1, .. })
        ));
    }

    #[test]
    fn test_message_json_shape() {
        let msg = StreamMessage::LoadState {
            metric: DeviationMetric::Sidtw,
            state: LoadState::Loading,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "load_state");
        assert_eq!(json["metric"], "sidtw");
        assert_eq!(json["state"], "loading");
    }
}
