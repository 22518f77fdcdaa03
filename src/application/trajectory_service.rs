// Trajectory service - Time-aligned signal views and sampling checks
use crate::application::consistency_checker::{StreamConsistency, check_consistency};
use crate::application::gimbal_lock::fix_discontinuities;
use crate::application::time_normalizer::{global_start, normalize};
use crate::application::trajectory_repository::TrajectoryRepository;
use crate::domain::error::AnalysisResult;
use crate::domain::signal::{NanoTimestamp, SignalPayload, SignalPoint, SignalSeries, StreamKind};
use futures::future::try_join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct TimelineSeries {
    pub stream: StreamKind,
    /// Seconds since the earliest sample of the view
    pub time: Vec<f64>,
    pub points: Vec<SignalPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignalTimeline {
    pub bahn_id: String,
    pub origin: Option<NanoTimestamp>,
    pub series: Vec<TimelineSeries>,
}

/// Euler angles in degrees on the shared time axis
#[derive(Debug, Clone, Serialize)]
pub struct EulerSeries {
    pub stream: StreamKind,
    pub time: Vec<f64>,
    pub roll: Vec<f64>,
    pub pitch: Vec<f64>,
    pub yaw: Vec<f64>,
}

#[derive(Clone)]
pub struct TrajectoryService {
    repository: Arc<dyn TrajectoryRepository>,
}

impl TrajectoryService {
    pub fn new(repository: Arc<dyn TrajectoryRepository>) -> Self {
        Self { repository }
    }

    async fn fetch_sorted(&self, bahn_id: &str, streams: &[StreamKind]) -> AnalysisResult<Vec<SignalSeries>> {
        let fetches = streams
            .iter()
            .map(|stream| self.repository.signal_series(bahn_id, *stream));
        let mut series = try_join_all(fetches).await?;
        for s in series.iter_mut() {
            s.sort_by_timestamp();
        }
        Ok(series)
    }

    /// Fetch the streams and put them on one relative time axis
    pub async fn signal_timeline(&self, bahn_id: &str, streams: &[StreamKind]) -> AnalysisResult<SignalTimeline> {
        let fetched = self.fetch_sorted(bahn_id, streams).await?;

        let slices: Vec<&[SignalPoint]> = fetched.iter().map(|s| s.points.as_slice()).collect();
        let origin = global_start(&slices);
        let times = normalize(&slices);

        let series = fetched
            .into_iter()
            .zip(times)
            .map(|(s, time)| TimelineSeries {
                stream: s.stream,
                time,
                points: s.points,
            })
            .collect();

        Ok(SignalTimeline {
            bahn_id: bahn_id.to_string(),
            origin,
            series,
        })
    }

    /// Planned and measured orientation as continuous Euler angles
    pub async fn orientation_timeline(&self, bahn_id: &str) -> AnalysisResult<Vec<EulerSeries>> {
        let fetched = self
            .fetch_sorted(bahn_id, &[StreamKind::OrientationSoll, StreamKind::OrientationIst])
            .await?;

        let orientations: Vec<Vec<SignalPoint>> = fetched
            .iter()
            .map(|s| {
                s.points
                    .iter()
                    .filter(|p| matches!(p.payload, SignalPayload::Orientation { .. }))
                    .cloned()
                    .collect()
            })
            .collect();
        let slices: Vec<&[SignalPoint]> = orientations.iter().map(|s| s.as_slice()).collect();
        let times = normalize(&slices);

        let result = fetched
            .iter()
            .zip(orientations.iter())
            .zip(times)
            .map(|((series, points), time)| {
                let euler: Vec<[f64; 3]> = points
                    .iter()
                    .filter_map(|p| match &p.payload {
                        SignalPayload::Orientation { quaternion } => Some(quaternion.to_euler_degrees()),
                        _ => None,
                    })
                    .collect();
                let corrected = fix_discontinuities(&euler);

                EulerSeries {
                    stream: series.stream,
                    time,
                    roll: corrected.iter().map(|e| e[0]).collect(),
                    pitch: corrected.iter().map(|e| e[1]).collect(),
                    yaw: corrected.iter().map(|e| e[2]).collect(),
                }
            })
            .collect();

        Ok(result)
    }

    /// Sampling regularity of every measured stream between first and last event
    pub async fn sampling_consistency(
        &self,
        bahn_id: &str,
    ) -> AnalysisResult<BTreeMap<StreamKind, StreamConsistency>> {
        let events = self.repository.signal_series(bahn_id, StreamKind::Events).await?;
        let fetched = self.fetch_sorted(bahn_id, &StreamKind::MEASURED).await?;

        let streams: BTreeMap<StreamKind, Vec<SignalPoint>> =
            fetched.into_iter().map(|s| (s.stream, s.points)).collect();

        let report = check_consistency(&streams, &events.points)?;
        for (stream, stats) in &report {
            if stats.coefficient_of_variation > 10.0 {
                tracing::info!(
                    bahn_id,
                    %stream,
                    cv = stats.coefficient_of_variation,
                    "Irregular sampling detected"
                );
            }
        }
        Ok(report)
    }
}
