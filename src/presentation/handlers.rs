// HTTP request handlers
use crate::domain::deviation::DeviationMetric;
use crate::domain::error::AnalysisResult;
use crate::domain::signal::StreamKind;
use crate::domain::task::MetadataRequest;
use crate::infrastructure::chunked_json::stream_from_receiver;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use crate::presentation::error::ApiError;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_SELECTOR: &str = "total";

const DEFAULT_TIMELINE_STREAMS: [StreamKind; 3] =
    [StreamKind::PositionIst, StreamKind::TwistIst, StreamKind::AccelIst];

#[derive(Deserialize)]
pub struct DeviationQuery {
    pub selector: Option<String>,
    /// Comma-separated metric names, streaming endpoint only
    pub metrics: Option<String>,
}

#[derive(Deserialize)]
pub struct SignalQuery {
    pub streams: Option<String>,
}

async fn respond<T: Serialize>(
    state: &AppState,
    headers: &HeaderMap,
    status: StatusCode,
    result: AnalysisResult<T>,
) -> Response {
    match result {
        Ok(data) => {
            let compress = state.compress && accepts_brotli(headers);
            match json_response(status, &data, compress).await {
                Ok(response) => response,
                Err(status) => status.into_response(),
            }
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

fn parse_metric(name: &str) -> Result<DeviationMetric, ApiError> {
    DeviationMetric::parse(name).ok_or_else(|| ApiError::NotFound(format!("unknown metric '{}'", name)))
}

/// Comma-separated list; unknown names are dropped
fn parse_list<T>(raw: Option<&str>, parse: impl Fn(&str) -> Option<T>) -> Vec<T> {
    raw.unwrap_or_default()
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .filter_map(|name| {
            let parsed = parse(name);
            if parsed.is_none() {
                tracing::warn!(name, "Ignoring unknown name in list");
            }
            parsed
        })
        .collect()
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Deviation plot of one metric
pub async fn deviation_plot(
    Path((bahn_id, metric)): Path<(String, String)>,
    Query(query): Query<DeviationQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let metric = match parse_metric(&metric) {
        Ok(metric) => metric,
        Err(e) => return e.into_response(),
    };
    let selector = query.selector.as_deref().unwrap_or(DEFAULT_SELECTOR);

    let result = state
        .deviation_service
        .deviation_plot(&bahn_id, metric, selector)
        .await;
    respond(&state, &headers, StatusCode::OK, result).await
}

/// Stream several deviation metrics (progressive loading)
pub async fn stream_deviations(
    Path(bahn_id): Path<String>,
    Query(query): Query<DeviationQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let mut metrics = parse_list(query.metrics.as_deref(), DeviationMetric::parse);
    if metrics.is_empty() {
        metrics = DeviationMetric::ALL.to_vec();
    }
    let selector = query.selector.as_deref().unwrap_or(DEFAULT_SELECTOR);
    let compress = state.compress && accepts_brotli(&headers);

    let rx = state
        .streaming_service
        .stream_deviations(&bahn_id, metrics, selector);
    stream_from_receiver(rx, compress).into_response()
}

/// Signal streams on a shared relative time axis
pub async fn signal_timeline(
    Path(bahn_id): Path<String>,
    Query(query): Query<SignalQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let mut streams = parse_list(query.streams.as_deref(), StreamKind::parse);
    if streams.is_empty() {
        streams = DEFAULT_TIMELINE_STREAMS.to_vec();
    }

    let result = state.trajectory_service.signal_timeline(&bahn_id, &streams).await;
    respond(&state, &headers, StatusCode::OK, result).await
}

/// Planned vs measured orientation as continuous Euler angles
pub async fn orientation_timeline(
    Path(bahn_id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let result = state.trajectory_service.orientation_timeline(&bahn_id).await;
    respond(&state, &headers, StatusCode::OK, result).await
}

/// Sampling consistency between the first and last event
pub async fn sampling_consistency(
    Path(bahn_id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let result = state.trajectory_service.sampling_consistency(&bahn_id).await;
    respond(&state, &headers, StatusCode::OK, result).await
}

/// Start a metadata calculation
pub async fn start_metadata(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(request): Json<MetadataRequest>,
) -> Response {
    let result = state.metadata_service.start(request).await;
    let status = match &result {
        Ok(started) if started.task_id.is_some() => StatusCode::ACCEPTED,
        _ => StatusCode::OK,
    };
    respond(&state, &headers, status, result).await
}

/// Stop polling a metadata calculation
pub async fn cancel_metadata(
    Path(task_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    if state.metadata_service.cancel(&task_id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        ApiError::NotFound(format!("unknown task '{}'", task_id)).into_response()
    }
}

/// State of a metadata calculation
pub async fn metadata_status(
    Path(task_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.metadata_service.status(&task_id) {
        Some(handle) => Json(handle).into_response(),
        None => ApiError::NotFound(format!("unknown task '{}'", task_id)).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_drops_unknown_names() {
        let metrics = parse_list(Some("ea, dfd,,bogus,QDTW"), DeviationMetric::parse);
        assert_eq!(
            metrics,
            vec![DeviationMetric::Ea, DeviationMetric::Dfd, DeviationMetric::Qdtw]
        );
        assert!(parse_list(None, StreamKind::parse).is_empty());
    }
}
