// Route table
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    cancel_metadata, deviation_plot, health_check, metadata_status, orientation_timeline,
    sampling_consistency, signal_timeline, start_metadata, stream_deviations,
};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/bahnen/:id/deviations", get(stream_deviations))
        .route("/bahnen/:id/deviations/:metric", get(deviation_plot))
        .route("/bahnen/:id/signals", get(signal_timeline))
        .route("/bahnen/:id/orientation", get(orientation_timeline))
        .route("/bahnen/:id/consistency", get(sampling_consistency))
        .route("/metadata", post(start_metadata))
        .route("/metadata/:task_id", get(metadata_status).delete(cancel_metadata))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
