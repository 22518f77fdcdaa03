// Mapping of analysis errors onto HTTP responses
use crate::domain::error::AnalysisError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    Analysis(AnalysisError),
    NotFound(String),
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        ApiError::Analysis(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Analysis(err) => match err {
                AnalysisError::InsufficientData(_) => StatusCode::UNPROCESSABLE_ENTITY,
                AnalysisError::UpstreamTaskFailure(_)
                | AnalysisError::Network(_)
                | AnalysisError::Decode(_) => StatusCode::BAD_GATEWAY,
                AnalysisError::PollTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                AnalysisError::InvalidTimestamp(_) | AnalysisError::Cancelled => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Analysis(err) => err.to_string(),
            ApiError::NotFound(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.message(), "Request failed");
        } else {
            tracing::debug!(status = %status, error = %self.message(), "Request rejected");
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}
