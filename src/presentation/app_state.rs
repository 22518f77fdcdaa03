// Application state for HTTP handlers
use crate::application::deviation_service::DeviationService;
use crate::application::metadata_service::MetadataService;
use crate::application::streaming_service::StreamingDeviationService;
use crate::application::trajectory_service::TrajectoryService;

#[derive(Clone)]
pub struct AppState {
    pub deviation_service: DeviationService,
    pub streaming_service: StreamingDeviationService,
    pub trajectory_service: TrajectoryService,
    pub metadata_service: MetadataService,
    /// Brotli-compress bodies for clients that accept it
    pub compress: bool,
}
