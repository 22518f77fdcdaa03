// Long-running backend computations and their status
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Running,
    Completed,
    Failed,
}

/// Body of `GET /task-status/{task_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusReport {
    pub status: TaskStatus,
    #[serde(default)]
    pub progress_percent: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Which trajectories a metadata calculation should cover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculationMode {
    Single,
    Missing,
    All,
}

/// Body of `POST /calculate-metadata`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRequest {
    pub mode: CalculationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bahn_id: Option<String>,
}

/// Response of `POST /calculate-metadata`. No `task_id` means it already finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResponse {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// An outstanding calculation we are polling
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskHandle {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
