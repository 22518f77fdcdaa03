// Task poller - Wait for a long-running backend calculation to resolve
use crate::application::trajectory_repository::TaskBackend;
use crate::domain::error::{AnalysisError, AnalysisResult};
use crate::domain::task::{MetadataRequest, TaskHandle, TaskStatus};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

const DEFAULT_FAILURE_MESSAGE: &str = "Metadata calculation failed";

/// Why a poll loop ended without a completed calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureCause {
    /// The backend reported the calculation as failed
    Upstream,
    /// A status request could not be made or decoded
    Network,
    Timeout { elapsed_secs: u64 },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PollState {
    Running {
        task_id: String,
        progress_percent: Option<f64>,
    },
    Completed {
        message: Option<String>,
    },
    Failed {
        error: String,
        cause: FailureCause,
    },
}

impl PollState {
    /// Terminal state for an error that ended the poll loop
    pub fn failed(err: AnalysisError) -> Self {
        let cause = match &err {
            AnalysisError::UpstreamTaskFailure(_) => FailureCause::Upstream,
            AnalysisError::PollTimeout { elapsed_secs, .. } => FailureCause::Timeout {
                elapsed_secs: *elapsed_secs,
            },
            AnalysisError::Cancelled => FailureCause::Cancelled,
            _ => FailureCause::Network,
        };
        let error = match err {
            AnalysisError::UpstreamTaskFailure(message) => message,
            other => other.to_string(),
        };
        PollState::Failed { error, cause }
    }

    /// Rebuild the error a failed state was created from
    pub fn into_error(self, task_id: &str) -> Option<AnalysisError> {
        let PollState::Failed { error, cause } = self else {
            return None;
        };
        Some(match cause {
            FailureCause::Upstream => AnalysisError::UpstreamTaskFailure(error),
            FailureCause::Network => AnalysisError::Network(error),
            FailureCause::Timeout { elapsed_secs } => AnalysisError::PollTimeout {
                task_id: task_id.to_string(),
                elapsed_secs,
            },
            FailureCause::Cancelled => AnalysisError::Cancelled,
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PollState::Completed { .. } | PollState::Failed { .. })
    }

    pub fn to_handle(&self, task_id: &str) -> TaskHandle {
        let (status, error) = match self {
            PollState::Running { .. } => (TaskStatus::Running, None),
            PollState::Completed { .. } => (TaskStatus::Completed, None),
            PollState::Failed { error, .. } => (TaskStatus::Failed, Some(error.clone())),
        };
        TaskHandle {
            task_id: task_id.to_string(),
            status,
            error,
        }
    }
}

/// One outstanding poll loop. Dropping the handle stops the loop.
#[derive(Debug)]
pub struct PollHandle {
    task_id: Option<String>,
    state: watch::Receiver<PollState>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    fn resolved(state: PollState) -> Self {
        let (_tx, rx) = watch::channel(state);
        Self {
            task_id: None,
            state: rx,
            task: None,
        }
    }

    /// `None` when the backend finished synchronously
    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    pub fn state(&self) -> PollState {
        self.state.borrow().clone()
    }

    /// Independent view of the state, usable after the handle is moved
    pub fn watch(&self) -> watch::Receiver<PollState> {
        self.state.clone()
    }

    /// Wait until the task resolves
    pub async fn finished(&mut self) -> PollState {
        match self.state.wait_for(PollState::is_terminal).await {
            Ok(state) => state.clone(),
            Err(_) => PollState::failed(AnalysisError::Cancelled),
        }
    }

    /// Stop polling now
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Clone)]
pub struct TaskPoller {
    backend: Arc<dyn TaskBackend>,
    interval: Duration,
    max_duration: Option<Duration>,
}

impl TaskPoller {
    pub fn new(backend: Arc<dyn TaskBackend>, interval: Duration, max_duration: Option<Duration>) -> Self {
        Self {
            backend,
            interval,
            max_duration,
        }
    }

    /// Submit a calculation. Without a task id in the response the handle is
    /// already completed; otherwise a poll loop runs until the handle resolves
    /// or is dropped.
    pub async fn submit(&self, request: &MetadataRequest) -> AnalysisResult<PollHandle> {
        let response = self.backend.calculate_metadata(request).await?;

        let Some(task_id) = response.task_id else {
            tracing::info!("Metadata calculation completed synchronously");
            return Ok(PollHandle::resolved(PollState::Completed {
                message: response.message,
            }));
        };

        tracing::info!(task_id = %task_id, "Metadata calculation started");
        if self.max_duration.is_none() {
            tracing::debug!(task_id = %task_id, "Polling without a time bound");
        }

        let (tx, rx) = watch::channel(PollState::Running {
            task_id: task_id.clone(),
            progress_percent: None,
        });

        let poller = self.clone();
        let loop_task_id = task_id.clone();
        let task = tokio::spawn(async move {
            let final_state = match poller.wait_for_task(&loop_task_id, &tx).await {
                Ok(message) => PollState::Completed { message },
                Err(err) => PollState::failed(err),
            };
            let _ = tx.send(final_state);
        });

        Ok(PollHandle {
            task_id: Some(task_id),
            state: rx,
            task: Some(task),
        })
    }

    /// Submit and wait for the outcome
    pub async fn run(&self, request: &MetadataRequest) -> AnalysisResult<Option<String>> {
        let mut handle = self.submit(request).await?;
        let task_id = handle.task_id().unwrap_or_default().to_string();
        match handle.finished().await {
            PollState::Completed { message } => Ok(message),
            failed @ PollState::Failed { .. } => Err(failed
                .into_error(&task_id)
                .unwrap_or(AnalysisError::Cancelled)),
            PollState::Running { .. } => Err(AnalysisError::Cancelled),
        }
    }

    /// Poll the status endpoint every interval until the task resolves.
    /// Progress is published on `progress`.
    async fn wait_for_task(
        &self,
        task_id: &str,
        progress: &watch::Sender<PollState>,
    ) -> AnalysisResult<Option<String>> {
        let started = Instant::now();
        let mut ticker = tokio::time::interval_at(started + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let report = self.backend.task_status(task_id).await.inspect_err(|e| {
                tracing::warn!(task_id, error = %e, "Task status request failed");
            })?;

            match report.status {
                TaskStatus::Completed => {
                    tracing::info!(task_id, "Task completed");
                    return Ok(None);
                }
                TaskStatus::Failed => {
                    let error = report
                        .error
                        .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
                    tracing::error!(task_id, error = %error, "Task failed");
                    return Err(AnalysisError::UpstreamTaskFailure(error));
                }
                TaskStatus::Running => {
                    tracing::debug!(task_id, progress = ?report.progress_percent, "Task still running");
                    let _ = progress.send(PollState::Running {
                        task_id: task_id.to_string(),
                        progress_percent: report.progress_percent,
                    });
                }
            }

            if let Some(limit) = self.max_duration {
                let elapsed = started.elapsed();
                if elapsed >= limit {
                    return Err(AnalysisError::PollTimeout {
                        task_id: task_id.to_string(),
                        elapsed_secs: elapsed.as_secs(),
                    });
                }
            }
        }
    }
}
