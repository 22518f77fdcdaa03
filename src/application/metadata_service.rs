// Metadata service - Start metadata calculations and track their poll loops
use crate::application::deviation_service::DeviationService;
use crate::application::task_poller::{PollHandle, PollState, TaskPoller};
use crate::domain::error::AnalysisResult;
use crate::domain::task::{MetadataRequest, TaskHandle};
use crate::infrastructure::response_cache::ResponseCache;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct MetadataStart {
    pub task_id: Option<String>,
    #[serde(flatten)]
    pub state: PollState,
}

type TaskTable = Arc<Mutex<HashMap<String, PollHandle>>>;

/// Tracks one poll loop per outstanding task.
///
/// A task leaves the live table as soon as it resolves. Its final state stays
/// readable from `resolved` for one TTL.
#[derive(Clone)]
pub struct MetadataService {
    poller: TaskPoller,
    deviation_service: DeviationService,
    tasks: TaskTable,
    resolved: ResponseCache<String, TaskHandle>,
}

fn lock(tasks: &TaskTable) -> MutexGuard<'_, HashMap<String, PollHandle>> {
    tasks.lock().unwrap_or_else(|p| p.into_inner())
}

impl MetadataService {
    pub fn new(poller: TaskPoller, deviation_service: DeviationService, resolved_ttl: Duration) -> Self {
        Self {
            poller,
            deviation_service,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            resolved: ResponseCache::new(resolved_ttl),
        }
    }

    /// Submit a calculation and track its poll loop until it resolves
    pub async fn start(&self, request: MetadataRequest) -> AnalysisResult<MetadataStart> {
        let handle = self.poller.submit(&request).await?;
        let state = handle.state();

        let Some(task_id) = handle.task_id().map(str::to_string) else {
            self.refresh_cached(request.bahn_id.as_deref());
            return Ok(MetadataStart { task_id: None, state });
        };

        let mut progress = handle.watch();
        lock(&self.tasks).insert(task_id.clone(), handle);

        let service = self.clone();
        let reaped_id = task_id.clone();
        let bahn_id = request.bahn_id;
        tokio::spawn(async move {
            // Err means the loop was cancelled and its entry is already gone
            let Ok(final_state) = progress
                .wait_for(PollState::is_terminal)
                .await
                .map(|state| state.clone())
            else {
                return;
            };
            service.reap(&reaped_id, final_state, bahn_id.as_deref());
        });

        Ok(MetadataStart {
            task_id: Some(task_id),
            state,
        })
    }

    fn reap(&self, task_id: &str, state: PollState, bahn_id: Option<&str>) {
        if lock(&self.tasks).remove(task_id).is_none() {
            return;
        }
        tracing::debug!(task_id, "Discarding resolved task");

        if matches!(state, PollState::Completed { .. }) {
            self.refresh_cached(bahn_id);
        }
        self.resolved.purge_expired();
        self.resolved.insert(task_id.to_string(), state.to_handle(task_id));
    }

    /// State of a running task, or the final state of one that resolved within
    /// the TTL. Unknown ids give `None`.
    pub fn status(&self, task_id: &str) -> Option<TaskHandle> {
        if let Some(handle) = lock(&self.tasks).get(task_id) {
            return Some(handle.state().to_handle(task_id));
        }
        self.resolved.get(&task_id.to_string())
    }

    /// Stop polling a task and forget it. `false` if the id is unknown.
    pub fn cancel(&self, task_id: &str) -> bool {
        let removed = lock(&self.tasks).remove(task_id);
        let key = task_id.to_string();
        let had_result = self.resolved.get(&key).is_some();
        self.resolved.invalidate(&key);

        if removed.is_some() {
            tracing::info!(task_id, "Metadata polling cancelled");
        }
        removed.is_some() || had_result
    }

    /// Tasks whose poll loop is still running
    pub fn outstanding(&self) -> usize {
        lock(&self.tasks).len()
    }

    fn refresh_cached(&self, bahn_id: Option<&str>) {
        if let Some(bahn_id) = bahn_id {
            self.deviation_service.invalidate(bahn_id);
        }
    }
}
