// Per-metric loading state with synchronous change notification
use crate::domain::deviation::DeviationMetric;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadState {
    NotLoaded,
    Loading,
    Loaded,
    Failed { error: String },
}

type Listener = Arc<dyn Fn(DeviationMetric, &LoadState) + Send + Sync>;

#[derive(Default)]
struct Inner {
    states: BTreeMap<DeviationMetric, LoadState>,
    listeners: BTreeMap<u64, Listener>,
    next_id: u64,
}

/// Loading flags keyed by metric. Each key changes independently.
#[derive(Clone, Default)]
pub struct LoadStateStore {
    inner: Arc<Mutex<Inner>>,
}

/// Keeps a listener registered. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    store: Weak<Mutex<Inner>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            if let Ok(mut inner) = store.lock() {
                inner.listeners.remove(&self.id);
            }
        }
    }
}

impl LoadStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, metric: DeviationMetric) -> LoadState {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.states.get(&metric).cloned())
            .unwrap_or(LoadState::NotLoaded)
    }

    pub fn snapshot(&self) -> BTreeMap<DeviationMetric, LoadState> {
        self.inner
            .lock()
            .map(|inner| inner.states.clone())
            .unwrap_or_default()
    }

    /// Register a listener called on every state change
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(DeviationMetric, &LoadState) + Send + Sync + 'static,
    {
        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.insert(id, Arc::new(listener));

        Subscription {
            id,
            store: Arc::downgrade(&self.inner),
        }
    }

    /// Update one metric and notify listeners. The lock is released before
    /// listeners run, so they may read the store.
    pub fn set(&self, metric: DeviationMetric, state: LoadState) {
        let listeners: Vec<Listener> = {
            let mut inner = match self.inner.lock() {
                Ok(inner) => inner,
                Err(poisoned) => poisoned.into_inner(),
            };
            if inner.states.get(&metric) == Some(&state) {
                return;
            }
            inner.states.insert(metric, state.clone());
            inner.listeners.values().cloned().collect()
        };

        for listener in listeners {
            listener(metric, &state);
        }
    }
}
