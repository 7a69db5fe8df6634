//! Step context — checkpointed units of work inside a run.
//!
//! `ctx.run(name, f)` either returns the cached output recorded for `name`
//! by an earlier attempt of the same run, or executes `f`, records its
//! output in the run store, and returns it. A step never starts before the
//! previous step's output has been recorded.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use signalist_core::error::{Result, SignalistError};
use signalist_core::event::WorkflowEvent;

use crate::run::{StepRecord, Trigger, WorkflowRun};
use crate::store::RunStore;

/// Handle given to a workflow for one attempt of one run.
pub struct StepContext {
    run_id: String,
    workflow_id: String,
    attempt: u32,
    trigger: Trigger,
    cache: Mutex<HashMap<String, serde_json::Value>>,
    seen: Mutex<HashSet<String>>,
    store: Arc<dyn RunStore>,
    executed: AtomicU32,
    replayed: AtomicU32,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl StepContext {
    pub(crate) fn new(run: &WorkflowRun, attempt: u32, store: Arc<dyn RunStore>) -> Self {
        let cache = run
            .steps
            .iter()
            .map(|s| (s.name.clone(), s.output.clone()))
            .collect();
        Self {
            run_id: run.id.clone(),
            workflow_id: run.workflow_id.clone(),
            attempt,
            trigger: run.trigger.clone(),
            cache: Mutex::new(cache),
            seen: Mutex::new(HashSet::new()),
            store,
            executed: AtomicU32::new(0),
            replayed: AtomicU32::new(0),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// 1-based attempt number within this invocation of the runner.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    /// Triggering event; `None` for scheduled runs.
    pub fn event(&self) -> Option<&WorkflowEvent> {
        self.trigger.as_event()
    }

    /// Steps executed (not replayed) in this attempt.
    pub fn executed_steps(&self) -> u32 {
        self.executed.load(Ordering::Relaxed)
    }

    /// Steps served from cache in this attempt.
    pub fn replayed_steps(&self) -> u32 {
        self.replayed.load(Ordering::Relaxed)
    }

    /// Run a named step, or replay its recorded output.
    pub async fn run<T, F, Fut>(&self, name: &str, f: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !lock(&self.seen).insert(name.to_string()) {
            return Err(SignalistError::DuplicateStep(name.to_string()));
        }

        let cached = lock(&self.cache).get(name).cloned();
        if let Some(value) = cached {
            tracing::debug!("♻️ [{}] step '{}' replayed from cache", self.run_id, name);
            self.replayed.fetch_add(1, Ordering::Relaxed);
            return serde_json::from_value(value).map_err(|e| SignalistError::step(name, e.into()));
        }

        tracing::debug!("▶️ [{}] step '{}' started", self.run_id, name);
        self.executed.fetch_add(1, Ordering::Relaxed);
        let output = f().await.map_err(|e| SignalistError::step(name, e))?;

        let value = serde_json::to_value(&output).map_err(|e| SignalistError::step(name, e.into()))?;
        let record = StepRecord {
            name: name.to_string(),
            output: value.clone(),
            completed_at: Utc::now(),
        };
        self.store
            .record_step(&self.run_id, &record)
            .map_err(|e| SignalistError::step(name, e))?;
        lock(&self.cache).insert(name.to_string(), value);

        tracing::debug!("✅ [{}] step '{}' recorded", self.run_id, name);
        Ok(output)
    }
}
