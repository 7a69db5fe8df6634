//! Run store — where runs and their step checkpoints are recorded.
//!
//! The step cache is append-only and keyed by step name, so recording the
//! same name twice for one run is an error.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use signalist_core::error::{Result, SignalistError};

use crate::run::{RunStatus, StepRecord, WorkflowRun};

/// Durable storage for workflow runs.
pub trait RunStore: Send + Sync {
    /// Persist a freshly created run.
    fn create_run(&self, run: &WorkflowRun) -> Result<()>;

    /// Load a run together with its completed steps.
    fn load_run(&self, run_id: &str) -> Result<Option<WorkflowRun>>;

    /// Append a completed step to a run.
    fn record_step(&self, run_id: &str, record: &StepRecord) -> Result<()>;

    /// Update status bookkeeping after an attempt.
    fn update_run(
        &self,
        run_id: &str,
        status: RunStatus,
        attempts: u32,
        output: Option<&serde_json::Value>,
        error: Option<&str>,
    ) -> Result<()>;

    /// Most recent runs first.
    fn list_runs(&self, limit: usize) -> Result<Vec<WorkflowRun>>;
}

/// In-memory run store. Runs vanish with the process.
#[derive(Default)]
pub struct MemoryRunStore {
    runs: Mutex<HashMap<String, WorkflowRun>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn runs(&self) -> MutexGuard<'_, HashMap<String, WorkflowRun>> {
        self.runs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RunStore for MemoryRunStore {
    fn create_run(&self, run: &WorkflowRun) -> Result<()> {
        let mut runs = self.runs();
        if runs.contains_key(&run.id) {
            return Err(SignalistError::Store(format!("run {} already exists", run.id)));
        }
        runs.insert(run.id.clone(), run.clone());
        Ok(())
    }

    fn load_run(&self, run_id: &str) -> Result<Option<WorkflowRun>> {
        Ok(self.runs().get(run_id).cloned())
    }

    fn record_step(&self, run_id: &str, record: &StepRecord) -> Result<()> {
        let mut runs = self.runs();
        let run = runs
            .get_mut(run_id)
            .ok_or_else(|| SignalistError::RunNotFound(run_id.to_string()))?;
        if run.step(&record.name).is_some() {
            return Err(SignalistError::Store(format!(
                "step '{}' already recorded for run {run_id}",
                record.name
            )));
        }
        run.steps.push(record.clone());
        run.updated_at = Utc::now();
        Ok(())
    }

    fn update_run(
        &self,
        run_id: &str,
        status: RunStatus,
        attempts: u32,
        output: Option<&serde_json::Value>,
        error: Option<&str>,
    ) -> Result<()> {
        let mut runs = self.runs();
        let run = runs
            .get_mut(run_id)
            .ok_or_else(|| SignalistError::RunNotFound(run_id.to_string()))?;
        run.status = status;
        run.attempts = attempts;
        run.output = output.cloned();
        run.error = error.map(str::to_string);
        run.updated_at = Utc::now();
        Ok(())
    }

    fn list_runs(&self, limit: usize) -> Result<Vec<WorkflowRun>> {
        let mut runs: Vec<WorkflowRun> = self.runs().values().cloned().collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        runs.truncate(limit);
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::Trigger;

    fn record(name: &str) -> StepRecord {
        StepRecord {
            name: name.to_string(),
            output: serde_json::json!({"ok": name}),
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn test_record_and_load() {
        let store = MemoryRunStore::new();
        let run = WorkflowRun::new("wf", Trigger::schedule("* * * * *"));
        store.create_run(&run).unwrap();
        store.record_step(&run.id, &record("a")).unwrap();
        store.record_step(&run.id, &record("b")).unwrap();

        let loaded = store.load_run(&run.id).unwrap().unwrap();
        let names: Vec<_> = loaded.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_step_rejected() {
        let store = MemoryRunStore::new();
        let run = WorkflowRun::new("wf", Trigger::schedule("* * * * *"));
        store.create_run(&run).unwrap();
        store.record_step(&run.id, &record("a")).unwrap();
        assert!(store.record_step(&run.id, &record("a")).is_err());
    }

    #[test]
    fn test_unknown_run() {
        let store = MemoryRunStore::new();
        assert!(store.load_run("missing").unwrap().is_none());
        assert!(matches!(
            store.record_step("missing", &record("a")),
            Err(SignalistError::RunNotFound(_))
        ));
    }

    #[test]
    fn test_update_status() {
        let store = MemoryRunStore::new();
        let run = WorkflowRun::new("wf", Trigger::schedule("* * * * *"));
        store.create_run(&run).unwrap();
        store
            .update_run(&run.id, RunStatus::Failed, 4, None, Some("boom"))
            .unwrap();
        let loaded = store.load_run(&run.id).unwrap().unwrap();
        assert_eq!(loaded.status, RunStatus::Failed);
        assert_eq!(loaded.attempts, 4);
        assert_eq!(loaded.error.as_deref(), Some("boom"));
        assert_eq!(store.list_runs(10).unwrap().len(), 1);
    }
}
