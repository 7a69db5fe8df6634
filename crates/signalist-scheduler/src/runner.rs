//! Step runner — creates runs, drives attempts, and applies the retry policy.
//!
//! Every attempt re-executes the workflow body with a fresh [`StepContext`]
//! loaded from the run store, so steps completed by earlier attempts are
//! replayed instead of re-invoked.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::join_all;
use signalist_core::error::{Result, SignalistError};
use signalist_core::event::{EventKind, WorkflowEvent};

use crate::fanout::panic_message;
use crate::retry::RetryPolicy;
use crate::run::{RunStatus, TerminalResult, Trigger, WorkflowRun};
use crate::step::StepContext;
use crate::store::RunStore;
use crate::workflow::{TriggerSpec, Workflow};

/// Executes registered workflows against a run store.
pub struct StepRunner {
    workflows: HashMap<String, Arc<dyn Workflow>>,
    store: Arc<dyn RunStore>,
    retry: RetryPolicy,
}

impl StepRunner {
    pub fn new(store: Arc<dyn RunStore>, retry: RetryPolicy) -> Self {
        Self {
            workflows: HashMap::new(),
            store,
            retry,
        }
    }

    /// Register a workflow. Ids must be unique.
    pub fn register(&mut self, workflow: Arc<dyn Workflow>) -> Result<()> {
        let id = workflow.id().to_string();
        if self.workflows.contains_key(&id) {
            return Err(SignalistError::Config(format!(
                "workflow '{id}' registered twice"
            )));
        }
        tracing::info!("🧩 Workflow registered: '{}'", id);
        self.workflows.insert(id, workflow);
        Ok(())
    }

    pub fn store(&self) -> &Arc<dyn RunStore> {
        &self.store
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Ids of workflows subscribed to an event kind, sorted.
    pub fn subscribers(&self, kind: EventKind) -> Vec<String> {
        let mut ids: Vec<String> = self
            .workflows
            .values()
            .filter(|w| w.triggers().contains(&TriggerSpec::Event(kind)))
            .map(|w| w.id().to_string())
            .collect();
        ids.sort();
        ids
    }

    /// `(workflow_id, cron expression)` for every cron trigger.
    pub fn cron_bindings(&self) -> Vec<(String, String)> {
        let mut bindings: Vec<(String, String)> = self
            .workflows
            .values()
            .flat_map(|w| {
                w.triggers().into_iter().filter_map(|t| match t {
                    TriggerSpec::Cron(expr) => Some((w.id().to_string(), expr)),
                    TriggerSpec::Event(_) => None,
                })
            })
            .collect();
        bindings.sort();
        bindings
    }

    /// Start a new run of `workflow_id` and drive it to a terminal state.
    ///
    /// `Err` is returned only when no run could be created (unknown workflow,
    /// store failure). Workflow failures are reported in the result.
    pub async fn run(&self, workflow_id: &str, trigger: Trigger) -> Result<TerminalResult> {
        let workflow = self.workflow(workflow_id)?;
        let run = WorkflowRun::new(workflow_id, trigger);
        self.store.create_run(&run)?;
        tracing::info!(
            "🚀 Run {} started: '{}' via {}",
            run.id,
            workflow_id,
            run.trigger.describe()
        );
        self.drive(workflow, run).await
    }

    /// Start one run per subscriber of `event` and wait for all of them.
    ///
    /// Subscribers that could not be started are logged and left out.
    pub async fn run_subscribers(&self, event: WorkflowEvent) -> Vec<TerminalResult> {
        let subscribers = self.subscribers(event.kind());
        if subscribers.is_empty() {
            tracing::warn!("⚠️ No workflow subscribed to {}", event.name());
            return Vec::new();
        }

        let runs = subscribers.iter().map(|id| {
            let trigger = Trigger::event(event.clone());
            async move {
                match self.run(id, trigger).await {
                    Ok(result) => Some(result),
                    Err(e) => {
                        tracing::error!("❌ Could not start '{}': {}", id, e);
                        None
                    }
                }
            }
        });
        join_all(runs).await.into_iter().flatten().collect()
    }

    /// Re-execute a persisted run that has not succeeded, reusing its
    /// recorded steps. Succeeded runs are returned as-is.
    pub async fn resume(&self, run_id: &str) -> Result<TerminalResult> {
        let run = self
            .store
            .load_run(run_id)?
            .ok_or_else(|| SignalistError::RunNotFound(run_id.to_string()))?;
        if run.status == RunStatus::Succeeded {
            return Ok(run.to_result());
        }
        let workflow = self.workflow(&run.workflow_id)?;
        tracing::info!(
            "⏯️ Run {} resumed: '{}' ({} cached steps)",
            run.id,
            run.workflow_id,
            run.steps.len()
        );
        self.drive(workflow, run).await
    }

    fn workflow(&self, workflow_id: &str) -> Result<Arc<dyn Workflow>> {
        self.workflows
            .get(workflow_id)
            .cloned()
            .ok_or_else(|| SignalistError::UnknownWorkflow(workflow_id.to_string()))
    }

    async fn drive(&self, workflow: Arc<dyn Workflow>, run: WorkflowRun) -> Result<TerminalResult> {
        let run_id = run.id.clone();
        let mut total_attempts = run.attempts;
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            total_attempts += 1;

            let snapshot = self
                .store
                .load_run(&run_id)?
                .ok_or_else(|| SignalistError::RunNotFound(run_id.clone()))?;
            let ctx = StepContext::new(&snapshot, attempt, self.store.clone());

            // Panics outside a fan-out fail the run.
            let body = AssertUnwindSafe(workflow.execute(&ctx)).catch_unwind();
            let outcome = match tokio::time::timeout(self.retry.attempt_timeout, body).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(payload)) => Err(SignalistError::Fatal(format!(
                    "workflow panicked: {}",
                    panic_message(payload.as_ref())
                ))),
                Err(_) => Err(SignalistError::Timeout(format!(
                    "attempt {attempt} exceeded {:?}",
                    self.retry.attempt_timeout
                ))),
            };

            match outcome {
                Ok(output) => {
                    self.store.update_run(
                        &run_id,
                        RunStatus::Succeeded,
                        total_attempts,
                        Some(&output),
                        None,
                    )?;
                    tracing::info!(
                        "🏁 Run {} succeeded: '{}' (attempt {}, {} executed, {} replayed)",
                        run_id,
                        workflow.id(),
                        attempt,
                        ctx.executed_steps(),
                        ctx.replayed_steps()
                    );
                    return Ok(TerminalResult {
                        run_id,
                        workflow_id: workflow.id().to_string(),
                        status: RunStatus::Succeeded,
                        attempts: total_attempts,
                        output: Some(output),
                        error: None,
                    });
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.backoff_for(attempt);
                    tracing::warn!(
                        "🔁 Run {} attempt {}/{} failed: {} (retrying in {:?})",
                        run_id,
                        attempt,
                        max_attempts,
                        e,
                        delay
                    );
                    self.store.update_run(
                        &run_id,
                        RunStatus::Pending,
                        total_attempts,
                        None,
                        Some(&e.to_string()),
                    )?;
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    let message = e.to_string();
                    tracing::error!(
                        "❌ Run {} failed: '{}' after {} attempt(s): {}",
                        run_id,
                        workflow.id(),
                        attempt,
                        message
                    );
                    self.store.update_run(
                        &run_id,
                        RunStatus::Failed,
                        total_attempts,
                        None,
                        Some(&message),
                    )?;
                    return Ok(TerminalResult {
                        run_id,
                        workflow_id: workflow.id().to_string(),
                        status: RunStatus::Failed,
                        attempts: total_attempts,
                        output: None,
                        error: Some(message),
                    });
                }
            }
        }
    }
}
