//! Scheduler Engine — the loop that fires cron-bound workflows.
//! Uses tokio::interval for ticking; each due binding is handed to the
//! event bus as a scheduled run.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use signalist_core::error::Result;
use tokio::sync::Mutex;

use crate::bus::EventBus;
use crate::cron::CronSchedule;
use crate::runner::StepRunner;

/// A workflow bound to a cron schedule.
#[derive(Debug, Clone)]
pub struct CronBinding {
    pub workflow_id: String,
    pub schedule: CronSchedule,
    pub next_run: Option<DateTime<Utc>>,
    pub last_run: Option<DateTime<Utc>>,
    pub run_count: u64,
}

impl CronBinding {
    fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_run.is_some_and(|at| at <= now)
    }
}

/// Tracks cron bindings and reports which are due.
#[derive(Debug, Default)]
pub struct SchedulerEngine {
    bindings: Vec<CronBinding>,
}

impl SchedulerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an engine from every cron trigger registered on the runner.
    pub fn from_runner(runner: &StepRunner) -> Result<Self> {
        Self::from_runner_at(runner, Utc::now())
    }

    fn from_runner_at(runner: &StepRunner, now: DateTime<Utc>) -> Result<Self> {
        let mut engine = Self::new();
        for (workflow_id, expression) in runner.cron_bindings() {
            engine.add_binding_at(&workflow_id, &expression, now)?;
        }
        Ok(engine)
    }

    /// Bind a workflow to a cron expression. Invalid expressions are rejected.
    pub fn add_binding(&mut self, workflow_id: &str, expression: &str) -> Result<()> {
        self.add_binding_at(workflow_id, expression, Utc::now())
    }

    fn add_binding_at(&mut self, workflow_id: &str, expression: &str, now: DateTime<Utc>) -> Result<()> {
        let schedule = CronSchedule::parse(expression)?;
        let next_run = schedule.next_after(now);
        tracing::info!(
            "📅 Cron binding: '{}' at \"{}\" (next: {})",
            workflow_id,
            expression,
            next_run.map(|t| t.to_rfc3339()).unwrap_or_else(|| "never".into())
        );
        self.bindings.push(CronBinding {
            workflow_id: workflow_id.to_string(),
            schedule,
            next_run,
            last_run: None,
            run_count: 0,
        });
        Ok(())
    }

    pub fn bindings(&self) -> &[CronBinding] {
        &self.bindings
    }

    /// Advance every due binding and return `(workflow_id, expression)` for
    /// each one that fired. A binding fires at most once per tick even when
    /// several of its slots were missed.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<(String, String)> {
        let mut fired = Vec::new();
        for binding in self.bindings.iter_mut().filter(|b| b.is_due(now)) {
            tracing::info!("🔔 Cron fired: '{}'", binding.workflow_id);
            binding.last_run = Some(now);
            binding.run_count += 1;
            binding.next_run = binding.schedule.next_after(now);
            fired.push((
                binding.workflow_id.clone(),
                binding.schedule.expression().to_string(),
            ));
        }
        fired
    }
}

/// Spawn the scheduler loop as a background tokio task.
///
/// Due bindings are queued on the bus; the loop exits when the bus closes.
pub async fn spawn_scheduler(engine: Arc<Mutex<SchedulerEngine>>, bus: EventBus, check_interval_secs: u64) {
    tracing::info!("⏰ Scheduler started (check every {}s)", check_interval_secs);

    let mut interval = tokio::time::interval(std::time::Duration::from_secs(check_interval_secs.max(1)));

    loop {
        interval.tick().await;

        let fired = {
            let mut eng = engine.lock().await;
            eng.tick(Utc::now())
        };

        for (workflow_id, expression) in &fired {
            if let Err(e) = bus.fire_schedule(workflow_id, expression) {
                tracing::warn!("⚠️ Scheduler stopping: {}", e);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use crate::step::StepContext;
    use crate::store::MemoryRunStore;
    use crate::workflow::{TriggerSpec, Workflow};
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct Nightly;

    #[async_trait]
    impl Workflow for Nightly {
        fn id(&self) -> &str {
            "nightly"
        }

        fn triggers(&self) -> Vec<TriggerSpec> {
            vec![TriggerSpec::Cron("0 1 * * *".into())]
        }

        async fn execute(&self, _ctx: &StepContext) -> Result<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, m, 0).unwrap()
    }

    #[test]
    fn test_bindings_from_runner() {
        let mut runner = StepRunner::new(Arc::new(MemoryRunStore::new()), RetryPolicy::immediate(0));
        runner.register(Arc::new(Nightly)).unwrap();

        let engine = SchedulerEngine::from_runner_at(&runner, at(0, 30)).unwrap();
        assert_eq!(engine.bindings().len(), 1);
        assert_eq!(engine.bindings()[0].next_run, Some(at(1, 0)));
    }

    #[test]
    fn test_tick_fires_once_and_advances() {
        let mut engine = SchedulerEngine::new();
        engine.add_binding_at("nightly", "0 1 * * *", at(0, 30)).unwrap();

        assert!(engine.tick(at(0, 59)).is_empty());

        let fired = engine.tick(at(1, 0));
        assert_eq!(fired, vec![("nightly".to_string(), "0 1 * * *".to_string())]);
        assert!(engine.tick(at(1, 0)).is_empty());

        let binding = &engine.bindings()[0];
        assert_eq!(binding.run_count, 1);
        assert_eq!(binding.last_run, Some(at(1, 0)));
        assert_eq!(
            binding.next_run,
            Some(Utc.with_ymd_and_hms(2026, 3, 11, 1, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_missed_slots_fire_once() {
        let mut engine = SchedulerEngine::new();
        engine.add_binding_at("every-5", "*/5 * * * *", at(0, 0)).unwrap();
        assert_eq!(engine.tick(at(0, 30)).len(), 1);
        assert_eq!(engine.bindings()[0].next_run, Some(at(0, 35)));
    }

    #[test]
    fn test_invalid_cron_rejected() {
        let mut engine = SchedulerEngine::new();
        assert!(engine.add_binding("bad", "61 * * * *").is_err());
        assert!(engine.bindings().is_empty());
    }
}
