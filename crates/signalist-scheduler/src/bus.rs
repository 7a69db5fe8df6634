//! Event bus — routes typed events to subscribed workflows.
//!
//! `send` is fire-and-forget: the event is queued and every subscriber is
//! started as its own run on the dispatch loop. `dispatch` runs the
//! subscribers inline and waits for their terminal results.

use std::sync::Arc;

use signalist_core::error::{Result, SignalistError};
use signalist_core::event::{Event, WorkflowEvent};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::run::{TerminalResult, Trigger};
use crate::runner::StepRunner;

enum Dispatch {
    Event(WorkflowEvent),
    Schedule { workflow_id: String, cron: String },
}

/// Cloneable handle for publishing events.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<Dispatch>,
    runner: Arc<StepRunner>,
}

impl EventBus {
    /// Start the dispatch loop. The loop ends once every `EventBus` clone is
    /// dropped and all runs it started have finished.
    pub fn start(runner: Arc<StepRunner>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(dispatch_loop(rx, runner.clone()));
        (Self { tx, runner }, handle)
    }

    pub fn runner(&self) -> &Arc<StepRunner> {
        &self.runner
    }

    /// Queue a typed event for asynchronous dispatch.
    pub fn send(&self, event: impl Into<WorkflowEvent>) -> Result<()> {
        let event = event.into();
        tracing::debug!("📨 Event queued: {}", event.name());
        self.tx
            .send(Dispatch::Event(event))
            .map_err(|_| SignalistError::BusClosed)
    }

    /// Validate an untyped event and queue it.
    pub fn send_raw(&self, event: Event) -> Result<()> {
        let typed = WorkflowEvent::try_from(event)?;
        self.send(typed)
    }

    /// Queue a scheduled run of one workflow.
    pub fn fire_schedule(&self, workflow_id: &str, cron: &str) -> Result<()> {
        self.tx
            .send(Dispatch::Schedule {
                workflow_id: workflow_id.to_string(),
                cron: cron.to_string(),
            })
            .map_err(|_| SignalistError::BusClosed)
    }

    /// Run every subscriber of `event` now and wait for all of them.
    pub async fn dispatch(&self, event: impl Into<WorkflowEvent>) -> Vec<TerminalResult> {
        self.runner.run_subscribers(event.into()).await
    }
}

async fn dispatch_loop(mut rx: mpsc::UnboundedReceiver<Dispatch>, runner: Arc<StepRunner>) {
    let mut in_flight: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            message = rx.recv() => {
                let Some(message) = message else { break };
                let runner = runner.clone();
                match message {
                    Dispatch::Event(event) => {
                        in_flight.spawn(async move {
                            runner.run_subscribers(event).await;
                        });
                    }
                    Dispatch::Schedule { workflow_id, cron } => {
                        in_flight.spawn(async move {
                            if let Err(e) = runner.run(&workflow_id, Trigger::schedule(&cron)).await {
                                tracing::error!("❌ Scheduled run of '{}' not started: {}", workflow_id, e);
                            }
                        });
                    }
                }
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!("❌ Dispatch task aborted: {}", e);
                }
            }
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            tracing::error!("❌ Dispatch task aborted: {}", e);
        }
    }
    tracing::info!("📪 Event bus closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use crate::step::StepContext;
    use crate::store::{MemoryRunStore, RunStore};
    use crate::workflow::{TriggerSpec, Workflow};
    use async_trait::async_trait;
    use signalist_core::event::{EventKind, UserCreated};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Greeter {
        id: &'static str,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Workflow for Greeter {
        fn id(&self) -> &str {
            self.id
        }

        fn triggers(&self) -> Vec<TriggerSpec> {
            vec![TriggerSpec::Event(EventKind::UserCreated)]
        }

        async fn execute(&self, ctx: &StepContext) -> Result<serde_json::Value> {
            let email = match ctx.event() {
                Some(WorkflowEvent::UserCreated(user)) => user.email.clone(),
                _ => return Err(SignalistError::Fatal("missing event".into())),
            };
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::json!({ "email": email }))
        }
    }

    fn user(email: &str) -> UserCreated {
        UserCreated {
            email: email.into(),
            name: "Ada".into(),
            ..Default::default()
        }
    }

    fn setup() -> (Arc<StepRunner>, Arc<Greeter>, Arc<Greeter>) {
        let a = Arc::new(Greeter { id: "greet-a", calls: AtomicU32::new(0) });
        let b = Arc::new(Greeter { id: "greet-b", calls: AtomicU32::new(0) });
        let mut runner = StepRunner::new(Arc::new(MemoryRunStore::new()), RetryPolicy::immediate(0));
        runner.register(a.clone()).unwrap();
        runner.register(b.clone()).unwrap();
        (Arc::new(runner), a, b)
    }

    #[tokio::test]
    async fn test_dispatch_runs_every_subscriber() {
        let (runner, a, b) = setup();
        let (bus, _handle) = EventBus::start(runner);

        let results = bus.dispatch(user("ada@example.com")).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.succeeded()));
        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
        assert_eq!(b.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_send_drains_on_shutdown() {
        let (runner, a, _b) = setup();
        let (bus, handle) = EventBus::start(runner.clone());

        bus.send(user("one@example.com")).unwrap();
        bus.send(user("two@example.com")).unwrap();
        drop(bus);
        handle.await.unwrap();

        assert_eq!(a.calls.load(Ordering::SeqCst), 2);
        assert_eq!(runner.store().list_runs(10).unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_send_raw_rejects_invalid_event() {
        let (runner, a, _b) = setup();
        let (bus, _handle) = EventBus::start(runner);

        let bad = Event::new("app/user.created", serde_json::json!({ "email": "" }));
        assert!(matches!(bus.send_raw(bad), Err(SignalistError::InvalidEvent(_))));
        let unknown = Event::new("app/nope", serde_json::json!({}));
        assert!(bus.send_raw(unknown).is_err());
        assert_eq!(a.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_event_without_subscribers() {
        let (runner, _a, _b) = setup();
        let (bus, _handle) = EventBus::start(runner);
        assert!(bus.dispatch(WorkflowEvent::SendDailyNews).await.is_empty());
    }
}
