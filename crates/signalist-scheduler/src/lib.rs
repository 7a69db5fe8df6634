//! # Signalist Scheduler
//!
//! Durable step-workflow engine with an event bus and a cron scheduler.
//!
//! ## Architecture
//! ```text
//! EventBus.send(app/user.created)        SchedulerEngine (tokio interval)
//!   │                                       │  "0 1 * * *" → daily-news-summary
//!   └──────────────┬────────────────────────┘
//!                  ▼
//!          StepRunner.run(workflow_id, trigger)
//!            ├── WorkflowRun persisted in a RunStore (memory / SQLite)
//!            ├── ctx.run("step-a", ..) → executed, output checkpointed
//!            ├── ctx.run("step-b", ..) → fails (transient) → backoff → retry
//!            │     retry replays "step-a" from cache, re-executes "step-b"
//!            └── TerminalResult { succeeded | failed }
//!
//! Inside a step: fan_out(items, transform) → one isolated future per item,
//! joined in input order.
//! ```

pub mod bus;
pub mod cron;
pub mod engine;
pub mod fanout;
pub mod persistence;
pub mod retry;
pub mod run;
pub mod runner;
pub mod step;
pub mod store;
pub mod workflow;

pub use bus::EventBus;
pub use cron::CronSchedule;
pub use engine::{CronBinding, SchedulerEngine, spawn_scheduler};
pub use fanout::{ItemFailure, ItemOutcome, fan_out};
pub use persistence::SqliteRunStore;
pub use retry::RetryPolicy;
pub use run::{RunStatus, StepRecord, TerminalResult, Trigger, WorkflowRun};
pub use runner::StepRunner;
pub use step::StepContext;
pub use store::{MemoryRunStore, RunStore};
pub use workflow::{TriggerSpec, Workflow};
