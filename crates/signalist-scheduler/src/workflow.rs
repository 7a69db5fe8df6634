//! Workflow definition — a named function of steps bound to triggers.

use async_trait::async_trait;
use signalist_core::error::Result;
use signalist_core::event::EventKind;

use crate::step::StepContext;

/// What starts a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerSpec {
    /// Run on every event of this kind.
    Event(EventKind),
    /// Run on a 5-field cron schedule (UTC), with no event payload.
    Cron(String),
}

/// A multi-step workflow.
///
/// `execute` is re-invoked from the top on every retry. Side effects must
/// live inside `ctx.run(..)` steps so completed work is replayed from the
/// run's checkpoints instead of repeated.
#[async_trait]
pub trait Workflow: Send + Sync {
    /// Stable identifier, e.g. `daily-news-summary`.
    fn id(&self) -> &str;

    fn triggers(&self) -> Vec<TriggerSpec>;

    /// Execute the workflow body; the returned JSON becomes the run output.
    async fn execute(&self, ctx: &StepContext) -> Result<serde_json::Value>;
}
