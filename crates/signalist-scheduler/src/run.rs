//! Workflow run model — one execution of a workflow and its checkpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signalist_core::error::{Result, SignalistError};
use signalist_core::event::WorkflowEvent;

/// What started a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    Event { event: WorkflowEvent },
    Schedule { cron: String, fired_at: DateTime<Utc> },
}

impl Trigger {
    pub fn event(event: WorkflowEvent) -> Self {
        Trigger::Event { event }
    }

    pub fn schedule(cron: &str) -> Self {
        Trigger::Schedule {
            cron: cron.to_string(),
            fired_at: Utc::now(),
        }
    }

    /// Triggering event; `None` for scheduled runs.
    pub fn as_event(&self) -> Option<&WorkflowEvent> {
        match self {
            Trigger::Event { event } => Some(event),
            Trigger::Schedule { .. } => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Trigger::Event { event } => event.name().to_string(),
            Trigger::Schedule { cron, .. } => format!("cron({cron})"),
        }
    }
}

/// Run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(RunStatus::Pending),
            "succeeded" => Ok(RunStatus::Succeeded),
            "failed" => Ok(RunStatus::Failed),
            other => Err(SignalistError::Store(format!("Unknown run status '{other}'"))),
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed step and its cached output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub output: serde_json::Value,
    pub completed_at: DateTime<Utc>,
}

/// One execution instance of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: String,
    pub workflow_id: String,
    pub trigger: Trigger,
    /// Completed steps, in completion order.
    pub steps: Vec<StepRecord>,
    pub status: RunStatus,
    pub attempts: u32,
    pub error: Option<String>,
    pub output: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowRun {
    pub fn new(workflow_id: &str, trigger: Trigger) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workflow_id: workflow_id.to_string(),
            trigger,
            steps: Vec::new(),
            status: RunStatus::Pending,
            attempts: 0,
            error: None,
            output: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn step(&self, name: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn to_result(&self) -> TerminalResult {
        TerminalResult {
            run_id: self.id.clone(),
            workflow_id: self.workflow_id.clone(),
            status: self.status,
            attempts: self.attempts,
            output: self.output.clone(),
            error: self.error.clone(),
        }
    }
}

/// Outcome reported once a run stops executing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalResult {
    pub run_id: String,
    pub workflow_id: String,
    pub status: RunStatus,
    pub attempts: u32,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl TerminalResult {
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Succeeded
    }
}
