//! Events that start workflows.
//!
//! The edge of the system speaks the untyped `{ name, data }` form. It is
//! converted once into [`WorkflowEvent`], a closed set whose payloads are
//! checked at compile time everywhere downstream.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SignalistError};

/// Untyped event as received from callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Event {
    pub fn new(name: &str, data: serde_json::Value) -> Self {
        Self {
            name: name.to_string(),
            data,
        }
    }
}

/// Payload of `app/user.created`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserCreated {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default, alias = "investmentGoals")]
    pub investment_goals: String,
    #[serde(default, alias = "riskTolerance")]
    pub risk_tolerance: String,
    #[serde(default, alias = "preferredIndustry")]
    pub preferred_industry: String,
}

/// Every event a workflow can subscribe to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data")]
pub enum WorkflowEvent {
    #[serde(rename = "app/user.created")]
    UserCreated(UserCreated),
    #[serde(rename = "app/send-daily-news")]
    SendDailyNews,
}

/// Payload-free discriminant of [`WorkflowEvent`], used for subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    UserCreated,
    SendDailyNews,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::UserCreated => "app/user.created",
            EventKind::SendDailyNews => "app/send-daily-news",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl WorkflowEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            WorkflowEvent::UserCreated(_) => EventKind::UserCreated,
            WorkflowEvent::SendDailyNews => EventKind::SendDailyNews,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }
}

impl TryFrom<Event> for WorkflowEvent {
    type Error = SignalistError;

    fn try_from(event: Event) -> Result<Self> {
        match event.name.as_str() {
            "app/user.created" => {
                let payload: UserCreated = serde_json::from_value(event.data).map_err(|e| {
                    SignalistError::InvalidEvent(format!("app/user.created payload: {e}"))
                })?;
                if payload.email.trim().is_empty() {
                    return Err(SignalistError::InvalidEvent(
                        "app/user.created requires a non-empty email".into(),
                    ));
                }
                Ok(WorkflowEvent::UserCreated(payload))
            }
            "app/send-daily-news" => Ok(WorkflowEvent::SendDailyNews),
            other => Err(SignalistError::InvalidEvent(format!(
                "unknown event name '{other}'"
            ))),
        }
    }
}

impl From<UserCreated> for WorkflowEvent {
    fn from(payload: UserCreated) -> Self {
        WorkflowEvent::UserCreated(payload)
    }
}
