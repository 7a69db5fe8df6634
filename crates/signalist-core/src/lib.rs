//! # Signalist Core
//!
//! Shared building blocks for the Signalist notification pipeline:
//! typed events, domain records, collaborator traits, the error type,
//! and the TOML configuration system.
//!
//! Every external service (user store, news feed, AI inference, mail) is
//! reached through a trait defined here, so workflows can be exercised
//! against in-memory doubles.

pub mod config;
pub mod error;
pub mod event;
pub mod traits;
pub mod types;

pub use config::SignalistConfig;
pub use error::{Result, SignalistError};
pub use event::{Event, EventKind, UserCreated, WorkflowEvent};
pub use types::{Article, EntityRecord, SummaryResult, UserNews};
