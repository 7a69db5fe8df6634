//! Error type shared by every Signalist crate.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SignalistError>;

#[derive(Debug, Error)]
pub enum SignalistError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Unknown workflow: {0}")]
    UnknownWorkflow(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Step '{0}' executed twice in the same run")]
    DuplicateStep(String),

    #[error("Step '{step}' failed: {source}")]
    Step {
        step: String,
        #[source]
        source: Box<SignalistError>,
    },

    #[error("User store error: {0}")]
    UserStore(String),

    #[error("News error: {0}")]
    News(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Run store error: {0}")]
    Store(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Event bus is closed")]
    BusClosed,

    #[error("Fatal: {0}")]
    Fatal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SignalistError {
    /// Wrap an error raised inside a named step.
    pub fn step(step: &str, source: SignalistError) -> Self {
        Self::Step {
            step: step.to_string(),
            source: Box::new(source),
        }
    }

    /// Whether a failed run attempt may be retried.
    ///
    /// Collaborator, store and timeout failures are transient. Anything that
    /// would fail the same way on every attempt is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Step { source, .. } => source.is_transient(),
            Self::UserStore(_)
            | Self::News(_)
            | Self::Inference(_)
            | Self::Mail(_)
            | Self::Http(_)
            | Self::Store(_)
            | Self::Timeout(_)
            | Self::Io(_) => true,
            Self::Config(_)
            | Self::InvalidEvent(_)
            | Self::UnknownWorkflow(_)
            | Self::RunNotFound(_)
            | Self::DuplicateStep(_)
            | Self::BusClosed
            | Self::Fatal(_)
            | Self::Serialization(_) => false,
        }
    }
}
