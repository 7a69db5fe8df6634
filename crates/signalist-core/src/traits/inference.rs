//! AI inference collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One turn of the prompt sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

impl Content {
    /// A single-part user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            parts: vec![Part { text: text.into() }],
        }
    }
}

/// Generates text from a prompt.
///
/// The response is returned as raw JSON shaped like
/// `{ "candidates": [{ "content": { "parts": [{ "text": "..." }] } }] }`.
/// Callers must treat every field below `candidates[0]` as optional.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    fn name(&self) -> &str;

    async fn infer(&self, model: &str, contents: &[Content]) -> Result<serde_json::Value>;
}
