//! Domain records passed between workflow steps.
//!
//! All of them are serializable because step outputs are checkpointed as JSON.

use serde::{Deserialize, Serialize};

/// A user who receives the daily digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "watchlistSymbols")]
    pub watchlist_symbols: Vec<String>,
}

impl EntityRecord {
    pub fn new(email: &str, name: &str) -> Self {
        Self {
            email: email.to_string(),
            name: name.to_string(),
            watchlist_symbols: Vec::new(),
        }
    }
}

/// A market news article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
    /// Publication time, unix seconds.
    #[serde(default)]
    pub datetime: i64,
}

/// Output of the fetch stage for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserNews {
    pub entity: EntityRecord,
    pub articles: Vec<Article>,
}

/// Output of the summarization stage for one user.
///
/// `content == None` means "do not send anything to this user".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub entity: EntityRecord,
    pub content: Option<String>,
}

impl SummaryResult {
    pub fn skipped(entity: EntityRecord) -> Self {
        Self {
            entity,
            content: None,
        }
    }
}
