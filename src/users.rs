//! JSON-file user store.
//!
//! The file holds an array of users:
//! `[{ "email": "...", "name": "...", "watchlistSymbols": ["AAPL"] }]`.
//! It is re-read on every call so edits apply to the next digest run.

use std::path::PathBuf;

use async_trait::async_trait;
use signalist_core::error::{Result, SignalistError};
use signalist_core::traits::UserStore;
use signalist_core::types::EntityRecord;

pub struct FileUserStore {
    path: PathBuf,
}

impl FileUserStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Result<Vec<EntityRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("⚠️ User file {} not found, no users", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(SignalistError::UserStore(format!(
                    "read {}: {e}",
                    self.path.display()
                )));
            }
        };
        let users: Vec<EntityRecord> = serde_json::from_str(&content).map_err(|e| {
            SignalistError::UserStore(format!("parse {}: {e}", self.path.display()))
        })?;
        Ok(users
            .into_iter()
            .filter(|u| !u.email.trim().is_empty())
            .collect())
    }
}

#[async_trait]
impl UserStore for FileUserStore {
    async fn get_all_entities_for_digest(&self) -> Result<Vec<EntityRecord>> {
        let users = self.load().await?;
        tracing::debug!("👥 {} users loaded from {}", users.len(), self.path.display());
        Ok(users)
    }

    async fn get_watchlist_symbols(&self, email: &str) -> Result<Vec<String>> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .map(|u| u.watchlist_symbols)
            .unwrap_or_default())
    }
}
