//! User store collaborator.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::EntityRecord;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Every user who should receive the daily digest.
    async fn get_all_entities_for_digest(&self) -> Result<Vec<EntityRecord>>;

    /// Watchlist symbols for one user, in watchlist order.
    async fn get_watchlist_symbols(&self, email: &str) -> Result<Vec<String>>;
}
