//! Market news collaborator.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Article;

#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Fetch articles for the given symbols, or general market news when
    /// `symbols` is `None`.
    async fn get_news(&self, symbols: Option<&[String]>) -> Result<Vec<Article>>;
}
