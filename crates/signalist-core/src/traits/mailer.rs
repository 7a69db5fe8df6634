//! Mail delivery collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WelcomeEmail {
    pub email: String,
    pub name: String,
    pub intro: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsSummaryEmail {
    pub email: String,
    pub date: String,
    pub news_content: String,
}

/// Sends the two kinds of Signalist emails.
///
/// `Ok(false)` means the transport accepted the call but did not send.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_welcome_email(&self, email: &WelcomeEmail) -> Result<bool>;

    async fn send_news_summary_email(&self, email: &NewsSummaryEmail) -> Result<bool>;
}
