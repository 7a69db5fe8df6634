//! `daily-news-summary` — AI-written market digest for every user.
//!
//! ```text
//! get-all-users ──► fetch-user-news ──► summarize-news ──► send-news-emails
//!                   (fan-out, policy)   (fan-out, AI)      (fan-out, skip None)
//! ```
//! A user whose fetch fails gets no articles; a user with no articles gets
//! [`DIGEST_NO_NEWS_CONTENT`]; a user whose summary fails gets no email.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use signalist_core::error::Result;
use signalist_core::event::EventKind;
use signalist_core::traits::news::NewsSource;
use signalist_core::traits::users::UserStore;
use signalist_core::types::{Article, EntityRecord, SummaryResult, UserNews};
use signalist_providers::summarize::{FallbackPolicy, SummarizationAdapter};
use signalist_scheduler::{StepContext, TriggerSpec, Workflow, fan_out};

use crate::delivery::{DeliveryOutcome, DeliveryReport, DeliveryStage};
use crate::policy::FallbackCapPolicy;
use crate::prompts::NEWS_SUMMARY_EMAIL_PROMPT;

pub const DAILY_NEWS_SUMMARY_ID: &str = "daily-news-summary";

/// Digest body for a user with no articles at all.
pub const DIGEST_NO_NEWS_CONTENT: &str = "No market news available today.";

pub const NO_USERS_MESSAGE: &str = "No users found for news email.";

pub struct DailyNewsSummary {
    users: Arc<dyn UserStore>,
    news: Arc<dyn NewsSource>,
    adapter: Arc<SummarizationAdapter>,
    delivery: DeliveryStage,
    policy: FallbackCapPolicy,
    cron: String,
}

impl DailyNewsSummary {
    pub fn new(
        users: Arc<dyn UserStore>,
        news: Arc<dyn NewsSource>,
        adapter: Arc<SummarizationAdapter>,
        delivery: DeliveryStage,
        policy: FallbackCapPolicy,
        cron: &str,
    ) -> Self {
        Self {
            users,
            news,
            adapter,
            delivery,
            policy,
            cron: cron.to_string(),
        }
    }

    /// Watchlist news for one user, falling back to general news.
    async fn fetch_for(&self, entity: &EntityRecord) -> Result<Vec<Article>> {
        let symbols = if entity.watchlist_symbols.is_empty() {
            self.users.get_watchlist_symbols(&entity.email).await?
        } else {
            entity.watchlist_symbols.clone()
        };

        let primary = if symbols.is_empty() {
            Vec::new()
        } else {
            self.news.get_news(Some(&symbols)).await?
        };
        self.policy
            .apply(primary, || self.news.get_news(None))
            .await
    }

    async fn summarize_for(&self, user_news: UserNews) -> Result<SummaryResult> {
        if user_news.articles.is_empty() {
            return Ok(SummaryResult {
                entity: user_news.entity,
                content: Some(DIGEST_NO_NEWS_CONTENT.to_string()),
            });
        }
        let news_data = serde_json::to_string_pretty(&user_news.articles)?;
        Ok(self
            .adapter
            .summarize(
                NEWS_SUMMARY_EMAIL_PROMPT,
                &[("newsData", news_data.as_str())],
                user_news.entity,
                FallbackPolicy::Digest,
            )
            .await)
    }
}

/// e.g. "Monday, March 9, 2026".
pub fn format_digest_date(date: chrono::NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

#[async_trait]
impl Workflow for DailyNewsSummary {
    fn id(&self) -> &str {
        DAILY_NEWS_SUMMARY_ID
    }

    fn triggers(&self) -> Vec<TriggerSpec> {
        vec![
            TriggerSpec::Event(EventKind::SendDailyNews),
            TriggerSpec::Cron(self.cron.clone()),
        ]
    }

    async fn execute(&self, ctx: &StepContext) -> Result<serde_json::Value> {
        let users: Vec<EntityRecord> = ctx
            .run("get-all-users", || self.users.get_all_entities_for_digest())
            .await?;

        if users.is_empty() {
            tracing::info!("📭 {}", NO_USERS_MESSAGE);
            return Ok(json!({ "success": false, "message": NO_USERS_MESSAGE }));
        }

        let user_news: Vec<UserNews> = ctx
            .run("fetch-user-news", || async {
                let outcomes = fan_out(users, |_, entity| async move {
                    let articles = self.fetch_for(&entity).await?;
                    Ok(UserNews { entity, articles })
                })
                .await;
                Ok(outcomes
                    .into_iter()
                    .map(|o| match o.result {
                        Ok(news) => news,
                        Err(failure) => {
                            tracing::warn!("⚠️ News fetch for {} failed: {}", o.item.email, failure);
                            UserNews {
                                entity: o.item,
                                articles: Vec::new(),
                            }
                        }
                    })
                    .collect())
            })
            .await?;

        let summaries: Vec<SummaryResult> = ctx
            .run("summarize-news", || async {
                let outcomes = fan_out(user_news, |_, news| self.summarize_for(news)).await;
                Ok(outcomes
                    .into_iter()
                    .map(|o| match o.result {
                        Ok(summary) => summary,
                        Err(failure) => {
                            tracing::warn!(
                                "⚠️ Summary for {} failed: {}",
                                o.item.entity.email,
                                failure
                            );
                            SummaryResult::skipped(o.item.entity)
                        }
                    })
                    .collect())
            })
            .await?;

        let outcomes: Vec<DeliveryOutcome> = ctx
            .run("send-news-emails", || async {
                let date = format_digest_date(Utc::now().date_naive());
                Ok(self.delivery.deliver(summaries, &date).await)
            })
            .await?;
        let report = DeliveryReport::from_outcomes(&outcomes);

        Ok(json!({
            "success": true,
            "message": "Daily news summary emails sent successfully",
            "users": report.sent + report.skipped + report.failed,
            "sent": report.sent,
            "skipped": report.skipped,
            "failed": report.failed,
        }))
    }
}
