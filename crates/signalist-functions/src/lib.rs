//! # Signalist Functions
//!
//! The two Signalist workflows and the stages they are built from:
//! - `sign-up-email` on `app/user.created`
//! - `daily-news-summary` on `app/send-daily-news` and a daily cron

pub mod delivery;
pub mod digest;
pub mod policy;
pub mod prompts;
pub mod welcome;

use std::sync::Arc;

use signalist_core::config::SignalistConfig;
use signalist_core::error::Result;
use signalist_core::traits::{InferenceClient, Mailer, NewsSource, UserStore};
use signalist_providers::SummarizationAdapter;
use signalist_scheduler::StepRunner;

pub use delivery::{DeliveryOutcome, DeliveryReport, DeliveryStage};
pub use digest::{DAILY_NEWS_SUMMARY_ID, DIGEST_NO_NEWS_CONTENT, DailyNewsSummary};
pub use policy::FallbackCapPolicy;
pub use welcome::{SIGN_UP_EMAIL_ID, SignUpEmail};

/// External services the workflows call.
#[derive(Clone)]
pub struct Collaborators {
    pub users: Arc<dyn UserStore>,
    pub news: Arc<dyn NewsSource>,
    pub inference: Arc<dyn InferenceClient>,
    pub mailer: Arc<dyn Mailer>,
}

/// Register both workflows on `runner`.
pub fn register_all(runner: &mut StepRunner, deps: Collaborators, config: &SignalistConfig) -> Result<()> {
    let adapter = Arc::new(SummarizationAdapter::new(
        deps.inference,
        &config.inference.welcome_model,
        &config.inference.digest_model,
    ));

    runner.register(Arc::new(SignUpEmail::new(adapter.clone(), deps.mailer.clone())))?;
    runner.register(Arc::new(DailyNewsSummary::new(
        deps.users,
        deps.news,
        adapter,
        DeliveryStage::new(deps.mailer),
        FallbackCapPolicy::new(config.digest.article_cap),
        &config.scheduler.digest_cron,
    )))?;
    Ok(())
}
