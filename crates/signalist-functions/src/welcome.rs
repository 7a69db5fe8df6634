//! `sign-up-email` — personalized welcome email for every new user.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use signalist_core::error::{Result, SignalistError};
use signalist_core::event::{EventKind, WorkflowEvent};
use signalist_core::traits::mailer::{Mailer, WelcomeEmail};
use signalist_core::types::EntityRecord;
use signalist_providers::summarize::{FallbackPolicy, SummarizationAdapter, WELCOME_FALLBACK_INTRO};
use signalist_scheduler::{StepContext, TriggerSpec, Workflow};

use crate::prompts::{WELCOME_EMAIL_PROMPT, user_profile};

pub const SIGN_UP_EMAIL_ID: &str = "sign-up-email";

pub struct SignUpEmail {
    adapter: Arc<SummarizationAdapter>,
    mailer: Arc<dyn Mailer>,
}

impl SignUpEmail {
    pub fn new(adapter: Arc<SummarizationAdapter>, mailer: Arc<dyn Mailer>) -> Self {
        Self { adapter, mailer }
    }
}

#[async_trait]
impl Workflow for SignUpEmail {
    fn id(&self) -> &str {
        SIGN_UP_EMAIL_ID
    }

    fn triggers(&self) -> Vec<TriggerSpec> {
        vec![TriggerSpec::Event(EventKind::UserCreated)]
    }

    async fn execute(&self, ctx: &StepContext) -> Result<serde_json::Value> {
        let Some(WorkflowEvent::UserCreated(user)) = ctx.event() else {
            return Err(SignalistError::Fatal(format!(
                "{SIGN_UP_EMAIL_ID} needs an app/user.created event, got {}",
                ctx.trigger().describe()
            )));
        };

        let intro: String = ctx
            .run("generate-welcome-intro", || async {
                let profile = user_profile(user);
                let summary = self
                    .adapter
                    .summarize(
                        WELCOME_EMAIL_PROMPT,
                        &[("userProfile", profile.as_str())],
                        EntityRecord::new(&user.email, &user.name),
                        FallbackPolicy::Welcome,
                    )
                    .await;
                Ok(summary
                    .content
                    .unwrap_or_else(|| WELCOME_FALLBACK_INTRO.to_string()))
            })
            .await?;

        let sent: bool = ctx
            .run("send-welcome-email", || async {
                self.mailer
                    .send_welcome_email(&WelcomeEmail {
                        email: user.email.clone(),
                        name: user.name.clone(),
                        intro,
                    })
                    .await
            })
            .await?;

        if !sent {
            tracing::warn!("⚠️ Welcome email to {} was not sent", user.email);
        }
        Ok(json!({
            "success": sent,
            "message": if sent { "Welcome email sent successfully" } else { "Welcome email was not sent" },
        }))
    }
}
