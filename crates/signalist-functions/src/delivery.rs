//! Delivery stage — sends one digest email per summary, concurrently.
//!
//! Entries without content are skipped, not attempted. A failed send is
//! logged and reported in its own outcome; the batch itself never fails.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use signalist_core::error::SignalistError;
use signalist_core::traits::mailer::{Mailer, NewsSummaryEmail};
use signalist_core::types::SummaryResult;
use signalist_scheduler::fan_out;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Skipped { email: String },
    Sent { email: String },
    Failed { email: String, error: String },
}

impl DeliveryOutcome {
    pub fn email(&self) -> &str {
        match self {
            DeliveryOutcome::Skipped { email }
            | DeliveryOutcome::Sent { email }
            | DeliveryOutcome::Failed { email, .. } => email,
        }
    }
}

/// Counts per outcome kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl DeliveryReport {
    pub fn from_outcomes(outcomes: &[DeliveryOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut report, o| {
            match o {
                DeliveryOutcome::Sent { .. } => report.sent += 1,
                DeliveryOutcome::Skipped { .. } => report.skipped += 1,
                DeliveryOutcome::Failed { .. } => report.failed += 1,
            }
            report
        })
    }
}

pub struct DeliveryStage {
    mailer: Arc<dyn Mailer>,
}

impl DeliveryStage {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// One outcome per summary, in input order.
    pub async fn deliver(&self, summaries: Vec<SummaryResult>, date: &str) -> Vec<DeliveryOutcome> {
        let outcomes = fan_out(summaries, |_, summary| async move {
            let Some(content) = summary.content else {
                return Ok(DeliveryOutcome::Skipped {
                    email: summary.entity.email,
                });
            };
            let email = NewsSummaryEmail {
                email: summary.entity.email.clone(),
                date: date.to_string(),
                news_content: content,
            };
            if self.mailer.send_news_summary_email(&email).await? {
                Ok(DeliveryOutcome::Sent { email: email.email })
            } else {
                Err(SignalistError::Mail("mailer did not send".into()))
            }
        })
        .await;

        let outcomes: Vec<DeliveryOutcome> = outcomes
            .into_iter()
            .map(|o| match o.result {
                Ok(outcome) => outcome,
                Err(failure) => {
                    tracing::warn!("⚠️ Digest email to {} failed: {}", o.item.entity.email, failure);
                    DeliveryOutcome::Failed {
                        email: o.item.entity.email,
                        error: failure.to_string(),
                    }
                }
            })
            .collect();

        let report = DeliveryReport::from_outcomes(&outcomes);
        tracing::info!(
            "📬 Digest delivery: {} sent, {} skipped, {} failed",
            report.sent,
            report.skipped,
            report.failed
        );
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use signalist_core::error::Result;
    use signalist_core::traits::mailer::WelcomeEmail;
    use signalist_core::types::EntityRecord;
    use std::sync::Mutex;

    /// Records every recipient; fails for addresses starting with "bad".
    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Mailer for Recording {
        async fn send_welcome_email(&self, _email: &WelcomeEmail) -> Result<bool> {
            Ok(true)
        }

        async fn send_news_summary_email(&self, email: &NewsSummaryEmail) -> Result<bool> {
            if email.email.starts_with("bad") {
                return Err(SignalistError::Mail("550 mailbox unavailable".into()));
            }
            if email.email.starts_with("quiet") {
                return Ok(false);
            }
            self.sent.lock().unwrap().push(email.email.clone());
            Ok(true)
        }
    }

    fn summary(email: &str, content: Option<&str>) -> SummaryResult {
        SummaryResult {
            entity: EntityRecord::new(email, "U"),
            content: content.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_none_content_is_skipped() {
        let mailer = Arc::new(Recording::default());
        let stage = DeliveryStage::new(mailer.clone());
        let outcomes = stage
            .deliver(
                vec![
                    summary("u1@x.test", Some("a")),
                    summary("u2@x.test", None),
                    summary("u3@x.test", Some("c")),
                    summary("u4@x.test", None),
                    summary("u5@x.test", Some("e")),
                ],
                "Monday, March 9, 2026",
            )
            .await;

        assert_eq!(outcomes.len(), 5);
        assert_eq!(mailer.sent.lock().unwrap().len(), 3);
        assert_eq!(
            DeliveryReport::from_outcomes(&outcomes),
            DeliveryReport { sent: 3, skipped: 2, failed: 0 }
        );
        assert_eq!(outcomes[1], DeliveryOutcome::Skipped { email: "u2@x.test".into() });
    }

    #[tokio::test]
    async fn test_failed_send_does_not_fail_batch() {
        let mailer = Arc::new(Recording::default());
        let stage = DeliveryStage::new(mailer.clone());
        let outcomes = stage
            .deliver(
                vec![
                    summary("ok@x.test", Some("a")),
                    summary("bad@x.test", Some("b")),
                    summary("quiet@x.test", Some("c")),
                ],
                "today",
            )
            .await;

        assert!(matches!(outcomes[0], DeliveryOutcome::Sent { .. }));
        match &outcomes[1] {
            DeliveryOutcome::Failed { email, error } => {
                assert_eq!(email, "bad@x.test");
                assert!(error.contains("550"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(matches!(outcomes[2], DeliveryOutcome::Failed { .. }));
        assert_eq!(outcomes[2].email(), "quiet@x.test");
    }
}
