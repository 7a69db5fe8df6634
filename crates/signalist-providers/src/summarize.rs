//! AI summarization adapter.
//!
//! Fills a prompt template, makes exactly one inference call, and normalizes
//! the reply into a [`SummaryResult`]. Failures never propagate: each flow
//! picks what the user gets instead through [`FallbackPolicy`].

use std::sync::Arc;

use serde_json::Value;
use signalist_core::error::{Result, SignalistError};
use signalist_core::traits::inference::{Content, InferenceClient};
use signalist_core::types::{EntityRecord, SummaryResult};

/// Intro used in the welcome email when inference yields nothing usable.
pub const WELCOME_FALLBACK_INTRO: &str =
    "Thanks for joining Signalist. You now have the tools to track markets and make smarter moves.";

/// What a flow receives when summarization fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Fixed greeting; the welcome email is always sent.
    Welcome,
    /// No content; the user is skipped by delivery.
    Digest,
}

impl FallbackPolicy {
    fn fallback(&self) -> Option<String> {
        match self {
            FallbackPolicy::Welcome => Some(WELCOME_FALLBACK_INTRO.to_string()),
            FallbackPolicy::Digest => None,
        }
    }
}

pub struct SummarizationAdapter {
    client: Arc<dyn InferenceClient>,
    welcome_model: String,
    digest_model: String,
}

impl SummarizationAdapter {
    pub fn new(client: Arc<dyn InferenceClient>, welcome_model: &str, digest_model: &str) -> Self {
        Self {
            client,
            welcome_model: welcome_model.to_string(),
            digest_model: digest_model.to_string(),
        }
    }

    fn model(&self, policy: FallbackPolicy) -> &str {
        match policy {
            FallbackPolicy::Welcome => &self.welcome_model,
            FallbackPolicy::Digest => &self.digest_model,
        }
    }

    /// Render `template`, ask the model, and return its text for `entity`.
    pub async fn summarize(
        &self,
        template: &str,
        substitutions: &[(&str, &str)],
        entity: EntityRecord,
        policy: FallbackPolicy,
    ) -> SummaryResult {
        let prompt = render_prompt(template, substitutions);
        match self.generate(&prompt, policy).await {
            Ok(text) => SummaryResult {
                entity,
                content: Some(text),
            },
            Err(e) => {
                tracing::warn!(
                    "⚠️ Summarization for {} failed via {}: {} (falling back)",
                    entity.email,
                    self.client.name(),
                    e
                );
                SummaryResult {
                    entity,
                    content: policy.fallback(),
                }
            }
        }
    }

    async fn generate(&self, prompt: &str, policy: FallbackPolicy) -> Result<String> {
        let response = self
            .client
            .infer(self.model(policy), &[Content::user(prompt)])
            .await?;
        extract_text(&response).ok_or_else(|| {
            SignalistError::Inference("response has no candidates[0].content.parts[0].text".into())
        })
    }
}

/// Replace the first occurrence of each `{{key}}` with its value.
///
/// Placeholders are located in the template only, so values are inserted
/// verbatim and never rescanned. A missing placeholder is ignored.
pub fn render_prompt(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut spans: Vec<(usize, usize, &str)> = substitutions
        .iter()
        .filter_map(|(key, value)| {
            let placeholder = format!("{{{{{key}}}}}");
            template
                .find(&placeholder)
                .map(|start| (start, start + placeholder.len(), *value))
        })
        .collect();
    spans.sort_by_key(|&(start, _, _)| start);

    let mut out = String::with_capacity(template.len());
    let mut cursor = 0;
    for (start, end, value) in spans {
        // Repeated keys resolve to the same span; keep the first.
        if start < cursor {
            continue;
        }
        out.push_str(&template[cursor..start]);
        out.push_str(value);
        cursor = end;
    }
    out.push_str(&template[cursor..]);
    out
}

/// `candidates[0].content.parts[0].text`, if present and non-blank.
pub fn extract_text(response: &Value) -> Option<String> {
    response
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Returns a canned response and records the model and prompt it saw.
    struct Canned {
        response: Option<Value>,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl Canned {
        fn new(response: Option<Value>) -> Arc<Self> {
            Arc::new(Self {
                response,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl InferenceClient for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn infer(&self, model: &str, contents: &[Content]) -> Result<Value> {
            self.seen
                .lock()
                .unwrap()
                .push((model.to_string(), contents[0].parts[0].text.clone()));
            self.response
                .clone()
                .ok_or_else(|| SignalistError::Inference("boom".into()))
        }
    }

    fn reply(text: &str) -> Value {
        json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
    }

    fn adapter(client: Arc<Canned>) -> SummarizationAdapter {
        SummarizationAdapter::new(client, "welcome-model", "digest-model")
    }

    #[test]
    fn test_render_first_occurrence_only() {
        let out = render_prompt(
            "Hi {{name}}! {{name}} likes {{topic}}. {{unknown}}",
            &[("name", "Ada"), ("topic", "{{name}}")],
        );
        assert_eq!(out, "Hi Ada! {{name}} likes {{name}}. {{unknown}}");
    }

    #[test]
    fn test_render_does_not_rescan_inserted_values() {
        let out = render_prompt("A={{a}} B={{b}}", &[("a", "{{b}}"), ("b", "X")]);
        assert_eq!(out, "A={{b}} B=X");

        let out = render_prompt("{{b}} then {{a}}", &[("a", "1"), ("b", "2"), ("a", "3")]);
        assert_eq!(out, "2 then 1");
    }

    #[test]
    fn test_extract_text_tolerates_missing_levels() {
        assert_eq!(extract_text(&reply("hello")).as_deref(), Some("hello"));
        assert_eq!(extract_text(&json!({})), None);
        assert_eq!(extract_text(&json!({ "candidates": [] })), None);
        assert_eq!(extract_text(&json!({ "candidates": [{ "content": {} }] })), None);
        assert_eq!(extract_text(&json!({ "candidates": [{ "content": { "parts": [{}] } }] })), None);
        assert_eq!(extract_text(&reply("   ")), None);
        assert_eq!(extract_text(&json!({ "candidates": [{ "content": { "parts": [{ "text": 5 }] } }] })), None);
    }

    #[tokio::test]
    async fn test_digest_success_uses_digest_model() {
        let client = Canned::new(Some(reply("Markets rallied.")));
        let out = adapter(client.clone())
            .summarize(
                "News: {{newsData}}",
                &[("newsData", "[]")],
                EntityRecord::new("a@example.com", "A"),
                FallbackPolicy::Digest,
            )
            .await;
        assert_eq!(out.content.as_deref(), Some("Markets rallied."));
        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], ("digest-model".to_string(), "News: []".to_string()));
    }

    #[tokio::test]
    async fn test_digest_failure_yields_none() {
        let client = Canned::new(None);
        let out = adapter(client)
            .summarize("x", &[], EntityRecord::new("a@example.com", "A"), FallbackPolicy::Digest)
            .await;
        assert_eq!(out.content, None);
        assert_eq!(out.entity.email, "a@example.com");
    }

    #[tokio::test]
    async fn test_welcome_missing_text_yields_default_intro() {
        let client = Canned::new(Some(json!({ "candidates": [{ "content": { "parts": [] } }] })));
        let out = adapter(client.clone())
            .summarize("x", &[], EntityRecord::new("a@example.com", "A"), FallbackPolicy::Welcome)
            .await;
        assert_eq!(out.content.as_deref(), Some(WELCOME_FALLBACK_INTRO));
        assert_eq!(client.seen.lock().unwrap()[0].0, "welcome-model");
    }
}
