//! Gemini `generateContent` client.
//!
//! Returns the raw response JSON; extracting text is left to the caller so
//! that malformed responses can be handled by the flow's fallback policy.

use async_trait::async_trait;
use serde_json::{Value, json};
use signalist_core::config::InferenceConfig;
use signalist_core::error::{Result, SignalistError};
use signalist_core::traits::inference::{Content, InferenceClient};

pub struct GeminiClient {
    /// Base URL, e.g. "https://generativelanguage.googleapis.com/v1beta".
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SignalistError::Http(format!("gemini client: {e}")))?;
        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    fn url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, model)
    }
}

fn request_body(contents: &[Content]) -> Value {
    json!({ "contents": contents })
}

#[async_trait]
impl InferenceClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn infer(&self, model: &str, contents: &[Content]) -> Result<Value> {
        if self.api_key.is_empty() {
            return Err(SignalistError::Inference(
                "GEMINI_API_KEY is not configured".into(),
            ));
        }

        let url = self.url(model);
        tracing::debug!("🧠 Gemini request: model={} parts={}", model, contents.len());

        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request_body(contents))
            .send()
            .await
            .map_err(|e| SignalistError::Http(format!("gemini connection failed ({url}): {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(SignalistError::Inference(format!(
                "gemini API error {status}: {text}"
            )));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| SignalistError::Inference(format!("gemini response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_and_body() {
        let config = InferenceConfig {
            endpoint: "https://example.test/v1beta/".into(),
            ..Default::default()
        };
        let client = GeminiClient::new(&config).unwrap();
        assert_eq!(
            client.url("gemini-2.5-flash-lite"),
            "https://example.test/v1beta/models/gemini-2.5-flash-lite:generateContent"
        );

        let body = request_body(&[Content::user("hello")]);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
    }

    #[tokio::test]
    async fn test_missing_key_is_inference_error() {
        let client = GeminiClient::new(&InferenceConfig::default()).unwrap();
        let err = client
            .infer("gemini-2.0-flash-lite", &[Content::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, SignalistError::Inference(_)));
        assert!(err.is_transient());
    }
}
