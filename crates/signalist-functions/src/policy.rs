//! Fallback-and-cap: prefer watchlist news, fall back to general market
//! news once when there is none, and never return more than `cap` articles.

use std::future::Future;

use signalist_core::error::Result;
use signalist_core::types::Article;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackCapPolicy {
    pub cap: usize,
}

impl Default for FallbackCapPolicy {
    fn default() -> Self {
        Self { cap: 6 }
    }
}

impl FallbackCapPolicy {
    pub fn new(cap: usize) -> Self {
        Self { cap }
    }

    /// First `cap` of `primary`; when `primary` is empty, first `cap` of a
    /// single `secondary()` call. An empty result is not an error.
    pub async fn apply<F, Fut>(&self, primary: Vec<Article>, secondary: F) -> Result<Vec<Article>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Article>>>,
    {
        if !primary.is_empty() {
            return Ok(self.truncate(primary));
        }
        let fallback = secondary().await?;
        Ok(self.truncate(fallback))
    }

    fn truncate(&self, mut articles: Vec<Article>) -> Vec<Article> {
        articles.truncate(self.cap);
        articles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signalist_core::error::SignalistError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn articles(prefix: &str, n: usize) -> Vec<Article> {
        (1..=n)
            .map(|i| Article {
                headline: format!("{prefix}{i}"),
                summary: "s".into(),
                url: format!("https://news.test/{prefix}{i}"),
                source: "test".into(),
                datetime: i as i64,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_primary_capped_in_order() {
        let calls = AtomicUsize::new(0);
        let out = FallbackCapPolicy::default()
            .apply(articles("a", 9), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(articles("g", 3))
            })
            .await
            .unwrap();
        assert_eq!(out, articles("a", 6));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_primary_calls_secondary_once() {
        let calls = AtomicUsize::new(0);
        let out = FallbackCapPolicy::default()
            .apply(Vec::new(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(articles("g", 10))
            })
            .await
            .unwrap();
        assert_eq!(out.len(), 6);
        assert_eq!(out[0].headline, "g1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_both_empty_is_ok() {
        let out = FallbackCapPolicy::default()
            .apply(Vec::new(), || async { Ok(Vec::new()) })
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_cap_is_min_of_available() {
        let policy = FallbackCapPolicy::new(6);
        for n in [1, 5, 6, 7] {
            let out = policy.apply(articles("a", n), || async { Ok(Vec::new()) }).await.unwrap();
            assert_eq!(out.len(), n.min(6));
        }
    }

    #[tokio::test]
    async fn test_secondary_error_propagates() {
        let out = FallbackCapPolicy::default()
            .apply(Vec::new(), || async { Err(SignalistError::News("down".into())) })
            .await;
        assert!(out.is_err());
    }
}
