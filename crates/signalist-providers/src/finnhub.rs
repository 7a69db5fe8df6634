//! Finnhub market-news client.
//!
//! With symbols: company news for each symbol over the last
//! `lookback_days`, merged round-robin so one busy ticker cannot crowd out
//! the others. Without symbols: general market news.
//!
//! Articles missing a headline, summary, or url are dropped; duplicates (by
//! url) keep their first occurrence. Truncation is left to the caller.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use futures::future::join_all;
use signalist_core::config::NewsConfig;
use signalist_core::error::{Result, SignalistError};
use signalist_core::traits::news::NewsSource;
use signalist_core::types::Article;

pub struct FinnhubClient {
    endpoint: String,
    api_key: String,
    lookback_days: i64,
    client: reqwest::Client,
}

impl FinnhubClient {
    pub fn new(config: &NewsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SignalistError::Http(format!("finnhub client: {e}")))?;
        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            lookback_days: config.lookback_days.max(1),
            client,
        })
    }

    async fn fetch(&self, path: &str, params: &[(&str, &str)]) -> Result<Vec<Article>> {
        if self.api_key.is_empty() {
            return Err(SignalistError::News("FINNHUB_API_KEY is not configured".into()));
        }

        let url = format!("{}{}", self.endpoint, path);
        let resp = self
            .client
            .get(&url)
            .query(params)
            .query(&[("token", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| SignalistError::Http(format!("finnhub connection failed ({url}): {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(SignalistError::News(format!(
                "finnhub API error {status}: {text}"
            )));
        }

        resp.json::<Vec<Article>>()
            .await
            .map_err(|e| SignalistError::News(format!("finnhub response: {e}")))
    }

    async fn company_news(&self, symbol: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<Article>> {
        let from = from.format("%Y-%m-%d").to_string();
        let to = to.format("%Y-%m-%d").to_string();
        self.fetch(
            "/company-news",
            &[("symbol", symbol), ("from", from.as_str()), ("to", to.as_str())],
        )
        .await
    }

    async fn general_news(&self) -> Result<Vec<Article>> {
        self.fetch("/news", &[("category", "general")]).await
    }
}

#[async_trait]
impl NewsSource for FinnhubClient {
    async fn get_news(&self, symbols: Option<&[String]>) -> Result<Vec<Article>> {
        let symbols = clean_symbols(symbols.unwrap_or_default());

        if symbols.is_empty() {
            let articles = self.general_news().await?;
            tracing::debug!("📰 Finnhub general news: {} articles", articles.len());
            return Ok(dedupe(articles.into_iter().filter(is_valid)));
        }

        let to = Utc::now().date_naive();
        let from = to - Duration::days(self.lookback_days);
        let fetches = symbols.iter().map(|s| self.company_news(s, from, to));
        let results = join_all(fetches).await;

        let mut per_symbol: Vec<Vec<Article>> = Vec::with_capacity(results.len());
        let mut last_error = None;
        for (symbol, result) in symbols.iter().zip(results) {
            match result {
                Ok(articles) => per_symbol.push(articles.into_iter().filter(is_valid).collect()),
                Err(e) => {
                    tracing::warn!("⚠️ Finnhub news for {} failed: {}", symbol, e);
                    last_error = Some(e);
                }
            }
        }

        // Only an error when no symbol could be fetched at all.
        if per_symbol.is_empty()
            && let Some(e) = last_error
        {
            return Err(e);
        }

        let merged = dedupe(round_robin(per_symbol));
        tracing::debug!(
            "📰 Finnhub company news for {} symbols: {} articles",
            symbols.len(),
            merged.len()
        );
        Ok(merged)
    }
}

/// Trim, uppercase, and dedupe symbols, keeping watchlist order.
fn clean_symbols(symbols: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    symbols
        .iter()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

fn is_valid(article: &Article) -> bool {
    !article.headline.trim().is_empty()
        && !article.summary.trim().is_empty()
        && !article.url.trim().is_empty()
}

/// Interleave lists: first of each, then second of each, and so on.
fn round_robin(lists: Vec<Vec<Article>>) -> Vec<Article> {
    let mut iters: Vec<_> = lists.into_iter().map(Vec::into_iter).collect();
    let mut merged = Vec::new();
    loop {
        let before = merged.len();
        for it in iters.iter_mut() {
            if let Some(article) = it.next() {
                merged.push(article);
            }
        }
        if merged.len() == before {
            return merged;
        }
    }
}

fn dedupe(articles: impl IntoIterator<Item = Article>) -> Vec<Article> {
    let mut seen = HashSet::new();
    articles
        .into_iter()
        .filter(|a| seen.insert(a.url.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(headline: &str, url: &str) -> Article {
        Article {
            headline: headline.into(),
            summary: format!("{headline} summary"),
            url: url.into(),
            source: "Reuters".into(),
            datetime: 1_700_000_000,
        }
    }

    #[test]
    fn test_round_robin_interleaves() {
        let merged = round_robin(vec![
            vec![article("a1", "u/a1"), article("a2", "u/a2"), article("a3", "u/a3")],
            vec![article("b1", "u/b1")],
            vec![article("c1", "u/c1"), article("c2", "u/c2")],
        ]);
        let heads: Vec<&str> = merged.iter().map(|a| a.headline.as_str()).collect();
        assert_eq!(heads, vec!["a1", "b1", "c1", "a2", "c2", "a3"]);
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let out = dedupe(vec![article("x", "u/1"), article("y", "u/1"), article("z", "u/2")]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].headline, "x");
    }

    #[test]
    fn test_invalid_articles_dropped() {
        let mut missing_url = article("x", "");
        assert!(!is_valid(&missing_url));
        missing_url.url = "u/x".into();
        assert!(is_valid(&missing_url));
        let mut blank = article("y", "u/y");
        blank.summary = "  ".into();
        assert!(!is_valid(&blank));
    }

    #[test]
    fn test_clean_symbols() {
        let raw = vec![" aapl ".to_string(), "AAPL".into(), "".into(), "msft".into()];
        assert_eq!(clean_symbols(&raw), vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_parse_finnhub_payload() {
        let payload = r#"[{"category":"company","datetime":1700000000,"headline":"Apple beats",
            "id":1,"image":"","related":"AAPL","source":"CNBC","summary":"Strong quarter",
            "url":"https://example.test/a"}]"#;
        let articles: Vec<Article> = serde_json::from_str(payload).unwrap();
        assert_eq!(articles[0].headline, "Apple beats");
        assert_eq!(articles[0].datetime, 1_700_000_000);
        assert!(is_valid(&articles[0]));
    }

    #[tokio::test]
    async fn test_missing_key_is_news_error() {
        let client = FinnhubClient::new(&NewsConfig::default()).unwrap();
        assert!(matches!(
            client.get_news(None).await,
            Err(SignalistError::News(_))
        ));
    }
}
