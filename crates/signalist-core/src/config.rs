//! Signalist configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SignalistError};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalistConfig {
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub digest: DigestConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl SignalistConfig {
    /// Load config from the default path (~/.signalist/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SignalistError::Config(format!("Failed to read config: {e}")))?;
        let mut config: Self = toml::from_str(&content)
            .map_err(|e| SignalistError::Config(format!("Failed to parse config: {e}")))?;
        config.apply_env();
        Ok(config)
    }

    /// Save config to the given path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| SignalistError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Fill empty secrets from environment variables.
    fn apply_env(&mut self) {
        fill_from_env(&mut self.inference.api_key, "GEMINI_API_KEY");
        fill_from_env(&mut self.news.api_key, "FINNHUB_API_KEY");
        fill_from_env(&mut self.email.username, "SIGNALIST_SMTP_USERNAME");
        fill_from_env(&mut self.email.password, "SIGNALIST_SMTP_PASSWORD");
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Signalist home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".signalist")
    }
}

fn fill_from_env(slot: &mut String, key: &str) {
    if slot.is_empty()
        && let Ok(value) = std::env::var(key)
    {
        *slot = value;
    }
}

/// Step retry policy. Applies per run: one failed attempt re-executes the
/// workflow with all completed steps served from cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Upper bound for a single attempt. Exceeding it counts as a transient failure.
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
}

fn default_max_retries() -> u32 { 3 }
fn default_initial_backoff_ms() -> u64 { 1_000 }
fn default_backoff_multiplier() -> f64 { 2.0 }
fn default_max_backoff_ms() -> u64 { 30_000 }
fn default_attempt_timeout_secs() -> u64 { 600 }

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
        }
    }
}

/// Cron scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    #[serde(default = "default_digest_cron")]
    pub digest_cron: String,
}

fn bool_true() -> bool { true }
fn default_check_interval() -> u64 { 30 }
fn default_digest_cron() -> String { "0 1 * * *".into() }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_secs: default_check_interval(),
            digest_cron: default_digest_cron(),
        }
    }
}

/// AI inference (Gemini) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_inference_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_welcome_model")]
    pub welcome_model: String,
    #[serde(default = "default_digest_model")]
    pub digest_model: String,
    #[serde(default = "default_inference_timeout")]
    pub timeout_secs: u64,
}

fn default_inference_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_welcome_model() -> String { "gemini-2.0-flash-lite".into() }
fn default_digest_model() -> String { "gemini-2.5-flash-lite".into() }
fn default_inference_timeout() -> u64 { 30 }

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_inference_endpoint(),
            api_key: String::new(),
            welcome_model: default_welcome_model(),
            digest_model: default_digest_model(),
            timeout_secs: default_inference_timeout(),
        }
    }
}

/// Market news (Finnhub) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    #[serde(default = "default_news_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    #[serde(default = "default_news_timeout")]
    pub timeout_secs: u64,
}

fn default_news_endpoint() -> String { "https://finnhub.io/api/v1".into() }
fn default_lookback_days() -> i64 { 5 }
fn default_news_timeout() -> u64 { 15 }

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_news_endpoint(),
            api_key: String::new(),
            lookback_days: default_lookback_days(),
            timeout_secs: default_news_timeout(),
        }
    }
}

/// Outbound SMTP configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    #[serde(default)]
    pub from_address: String,
}

fn default_smtp_host() -> String { "smtp.gmail.com".into() }
fn default_smtp_port() -> u16 { 587 }
fn default_from_name() -> String { "Signalist".into() }

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from_name: default_from_name(),
            from_address: String::new(),
        }
    }
}

/// Daily digest shaping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    #[serde(default = "default_article_cap")]
    pub article_cap: usize,
}

fn default_article_cap() -> usize { 6 }

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            article_cap: default_article_cap(),
        }
    }
}

/// Where runs and users live on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_runs_db")]
    pub runs_db: String,
    #[serde(default = "default_users_file")]
    pub users_file: String,
}

fn default_runs_db() -> String { "~/.signalist/runs.db".into() }
fn default_users_file() -> String { "~/.signalist/users.json".into() }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            runs_db: default_runs_db(),
            users_file: default_users_file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SignalistConfig::default();
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.digest.article_cap, 6);
        assert_eq!(config.scheduler.digest_cron, "0 1 * * *");
        assert_eq!(config.inference.welcome_model, "gemini-2.0-flash-lite");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: SignalistConfig = toml::from_str(
            r#"
            [retry]
            max_retries = 5

            [email]
            from_address = "news@signalist.app"
            "#,
        )
        .unwrap();
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.initial_backoff_ms, 1_000);
        assert_eq!(config.email.from_address, "news@signalist.app");
        assert_eq!(config.email.smtp_port, 587);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = SignalistConfig::default();
        config.news.lookback_days = 2;
        config.save_to(&path).unwrap();

        let loaded = SignalistConfig::load_from(&path).unwrap();
        assert_eq!(loaded.news.lookback_days, 2);
    }
}
