use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::matching::NoEvidencePolicy;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub anthropic_api_key: String,
    pub embedding: EmbeddingConfig,
    pub matching: MatchingConfig,
    pub scorecard_cache_ttl_secs: u64,
    /// Upper bound on any single Redis round trip.
    pub scorecard_cache_timeout: Duration,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub dimensions: usize,
}

/// Tuning knobs for the matching engine.
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    pub top_k: usize,
    pub min_similarity: f32,
    pub max_concurrency: usize,
    pub judge_timeout: Duration,
    pub judge_max_retries: u32,
    pub match_timeout: Duration,
    pub no_evidence_policy: NoEvidencePolicy,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            min_similarity: 0.2,
            max_concurrency: 16,
            judge_timeout: Duration::from_secs(8),
            judge_max_retries: 1,
            match_timeout: Duration::from_secs(60),
            no_evidence_policy: NoEvidencePolicy::Exclude,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = MatchingConfig::default();

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            embedding: EmbeddingConfig {
                api_url: optional_env("EMBEDDING_API_URL")
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
                api_key: require_env("EMBEDDING_API_KEY")?,
                model: optional_env("EMBEDDING_MODEL")
                    .unwrap_or_else(|| "text-embedding-3-small".to_string()),
                dimensions: parse_env("EMBEDDING_DIMENSIONS", 1536)?,
            },
            matching: MatchingConfig {
                top_k: parse_env("MATCH_TOP_K", defaults.top_k)?,
                min_similarity: parse_env("MATCH_MIN_SIMILARITY", defaults.min_similarity)?,
                max_concurrency: parse_env("MATCH_MAX_CONCURRENCY", defaults.max_concurrency)?,
                judge_timeout: Duration::from_secs(parse_env(
                    "JUDGE_TIMEOUT_SECS",
                    defaults.judge_timeout.as_secs(),
                )?),
                judge_max_retries: parse_env("JUDGE_MAX_RETRIES", defaults.judge_max_retries)?,
                match_timeout: Duration::from_secs(parse_env(
                    "MATCH_TIMEOUT_SECS",
                    defaults.match_timeout.as_secs(),
                )?),
                no_evidence_policy: parse_env("NO_EVIDENCE_POLICY", defaults.no_evidence_policy)?,
            },
            scorecard_cache_ttl_secs: parse_env("SCORECARD_CACHE_TTL_SECS", 300)?,
            scorecard_cache_timeout: Duration::from_millis(parse_env(
                "SCORECARD_CACHE_TIMEOUT_MS",
                250,
            )?),
            port: parse_env("PORT", 8080)?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow!("{key} has an invalid value '{raw}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_defaults() {
        let m = MatchingConfig::default();
        assert_eq!(m.top_k, 3);
        assert_eq!(m.judge_max_retries, 1);
        assert!(m.judge_timeout.as_secs() < 10);
        assert_eq!(m.no_evidence_policy, NoEvidencePolicy::Exclude);
    }

    #[test]
    fn test_parse_value_reports_key_on_error() {
        let err = parse_value::<u16>("PORT", "eighty").unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_parse_value_policy() {
        let policy: NoEvidencePolicy = parse_value("NO_EVIDENCE_POLICY", " floor ").unwrap();
        assert_eq!(policy, NoEvidencePolicy::Floor);
        assert!(parse_value::<NoEvidencePolicy>("NO_EVIDENCE_POLICY", "skip").is_err());
    }
}
