//! Runtime configuration utilities for ctgov-assistant.

use std::{
    env,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

pub const DEFAULT_REGISTRY_URL: &str = "https://clinicaltrials.gov/api/v2/studies";
pub const DEFAULT_MODEL_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL_ID: &str = "claude-3-5-sonnet-20240620";

/// Application configuration resolved from `.env` and defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Registry `studies` endpoint.
    pub registry_base_url: String,
    /// Records requested per registry page (clamped to 1..=1000).
    pub registry_page_size: u32,
    /// Default cap on records collected per search.
    pub max_studies: usize,
    /// Safety bound on followed page tokens per search.
    pub max_pages: usize,
    pub registry_timeout_secs: u64,
    /// Base URL of the hosted model service.
    pub model_base_url: String,
    /// API key for the hosted model; never serialized.
    #[serde(skip_serializing, default)]
    pub model_api_key: Option<String>,
    pub model_id: String,
    pub model_max_tokens: u32,
    pub model_timeout_secs: u64,
    /// Retries applied to transient model and registry failures.
    pub retry_max: u32,
    pub retry_base_delay_ms: u64,
    /// Root folder for exported search results.
    pub outputs_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            registry_base_url: DEFAULT_REGISTRY_URL.to_string(),
            registry_page_size: 100,
            max_studies: 500,
            max_pages: 50,
            registry_timeout_secs: 30,
            model_base_url: DEFAULT_MODEL_URL.to_string(),
            model_api_key: None,
            model_id: DEFAULT_MODEL_ID.to_string(),
            model_max_tokens: 4096,
            model_timeout_secs: 120,
            retry_max: 0,
            retry_base_delay_ms: 500,
            outputs_dir: PathBuf::from("./outputs"),
        }
    }
}

impl Settings {
    /// Load configuration from environment with reasonable defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        let settings = Self {
            registry_base_url: env::var("REGISTRY_BASE_URL")
                .unwrap_or(defaults.registry_base_url),
            registry_page_size: parsed("REGISTRY_PAGE_SIZE")?
                .unwrap_or(defaults.registry_page_size),
            max_studies: parsed("MAX_STUDIES")?.unwrap_or(defaults.max_studies),
            max_pages: parsed("MAX_PAGES")?.unwrap_or(defaults.max_pages),
            registry_timeout_secs: parsed("REGISTRY_TIMEOUT_SECS")?
                .unwrap_or(defaults.registry_timeout_secs),
            model_base_url: env::var("MODEL_BASE_URL").unwrap_or(defaults.model_base_url),
            model_api_key: env::var("MODEL_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            model_id: env::var("MODEL_ID").unwrap_or(defaults.model_id),
            model_max_tokens: parsed("MODEL_MAX_TOKENS")?.unwrap_or(defaults.model_max_tokens),
            model_timeout_secs: parsed("MODEL_TIMEOUT_SECS")?
                .unwrap_or(defaults.model_timeout_secs),
            retry_max: parsed("RETRY_MAX")?.unwrap_or(defaults.retry_max),
            retry_base_delay_ms: parsed("RETRY_BASE_DELAY_MS")?
                .unwrap_or(defaults.retry_base_delay_ms),
            outputs_dir: env::var("OUTPUTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.outputs_dir),
        };
        if settings.max_pages == 0 {
            anyhow::bail!("MAX_PAGES must be at least 1");
        }
        Ok(settings)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_retries(
            self.retry_max,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }

    pub fn registry_timeout(&self) -> Duration {
        Duration::from_secs(self.registry_timeout_secs)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    /// Convenience helper for derived output path segments.
    pub fn join_output<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.outputs_dir.join(path)
    }
}

fn parsed<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("parsing {key}={raw}")),
        _ => Ok(None),
    }
}
