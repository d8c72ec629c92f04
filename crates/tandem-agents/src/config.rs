//! Endpoint and workflow configuration for the agent pair.
//!
//! Defaults come from `TANDEM_*` environment variables with sensible local
//! fallbacks; a TOML file can override any subset of fields.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tandem_core::{SchedulerConfig, ThresholdConfig};

const DEFAULT_URL: &str = "http://localhost:8080/v1";
const DEFAULT_WRITER_MODEL: &str = "qwen2.5-coder-14b";
const DEFAULT_REVIEWER_MODEL: &str = "qwen2.5-coder-7b";

/// Configuration load failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// One OpenAI-compatible inference endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl EndpointConfig {
    fn from_env(prefix: &str, default_model: &str) -> Self {
        Self {
            url: std::env::var(format!("{prefix}_URL")).unwrap_or_else(|_| DEFAULT_URL.into()),
            model: std::env::var(format!("{prefix}_MODEL"))
                .unwrap_or_else(|_| default_model.into()),
            api_key: std::env::var(format!("{prefix}_API_KEY")).ok(),
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self::from_env("TANDEM", DEFAULT_WRITER_MODEL)
    }
}

/// Writer-side settings. Refinement runs cooler than initial generation;
/// that knob lives here, not in the orchestration layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    pub endpoint: EndpointConfig,
    pub temperature: f32,
    pub refine_temperature: f32,
    pub max_tokens: u32,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig::from_env("TANDEM_WRITER", DEFAULT_WRITER_MODEL),
            temperature: 0.7,
            refine_temperature: 0.3,
            max_tokens: 2048,
        }
    }
}

/// Reviewer-side settings, including which review passes to request.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReviewerConfig {
    pub endpoint: EndpointConfig,
    pub temperature: f32,
    pub max_tokens: u32,
    pub include_security: bool,
    pub include_performance: bool,
    pub include_style: bool,
}

impl Default for ReviewerConfig {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig::from_env("TANDEM_REVIEWER", DEFAULT_REVIEWER_MODEL),
            temperature: 0.1,
            max_tokens: 1024,
            include_security: true,
            include_performance: true,
            include_style: true,
        }
    }
}

/// Edit-stream scheduler knobs, wire format.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub debounce_ms: u64,
    pub min_code_len: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 1500,
            min_code_len: 50,
        }
    }
}

impl From<SchedulerSettings> for SchedulerConfig {
    fn from(settings: SchedulerSettings) -> Self {
        Self {
            debounce: Duration::from_millis(settings.debounce_ms),
            min_code_len: settings.min_code_len,
        }
    }
}

/// Top-level pair configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PairConfig {
    pub writer: WriterConfig,
    pub reviewer: ReviewerConfig,
    pub thresholds: ThresholdConfig,
    pub scheduler: SchedulerSettings,
    /// Per-request timeout for collaborator calls, seconds.
    pub request_timeout_secs: u64,
}

impl Default for PairConfig {
    fn default() -> Self {
        Self {
            writer: WriterConfig::default(),
            reviewer: ReviewerConfig::default(),
            thresholds: ThresholdConfig::default(),
            scheduler: SchedulerSettings::default(),
            request_timeout_secs: 120,
        }
    }
}

impl PairConfig {
    /// Load from a TOML file; unset fields fall back to env/defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Check if an inference endpoint is reachable (GET /models).
pub async fn check_endpoint(url: &str) -> bool {
    let models_url = format!("{}/models", url.trim_end_matches('/'));
    match reqwest::Client::new()
        .get(&models_url)
        .timeout(Duration::from_secs(5))
        .send()
        .await
    {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}
