//! # Client Configuration
//!
//! Settings for reaching the census script endpoint, read from an optional
//! YAML file and then overridden by environment variables.
//!
//! ```yaml
//! api_endpoint: https://script.google.com/macros/s/<deployment>/exec
//! request_timeout_secs: 20
//! retry:
//!   max_attempts: 3
//!   initial_delay_ms: 200
//!   max_delay_ms: 2000
//!   multiplier: 2.0
//! log_filter: info
//! ```
//!
//! Every key is optional. Environment overrides:
//!
//! - `CENSUS_API_ENDPOINT`
//! - `CENSUS_REQUEST_TIMEOUT_SECS`
//! - `CENSUS_LOG`

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const ENV_API_ENDPOINT: &str = "CENSUS_API_ENDPOINT";
pub const ENV_REQUEST_TIMEOUT: &str = "CENSUS_REQUEST_TIMEOUT_SECS";
pub const ENV_LOG: &str = "CENSUS_LOG";

/// Endpoint left in freshly cloned deployments
pub const PLACEHOLDER_ENDPOINT: &str =
    "https://script.google.com/macros/s/YOUR_DEPLOYED_SCRIPT_ID/exec";
const PLACEHOLDER_MARKER: &str = "YOUR_DEPLOYED_SCRIPT_ID";

/// Backoff settings for idempotent requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total tries including the first one
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 200,
            max_delay_ms: 2000,
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Never retry; used by tests and one-shot tools
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Delay after `current`, grown by the multiplier and clamped to the maximum
    pub fn next_delay(&self, current: Duration) -> Duration {
        let next_ms = (current.as_millis() as f64 * self.multiplier) as u64;
        Duration::from_millis(next_ms).min(self.max_delay())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CensusConfig {
    pub api_endpoint: String,
    pub request_timeout_secs: u64,
    pub retry: RetryConfig,
    /// `tracing` filter directive, `RUST_LOG` wins when set
    pub log_filter: String,
}

impl Default for CensusConfig {
    fn default() -> Self {
        Self {
            api_endpoint: PLACEHOLDER_ENDPOINT.to_string(),
            request_timeout_secs: 20,
            retry: RetryConfig::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl CensusConfig {
    /// Load from an optional YAML file, apply environment overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let yaml_content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                let config = Self::from_yaml_str(&yaml_content)
                    .with_context(|| format!("Invalid config file {}", path.display()))?;
                info!("Loaded configuration from {}", path.display());
                config
            }
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml_content: &str) -> Result<Self> {
        if yaml_content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml_content)?)
    }

    /// Apply overrides from `lookup`, normally the process environment
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENV_API_ENDPOINT) {
            debug!("{} overrides api_endpoint", ENV_API_ENDPOINT);
            self.api_endpoint = endpoint.trim().to_string();
        }
        if let Some(timeout) = lookup(ENV_REQUEST_TIMEOUT) {
            self.request_timeout_secs = timeout
                .trim()
                .parse()
                .with_context(|| {
                    format!("{} must be a whole number of seconds", ENV_REQUEST_TIMEOUT)
                })?;
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.log_filter = filter;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let endpoint = self.api_endpoint.trim();
        if endpoint.is_empty() {
            bail!("api_endpoint is not set");
        }
        if endpoint.contains(PLACEHOLDER_MARKER) {
            bail!(
                "api_endpoint still contains the deployment placeholder; set {} or api_endpoint in the config file",
                ENV_API_ENDPOINT
            );
        }
        let parsed = reqwest::Url::parse(endpoint)
            .with_context(|| format!("api_endpoint is not a valid URL: {}", endpoint))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("api_endpoint must use http or https, got {}", parsed.scheme());
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero");
        }
        if self.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        if self.retry.multiplier < 1.0 {
            bail!("retry.multiplier must be at least 1.0");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
