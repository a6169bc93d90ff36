use crate::error::{HarnessError, HarnessResult};
use crate::naming::validate_prefix;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use websites::{CreateSiteOptions, DeleteSiteOptions};

/// Bounded exponential backoff used while waiting on eventually consistent reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of probes, including the first one
    pub max_attempts: u32,
    /// Base delay for exponential backoff (in milliseconds)
    pub base_delay_ms: u64,
    /// Maximum delay for exponential backoff (in milliseconds)
    pub max_delay_ms: u64,
    /// Jitter factor for randomizing retry delays (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay_ms: 500,
            max_delay_ms: 5_000,
            jitter_factor: 0.1,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            max_delay_ms,
            ..Default::default()
        }
    }

    /// A policy that polls rapidly; used against in-process fakes.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 1,
            jitter_factor: 0.0,
        }
    }

    pub fn with_jitter(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor;
        self
    }

    /// Calculate delay after failed attempt `attempt` (0-based) with
    /// exponential backoff and jitter
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_delay = Duration::from_millis(self.base_delay_ms);
        let exponential_delay = base_delay.saturating_mul(2_u32.saturating_pow(attempt));
        let max_delay = Duration::from_millis(self.max_delay_ms);

        let delay = exponential_delay.min(max_delay);

        if self.jitter_factor > 0.0 {
            let mut rng = rand::thread_rng();
            let jitter = delay.as_secs_f64() * self.jitter_factor * rng.gen_range(-1.0..=1.0);
            Duration::from_secs_f64((delay.as_secs_f64() + jitter).max(0.0))
        } else {
            delay
        }
    }

    /// Upper bound on the total sleep across all attempts, jitter included
    pub fn worst_case_wait(&self) -> Duration {
        let max_delay = Duration::from_millis(self.max_delay_ms);
        let total: Duration = (0..self.max_attempts.saturating_sub(1))
            .map(|attempt| {
                Duration::from_millis(self.base_delay_ms)
                    .saturating_mul(2_u32.saturating_pow(attempt))
                    .min(max_delay)
            })
            .sum();
        total.mul_f64(1.0 + self.jitter_factor)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("Retry policy needs at least one attempt".to_string());
        }

        if self.base_delay_ms > self.max_delay_ms {
            return Err("Base delay cannot exceed max delay".to_string());
        }

        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err("Jitter factor must be between 0.0 and 1.0".to_string());
        }

        Ok(())
    }
}

/// Explicit configuration for one lifecycle test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Parent scope the test sites live in
    pub webspace: String,
    pub geo_region: String,
    pub name_prefix: String,
    /// Host names are `{site}.{host_suffix}`
    pub host_suffix: String,
    pub create_options: CreateSiteOptions,
    pub delete_options: DeleteSiteOptions,
    /// Polling bound for a new site to become visible
    pub verify_policy: RetryPolicy,
    /// Polling bound for a deleted site to disappear
    pub absence_policy: RetryPolicy,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            webspace: "eastuswebspace".to_string(),
            geo_region: "East US".to_string(),
            name_prefix: "uts".to_string(),
            host_suffix: "azurewebsites.net".to_string(),
            create_options: CreateSiteOptions::default(),
            delete_options: DeleteSiteOptions::default(),
            verify_policy: RetryPolicy::default(),
            absence_policy: RetryPolicy::default(),
        }
    }
}

impl LifecycleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_webspace(mut self, webspace: impl Into<String>) -> Self {
        self.webspace = webspace.into();
        self
    }

    pub fn with_geo_region(mut self, geo_region: impl Into<String>) -> Self {
        self.geo_region = geo_region.into();
        self
    }

    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    pub fn with_host_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.host_suffix = suffix.into();
        self
    }

    pub fn with_create_options(mut self, options: CreateSiteOptions) -> Self {
        self.create_options = options;
        self
    }

    pub fn with_delete_options(mut self, options: DeleteSiteOptions) -> Self {
        self.delete_options = options;
        self
    }

    /// Turn on the given delete flags, keeping any already set
    pub fn enable_delete_flags(
        mut self,
        delete_empty_server_farm: bool,
        delete_metrics: bool,
    ) -> Self {
        self.delete_options.delete_empty_server_farm |= delete_empty_server_farm;
        self.delete_options.delete_metrics |= delete_metrics;
        self
    }

    pub fn with_verify_policy(mut self, policy: RetryPolicy) -> Self {
        self.verify_policy = policy;
        self
    }

    pub fn with_absence_policy(mut self, policy: RetryPolicy) -> Self {
        self.absence_policy = policy;
        self
    }

    pub fn host_names_for(&self, site: &str) -> Vec<String> {
        vec![format!("{}.{}", site, self.host_suffix)]
    }

    pub fn from_toml_str(raw: &str) -> HarnessResult<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| HarnessError::InvalidConfig {
            message: format!("Failed to parse lifecycle config: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> HarnessResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| HarnessError::InvalidConfig {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> HarnessResult<()> {
        let invalid = |message: String| HarnessError::InvalidConfig { message };

        if self.webspace.trim().is_empty() {
            return Err(invalid("Webspace cannot be empty".to_string()));
        }

        if self.geo_region.trim().is_empty() {
            return Err(invalid("Geo region cannot be empty".to_string()));
        }

        validate_prefix(&self.name_prefix)?;

        if self.host_suffix.is_empty() || self.host_suffix.starts_with('.') {
            return Err(invalid(
                "Host suffix must be a non-empty domain without a leading dot".to_string(),
            ));
        }

        self.verify_policy
            .validate()
            .map_err(|e| invalid(format!("verify_policy: {}", e)))?;
        self.absence_policy
            .validate()
            .map_err(|e| invalid(format!("absence_policy: {}", e)))?;

        Ok(())
    }
}
