use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_VERSION: &str = "2013-08-01";

const ENV_BASE_URL: &str = "WEBSITES_BASE_URL";
const ENV_SUBSCRIPTION_ID: &str = "WEBSITES_SUBSCRIPTION_ID";
const ENV_API_VERSION: &str = "WEBSITES_API_VERSION";
const ENV_BEARER_TOKEN: &str = "WEBSITES_BEARER_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsiteServiceConfig {
    pub base_url: String,
    pub subscription_id: String,
    pub api_version: String,
    pub timeout: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
}

impl Default for WebsiteServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://management.core.windows.net".to_string(),
            subscription_id: String::new(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(60),
            bearer_token: None,
        }
    }
}

impl WebsiteServiceConfig {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            ..Self::default()
        }
    }

    /// Build a configuration from `WEBSITES_*` environment variables, falling
    /// back to the defaults for anything unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            config.base_url = base_url;
        }
        if let Some(subscription_id) = lookup(ENV_SUBSCRIPTION_ID) {
            config.subscription_id = subscription_id;
        }
        if let Some(api_version) = lookup(ENV_API_VERSION) {
            config.api_version = api_version;
        }
        config.bearer_token = lookup(ENV_BEARER_TOKEN).filter(|token| !token.is_empty());
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_subscription_id(mut self, subscription_id: impl Into<String>) -> Self {
        self.subscription_id = subscription_id.into();
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("Base URL cannot be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("Base URL must start with http:// or https://".to_string());
        }

        if self.subscription_id.trim().is_empty() {
            return Err("Subscription id cannot be empty".to_string());
        }

        if self.subscription_id.contains('/') {
            return Err("Subscription id cannot contain '/'".to_string());
        }

        if self.api_version.is_empty() {
            return Err("API version cannot be empty".to_string());
        }

        if self.timeout.is_zero() {
            return Err("Timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}
