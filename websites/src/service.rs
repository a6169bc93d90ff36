use crate::types::{
    CreateSiteOptions, DeleteSiteOptions, MetricDefinition, MetricResponse, MetricsQuery, Site,
    WebSpace,
};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebsiteError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Authentication failed")]
    Authentication,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl WebsiteError {
    /// True when the service answered that the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, WebsiteError::NotFound { .. })
    }
}

pub type WebsiteResult<T> = Result<T, WebsiteError>;

/// Remote operations of the website management service.
///
/// `webspace` is the parent scope of every site; site names are unique within
/// the subscription.
#[async_trait]
pub trait WebsiteManagement: Send + Sync {
    async fn list_webspaces(&self) -> WebsiteResult<Vec<WebSpace>>;

    async fn get_webspace(&self, webspace: &str) -> WebsiteResult<WebSpace>;

    async fn list_sites(&self, webspace: &str) -> WebsiteResult<Vec<Site>>;

    /// Returns [`WebsiteError::NotFound`] when the site is not visible.
    async fn get_site(&self, webspace: &str, name: &str) -> WebsiteResult<Site>;

    async fn create_site(
        &self,
        webspace: &str,
        name: &str,
        geo_region: &str,
        host_names: &[String],
        options: &CreateSiteOptions,
    ) -> WebsiteResult<Site>;

    async fn delete_site(
        &self,
        webspace: &str,
        name: &str,
        options: DeleteSiteOptions,
    ) -> WebsiteResult<()>;

    async fn restart_site(&self, webspace: &str, name: &str) -> WebsiteResult<()>;

    async fn get_metric_definitions(
        &self,
        webspace: &str,
        name: &str,
    ) -> WebsiteResult<Vec<MetricDefinition>>;

    async fn get_historical_usage_metrics(
        &self,
        webspace: &str,
        name: &str,
        query: &MetricsQuery,
    ) -> WebsiteResult<Vec<MetricResponse>>;

    fn service_name(&self) -> &'static str;
}
