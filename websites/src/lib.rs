pub mod client;
pub mod config;
pub mod service;
pub mod types;

pub use client::WebsiteClient;
pub use config::WebsiteServiceConfig;
pub use service::{WebsiteError, WebsiteManagement, WebsiteResult};
pub use types::{
    CreateSiteOptions, DeleteSiteOptions, HostNameSslState, MetricAvailability, MetricData,
    MetricDefinition, MetricResponse, MetricSample, MetricsQuery, Site, WebSpace,
};

pub mod prelude {
    pub use crate::client::*;
    pub use crate::config::*;
    pub use crate::service::*;
    pub use crate::types::*;
}
