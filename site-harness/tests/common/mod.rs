#![allow(dead_code)]

use async_trait::async_trait;
use site_harness::{LifecycleConfig, RetryPolicy};
use std::collections::HashMap;
use std::sync::Mutex;
use websites::{
    CreateSiteOptions, DeleteSiteOptions, HostNameSslState, MetricAvailability, MetricData,
    MetricDefinition, MetricResponse, MetricSample, MetricsQuery, Site, WebSpace,
    WebsiteError, WebsiteManagement, WebsiteResult,
};

pub const WEBSPACE: &str = "eastuswebspace";

/// Lifecycle config that polls without sleeping
pub fn fast_config() -> LifecycleConfig {
    LifecycleConfig::default()
        .with_verify_policy(RetryPolicy::immediate(5))
        .with_absence_policy(RetryPolicy::immediate(5))
}

struct StoredSite {
    site: Site,
    /// Reads that still answer "not found" after the create
    pending_reads: u32,
    /// Reads that still see the site after the delete, when one is pending
    removal_reads: Option<u32>,
}

#[derive(Default)]
struct FakeState {
    sites: HashMap<(String, String), StoredSite>,
    creates: u32,
    deletes: Vec<(String, DeleteSiteOptions)>,
    restarts: u32,
    gets: u32,
}

#[derive(Default)]
struct Behaviour {
    visibility_lag: u32,
    removal_lag: u32,
    never_visible: bool,
    never_removed: bool,
    fail_create: bool,
    fail_create_after_landing: bool,
    fail_delete: bool,
    fail_restart: bool,
    fail_gets: bool,
}

/// In-memory website service with eventually consistent reads
#[derive(Default)]
pub struct FakeWebsites {
    state: Mutex<FakeState>,
    behaviour: Behaviour,
}

impl FakeWebsites {
    pub fn new() -> Self {
        Self::default()
    }

    /// New sites answer "not found" for the next `reads` lookups
    pub fn with_visibility_lag(mut self, reads: u32) -> Self {
        self.behaviour.visibility_lag = reads;
        self
    }

    /// Deleted sites stay visible for the next `reads` lookups
    pub fn with_removal_lag(mut self, reads: u32) -> Self {
        self.behaviour.removal_lag = reads;
        self
    }

    pub fn never_visible(mut self) -> Self {
        self.behaviour.never_visible = true;
        self
    }

    pub fn never_removed(mut self) -> Self {
        self.behaviour.never_removed = true;
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.behaviour.fail_create = true;
        self
    }

    /// The site is stored but the create call still reports an error
    pub fn failing_create_after_landing(mut self) -> Self {
        self.behaviour.fail_create_after_landing = true;
        self
    }

    pub fn failing_delete(mut self) -> Self {
        self.behaviour.fail_delete = true;
        self
    }

    pub fn failing_restart(mut self) -> Self {
        self.behaviour.fail_restart = true;
        self
    }

    /// Every `get_site` fails with an authentication error
    pub fn failing_gets(mut self) -> Self {
        self.behaviour.fail_gets = true;
        self
    }

    pub fn creates(&self) -> u32 {
        self.state.lock().unwrap().creates
    }

    pub fn deletes(&self) -> u32 {
        self.state.lock().unwrap().deletes.len() as u32
    }

    pub fn deleted_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.deletes.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn last_delete_options(&self) -> Option<DeleteSiteOptions> {
        let state = self.state.lock().unwrap();
        state.deletes.last().map(|(_, options)| *options)
    }

    pub fn restarts(&self) -> u32 {
        self.state.lock().unwrap().restarts
    }

    pub fn gets(&self) -> u32 {
        self.state.lock().unwrap().gets
    }

    /// Whether the service still holds the site, ignoring read lag
    pub fn holds(&self, webspace: &str, name: &str) -> bool {
        let state = self.state.lock().unwrap();
        state
            .sites
            .contains_key(&(webspace.to_string(), name.to_string()))
    }

    pub fn site_count(&self) -> usize {
        self.state.lock().unwrap().sites.len()
    }

    fn not_found(webspace: &str, name: &str) -> WebsiteError {
        WebsiteError::NotFound {
            resource: format!("site {}/{}", webspace, name),
        }
    }

    fn build_site(
        webspace: &str,
        name: &str,
        host_names: &[String],
        options: &CreateSiteOptions,
    ) -> Site {
        Site {
            name: name.to_string(),
            state: "Running".to_string(),
            availability_state: "Normal".to_string(),
            compute_mode: options.compute_mode.clone(),
            enabled: true,
            enabled_host_names: host_names.to_vec(),
            host_name_ssl_states: host_names
                .iter()
                .map(|host| HostNameSslState {
                    name: host.clone(),
                    ssl_state: "Disabled".to_string(),
                })
                .collect(),
            host_names: host_names.to_vec(),
            repository_site_name: name.to_string(),
            self_link: format!(
                "https://fake.local/services/webspaces/{}/sites/{}",
                webspace, name
            ),
            server_farm: options
                .server_farm
                .clone()
                .unwrap_or_else(|| "DefaultServerFarm".to_string()),
            site_mode: options
                .site_mode
                .clone()
                .unwrap_or_else(|| "Limited".to_string()),
            storage_recovery_default_state: "Running".to_string(),
            usage_state: "Normal".to_string(),
            web_space: webspace.to_string(),
            last_modified_time_utc: None,
        }
    }
}

fn definition(name: &str, unit: &str) -> MetricDefinition {
    MetricDefinition {
        name: name.to_string(),
        display_name: name.to_string(),
        unit: unit.to_string(),
        primary_aggregation_type: "Total".to_string(),
        metric_availabilities: vec![
            MetricAvailability {
                retention: "P1D".to_string(),
                time_grain: "PT1M".to_string(),
            },
            MetricAvailability {
                retention: "P30D".to_string(),
                time_grain: "PT1H".to_string(),
            },
        ],
    }
}

#[async_trait]
impl WebsiteManagement for FakeWebsites {
    async fn list_webspaces(&self) -> WebsiteResult<Vec<WebSpace>> {
        Ok(vec![self.get_webspace(WEBSPACE).await?])
    }

    async fn get_webspace(&self, webspace: &str) -> WebsiteResult<WebSpace> {
        if webspace != WEBSPACE {
            return Err(WebsiteError::NotFound {
                resource: format!("webspace {}", webspace),
            });
        }
        Ok(WebSpace {
            name: WEBSPACE.to_string(),
            geo_location: "BLU".to_string(),
            geo_region: "East US".to_string(),
            plan: "VirtualDedicatedPlan".to_string(),
            status: "Ready".to_string(),
            availability_state: "Normal".to_string(),
            ..WebSpace::default()
        })
    }

    async fn list_sites(&self, webspace: &str) -> WebsiteResult<Vec<Site>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .sites
            .iter()
            .filter(|((ws, _), stored)| ws == webspace && stored.pending_reads == 0)
            .map(|(_, stored)| stored.site.clone())
            .collect())
    }

    async fn get_site(&self, webspace: &str, name: &str) -> WebsiteResult<Site> {
        let mut state = self.state.lock().unwrap();
        state.gets += 1;

        if self.behaviour.fail_gets {
            return Err(WebsiteError::Authentication);
        }

        let key = (webspace.to_string(), name.to_string());
        let Some(stored) = state.sites.get_mut(&key) else {
            return Err(Self::not_found(webspace, name));
        };

        if let Some(remaining) = stored.removal_reads {
            if remaining == 0 {
                state.sites.remove(&key);
                return Err(Self::not_found(webspace, name));
            }
            if !self.behaviour.never_removed {
                stored.removal_reads = Some(remaining - 1);
            }
            return Ok(stored.site.clone());
        }

        if self.behaviour.never_visible {
            return Err(Self::not_found(webspace, name));
        }
        if stored.pending_reads > 0 {
            stored.pending_reads -= 1;
            return Err(Self::not_found(webspace, name));
        }

        Ok(stored.site.clone())
    }

    async fn create_site(
        &self,
        webspace: &str,
        name: &str,
        _geo_region: &str,
        host_names: &[String],
        options: &CreateSiteOptions,
    ) -> WebsiteResult<Site> {
        let mut state = self.state.lock().unwrap();
        state.creates += 1;

        if self.behaviour.fail_create {
            return Err(WebsiteError::Api {
                status: 409,
                message: "Conflict".to_string(),
            });
        }

        let site = Self::build_site(webspace, name, host_names, options);
        state.sites.insert(
            (webspace.to_string(), name.to_string()),
            StoredSite {
                site: site.clone(),
                pending_reads: self.behaviour.visibility_lag,
                removal_reads: None,
            },
        );

        if self.behaviour.fail_create_after_landing {
            return Err(WebsiteError::ServiceUnavailable {
                message: "gateway timeout".to_string(),
            });
        }

        Ok(site)
    }

    async fn delete_site(
        &self,
        webspace: &str,
        name: &str,
        options: DeleteSiteOptions,
    ) -> WebsiteResult<()> {
        let mut state = self.state.lock().unwrap();
        state.deletes.push((name.to_string(), options));

        if self.behaviour.fail_delete {
            return Err(WebsiteError::ServiceUnavailable {
                message: "delete rejected".to_string(),
            });
        }

        let key = (webspace.to_string(), name.to_string());
        let removal_lag = self.behaviour.removal_lag;
        let never_removed = self.behaviour.never_removed;
        let Some(stored) = state.sites.get_mut(&key) else {
            return Err(Self::not_found(webspace, name));
        };
        if stored.removal_reads.is_some() {
            return Err(Self::not_found(webspace, name));
        }
        if removal_lag > 0 || never_removed {
            stored.removal_reads = Some(removal_lag.max(1));
            return Ok(());
        }

        state.sites.remove(&key);
        Ok(())
    }

    async fn restart_site(&self, webspace: &str, name: &str) -> WebsiteResult<()> {
        let mut state = self.state.lock().unwrap();
        if self.behaviour.fail_restart {
            return Err(WebsiteError::Api {
                status: 500,
                message: "restart failed".to_string(),
            });
        }
        if !state
            .sites
            .contains_key(&(webspace.to_string(), name.to_string()))
        {
            return Err(Self::not_found(webspace, name));
        }
        state.restarts += 1;
        Ok(())
    }

    async fn get_metric_definitions(
        &self,
        webspace: &str,
        name: &str,
    ) -> WebsiteResult<Vec<MetricDefinition>> {
        if !self.holds(webspace, name) {
            return Err(Self::not_found(webspace, name));
        }
        Ok(vec![
            definition("CpuTime", "Milliseconds"),
            definition("Requests", "Count"),
            definition("BytesSent", "Bytes"),
        ])
    }

    async fn get_historical_usage_metrics(
        &self,
        webspace: &str,
        name: &str,
        query: &MetricsQuery,
    ) -> WebsiteResult<Vec<MetricResponse>> {
        if !self.holds(webspace, name) {
            return Err(Self::not_found(webspace, name));
        }
        let names = if query.names.is_empty() {
            vec!["CpuTime".to_string()]
        } else {
            query.names.clone()
        };
        Ok(names
            .into_iter()
            .map(|metric| MetricResponse {
                code: "Success".to_string(),
                message: String::new(),
                data: MetricData {
                    display_name: metric.clone(),
                    name: metric,
                    unit: "Count".to_string(),
                    primary_aggregation_type: "Total".to_string(),
                    time_grain: query
                        .time_grain
                        .clone()
                        .unwrap_or_else(|| "PT1H".to_string()),
                    start_time: query
                        .start_time
                        .clone()
                        .unwrap_or_else(|| "2024-01-01T00:00:00Z".to_string()),
                    end_time: query
                        .end_time
                        .clone()
                        .unwrap_or_else(|| "2024-01-01T01:00:00Z".to_string()),
                    values: vec![MetricSample {
                        time_created: "2024-01-01T00:00:00Z".to_string(),
                        total: 0.0,
                        count: 1,
                        ..MetricSample::default()
                    }],
                },
            })
            .collect())
    }

    fn service_name(&self) -> &'static str {
        "fake"
    }
}
