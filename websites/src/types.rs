use serde::{Deserialize, Serialize};

pub const DEFAULT_PLAN: &str = "VirtualDedicatedPlan";
pub const DEFAULT_COMPUTE_MODE: &str = "Shared";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct WebSpace {
    pub name: String,
    pub geo_location: String,
    pub geo_region: String,
    pub plan: String,
    pub status: String,
    pub subscription: String,
    pub availability_state: String,
    pub compute_mode: Option<String>,
    pub worker_size: Option<String>,
    pub number_of_workers: Option<u32>,
    pub current_worker_size: Option<String>,
    pub current_number_of_workers: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HostNameSslState {
    pub name: String,
    pub ssl_state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Site {
    pub name: String,
    pub state: String,
    pub availability_state: String,
    pub compute_mode: String,
    pub enabled: bool,
    pub enabled_host_names: Vec<String>,
    pub host_name_ssl_states: Vec<HostNameSslState>,
    pub host_names: Vec<String>,
    pub repository_site_name: String,
    pub self_link: String,
    pub server_farm: String,
    pub site_mode: String,
    pub storage_recovery_default_state: String,
    pub usage_state: String,
    pub web_space: String,
    pub last_modified_time_utc: Option<String>,
}

/// Optional knobs for site creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateSiteOptions {
    pub plan: String,
    pub compute_mode: String,
    pub server_farm: Option<String>,
    pub site_mode: Option<String>,
}

impl Default for CreateSiteOptions {
    fn default() -> Self {
        Self {
            plan: DEFAULT_PLAN.to_string(),
            compute_mode: DEFAULT_COMPUTE_MODE.to_string(),
            server_farm: None,
            site_mode: None,
        }
    }
}

impl CreateSiteOptions {
    pub fn with_compute_mode(mut self, compute_mode: impl Into<String>) -> Self {
        self.compute_mode = compute_mode.into();
        self
    }

    pub fn with_server_farm(mut self, server_farm: impl Into<String>) -> Self {
        self.server_farm = Some(server_farm.into());
        self
    }

    pub fn with_site_mode(mut self, site_mode: impl Into<String>) -> Self {
        self.site_mode = Some(site_mode.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSiteOptions {
    /// Also remove the server farm if this was its last site.
    #[serde(default)]
    pub delete_empty_server_farm: bool,
    #[serde(default)]
    pub delete_metrics: bool,
}

impl DeleteSiteOptions {
    pub fn new(delete_empty_server_farm: bool, delete_metrics: bool) -> Self {
        Self {
            delete_empty_server_farm,
            delete_metrics,
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, &'static str)> {
        let mut pairs = Vec::new();
        if self.delete_empty_server_farm {
            pairs.push(("deleteEmptyServerFarm", "true"));
        }
        if self.delete_metrics {
            pairs.push(("deleteMetrics", "true"));
        }
        pairs
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MetricAvailability {
    pub retention: String,
    pub time_grain: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MetricDefinition {
    pub name: String,
    pub display_name: String,
    pub unit: String,
    pub primary_aggregation_type: String,
    pub metric_availabilities: Vec<MetricAvailability>,
}

/// One point of a historical usage series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MetricSample {
    pub time_created: String,
    pub total: f64,
    pub count: u64,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MetricData {
    pub name: String,
    pub display_name: String,
    pub unit: String,
    pub primary_aggregation_type: String,
    pub time_grain: String,
    pub start_time: String,
    pub end_time: String,
    pub values: Vec<MetricSample>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MetricResponse {
    pub code: String,
    pub message: String,
    pub data: MetricData,
}

/// Narrows a historical usage query. Empty fields are left to the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsQuery {
    pub names: Vec<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub time_grain: Option<String>,
}

impl MetricsQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_window(mut self, start_time: impl Into<String>, end_time: impl Into<String>) -> Self {
        self.start_time = Some(start_time.into());
        self.end_time = Some(end_time.into());
        self
    }

    pub fn with_time_grain(mut self, time_grain: impl Into<String>) -> Self {
        self.time_grain = Some(time_grain.into());
        self
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if !self.names.is_empty() {
            pairs.push(("names", self.names.join(",")));
        }
        if let Some(start) = &self.start_time {
            pairs.push(("StartTime", start.clone()));
        }
        if let Some(end) = &self.end_time {
            pairs.push(("EndTime", end.clone()));
        }
        if let Some(grain) = &self.time_grain {
            pairs.push(("timeGrain", grain.clone()));
        }
        pairs
    }
}
