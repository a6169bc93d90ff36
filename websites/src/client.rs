use crate::config::WebsiteServiceConfig;
use crate::service::{WebsiteError, WebsiteManagement, WebsiteResult};
use crate::types::{
    CreateSiteOptions, DeleteSiteOptions, MetricDefinition, MetricResponse, MetricsQuery, Site,
    WebSpace,
};
use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Site creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateSiteRequest {
    name: String,
    host_names: Vec<String>,
    compute_mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    server_farm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    site_mode: Option<String>,
    web_space_to_create: WebSpaceToCreate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WebSpaceToCreate {
    name: String,
    geo_region: String,
    plan: String,
}

pub struct WebsiteClient {
    client: reqwest::Client,
    config: WebsiteServiceConfig,
    base_url: Url,
}

impl WebsiteClient {
    pub fn new(config: WebsiteServiceConfig) -> WebsiteResult<Self> {
        config
            .validate()
            .map_err(|msg| WebsiteError::InvalidConfig { message: msg })?;

        let base_url = Url::parse(config.base_url.trim_end_matches('/')).map_err(|e| {
            WebsiteError::InvalidConfig {
                message: format!("Invalid base URL '{}': {}", config.base_url, e),
            }
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WebsiteError::InvalidConfig {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    pub fn from_env() -> WebsiteResult<Self> {
        Self::new(WebsiteServiceConfig::from_env())
    }

    pub fn config(&self) -> &WebsiteServiceConfig {
        &self.config
    }

    /// `{base}/{subscription}/services/webspaces/{segments...}`, percent-encoded.
    fn url(&self, segments: &[&str]) -> WebsiteResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| WebsiteError::InvalidConfig {
                message: format!("Base URL '{}' cannot carry a path", self.config.base_url),
            })?
            .pop_if_empty()
            .push(&self.config.subscription_id)
            .push("services")
            .push("webspaces")
            .extend(segments);
        Ok(url)
    }

    fn site_url(&self, webspace: &str, name: &str, tail: Option<&str>) -> WebsiteResult<Url> {
        match tail {
            Some(tail) => self.url(&[webspace, "sites", name, tail]),
            None => self.url(&[webspace, "sites", name]),
        }
    }

    fn prepare(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request
            .header("x-ms-version", &self.config.api_version)
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.config.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn handle_http_error(err: reqwest::Error) -> WebsiteError {
        if err.is_timeout() {
            WebsiteError::ServiceUnavailable {
                message: "Request timeout".to_string(),
            }
        } else if err.is_connect() {
            WebsiteError::ServiceUnavailable {
                message: "Cannot connect to website management service".to_string(),
            }
        } else {
            WebsiteError::Network(err)
        }
    }

    fn status_error(status: StatusCode, body: String, resource: &str) -> WebsiteError {
        match status.as_u16() {
            404 => WebsiteError::NotFound {
                resource: resource.to_string(),
            },
            401 | 403 => WebsiteError::Authentication,
            429 => WebsiteError::RateLimit,
            503 => WebsiteError::ServiceUnavailable {
                message: if body.is_empty() {
                    "Website management service unavailable".to_string()
                } else {
                    body
                },
            },
            code => WebsiteError::Api {
                status: code,
                message: body,
            },
        }
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> WebsiteResult<reqwest::Response> {
        let response = self
            .prepare(request)
            .send()
            .await
            .map_err(Self::handle_http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            debug!("{} answered {}: {}", resource, status, error_text);
            return Err(Self::status_error(status, error_text, resource));
        }

        Ok(response)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> WebsiteResult<T> {
        let response = self.execute(request, resource).await?;
        let body = response.bytes().await.map_err(Self::handle_http_error)?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl WebsiteManagement for WebsiteClient {
    async fn list_webspaces(&self) -> WebsiteResult<Vec<WebSpace>> {
        debug!("Listing web spaces");

        let url = self.url(&[])?;
        let webspaces: Vec<WebSpace> = self.fetch(self.client.get(url), "webspaces").await?;

        info!("Retrieved {} web spaces", webspaces.len());
        Ok(webspaces)
    }

    async fn get_webspace(&self, webspace: &str) -> WebsiteResult<WebSpace> {
        debug!("Fetching web space {}", webspace);

        let url = self.url(&[webspace])?;
        self.fetch(self.client.get(url), &format!("webspace {}", webspace))
            .await
    }

    async fn list_sites(&self, webspace: &str) -> WebsiteResult<Vec<Site>> {
        debug!("Listing sites in {}", webspace);

        let url = self.url(&[webspace, "sites"])?;
        let sites: Vec<Site> = self
            .fetch(self.client.get(url), &format!("webspace {}", webspace))
            .await?;

        info!("Retrieved {} sites from {}", sites.len(), webspace);
        Ok(sites)
    }

    async fn get_site(&self, webspace: &str, name: &str) -> WebsiteResult<Site> {
        debug!("Fetching site {}/{}", webspace, name);

        let url = self.site_url(webspace, name, None)?;
        self.fetch(self.client.get(url), &format!("site {}/{}", webspace, name))
            .await
    }

    async fn create_site(
        &self,
        webspace: &str,
        name: &str,
        geo_region: &str,
        host_names: &[String],
        options: &CreateSiteOptions,
    ) -> WebsiteResult<Site> {
        debug!("Creating site {}/{} in {}", webspace, name, geo_region);

        let body = CreateSiteRequest {
            name: name.to_string(),
            host_names: host_names.to_vec(),
            compute_mode: options.compute_mode.clone(),
            server_farm: options.server_farm.clone(),
            site_mode: options.site_mode.clone(),
            web_space_to_create: WebSpaceToCreate {
                name: webspace.to_string(),
                geo_region: geo_region.to_string(),
                plan: options.plan.clone(),
            },
        };

        let url = self.url(&[webspace, "sites"])?;
        let site: Site = self
            .fetch(
                self.client.post(url).json(&body),
                &format!("site {}/{}", webspace, name),
            )
            .await?;

        info!("Created site {}/{}", webspace, name);
        Ok(site)
    }

    async fn delete_site(
        &self,
        webspace: &str,
        name: &str,
        options: DeleteSiteOptions,
    ) -> WebsiteResult<()> {
        debug!("Deleting site {}/{} ({:?})", webspace, name, options);

        let url = self.site_url(webspace, name, None)?;
        let request = self.client.delete(url).query(&options.query_pairs());
        self.execute(request, &format!("site {}/{}", webspace, name))
            .await?;

        info!("Deleted site {}/{}", webspace, name);
        Ok(())
    }

    async fn restart_site(&self, webspace: &str, name: &str) -> WebsiteResult<()> {
        debug!("Restarting site {}/{}", webspace, name);

        let url = self.site_url(webspace, name, Some("restart"))?;
        self.execute(
            self.client.post(url),
            &format!("site {}/{}", webspace, name),
        )
        .await?;

        info!("Restarted site {}/{}", webspace, name);
        Ok(())
    }

    async fn get_metric_definitions(
        &self,
        webspace: &str,
        name: &str,
    ) -> WebsiteResult<Vec<MetricDefinition>> {
        debug!("Fetching metric definitions for {}/{}", webspace, name);

        let url = self.site_url(webspace, name, Some("metricdefinitions"))?;
        self.fetch(self.client.get(url), &format!("site {}/{}", webspace, name))
            .await
    }

    async fn get_historical_usage_metrics(
        &self,
        webspace: &str,
        name: &str,
        query: &MetricsQuery,
    ) -> WebsiteResult<Vec<MetricResponse>> {
        debug!("Fetching historical usage metrics for {}/{}", webspace, name);

        let url = self.site_url(webspace, name, Some("metrics"))?;
        let request = self.client.get(url).query(&query.query_pairs());
        self.fetch(request, &format!("site {}/{}", webspace, name))
            .await
    }

    fn service_name(&self) -> &'static str {
        "websites"
    }
}
