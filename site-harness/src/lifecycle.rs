//! Site lifecycle driver.
//!
//! Each test case walks one freshly named site through
//!
//! ```text
//! Uninitialized -> Created -> Verified -> Exercising -> TornDown
//! ```
//!
//! Any state may jump straight to `TornDown`. [`SiteLifecycle::scoped`] owns
//! the case: the delete is bound to the scope when it is entered and is issued
//! exactly once on every exit path, including panics raised by `assert!` in
//! the body.

use crate::config::LifecycleConfig;
use crate::error::{HarnessError, HarnessResult, Phase};
use crate::naming::unique_name;
use crate::probe::{probe, probe_until, ProbeResult};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use websites::{
    DeleteSiteOptions, MetricDefinition, MetricResponse, MetricsQuery, Site, WebsiteManagement,
    WebsiteResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseState {
    Uninitialized,
    Created,
    Verified,
    Exercising,
    TornDown,
}

impl std::fmt::Display for CaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaseState::Uninitialized => write!(f, "uninitialized"),
            CaseState::Created => write!(f, "created"),
            CaseState::Verified => write!(f, "verified"),
            CaseState::Exercising => write!(f, "exercising"),
            CaseState::TornDown => write!(f, "torn-down"),
        }
    }
}

impl CaseState {
    /// Phase a case is in while moving into this state
    pub fn phase(self) -> Phase {
        match self {
            CaseState::Uninitialized | CaseState::Created => Phase::Setup,
            CaseState::Verified => Phase::Verify,
            CaseState::Exercising => Phase::Exercise,
            CaseState::TornDown => Phase::Teardown,
        }
    }

    pub fn can_transition_to(self, to: CaseState) -> bool {
        matches!(
            (self, to),
            (CaseState::Uninitialized, CaseState::Created)
                | (CaseState::Created, CaseState::Verified)
                | (CaseState::Verified, CaseState::Exercising)
                | (CaseState::Exercising, CaseState::Exercising)
        ) || (to == CaseState::TornDown && self != CaseState::TornDown)
    }
}

/// The ephemeral site owned by one test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSite {
    pub name: String,
    pub webspace: String,
    pub host_names: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeardownOutcome {
    /// No site name was ever minted
    NotNeeded,
    Deleted { site: String },
    /// The service had no such site; the create never landed
    Missing { site: String },
    /// The delete failed; the error was logged and swallowed
    Failed { site: String, reason: String },
}

impl std::fmt::Display for TeardownOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeardownOutcome::NotNeeded => write!(f, "nothing to delete"),
            TeardownOutcome::Deleted { site } => write!(f, "deleted {}", site),
            TeardownOutcome::Missing { site } => write!(f, "{} was already absent", site),
            TeardownOutcome::Failed { site, reason } => {
                write!(f, "failed to delete {}: {}", site, reason)
            }
        }
    }
}

/// What happened to one test case
#[derive(Debug)]
pub struct CaseReport<T> {
    pub site: Option<String>,
    pub result: HarnessResult<T>,
    pub teardown: TeardownOutcome,
}

impl<T> CaseReport<T> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// The delete was attempted and failed, so the site may still exist
    pub fn leaked_site(&self) -> bool {
        matches!(self.teardown, TeardownOutcome::Failed { .. })
    }

    pub fn failed_phase(&self) -> Option<Phase> {
        self.result.as_ref().err().map(HarnessError::phase)
    }

    pub fn summary(&self) -> String {
        let site = self.site.as_deref().unwrap_or("<unnamed>");
        match &self.result {
            Ok(_) => format!("site {}: passed; teardown: {}", site, self.teardown),
            Err(e) => format!(
                "site {}: failed during {}: {}; teardown: {}",
                site,
                e.phase(),
                e,
                self.teardown
            ),
        }
    }

    pub fn into_result(self) -> HarnessResult<T> {
        self.result
    }
}

pub struct SiteLifecycle {
    client: Arc<dyn WebsiteManagement>,
    config: LifecycleConfig,
    state: CaseState,
    site: Option<TestSite>,
    deletes_issued: u32,
    teardown: Option<TeardownOutcome>,
}

impl SiteLifecycle {
    pub fn new(client: Arc<dyn WebsiteManagement>, config: LifecycleConfig) -> HarnessResult<Self> {
        config.validate()?;

        Ok(Self {
            client,
            config,
            state: CaseState::Uninitialized,
            site: None,
            deletes_issued: 0,
            teardown: None,
        })
    }

    pub fn state(&self) -> CaseState {
        self.state
    }

    pub fn site(&self) -> Option<&TestSite> {
        self.site.as_ref()
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn client(&self) -> Arc<dyn WebsiteManagement> {
        Arc::clone(&self.client)
    }

    /// Number of remote deletes this case has issued
    pub fn deletes_issued(&self) -> u32 {
        self.deletes_issued
    }

    /// Outcome of the first teardown, once one has run
    pub fn teardown_outcome(&self) -> Option<&TeardownOutcome> {
        self.teardown.as_ref()
    }

    fn site_name(&self) -> String {
        self.site
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_default()
    }

    fn transition(&mut self, to: CaseState) -> HarnessResult<()> {
        if !self.state.can_transition_to(to) {
            return Err(HarnessError::InvalidTransition {
                site: self.site_name(),
                from: self.state,
                to,
            });
        }
        debug!("Site {}: {} -> {}", self.site_name(), self.state, to);
        self.state = to;
        Ok(())
    }

    /// The minted site, or an invalid transition towards `to` when there is none
    fn require_site(&self, to: CaseState) -> HarnessResult<TestSite> {
        self.site
            .clone()
            .ok_or_else(|| HarnessError::InvalidTransition {
                site: String::new(),
                from: self.state,
                to,
            })
    }

    /// Mint a name and create the site. A failed create is fatal to the case.
    pub async fn setup(&mut self) -> HarnessResult<TestSite> {
        if !self.state.can_transition_to(CaseState::Created) || self.site.is_some() {
            return Err(HarnessError::InvalidTransition {
                site: self.site_name(),
                from: self.state,
                to: CaseState::Created,
            });
        }

        let name = unique_name(&self.config.name_prefix)?;
        let site = TestSite {
            host_names: self.config.host_names_for(&name),
            webspace: self.config.webspace.clone(),
            name,
            created_at: Utc::now(),
        };
        // Recorded before the call so teardown covers a half-finished create
        self.site = Some(site.clone());

        info!("Creating site {}/{}", site.webspace, site.name);
        self.client
            .create_site(
                &site.webspace,
                &site.name,
                &self.config.geo_region,
                &site.host_names,
                &self.config.create_options,
            )
            .await
            .map_err(|source| HarnessError::Setup {
                site: site.name.clone(),
                source,
            })?;

        self.transition(CaseState::Created)?;
        Ok(site)
    }

    /// Poll until the created site is visible.
    pub async fn verify(&mut self) -> HarnessResult<ProbeResult> {
        if self.state != CaseState::Created {
            return Err(HarnessError::InvalidTransition {
                site: self.site_name(),
                from: self.state,
                to: CaseState::Verified,
            });
        }
        let site = self.require_site(CaseState::Verified)?;

        let outcome = probe_until(
            self.client.as_ref(),
            &site.webspace,
            &site.name,
            true,
            &self.config.verify_policy,
        )
        .await
        .map_err(|source| HarnessError::Probe {
            site: site.name.clone(),
            phase: Phase::Verify,
            source,
        })?;

        if !outcome.satisfied {
            return Err(HarnessError::VerificationTimeout {
                site: site.name,
                attempts: outcome.attempts,
                waited: outcome.waited,
            });
        }

        info!(
            "Site {} visible after {} probe(s) in {:?}",
            site.name, outcome.attempts, outcome.waited
        );
        self.transition(CaseState::Verified)?;
        Ok(outcome.result)
    }

    /// Run `op` against the verified site and hand back its raw result.
    pub async fn exercise<T, F, Fut>(&mut self, operation: &str, op: F) -> HarnessResult<T>
    where
        F: FnOnce(Arc<dyn WebsiteManagement>, TestSite) -> Fut,
        Fut: Future<Output = WebsiteResult<T>>,
    {
        if !matches!(self.state, CaseState::Verified | CaseState::Exercising) {
            return Err(HarnessError::InvalidTransition {
                site: self.site_name(),
                from: self.state,
                to: CaseState::Exercising,
            });
        }
        let site = self.require_site(CaseState::Exercising)?;
        self.transition(CaseState::Exercising)?;

        debug!("Exercising {} on site {}", operation, site.name);
        let name = site.name.clone();
        op(self.client(), site)
            .await
            .map_err(|source| HarnessError::Exercise {
                site: name,
                operation: operation.to_string(),
                source,
            })
    }

    pub async fn restart(&mut self) -> HarnessResult<()> {
        self.exercise("restart", |client, site| async move {
            client.restart_site(&site.webspace, &site.name).await
        })
        .await
    }

    pub async fn fetch_site(&mut self) -> HarnessResult<Site> {
        self.exercise("get_site", |client, site| async move {
            client.get_site(&site.webspace, &site.name).await
        })
        .await
    }

    pub async fn list_sites(&mut self) -> HarnessResult<Vec<Site>> {
        self.exercise("list_sites", |client, site| async move {
            client.list_sites(&site.webspace).await
        })
        .await
    }

    pub async fn metric_definitions(&mut self) -> HarnessResult<Vec<MetricDefinition>> {
        self.exercise("get_metric_definitions", |client, site| async move {
            client
                .get_metric_definitions(&site.webspace, &site.name)
                .await
        })
        .await
    }

    pub async fn historical_usage_metrics(
        &mut self,
        query: MetricsQuery,
    ) -> HarnessResult<Vec<MetricResponse>> {
        self.exercise("get_historical_usage_metrics", |client, site| async move {
            client
                .get_historical_usage_metrics(&site.webspace, &site.name, &query)
                .await
        })
        .await
    }

    /// Current visibility of the case's site
    pub async fn probe(&self) -> HarnessResult<ProbeResult> {
        let phase = match self.state {
            CaseState::Uninitialized => Phase::Setup,
            CaseState::Created => Phase::Verify,
            CaseState::Verified | CaseState::Exercising => Phase::Exercise,
            CaseState::TornDown => Phase::Teardown,
        };
        let site = self.require_site(CaseState::Verified)?;
        probe(self.client.as_ref(), &site.webspace, &site.name)
            .await
            .map_err(|source| HarnessError::Probe {
                site: site.name,
                phase,
                source,
            })
    }

    /// Poll until the site is gone, tolerating delayed deletes.
    pub async fn await_absent(&self) -> HarnessResult<ProbeResult> {
        let site = self.require_site(CaseState::TornDown)?;
        let outcome = probe_until(
            self.client.as_ref(),
            &site.webspace,
            &site.name,
            false,
            &self.config.absence_policy,
        )
        .await
        .map_err(|source| HarnessError::Probe {
            site: site.name.clone(),
            phase: Phase::Teardown,
            source,
        })?;

        if !outcome.satisfied {
            return Err(HarnessError::StillPresent {
                site: site.name,
                attempts: outcome.attempts,
                waited: outcome.waited,
            });
        }
        Ok(outcome.result)
    }

    /// Delete the site with the configured options. Never fails.
    pub async fn teardown(&mut self) -> TeardownOutcome {
        let options = self.config.delete_options;
        self.teardown_with(options).await
    }

    /// Delete the site with explicit options. Runs the remote delete at most
    /// once per case; later calls return the outcome of the first one.
    pub async fn teardown_with(&mut self, options: DeleteSiteOptions) -> TeardownOutcome {
        if let Some(outcome) = &self.teardown {
            debug!("Teardown already ran: {}", outcome);
            return outcome.clone();
        }
        self.state = CaseState::TornDown;

        let outcome = match self.site.clone() {
            None => TeardownOutcome::NotNeeded,
            Some(site) => {
                self.deletes_issued += 1;
                match self
                    .client
                    .delete_site(&site.webspace, &site.name, options)
                    .await
                {
                    Ok(()) => {
                        info!("Tore down site {}/{}", site.webspace, site.name);
                        TeardownOutcome::Deleted { site: site.name }
                    }
                    Err(e) if e.is_not_found() => {
                        debug!("Site {} was absent at teardown", site.name);
                        TeardownOutcome::Missing { site: site.name }
                    }
                    Err(e) => {
                        warn!("Teardown of site {} failed: {}", site.name, e);
                        TeardownOutcome::Failed {
                            site: site.name,
                            reason: e.to_string(),
                        }
                    }
                }
            }
        };

        self.teardown = Some(outcome.clone());
        outcome
    }

    /// Run `body` inside a scope whose exit always tears the site down.
    ///
    /// A panic from the body is re-raised after teardown completes.
    pub async fn scoped<T, F>(mut self, body: F) -> CaseReport<T>
    where
        F: for<'c> FnOnce(&'c mut SiteLifecycle) -> BoxFuture<'c, HarnessResult<T>>,
    {
        let outcome = AssertUnwindSafe(body(&mut self)).catch_unwind().await;
        let teardown = self.teardown().await;
        let site = self.site.as_ref().map(|s| s.name.clone());

        match outcome {
            Ok(result) => {
                if let Err(e) = &result {
                    error!(
                        "Case for site {} failed during {}: {}",
                        site.as_deref().unwrap_or("<unnamed>"),
                        e.phase(),
                        e
                    );
                }
                CaseReport {
                    site,
                    result,
                    teardown,
                }
            }
            Err(panic) => {
                error!(
                    "Case for site {} panicked; teardown: {}",
                    site.as_deref().unwrap_or("<unnamed>"),
                    teardown
                );
                std::panic::resume_unwind(panic)
            }
        }
    }
}

impl Drop for SiteLifecycle {
    fn drop(&mut self) {
        if self.state == CaseState::TornDown {
            return;
        }
        let Some(site) = self.site.take() else {
            return;
        };

        warn!(
            "Site {}/{} dropped without teardown; scheduling a best-effort delete",
            site.webspace, site.name
        );
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let client = Arc::clone(&self.client);
            let options = self.config.delete_options;
            handle.spawn(async move {
                if let Err(e) = client
                    .delete_site(&site.webspace, &site.name, options)
                    .await
                {
                    warn!("Best-effort delete of site {} failed: {}", site.name, e);
                }
            });
        }
    }
}

/// Build a lifecycle for one case and run `body` in its scope.
pub async fn run_case<T, F>(
    client: Arc<dyn WebsiteManagement>,
    config: LifecycleConfig,
    body: F,
) -> CaseReport<T>
where
    F: for<'c> FnOnce(&'c mut SiteLifecycle) -> BoxFuture<'c, HarnessResult<T>>,
{
    match SiteLifecycle::new(client, config) {
        Ok(lifecycle) => lifecycle.scoped(body).await,
        Err(e) => CaseReport {
            site: None,
            result: Err(e),
            teardown: TeardownOutcome::NotNeeded,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_state_display() {
        assert_eq!(CaseState::Uninitialized.to_string(), "uninitialized");
        assert_eq!(CaseState::Created.to_string(), "created");
        assert_eq!(CaseState::Verified.to_string(), "verified");
        assert_eq!(CaseState::Exercising.to_string(), "exercising");
        assert_eq!(CaseState::TornDown.to_string(), "torn-down");
    }

    #[test]
    fn test_valid_transitions() {
        assert!(CaseState::Uninitialized.can_transition_to(CaseState::Created));
        assert!(CaseState::Created.can_transition_to(CaseState::Verified));
        assert!(CaseState::Verified.can_transition_to(CaseState::Exercising));
        assert!(CaseState::Exercising.can_transition_to(CaseState::Exercising));

        for state in [
            CaseState::Uninitialized,
            CaseState::Created,
            CaseState::Verified,
            CaseState::Exercising,
        ] {
            assert!(state.can_transition_to(CaseState::TornDown));
        }
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!CaseState::Uninitialized.can_transition_to(CaseState::Verified));
        assert!(!CaseState::Created.can_transition_to(CaseState::Exercising));
        assert!(!CaseState::Verified.can_transition_to(CaseState::Created));
        assert!(!CaseState::TornDown.can_transition_to(CaseState::TornDown));
        assert!(!CaseState::TornDown.can_transition_to(CaseState::Created));
    }

    #[test]
    fn test_report_summary() {
        let report: CaseReport<()> = CaseReport {
            site: Some("uts-1".to_string()),
            result: Err(HarnessError::VerificationTimeout {
                site: "uts-1".to_string(),
                attempts: 8,
                waited: std::time::Duration::from_secs(25),
            }),
            teardown: TeardownOutcome::Deleted {
                site: "uts-1".to_string(),
            },
        };

        assert!(!report.is_success());
        assert_eq!(report.failed_phase(), Some(Phase::Verify));
        let summary = report.summary();
        assert!(summary.contains("failed during verify"));
        assert!(summary.contains("teardown: deleted uts-1"));

        let report = CaseReport {
            site: None,
            result: Ok(1),
            teardown: TeardownOutcome::NotNeeded,
        };
        assert!(report.is_success());
        assert_eq!(report.failed_phase(), None);
        assert_eq!(report.into_result().unwrap(), 1);
    }
}
