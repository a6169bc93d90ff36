//! Existence checks against the remote service.
//!
//! "Not found" is an ordinary negative answer here; every other failure is
//! handed back to the caller untouched so infrastructure problems are never
//! mistaken for absence.

use crate::config::RetryPolicy;
use std::time::{Duration, Instant};
use tracing::debug;
use websites::{Site, WebsiteManagement, WebsiteResult};

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub exists: bool,
    /// Last state observed, when the site was visible
    pub snapshot: Option<Site>,
}

impl ProbeResult {
    pub fn present(site: Site) -> Self {
        Self {
            exists: true,
            snapshot: Some(site),
        }
    }

    pub fn absent() -> Self {
        Self {
            exists: false,
            snapshot: None,
        }
    }
}

/// Result of polling until a site reaches the wanted visibility
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    pub result: ProbeResult,
    pub attempts: u32,
    pub waited: Duration,
    pub satisfied: bool,
}

pub async fn probe(
    client: &dyn WebsiteManagement,
    webspace: &str,
    name: &str,
) -> WebsiteResult<ProbeResult> {
    match client.get_site(webspace, name).await {
        Ok(site) => Ok(ProbeResult::present(site)),
        Err(e) if e.is_not_found() => Ok(ProbeResult::absent()),
        Err(e) => Err(e),
    }
}

/// Probe until `exists == want_exists` or the policy runs out of attempts.
///
/// Transport failures stop polling immediately and are returned as errors.
pub async fn probe_until(
    client: &dyn WebsiteManagement,
    webspace: &str,
    name: &str,
    want_exists: bool,
    policy: &RetryPolicy,
) -> WebsiteResult<PollOutcome> {
    let start = Instant::now();
    let mut attempts = 0;

    loop {
        let result = probe(client, webspace, name).await?;
        attempts += 1;

        if result.exists == want_exists || attempts >= policy.max_attempts {
            return Ok(PollOutcome {
                satisfied: result.exists == want_exists,
                result,
                attempts,
                waited: start.elapsed(),
            });
        }

        let delay = policy.calculate_delay(attempts - 1);
        debug!(
            "Site {}/{} exists={} (want {}), probing again in {:?}",
            webspace, name, result.exists, want_exists, delay
        );
        tokio::time::sleep(delay).await;
    }
}
