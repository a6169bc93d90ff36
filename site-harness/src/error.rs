use crate::assertions::AssertionFailure;
use crate::lifecycle::CaseState;
use crate::naming::NamingError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use websites::WebsiteError;

/// Phase of a test case in which a failure surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Setup,
    Verify,
    Exercise,
    Assert,
    Teardown,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Setup => write!(f, "setup"),
            Phase::Verify => write!(f, "verify"),
            Phase::Exercise => write!(f, "exercise"),
            Phase::Assert => write!(f, "assert"),
            Phase::Teardown => write!(f, "teardown"),
        }
    }
}

/// Errors raised while driving a site through its lifecycle.
///
/// Teardown failures are deliberately absent: they are reported through
/// [`crate::lifecycle::TeardownOutcome`] and never escalate.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// The remote create call failed
    #[error("Setup failed for site '{site}': {source}")]
    Setup { site: String, source: WebsiteError },

    /// The site never became visible within the verification bound
    #[error("Site '{site}' not visible after {attempts} probes over {waited:?}")]
    VerificationTimeout {
        site: String,
        attempts: u32,
        waited: Duration,
    },

    /// The site was still visible after the absence bound
    #[error("Site '{site}' still visible after {attempts} probes over {waited:?}")]
    StillPresent {
        site: String,
        attempts: u32,
        waited: Duration,
    },

    /// Infrastructure failure while probing, as opposed to absence
    #[error("Probe of site '{site}' failed during {phase}: {source}")]
    Probe {
        site: String,
        phase: Phase,
        source: WebsiteError,
    },

    /// An exercised remote operation failed
    #[error("Operation '{operation}' on site '{site}' failed: {source}")]
    Exercise {
        site: String,
        operation: String,
        source: WebsiteError,
    },

    /// One or more checks failed
    #[error("{} assertion(s) failed for '{}': {}", .failures.len(), .resource, summarize(.failures))]
    Assertions {
        resource: String,
        failures: Vec<AssertionFailure>,
    },

    #[error("Invalid lifecycle transition from {from} to {to} for site '{site}'")]
    InvalidTransition {
        site: String,
        from: CaseState,
        to: CaseState,
    },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Naming error: {0}")]
    Naming(#[from] NamingError),
}

impl HarnessError {
    pub fn phase(&self) -> Phase {
        match self {
            HarnessError::Setup { .. }
            | HarnessError::InvalidConfig { .. }
            | HarnessError::Naming(_) => Phase::Setup,
            HarnessError::VerificationTimeout { .. } => Phase::Verify,
            HarnessError::Probe { phase, .. } => *phase,
            HarnessError::Exercise { .. } => Phase::Exercise,
            HarnessError::InvalidTransition { to, .. } => to.phase(),
            HarnessError::Assertions { .. } => Phase::Assert,
            HarnessError::StillPresent { .. } => Phase::Teardown,
        }
    }

    /// Identifier of the resource under test, when one was minted.
    pub fn resource(&self) -> Option<&str> {
        match self {
            HarnessError::Setup { site, .. }
            | HarnessError::VerificationTimeout { site, .. }
            | HarnessError::StillPresent { site, .. }
            | HarnessError::Probe { site, .. }
            | HarnessError::Exercise { site, .. }
            | HarnessError::InvalidTransition { site, .. } => Some(site),
            HarnessError::Assertions { resource, .. } => Some(resource),
            HarnessError::InvalidConfig { .. } | HarnessError::Naming(_) => None,
        }
    }
}

fn summarize(failures: &[AssertionFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type HarnessResult<T> = Result<T, HarnessError>;
