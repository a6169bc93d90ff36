pub mod assertions;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod naming;
pub mod probe;

pub use assertions::{
    assert_enum_member, assert_equals, assert_fields_present, assert_non_empty, assert_true,
    AssertionFailure, AssertionResult, AssertionSet, COMPUTE_MODES, SITE_MODES,
};
pub use config::{LifecycleConfig, RetryPolicy};
pub use error::{HarnessError, HarnessResult, Phase};
pub use lifecycle::{run_case, CaseReport, CaseState, SiteLifecycle, TeardownOutcome, TestSite};
pub use naming::{is_valid_site_name, unique_name, validate_prefix, NamingError, MAX_NAME_LEN};
pub use probe::{probe, probe_until, PollOutcome, ProbeResult};
