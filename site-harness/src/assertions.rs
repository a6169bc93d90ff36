//! Validators over service responses.
//!
//! The free functions are pure and stop at the first problem. [`AssertionSet`]
//! collects failures across many checks so one flaky field does not hide the
//! rest of the picture.

use crate::error::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use websites::{MetricDefinition, MetricResponse, Site, WebSpace};

pub const COMPUTE_MODES: &[&str] = &["Shared", "Dedicated"];
pub const SITE_MODES: &[&str] = &["Limited", "Basic"];

/// A single failed expectation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionFailure {
    /// Identifier of the resource under test
    pub resource: String,
    /// Field or path that was checked
    pub path: String,
    pub expected: String,
    pub actual: String,
}

impl AssertionFailure {
    pub fn new(
        resource: impl Into<String>,
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            resource: resource.into(),
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl std::fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {}: expected {}, got {}",
            self.resource, self.path, self.expected, self.actual
        )
    }
}

pub type AssertionResult = Result<(), AssertionFailure>;

pub fn assert_non_empty<T>(resource: &str, path: &str, items: &[T]) -> AssertionResult {
    if items.is_empty() {
        return Err(AssertionFailure::new(
            resource,
            path,
            "at least 1 item",
            "0 items",
        ));
    }
    Ok(())
}

pub fn assert_enum_member(
    resource: &str,
    path: &str,
    value: &str,
    allowed: &[&str],
) -> AssertionResult {
    if !allowed.contains(&value) {
        return Err(AssertionFailure::new(
            resource,
            path,
            format!("one of [{}]", allowed.join(", ")),
            format!("{:?}", value),
        ));
    }
    Ok(())
}

pub fn assert_equals(resource: &str, path: &str, actual: &str, expected: &str) -> AssertionResult {
    if actual != expected {
        return Err(AssertionFailure::new(
            resource,
            path,
            format!("{:?}", expected),
            format!("{:?}", actual),
        ));
    }
    Ok(())
}

pub fn assert_true(resource: &str, path: &str, value: bool) -> AssertionResult {
    if !value {
        return Err(AssertionFailure::new(resource, path, "true", "false"));
    }
    Ok(())
}

/// Fail on the first field of `object` that is missing, null, or empty.
///
/// Fields are dotted paths (`data.time_grain`, `metric_availabilities.0.retention`)
/// matched against the serialized form, ignoring case and underscores so that
/// Rust field names resolve against the wire names.
pub fn assert_fields_present<T: Serialize>(
    resource: &str,
    object: &T,
    fields: &[&str],
) -> AssertionResult {
    let value = serde_json::to_value(object).map_err(|e| {
        AssertionFailure::new(resource, "<object>", "a serializable value", e.to_string())
    })?;

    for field in fields {
        match lookup(&value, field) {
            None => {
                return Err(AssertionFailure::new(
                    resource, *field, "a value", "undefined",
                ))
            }
            Some(found) if is_empty(found) => {
                return Err(AssertionFailure::new(
                    resource,
                    *field,
                    "a non-empty value",
                    found.to_string(),
                ))
            }
            Some(_) => {}
        }
    }

    Ok(())
}

fn normalize(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => {
            let wanted = normalize(segment);
            map.iter()
                .find(|(key, _)| normalize(key) == wanted)
                .map(|(_, v)| v)
        }
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Collects failures for one resource without aborting on the first
#[derive(Debug, Clone)]
pub struct AssertionSet {
    resource: String,
    failures: Vec<AssertionFailure>,
}

impl AssertionSet {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            failures: Vec::new(),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn failures(&self) -> &[AssertionFailure] {
        &self.failures
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn record(&mut self, result: AssertionResult) -> &mut Self {
        if let Err(failure) = result {
            self.failures.push(failure);
        }
        self
    }

    pub fn non_empty<T>(&mut self, path: &str, items: &[T]) -> &mut Self {
        let result = assert_non_empty(&self.resource, path, items);
        self.record(result)
    }

    pub fn enum_member(&mut self, path: &str, value: &str, allowed: &[&str]) -> &mut Self {
        let result = assert_enum_member(&self.resource, path, value, allowed);
        self.record(result)
    }

    pub fn equals(&mut self, path: &str, actual: &str, expected: &str) -> &mut Self {
        let result = assert_equals(&self.resource, path, actual, expected);
        self.record(result)
    }

    pub fn is_true(&mut self, path: &str, value: bool) -> &mut Self {
        let result = assert_true(&self.resource, path, value);
        self.record(result)
    }

    pub fn fields_present<T: Serialize>(&mut self, object: &T, fields: &[&str]) -> &mut Self {
        let result = assert_fields_present(&self.resource, object, fields);
        self.record(result)
    }

    pub fn check_webspace(
        &mut self,
        webspace: &WebSpace,
        geo_region: &str,
        geo_location: Option<&str>,
    ) -> &mut Self {
        self.fields_present(webspace, &["name"]);
        self.equals("geo_region", &webspace.geo_region, geo_region);
        if let Some(location) = geo_location {
            self.equals("geo_location", &webspace.geo_location, location);
        }
        self
    }

    /// Shape of a freshly created, running site
    pub fn check_site(&mut self, site: &Site, name: &str, webspace: &str) -> &mut Self {
        self.fields_present(
            site,
            &[
                "availability_state",
                "enabled_host_names",
                "host_name_ssl_states",
                "host_names",
                "self_link",
                "server_farm",
            ],
        );
        self.enum_member("compute_mode", &site.compute_mode, COMPUTE_MODES);
        self.enum_member("site_mode", &site.site_mode, SITE_MODES);
        self.is_true("enabled", site.enabled);
        self.equals("name", &site.name, name);
        self.equals("repository_site_name", &site.repository_site_name, name);
        self.equals("state", &site.state, "Running");
        self.equals(
            "storage_recovery_default_state",
            &site.storage_recovery_default_state,
            "Running",
        );
        self.equals("usage_state", &site.usage_state, "Normal");
        self.equals("web_space", &site.web_space, webspace);
        self
    }

    pub fn check_metric_definitions(&mut self, definitions: &[MetricDefinition]) -> &mut Self {
        self.non_empty("metric_definitions", definitions);

        for (i, definition) in definitions.iter().enumerate() {
            let before = self.failures.len();
            self.fields_present(
                definition,
                &[
                    "name",
                    "display_name",
                    "unit",
                    "primary_aggregation_type",
                    "metric_availabilities",
                ],
            );
            for (j, availability) in definition.metric_availabilities.iter().enumerate() {
                let start = self.failures.len();
                self.fields_present(availability, &["retention", "time_grain"]);
                self.prefix_new_failures(start, &format!("metric_availabilities.{}", j));
            }
            self.prefix_new_failures(before, &format!("metric_definitions.{}", i));
        }
        self
    }

    pub fn check_metric_responses(&mut self, responses: &[MetricResponse]) -> &mut Self {
        self.non_empty("metric_responses", responses);

        for (i, response) in responses.iter().enumerate() {
            let before = self.failures.len();
            self.fields_present(
                response,
                &[
                    "code",
                    "data.name",
                    "data.display_name",
                    "data.unit",
                    "data.primary_aggregation_type",
                    "data.time_grain",
                    "data.start_time",
                    "data.end_time",
                ],
            );
            self.prefix_new_failures(before, &format!("metric_responses.{}", i));
        }
        self
    }

    /// Qualify paths recorded since `from` with `prefix`
    fn prefix_new_failures(&mut self, from: usize, prefix: &str) {
        for failure in &mut self.failures[from..] {
            failure.path = format!("{}.{}", prefix, failure.path);
        }
    }

    pub fn finish(self) -> HarnessResult<()> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::Assertions {
                resource: self.resource,
                failures: self.failures,
            })
        }
    }
}
