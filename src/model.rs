// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Domain model for GSLB reconciliation.
//!
//! [`GslbDesiredState`] is the declarative input of a create or status-check
//! cycle, [`GslbProvisionedState`] the input of a delete cycle. Both are built
//! once by the caller and never mutated by the engine. [`ReconcileResult`] is
//! the only mutable value: each reconciler stage returns a partial result and
//! the orchestrator folds them together with [`ReconcileResult::absorb`].
//!
//! All types serialize to camelCase JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::constants::{
    DEFAULT_DISABLED_WEIGHT_PERCENT, DEFAULT_ENABLED_WEIGHT_PERCENT,
    DEFAULT_HEALTH_CHECK_FAILURE_COUNT, DEFAULT_HEALTH_CHECK_INTERVAL_SECS,
    DEFAULT_HEALTH_CHECK_RETRY_DELAY_SECS, DEFAULT_HEALTH_CHECK_TIMEOUT_SECS,
    HEALTH_CHECK_NAME_PREFIX, LOCALITY_SCOPE_PROXIMITY, LOCALITY_SCOPE_ROUND_ROBIN,
};

/// A deployed load-balancer instance in one cloud.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    /// Cloud name, used to look up the cloud and data-center ids
    pub cloud: String,
    /// Routable IP or hostname of the load balancer
    pub vip: String,
    /// Whether the target currently receives traffic
    pub enabled_for_traffic: bool,
    /// Explicit traffic weight; defaults from `enabled_for_traffic` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_percent: Option<u32>,
}

impl Target {
    /// Weight sent to the traffic-distribution gateway.
    ///
    /// An explicit weight is used as-is. Otherwise enabled targets get 100 and
    /// disabled targets get 0.
    #[must_use]
    pub fn effective_weight(&self) -> u32 {
        self.weight_percent.unwrap_or(if self.enabled_for_traffic {
            DEFAULT_ENABLED_WEIGHT_PERCENT
        } else {
            DEFAULT_DISABLED_WEIGHT_PERCENT
        })
    }

    /// True when the VIP is non-blank.
    #[must_use]
    pub fn has_vip(&self) -> bool {
        !self.vip.trim().is_empty()
    }
}

/// Health check protocol.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Tcp,
}

impl Protocol {
    /// Wire name of the protocol.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Tcp => "tcp",
        }
    }

    /// Parse a wire name, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "http" => Some(Self::Http),
            "tcp" => Some(Self::Tcp),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_interval_secs() -> u32 {
    DEFAULT_HEALTH_CHECK_INTERVAL_SECS
}

fn default_timeout_secs() -> u32 {
    DEFAULT_HEALTH_CHECK_TIMEOUT_SECS
}

fn default_retry_delay_secs() -> u32 {
    DEFAULT_HEALTH_CHECK_RETRY_DELAY_SECS
}

fn default_failure_count() -> u32 {
    DEFAULT_HEALTH_CHECK_FAILURE_COUNT
}

/// A liveness probe attached to every target of the host.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub protocol: Protocol,
    pub port: u16,
    /// Probe path; only meaningful for HTTP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u32,
    #[serde(default = "default_failure_count")]
    pub failure_count_to_mark_down: u32,
}

impl HealthCheck {
    /// HTTP check on `port` probing `path`, with default timings.
    pub fn http(port: u16, path: impl Into<String>) -> Self {
        Self::with_defaults(Protocol::Http, port, Some(path.into()))
    }

    /// TCP connect check on `port`, with default timings.
    #[must_use]
    pub fn tcp(port: u16) -> Self {
        Self::with_defaults(Protocol::Tcp, port, None)
    }

    fn with_defaults(protocol: Protocol, port: u16, path: Option<String>) -> Self {
        Self {
            protocol,
            port,
            path,
            interval_secs: DEFAULT_HEALTH_CHECK_INTERVAL_SECS,
            timeout_secs: DEFAULT_HEALTH_CHECK_TIMEOUT_SECS,
            retry_delay_secs: DEFAULT_HEALTH_CHECK_RETRY_DELAY_SECS,
            failure_count_to_mark_down: DEFAULT_HEALTH_CHECK_FAILURE_COUNT,
        }
    }

    /// Deterministic name, `gslb-<protocol>-<port>`.
    #[must_use]
    pub fn name(&self) -> String {
        format!("{HEALTH_CHECK_NAME_PREFIX}-{}-{}", self.protocol, self.port)
    }
}

/// Routing policy across targets.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Distribution {
    #[default]
    Proximity,
    RoundRobin,
}

impl Distribution {
    /// Integer locality scope understood by the traffic-distribution gateway.
    #[must_use]
    pub fn locality_scope(&self) -> u32 {
        match self {
            Self::Proximity => LOCALITY_SCOPE_PROXIMITY,
            Self::RoundRobin => LOCALITY_SCOPE_ROUND_ROBIN,
        }
    }
}

/// DNS settings of the application.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DnsConfig {
    /// DNS zone the aliases and cloud entries live in (e.g., `prod.xyz.com`)
    pub zone: String,
}

/// Maps a cloud to the name of its cloud entry (A record).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CloudARecord {
    pub cloud: String,
    pub a_record_name: String,
}

impl CloudARecord {
    pub fn new(cloud: impl Into<String>, a_record_name: impl Into<String>) -> Self {
        Self {
            cloud: cloud.into(),
            a_record_name: a_record_name.into(),
        }
    }
}

/// Desired GSLB state for one application.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GslbDesiredState {
    pub app: String,
    pub subdomain: String,
    pub targets: Vec<Target>,
    #[serde(default)]
    pub distribution: Distribution,
    #[serde(default)]
    pub health_checks: Vec<HealthCheck>,
    #[serde(default)]
    pub dns_config: DnsConfig,
    /// CNAME aliases that must point at the canonical name
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default, rename = "cloudARecordMap")]
    pub cloud_a_records: Vec<CloudARecord>,
    /// Previously published aliases to retire
    #[serde(default)]
    pub obsolete_aliases: Vec<String>,
    /// Previously published cloud entries to retire
    #[serde(default)]
    pub obsolete_cloud_a_records: Vec<CloudARecord>,
    #[serde(default)]
    pub correlation_id: String,
}

impl GslbDesiredState {
    /// Canonical base hostname, `.<subdomain>.<base_domain>` lower-cased.
    #[must_use]
    pub fn base_hostname(&self, base_domain: &str) -> String {
        base_hostname(&self.subdomain, base_domain)
    }

    /// Host record name, the lower-cased application name.
    #[must_use]
    pub fn host_name(&self) -> String {
        self.app.to_lowercase()
    }

    /// Canonical traffic-distribution name, `<app><base_hostname>`.
    #[must_use]
    pub fn canonical_name(&self, base_domain: &str) -> String {
        format!("{}{}", self.host_name(), self.base_hostname(base_domain))
    }

    /// Targets with a non-blank VIP, in caller order.
    pub fn usable_targets(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter().filter(|t| t.has_vip())
    }

    /// VIPs of usable targets enabled for traffic.
    #[must_use]
    pub fn enabled_vips(&self) -> Vec<String> {
        self.usable_targets()
            .filter(|t| t.enabled_for_traffic)
            .map(|t| t.vip.clone())
            .collect()
    }

    /// VIP of the first usable target in `cloud`.
    #[must_use]
    pub fn cloud_vip(&self, cloud: &str) -> Option<&str> {
        self.usable_targets()
            .find(|t| t.cloud.eq_ignore_ascii_case(cloud))
            .map(|t| t.vip.as_str())
    }

    /// Lower-cased, de-duplicated aliases in caller order.
    #[must_use]
    pub fn normalized_aliases(&self) -> Vec<String> {
        normalize_names(self.aliases.iter().map(String::as_str))
    }

    /// True when any DNS work is required.
    #[must_use]
    pub fn dns_entries_needed(&self) -> bool {
        !self.aliases.is_empty()
            || !self.cloud_a_records.is_empty()
            || !self.obsolete_aliases.is_empty()
            || !self.obsolete_cloud_a_records.is_empty()
    }
}

/// What currently exists for an application, used for deletion.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GslbProvisionedState {
    pub app: String,
    pub subdomain: String,
    #[serde(default)]
    pub dns_config: DnsConfig,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default, rename = "cloudARecordMap")]
    pub cloud_a_records: Vec<CloudARecord>,
    #[serde(default)]
    pub correlation_id: String,
    /// The application stays enabled elsewhere; only this cloud's DNS footprint is removed
    #[serde(default)]
    pub platform_enabled: bool,
}

impl GslbProvisionedState {
    /// Canonical base hostname, `.<subdomain>.<base_domain>` lower-cased.
    #[must_use]
    pub fn base_hostname(&self, base_domain: &str) -> String {
        base_hostname(&self.subdomain, base_domain)
    }

    /// Host record name, the lower-cased application name.
    #[must_use]
    pub fn host_name(&self) -> String {
        self.app.to_lowercase()
    }

    /// Canonical traffic-distribution name, `<app><base_hostname>`.
    #[must_use]
    pub fn canonical_name(&self, base_domain: &str) -> String {
        format!("{}{}", self.host_name(), self.base_hostname(base_domain))
    }

    /// Lower-cased, de-duplicated aliases in caller order.
    #[must_use]
    pub fn normalized_aliases(&self) -> Vec<String> {
        normalize_names(self.aliases.iter().map(String::as_str))
    }
}

fn base_hostname(subdomain: &str, base_domain: &str) -> String {
    format!(".{subdomain}.{base_domain}").to_lowercase()
}

/// Lower-case and de-duplicate DNS names, keeping first occurrence order.
pub(crate) fn normalize_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .map(|n| n.trim().to_lowercase())
        .filter(|n| !n.is_empty() && seen.insert(n.clone()))
        .collect()
}

/// Overall outcome of an invocation.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconcileStatus {
    #[default]
    Success,
    Failed,
}

impl ReconcileStatus {
    /// Lower-case label, used in logs and metrics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

/// Result of one create, delete or status-check invocation.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResult {
    pub status: ReconcileStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_name: Option<String>,
    /// Alias or cloud entry name to its target (canonical name or VIP)
    #[serde(default)]
    pub dns_entries: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl ReconcileResult {
    /// An empty, successful result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == ReconcileStatus::Failed
    }

    /// Mark the result FAILED. The first failure message wins.
    pub fn fail(&mut self, message: impl fmt::Display) {
        self.status = ReconcileStatus::Failed;
        if self.failure_message.is_none() {
            self.failure_message = Some(message.to_string());
        }
    }

    /// Fold a stage's partial result into this one.
    ///
    /// Identifiers set by the stage replace the current ones, DNS entries are
    /// merged, and a FAILED stage fails the whole result.
    pub fn absorb(&mut self, partial: ReconcileResult) {
        if let Some(message) = partial.failure_message {
            self.fail(message);
        } else if partial.status == ReconcileStatus::Failed {
            self.status = ReconcileStatus::Failed;
        }
        if partial.base_id.is_some() {
            self.base_id = partial.base_id;
        }
        if partial.host_version.is_some() {
            self.host_version = partial.host_version;
        }
        if partial.deployment_id.is_some() {
            self.deployment_id = partial.deployment_id;
        }
        if partial.canonical_name.is_some() {
            self.canonical_name = partial.canonical_name;
        }
        self.dns_entries.extend(partial.dns_entries);
    }

    /// Stamp the completion time.
    pub fn finalize(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}
