// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Platform deployment requests and their translation into reconcile inputs.
//!
//! A [`GslbRequest`] describes a platform as the deployment pipeline sees it:
//! its clouds with their priority and admin status, the load balancers that
//! were deployed in each cloud, listener and ECV configuration, and the
//! current and previous FQDN alias configuration. This module turns it into a
//! [`GslbDesiredState`] or [`GslbProvisionedState`]. No I/O happens here.
//!
//! # Derivation Rules
//!
//! - Subdomain: the custom subdomain if set, else `<environment>.<assembly>.<org>`
//! - A deployed LB named `<...>-<cloudId>-<index>` belongs to cloud `cloudId`
//! - A cloud is primary when its priority is `"1"` and its admin status is
//!   `active` or `inactive`; primary targets are enabled for traffic
//! - Health checks come from listeners (`"<proto> <lbPort> <proto> <ecvPort>"`)
//!   that have an ECV entry (`ecvPort -> "<METHOD> <path>"`)

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::constants::{
    CLOUD_PRIORITY_PRIMARY, CLOUD_STATUS_ACTIVE, CLOUD_STATUS_INACTIVE, DISTRIBUTION_PROXIMITY,
};
use crate::errors::ReconcileError;
use crate::model::{
    normalize_names, CloudARecord, Distribution, DnsConfig, GslbDesiredState,
    GslbProvisionedState, HealthCheck, Target,
};

/// Alias configuration of an FQDN component.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Fqdn {
    /// Short aliases, qualified with `.<subdomain>.<zone>`
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Fully qualified aliases, used as given
    #[serde(default)]
    pub full_aliases: Vec<String>,
    /// `proximity` or anything else for round-robin
    #[serde(default)]
    pub distribution: Option<String>,
}

/// A cloud the platform is deployed to.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformCloud {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub admin_status: Option<String>,
}

impl PlatformCloud {
    /// Primary clouds carry live traffic.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.priority.as_deref() == Some(CLOUD_PRIORITY_PRIMARY)
            && matches!(
                self.admin_status.as_deref(),
                Some(CLOUD_STATUS_ACTIVE | CLOUD_STATUS_INACTIVE)
            )
    }
}

/// A load balancer deployed in one cloud.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeployedLb {
    /// Instance name, ending in `-<cloudId>-<index>`
    pub name: String,
    /// The load balancer's VIP
    pub dns_record: String,
}

impl DeployedLb {
    /// Cloud id encoded in the LB name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name has fewer than two `-` separated elements
    /// or the cloud element is not a number.
    pub fn cloud_id(&self) -> Result<u64, ReconcileError> {
        let elements: Vec<&str> = self.name.split('-').collect();
        let [.., cloud_id, _] = elements.as_slice() else {
            return Err(ReconcileError::InvalidRequest(format!(
                "deployed LB name {} has no cloud id",
                self.name
            )));
        };
        cloud_id.parse().map_err(|_| {
            ReconcileError::InvalidRequest(format!(
                "deployed LB name {} has a non-numeric cloud id {cloud_id}",
                self.name
            ))
        })
    }
}

/// Listener and ECV configuration of the platform's load balancers.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LbConfig {
    /// Listeners such as `"http 80 http 8080"`
    #[serde(default)]
    pub listeners: Vec<String>,
    /// ECV port to probe, e.g. `8080 -> "GET /"`
    #[serde(default)]
    pub ecv_map: BTreeMap<u16, String>,
}

impl LbConfig {
    /// Parse the JSON forms used by deployment tooling: a listener array and
    /// an ECV object keyed by port.
    ///
    /// # Errors
    ///
    /// Returns an error if either document is malformed or an ECV key is not a port.
    pub fn from_json(listeners_json: &str, ecv_map_json: &str) -> Result<Self, ReconcileError> {
        let listeners: Vec<String> = if listeners_json.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(listeners_json)
                .map_err(|e| ReconcileError::InvalidRequest(format!("listeners: {e}")))?
        };
        let raw: BTreeMap<String, String> = if ecv_map_json.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(ecv_map_json)
                .map_err(|e| ReconcileError::InvalidRequest(format!("ecv map: {e}")))?
        };
        let ecv_map = raw
            .into_iter()
            .map(|(port, probe)| Ok((parse_port(&port)?, probe)))
            .collect::<Result<_, ReconcileError>>()?;
        Ok(Self { listeners, ecv_map })
    }

    /// Derive health checks, one per listener with an ECV entry.
    ///
    /// HTTP(S) listeners probe the path of the ECV entry on the LB port; TCP
    /// listeners probe the LB port with a plain connect. Listeners with fewer
    /// than two tokens, no ECV entry or another protocol derive nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if a listener port is not numeric.
    pub fn health_checks(&self) -> Result<Vec<HealthCheck>, ReconcileError> {
        let mut checks = Vec::new();
        for listener in &self.listeners {
            let tokens: Vec<&str> = listener.split_whitespace().collect();
            let [protocol, lb_port, ..] = tokens.as_slice() else {
                continue;
            };
            let protocol = protocol.to_lowercase();
            let lb_port = parse_port(lb_port)?;
            let ecv_port = parse_port(tokens[tokens.len() - 1])?;

            let Some(probe) = self.ecv_map.get(&ecv_port) else {
                debug!(listener = %listener, "No ECV entry for listener, skipping health check");
                continue;
            };
            if protocol.starts_with("http") {
                let path = probe.split_once(' ').map_or(probe.as_str(), |(_, p)| p);
                checks.push(HealthCheck::http(lb_port, path));
            } else if protocol == "tcp" {
                checks.push(HealthCheck::tcp(lb_port));
            }
        }
        Ok(checks)
    }
}

fn parse_port(value: &str) -> Result<u16, ReconcileError> {
    value
        .trim()
        .parse()
        .map_err(|_| ReconcileError::InvalidRequest(format!("invalid port {value}")))
}

/// A platform deployment request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GslbRequest {
    /// Platform (application) name
    pub platform: String,
    pub environment: String,
    pub assembly: String,
    pub org: String,
    #[serde(default)]
    pub custom_subdomain: Option<String>,
    pub fqdn: Fqdn,
    /// FQDN configuration of the previous deployment, if it changed
    #[serde(default)]
    pub old_fqdn: Option<Fqdn>,
    /// The cloud this request deploys to
    pub cloud: PlatformCloud,
    pub platform_clouds: Vec<PlatformCloud>,
    pub deployed_lbs: Vec<DeployedLb>,
    #[serde(default)]
    pub lb_config: LbConfig,
    /// DNS zone aliases and cloud entries are published under
    pub dns_zone: String,
    #[serde(default)]
    pub correlation_id: String,
}

impl GslbRequest {
    /// The custom subdomain if set, else `<environment>.<assembly>.<org>`.
    #[must_use]
    pub fn subdomain(&self) -> String {
        match self.custom_subdomain.as_deref().map(str::trim) {
            Some(custom) if !custom.is_empty() => custom.to_string(),
            _ => format!("{}.{}.{}", self.environment, self.assembly, self.org),
        }
    }

    fn qualify(&self, short: &str) -> String {
        format!("{short}.{}.{}", self.subdomain(), self.dns_zone)
    }

    fn alias_set(&self, fqdn: &Fqdn, include_default: bool) -> Vec<String> {
        let default = include_default.then(|| self.qualify(&self.platform));
        let short = fqdn.aliases.iter().map(|a| self.qualify(a));
        let names: Vec<String> = default
            .into_iter()
            .chain(short)
            .chain(fqdn.full_aliases.iter().cloned())
            .collect();
        normalize_names(names.iter().map(String::as_str))
    }

    /// Every alias the platform should be reachable under, lower-cased.
    ///
    /// The default alias `<platform>.<subdomain>.<zone>` comes first, then
    /// qualified short aliases, then full aliases.
    #[must_use]
    pub fn aliases(&self) -> Vec<String> {
        self.alias_set(&self.fqdn, true)
    }

    /// Aliases of the previous FQDN configuration that are no longer current.
    #[must_use]
    pub fn obsolete_aliases(&self) -> Vec<String> {
        let Some(old) = &self.old_fqdn else {
            return Vec::new();
        };
        let current: HashSet<String> = self.aliases().into_iter().collect();
        self.alias_set(old, false)
            .into_iter()
            .filter(|a| !current.contains(a))
            .collect()
    }

    /// The cloud entry of the request's cloud, `<platform>.<subdomain>.<cloud>.<zone>`.
    #[must_use]
    pub fn cloud_a_record(&self) -> CloudARecord {
        let name = format!(
            "{}.{}.{}.{}",
            self.platform,
            self.subdomain(),
            self.cloud.name,
            self.dns_zone
        );
        CloudARecord::new(&self.cloud.name, name.to_lowercase())
    }

    #[must_use]
    pub fn distribution(&self) -> Distribution {
        match self.fqdn.distribution.as_deref() {
            Some(DISTRIBUTION_PROXIMITY) => Distribution::Proximity,
            _ => Distribution::RoundRobin,
        }
    }

    /// One target per deployed LB, primary clouds first.
    ///
    /// # Errors
    ///
    /// Returns an error if no platform clouds or load balancers are listed, or
    /// an LB refers to a cloud that is not a platform cloud.
    pub fn targets(&self) -> Result<Vec<Target>, ReconcileError> {
        if self.platform_clouds.is_empty() {
            return Err(ReconcileError::InvalidRequest(
                "platform clouds not available in request".to_string(),
            ));
        }
        if self.deployed_lbs.is_empty() {
            return Err(ReconcileError::InvalidRequest(
                "no deployed load balancers in request".to_string(),
            ));
        }

        let mut primaries = Vec::new();
        let mut secondaries = Vec::new();
        for lb in &self.deployed_lbs {
            let cloud_id = lb.cloud_id()?;
            let cloud = self
                .platform_clouds
                .iter()
                .find(|c| c.id == cloud_id)
                .ok_or_else(|| {
                    ReconcileError::InvalidRequest(format!(
                        "deployed LB {} refers to unknown cloud id {cloud_id}",
                        lb.name
                    ))
                })?;
            let primary = cloud.is_primary();
            let target = Target {
                cloud: cloud.name.clone(),
                vip: lb.dns_record.clone(),
                enabled_for_traffic: primary,
                weight_percent: None,
            };
            if primary {
                primaries.push(target);
            } else {
                secondaries.push(target);
            }
        }
        primaries.extend(secondaries);
        Ok(primaries)
    }

    /// Build the desired state for a create or status check.
    ///
    /// # Errors
    ///
    /// Returns an error if targets or health checks cannot be derived.
    pub fn to_desired_state(&self) -> Result<GslbDesiredState, ReconcileError> {
        Ok(GslbDesiredState {
            app: self.platform.clone(),
            subdomain: self.subdomain(),
            targets: self.targets()?,
            distribution: self.distribution(),
            health_checks: self.lb_config.health_checks()?,
            dns_config: DnsConfig {
                zone: self.dns_zone.clone(),
            },
            aliases: self.aliases(),
            cloud_a_records: vec![self.cloud_a_record()],
            obsolete_aliases: self.obsolete_aliases(),
            obsolete_cloud_a_records: Vec::new(),
            correlation_id: self.correlation_id.clone(),
        })
    }

    /// Build the provisioned state for a delete.
    ///
    /// With `platform_enabled` the platform stays live in other clouds and only
    /// this cloud's entry is retired.
    #[must_use]
    pub fn to_provisioned_state(&self, platform_enabled: bool) -> GslbProvisionedState {
        GslbProvisionedState {
            app: self.platform.clone(),
            subdomain: self.subdomain(),
            dns_config: DnsConfig {
                zone: self.dns_zone.clone(),
            },
            aliases: self.aliases(),
            cloud_a_records: vec![self.cloud_a_record()],
            correlation_id: self.correlation_id.clone(),
            platform_enabled,
        }
    }
}
