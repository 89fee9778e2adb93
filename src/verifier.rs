// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Read-only verification of converged GSLB state.
//!
//! The verifier re-derives the expected targets, health checks and DNS
//! entries from the desired state on its own and compares them against what
//! the gateways report. It never writes and never retries. The first violated
//! condition is returned as a [`VerificationError`].

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::errors::{GatewayError, VerificationError};
use crate::gateway::{DnsGateway, HostResult, MtdHealthCheck, TrafficGateway};
use crate::model::{
    normalize_names, GslbDesiredState, GslbProvisionedState, Protocol, ReconcileResult,
};
use crate::reconcilers::topology::TopologyCache;
use crate::reconcilers::traffic::{build_host_spec, describe_targets};

type Verified = Result<(), VerificationError>;

fn lookup_failed(what: impl std::fmt::Display, err: &GatewayError) -> VerificationError {
    VerificationError::condition(format!("{what} lookup failed : {err}"))
}

fn require_present(field: &str, value: Option<&str>) -> Verified {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(VerificationError::condition(format!("{field} is not set"))),
    }
}

/// Independent checker for the create and delete workflows.
pub struct Verifier {
    traffic: Arc<dyn TrafficGateway>,
    dns: Arc<dyn DnsGateway>,
    topology: Arc<TopologyCache>,
    base_domain: String,
}

impl Verifier {
    pub fn new(
        traffic: Arc<dyn TrafficGateway>,
        dns: Arc<dyn DnsGateway>,
        topology: Arc<TopologyCache>,
        base_domain: impl Into<String>,
    ) -> Self {
        Self {
            traffic,
            dns,
            topology,
            base_domain: base_domain.into(),
        }
    }

    /// Verify that a successful create actually took effect.
    ///
    /// # Errors
    ///
    /// Returns the first violated condition: a FAILED or incomplete result,
    /// host targets or health checks that differ from the desired state, or
    /// DNS records and result entries that do not match.
    pub async fn verify_create(
        &self,
        desired: &GslbDesiredState,
        result: &ReconcileResult,
    ) -> Verified {
        if result.is_failed() {
            return Err(VerificationError::mismatch(
                "reconcile status",
                "SUCCESS",
                result.failure_message.as_deref().unwrap_or("FAILED"),
            ));
        }
        require_present("baseId", result.base_id.as_deref())?;
        require_present("deploymentId", result.deployment_id.as_deref())?;
        require_present("canonicalName", result.canonical_name.as_deref())?;

        let canonical = desired.canonical_name(&self.base_domain);
        if result.canonical_name.as_deref() != Some(canonical.as_str()) {
            return Err(VerificationError::mismatch(
                "canonicalName",
                &canonical,
                result.canonical_name.as_deref().unwrap_or_default(),
            ));
        }

        let host = self
            .fetch_host(&desired.base_hostname(&self.base_domain), &desired.host_name())
            .await?;
        self.verify_targets(desired, &host).await?;
        verify_health_checks(desired, &host.mtd_host.mtd_health_checks)?;
        self.verify_dns(desired, &canonical, result).await?;

        info!(canonical = %canonical, "Verification passed");
        Ok(())
    }

    async fn fetch_host(
        &self,
        hostname: &str,
        host_name: &str,
    ) -> Result<HostResult, VerificationError> {
        let base = self
            .traffic
            .get_base(hostname)
            .await
            .map_err(|e| lookup_failed(format!("MtdBase {hostname}"), &e))?;
        self.traffic
            .get_host(base.mtd_base_id, host_name)
            .await
            .map_err(|e| lookup_failed(format!("MtdHost {host_name}"), &e))
    }

    async fn verify_targets(&self, desired: &GslbDesiredState, host: &HostResult) -> Verified {
        let expected = build_host_spec(self.traffic.as_ref(), &self.topology, desired)
            .await
            .map_err(|e| VerificationError::condition(format!("expected targets : {e}")))?;
        let actual = &host.mtd_host.mtd_targets;

        let expected_vips: HashSet<&str> = expected
            .mtd_targets
            .iter()
            .map(|t| t.mtd_target_host.as_str())
            .collect();
        let actual_vips: HashSet<&str> = actual.iter().map(|t| t.mtd_target_host.as_str()).collect();
        if expected.mtd_targets.len() != actual.len() || expected_vips != actual_vips {
            return Err(VerificationError::mismatch(
                "MtdHost targets",
                describe_targets(&expected.mtd_targets),
                describe_targets(actual),
            ));
        }

        for want in &expected.mtd_targets {
            let Some(got) = actual
                .iter()
                .find(|t| t.mtd_target_host == want.mtd_target_host)
            else {
                continue;
            };
            if got.enabled != want.enabled {
                return Err(VerificationError::mismatch(
                    format!("enabled flag of target {}", want.mtd_target_host),
                    want.enabled,
                    got.enabled,
                ));
            }
            if got.weight_percent != want.weight_percent {
                return Err(VerificationError::mismatch(
                    format!("weight of target {}", want.mtd_target_host),
                    want.weight_percent,
                    got.weight_percent,
                ));
            }
            if (got.cloud_id, got.data_center_id) != (want.cloud_id, want.data_center_id) {
                return Err(VerificationError::mismatch(
                    format!("cloud of target {}", want.mtd_target_host),
                    format!("cloud={}, dc={}", want.cloud_id, want.data_center_id),
                    format!("cloud={}, dc={}", got.cloud_id, got.data_center_id),
                ));
            }
        }
        debug!(targets = actual.len(), "Targets verified");
        Ok(())
    }

    async fn verify_dns(
        &self,
        desired: &GslbDesiredState,
        canonical: &str,
        result: &ReconcileResult,
    ) -> Verified {
        let aliases = desired.normalized_aliases();
        for alias in &aliases {
            let records = self
                .dns
                .get_cname(alias)
                .await
                .map_err(|e| lookup_failed(format!("CNAME {alias}"), &e))?;
            match records.as_slice() {
                [only] if only.canonical.eq_ignore_ascii_case(canonical) => {}
                _ => {
                    let actual: Vec<&str> = records.iter().map(|r| r.canonical.as_str()).collect();
                    return Err(VerificationError::mismatch(
                        format!("CNAME {alias}"),
                        canonical,
                        format!("[{}]", actual.join(", ")),
                    ));
                }
            }
            expect_entry(result, "alias", alias, canonical)?;
        }
        if !result.dns_entries.contains_key(canonical) {
            return Err(VerificationError::condition(format!(
                "dnsEntries has no entry for canonical name {canonical}"
            )));
        }

        let mut current: HashSet<String> = aliases.into_iter().collect();
        for record in &desired.cloud_a_records {
            let name = record.a_record_name.trim().to_lowercase();
            let Some(vip) = desired.cloud_vip(&record.cloud) else {
                continue;
            };
            let found = self
                .dns
                .get_a(&name)
                .await
                .map_err(|e| lookup_failed(format!("A record {name}"), &e))?;
            let addresses: Vec<&str> = found.iter().map(|a| a.ipv4addr.as_str()).collect();
            if addresses != [vip] {
                return Err(VerificationError::mismatch(
                    format!("A record {name}"),
                    vip,
                    format!("[{}]", addresses.join(", ")),
                ));
            }
            expect_entry(result, "cloud entry", &name, vip)?;
            current.insert(name);
        }

        for alias in normalize_names(desired.obsolete_aliases.iter().map(String::as_str)) {
            if !current.contains(&alias) {
                self.expect_no_cname(&alias).await?;
            }
        }
        for record in &desired.obsolete_cloud_a_records {
            let name = record.a_record_name.trim().to_lowercase();
            if !current.contains(&name) {
                self.expect_no_a(&name).await?;
            }
        }
        Ok(())
    }

    async fn expect_no_cname(&self, alias: &str) -> Verified {
        let records = self
            .dns
            .get_cname(alias)
            .await
            .map_err(|e| lookup_failed(format!("CNAME {alias}"), &e))?;
        if records.is_empty() {
            Ok(())
        } else {
            Err(VerificationError::condition(format!("CNAME {alias} still exists")))
        }
    }

    async fn expect_no_a(&self, name: &str) -> Verified {
        let records = self
            .dns
            .get_a(name)
            .await
            .map_err(|e| lookup_failed(format!("A record {name}"), &e))?;
        if records.is_empty() {
            Ok(())
        } else {
            Err(VerificationError::condition(format!("A record {name} still exists")))
        }
    }

    /// Verify that a delete removed what it should have.
    ///
    /// A full delete leaves no host, alias or cloud A record behind. A delete
    /// with the platform still enabled must leave the host and aliases intact
    /// and only the cloud A records gone.
    ///
    /// # Errors
    ///
    /// Returns the first record found in the wrong state.
    pub async fn verify_delete(&self, provisioned: &GslbProvisionedState) -> Verified {
        let hostname = provisioned.base_hostname(&self.base_domain);
        let host_name = provisioned.host_name();

        if provisioned.platform_enabled {
            self.fetch_host(&hostname, &host_name).await?;
            let canonical = provisioned.canonical_name(&self.base_domain);
            for alias in provisioned.normalized_aliases() {
                let records = self
                    .dns
                    .get_cname(&alias)
                    .await
                    .map_err(|e| lookup_failed(format!("CNAME {alias}"), &e))?;
                if !records
                    .iter()
                    .any(|r| r.canonical.eq_ignore_ascii_case(&canonical))
                {
                    return Err(VerificationError::condition(format!(
                        "CNAME {alias} no longer resolves to {canonical}"
                    )));
                }
            }
        } else {
            self.expect_no_host(&hostname, &host_name).await?;
            for alias in provisioned.normalized_aliases() {
                self.expect_no_cname(&alias).await?;
            }
        }

        let records = &provisioned.cloud_a_records;
        for name in normalize_names(records.iter().map(|r| r.a_record_name.as_str())) {
            self.expect_no_a(&name).await?;
        }
        info!(app = %host_name, "Delete verification passed");
        Ok(())
    }

    async fn expect_no_host(&self, hostname: &str, host_name: &str) -> Verified {
        let base = match self.traffic.get_base(hostname).await {
            Ok(base) => base,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(lookup_failed(format!("MtdBase {hostname}"), &e)),
        };
        match self.traffic.get_host(base.mtd_base_id, host_name).await {
            Err(e) if e.is_not_found() => Ok(()),
            Ok(_) => Err(VerificationError::condition(format!(
                "MtdHost {host_name} still exists"
            ))),
            Err(e) => Err(lookup_failed(format!("MtdHost {host_name}"), &e)),
        }
    }
}

/// The result's `dnsEntries` must map `key` to `expected`.
fn expect_entry(result: &ReconcileResult, what: &str, key: &str, expected: &str) -> Verified {
    match result.dns_entries.get(key) {
        Some(value) if value.eq_ignore_ascii_case(expected) => Ok(()),
        Some(value) => Err(VerificationError::mismatch(
            format!("dnsEntries value for {what} {key}"),
            expected,
            value,
        )),
        None => Err(VerificationError::condition(format!(
            "dnsEntries has no entry for {what} {key}"
        ))),
    }
}

/// Expected and actual health checks must pair up one-to-one by port, with
/// the same protocol and, for HTTP, the same probe path.
fn verify_health_checks(desired: &GslbDesiredState, actual: &[MtdHealthCheck]) -> Verified {
    if let Some(extra) = actual
        .iter()
        .find(|c| !desired.health_checks.iter().any(|want| want.port == c.port))
    {
        return Err(VerificationError::condition(format!(
            "health check {} on port {} is not expected",
            extra.name, extra.port
        )));
    }
    for want in &desired.health_checks {
        let Some(got) = actual.iter().find(|c| c.port == want.port) else {
            return Err(VerificationError::condition(format!(
                "health check on port {} is missing",
                want.port
            )));
        };
        if !got.protocol.eq_ignore_ascii_case(want.protocol.as_str()) {
            return Err(VerificationError::mismatch(
                format!("protocol of health check on port {}", want.port),
                want.protocol,
                &got.protocol,
            ));
        }
        if want.protocol == Protocol::Http && got.test_object_path != want.path {
            return Err(VerificationError::mismatch(
                format!("path of health check on port {}", want.port),
                want.path.as_deref().unwrap_or_default(),
                got.test_object_path.as_deref().unwrap_or_default(),
            ));
        }
    }
    if actual.len() != desired.health_checks.len() {
        return Err(VerificationError::mismatch(
            "MtdHost health check count",
            desired.health_checks.len(),
            actual.len(),
        ));
    }
    Ok(())
}
