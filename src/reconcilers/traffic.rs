// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Traffic-distribution reconciliation.
//!
//! Converges the MTD base (keyed by the canonical per-subdomain hostname) and
//! the application's host record (targets, health checks, locality scope)
//! toward the desired state.
//!
//! ## Concurrency
//!
//! Several callers may target the same base at once. Base creation is a
//! create-or-get: a uniqueness violation means another caller won the race,
//! and the existing base is read instead. Host creation falls back to an
//! update when the host already exists. No local locking is involved.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::retry::{retry_transient, RetryPolicy};
use super::topology::TopologyCache;
use crate::constants::{
    HEALTH_CHECK_EXPECTED_HTTP_STATUS, MTD_BASE_TYPE_GSLB, MTD_DC_FAILOVER,
    MTD_LOAD_BALANCING_DISTRIBUTION,
};
use crate::errors::{GatewayError, ReconcileError};
use crate::gateway::{HostResult, HostSpec, MtdBase, MtdHealthCheck, MtdTarget, TrafficGateway};
use crate::metrics;
use crate::model::{
    GslbDesiredState, GslbProvisionedState, HealthCheck, Protocol, ReconcileResult,
};

const GATEWAY_LABEL: &str = "traffic";

fn traffic_failure(context: impl Into<String>, err: GatewayError) -> ReconcileError {
    metrics::record_gateway_error(GATEWAY_LABEL, err.status_reason());
    ReconcileError::gateway(context, err)
}

/// Convert a health check into its MTD form.
///
/// HTTP checks carry the probe path and expect status 200; TCP checks carry neither.
#[must_use]
pub fn mtd_health_check(check: &HealthCheck) -> MtdHealthCheck {
    let (test_object_path, expected_status) = match check.protocol {
        Protocol::Http => (
            check.path.clone(),
            Some(HEALTH_CHECK_EXPECTED_HTTP_STATUS),
        ),
        Protocol::Tcp => (None, None),
    };
    MtdHealthCheck {
        name: check.name(),
        protocol: check.protocol.as_str().to_string(),
        port: check.port,
        test_object_path,
        expected_status,
        fails_for_down: check.failure_count_to_mark_down,
        is_enabled: true,
        interval: format!("{}s", check.interval_secs),
        retry_delay: format!("{}s", check.retry_delay_secs),
        timeout: format!("{}s", check.timeout_secs),
    }
}

/// HTTP health checks need a probe path.
///
/// # Errors
///
/// Returns `InvalidRequest` for the first HTTP check without a path.
pub fn validate_health_checks(desired: &GslbDesiredState) -> Result<(), ReconcileError> {
    match desired
        .health_checks
        .iter()
        .find(|c| c.protocol == Protocol::Http && !has_path(c))
    {
        Some(check) => Err(ReconcileError::InvalidRequest(format!(
            "HTTP health check on port {} has no probe path",
            check.port
        ))),
        None => Ok(()),
    }
}

fn has_path(check: &HealthCheck) -> bool {
    matches!(check.path.as_deref(), Some(path) if !path.trim().is_empty())
}

/// Build the host payload for `desired`.
///
/// Targets keep the caller's order. Each target's cloud and data-center ids
/// come from the topology cache.
///
/// # Errors
///
/// Returns an error if a target's cloud cannot be resolved or an HTTP health
/// check has no probe path.
pub async fn build_host_spec(
    gateway: &dyn TrafficGateway,
    topology: &TopologyCache,
    desired: &GslbDesiredState,
) -> Result<HostSpec, ReconcileError> {
    validate_health_checks(desired)?;
    let mut targets = Vec::with_capacity(desired.targets.len());
    for target in desired.usable_targets() {
        let cloud = topology.lookup(gateway, &target.cloud).await?;
        targets.push(MtdTarget {
            mtd_target_host: target.vip.clone(),
            data_center_id: cloud.data_center_id,
            cloud_id: cloud.id,
            enabled: target.enabled_for_traffic,
            weight_percent: target.effective_weight(),
        });
    }

    Ok(HostSpec {
        mtd_host_name: desired.host_name(),
        mtd_targets: targets,
        mtd_health_checks: desired.health_checks.iter().map(mtd_health_check).collect(),
        is_dc_failover: MTD_DC_FAILOVER,
        load_balancing_distribution: MTD_LOAD_BALANCING_DISTRIBUTION,
        locality_scope: desired.distribution.locality_scope(),
    })
}

type TargetKey<'a> = (&'a str, bool, u64, u64);

fn target_keys(targets: &[MtdTarget]) -> HashSet<TargetKey<'_>> {
    targets
        .iter()
        .map(|t| {
            (
                t.mtd_target_host.as_str(),
                t.enabled,
                t.cloud_id,
                t.data_center_id,
            )
        })
        .collect()
}

/// Render targets for mismatch messages, sorted by VIP.
pub(crate) fn describe_targets(targets: &[MtdTarget]) -> String {
    let mut rendered: Vec<String> = targets
        .iter()
        .map(|t| {
            format!(
                "{}(enabled={}, cloud={}, dc={})",
                t.mtd_target_host, t.enabled, t.cloud_id, t.data_center_id
            )
        })
        .collect();
    rendered.sort();
    format!("[{}]", rendered.join(", "))
}

fn record_host(result: &mut ReconcileResult, host: &HostResult) {
    if let Some(version) = &host.version {
        result.host_version = Some(version.version_id.to_string());
    }
    if let Some(deployment) = &host.deployment {
        result.deployment_id = Some(deployment.deployment_id.to_string());
    }
}

/// Converges the traffic-distribution gateway's base and host records.
pub struct TrafficReconciler {
    gateway: Arc<dyn TrafficGateway>,
    topology: Arc<TopologyCache>,
    base_domain: String,
    retry: RetryPolicy,
}

impl TrafficReconciler {
    /// Create a reconciler with the default base create-or-get retry policy.
    pub fn new(
        gateway: Arc<dyn TrafficGateway>,
        topology: Arc<TopologyCache>,
        base_domain: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            topology,
            base_domain: base_domain.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the base create-or-get retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn base_domain(&self) -> &str {
        &self.base_domain
    }

    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Build the host payload for `desired` using this reconciler's topology cache.
    ///
    /// # Errors
    ///
    /// Returns an error if a target's cloud cannot be resolved.
    pub async fn build_host_spec(
        &self,
        desired: &GslbDesiredState,
    ) -> Result<HostSpec, ReconcileError> {
        build_host_spec(self.gateway.as_ref(), &self.topology, desired).await
    }

    /// Ensure the base and host exist and match `desired`.
    ///
    /// On success the partial result carries the base id, host version,
    /// deployment id and canonical name. On failure it is FAILED and keeps
    /// whatever was obtained before the failing call.
    pub async fn setup(&self, desired: &GslbDesiredState) -> ReconcileResult {
        let mut result = ReconcileResult::new();
        if let Err(e) = self.apply(desired, &mut result).await {
            error!(error = %e, "Traffic distribution setup failed");
            result.fail(e);
        }
        result
    }

    async fn apply(
        &self,
        desired: &GslbDesiredState,
        result: &mut ReconcileResult,
    ) -> Result<(), ReconcileError> {
        if desired.usable_targets().next().is_none() {
            return Err(ReconcileError::NoTargets {
                app: desired.app.clone(),
            });
        }
        validate_health_checks(desired)?;

        let hostname = desired.base_hostname(&self.base_domain);
        let base = retry_transient(&self.retry, "create MtdBase", || {
            self.create_or_get_base(&hostname)
        })
        .await
        .map_err(|e| traffic_failure(format!("MtdBase could not be created for {hostname}"), e))?;
        result.base_id = Some(base.mtd_base_id.to_string());

        let spec = self.build_host_spec(desired).await?;
        info!(
            host = %spec.mtd_host_name,
            base_id = base.mtd_base_id,
            targets = spec.mtd_targets.len(),
            health_checks = spec.mtd_health_checks.len(),
            "Applying MtdHost"
        );
        let host = self.create_or_update_host(base.mtd_base_id, &spec).await?;
        record_host(result, &host);
        result.canonical_name = Some(desired.canonical_name(&self.base_domain));
        Ok(())
    }

    /// One create-or-get attempt for the base.
    async fn create_or_get_base(&self, hostname: &str) -> Result<MtdBase, GatewayError> {
        match self.gateway.create_base(hostname, MTD_BASE_TYPE_GSLB).await {
            Ok(base) => {
                info!(hostname = hostname, base_id = base.mtd_base_id, "MtdBase created");
                Ok(base)
            }
            Err(e) if e.is_already_exists() => {
                info!(
                    hostname = hostname,
                    "MtdBase create hit a uniqueness violation, reading the existing base"
                );
                match self.gateway.get_base(hostname).await {
                    // Created by someone else but not readable yet
                    Err(e) if e.is_not_found() => Err(GatewayError::transport(
                        "getMtdBase",
                        format!("MtdBase {hostname} reported as existing but could not be read"),
                    )),
                    other => other,
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn create_or_update_host(
        &self,
        base_id: u64,
        spec: &HostSpec,
    ) -> Result<HostResult, ReconcileError> {
        match self.gateway.create_host(base_id, spec).await {
            Ok(host) => {
                info!(host = %spec.mtd_host_name, "MtdHost created");
                Ok(host)
            }
            Err(e) if e.is_already_exists() => {
                info!(host = %spec.mtd_host_name, "MtdHost already exists, updating");
                self.gateway
                    .update_host(base_id, &spec.mtd_host_name, spec)
                    .await
                    .map_err(|e| traffic_failure("updateMtdHost failed", e))
            }
            Err(e) => Err(traffic_failure("createMtdHost failed", e)),
        }
    }

    /// Compare the host's targets with the desired targets, without mutating anything.
    pub async fn check_status(&self, desired: &GslbDesiredState) -> ReconcileResult {
        let mut result = ReconcileResult::new();
        if let Err(e) = self.compare(desired, &mut result).await {
            warn!(error = %e, "Traffic distribution status check failed");
            result.fail(e);
        }
        result
    }

    async fn compare(
        &self,
        desired: &GslbDesiredState,
        result: &mut ReconcileResult,
    ) -> Result<(), ReconcileError> {
        let hostname = desired.base_hostname(&self.base_domain);
        let base = self
            .gateway
            .get_base(&hostname)
            .await
            .map_err(|e| traffic_failure(format!("MtdBase lookup failed for {hostname}"), e))?;
        result.base_id = Some(base.mtd_base_id.to_string());
        result.canonical_name = Some(desired.canonical_name(&self.base_domain));

        let host = self
            .gateway
            .get_host(base.mtd_base_id, &desired.host_name())
            .await
            .map_err(|e| traffic_failure("MtdHost lookup failed", e))?;
        record_host(result, &host);

        let expected = self.build_host_spec(desired).await?;
        let actual = &host.mtd_host.mtd_targets;
        if expected.mtd_targets.len() != actual.len()
            || target_keys(&expected.mtd_targets) != target_keys(actual)
        {
            return Err(ReconcileError::StatusMismatch {
                subject: "MtdHost targets".to_string(),
                expected: describe_targets(&expected.mtd_targets),
                actual: describe_targets(actual),
            });
        }
        debug!(targets = actual.len(), "MtdHost targets match desired state");
        Ok(())
    }

    /// Delete the application's host.
    ///
    /// A missing base or host is a successful no-op. Any other delete failure
    /// is confirmed with a read; a host that reads as absent is also success.
    pub async fn teardown(&self, provisioned: &GslbProvisionedState) -> ReconcileResult {
        let mut result = ReconcileResult::new();
        if let Err(e) = self.remove(provisioned, &mut result).await {
            error!(error = %e, "Traffic distribution teardown failed");
            result.fail(e);
        }
        result
    }

    async fn remove(
        &self,
        provisioned: &GslbProvisionedState,
        result: &mut ReconcileResult,
    ) -> Result<(), ReconcileError> {
        let hostname = provisioned.base_hostname(&self.base_domain);
        let host_name = provisioned.host_name();

        let base = match self.gateway.get_base(&hostname).await {
            Ok(base) => base,
            Err(e) if e.is_not_found() => {
                info!(hostname = %hostname, "MtdBase not found, nothing to delete");
                return Ok(());
            }
            Err(e) => {
                return Err(traffic_failure(
                    format!("MtdBase lookup failed for {hostname}"),
                    e,
                ))
            }
        };
        result.base_id = Some(base.mtd_base_id.to_string());

        match self.gateway.delete_host(base.mtd_base_id, &host_name).await {
            Ok(()) => {
                info!(host = %host_name, base_id = base.mtd_base_id, "MtdHost deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                info!(host = %host_name, "MtdHost not found, treating delete as done");
                Ok(())
            }
            Err(e) => {
                warn!(host = %host_name, error = %e, "MtdHost delete failed, confirming state");
                match self.gateway.get_host(base.mtd_base_id, &host_name).await {
                    Err(confirm) if confirm.is_not_found() => {
                        info!(host = %host_name, "MtdHost confirmed absent");
                        Ok(())
                    }
                    _ => Err(traffic_failure("Failed while deleting MtdHost", e)),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "traffic_tests.rs"]
mod traffic_tests;
