// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Workflow orchestration.
//!
//! [`GslbProvider`] sequences the traffic and DNS reconcilers into the three
//! public workflows: create, delete and status check. Each invocation runs
//! its stages strictly in order:
//!
//! ```text
//! INIT -> TRAFFIC_RECONCILE -> (FAILED | DNS_RECONCILE) -> (FAILED | SUCCESS)
//! ```
//!
//! DNS work only starts once traffic distribution succeeded, and is skipped
//! when the request carries no aliases, cloud entries or obsolete entries. A
//! delete for a platform that stays enabled elsewhere skips traffic
//! distribution and only retires the cloud's A records.
//!
//! The workflows never return errors. Every outcome, including gateway
//! failures, is reported through the returned [`ReconcileResult`].

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, Instrument};

use crate::errors::VerificationError;
use crate::gateway::{DnsGateway, TrafficGateway};
use crate::metrics;
use crate::model::{GslbDesiredState, GslbProvisionedState, ReconcileResult};
use crate::reconcilers::{DnsReconciler, RetryPolicy, TopologyCache, TrafficReconciler};
use crate::verifier::Verifier;

const WORKFLOW_CREATE: &str = "create";
const WORKFLOW_DELETE: &str = "delete";
const WORKFLOW_STATUS: &str = "status";

/// Entry point for GSLB create, delete, status and verification.
pub struct GslbProvider {
    traffic: TrafficReconciler,
    dns: DnsReconciler,
    verifier: Verifier,
}

impl GslbProvider {
    /// Create a provider with its own topology cache and the default retry policy.
    pub fn new(
        traffic_gateway: Arc<dyn TrafficGateway>,
        dns_gateway: Arc<dyn DnsGateway>,
        base_domain: impl Into<String>,
    ) -> Self {
        Self::with_topology(
            traffic_gateway,
            dns_gateway,
            base_domain,
            Arc::new(TopologyCache::new()),
            RetryPolicy::default(),
        )
    }

    /// Create a provider sharing `topology` with other providers.
    pub fn with_topology(
        traffic_gateway: Arc<dyn TrafficGateway>,
        dns_gateway: Arc<dyn DnsGateway>,
        base_domain: impl Into<String>,
        topology: Arc<TopologyCache>,
        retry: RetryPolicy,
    ) -> Self {
        let base_domain = base_domain.into();
        Self {
            traffic: TrafficReconciler::new(
                traffic_gateway.clone(),
                topology.clone(),
                base_domain.clone(),
            )
            .with_retry_policy(retry),
            dns: DnsReconciler::new(dns_gateway.clone()),
            verifier: Verifier::new(traffic_gateway, dns_gateway, topology, base_domain),
        }
    }

    /// Create or update the application's GSLB configuration.
    pub async fn create(&self, desired: &GslbDesiredState) -> ReconcileResult {
        let span = info_span!(
            "gslb",
            correlation_id = %desired.correlation_id,
            app = %desired.app,
            workflow = WORKFLOW_CREATE
        );
        async {
            let start = Instant::now();
            info!(
                subdomain = %desired.subdomain,
                targets = desired.targets.len(),
                "Starting GSLB create"
            );

            let mut result = ReconcileResult::new();
            result.absorb(self.traffic.setup(desired).await);
            if let Some(canonical) = converged_canonical(&result) {
                result
                    .dns_entries
                    .insert(canonical.clone(), desired.enabled_vips().join(","));
                if desired.dns_entries_needed() {
                    result.absorb(self.dns.setup(desired, &canonical).await);
                } else {
                    debug!("No DNS entries requested, skipping DNS reconcile");
                }
            }
            finish(WORKFLOW_CREATE, result, start)
        }
        .instrument(span)
        .await
    }

    /// Remove the application's GSLB configuration.
    pub async fn delete(&self, provisioned: &GslbProvisionedState) -> ReconcileResult {
        let span = info_span!(
            "gslb",
            correlation_id = %provisioned.correlation_id,
            app = %provisioned.app,
            workflow = WORKFLOW_DELETE
        );
        async {
            let start = Instant::now();
            info!(
                subdomain = %provisioned.subdomain,
                platform_enabled = provisioned.platform_enabled,
                "Starting GSLB delete"
            );

            let mut result = ReconcileResult::new();
            if provisioned.platform_enabled {
                info!("Platform remains enabled, retiring cloud DNS entries only");
                result.absorb(self.dns.retire(provisioned).await);
            } else {
                result.absorb(self.traffic.teardown(provisioned).await);
                let has_dns = !provisioned.aliases.is_empty()
                    || !provisioned.cloud_a_records.is_empty();
                if !result.is_failed() && has_dns {
                    result.absorb(self.dns.teardown(provisioned).await);
                }
            }
            finish(WORKFLOW_DELETE, result, start)
        }
        .instrument(span)
        .await
    }

    /// Compare remote state with `desired` without changing anything.
    pub async fn check_status(&self, desired: &GslbDesiredState) -> ReconcileResult {
        let span = info_span!(
            "gslb",
            correlation_id = %desired.correlation_id,
            app = %desired.app,
            workflow = WORKFLOW_STATUS
        );
        async {
            let start = Instant::now();
            let mut result = ReconcileResult::new();
            result.absorb(self.traffic.check_status(desired).await);
            if let Some(canonical) = converged_canonical(&result) {
                result
                    .dns_entries
                    .insert(canonical.clone(), desired.enabled_vips().join(","));
                if desired.dns_entries_needed() {
                    result.absorb(self.dns.check_status(desired, &canonical).await);
                }
            }
            finish(WORKFLOW_STATUS, result, start)
        }
        .instrument(span)
        .await
    }

    /// Independently verify that a create took effect.
    ///
    /// # Errors
    ///
    /// Returns the first condition that does not hold.
    pub async fn verify(
        &self,
        desired: &GslbDesiredState,
        result: &ReconcileResult,
    ) -> Result<(), VerificationError> {
        let span = info_span!(
            "gslb",
            correlation_id = %desired.correlation_id,
            app = %desired.app,
            workflow = "verify"
        );
        let outcome = self
            .verifier
            .verify_create(desired, result)
            .instrument(span)
            .await;
        record_verification(&outcome);
        outcome
    }

    /// Independently verify that a delete took effect.
    ///
    /// # Errors
    ///
    /// Returns the first record left in the wrong state.
    pub async fn verify_delete(
        &self,
        provisioned: &GslbProvisionedState,
    ) -> Result<(), VerificationError> {
        let span = info_span!(
            "gslb",
            correlation_id = %provisioned.correlation_id,
            app = %provisioned.app,
            workflow = "verify_delete"
        );
        let outcome = self
            .verifier
            .verify_delete(provisioned)
            .instrument(span)
            .await;
        record_verification(&outcome);
        outcome
    }
}

/// Canonical name of a traffic stage that succeeded.
fn converged_canonical(result: &ReconcileResult) -> Option<String> {
    if result.is_failed() {
        return None;
    }
    result.canonical_name.clone()
}

fn record_verification(outcome: &Result<(), VerificationError>) {
    match outcome {
        Ok(()) => metrics::record_verification(true),
        Err(e) => {
            error!(error = %e, "Verification failed");
            metrics::record_verification(false);
        }
    }
}

fn finish(workflow: &str, mut result: ReconcileResult, start: Instant) -> ReconcileResult {
    result.finalize();
    let status = result.status.as_str();
    metrics::record_reconciliation(workflow, status, start.elapsed());
    match &result.failure_message {
        Some(message) => error!(status = status, message = %message, "GSLB {workflow} finished"),
        None => info!(
            status = status,
            base_id = result.base_id.as_deref().unwrap_or_default(),
            dns_entries = result.dns_entries.len(),
            "GSLB {workflow} finished"
        ),
    }
    result
}
