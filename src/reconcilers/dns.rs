// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS reconciliation.
//!
//! Converges the application's CNAME aliases (all pointing at the canonical
//! traffic-distribution name) and its per-cloud A records, then retires
//! entries that a previous reconciliation published but the current desired
//! state no longer lists.
//!
//! All names are lower-cased before any gateway call or comparison.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::errors::{GatewayError, ReconcileError};
use crate::gateway::DnsGateway;
use crate::metrics;
use crate::model::{
    normalize_names, CloudARecord, GslbDesiredState, GslbProvisionedState, ReconcileResult,
};

const GATEWAY_LABEL: &str = "dns";

fn dns_failure(context: impl Into<String>, err: GatewayError) -> ReconcileError {
    metrics::record_gateway_error(GATEWAY_LABEL, err.status_reason());
    ReconcileError::gateway(context, err)
}

fn record_names(records: &[CloudARecord]) -> Vec<String> {
    normalize_names(records.iter().map(|r| r.a_record_name.as_str()))
}

/// Converges CNAME aliases and cloud A records in the DNS gateway.
pub struct DnsReconciler {
    gateway: Arc<dyn DnsGateway>,
}

impl DnsReconciler {
    pub fn new(gateway: Arc<dyn DnsGateway>) -> Self {
        Self { gateway }
    }

    /// Create or repair current entries, then delete obsolete ones.
    ///
    /// Every attempted alias and A record lands in the result's DNS entries
    /// whether or not a write was needed. The first fatal error stops the stage;
    /// entries gathered before it are kept.
    pub async fn setup(&self, desired: &GslbDesiredState, canonical: &str) -> ReconcileResult {
        let mut result = ReconcileResult::new();
        if let Err(e) = self.apply(desired, canonical, &mut result.dns_entries).await {
            error!(error = %e, "DNS setup failed");
            result.fail(e);
        }
        result
    }

    async fn apply(
        &self,
        desired: &GslbDesiredState,
        canonical: &str,
        entries: &mut BTreeMap<String, String>,
    ) -> Result<(), ReconcileError> {
        let canonical = canonical.to_lowercase();
        let aliases = desired.normalized_aliases();
        for alias in &aliases {
            entries.insert(alias.clone(), canonical.clone());
            self.ensure_cname(alias, &canonical).await?;
        }

        let mut current: HashSet<String> = aliases.into_iter().collect();
        for record in &desired.cloud_a_records {
            let name = record.a_record_name.trim().to_lowercase();
            let Some(vip) = desired.cloud_vip(&record.cloud) else {
                debug!(name = %name, cloud = %record.cloud, "No VIP for cloud, skipping A record");
                continue;
            };
            entries.insert(name.clone(), vip.to_string());
            self.ensure_a(&name, vip).await?;
            current.insert(name);
        }

        for alias in normalize_names(desired.obsolete_aliases.iter().map(String::as_str)) {
            if current.contains(&alias) {
                debug!(alias = %alias, "Obsolete alias is still desired, keeping it");
                continue;
            }
            self.remove_cname(&alias).await?;
        }
        for name in record_names(&desired.obsolete_cloud_a_records) {
            if current.contains(&name) {
                debug!(name = %name, "Obsolete A record is still desired, keeping it");
                continue;
            }
            self.remove_a(&name).await?;
        }
        Ok(())
    }

    async fn ensure_cname(&self, alias: &str, canonical: &str) -> Result<(), ReconcileError> {
        let existing = self
            .gateway
            .get_cname(alias)
            .await
            .map_err(|e| dns_failure(format!("CNAME lookup failed for {alias}"), e))?;

        if let Some(other) = existing
            .iter()
            .find(|r| !r.canonical.eq_ignore_ascii_case(canonical))
        {
            return Err(ReconcileError::AliasConflict {
                alias: alias.to_string(),
                existing: other.canonical.clone(),
            });
        }
        if !existing.is_empty() {
            debug!(alias = alias, "CNAME already points at the canonical name");
            return Ok(());
        }

        match self.gateway.create_cname(alias, canonical).await {
            Ok(_) => {
                info!(alias = alias, canonical = canonical, "CNAME created");
                Ok(())
            }
            Err(e) if e.is_already_exists() => {
                info!(alias = alias, "CNAME created concurrently by another caller");
                Ok(())
            }
            Err(e) => Err(dns_failure(format!("Failed to create CNAME {alias}"), e)),
        }
    }

    async fn ensure_a(&self, name: &str, vip: &str) -> Result<(), ReconcileError> {
        let existing = self
            .gateway
            .get_a(name)
            .await
            .map_err(|e| dns_failure(format!("A record lookup failed for {name}"), e))?;

        if let [only] = existing.as_slice() {
            if only.ipv4addr == vip {
                debug!(name = name, ipv4addr = vip, "A record already up to date");
                return Ok(());
            }
        }
        if !existing.is_empty() {
            info!(name = name, records = existing.len(), "Replacing stale A record");
            self.remove_a(name).await?;
        }

        match self.gateway.create_a(name, vip).await {
            Ok(_) => {
                info!(name = name, ipv4addr = vip, "A record created");
                Ok(())
            }
            Err(e) if e.is_already_exists() => {
                info!(name = name, "A record created concurrently by another caller");
                Ok(())
            }
            Err(e) => Err(dns_failure(format!("Failed to create A record {name}"), e)),
        }
    }

    async fn remove_cname(&self, alias: &str) -> Result<(), ReconcileError> {
        match self.gateway.delete_cname(alias).await {
            Ok(()) => {
                info!(alias = alias, "CNAME deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(alias = alias, "CNAME already absent");
                Ok(())
            }
            Err(e) => Err(dns_failure(format!("Failed to delete CNAME {alias}"), e)),
        }
    }

    async fn remove_a(&self, name: &str) -> Result<(), ReconcileError> {
        match self.gateway.delete_a(name).await {
            Ok(()) => {
                info!(name = name, "A record deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(name = name, "A record already absent");
                Ok(())
            }
            Err(e) => Err(dns_failure(format!("Failed to delete A record {name}"), e)),
        }
    }

    /// Delete every current alias and cloud A record.
    pub async fn teardown(&self, provisioned: &GslbProvisionedState) -> ReconcileResult {
        let mut result = ReconcileResult::new();
        if let Err(e) = self.remove_all(provisioned, true).await {
            error!(error = %e, "DNS teardown failed");
            result.fail(e);
        }
        result
    }

    /// Delete only the cloud A records, leaving aliases in place.
    ///
    /// Used when the application stays enabled in other clouds.
    pub async fn retire(&self, provisioned: &GslbProvisionedState) -> ReconcileResult {
        let mut result = ReconcileResult::new();
        if let Err(e) = self.remove_all(provisioned, false).await {
            error!(error = %e, "DNS cloud entry retirement failed");
            result.fail(e);
        }
        result
    }

    async fn remove_all(
        &self,
        provisioned: &GslbProvisionedState,
        include_aliases: bool,
    ) -> Result<(), ReconcileError> {
        if include_aliases {
            for alias in provisioned.normalized_aliases() {
                self.remove_cname(&alias).await?;
            }
        }
        for name in record_names(&provisioned.cloud_a_records) {
            self.remove_a(&name).await?;
        }
        Ok(())
    }

    /// Assert every desired alias resolves to exactly `canonical` and every
    /// cloud entry holds exactly its VIP, without mutating.
    pub async fn check_status(
        &self,
        desired: &GslbDesiredState,
        canonical: &str,
    ) -> ReconcileResult {
        let mut result = ReconcileResult::new();
        if let Err(e) = self.compare(desired, canonical, &mut result.dns_entries).await {
            warn!(error = %e, "DNS status check failed");
            result.fail(e);
        }
        result
    }

    async fn compare(
        &self,
        desired: &GslbDesiredState,
        canonical: &str,
        entries: &mut BTreeMap<String, String>,
    ) -> Result<(), ReconcileError> {
        let canonical = canonical.to_lowercase();
        for alias in desired.normalized_aliases() {
            let records = self
                .gateway
                .get_cname(&alias)
                .await
                .map_err(|e| dns_failure(format!("CNAME lookup failed for {alias}"), e))?;
            match records.as_slice() {
                [only] if only.canonical.eq_ignore_ascii_case(&canonical) => {
                    entries.insert(alias, canonical.clone());
                }
                _ => {
                    let actual: Vec<&str> = records.iter().map(|r| r.canonical.as_str()).collect();
                    return Err(ReconcileError::CnameMismatch {
                        alias,
                        expected: canonical,
                        actual: format!("[{}]", actual.join(", ")),
                    });
                }
            }
        }

        for record in &desired.cloud_a_records {
            let name = record.a_record_name.trim().to_lowercase();
            let Some(vip) = desired.cloud_vip(&record.cloud) else {
                continue;
            };
            let found = self
                .gateway
                .get_a(&name)
                .await
                .map_err(|e| dns_failure(format!("A record lookup failed for {name}"), e))?;
            let addresses: Vec<&str> = found.iter().map(|a| a.ipv4addr.as_str()).collect();
            if addresses != [vip] {
                return Err(ReconcileError::StatusMismatch {
                    subject: format!("A record {name}"),
                    expected: vip.to_string(),
                    actual: format!("[{}]", addresses.join(", ")),
                });
            }
            entries.insert(name, vip.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "dns_tests.rs"]
mod dns_tests;
