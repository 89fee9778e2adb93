// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory gateways.
//!
//! Both gateways enforce the same uniqueness and not-found rules as the real
//! services, count calls per operation and can be told to fail the next call
//! of an operation with a chosen error. They back the unit and integration
//! tests and the CLI's dry-run mode.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use tokio::sync::Mutex;
use tracing::debug;

use super::{
    ARecord, CnameRecord, DcCloud, DnsGateway, HostResult, HostSpec, MtdBase, MtdDeployment,
    MtdVersion, TrafficGateway,
};
use crate::errors::GatewayError;

/// Operations of [`TrafficGateway`], used for failure injection and call counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrafficOp {
    CreateBase,
    GetBase,
    CreateHost,
    UpdateHost,
    GetHost,
    DeleteHost,
    GetTopology,
}

/// Operations of [`DnsGateway`], used for failure injection and call counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DnsOp {
    GetCname,
    CreateCname,
    DeleteCname,
    GetA,
    CreateA,
    DeleteA,
}

/// Per-operation call counters and queued failures.
#[derive(Debug)]
struct Faults<Op> {
    calls: HashMap<Op, usize>,
    pending: HashMap<Op, VecDeque<GatewayError>>,
}

impl<Op> Default for Faults<Op> {
    fn default() -> Self {
        Self {
            calls: HashMap::new(),
            pending: HashMap::new(),
        }
    }
}

impl<Op: Copy + Eq + std::hash::Hash + std::fmt::Debug> Faults<Op> {
    fn enter(&mut self, op: Op) -> Result<(), GatewayError> {
        *self.calls.entry(op).or_default() += 1;
        match self.pending.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => {
                debug!(operation = ?op, error = %err, "Injected gateway failure");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn push(&mut self, op: Op, err: GatewayError) {
        self.pending.entry(op).or_default().push_back(err);
    }

    fn count(&self, op: Op) -> usize {
        self.calls.get(&op).copied().unwrap_or_default()
    }
}

#[derive(Debug, Default)]
struct TrafficState {
    bases: BTreeMap<String, MtdBase>,
    hosts: BTreeMap<(u64, String), HostResult>,
    topology: Vec<DcCloud>,
    next_base_id: u64,
    next_version: u64,
    next_deployment: u64,
    faults: Faults<TrafficOp>,
}

/// In-memory traffic-distribution directory.
#[derive(Debug, Default)]
pub struct MemoryTrafficGateway {
    state: Mutex<TrafficState>,
}

impl MemoryTrafficGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway whose topology lists the given clouds.
    #[must_use]
    pub fn with_topology(clouds: Vec<DcCloud>) -> Self {
        Self {
            state: Mutex::new(TrafficState {
                topology: clouds,
                ..TrafficState::default()
            }),
        }
    }

    /// Add a cloud to the topology.
    pub async fn add_cloud(&self, name: &str, id: u64, data_center_id: u64) {
        self.state.lock().await.topology.push(DcCloud {
            id,
            name: name.to_string(),
            data_center_id,
        });
    }

    /// Create a base directly, as a concurrent caller would.
    pub async fn insert_base(&self, hostname: &str) -> MtdBase {
        let mut state = self.state.lock().await;
        insert_base(&mut state, hostname)
    }

    /// Fail the next call of `op` with `err`. Calls queue in order.
    pub async fn fail_next(&self, op: TrafficOp, err: GatewayError) {
        self.state.lock().await.faults.push(op, err);
    }

    /// Number of calls made to `op`, including injected failures.
    pub async fn calls(&self, op: TrafficOp) -> usize {
        self.state.lock().await.faults.count(op)
    }

    /// Current host record, if any.
    pub async fn host(&self, base_id: u64, host_name: &str) -> Option<HostResult> {
        self.state
            .lock()
            .await
            .hosts
            .get(&(base_id, host_name.to_lowercase()))
            .cloned()
    }

    /// Replace a stored host record, bypassing versioning.
    pub async fn overwrite_host(&self, base_id: u64, host: HostResult) {
        let key = (base_id, host.mtd_host.mtd_host_name.to_lowercase());
        self.state.lock().await.hosts.insert(key, host);
    }

    /// Number of hosts across all bases.
    pub async fn host_count(&self) -> usize {
        self.state.lock().await.hosts.len()
    }
}

fn insert_base(state: &mut TrafficState, hostname: &str) -> MtdBase {
    let key = hostname.to_lowercase();
    if let Some(existing) = state.bases.get(&key) {
        return existing.clone();
    }
    state.next_base_id += 1;
    let base = MtdBase {
        mtd_base_id: state.next_base_id,
        mtd_base_name: key.clone(),
    };
    state.bases.insert(key, base.clone());
    base
}

fn stamp(state: &mut TrafficState, spec: &HostSpec) -> HostResult {
    state.next_version += 1;
    state.next_deployment += 1;
    HostResult {
        mtd_host: spec.clone(),
        version: Some(MtdVersion {
            version_id: state.next_version,
        }),
        deployment: Some(MtdDeployment {
            deployment_id: state.next_deployment,
        }),
    }
}

#[async_trait]
impl TrafficGateway for MemoryTrafficGateway {
    async fn create_base(&self, hostname: &str, _base_type: &str) -> Result<MtdBase, GatewayError> {
        let mut state = self.state.lock().await;
        state.faults.enter(TrafficOp::CreateBase)?;
        if state.bases.contains_key(&hostname.to_lowercase()) {
            return Err(GatewayError::already_exists("MtdBase", hostname));
        }
        Ok(insert_base(&mut state, hostname))
    }

    async fn get_base(&self, hostname: &str) -> Result<MtdBase, GatewayError> {
        let mut state = self.state.lock().await;
        state.faults.enter(TrafficOp::GetBase)?;
        state
            .bases
            .get(&hostname.to_lowercase())
            .cloned()
            .ok_or_else(|| GatewayError::not_found("MtdBase", hostname))
    }

    async fn create_host(&self, base_id: u64, spec: &HostSpec) -> Result<HostResult, GatewayError> {
        let mut state = self.state.lock().await;
        state.faults.enter(TrafficOp::CreateHost)?;
        let key = (base_id, spec.mtd_host_name.to_lowercase());
        if state.hosts.contains_key(&key) {
            return Err(GatewayError::already_exists("MtdHost", &spec.mtd_host_name));
        }
        let result = stamp(&mut state, spec);
        state.hosts.insert(key, result.clone());
        Ok(result)
    }

    async fn update_host(
        &self,
        base_id: u64,
        host_name: &str,
        spec: &HostSpec,
    ) -> Result<HostResult, GatewayError> {
        let mut state = self.state.lock().await;
        state.faults.enter(TrafficOp::UpdateHost)?;
        let key = (base_id, host_name.to_lowercase());
        if !state.hosts.contains_key(&key) {
            return Err(GatewayError::not_found("MtdHost", host_name));
        }
        let result = stamp(&mut state, spec);
        state.hosts.insert(key, result.clone());
        Ok(result)
    }

    async fn get_host(&self, base_id: u64, host_name: &str) -> Result<HostResult, GatewayError> {
        let mut state = self.state.lock().await;
        state.faults.enter(TrafficOp::GetHost)?;
        state
            .hosts
            .get(&(base_id, host_name.to_lowercase()))
            .cloned()
            .ok_or_else(|| GatewayError::not_found("MtdHost", host_name))
    }

    async fn delete_host(&self, base_id: u64, host_name: &str) -> Result<(), GatewayError> {
        let mut state = self.state.lock().await;
        state.faults.enter(TrafficOp::DeleteHost)?;
        state
            .hosts
            .remove(&(base_id, host_name.to_lowercase()))
            .map(|_| ())
            .ok_or_else(|| GatewayError::not_found("MtdHost", host_name))
    }

    async fn get_topology(&self) -> Result<Vec<DcCloud>, GatewayError> {
        let mut state = self.state.lock().await;
        state.faults.enter(TrafficOp::GetTopology)?;
        Ok(state.topology.clone())
    }
}

#[derive(Debug, Default)]
struct DnsState {
    cnames: BTreeMap<String, Vec<CnameRecord>>,
    a_records: BTreeMap<String, Vec<ARecord>>,
    faults: Faults<DnsOp>,
}

/// In-memory DNS directory.
///
/// Names are stored lower-cased. Seeding helpers may store several records
/// under one name to model inconsistent remote state.
#[derive(Debug, Default)]
pub struct MemoryDnsGateway {
    state: Mutex<DnsState>,
}

impl MemoryDnsGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a CNAME record, keeping any existing ones for the same name.
    pub async fn insert_cname(&self, name: &str, canonical: &str) {
        let name = name.to_lowercase();
        self.state
            .lock()
            .await
            .cnames
            .entry(name.clone())
            .or_default()
            .push(CnameRecord {
                name,
                canonical: canonical.to_string(),
            });
    }

    /// Add an A record, keeping any existing ones for the same name.
    pub async fn insert_a(&self, name: &str, ipv4addr: &str) {
        let name = name.to_lowercase();
        self.state
            .lock()
            .await
            .a_records
            .entry(name.clone())
            .or_default()
            .push(ARecord {
                name,
                ipv4addr: ipv4addr.to_string(),
            });
    }

    /// Canonical names stored for every alias.
    pub async fn cnames(&self) -> BTreeMap<String, Vec<String>> {
        self.state
            .lock()
            .await
            .cnames
            .iter()
            .map(|(name, records)| {
                (
                    name.clone(),
                    records.iter().map(|r| r.canonical.clone()).collect(),
                )
            })
            .collect()
    }

    /// Addresses stored for every A record name.
    pub async fn a_records(&self) -> BTreeMap<String, Vec<String>> {
        self.state
            .lock()
            .await
            .a_records
            .iter()
            .map(|(name, records)| {
                (
                    name.clone(),
                    records.iter().map(|r| r.ipv4addr.clone()).collect(),
                )
            })
            .collect()
    }

    /// Fail the next call of `op` with `err`. Calls queue in order.
    pub async fn fail_next(&self, op: DnsOp, err: GatewayError) {
        self.state.lock().await.faults.push(op, err);
    }

    /// Number of calls made to `op`, including injected failures.
    pub async fn calls(&self, op: DnsOp) -> usize {
        self.state.lock().await.faults.count(op)
    }
}

#[async_trait]
impl DnsGateway for MemoryDnsGateway {
    async fn get_cname(&self, name: &str) -> Result<Vec<CnameRecord>, GatewayError> {
        let mut state = self.state.lock().await;
        state.faults.enter(DnsOp::GetCname)?;
        Ok(state
            .cnames
            .get(&name.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn create_cname(&self, name: &str, canonical: &str) -> Result<CnameRecord, GatewayError> {
        let mut state = self.state.lock().await;
        state.faults.enter(DnsOp::CreateCname)?;
        let key = name.to_lowercase();
        if state.cnames.get(&key).is_some_and(|r| !r.is_empty()) {
            return Err(GatewayError::already_exists("CNAME", name));
        }
        let record = CnameRecord {
            name: key.clone(),
            canonical: canonical.to_string(),
        };
        state.cnames.insert(key, vec![record.clone()]);
        Ok(record)
    }

    async fn delete_cname(&self, name: &str) -> Result<(), GatewayError> {
        let mut state = self.state.lock().await;
        state.faults.enter(DnsOp::DeleteCname)?;
        match state.cnames.remove(&name.to_lowercase()) {
            Some(records) if !records.is_empty() => Ok(()),
            _ => Err(GatewayError::not_found("CNAME", name)),
        }
    }

    async fn get_a(&self, name: &str) -> Result<Vec<ARecord>, GatewayError> {
        let mut state = self.state.lock().await;
        state.faults.enter(DnsOp::GetA)?;
        Ok(state
            .a_records
            .get(&name.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn create_a(&self, name: &str, ipv4addr: &str) -> Result<ARecord, GatewayError> {
        let mut state = self.state.lock().await;
        state.faults.enter(DnsOp::CreateA)?;
        let key = name.to_lowercase();
        let records = state.a_records.entry(key.clone()).or_default();
        if records.iter().any(|r| r.ipv4addr == ipv4addr) {
            return Err(GatewayError::already_exists("A", name));
        }
        let record = ARecord {
            name: key,
            ipv4addr: ipv4addr.to_string(),
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn delete_a(&self, name: &str) -> Result<(), GatewayError> {
        let mut state = self.state.lock().await;
        state.faults.enter(DnsOp::DeleteA)?;
        match state.a_records.remove(&name.to_lowercase()) {
            Some(records) if !records.is_empty() => Ok(()),
            _ => Err(GatewayError::not_found("A", name)),
        }
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod memory_tests;
