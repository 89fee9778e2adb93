// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Gateways to the two external systems the engine converges.
//!
//! - [`TrafficGateway`] - the traffic-distribution (MTD) directory: bases, hosts, topology
//! - [`DnsGateway`] - the DNS directory: CNAME and A records
//!
//! Every call returns a typed [`GatewayError`] so reconcilers can tell benign
//! outcomes (already exists, not found) apart from fatal ones.
//!
//! Implementations:
//! - [`torbit::TorbitClient`] and [`infoblox::InfobloxClient`] talk HTTP
//! - [`memory::MemoryTrafficGateway`] and [`memory::MemoryDnsGateway`] keep
//!   state in process, for tests and dry runs

pub mod http;
pub mod infoblox;
pub mod memory;
pub mod torbit;
pub mod types;

pub use types::{
    ARecord, CnameRecord, DcCloud, HostResult, HostSpec, MtdBase, MtdDeployment, MtdHealthCheck,
    MtdTarget, MtdVersion,
};

use async_trait::async_trait;

use crate::errors::GatewayError;

/// Capability set consumed from the traffic-distribution service.
#[async_trait]
pub trait TrafficGateway: Send + Sync {
    /// Create a base. Fails with `AlreadyExists` on a uniqueness violation.
    async fn create_base(&self, hostname: &str, base_type: &str) -> Result<MtdBase, GatewayError>;

    async fn get_base(&self, hostname: &str) -> Result<MtdBase, GatewayError>;

    /// Create a host. Fails with `AlreadyExists` when the host exists on the base.
    async fn create_host(&self, base_id: u64, spec: &HostSpec) -> Result<HostResult, GatewayError>;

    async fn update_host(
        &self,
        base_id: u64,
        host_name: &str,
        spec: &HostSpec,
    ) -> Result<HostResult, GatewayError>;

    async fn get_host(&self, base_id: u64, host_name: &str) -> Result<HostResult, GatewayError>;

    async fn delete_host(&self, base_id: u64, host_name: &str) -> Result<(), GatewayError>;

    /// All clouds known to the service, with their data-center ids.
    async fn get_topology(&self) -> Result<Vec<DcCloud>, GatewayError>;
}

/// Capability set consumed from the DNS service.
///
/// Lookups return an empty list when no record exists. Deletes fail with
/// `NotFound` when there is nothing to delete.
#[async_trait]
pub trait DnsGateway: Send + Sync {
    async fn get_cname(&self, name: &str) -> Result<Vec<CnameRecord>, GatewayError>;

    async fn create_cname(&self, name: &str, canonical: &str) -> Result<CnameRecord, GatewayError>;

    async fn delete_cname(&self, name: &str) -> Result<(), GatewayError>;

    async fn get_a(&self, name: &str) -> Result<Vec<ARecord>, GatewayError>;

    async fn create_a(&self, name: &str, ipv4addr: &str) -> Result<ARecord, GatewayError>;

    async fn delete_a(&self, name: &str) -> Result<(), GatewayError>;
}
