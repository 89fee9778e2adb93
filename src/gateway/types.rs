// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Record types exchanged with the gateways.
//!
//! Field names follow the MTD v2 and Infoblox WAPI JSON formats so the HTTP
//! clients can (de)serialize them directly.

use serde::{Deserialize, Serialize};

/// A traffic-distribution base (routing domain).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MtdBase {
    pub mtd_base_id: u64,
    /// Canonical base hostname, e.g. `.env.a1.org.gslb.xyz.com`
    pub mtd_base_name: String,
}

/// One routable endpoint of a host.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MtdTarget {
    /// VIP the target points to
    pub mtd_target_host: String,
    pub data_center_id: u64,
    pub cloud_id: u64,
    pub enabled: bool,
    pub weight_percent: u32,
}

/// A health check as understood by the MTD API.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MtdHealthCheck {
    pub name: String,
    pub protocol: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_object_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_status: Option<u16>,
    pub fails_for_down: u32,
    #[serde(default)]
    pub is_enabled: bool,
    /// Durations are sent as `<n>s` strings
    pub interval: String,
    pub retry_delay: String,
    pub timeout: String,
}

/// Host payload for create and update, also the host record returned by reads.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostSpec {
    pub mtd_host_name: String,
    #[serde(default)]
    pub mtd_targets: Vec<MtdTarget>,
    #[serde(default)]
    pub mtd_health_checks: Vec<MtdHealthCheck>,
    pub is_dc_failover: bool,
    pub load_balancing_distribution: u32,
    pub locality_scope: u32,
}

/// Version stamp of a host.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MtdVersion {
    pub version_id: u64,
}

/// Deployment triggered by a host change.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MtdDeployment {
    pub deployment_id: u64,
}

/// Response of a host create, update or read.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostResult {
    pub mtd_host: HostSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<MtdVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<MtdDeployment>,
}

/// One cloud in the data-center topology.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DcCloud {
    pub id: u64,
    pub name: String,
    pub data_center_id: u64,
}

/// A DNS alias record.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CnameRecord {
    pub name: String,
    pub canonical: String,
}

/// A DNS address record.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ARecord {
    pub name: String,
    pub ipv4addr: String,
}
