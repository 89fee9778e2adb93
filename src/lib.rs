// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # gslb - GSLB reconciliation and verification engine
//!
//! Converges an application's global server load balancing configuration
//! across two external systems: a traffic-distribution (MTD) service that
//! steers requests between cloud VIPs, and an Infoblox DNS directory that
//! publishes aliases pointing at the resulting canonical name.
//!
//! ## Overview
//!
//! The engine is driven by a desired or provisioned state snapshot and
//! reports every outcome through a [`model::ReconcileResult`]:
//!
//! - **Create** - create-or-get the MTD base, create-or-update the host, then
//!   converge CNAME aliases and per-cloud A records
//! - **Delete** - remove the host and DNS records, or only retire the cloud's
//!   A records when the platform remains enabled elsewhere
//! - **Status** - compare remote state with the desired state read-only
//! - **Verify** - independently re-read both gateways after a workflow
//!
//! ## Modules
//!
//! - [`provider`] - Workflow orchestration ([`provider::GslbProvider`])
//! - [`reconcilers`] - Traffic and DNS reconcilers, retry and topology cache
//! - [`verifier`] - Post-workflow verification
//! - [`gateway`] - Gateway traits with HTTP and in-memory implementations
//! - [`model`] - Desired state, provisioned state and results
//! - [`request`] - Derivation of states from platform deployment requests
//! - [`config`] - Gateway and retry configuration
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use gslb::gateway::memory::{MemoryDnsGateway, MemoryTrafficGateway};
//! use gslb::gateway::DcCloud;
//! use gslb::model::{CloudARecord, DnsConfig, Distribution, GslbDesiredState, Target};
//! use gslb::provider::GslbProvider;
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let traffic = Arc::new(MemoryTrafficGateway::with_topology(vec![DcCloud {
//!     id: 101,
//!     name: "c1".to_string(),
//!     data_center_id: 1,
//! }]));
//! let provider = GslbProvider::new(traffic, Arc::new(MemoryDnsGateway::new()), "gslb.xyz.com");
//!
//! let desired = GslbDesiredState {
//!     app: "plt".to_string(),
//!     subdomain: "env.a1.org".to_string(),
//!     targets: vec![Target {
//!         cloud: "c1".to_string(),
//!         vip: "10.1.1.10".to_string(),
//!         enabled_for_traffic: true,
//!         weight_percent: None,
//!     }],
//!     distribution: Distribution::Proximity,
//!     health_checks: vec![],
//!     dns_config: DnsConfig { zone: "prod.xyz.com".to_string() },
//!     aliases: vec!["plt.env.a1.org.prod.xyz.com".to_string()],
//!     cloud_a_records: vec![CloudARecord::new("c1", "plt.env.a1.org.c1.prod.xyz.com")],
//!     obsolete_aliases: vec![],
//!     obsolete_cloud_a_records: vec![],
//!     correlation_id: "req-1".to_string(),
//! };
//!
//! let result = provider.create(&desired).await;
//! assert!(provider.verify(&desired, &result).await.is_ok());
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod errors;
pub mod gateway;
pub mod metrics;
pub mod model;
pub mod provider;
pub mod reconcilers;
pub mod request;
pub mod verifier;

#[cfg(test)]
mod model_tests;
#[cfg(test)]
mod request_tests;
