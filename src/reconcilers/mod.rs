// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconcilers for the two external GSLB systems.
//!
//! Each reconciler converges one gateway toward the desired state and reports
//! a partial [`ReconcileResult`](crate::model::ReconcileResult). Stages never
//! return errors to their caller; a fatal failure marks the partial result
//! FAILED with a message, and the orchestrator in [`crate::provider`] decides
//! whether later stages run.
//!
//! # Available Reconcilers
//!
//! - [`TrafficReconciler`] - MTD base and host records (targets, health checks, locality)
//! - [`DnsReconciler`] - CNAME aliases, per-cloud A records and obsolete entry retirement
//!
//! # Example: Converging Traffic Distribution
//!
//! ```rust,no_run
//! use gslb::gateway::memory::MemoryTrafficGateway;
//! use gslb::model::GslbDesiredState;
//! use gslb::reconcilers::{TopologyCache, TrafficReconciler};
//! use std::sync::Arc;
//!
//! async fn converge(desired: GslbDesiredState) {
//!     let reconciler = TrafficReconciler::new(
//!         Arc::new(MemoryTrafficGateway::new()),
//!         Arc::new(TopologyCache::new()),
//!         "gslb.example.com",
//!     );
//!     let result = reconciler.setup(&desired).await;
//!     println!("{:?}", result.status);
//! }
//! ```

pub mod dns;
pub mod retry;
pub mod topology;
pub mod traffic;

pub use dns::DnsReconciler;
pub use retry::{retry_transient, RetryPolicy};
pub use topology::TopologyCache;
pub use traffic::{build_host_spec, mtd_health_check, TrafficReconciler};
