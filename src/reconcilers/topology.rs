// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Read-through cache of the data-center topology.
//!
//! Maps a cloud name to its cloud id and data-center id. Entries never change
//! once cached. A miss fetches the whole topology again and stores every cloud
//! it returns, so concurrent refreshes only overwrite entries with equal values.

use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::errors::{GatewayError, ReconcileError};
use crate::gateway::{DcCloud, TrafficGateway};

/// Cloud name to topology entry, shared by the reconcilers of one provider.
#[derive(Debug, Default)]
pub struct TopologyCache {
    clouds: RwLock<HashMap<String, DcCloud>>,
}

impl TopologyCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached entry for `cloud`, without fetching.
    pub async fn get(&self, cloud: &str) -> Option<DcCloud> {
        self.clouds.read().await.get(cloud).cloned()
    }

    /// Number of cached clouds.
    pub async fn len(&self) -> usize {
        self.clouds.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clouds.read().await.is_empty()
    }

    /// Fetch the topology and cache every cloud it lists.
    ///
    /// # Errors
    ///
    /// Returns the gateway error if the topology cannot be read.
    pub async fn refresh(&self, gateway: &dyn TrafficGateway) -> Result<usize, GatewayError> {
        let clouds = gateway.get_topology().await?;
        let count = clouds.len();
        let mut cache = self.clouds.write().await;
        for cloud in clouds {
            cache.insert(cloud.name.clone(), cloud);
        }
        info!(clouds = count, "Data center topology loaded");
        Ok(count)
    }

    /// Entry for `cloud`, refreshing the topology once on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Gateway`] if the refresh fails and
    /// [`ReconcileError::UnknownCloud`] if the cloud is still missing afterwards.
    pub async fn lookup(
        &self,
        gateway: &dyn TrafficGateway,
        cloud: &str,
    ) -> Result<DcCloud, ReconcileError> {
        if let Some(entry) = self.get(cloud).await {
            return Ok(entry);
        }
        debug!(cloud = cloud, "Topology cache miss");
        self.refresh(gateway)
            .await
            .map_err(|e| ReconcileError::gateway("Failed to load data center topology", e))?;
        self.get(cloud)
            .await
            .ok_or_else(|| ReconcileError::UnknownCloud {
                cloud: cloud.to_string(),
            })
    }
}

#[cfg(test)]
#[path = "topology_tests.rs"]
mod topology_tests;
