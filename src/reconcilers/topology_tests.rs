// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `topology.rs`

#[cfg(test)]
mod tests {
    use super::super::TopologyCache;
    use crate::errors::{GatewayError, ReconcileError};
    use crate::gateway::memory::{MemoryTrafficGateway, TrafficOp};
    use crate::gateway::DcCloud;

    fn clouds() -> Vec<DcCloud> {
        vec![
            DcCloud {
                id: 101,
                name: "c1".to_string(),
                data_center_id: 1,
            },
            DcCloud {
                id: 201,
                name: "c2".to_string(),
                data_center_id: 2,
            },
        ]
    }

    #[tokio::test]
    async fn test_miss_loads_whole_topology_once() {
        let gw = MemoryTrafficGateway::with_topology(clouds());
        let cache = TopologyCache::new();

        let c1 = cache.lookup(&gw, "c1").await.unwrap();
        let c2 = cache.lookup(&gw, "c2").await.unwrap();

        assert_eq!(c1.data_center_id, 1);
        assert_eq!(c2.id, 201);
        assert_eq!(cache.len().await, 2);
        assert_eq!(gw.calls(TrafficOp::GetTopology).await, 1);
    }

    #[tokio::test]
    async fn test_unknown_cloud_after_refresh() {
        let gw = MemoryTrafficGateway::with_topology(clouds());
        let cache = TopologyCache::new();

        let err = cache.lookup(&gw, "c9").await.unwrap_err();
        assert_eq!(
            err,
            ReconcileError::UnknownCloud {
                cloud: "c9".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_new_cloud_is_picked_up_on_miss() {
        let gw = MemoryTrafficGateway::with_topology(clouds());
        let cache = TopologyCache::new();
        cache.lookup(&gw, "c1").await.unwrap();

        gw.add_cloud("c3", 301, 3).await;
        let c3 = cache.lookup(&gw, "c3").await.unwrap();

        assert_eq!(c3.data_center_id, 3);
        assert_eq!(gw.calls(TrafficOp::GetTopology).await, 2);
    }

    #[tokio::test]
    async fn test_refresh_failure_is_reported() {
        let gw = MemoryTrafficGateway::with_topology(clouds());
        gw.fail_next(
            TrafficOp::GetTopology,
            GatewayError::transport("getDataCenters", "timeout"),
        )
        .await;
        let cache = TopologyCache::new();

        let err = cache.lookup(&gw, "c1").await.unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Failed to load data center topology : "));
        assert!(cache.is_empty().await);
    }
}
