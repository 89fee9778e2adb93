// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `traffic.rs`

#[cfg(test)]
mod tests {
    use super::super::{mtd_health_check, validate_health_checks, TrafficReconciler};
    use crate::errors::GatewayError;
    use crate::gateway::memory::{MemoryTrafficGateway, TrafficOp};
    use crate::gateway::{DcCloud, TrafficGateway};
    use crate::model::{
        DnsConfig, Distribution, GslbDesiredState, GslbProvisionedState, HealthCheck,
        ReconcileStatus, Target,
    };
    use crate::reconcilers::retry::RetryPolicy;
    use crate::reconcilers::topology::TopologyCache;
    use std::sync::Arc;
    use std::time::Duration;

    const BASE_DOMAIN: &str = "gslb.xyz.com";
    const BASE_HOST: &str = ".env.a1.org.gslb.xyz.com";

    // =====================================================
    // Helper Functions
    // =====================================================

    fn gateway() -> Arc<MemoryTrafficGateway> {
        Arc::new(MemoryTrafficGateway::with_topology(vec![
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
            DcCloud {
                id: 301,
                name: "c3".to_string(),
                data_center_id: 3,
            },
        ]))
    }

    fn reconciler(gw: &Arc<MemoryTrafficGateway>) -> TrafficReconciler {
        TrafficReconciler::new(gw.clone(), Arc::new(TopologyCache::new()), BASE_DOMAIN)
            .with_retry_policy(RetryPolicy::immediate(2))
    }

    fn target(cloud: &str, vip: &str, enabled: bool) -> Target {
        Target {
            cloud: cloud.to_string(),
            vip: vip.to_string(),
            enabled_for_traffic: enabled,
            weight_percent: None,
        }
    }

    fn desired(targets: Vec<Target>) -> GslbDesiredState {
        GslbDesiredState {
            app: "Plt".to_string(),
            subdomain: "Env.a1.org".to_string(),
            targets,
            distribution: Distribution::Proximity,
            health_checks: vec![HealthCheck::http(80, "/"), HealthCheck::tcp(3306)],
            dns_config: DnsConfig {
                zone: "prod.xyz.com".to_string(),
            },
            aliases: vec![],
            cloud_a_records: vec![],
            obsolete_aliases: vec![],
            obsolete_cloud_a_records: vec![],
            correlation_id: "t-1".to_string(),
        }
    }

    fn provisioned() -> GslbProvisionedState {
        GslbProvisionedState {
            app: "plt".to_string(),
            subdomain: "env.a1.org".to_string(),
            dns_config: DnsConfig::default(),
            aliases: vec![],
            cloud_a_records: vec![],
            correlation_id: "t-1".to_string(),
            platform_enabled: false,
        }
    }

    // =====================================================
    // Host Payload Tests
    // =====================================================

    #[tokio::test]
    async fn test_primary_and_secondary_weights_under_proximity() {
        let gw = gateway();
        let spec = reconciler(&gw)
            .build_host_spec(&desired(vec![
                target("c1", "10.1.1.10", true),
                target("c2", "10.2.1.10", false),
            ]))
            .await
            .unwrap();

        assert_eq!(spec.mtd_host_name, "plt");
        assert_eq!(spec.locality_scope, 0);
        assert!(spec.is_dc_failover);
        assert_eq!(spec.load_balancing_distribution, 1);

        let primary = &spec.mtd_targets[0];
        assert_eq!(primary.mtd_target_host, "10.1.1.10");
        assert!(primary.enabled);
        assert_eq!(primary.weight_percent, 100);
        assert_eq!((primary.cloud_id, primary.data_center_id), (101, 1));

        let secondary = &spec.mtd_targets[1];
        assert!(!secondary.enabled);
        assert_eq!(secondary.weight_percent, 0);
        assert_eq!((secondary.cloud_id, secondary.data_center_id), (201, 2));
    }

    #[tokio::test]
    async fn test_explicit_weights_are_kept_in_order() {
        let gw = gateway();
        let mut state = desired(vec![
            target("c1", "10.1.1.10", true),
            target("c2", "10.2.1.10", false),
            target("c3", "10.3.1.10", true),
        ]);
        state.distribution = Distribution::RoundRobin;
        for (t, w) in state.targets.iter_mut().zip([20, 30, 50]) {
            t.weight_percent = Some(w);
        }

        let spec = reconciler(&gw).build_host_spec(&state).await.unwrap();
        let weights: Vec<u32> = spec.mtd_targets.iter().map(|t| t.weight_percent).collect();
        assert_eq!(weights, vec![20, 30, 50]);
        assert_eq!(spec.locality_scope, 2);
    }

    #[tokio::test]
    async fn test_blank_vip_targets_are_dropped() {
        let gw = gateway();
        let spec = reconciler(&gw)
            .build_host_spec(&desired(vec![
                target("c1", "10.1.1.10", true),
                target("c2", "  ", true),
            ]))
            .await
            .unwrap();
        assert_eq!(spec.mtd_targets.len(), 1);
    }

    #[test]
    fn test_health_check_conversion() {
        let http = mtd_health_check(&HealthCheck::http(80, "/health"));
        assert_eq!(http.name, "gslb-http-80");
        assert_eq!(http.test_object_path.as_deref(), Some("/health"));
        assert_eq!(http.expected_status, Some(200));
        assert_eq!(http.interval, "5s");
        assert_eq!(http.timeout, "2s");
        assert_eq!(http.retry_delay, "30s");
        assert_eq!(http.fails_for_down, 3);

        let tcp = mtd_health_check(&HealthCheck::tcp(3306));
        assert_eq!(tcp.name, "gslb-tcp-3306");
        assert_eq!(tcp.protocol, "tcp");
        assert!(tcp.test_object_path.is_none());
        assert!(tcp.expected_status.is_none());
    }

    // =====================================================
    // Setup Tests
    // =====================================================

    #[tokio::test]
    async fn test_setup_creates_base_and_host() {
        let gw = gateway();
        let result = reconciler(&gw)
            .setup(&desired(vec![target("c1", "10.1.1.10", true)]))
            .await;

        assert_eq!(result.status, ReconcileStatus::Success);
        assert_eq!(
            result.canonical_name.as_deref(),
            Some("plt.env.a1.org.gslb.xyz.com")
        );
        let base = gw.get_base(BASE_HOST).await.unwrap();
        assert_eq!(result.base_id, Some(base.mtd_base_id.to_string()));
        assert!(result.host_version.is_some());
        assert!(result.deployment_id.is_some());
        assert_eq!(gw.host_count().await, 1);
    }

    #[tokio::test]
    async fn test_setup_twice_updates_existing_host() {
        let gw = gateway();
        let rec = reconciler(&gw);
        let state = desired(vec![target("c1", "10.1.1.10", true)]);

        let first = rec.setup(&state).await;
        let second = rec.setup(&state).await;

        assert_eq!(second.status, ReconcileStatus::Success);
        assert_eq!(first.base_id, second.base_id);
        assert_ne!(first.host_version, second.host_version);
        assert_eq!(gw.calls(TrafficOp::UpdateHost).await, 1);
        assert_eq!(gw.host_count().await, 1);
    }

    #[tokio::test]
    async fn test_base_created_by_concurrent_caller_is_reused() {
        let gw = gateway();
        let existing = gw.insert_base(BASE_HOST).await;

        let result = reconciler(&gw)
            .setup(&desired(vec![target("c1", "10.1.1.10", true)]))
            .await;

        assert_eq!(result.status, ReconcileStatus::Success);
        assert_eq!(result.base_id, Some(existing.mtd_base_id.to_string()));
        assert_eq!(gw.calls(TrafficOp::CreateBase).await, 1);
        assert_eq!(gw.calls(TrafficOp::GetBase).await, 1);
    }

    #[tokio::test]
    async fn test_transient_base_failure_is_retried() {
        let gw = gateway();
        gw.fail_next(
            TrafficOp::CreateBase,
            GatewayError::transport("createMtdBase", "connection reset"),
        )
        .await;

        let result = reconciler(&gw)
            .setup(&desired(vec![target("c1", "10.1.1.10", true)]))
            .await;

        assert_eq!(result.status, ReconcileStatus::Success);
        assert_eq!(gw.calls(TrafficOp::CreateBase).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_policy_waits_between_base_attempts() {
        let gw = gateway();
        gw.fail_next(
            TrafficOp::CreateBase,
            GatewayError::transport("createMtdBase", "timeout"),
        )
        .await;
        let rec = TrafficReconciler::new(gw.clone(), Arc::new(TopologyCache::new()), BASE_DOMAIN);
        let start = tokio::time::Instant::now();

        let result = rec
            .setup(&desired(vec![target("c1", "10.1.1.10", true)]))
            .await;

        assert_eq!(result.status, ReconcileStatus::Success);
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_base_failure_after_all_attempts_is_fatal() {
        let gw = gateway();
        for _ in 0..2 {
            gw.fail_next(
                TrafficOp::CreateBase,
                GatewayError::transport("createMtdBase", "timeout"),
            )
            .await;
        }

        let result = reconciler(&gw)
            .setup(&desired(vec![target("c1", "10.1.1.10", true)]))
            .await;

        assert_eq!(result.status, ReconcileStatus::Failed);
        let message = result.failure_message.unwrap();
        assert!(message.starts_with("MtdBase could not be created for .env.a1.org.gslb.xyz.com : "));
        assert!(message.contains("timeout"));
        assert!(result.base_id.is_none());
    }

    #[tokio::test]
    async fn test_rejected_base_create_is_not_retried() {
        let gw = gateway();
        gw.fail_next(
            TrafficOp::CreateBase,
            GatewayError::rejected("createMtdBase", "INVALID_NAME"),
        )
        .await;

        let result = reconciler(&gw)
            .setup(&desired(vec![target("c1", "10.1.1.10", true)]))
            .await;

        assert_eq!(result.status, ReconcileStatus::Failed);
        assert_eq!(gw.calls(TrafficOp::CreateBase).await, 1);
    }

    #[tokio::test]
    async fn test_host_failure_keeps_base_id() {
        let gw = gateway();
        gw.fail_next(
            TrafficOp::CreateHost,
            GatewayError::rejected("createMtdHost", "INVALID_TARGET"),
        )
        .await;

        let result = reconciler(&gw)
            .setup(&desired(vec![target("c1", "10.1.1.10", true)]))
            .await;

        assert_eq!(result.status, ReconcileStatus::Failed);
        assert!(result.base_id.is_some());
        assert_eq!(
            result.failure_message.as_deref(),
            Some("createMtdHost failed : createMtdHost failed with INVALID_TARGET")
        );
    }

    #[tokio::test]
    async fn test_setup_without_usable_targets_fails() {
        let gw = gateway();
        let result = reconciler(&gw)
            .setup(&desired(vec![target("c1", "", true)]))
            .await;

        assert_eq!(result.status, ReconcileStatus::Failed);
        assert_eq!(gw.calls(TrafficOp::CreateBase).await, 0);
    }

    #[tokio::test]
    async fn test_setup_with_unknown_cloud_fails() {
        let gw = gateway();
        let result = reconciler(&gw)
            .setup(&desired(vec![target("c9", "10.9.1.10", true)]))
            .await;

        assert_eq!(result.status, ReconcileStatus::Failed);
        assert!(result.failure_message.unwrap().contains("c9"));
    }

    #[tokio::test]
    async fn test_http_health_check_without_path_is_rejected() {
        let gw = gateway();
        let mut state = desired(vec![target("c1", "10.1.1.10", true)]);
        state.health_checks[0].path = None;

        let result = reconciler(&gw).setup(&state).await;

        assert_eq!(result.status, ReconcileStatus::Failed);
        assert_eq!(
            result.failure_message.as_deref(),
            Some("invalid request : HTTP health check on port 80 has no probe path")
        );
        assert_eq!(gw.calls(TrafficOp::CreateBase).await, 0);
        assert_eq!(gw.host_count().await, 0);
    }

    #[test]
    fn test_blank_http_path_is_invalid_and_tcp_needs_none() {
        let mut state = desired(vec![target("c1", "10.1.1.10", true)]);
        assert!(validate_health_checks(&state).is_ok());

        state.health_checks[0].path = Some("  ".to_string());
        assert!(validate_health_checks(&state).is_err());

        state.health_checks = vec![HealthCheck::tcp(3306)];
        assert!(validate_health_checks(&state).is_ok());
    }

    // =====================================================
    // Status Check Tests
    // =====================================================

    #[tokio::test]
    async fn test_check_status_after_setup_succeeds() {
        let gw = gateway();
        let rec = reconciler(&gw);
        let state = desired(vec![
            target("c1", "10.1.1.10", true),
            target("c2", "10.2.1.10", false),
        ]);
        rec.setup(&state).await;

        let result = rec.check_status(&state).await;
        assert_eq!(result.status, ReconcileStatus::Success);
        assert!(result.base_id.is_some());
    }

    #[tokio::test]
    async fn test_check_status_detects_flipped_target() {
        let gw = gateway();
        let rec = reconciler(&gw);
        let state = desired(vec![
            target("c1", "10.1.1.10", true),
            target("c2", "10.2.1.10", false),
        ]);
        rec.setup(&state).await;

        let base = gw.get_base(BASE_HOST).await.unwrap();
        let mut host = gw.host(base.mtd_base_id, "plt").await.unwrap();
        host.mtd_host.mtd_targets[1].enabled = true;
        gw.overwrite_host(base.mtd_base_id, host).await;

        let result = rec.check_status(&state).await;
        assert_eq!(result.status, ReconcileStatus::Failed);
        assert!(result
            .failure_message
            .unwrap()
            .starts_with("MtdHost targets does not match"));
        assert_eq!(gw.calls(TrafficOp::UpdateHost).await, 0);
    }

    #[tokio::test]
    async fn test_check_status_without_host_fails() {
        let gw = gateway();
        gw.insert_base(BASE_HOST).await;

        let result = reconciler(&gw)
            .check_status(&desired(vec![target("c1", "10.1.1.10", true)]))
            .await;
        assert_eq!(result.status, ReconcileStatus::Failed);
    }

    // =====================================================
    // Teardown Tests
    // =====================================================

    #[tokio::test]
    async fn test_teardown_deletes_host() {
        let gw = gateway();
        let rec = reconciler(&gw);
        rec.setup(&desired(vec![target("c1", "10.1.1.10", true)]))
            .await;

        let result = rec.teardown(&provisioned()).await;
        assert_eq!(result.status, ReconcileStatus::Success);
        assert_eq!(gw.host_count().await, 0);
    }

    #[tokio::test]
    async fn test_teardown_of_missing_host_succeeds() {
        let gw = gateway();
        gw.insert_base(BASE_HOST).await;

        let result = reconciler(&gw).teardown(&provisioned()).await;
        assert_eq!(result.status, ReconcileStatus::Success);
    }

    #[tokio::test]
    async fn test_teardown_of_missing_base_succeeds() {
        let gw = gateway();
        let result = reconciler(&gw).teardown(&provisioned()).await;
        assert_eq!(result.status, ReconcileStatus::Success);
        assert_eq!(gw.calls(TrafficOp::DeleteHost).await, 0);
    }

    #[tokio::test]
    async fn test_teardown_failure_confirmed_absent_succeeds() {
        let gw = gateway();
        gw.insert_base(BASE_HOST).await;
        gw.fail_next(
            TrafficOp::DeleteHost,
            GatewayError::transport("deleteMtdHost", "HTTP 500"),
        )
        .await;

        let result = reconciler(&gw).teardown(&provisioned()).await;
        assert_eq!(result.status, ReconcileStatus::Success);
        assert_eq!(gw.calls(TrafficOp::GetHost).await, 1);
    }

    #[tokio::test]
    async fn test_teardown_failure_with_host_present_fails() {
        let gw = gateway();
        let rec = reconciler(&gw);
        rec.setup(&desired(vec![target("c1", "10.1.1.10", true)]))
            .await;
        gw.fail_next(
            TrafficOp::DeleteHost,
            GatewayError::transport("deleteMtdHost", "HTTP 500"),
        )
        .await;

        let result = rec.teardown(&provisioned()).await;
        assert_eq!(result.status, ReconcileStatus::Failed);
        assert!(result
            .failure_message
            .unwrap()
            .starts_with("Failed while deleting MtdHost : "));
        assert_eq!(gw.host_count().await, 1);
    }
}
