// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the domain model.

#[cfg(test)]
mod tests {
    use crate::model::*;

    // =====================================================
    // Helper Functions
    // =====================================================

    fn target(cloud: &str, vip: &str, enabled: bool) -> Target {
        Target {
            cloud: cloud.to_string(),
            vip: vip.to_string(),
            enabled_for_traffic: enabled,
            weight_percent: None,
        }
    }

    fn desired() -> GslbDesiredState {
        GslbDesiredState {
            app: "Plt".to_string(),
            subdomain: "Env.A1.org".to_string(),
            targets: vec![
                target("c1", "10.1.1.10", true),
                target("c2", " ", true),
                target("c3", "10.3.1.10", false),
            ],
            distribution: Distribution::Proximity,
            health_checks: vec![],
            dns_config: DnsConfig::default(),
            aliases: vec![],
            cloud_a_records: vec![],
            obsolete_aliases: vec![],
            obsolete_cloud_a_records: vec![],
            correlation_id: String::new(),
        }
    }

    // =====================================================
    // Target Tests
    // =====================================================

    #[test]
    fn test_effective_weight_defaults() {
        assert_eq!(target("c1", "v", true).effective_weight(), 100);
        assert_eq!(target("c1", "v", false).effective_weight(), 0);

        let mut explicit = target("c1", "v", false);
        explicit.weight_percent = Some(30);
        assert_eq!(explicit.effective_weight(), 30);
    }

    #[test]
    fn test_health_check_names() {
        assert_eq!(HealthCheck::http(80, "/").name(), "gslb-http-80");
        assert_eq!(HealthCheck::tcp(3306).name(), "gslb-tcp-3306");
        assert!(HealthCheck::tcp(3306).path.is_none());
    }

    #[test]
    fn test_protocol_parse() {
        assert_eq!(Protocol::parse("HTTP"), Some(Protocol::Http));
        assert_eq!(Protocol::parse("tcp"), Some(Protocol::Tcp));
        assert_eq!(Protocol::parse("udp"), None);
    }

    #[test]
    fn test_locality_scope() {
        assert_eq!(Distribution::Proximity.locality_scope(), 0);
        assert_eq!(Distribution::RoundRobin.locality_scope(), 2);
    }

    // =====================================================
    // Name Derivation Tests
    // =====================================================

    #[test]
    fn test_names_are_lower_cased() {
        let state = desired();
        assert_eq!(state.base_hostname("GSLB.xyz.com"), ".env.a1.org.gslb.xyz.com");
        assert_eq!(state.host_name(), "plt");
        assert_eq!(state.canonical_name("gslb.xyz.com"), "plt.env.a1.org.gslb.xyz.com");
    }

    #[test]
    fn test_blank_vips_are_not_usable() {
        let state = desired();
        assert_eq!(state.usable_targets().count(), 2);
        assert_eq!(state.enabled_vips(), vec!["10.1.1.10"]);
        assert_eq!(state.cloud_vip("C3"), Some("10.3.1.10"));
        assert_eq!(state.cloud_vip("c2"), None);
    }

    #[test]
    fn test_normalized_aliases() {
        let mut state = desired();
        state.aliases = vec![
            "A.xyz.com".to_string(),
            "a.xyz.com".to_string(),
            " ".to_string(),
            "b.xyz.com".to_string(),
        ];
        assert_eq!(state.normalized_aliases(), vec!["a.xyz.com", "b.xyz.com"]);
    }

    #[test]
    fn test_dns_entries_needed() {
        let mut state = desired();
        assert!(!state.dns_entries_needed());
        state.obsolete_cloud_a_records = vec![CloudARecord::new("c1", "old.xyz.com")];
        assert!(state.dns_entries_needed());
    }

    // =====================================================
    // Result Tests
    // =====================================================

    #[test]
    fn test_first_failure_message_wins() {
        let mut result = ReconcileResult::new();
        assert!(!result.is_failed());
        result.fail("first");
        result.fail("second");
        assert!(result.is_failed());
        assert_eq!(result.failure_message.as_deref(), Some("first"));
    }

    #[test]
    fn test_absorb_merges_partial_results() {
        let mut result = ReconcileResult::new();
        result.base_id = Some("1".to_string());
        result.dns_entries.insert("a".to_string(), "x".to_string());

        let mut partial = ReconcileResult::new();
        partial.deployment_id = Some("9".to_string());
        partial.dns_entries.insert("b".to_string(), "y".to_string());
        partial.fail("dns failed");
        result.absorb(partial);

        assert!(result.is_failed());
        assert_eq!(result.base_id.as_deref(), Some("1"));
        assert_eq!(result.deployment_id.as_deref(), Some("9"));
        assert_eq!(result.dns_entries.len(), 2);
        assert_eq!(result.failure_message.as_deref(), Some("dns failed"));
    }

    #[test]
    fn test_finalize_stamps_completion() {
        let mut result = ReconcileResult::new();
        assert!(result.finished_at.is_none());
        result.finalize();
        assert!(result.finished_at.is_some());
    }

    #[test]
    fn test_desired_state_deserializes_with_defaults() {
        let json = r#"{
            "app": "plt",
            "subdomain": "env.a1.org",
            "targets": [{"cloud": "c1", "vip": "10.1.1.10", "enabledForTraffic": true}],
            "distribution": "ROUND_ROBIN",
            "healthChecks": [{"protocol": "http", "port": 80, "path": "/"}],
            "cloudARecordMap": [{"cloud": "c1", "aRecordName": "plt.c1.xyz.com"}]
        }"#;
        let state: GslbDesiredState = serde_json::from_str(json).unwrap();

        assert_eq!(state.distribution, Distribution::RoundRobin);
        assert_eq!(state.health_checks[0], HealthCheck::http(80, "/"));
        assert_eq!(state.cloud_a_records[0].a_record_name, "plt.c1.xyz.com");
        assert!(state.aliases.is_empty());
        assert!(state.correlation_id.is_empty());
    }
}
