// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for platform request derivation.

#[cfg(test)]
mod tests {
    use crate::errors::ReconcileError;
    use crate::model::{Distribution, HealthCheck, Protocol};
    use crate::request::*;
    use std::collections::BTreeMap;

    // =====================================================
    // Helper Functions
    // =====================================================

    fn cloud(id: u64, name: &str, priority: &str, status: &str) -> PlatformCloud {
        PlatformCloud {
            id,
            name: name.to_string(),
            priority: Some(priority.to_string()),
            admin_status: Some(status.to_string()),
        }
    }

    fn lb(name: &str, vip: &str) -> DeployedLb {
        DeployedLb {
            name: name.to_string(),
            dns_record: vip.to_string(),
        }
    }

    fn lb_config(listeners: &[&str], ecv: &[(u16, &str)]) -> LbConfig {
        LbConfig {
            listeners: listeners.iter().map(ToString::to_string).collect(),
            ecv_map: ecv
                .iter()
                .map(|(port, probe)| (*port, probe.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn request() -> GslbRequest {
        GslbRequest {
            platform: "Plt".to_string(),
            environment: "env".to_string(),
            assembly: "a1".to_string(),
            org: "org".to_string(),
            custom_subdomain: None,
            fqdn: Fqdn {
                aliases: vec![],
                full_aliases: vec!["Test1.xyz.com".to_string()],
                distribution: Some("proximity".to_string()),
            },
            old_fqdn: None,
            cloud: cloud(1, "c1", "1", "active"),
            platform_clouds: vec![cloud(1, "c1", "1", "active"), cloud(2, "c2", "2", "active")],
            deployed_lbs: vec![
                lb("lb-1234-2-1", "10.2.1.10"),
                lb("lb-1234-1-1", "10.1.1.10"),
            ],
            lb_config: lb_config(&["http 80 http 8080"], &[(8080, "GET /")]),
            dns_zone: "prod.xyz.com".to_string(),
            correlation_id: "r-1".to_string(),
        }
    }

    // =====================================================
    // Cloud Eligibility Tests
    // =====================================================

    #[test]
    fn test_primary_truth_table() {
        let cases = [
            ("1", "active", true),
            ("1", "inactive", true),
            ("1", "offline", false),
            ("2", "active", false),
            ("2", "inactive", false),
            ("2", "offline", false),
        ];
        for (priority, status, expected) in cases {
            assert_eq!(
                cloud(1, "c1", priority, status).is_primary(),
                expected,
                "priority={priority} status={status}"
            );
        }
    }

    #[test]
    fn test_cloud_without_priority_is_secondary() {
        let c = PlatformCloud {
            id: 1,
            name: "c1".to_string(),
            priority: None,
            admin_status: Some("active".to_string()),
        };
        assert!(!c.is_primary());
    }

    #[test]
    fn test_lb_cloud_id_is_second_to_last_element() {
        assert_eq!(lb("web-lb-4567-12-1", "").cloud_id().unwrap(), 12);
        assert!(matches!(
            lb("nodash", "").cloud_id(),
            Err(ReconcileError::InvalidRequest(_))
        ));
        assert!(lb("lb-x-1", "").cloud_id().is_err());
    }

    // =====================================================
    // Target Tests
    // =====================================================

    #[test]
    fn test_targets_put_primaries_first() {
        let targets = request().targets().unwrap();

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].cloud, "c1");
        assert_eq!(targets[0].vip, "10.1.1.10");
        assert!(targets[0].enabled_for_traffic);
        assert_eq!(targets[0].effective_weight(), 100);
        assert_eq!(targets[1].cloud, "c2");
        assert!(!targets[1].enabled_for_traffic);
        assert_eq!(targets[1].effective_weight(), 0);
    }

    #[test]
    fn test_lb_in_unknown_cloud_is_rejected() {
        let mut req = request();
        req.deployed_lbs.push(lb("lb-1234-9-1", "10.9.1.10"));
        let err = req.targets().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid request : deployed LB lb-1234-9-1 refers to unknown cloud id 9"
        );
    }

    #[test]
    fn test_missing_platform_clouds_is_rejected() {
        let mut req = request();
        req.platform_clouds.clear();
        assert!(req.targets().is_err());
    }

    #[test]
    fn test_distribution_mapping() {
        let mut req = request();
        assert_eq!(req.distribution(), Distribution::Proximity);
        req.fqdn.distribution = Some("roundrobin".to_string());
        assert_eq!(req.distribution(), Distribution::RoundRobin);
        req.fqdn.distribution = None;
        assert_eq!(req.distribution(), Distribution::RoundRobin);
    }

    // =====================================================
    // Health Check Tests
    // =====================================================

    #[test]
    fn test_http_listener_uses_lb_port_and_ecv_path() {
        let checks = lb_config(&["http 80 http 8080"], &[(8080, "GET /")])
            .health_checks()
            .unwrap();
        assert_eq!(checks, vec![HealthCheck::http(80, "/")]);
    }

    #[test]
    fn test_tcp_listener_without_ecv_entry_derives_nothing() {
        let checks = lb_config(&["tcp 3306 tcp 3307"], &[(8080, "GET /")])
            .health_checks()
            .unwrap();
        assert!(checks.is_empty());
    }

    #[test]
    fn test_tcp_listener_with_ecv_entry() {
        let checks = lb_config(&["tcp 3306 tcp 3307"], &[(3307, "check")])
            .health_checks()
            .unwrap();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].protocol, Protocol::Tcp);
        assert_eq!(checks[0].port, 3306);
        assert!(checks[0].path.is_none());
    }

    #[test]
    fn test_https_listener_derives_http_check() {
        let checks = lb_config(&["https 443 http 8443"], &[(8443, "GET /health")])
            .health_checks()
            .unwrap();
        assert_eq!(checks, vec![HealthCheck::http(443, "/health")]);
    }

    #[test]
    fn test_short_and_unknown_listeners_are_skipped() {
        let checks = lb_config(&["http", "udp 53 udp 53"], &[(53, "dig")])
            .health_checks()
            .unwrap();
        assert!(checks.is_empty());
    }

    #[test]
    fn test_non_numeric_port_is_invalid() {
        let err = lb_config(&["http eighty http 8080"], &[(8080, "GET /")])
            .health_checks()
            .unwrap_err();
        assert_eq!(err, ReconcileError::InvalidRequest("invalid port eighty".to_string()));
    }

    #[test]
    fn test_lb_config_from_json() {
        let config =
            LbConfig::from_json(r#"["http 80 http 8080"]"#, r#"{"8080":"GET /ping"}"#).unwrap();
        assert_eq!(config.listeners, vec!["http 80 http 8080"]);
        assert_eq!(config.ecv_map.get(&8080).map(String::as_str), Some("GET /ping"));

        let empty = LbConfig::from_json("", " ").unwrap();
        assert_eq!(empty, LbConfig::default());

        assert!(LbConfig::from_json("[]", r#"{"web":"GET /"}"#).is_err());
        assert!(LbConfig::from_json("not json", "{}").is_err());
    }

    // =====================================================
    // Name Derivation Tests
    // =====================================================

    #[test]
    fn test_subdomain_falls_back_to_environment_assembly_org() {
        let mut req = request();
        assert_eq!(req.subdomain(), "env.a1.org");
        req.custom_subdomain = Some("  ".to_string());
        assert_eq!(req.subdomain(), "env.a1.org");
        req.custom_subdomain = Some("custom.sub".to_string());
        assert_eq!(req.subdomain(), "custom.sub");
    }

    #[test]
    fn test_aliases_are_qualified_lower_cased_and_deduplicated() {
        let mut req = request();
        req.fqdn.aliases = vec!["Www".to_string(), "www".to_string()];
        req.fqdn.full_aliases.push("test1.XYZ.com".to_string());

        assert_eq!(
            req.aliases(),
            vec![
                "plt.env.a1.org.prod.xyz.com",
                "www.env.a1.org.prod.xyz.com",
                "test1.xyz.com",
            ]
        );
    }

    #[test]
    fn test_obsolete_aliases_are_old_minus_current() {
        let mut req = request();
        req.old_fqdn = Some(Fqdn {
            aliases: vec!["legacy".to_string()],
            full_aliases: vec!["test1.xyz.com".to_string(), "old.xyz.com".to_string()],
            distribution: None,
        });

        assert_eq!(
            req.obsolete_aliases(),
            vec!["legacy.env.a1.org.prod.xyz.com", "old.xyz.com"]
        );
        req.old_fqdn = None;
        assert!(req.obsolete_aliases().is_empty());
    }

    #[test]
    fn test_cloud_a_record_name() {
        let record = request().cloud_a_record();
        assert_eq!(record.cloud, "c1");
        assert_eq!(record.a_record_name, "plt.env.a1.org.c1.prod.xyz.com");
    }

    // =====================================================
    // State Construction Tests
    // =====================================================

    #[test]
    fn test_to_desired_state() {
        let desired = request().to_desired_state().unwrap();

        assert_eq!(desired.app, "Plt");
        assert_eq!(desired.subdomain, "env.a1.org");
        assert_eq!(desired.canonical_name("gslb.xyz.com"), "plt.env.a1.org.gslb.xyz.com");
        assert_eq!(desired.targets.len(), 2);
        assert_eq!(desired.health_checks, vec![HealthCheck::http(80, "/")]);
        assert_eq!(desired.dns_config.zone, "prod.xyz.com");
        assert_eq!(
            desired.aliases,
            vec!["plt.env.a1.org.prod.xyz.com", "test1.xyz.com"]
        );
        assert_eq!(desired.cloud_vip("c1"), Some("10.1.1.10"));
        assert_eq!(desired.correlation_id, "r-1");
    }

    #[test]
    fn test_to_provisioned_state() {
        let provisioned = request().to_provisioned_state(true);

        assert!(provisioned.platform_enabled);
        assert_eq!(provisioned.aliases.len(), 2);
        assert_eq!(
            provisioned.cloud_a_records[0].a_record_name,
            "plt.env.a1.org.c1.prod.xyz.com"
        );
    }

    #[test]
    fn test_request_deserializes_from_camel_case_json() {
        let json = r#"{
            "platform": "plt",
            "environment": "env",
            "assembly": "a1",
            "org": "org",
            "fqdn": {"fullAliases": ["test1.xyz.com"], "distribution": "proximity"},
            "cloud": {"id": 1, "name": "c1", "priority": "1", "adminStatus": "active"},
            "platformClouds": [{"id": 1, "name": "c1", "priority": "1", "adminStatus": "active"}],
            "deployedLbs": [{"name": "lb-1-1", "dnsRecord": "10.1.1.10"}],
            "lbConfig": {"listeners": ["http 80 http 8080"], "ecvMap": {"8080": "GET /"}},
            "dnsZone": "prod.xyz.com"
        }"#;
        let req: GslbRequest = serde_json::from_str(json).unwrap();
        let desired = req.to_desired_state().unwrap();

        assert_eq!(desired.targets[0].vip, "10.1.1.10");
        assert_eq!(desired.health_checks, vec![HealthCheck::http(80, "/")]);
        assert!(desired.obsolete_aliases.is_empty());
    }
}
