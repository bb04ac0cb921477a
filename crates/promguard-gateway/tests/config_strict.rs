#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use promguard_gateway::config::{self, EmptyValues, TenantSource};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
gateway:
  upstream: "http://127.0.0.1:9090"
tenant:
  label: namespace
  sorce: header # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "internal");
    assert!(err.to_string().contains("sorce"), "{err}");
}

#[test]
fn ok_minimal_config() {
    let ok = r#"
version: 1
gateway:
  upstream: "http://127.0.0.1:9090"
tenant:
  label: namespace
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.gateway.listen, "0.0.0.0:8080");
    assert_eq!(cfg.gateway.upstream_timeout_ms, 30_000);
    assert_eq!(cfg.tenant.source, TenantSource::Query);
    assert_eq!(cfg.tenant.param_name(), "namespace");
    assert_eq!(cfg.tenant.empty_values, EmptyValues::Reject);
}

#[test]
fn header_source_with_custom_param() {
    let ok = r#"
version: 1
gateway:
  upstream: "https://prom.internal/prometheus"
  upstream_timeout_ms: 5000
tenant:
  label: team
  source: header
  param: X-Scope-OrgID
  empty_values: ignore
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.tenant.source, TenantSource::Header);
    assert_eq!(cfg.tenant.param_name(), "X-Scope-OrgID");
    assert_eq!(cfg.tenant.empty_values, EmptyValues::Ignore);
}

#[test]
fn rejects_unsupported_version() {
    let bad = r#"
version: 2
gateway:
  upstream: "http://127.0.0.1:9090"
tenant:
  label: namespace
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert!(matches!(err, promguard_core::GateError::UnsupportedVersion));
}

#[test]
fn rejects_invalid_values() {
    let cases = [
        ("upstream: \"ftp://host\"", "label: namespace"),
        ("upstream: \"not a url\"", "label: namespace"),
        ("upstream: \"http://h:9090/?x=1\"", "label: namespace"),
        ("upstream: \"http://h:9090\"\n  upstream_timeout_ms: 10", "label: namespace"),
        ("upstream: \"http://h:9090\"\n  max_body_bytes: 0", "label: namespace"),
        ("upstream: \"http://h:9090\"", "label: \"1abc\""),
        ("upstream: \"http://h:9090\"", "label: \"name-space\""),
        ("upstream: \"http://h:9090\"", "label: ns\n  source: header\n  param: \"bad header\""),
    ];
    for (gateway, tenant) in cases {
        let yaml = format!("version: 1\ngateway:\n  {gateway}\ntenant:\n  {tenant}\n");
        let err = config::load_from_str(&yaml).expect_err(&yaml);
        assert!(
            matches!(err, promguard_core::GateError::Config(_)),
            "{yaml}: {err:?}"
        );
    }
}

#[test]
fn missing_file_is_a_config_error() {
    let err = config::load_from_file("/nonexistent/promguard.yaml").expect_err("must fail");
    assert!(matches!(err, promguard_core::GateError::Config(_)));
}
