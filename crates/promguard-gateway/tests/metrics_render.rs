#![allow(clippy::unwrap_used)]

use std::time::Duration;

use promguard_gateway::obs::metrics::GatewayMetrics;

#[test]
fn renders_prometheus_text() {
    let m = GatewayMetrics::default();
    m.requests.inc(&[("endpoint", "query"), ("code", "200")]);
    m.requests.inc(&[("code", "200"), ("endpoint", "query")]);
    m.rejections.inc(&[("endpoint", "series"), ("reason", "bad_data")]);
    m.upstream_duration.observe(&[("endpoint", "query")], Duration::from_millis(3));
    m.inflight.inc();

    let text = m.render();
    assert!(text.contains("# TYPE promguard_requests_total counter"));
    assert!(text.contains(r#"promguard_requests_total{code="200",endpoint="query"} 2"#));
    assert!(text.contains(r#"promguard_rejections_total{endpoint="series",reason="bad_data"} 1"#));
    assert!(text.contains(r#"promguard_upstream_duration_micros_bucket{endpoint="query",le="1000"} 0"#));
    assert!(text.contains(r#"promguard_upstream_duration_micros_bucket{endpoint="query",le="5000"} 1"#));
    assert!(text.contains(r#"promguard_upstream_duration_micros_sum{endpoint="query"} 3000"#));
    assert!(text.contains("promguard_requests_inflight 1"));
    assert!(text.contains("promguard_draining 0"));

    m.set_draining();
    assert!(m.render().contains("promguard_draining 1"));
    assert_eq!(m.upstream_duration.count(&[("endpoint", "query")]), 1);
}
